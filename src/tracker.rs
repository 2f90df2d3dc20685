//! Entry form state, recorded history and weekly goal progress.
//!
//! The form holds what the user is about to record. Scans feed it through
//! `EntryForm::apply`, which only overwrites fields the scan recovered.
//! `TrackerState` is what persists between runs: running stats plus the
//! entries recorded this week.

use anyhow::{Context, Result};
use chrono::{DateTime, Local, TimeZone};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

use crate::ocr::ExtractedFields;

/// Default weekly fan goal.
pub const DEFAULT_WEEKLY_GOAL: u64 = 22_000_000;

/// One progress entry being edited before it is recorded.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryForm {
    pub uma_name: String,
    pub total_races: u32,
    pub total_wins: u32,
    pub total_fan: u64,
    /// `HH:MM`
    pub time: String,
    /// `YYYY-MM-DD`
    pub date: String,
}

impl EntryForm {
    /// Creates an empty form stamped with the current local time.
    pub fn new() -> Self {
        Self::new_at(&Local::now())
    }

    /// Creates an empty form with time and date taken from `now`.
    pub fn new_at<Tz: TimeZone>(now: &DateTime<Tz>) -> Self
    where
        Tz::Offset: std::fmt::Display,
    {
        Self {
            time: now.format("%H:%M").to_string(),
            date: now.format("%Y-%m-%d").to_string(),
            ..Self::default()
        }
    }

    /// Merges scan results into the form. Absent fields keep their current value.
    pub fn apply(&mut self, fields: &ExtractedFields) {
        if let Some(name) = &fields.name {
            self.uma_name = name.clone();
        }
        if let Some(races) = fields.total_races {
            self.total_races = races;
        }
        if let Some(wins) = fields.total_wins {
            self.total_wins = wins;
        }
        if let Some(fan) = fields.total_fan {
            self.total_fan = fan;
        }
        if let Some(date) = &fields.date {
            self.date = date.clone();
        }
    }
}

/// A recorded entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryItem {
    pub id: i64,
    pub name: String,
    pub fan: u64,
    pub date: String,
}

/// Sum of fans across recorded entries.
pub fn history_fan_sum(history: &[HistoryItem]) -> u64 {
    history.iter().map(|h| h.fan).sum()
}

/// Percentage of the weekly goal covered by recorded entries.
///
/// Not clamped; values above 100 mean the goal was exceeded. A zero goal
/// yields 0.
pub fn weekly_progress(history: &[HistoryItem], goal_for_week: u64) -> f64 {
    if goal_for_week == 0 {
        return 0.0;
    }
    history_fan_sum(history) as f64 / goal_for_week as f64 * 100.0
}

/// Totals for the current week.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklySummary {
    /// Fan count at the start of the week plus everything recorded since.
    pub current_fan: u64,
    /// Fan count the week should end at.
    pub target_fan: u64,
    pub progress_percent: f64,
}

impl WeeklySummary {
    pub fn new(begin_fan: u64, goal_for_week: u64, history: &[HistoryItem]) -> Self {
        Self {
            current_fan: begin_fan.saturating_add(history_fan_sum(history)),
            target_fan: begin_fan.saturating_add(goal_for_week),
            progress_percent: weekly_progress(history, goal_for_week),
        }
    }

    /// Starting fan count for the next week: everything earned so far.
    pub fn next_week_begin(&self) -> u64 {
        self.current_fan
    }
}

/// Running totals kept across weeks.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserStats {
    /// Fan count at the start of the current week. Recorded entries are
    /// added on top of this, not into it.
    pub total_fan: u64,
    pub total_races: u32,
    pub total_wins: u32,
    pub goal_for_week: u64,
    pub careers: u32,
}

impl Default for UserStats {
    fn default() -> Self {
        Self {
            total_fan: 0,
            total_races: 0,
            total_wins: 0,
            goal_for_week: DEFAULT_WEEKLY_GOAL,
            careers: 0,
        }
    }
}

/// Persisted tracker data: stats plus this week's entries, newest first.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerState {
    pub stats: UserStats,
    pub history: Vec<HistoryItem>,
}

impl TrackerState {
    /// Loads state from `path`, or returns a fresh state if the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("No tracker data at {}, starting fresh", path.display());
            return Ok(Self::default());
        }
        let contents =
            fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Invalid tracker data in {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
    }

    /// Id for a new entry: `now_millis`, bumped past any id already in use.
    pub fn next_id(&self, now_millis: i64) -> i64 {
        match self.history.iter().map(|h| h.id).max() {
            Some(max) if max >= now_millis => max + 1,
            _ => now_millis,
        }
    }

    /// Records `form` as the newest entry and returns it.
    ///
    /// Adds the form's races to the running total and counts one more career.
    /// The begin-of-week fan count is left alone.
    pub fn record(&mut self, form: &EntryForm, id: i64) -> &HistoryItem {
        self.history.insert(
            0,
            HistoryItem {
                id,
                name: form.uma_name.clone(),
                fan: form.total_fan,
                date: format!("{} {}", form.time, form.date),
            },
        );
        self.stats.total_races = self.stats.total_races.saturating_add(form.total_races);
        self.stats.careers = self.stats.careers.saturating_add(1);
        &self.history[0]
    }

    /// Removes the entry with `id`. Returns false if there was none, in which
    /// case the career count is not touched.
    pub fn delete(&mut self, id: i64) -> bool {
        let before = self.history.len();
        self.history.retain(|h| h.id != id);
        let removed = self.history.len() != before;
        if removed {
            self.stats.careers = self.stats.careers.saturating_sub(1);
        }
        removed
    }

    pub fn summary(&self) -> WeeklySummary {
        WeeklySummary::new(self.stats.total_fan, self.stats.goal_for_week, &self.history)
    }

    /// Rolls over to a new week: the begin fan count becomes the current
    /// total and the history is cleared.
    pub fn new_week(&mut self) {
        self.stats.total_fan = self.summary().next_week_begin();
        self.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn item(id: i64, fan: u64) -> HistoryItem {
        HistoryItem {
            id,
            name: "Rice Shower".to_string(),
            fan,
            date: "2025-11-21".to_string(),
        }
    }

    #[test]
    fn test_new_at_stamps_time_and_date() {
        let now = Utc.with_ymd_and_hms(2025, 11, 21, 9, 5, 30).unwrap();
        let form = EntryForm::new_at(&now);
        assert_eq!(form.time, "09:05");
        assert_eq!(form.date, "2025-11-21");
        assert_eq!(form.uma_name, "");
        assert_eq!(form.total_fan, 0);
    }

    #[test]
    fn test_apply_overwrites_recovered_fields() {
        let mut form = EntryForm {
            uma_name: "Old".to_string(),
            total_races: 1,
            total_wins: 1,
            total_fan: 1,
            time: "10:00".to_string(),
            date: "2025-01-01".to_string(),
        };
        form.apply(&ExtractedFields {
            name: Some("Rice Shower".to_string()),
            total_races: Some(13),
            total_wins: Some(12),
            total_fan: Some(337_556),
            date: Some("2025-11-21".to_string()),
        });

        assert_eq!(form.uma_name, "Rice Shower");
        assert_eq!(form.total_races, 13);
        assert_eq!(form.total_wins, 12);
        assert_eq!(form.total_fan, 337_556);
        assert_eq!(form.date, "2025-11-21");
        assert_eq!(form.time, "10:00");
    }

    #[test]
    fn test_apply_keeps_values_for_absent_fields() {
        let mut form = EntryForm {
            uma_name: "Kept".to_string(),
            total_races: 7,
            total_wins: 3,
            total_fan: 5000,
            time: "10:00".to_string(),
            date: "2025-01-01".to_string(),
        };
        let before = form.clone();

        form.apply(&ExtractedFields::default());
        assert_eq!(form, before);

        form.apply(&ExtractedFields {
            total_wins: Some(0),
            ..ExtractedFields::default()
        });
        assert_eq!(form.total_wins, 0, "Recovered zero still overwrites");
        assert_eq!(form.total_races, 7);
        assert_eq!(form.uma_name, "Kept");
    }

    #[test]
    fn test_weekly_progress() {
        let history = [item(1, 1_000_000), item(2, 1_200_000)];
        let progress = weekly_progress(&history, 22_000_000);
        assert!((progress - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_weekly_progress_zero_goal() {
        assert_eq!(weekly_progress(&[item(1, 500)], 0), 0.0);
    }

    #[test]
    fn test_weekly_progress_not_clamped() {
        let progress = weekly_progress(&[item(1, 300)], 200);
        assert!((progress - 150.0).abs() < 1e-9);
    }

    #[test]
    fn test_weekly_summary() {
        let history = [item(1, 250_000), item(2, 750_000)];
        let summary = WeeklySummary::new(15_000_000, 22_000_000, &history);

        assert_eq!(summary.current_fan, 16_000_000);
        assert_eq!(summary.target_fan, 37_000_000);
        assert_eq!(summary.next_week_begin(), 16_000_000);
        assert!((summary.progress_percent - 1_000_000.0 / 22_000_000.0 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_weekly_summary_empty_history() {
        let summary = WeeklySummary::new(100, 0, &[]);
        assert_eq!(summary.current_fan, 100);
        assert_eq!(summary.target_fan, 100);
        assert_eq!(summary.progress_percent, 0.0);
    }

    fn form(name: &str, races: u32, fan: u64) -> EntryForm {
        EntryForm {
            uma_name: name.to_string(),
            total_races: races,
            total_wins: 1,
            total_fan: fan,
            time: "21:30".to_string(),
            date: "2025-11-21".to_string(),
        }
    }

    fn tracker_state(begin: u64, races: u32, careers: u32) -> TrackerState {
        TrackerState {
            stats: UserStats {
                total_fan: begin,
                total_races: races,
                careers,
                ..UserStats::default()
            },
            history: Vec::new(),
        }
    }

    #[test]
    fn test_record_prepends_and_updates_stats() {
        let mut state = tracker_state(15_000_000, 332, 332);

        state.record(&form("Rice Shower", 13, 337_556), 1);
        let item = state.record(&form("Special Week", 10, 250_000), 2).clone();

        assert_eq!(
            item,
            HistoryItem {
                id: 2,
                name: "Special Week".to_string(),
                fan: 250_000,
                date: "21:30 2025-11-21".to_string(),
            }
        );
        let ids: Vec<i64> = state.history.iter().map(|h| h.id).collect();
        assert_eq!(ids, vec![2, 1]);
        assert_eq!(state.stats.total_races, 355);
        assert_eq!(state.stats.careers, 334);
        assert_eq!(state.stats.total_wins, 0, "Wins are not accumulated");
        assert_eq!(state.stats.total_fan, 15_000_000, "Begin fan is untouched");
    }

    #[test]
    fn test_delete_removes_entry_and_decrements_careers() {
        let mut state = tracker_state(0, 0, 5);
        state.record(&form("A", 1, 1000), 1);
        state.record(&form("B", 1, 2000), 2);

        assert!(state.delete(1));
        assert_eq!(state.history.len(), 1);
        assert_eq!(state.history[0].id, 2);
        assert_eq!(state.stats.careers, 6);
        assert_eq!(state.stats.total_races, 2, "Races are not rolled back");
    }

    #[test]
    fn test_delete_unknown_id() {
        let mut state = tracker_state(0, 0, 3);
        state.record(&form("A", 1, 1000), 1);

        assert!(!state.delete(99));
        assert_eq!(state.history.len(), 1);
        assert_eq!(state.stats.careers, 4);
    }

    #[test]
    fn test_delete_never_underflows_careers() {
        let mut state = tracker_state(0, 0, 0);
        state.history.push(item(7, 100));

        assert!(state.delete(7));
        assert_eq!(state.stats.careers, 0);
    }

    #[test]
    fn test_new_week_rolls_begin_fan() {
        let mut state = tracker_state(15_000_000, 0, 0);
        state.record(&form("A", 1, 1_000_000), 1);
        state.record(&form("B", 1, 1_200_000), 2);
        assert!((state.summary().progress_percent - 10.0).abs() < 1e-9);

        state.new_week();

        assert_eq!(state.stats.total_fan, 17_200_000);
        assert!(state.history.is_empty());
        let summary = state.summary();
        assert_eq!(summary.current_fan, 17_200_000);
        assert_eq!(summary.target_fan, 17_200_000 + DEFAULT_WEEKLY_GOAL);
        assert_eq!(summary.progress_percent, 0.0);
    }

    #[test]
    fn test_next_id() {
        let mut state = TrackerState::default();
        assert_eq!(state.next_id(1000), 1000);

        state.history.push(item(1000, 1));
        assert_eq!(state.next_id(1000), 1001);
        assert_eq!(state.next_id(999), 1001);
        assert_eq!(state.next_id(5000), 5000);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("tracker.json");
        let mut state = tracker_state(15_000_000, 332, 332);
        state.record(&form("Rice Shower", 13, 337_556), 1_763_700_000_000);

        state.save(&path).unwrap();
        let json = fs::read_to_string(&path).unwrap();
        assert!(json.contains("\"goalForWeek\": 22000000"));
        assert!(json.contains("\"fan\": 337556"));

        assert_eq!(TrackerState::load(&path).unwrap(), state);
    }

    #[test]
    fn test_load_missing_file_is_fresh_state() {
        let dir = tempfile::tempdir().unwrap();
        let state = TrackerState::load(&dir.path().join("tracker.json")).unwrap();
        assert_eq!(state, TrackerState::default());
        assert_eq!(state.stats.goal_for_week, DEFAULT_WEEKLY_GOAL);
    }

    #[test]
    fn test_load_partial_stats_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracker.json");
        fs::write(&path, r#"{ "stats": { "totalFan": 500, "careers": 2 } }"#).unwrap();

        let state = TrackerState::load(&path).unwrap();
        assert_eq!(state.stats.total_fan, 500);
        assert_eq!(state.stats.careers, 2);
        assert_eq!(state.stats.goal_for_week, DEFAULT_WEEKLY_GOAL);
        assert!(state.history.is_empty());
    }

    #[test]
    fn test_load_invalid_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracker.json");
        fs::write(&path, "[1, 2").unwrap();
        assert!(TrackerState::load(&path).is_err());
    }
}
