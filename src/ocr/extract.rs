use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use super::date::normalize_date;

// Digit classes are ASCII only. `\d` in the regex crate also matches other
// Unicode decimal digits, which `str::parse` then rejects.

/// "Races" label followed by optional colon/whitespace and a count.
const RACES_PATTERN: &str = r"(?i)Races[:\s]*([0-9]+)";

/// "Wins" label followed by optional colon/whitespace and a count.
const WINS_PATTERN: &str = r"(?i)Wins[:\s]*([0-9]+)";

/// Maximal runs of digits and thousands separators.
const NUMBER_RUN_PATTERN: &str = r"[0-9,]+";

const FAN_KEYWORD: &str = "fans";

/// OCR frequently misreads this one ("Eamed"), so it is only a first-tier hint.
const EARNED_KEYWORD: &str = "earned";

static RACES_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(RACES_PATTERN).expect("races pattern is valid"));
static WINS_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(WINS_PATTERN).expect("wins pattern is valid"));
static NUMBER_RUN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(NUMBER_RUN_PATTERN).expect("number run pattern is valid"));

/// Fields recovered from one block of recognized text.
///
/// Every field is independent. `None` means the field could not be recovered
/// from the text, which is not the same as a recovered zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_races: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_wins: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_fan: Option<u64>,
    /// Normalized to `YYYY-MM-DD`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

impl ExtractedFields {
    /// Returns true if nothing was recovered.
    pub fn is_empty(&self) -> bool {
        self.recovered_count() == 0
    }

    /// Number of fields that hold a value.
    pub fn recovered_count(&self) -> usize {
        [
            self.name.is_some(),
            self.total_races.is_some(),
            self.total_wins.is_some(),
            self.total_fan.is_some(),
            self.date.is_some(),
        ]
        .iter()
        .filter(|found| **found)
        .count()
    }
}

/// Extracts career stats from raw OCR text.
///
/// Label-anchored counts and the date are scanned over the full text, since
/// OCR may break a label and its value across lines. Fans and name use the
/// trimmed, non-empty lines. Never fails: unmatched fields stay `None`.
pub fn extract(text: &str) -> ExtractedFields {
    let lines = working_lines(text);

    ExtractedFields {
        name: extract_name(&lines),
        total_races: extract_races(text),
        total_wins: extract_wins(text),
        total_fan: extract_fans(&lines),
        date: normalize_date(text),
    }
}

/// Splits text into trimmed, non-empty lines in reading order.
pub fn working_lines(text: &str) -> Vec<&str> {
    text.split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect()
}

/// Returns the first line containing every keyword, ignoring case.
pub fn find_line<'a>(lines: &[&'a str], keywords: &[&str]) -> Option<&'a str> {
    lines.iter().copied().find(|line| {
        let lower = line.to_lowercase();
        keywords.iter().all(|k| lower.contains(&k.to_lowercase()))
    })
}

pub fn extract_races(text: &str) -> Option<u32> {
    first_labelled_count(&RACES_REGEX, text)
}

pub fn extract_wins(text: &str) -> Option<u32> {
    first_labelled_count(&WINS_REGEX, text)
}

/// Only the first label occurrence counts; an unparseable value there is absent.
fn first_labelled_count(regex: &Regex, text: &str) -> Option<u32> {
    regex
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Recovers the fan total from the "Fans Earned" line.
///
/// Prefers a line with both keywords and falls back to any "fans" line. On
/// that line, the first digit/comma run longer than 3 characters or holding
/// a separator wins; shorter bare numbers are treated as noise (ranks etc).
pub fn extract_fans(lines: &[&str]) -> Option<u64> {
    let line = find_line(lines, &[FAN_KEYWORD, EARNED_KEYWORD])
        .or_else(|| find_line(lines, &[FAN_KEYWORD]))?;

    let candidate = NUMBER_RUN_REGEX
        .find_iter(line)
        .map(|m| m.as_str())
        .filter(|run| run.chars().any(|c| c.is_ascii_digit()))
        .find(|run| is_plausible_fan_count(run))?;

    candidate.replace(',', "").parse().ok()
}

fn is_plausible_fan_count(run: &str) -> bool {
    run.len() > 3 || run.contains(',')
}

/// Takes the text after the closing bracket of a "[Title] Name" line.
///
/// Only the first bracketed line is considered; if nothing follows its
/// bracket the name is absent. There is no positional fallback.
pub fn extract_name(lines: &[&str]) -> Option<String> {
    let line = lines
        .iter()
        .find(|line| line.contains('[') && line.contains(']'))?;

    let name = line.split(']').nth(1)?.trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}
