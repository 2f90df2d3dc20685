use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

/// Month name (abbreviated or full, trailing period optional), day, year.
/// Matches "Nov 21, 2025", "November 21 2025", "Sept. 5, 2024".
const DATE_PATTERN: &str =
    r"(?i)(Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)[a-z]*\.?\s+([0-9]{1,2}),?\s+([0-9]{4})";

static DATE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(DATE_PATTERN).expect("date pattern is valid"));

const MONTH_PREFIXES: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

/// Finds the first month-day-year date in `text` and returns it as `YYYY-MM-DD`.
///
/// Only the first match is considered. If it does not name a real calendar
/// day (e.g. "Feb 30, 2025") the result is `None`; later matches are not tried.
pub fn normalize_date(text: &str) -> Option<String> {
    let caps = DATE_REGEX.captures(text)?;

    let month = month_number(&caps[1])?;
    let day: u32 = caps[2].parse().ok()?;
    let year: i32 = caps[3].parse().ok()?;

    NaiveDate::from_ymd_opt(year, month, day).map(|d| d.format("%Y-%m-%d").to_string())
}

/// Maps a three-letter English month prefix to 1..=12, ignoring case.
fn month_number(prefix: &str) -> Option<u32> {
    let prefix = prefix.to_ascii_lowercase();
    MONTH_PREFIXES
        .iter()
        .position(|m| *m == prefix)
        .map(|idx| idx as u32 + 1)
}
