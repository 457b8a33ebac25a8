//! Date extraction.
//!
//! Every match is validated as a real calendar date and kept only if its
//! year falls in [`MIN_YEAR`, `MAX_YEAR_EXCLUSIVE`). Output is ISO
//! `YYYY-MM-DD`, deduplicated, in document order.

use chrono::NaiveDate;

use super::patterns::{DATE_DAY_FIRST, DATE_ISO, DATE_MONTH_NAME_FIRST, DATE_NUMERIC};

/// Earliest plausible document year
pub const MIN_YEAR: i32 = 2000;
/// First implausible future year
pub const MAX_YEAR_EXCLUSIVE: i32 = 2030;

/// Extract all plausible dates from text
pub fn extract_dates(text: &str) -> Vec<String> {
    let mut found: Vec<(usize, NaiveDate)> = Vec::new();

    for caps in DATE_NUMERIC.captures_iter(text) {
        let (Some(whole), Some(a), Some(b), Some(y)) = (caps.get(0), caps.get(1), caps.get(2), caps.get(3))
        else {
            continue;
        };
        if let Some(date) = parse_numeric(a.as_str(), b.as_str(), y.as_str()) {
            found.push((whole.start(), date));
        }
    }

    for caps in DATE_ISO.captures_iter(text) {
        let (Some(whole), Some(y), Some(m), Some(d)) = (caps.get(0), caps.get(1), caps.get(2), caps.get(3))
        else {
            continue;
        };
        if let Some(date) = ymd(y.as_str(), m.as_str(), d.as_str()) {
            found.push((whole.start(), date));
        }
    }

    for caps in DATE_MONTH_NAME_FIRST.captures_iter(text) {
        let (Some(whole), Some(mon), Some(d), Some(y)) = (caps.get(0), caps.get(1), caps.get(2), caps.get(3))
        else {
            continue;
        };
        if let Some(date) = named_month(mon.as_str(), d.as_str(), y.as_str()) {
            found.push((whole.start(), date));
        }
    }

    for caps in DATE_DAY_FIRST.captures_iter(text) {
        let (Some(whole), Some(d), Some(mon), Some(y)) = (caps.get(0), caps.get(1), caps.get(2), caps.get(3))
        else {
            continue;
        };
        if let Some(date) = named_month(mon.as_str(), d.as_str(), y.as_str()) {
            found.push((whole.start(), date));
        }
    }

    found.sort_by_key(|(start, _)| *start);

    let mut dates: Vec<String> = Vec::new();
    for (_, date) in found {
        if !is_plausible(&date) {
            continue;
        }
        let iso = date.format("%Y-%m-%d").to_string();
        if !dates.contains(&iso) {
            dates.push(iso);
        }
    }
    dates
}

/// Whether an ISO date string is a valid, plausible document date
pub fn is_valid_iso_date(value: &str) -> bool {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map(|d| is_plausible(&d))
        .unwrap_or(false)
}

/// Latest of a list of ISO dates
pub fn most_recent(dates: &[String]) -> Option<String> {
    dates
        .iter()
        .filter_map(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
        .max()
        .map(|d| d.format("%Y-%m-%d").to_string())
}

/// Today's date as ISO string
pub fn today() -> String {
    chrono::Local::now().date_naive().format("%Y-%m-%d").to_string()
}

fn is_plausible(date: &NaiveDate) -> bool {
    use chrono::Datelike;
    (MIN_YEAR..MAX_YEAR_EXCLUSIVE).contains(&date.year())
}

/// Month-first when ambiguous, day-first when the first field can't be a month
fn parse_numeric(first: &str, second: &str, year: &str) -> Option<NaiveDate> {
    let a: u32 = first.parse().ok()?;
    let b: u32 = second.parse().ok()?;
    let mut y: i32 = year.parse().ok()?;
    if year.len() == 2 {
        y += 2000;
    }

    NaiveDate::from_ymd_opt(y, a, b).or_else(|| NaiveDate::from_ymd_opt(y, b, a))
}

fn ymd(year: &str, month: &str, day: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)
}

fn named_month(month: &str, day: &str, year: &str) -> Option<NaiveDate> {
    let month = match month.to_lowercase().get(..3)? {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    NaiveDate::from_ymd_opt(year.parse().ok()?, month, day.parse().ok()?)
}
