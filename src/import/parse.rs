//! Cell parsers for European-formatted spreadsheet values.
//! Anything unparseable becomes `None` instead of failing the row.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use std::sync::LazyLock;

static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{4})$").expect("valid date pattern"));
static TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2}):(\d{2})").expect("valid time pattern"));

/// "1.234,50 €" -> 1234.5. Dots are thousands separators, the comma is decimal.
pub fn parse_euro_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '€' | '\u{FFFD}' | '.' | '\u{00A0}' | ' '))
        .collect();
    parse_decimal(&cleaned)
}

/// "84%" -> 84.0, "12,5 %" -> 12.5
pub fn parse_percent(raw: &str) -> Option<f64> {
    let cleaned: String = raw.chars().filter(|c| !matches!(c, '%' | ' ')).collect();
    parse_decimal(&cleaned)
}

fn parse_decimal(cleaned: &str) -> Option<f64> {
    let value = cleaned.trim().replacen(',', ".", 1);
    if value.is_empty() {
        return None;
    }
    value.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// `DD/MM/YYYY` plus an optional `HH:MM`; a missing or malformed time means midnight.
pub fn parse_date_time(date: &str, time: Option<&str>) -> Option<NaiveDateTime> {
    let caps = DATE_RE.captures(date.trim())?;
    let day: u32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let year: i32 = caps[3].parse().ok()?;
    let date = NaiveDate::from_ymd_opt(year, month, day)?;

    let time = time
        .and_then(|t| TIME_RE.captures(t.trim()))
        .and_then(|caps| {
            let hour: u32 = caps[1].parse().ok()?;
            let minute: u32 = caps[2].parse().ok()?;
            NaiveTime::from_hms_opt(hour, minute, 0)
        })
        .unwrap_or(NaiveTime::MIN);

    Some(date.and_time(time))
}

/// Trade numbers sometimes arrive as "12" and sometimes as "12,0".
pub fn parse_trade_number(raw: &str) -> Option<i64> {
    let value = parse_decimal(raw)?;
    (value.fract() == 0.0 && value > 0.0).then_some(value as i64)
}
