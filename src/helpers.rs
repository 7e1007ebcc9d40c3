// Parsing & formatting helpers shared by the collectors and the summary
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde_json::Value;

static TRAILING_ZIP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{5})$").expect("valid zipcode pattern"));

/// `YYMMDD` stamp embedded in every snapshot filename
pub fn date_stamp(date: NaiveDate) -> String {
    date.format("%y%m%d").to_string()
}

/// Splits a comma separated CLI list, dropping blanks
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

/// Last five-digit group of an address string, if it ends with one
pub fn zipcode_from_address(address: &str) -> Option<String> {
    TRAILING_ZIP
        .captures(address.trim())
        .map(|caps| caps[1].to_string())
}

/// Strips `$` and thousands separators, "$300,000" -> 300000.0
pub fn parse_currency(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| *c != '$' && *c != ',')
        .collect();
    cleaned.trim().parse::<f64>().ok()
}

/// Listing dates come back as plain dates, naive timestamps or RFC 3339
pub fn parse_listing_date(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(parsed);
        }
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|parsed| parsed.naive_utc())
}

/// Whole days elapsed, floored the same way for past and future dates
pub fn whole_days_between(earlier: NaiveDateTime, later: NaiveDateTime) -> i64 {
    (later - earlier).num_seconds().div_euclid(86_400)
}

/// Text form of an API value as it lands in a CSV cell. Null is an empty cell.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
