//! Display formatting helpers

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Asia::Tokyo;

const PLACEHOLDER: &str = "-";

/// Group the integer part of a non-negative number with commas
fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn format_number(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (formatted.as_str(), None),
    };

    let sign = if value < 0.0 && formatted.chars().any(|c| c != '0' && c != '.') {
        "-"
    } else {
        ""
    };

    match frac_part {
        Some(frac) => format!("{}{}.{}", sign, group_thousands(int_part), frac),
        None => format!("{}{}", sign, group_thousands(int_part)),
    }
}

/// `¥2,850` style; yen has no minor unit on the board
pub fn format_currency(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("¥{}", format_number(v, 0)),
        _ => PLACEHOLDER.to_string(),
    }
}

/// Fraction rendered as percent: `0.125` → `12.50%`
pub fn format_percentage(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{:.2}%", v * 100.0),
        _ => PLACEHOLDER.to_string(),
    }
}

/// Multiples such as PBR/PER: `1.2` → `1.20倍`
pub fn format_ratio(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{:.2}倍", v),
        _ => PLACEHOLDER.to_string(),
    }
}

pub fn format_volume(value: Option<i64>) -> String {
    match value {
        Some(v) => format_number(v as f64, 0),
        None => PLACEHOLDER.to_string(),
    }
}

/// Render a server date/timestamp as `YYYY/MM/DD` in Tokyo time
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS` (UTC, as SQLite stores it)
/// and bare `YYYY-MM-DD`. Anything else is shown unchanged.
pub fn format_date(value: Option<&str>) -> String {
    let Some(raw) = value.map(str::trim).filter(|s| !s.is_empty()) else {
        return PLACEHOLDER.to_string();
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.with_timezone(&Tokyo).format("%Y/%m/%d").to_string();
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        let utc = DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc);
        return utc.with_timezone(&Tokyo).format("%Y/%m/%d").to_string();
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.format("%Y/%m/%d").to_string();
    }

    raw.to_string()
}

/// Today's date on the Tokyo exchange calendar
pub fn today_tokyo() -> NaiveDate {
    Utc::now().with_timezone(&Tokyo).date_naive()
}

/// Escape text for inclusion in HTML
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
