//! Operator input validation
//!
//! Runs before any request is built; a failure here means nothing was sent.

use crate::error::{AppError, Result};
use chrono::NaiveDate;

/// Upper bound for prices and price-like indicators (JPY)
pub const MAX_PRICE: f64 = 1_000_000.0;

const NAME_MIN_CHARS: usize = 2;
const NAME_MAX_CHARS: usize = 100;

/// Securities code: 4 or 5 ASCII digits
pub fn validate_symbol(symbol: &str) -> Result<String> {
    let symbol = symbol.trim();

    if symbol.is_empty() {
        return Err(AppError::Validation("企業コードは必須です".to_string()));
    }

    let valid = (4..=5).contains(&symbol.len()) && symbol.bytes().all(|b| b.is_ascii_digit());
    if !valid {
        return Err(AppError::Validation(format!(
            "企業コードは4桁または5桁の数字である必要があります: {}",
            symbol
        )));
    }

    Ok(symbol.to_string())
}

pub fn validate_company_name(name: &str) -> Result<String> {
    let name = name.trim();

    if name.is_empty() {
        return Err(AppError::Validation("企業名は必須です".to_string()));
    }

    let chars = name.chars().count();
    if chars < NAME_MIN_CHARS {
        return Err(AppError::Validation(
            "企業名は2文字以上である必要があります".to_string(),
        ));
    }
    if chars > NAME_MAX_CHARS {
        return Err(AppError::Validation(
            "企業名は100文字以下である必要があります".to_string(),
        ));
    }

    Ok(name.to_string())
}

/// Trimmed optional text; blank becomes `None`
pub fn normalize_optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub fn validate_price(price: f64) -> Result<f64> {
    if !price.is_finite() || price <= 0.0 {
        return Err(AppError::Validation(
            "価格は正の数値である必要があります".to_string(),
        ));
    }
    if price > MAX_PRICE {
        return Err(AppError::Validation(
            "価格は100万円以下である必要があります".to_string(),
        ));
    }
    Ok((price * 100.0).round() / 100.0)
}

pub fn validate_volume(volume: i64) -> Result<i64> {
    if volume < 0 {
        return Err(AppError::Validation(
            "出来高は0以上である必要があります".to_string(),
        ));
    }
    Ok(volume)
}

/// `YYYY-MM-DD`; blank means "let the server pick today"
pub fn validate_date(value: &str, field_name: &str) -> Result<Option<String>> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }

    if value.len() != 10 {
        return Err(AppError::Validation(format!(
            "{}はYYYY-MM-DD形式である必要があります",
            field_name
        )));
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(|date| Some(date.format("%Y-%m-%d").to_string()))
        .map_err(|_| AppError::Validation(format!("{}が無効な日付です", field_name)))
}

/// Range-checked ratio, rounded to four decimals
pub fn validate_ratio(value: f64, field_name: &str, min: f64, max: f64) -> Result<f64> {
    if !value.is_finite() {
        return Err(AppError::Validation(format!(
            "{}は数値である必要があります",
            field_name
        )));
    }
    if value < min {
        return Err(AppError::Validation(format!(
            "{}は{}以上である必要があります",
            field_name, min
        )));
    }
    if value > max {
        return Err(AppError::Validation(format!(
            "{}は{}以下である必要があります",
            field_name, max
        )));
    }
    Ok((value * 10_000.0).round() / 10_000.0)
}

pub fn validate_pbr(pbr: f64) -> Result<f64> {
    validate_ratio(pbr, "PBR", 0.0, 100.0)
}

pub fn validate_per(per: f64) -> Result<f64> {
    validate_ratio(per, "PER", 0.0, 1000.0)
}

/// Percent-valued input (e.g. `45.2` for 45.2%) converted to a fraction
pub fn percent_to_fraction(percent: f64, field_name: &str, min: f64, max: f64) -> Result<f64> {
    validate_ratio(percent / 100.0, field_name, min, max)
}

pub fn validate_equity_ratio_percent(percent: f64) -> Result<f64> {
    percent_to_fraction(percent, "自己資本比率", 0.0, 1.0)
}

pub fn validate_roe_percent(percent: f64) -> Result<f64> {
    percent_to_fraction(percent, "ROE", -1.0, 1.0)
}

pub fn validate_roa_percent(percent: f64) -> Result<f64> {
    percent_to_fraction(percent, "ROA", -1.0, 1.0)
}
