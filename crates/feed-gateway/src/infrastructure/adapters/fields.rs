//! Field extraction helpers shared by the venue adapters.
//!
//! Venues are inconsistent about quoting numbers, so every numeric reader
//! accepts both JSON numbers and numeric strings. `serde_json` is built with
//! `arbitrary_precision`, so a bare number keeps the venue's exact digits.

use feed_core::PriceLevel;
use rust_decimal::Decimal;
use serde_json::Value;

use crate::domain::ParseError;

pub fn field<'a>(value: &'a Value, name: &'static str) -> Result<&'a Value, ParseError> {
    match value.get(name) {
        Some(Value::Null) | None => Err(ParseError::MissingField(name)),
        Some(v) => Ok(v),
    }
}

pub fn opt_field<'a>(value: &'a Value, name: &'static str) -> Option<&'a Value> {
    value.get(name).filter(|v| !v.is_null())
}

pub fn str_field<'a>(value: &'a Value, name: &'static str) -> Result<&'a str, ParseError> {
    let v = field(value, name)?;
    v.as_str().ok_or_else(|| invalid(name, v))
}

pub fn bool_field(value: &Value, name: &'static str) -> Result<bool, ParseError> {
    let v = field(value, name)?;
    v.as_bool().ok_or_else(|| invalid(name, v))
}

pub fn array_field<'a>(value: &'a Value, name: &'static str) -> Result<&'a [Value], ParseError> {
    let v = field(value, name)?;
    v.as_array().map(Vec::as_slice).ok_or_else(|| invalid(name, v))
}

/// Identifier that may be sent as a string or an integer
pub fn id_field(value: &Value, name: &'static str) -> Result<String, ParseError> {
    match field(value, name)? {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(invalid(name, other)),
    }
}

pub fn u64_value(v: &Value, name: &'static str) -> Result<u64, ParseError> {
    match v {
        Value::Number(n) => n.as_u64().ok_or_else(|| invalid(name, v)),
        Value::String(s) => s.parse().map_err(|_| invalid(name, v)),
        _ => Err(invalid(name, v)),
    }
}

pub fn u64_field(value: &Value, name: &'static str) -> Result<u64, ParseError> {
    u64_value(field(value, name)?, name)
}

pub fn i64_value(v: &Value, name: &'static str) -> Result<i64, ParseError> {
    match v {
        Value::Number(n) => n.as_i64().ok_or_else(|| invalid(name, v)),
        Value::String(s) => s.parse().map_err(|_| invalid(name, v)),
        _ => Err(invalid(name, v)),
    }
}

pub fn opt_i64_field(value: &Value, name: &'static str) -> Result<Option<i64>, ParseError> {
    opt_field(value, name).map(|v| i64_value(v, name)).transpose()
}

/// Exact decimal from a string or number
pub fn decimal_value(v: &Value, name: &'static str) -> Result<Decimal, ParseError> {
    let text = number_text(v, name)?;
    let parsed = if text.contains(['e', 'E']) {
        Decimal::from_scientific(&text)
    } else {
        Decimal::from_str_exact(&text)
    };
    parsed
        .map(|d| d.normalize())
        .map_err(|_| ParseError::InvalidDecimal {
            field: name,
            value: text,
        })
}

pub fn decimal_field(value: &Value, name: &'static str) -> Result<Decimal, ParseError> {
    decimal_value(field(value, name)?, name)
}

/// Fixed-point integer with `scale` implied decimals, converted exactly
pub fn scaled_value(v: &Value, name: &'static str, scale: u32) -> Result<Decimal, ParseError> {
    let text = number_text(v, name)?;
    let units: i128 = text.parse().map_err(|_| ParseError::InvalidDecimal {
        field: name,
        value: text.clone(),
    })?;
    Decimal::try_from_i128_with_scale(units, scale)
        .map(|d| d.normalize())
        .map_err(|_| ParseError::InvalidDecimal {
            field: name,
            value: text,
        })
}

/// Digits as the venue sent them
fn number_text(v: &Value, name: &'static str) -> Result<String, ParseError> {
    match v {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(invalid(name, v)),
    }
}

pub fn scaled_field(value: &Value, name: &'static str, scale: u32) -> Result<Decimal, ParseError> {
    scaled_value(field(value, name)?, name, scale)
}

/// `[[price, size, ...], ...]` with a custom per-component reader
pub fn levels_with(
    value: &Value,
    name: &'static str,
    read: impl Fn(&Value, &'static str) -> Result<Decimal, ParseError>,
) -> Result<Vec<PriceLevel>, ParseError> {
    let rows = array_field(value, name)?;
    let mut levels = Vec::with_capacity(rows.len());

    for row in rows {
        let pair = row.as_array().ok_or_else(|| invalid(name, row))?;
        if pair.len() < 2 {
            return Err(invalid(name, row));
        }
        levels.push(PriceLevel::new(read(&pair[0], name)?, read(&pair[1], name)?));
    }

    Ok(levels)
}

pub fn invalid(name: &'static str, value: &Value) -> ParseError {
    ParseError::InvalidField {
        field: name,
        value: value.to_string(),
    }
}
