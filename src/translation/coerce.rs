//! Coercion of JSON and form-string values into typed field values
//!
//! Form bodies carry every scalar as a string, so each coercion accepts
//! both the JSON-native type and its string rendering.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::Value;

pub const REQUIRED: &str = "This field is required.";
pub const NOT_NULL: &str = "This field may not be null.";
pub const NOT_BLANK: &str = "This field may not be blank.";

pub fn boolean(value: &Value) -> Result<bool, String> {
    match value {
        Value::Bool(flag) => Ok(*flag),
        Value::Number(number) => match number.as_i64() {
            Some(1) => Ok(true),
            Some(0) => Ok(false),
            _ => Err("Must be a valid boolean.".to_string()),
        },
        Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "on" | "yes" => Ok(true),
            "false" | "0" | "off" | "no" => Ok(false),
            _ => Err("Must be a valid boolean.".to_string()),
        },
        _ => Err("Must be a valid boolean.".to_string()),
    }
}

pub fn integer(value: &Value) -> Result<i64, String> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| {
                number
                    .as_f64()
                    .filter(|float| float.fract() == 0.0 && float.abs() < i64::MAX as f64)
                    .map(|float| float as i64)
            })
            .ok_or_else(|| "A valid integer is required.".to_string()),
        Value::String(text) => text
            .trim()
            .parse::<i64>()
            .map_err(|_| "A valid integer is required.".to_string()),
        _ => Err("A valid integer is required.".to_string()),
    }
}

/// Decimal with at most `decimal_places` fractional digits and `max_digits` in total
pub fn decimal(value: &Value, max_digits: u32, decimal_places: u32) -> Result<Decimal, String> {
    let parsed = match value {
        Value::Number(number) => Decimal::from_str(&number.to_string()).ok(),
        Value::String(text) => Decimal::from_str(text.trim()).ok(),
        _ => None,
    }
    .ok_or_else(|| "A valid number is required.".to_string())?;

    let normalized = parsed.normalize();
    if normalized.scale() > decimal_places {
        return Err(format!(
            "Ensure that there are no more than {} decimal places.",
            decimal_places
        ));
    }

    let integer_digits = normalized.trunc().abs().to_string().trim_start_matches('0').len() as u32;
    if integer_digits > max_digits - decimal_places {
        return Err(format!(
            "Ensure that there are no more than {} digits before the decimal point.",
            max_digits - decimal_places
        ));
    }

    Ok(normalized)
}

/// Text value; numbers are accepted and rendered as text
pub fn text(value: &Value) -> Result<String, String> {
    match value {
        Value::String(text) => Ok(text.clone()),
        Value::Number(number) => Ok(number.to_string()),
        _ => Err("Not a valid string.".to_string()),
    }
}

pub fn max_length(field_value: &str, max_len: usize) -> Result<(), String> {
    if field_value.chars().count() > max_len {
        Err(format!(
            "Ensure this field has no more than {} characters.",
            max_len
        ))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_boolean_from_form_strings() {
        assert_eq!(boolean(&json!("true")), Ok(true));
        assert_eq!(boolean(&json!("on")), Ok(true));
        assert_eq!(boolean(&json!("0")), Ok(false));
        assert_eq!(boolean(&json!(false)), Ok(false));
        assert!(boolean(&json!("maybe")).is_err());
    }

    #[test]
    fn test_integer() {
        assert_eq!(integer(&json!(5)), Ok(5));
        assert_eq!(integer(&json!(" 12 ")), Ok(12));
        assert_eq!(integer(&json!(3.0)), Ok(3));
        assert!(integer(&json!(3.5)).is_err());
        assert!(integer(&json!("x")).is_err());
    }

    #[test]
    fn test_decimal_places_and_digits() {
        assert_eq!(decimal(&json!("8.99"), 10, 2), Ok(Decimal::new(899, 2)));
        assert_eq!(decimal(&json!(10), 10, 2), Ok(Decimal::new(10, 0)));
        assert_eq!(decimal(&json!("2.50"), 10, 2), Ok(Decimal::new(25, 1)));
        assert!(decimal(&json!("1.999"), 10, 2).is_err());
        assert!(decimal(&json!("123456789.00"), 10, 2).is_err());
        assert!(decimal(&json!("abc"), 10, 2).is_err());
    }

    #[test]
    fn test_max_length_counts_characters() {
        assert!(max_length("ñandú", 5).is_ok());
        assert!(max_length("ñandúes", 5).is_err());
    }
}
