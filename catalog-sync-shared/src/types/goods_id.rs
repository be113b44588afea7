//! Goods id normalization for change-event payloads.
//!
//! The replication stream serializes the `id` column inconsistently: as a JSON
//! float, a JSON integer or a decimal string. Every handler goes through
//! [`parse_goods_id`] so all three spellings land on the same canonical id.

use serde_json::Value;
use thiserror::Error;

/// Why an id value could not be turned into a goods id.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GoodsIdError {
    /// The string contains something other than ASCII digits.
    #[error("invalid character {found:?} in goods id {value:?}")]
    InvalidCharacter { value: String, found: char },

    /// The string is empty.
    #[error("empty goods id")]
    Empty,

    /// The value does not fit in an unsigned 64-bit id.
    #[error("goods id {0} is out of range")]
    OutOfRange(String),

    /// The number has a fractional part.
    #[error("goods id {0} is not a whole number")]
    Fractional(f64),

    /// The JSON type cannot carry an id (bool, null, array, object).
    #[error("unsupported goods id type: {0}")]
    UnsupportedType(String),
}

/// Parse an id column value into a canonical goods id.
///
/// Accepts non-negative JSON integers, whole non-negative floats (`123.0`) and
/// strings made only of ASCII digits (`"123"`).
pub fn parse_goods_id(value: &Value) -> Result<u64, GoodsIdError> {
    match value {
        Value::Number(number) => {
            if let Some(id) = number.as_u64() {
                return Ok(id);
            }
            if number.is_i64() {
                return Err(GoodsIdError::OutOfRange(number.to_string()));
            }
            match number.as_f64() {
                Some(float) => parse_float(float),
                None => Err(GoodsIdError::OutOfRange(number.to_string())),
            }
        }
        Value::String(text) => parse_digits(text),
        Value::Null => Err(GoodsIdError::UnsupportedType("null".to_string())),
        Value::Bool(_) => Err(GoodsIdError::UnsupportedType("bool".to_string())),
        Value::Array(_) => Err(GoodsIdError::UnsupportedType("array".to_string())),
        Value::Object(_) => Err(GoodsIdError::UnsupportedType("object".to_string())),
    }
}

fn parse_float(float: f64) -> Result<u64, GoodsIdError> {
    if !float.is_finite() || float < 0.0 || float >= u64::MAX as f64 {
        return Err(GoodsIdError::OutOfRange(float.to_string()));
    }
    if float.fract() != 0.0 {
        return Err(GoodsIdError::Fractional(float));
    }
    Ok(float as u64)
}

fn parse_digits(text: &str) -> Result<u64, GoodsIdError> {
    if text.is_empty() {
        return Err(GoodsIdError::Empty);
    }
    if let Some(found) = text.chars().find(|c| !c.is_ascii_digit()) {
        return Err(GoodsIdError::InvalidCharacter {
            value: text.to_string(),
            found,
        });
    }
    text.parse::<u64>()
        .map_err(|_| GoodsIdError::OutOfRange(text.to_string()))
}
