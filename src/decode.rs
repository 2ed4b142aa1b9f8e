//! Coercion of raw source values into the normalized form of a [`FieldKind`].
//!
//! Every source (defaults, file, environment, flags) funnels its raw values
//! through [`decode`], so a field has the same textual syntax everywhere.
//! The output is a [`Value`] that the target's `Deserialize` implementation
//! accepts for that kind: durations become serde's `{secs, nanos}` form and
//! byte lists become arrays of integers.

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde_json::{json, Value};
use thiserror::Error;

use crate::schema::FieldKind;


#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("expected {expected}, found {found}")]
    Mismatch { expected: FieldKind, found: String },

    #[error("{value} is out of range for {kind}")]
    OutOfRange { kind: FieldKind, value: String },

    #[error("{value} is not a finite {kind}")]
    NonFinite { kind: FieldKind, value: String },

    #[error("invalid duration \"{value}\"")]
    Duration {
        value: String,
        #[source]
        source: humantime::DurationError,
    },

    #[error("invalid base64 data")]
    Base64(#[from] base64::DecodeError),

    #[error("invalid list literal")]
    ListLiteral(#[source] serde_json::Error),
}


/// The value a field has when no source sets it.
pub fn zero_value(kind: FieldKind) -> Value {
    match kind {
        FieldKind::Bool => Value::Bool(false),
        FieldKind::String => Value::String(String::new()),
        FieldKind::Duration => duration_value(Duration::ZERO),
        FieldKind::Bytes | FieldKind::StringList => Value::Array(Vec::new()),
        kind if kind.is_float() => json!(0.0),
        _ => json!(0),
    }
}

/// Whether `value` is the zero value of `kind`, or missing altogether.
pub fn is_zero(kind: FieldKind, value: &Value) -> bool {
    match value {
        Value::Number(number) => number.as_f64() == Some(0.0),
        other => *other == zero_value(kind) || other.is_null(),
    }
}

/// serde's native representation of a [`Duration`].
pub fn duration_value(duration: Duration) -> Value {
    json!({
        "secs": duration.as_secs(),
        "nanos": duration.subsec_nanos(),
    })
}

/// Decode a textual value, as found in environment variables and flags.
pub fn decode_text(kind: FieldKind, text: &str) -> Result<Value, DecodeError> {
    decode(kind, &Value::String(text.to_string()))
}

/// Decode a declared default literal.
///
/// Same as [`decode_text`], except that string lists may also be written
/// as a JSON array literal (`["a", "b"]`).
pub fn decode_default(kind: FieldKind, literal: &str) -> Result<Value, DecodeError> {
    if kind == FieldKind::StringList && literal.trim_start().starts_with('[') {
        let items: Vec<String> =
            serde_json::from_str(literal).map_err(DecodeError::ListLiteral)?;
        return Ok(json!(items));
    }

    decode_text(kind, literal)
}

pub fn decode(kind: FieldKind, value: &Value) -> Result<Value, DecodeError> {
    if value.is_null() {
        return Ok(zero_value(kind));
    }

    match kind {
        FieldKind::Bool => decode_bool(value).map(Value::Bool),
        FieldKind::String => decode_string(kind, value).map(Value::String),
        FieldKind::Duration => decode_duration(value).map(duration_value),
        FieldKind::Bytes => decode_bytes(value).map(|bytes| json!(bytes)),
        FieldKind::StringList => decode_string_list(value).map(|items| json!(items)),
        kind if kind.is_float() => decode_float(kind, value).map(|float| json!(float)),
        kind if kind.is_signed_integer() => decode_signed(kind, value).map(|int| json!(int)),
        kind => decode_unsigned(kind, value).map(|int| json!(int)),
    }
}


fn mismatch(expected: FieldKind, value: &Value) -> DecodeError {
    DecodeError::Mismatch {
        expected,
        found: describe(value),
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::Null => "nothing".to_string(),
        Value::Bool(boolean) => format!("boolean {boolean}"),
        Value::Number(number) => format!("number {number}"),
        Value::String(text) => format!("\"{text}\""),
        Value::Array(_) => "a list".to_string(),
        Value::Object(_) => "a map".to_string(),
    }
}

fn decode_bool(value: &Value) -> Result<bool, DecodeError> {
    match value {
        Value::Bool(boolean) => Ok(*boolean),
        Value::Number(number) => match number.as_u64() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(mismatch(FieldKind::Bool, value)),
        },
        Value::String(text) => match text.as_str() {
            "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
            "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
            _ => Err(mismatch(FieldKind::Bool, value)),
        },
        _ => Err(mismatch(FieldKind::Bool, value)),
    }
}

fn decode_string(kind: FieldKind, value: &Value) -> Result<String, DecodeError> {
    match value {
        Value::String(text) => Ok(text.clone()),
        Value::Number(number) => Ok(number.to_string()),
        Value::Bool(boolean) => Ok(boolean.to_string()),
        _ => Err(mismatch(kind, value)),
    }
}

fn decode_signed(kind: FieldKind, value: &Value) -> Result<i64, DecodeError> {
    let out_of_range = || DecodeError::OutOfRange {
        kind,
        value: match value {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        },
    };

    let parsed = match value {
        Value::Number(number) => match number.as_i64() {
            Some(int) => int,
            None if number.is_u64() => return Err(out_of_range()),
            None => return Err(mismatch(kind, value)),
        },
        Value::String(text) => match text.parse::<i128>() {
            Ok(int) => i64::try_from(int).map_err(|_| out_of_range())?,
            Err(_) => return Err(mismatch(kind, value)),
        },
        _ => return Err(mismatch(kind, value)),
    };

    match kind.signed_range() {
        Some((min, max)) if (min..=max).contains(&parsed) => Ok(parsed),
        _ => Err(out_of_range()),
    }
}

fn decode_unsigned(kind: FieldKind, value: &Value) -> Result<u64, DecodeError> {
    let out_of_range = || DecodeError::OutOfRange {
        kind,
        value: match value {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        },
    };

    let parsed = match value {
        Value::Number(number) => match number.as_u64() {
            Some(int) => int,
            None if number.is_i64() => return Err(out_of_range()),
            None => return Err(mismatch(kind, value)),
        },
        Value::String(text) => match text.parse::<i128>() {
            Ok(int) => u64::try_from(int).map_err(|_| out_of_range())?,
            Err(_) => return Err(mismatch(kind, value)),
        },
        _ => return Err(mismatch(kind, value)),
    };

    match kind.unsigned_max() {
        Some(max) if parsed <= max => Ok(parsed),
        _ => Err(out_of_range()),
    }
}

fn decode_float(kind: FieldKind, value: &Value) -> Result<f64, DecodeError> {
    let float = match value {
        Value::Number(number) => number.as_f64().ok_or_else(|| mismatch(kind, value))?,
        Value::String(text) => text.trim().parse::<f64>().map_err(|_| mismatch(kind, value))?,
        _ => return Err(mismatch(kind, value)),
    };

    // JSON has no representation for infinities or NaN.
    if !float.is_finite() {
        return Err(DecodeError::NonFinite {
            kind,
            value: describe(value),
        });
    }

    if kind == FieldKind::F32 && float.abs() > f64::from(f32::MAX) {
        return Err(DecodeError::OutOfRange {
            kind,
            value: float.to_string(),
        });
    }

    Ok(float)
}

fn decode_duration(value: &Value) -> Result<Duration, DecodeError> {
    match value {
        Value::String(text) => {
            humantime::parse_duration(text.trim()).map_err(|source| DecodeError::Duration {
                value: text.clone(),
                source,
            })
        }
        // Integers are nanoseconds.
        Value::Number(number) => match number.as_u64() {
            Some(nanoseconds) => Ok(Duration::from_nanos(nanoseconds)),
            None if number.is_i64() => Err(DecodeError::OutOfRange {
                kind: FieldKind::Duration,
                value: number.to_string(),
            }),
            None => Err(mismatch(FieldKind::Duration, value)),
        },
        _ => Err(mismatch(FieldKind::Duration, value)),
    }
}

fn decode_bytes(value: &Value) -> Result<Vec<u8>, DecodeError> {
    match value {
        Value::String(text) => Ok(BASE64.decode(text.trim())?),
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_u64()
                    .and_then(|byte| u8::try_from(byte).ok())
                    .ok_or_else(|| mismatch(FieldKind::Bytes, item))
            })
            .collect(),
        _ => Err(mismatch(FieldKind::Bytes, value)),
    }
}

fn decode_string_list(value: &Value) -> Result<Vec<String>, DecodeError> {
    match value {
        Value::String(text) if text.is_empty() => Ok(Vec::new()),
        Value::String(text) => Ok(text.split(',').map(str::to_string).collect()),
        Value::Array(items) => items
            .iter()
            .map(|item| decode_string(FieldKind::StringList, item))
            .collect(),
        _ => Err(mismatch(FieldKind::StringList, value)),
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn booleans_accept_the_usual_spellings() {
        assert_eq!(decode_text(FieldKind::Bool, "True").unwrap(), json!(true));
        assert_eq!(decode_text(FieldKind::Bool, "0").unwrap(), json!(false));
        assert_eq!(decode(FieldKind::Bool, &json!(1)).unwrap(), json!(true));
        assert!(decode_text(FieldKind::Bool, "maybe").is_err());
    }

    #[test]
    fn integers_are_range_checked_per_width() {
        assert_eq!(decode_text(FieldKind::I8, "-128").unwrap(), json!(-128));
        assert!(matches!(
            decode_text(FieldKind::I8, "128"),
            Err(DecodeError::OutOfRange { .. })
        ));
        assert!(matches!(
            decode(FieldKind::U16, &json!(-1)),
            Err(DecodeError::OutOfRange { .. })
        ));
        assert_eq!(
            decode_text(FieldKind::U64, "18446744073709551615").unwrap(),
            json!(u64::MAX)
        );
        assert!(matches!(
            decode_text(FieldKind::I32, "ten"),
            Err(DecodeError::Mismatch { .. })
        ));
    }

    #[test]
    fn floats_from_text_and_numbers() {
        assert_eq!(decode_text(FieldKind::F64, "1.1").unwrap(), json!(1.1));
        assert_eq!(decode(FieldKind::F32, &json!(2)).unwrap(), json!(2.0));
    }

    #[test]
    fn non_finite_floats_are_rejected() {
        for text in ["inf", "-inf", "NaN", "infinity"] {
            assert!(
                matches!(
                    decode_text(FieldKind::F64, text),
                    Err(DecodeError::NonFinite { .. })
                ),
                "{text}"
            );
        }

        assert!(matches!(
            decode_text(FieldKind::F32, "1e300"),
            Err(DecodeError::OutOfRange { .. })
        ));
        assert_eq!(decode_text(FieldKind::F64, "1e300").unwrap(), json!(1e300));
    }

    #[test]
    fn durations_accept_humantime_and_nanoseconds() {
        assert_eq!(
            decode_text(FieldKind::Duration, "1m").unwrap(),
            json!({ "secs": 60, "nanos": 0 })
        );
        assert_eq!(
            decode_text(FieldKind::Duration, "1h30m").unwrap(),
            json!({ "secs": 5400, "nanos": 0 })
        );
        assert_eq!(
            decode(FieldKind::Duration, &json!(1_500_000_000u64)).unwrap(),
            json!({ "secs": 1, "nanos": 500_000_000 })
        );
        assert!(matches!(
            decode_text(FieldKind::Duration, "soon"),
            Err(DecodeError::Duration { .. })
        ));
    }

    #[test]
    fn bytes_are_base64_text() {
        assert_eq!(
            decode_text(FieldKind::Bytes, "dGVzdA==").unwrap(),
            json!(b"test".to_vec())
        );
        assert!(matches!(
            decode_text(FieldKind::Bytes, "not base64!"),
            Err(DecodeError::Base64(_))
        ));
        assert!(decode(FieldKind::Bytes, &json!([1, 256])).is_err());
    }

    #[test]
    fn string_lists_split_on_commas() {
        assert_eq!(
            decode_text(FieldKind::StringList, "a,b,c").unwrap(),
            json!(["a", "b", "c"])
        );
        assert_eq!(decode_text(FieldKind::StringList, "").unwrap(), json!([]));
        assert_eq!(
            decode(FieldKind::StringList, &json!(["x", 1])).unwrap(),
            json!(["x", "1"])
        );
    }

    #[test]
    fn list_defaults_may_be_json_literals() {
        assert_eq!(
            decode_default(FieldKind::StringList, "[\"default\"]").unwrap(),
            json!(["default"])
        );
        assert_eq!(
            decode_default(FieldKind::StringList, "a,b").unwrap(),
            json!(["a", "b"])
        );
    }

    #[test]
    fn strings_render_scalars_as_text() {
        assert_eq!(decode(FieldKind::String, &json!(10)).unwrap(), json!("10"));
        assert!(decode(FieldKind::String, &json!({ "a": 1 })).is_err());
    }

    #[test]
    fn null_becomes_the_zero_value() {
        assert_eq!(decode(FieldKind::U8, &Value::Null).unwrap(), json!(0));
        assert_eq!(decode(FieldKind::StringList, &Value::Null).unwrap(), json!([]));
    }
}
