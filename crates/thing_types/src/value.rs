//! Native values held by property slots and action inputs
//!
//! Wire input arrives as `serde_json::Value`; the runtime coerces it into a
//! [`ThingValue`] of the declared [`ValueType`](crate::ValueType) before
//! validating and storing it. Rendering back to JSON is lossless for every value
//! that was accepted from the wire.

use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde_json::{Number, Value as JsonValue};
use uuid::Uuid;

/// A value of one of the supported native types
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ThingValue {
    #[default]
    Null,
    Bool(bool),
    /// Any signed integer width
    Int(i64),
    /// Any unsigned integer width
    UInt(u64),
    Float32(f32),
    Float64(f64),
    Decimal(Decimal),
    String(String),
    DateTime(DateTime<Utc>),
    Uuid(Uuid),
    Duration(Duration),
}

impl ThingValue {
    pub fn is_null(&self) -> bool {
        matches!(self, ThingValue::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ThingValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as i64 (unsigned values that fit are converted)
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ThingValue::Int(i) => Some(*i),
            ThingValue::UInt(u) => i64::try_from(*u).ok(),
            _ => None,
        }
    }

    /// Get as f64 (integers and decimals are converted)
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ThingValue::Int(i) => Some(*i as f64),
            ThingValue::UInt(u) => Some(*u as f64),
            ThingValue::Float32(f) => Some(shortest_f64(*f)),
            ThingValue::Float64(f) => Some(*f),
            ThingValue::Decimal(d) => d.to_string().parse().ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ThingValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            ThingValue::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            ThingValue::Uuid(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            ThingValue::Duration(d) => Some(*d),
            _ => None,
        }
    }

    /// Render this value in its wire representation
    pub fn to_json(&self) -> JsonValue {
        match self {
            ThingValue::Null => JsonValue::Null,
            ThingValue::Bool(b) => JsonValue::Bool(*b),
            ThingValue::Int(i) => JsonValue::Number(Number::from(*i)),
            ThingValue::UInt(u) => JsonValue::Number(Number::from(*u)),
            ThingValue::Float32(f) => float_json(shortest_f64(*f)),
            ThingValue::Float64(f) => float_json(*f),
            ThingValue::Decimal(d) => decimal_json(d),
            ThingValue::String(s) => JsonValue::String(s.clone()),
            ThingValue::DateTime(dt) => {
                JsonValue::String(dt.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            ThingValue::Uuid(id) => JsonValue::String(id.to_string()),
            ThingValue::Duration(d) => {
                JsonValue::String(humantime::format_duration(*d).to_string())
            }
        }
    }
}

/// Widen an f32 through its shortest decimal form, so 0.1f32 renders as 0.1
fn shortest_f64(f: f32) -> f64 {
    f.to_string().parse().unwrap_or(f as f64)
}

/// Exact decimal text as a JSON number; `5` stays `5`, not `5.0`
fn decimal_json(d: &Decimal) -> JsonValue {
    let text = d.normalize().to_string();
    match serde_json::from_str::<Number>(&text) {
        Ok(n) => JsonValue::Number(n),
        Err(_) => JsonValue::String(text),
    }
}

fn float_json(f: f64) -> JsonValue {
    Number::from_f64(f)
        .map(JsonValue::Number)
        .unwrap_or(JsonValue::Null)
}

impl From<bool> for ThingValue {
    fn from(b: bool) -> Self {
        ThingValue::Bool(b)
    }
}

impl From<i64> for ThingValue {
    fn from(i: i64) -> Self {
        ThingValue::Int(i)
    }
}

impl From<f64> for ThingValue {
    fn from(f: f64) -> Self {
        ThingValue::Float64(f)
    }
}

impl From<&str> for ThingValue {
    fn from(s: &str) -> Self {
        ThingValue::String(s.to_string())
    }
}

impl From<String> for ThingValue {
    fn from(s: String) -> Self {
        ThingValue::String(s)
    }
}

impl std::fmt::Display for ThingValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::str::FromStr;

    #[test]
    fn test_float32_renders_shortest() {
        assert_eq!(ThingValue::Float32(0.1).to_json(), json!(0.1));
        assert_eq!(ThingValue::Float64(2.5).to_json(), json!(2.5));
    }

    #[test]
    fn test_textual_rendering() {
        let dt = DateTime::parse_from_rfc3339("2024-03-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(
            ThingValue::DateTime(dt).to_json(),
            json!("2024-03-01T12:00:00Z")
        );
        assert_eq!(
            ThingValue::Duration(Duration::from_millis(1500)).to_json(),
            json!("1s 500ms")
        );
        assert_eq!(
            ThingValue::Decimal(Decimal::from_str("12.25").unwrap()).to_json(),
            json!(12.25)
        );
    }

    #[test]
    fn test_decimal_renders_exactly() {
        let decimal = |s: &str| ThingValue::Decimal(Decimal::from_str(s).unwrap()).to_json();
        assert_eq!(decimal("5"), json!(5));
        assert_eq!(decimal("5.000"), json!(5));
        assert_eq!(decimal("9007199254740993"), json!(9007199254740993u64));
        assert_eq!(decimal("-0.1").to_string(), "-0.1");
        assert_eq!(
            decimal("123456789.123456789").to_string(),
            "123456789.123456789"
        );
    }

    #[test]
    fn test_numeric_accessors() {
        assert_eq!(ThingValue::UInt(7).as_i64(), Some(7));
        assert_eq!(ThingValue::UInt(u64::MAX).as_i64(), None);
        assert_eq!(ThingValue::Int(-3).as_f64(), Some(-3.0));
        assert_eq!(ThingValue::Null.as_bool(), None);
    }
}
