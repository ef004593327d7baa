// Constraints - The fixed validation vocabulary of the Web Thing protocol
//
// Bounds are stored as JSON numbers exactly as declared; the runtime converts
// them to the property's native type when it compiles a validator.

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value as JsonValue};

/// Numbers accepted by the constraint builders
pub trait IntoBound {
    fn into_bound(self) -> Number;
}

macro_rules! int_bound {
    ($($t:ty),*) => {
        $(impl IntoBound for $t {
            fn into_bound(self) -> Number {
                Number::from(self)
            }
        })*
    };
}

int_bound!(i8, i16, i32, i64, u8, u16, u32, u64);

impl IntoBound for f64 {
    fn into_bound(self) -> Number {
        // Non-finite bounds cannot be expressed in JSON
        Number::from_f64(self).unwrap_or_else(|| Number::from(0))
    }
}

impl IntoBound for f32 {
    fn into_bound(self) -> Number {
        let widened: f64 = self.to_string().parse().unwrap_or(self as f64);
        widened.into_bound()
    }
}

/// Declared constraints of a property or action parameter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Constraints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclusive_minimum: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclusive_maximum: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiple_of: Option<Number>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "length_bound"
    )]
    pub min_length: Option<usize>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "length_bound"
    )]
    pub max_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Allowed values; a `null` entry is the only way a constrained value accepts null
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub enumeration: Option<Vec<JsonValue>>,
    /// Accept null when no enum is declared
    #[serde(default, skip_serializing_if = "is_false")]
    pub nullable: bool,
}

/// Lengths are read through `Number` so they survive being buffered by a
/// flattened parent
fn length_bound<'de, D>(deserializer: D) -> Result<Option<usize>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let Some(n) = Option::<Number>::deserialize(deserializer)? else {
        return Ok(None);
    };
    n.as_u64()
        .and_then(|len| usize::try_from(len).ok())
        .map(Some)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid length bound: {}", n)))
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl Constraints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn minimum(mut self, n: impl IntoBound) -> Self {
        self.minimum = Some(n.into_bound());
        self
    }

    pub fn maximum(mut self, n: impl IntoBound) -> Self {
        self.maximum = Some(n.into_bound());
        self
    }

    pub fn exclusive_minimum(mut self, n: impl IntoBound) -> Self {
        self.exclusive_minimum = Some(n.into_bound());
        self
    }

    pub fn exclusive_maximum(mut self, n: impl IntoBound) -> Self {
        self.exclusive_maximum = Some(n.into_bound());
        self
    }

    pub fn multiple_of(mut self, n: impl IntoBound) -> Self {
        self.multiple_of = Some(n.into_bound());
        self
    }

    pub fn min_length(mut self, len: usize) -> Self {
        self.min_length = Some(len);
        self
    }

    pub fn max_length(mut self, len: usize) -> Self {
        self.max_length = Some(len);
        self
    }

    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    /// Restrict to a fixed set of wire values
    pub fn one_of(mut self, values: Vec<JsonValue>) -> Self {
        self.enumeration = Some(values);
        self
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Whether a null payload passes the nullability gate
    pub fn accepts_null(&self) -> bool {
        match &self.enumeration {
            Some(values) => values.iter().any(JsonValue::is_null),
            None => self.nullable,
        }
    }

    /// Whether any numeric bound is declared
    pub fn has_numeric_bounds(&self) -> bool {
        self.minimum.is_some()
            || self.maximum.is_some()
            || self.exclusive_minimum.is_some()
            || self.exclusive_maximum.is_some()
            || self.multiple_of.is_some()
    }

    /// Whether any string bound is declared
    pub fn has_string_bounds(&self) -> bool {
        self.min_length.is_some() || self.max_length.is_some() || self.pattern.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_null_gate() {
        let plain = Constraints::new();
        assert!(!plain.accepts_null());
        assert!(Constraints::new().nullable(true).accepts_null());

        let with_null = Constraints::new().one_of(vec![json!("a"), JsonValue::Null]);
        assert!(with_null.accepts_null());

        // An enum without null overrides the nullable flag
        let without_null = Constraints::new().nullable(true).one_of(vec![json!("a")]);
        assert!(!without_null.accepts_null());
    }

    #[test]
    fn test_wire_names() {
        let c = Constraints::new()
            .exclusive_minimum(0)
            .multiple_of(0.5)
            .one_of(vec![json!(1)]);
        let value = serde_json::to_value(&c).unwrap();
        assert_eq!(value["exclusiveMinimum"], json!(0));
        assert_eq!(value["multipleOf"], json!(0.5));
        assert_eq!(value["enum"], json!([1]));
        assert!(value.get("nullable").is_none());

        let parsed: Constraints =
            serde_json::from_value(json!({"minLength": 2, "pattern": "^a"})).unwrap();
        assert_eq!(parsed.min_length, Some(2));
        assert_eq!(parsed.pattern.as_deref(), Some("^a"));
    }
}
