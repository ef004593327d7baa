// Value Bindings - Compiled coercion and validation for one declared value
//
// A binding is built once per property or action parameter. Coercion turns
// untyped JSON into the declared native type; the validator is a fixed list of
// checks run in declaration order:
//
//   minimum -> maximum -> exclusiveMinimum -> exclusiveMaximum -> multipleOf
//   minLength -> maxLength -> pattern
//   enum
//
// The first failing check wins.

use std::borrow::Cow;
use std::fmt::Display;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use regex::Regex;
use rust_decimal::Decimal;
use serde_json::{Number, Value as JsonValue};
use thing_types::{Constraints, ThingValue, ValueType};
use uuid::Uuid;

use crate::error::{CompileError, ValidationError};

type Coercer = Box<dyn Fn(&JsonValue) -> Result<ThingValue, ValidationError> + Send + Sync>;
type Check = Box<dyn Fn(&ThingValue) -> Result<(), ValidationError> + Send + Sync>;

// ─────────────────────────────────────────────────────────────────────────────
// Value Binding
// ─────────────────────────────────────────────────────────────────────────────

/// Compiled coercion and validator for a declared value
pub struct ValueBinding {
    name: String,
    value_type: ValueType,
    constraints: Constraints,
    accepts_null: bool,
    coerce: Coercer,
    checks: Vec<Check>,
}

impl ValueBinding {
    /// Compile a binding. Returns `Ok(None)` for unsupported types.
    pub fn compile(
        owner: &str,
        name: &str,
        value_type: ValueType,
        constraints: &Constraints,
    ) -> Result<Option<Self>, CompileError> {
        let Some(coerce) = coercer_for(value_type) else {
            return Ok(None);
        };

        let invalid = |reason: String| CompileError::InvalidConstraint {
            owner: owner.to_string(),
            member: name.to_string(),
            reason,
        };

        let mut checks = Vec::new();
        match numeric_domain(value_type) {
            Some(NumericDomain::Exact) => compile_exact_checks(constraints, &mut checks).map_err(invalid)?,
            Some(NumericDomain::Float) => compile_float_checks(constraints, &mut checks).map_err(invalid)?,
            None if constraints.has_numeric_bounds() => {
                return Err(invalid(format!(
                    "numeric constraints do not apply to {}",
                    value_type
                )));
            }
            None => {}
        }

        if value_type.is_textual() {
            compile_text_checks(constraints, &mut checks).map_err(invalid)?;
        } else if constraints.has_string_bounds() {
            return Err(invalid(format!(
                "string constraints do not apply to {}",
                value_type
            )));
        }

        if let Some(values) = &constraints.enumeration {
            let mut allowed = Vec::with_capacity(values.len());
            for entry in values.iter().filter(|v| !v.is_null()) {
                let value = coerce(entry).map_err(|e| {
                    invalid(format!("enum entry {} is not a valid {}: {}", entry, value_type, e))
                })?;
                allowed.push(value);
            }
            checks.push(Box::new(move |value: &ThingValue| {
                if allowed.iter().any(|a| a == value) {
                    Ok(())
                } else {
                    Err(ValidationError::NotInEnum {
                        value: value.to_string(),
                    })
                }
            }));
        }

        Ok(Some(Self {
            name: name.to_string(),
            value_type,
            accepts_null: constraints.accepts_null(),
            constraints: constraints.clone(),
            coerce,
            checks,
        }))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn constraints(&self) -> &Constraints {
        &self.constraints
    }

    pub fn accepts_null(&self) -> bool {
        self.accepts_null
    }

    /// Coerce and validate a wire value
    pub fn convert(&self, json: &JsonValue) -> Result<ThingValue, ValidationError> {
        if json.is_null() {
            return if self.accepts_null {
                Ok(ThingValue::Null)
            } else {
                Err(ValidationError::NullNotAllowed)
            };
        }
        let value = (self.coerce)(json)?;
        self.validate(&value)?;
        Ok(value)
    }

    /// Run the compiled validator against an already typed value
    pub fn validate(&self, value: &ThingValue) -> Result<(), ValidationError> {
        if value.is_null() {
            return if self.accepts_null {
                Ok(())
            } else {
                Err(ValidationError::NullNotAllowed)
            };
        }
        self.checks.iter().try_for_each(|check| check(value))
    }

    /// Value a slot holds before anything was written
    pub fn zero_value(&self) -> ThingValue {
        if self.accepts_null {
            return ThingValue::Null;
        }
        match self.value_type {
            ValueType::Boolean => ThingValue::Bool(false),
            t if t.is_signed_integer() => ThingValue::Int(0),
            t if t.is_unsigned_integer() => ThingValue::UInt(0),
            ValueType::Float32 => ThingValue::Float32(0.0),
            ValueType::Float64 => ThingValue::Float64(0.0),
            ValueType::Decimal => ThingValue::Decimal(Decimal::ZERO),
            ValueType::String => ThingValue::String(String::new()),
            ValueType::DateTime => ThingValue::DateTime(DateTime::<Utc>::UNIX_EPOCH),
            ValueType::Uuid => ThingValue::Uuid(Uuid::nil()),
            ValueType::Duration => ThingValue::Duration(std::time::Duration::ZERO),
            _ => ThingValue::Null,
        }
    }

    /// JSON-schema fragment describing this value
    pub fn schema(&self) -> serde_json::Map<String, JsonValue> {
        let mut schema = match serde_json::to_value(&self.constraints) {
            Ok(JsonValue::Object(map)) => map,
            _ => serde_json::Map::new(),
        };
        schema.remove("nullable");
        schema.insert("type".into(), JsonValue::from(self.value_type.json_type()));
        if let Some(format) = self.value_type.json_format() {
            schema.insert("format".into(), JsonValue::from(format));
        }
        schema
    }
}

impl std::fmt::Debug for ValueBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValueBinding")
            .field("name", &self.name)
            .field("value_type", &self.value_type)
            .field("checks", &self.checks.len())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Coercion
// ─────────────────────────────────────────────────────────────────────────────

fn json_kind(json: &JsonValue) -> &'static str {
    match json {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

fn mismatch(expected: ValueType, json: &JsonValue) -> ValidationError {
    ValidationError::TypeMismatch {
        expected,
        found: json_kind(json),
    }
}

fn coercer_for(value_type: ValueType) -> Option<Coercer> {
    let coercer: Coercer = match value_type {
        ValueType::Boolean => Box::new(|json| {
            json.as_bool()
                .map(ThingValue::Bool)
                .ok_or_else(|| mismatch(ValueType::Boolean, json))
        }),
        t if t.is_integer() => {
            let (min, max) = t.integer_range()?;
            Box::new(move |json| coerce_integer(t, min, max, json))
        }
        ValueType::Float32 => Box::new(|json| {
            let f = json
                .as_f64()
                .ok_or_else(|| mismatch(ValueType::Float32, json))?;
            if !f.is_finite() || f.abs() > f32::MAX as f64 {
                return Err(ValidationError::OutOfRange {
                    expected: ValueType::Float32,
                    value: json.to_string(),
                });
            }
            Ok(ThingValue::Float32(f as f32))
        }),
        ValueType::Float64 => Box::new(|json| {
            json.as_f64()
                .map(ThingValue::Float64)
                .ok_or_else(|| mismatch(ValueType::Float64, json))
        }),
        ValueType::Decimal => Box::new(|json| {
            let JsonValue::Number(n) = json else {
                return Err(mismatch(ValueType::Decimal, json));
            };
            decimal_from_number(n)
                .map(ThingValue::Decimal)
                .ok_or_else(|| ValidationError::OutOfRange {
                    expected: ValueType::Decimal,
                    value: n.to_string(),
                })
        }),
        ValueType::String => Box::new(|json| {
            json.as_str()
                .map(|s| ThingValue::String(s.to_string()))
                .ok_or_else(|| mismatch(ValueType::String, json))
        }),
        ValueType::DateTime => Box::new(|json| {
            let text = json
                .as_str()
                .ok_or_else(|| mismatch(ValueType::DateTime, json))?;
            DateTime::parse_from_rfc3339(text)
                .map(|dt| ThingValue::DateTime(dt.with_timezone(&Utc)))
                .map_err(|e| ValidationError::Unparsable {
                    expected: ValueType::DateTime,
                    reason: e.to_string(),
                })
        }),
        ValueType::Uuid => Box::new(|json| {
            let text = json.as_str().ok_or_else(|| mismatch(ValueType::Uuid, json))?;
            Uuid::parse_str(text)
                .map(ThingValue::Uuid)
                .map_err(|e| ValidationError::Unparsable {
                    expected: ValueType::Uuid,
                    reason: e.to_string(),
                })
        }),
        ValueType::Duration => Box::new(|json| {
            let text = json
                .as_str()
                .ok_or_else(|| mismatch(ValueType::Duration, json))?;
            humantime::parse_duration(text)
                .map(ThingValue::Duration)
                .map_err(|e| ValidationError::Unparsable {
                    expected: ValueType::Duration,
                    reason: e.to_string(),
                })
        }),
        _ => return None,
    };
    Some(coercer)
}

fn coerce_integer(
    value_type: ValueType,
    min: i128,
    max: i128,
    json: &JsonValue,
) -> Result<ThingValue, ValidationError> {
    let JsonValue::Number(n) = json else {
        return Err(mismatch(value_type, json));
    };
    let wide = if let Some(i) = n.as_i64() {
        i as i128
    } else if let Some(u) = n.as_u64() {
        u as i128
    } else {
        return Err(ValidationError::TypeMismatch {
            expected: value_type,
            found: "fractional number",
        });
    };
    if wide < min || wide > max {
        return Err(ValidationError::OutOfRange {
            expected: value_type,
            value: n.to_string(),
        });
    }
    if value_type.is_signed_integer() {
        Ok(ThingValue::Int(wide as i64))
    } else {
        Ok(ThingValue::UInt(wide as u64))
    }
}

/// Parse the number's literal text; numbers keep their wire digits
fn decimal_from_number(n: &Number) -> Option<Decimal> {
    let text = n.to_string();
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

// ─────────────────────────────────────────────────────────────────────────────
// Numeric Checks
// ─────────────────────────────────────────────────────────────────────────────

/// Arithmetic used for bounds and multipleOf
enum NumericDomain {
    /// Integers and decimals: exact decimal arithmetic
    Exact,
    /// Binary floating point
    Float,
}

fn numeric_domain(value_type: ValueType) -> Option<NumericDomain> {
    match value_type {
        t if t.is_integer() => Some(NumericDomain::Exact),
        ValueType::Decimal => Some(NumericDomain::Exact),
        ValueType::Float32 | ValueType::Float64 => Some(NumericDomain::Float),
        _ => None,
    }
}

fn exact_of(value: &ThingValue) -> Option<Decimal> {
    match value {
        ThingValue::Int(i) => Some(Decimal::from(*i)),
        ThingValue::UInt(u) => Some(Decimal::from(*u)),
        ThingValue::Decimal(d) => Some(*d),
        _ => None,
    }
}

fn float_of(value: &ThingValue) -> Option<f64> {
    match value {
        ThingValue::Float32(_) | ThingValue::Float64(_) => value.as_f64(),
        _ => None,
    }
}

type Compare<T> = fn(T, T) -> bool;
type Describe = fn(String, String) -> ValidationError;

/// A single comparison against a compiled bound
fn bound_check<T>(bound: T, extract: fn(&ThingValue) -> Option<T>, ok: Compare<T>, fail: Describe) -> Check
where
    T: Copy + Display + Send + Sync + 'static,
{
    Box::new(move |value| match extract(value) {
        Some(v) if !ok(v, bound) => Err(fail(v.to_string(), bound.to_string())),
        _ => Ok(()),
    })
}

/// The four bound checks, in validation order
fn bound_checks<T>(
    bounds: [Option<T>; 4],
    extract: fn(&ThingValue) -> Option<T>,
    checks: &mut Vec<Check>,
) where
    T: Copy + Display + PartialOrd + Send + Sync + 'static,
{
    let [minimum, maximum, exclusive_minimum, exclusive_maximum] = bounds;
    if let Some(b) = minimum {
        checks.push(bound_check(b, extract, |v, b| v >= b, |value, bound| {
            ValidationError::BelowMinimum { value, bound }
        }));
    }
    if let Some(b) = maximum {
        checks.push(bound_check(b, extract, |v, b| v <= b, |value, bound| {
            ValidationError::AboveMaximum { value, bound }
        }));
    }
    if let Some(b) = exclusive_minimum {
        checks.push(bound_check(b, extract, |v, b| v > b, |value, bound| {
            ValidationError::NotAboveExclusiveMinimum { value, bound }
        }));
    }
    if let Some(b) = exclusive_maximum {
        checks.push(bound_check(b, extract, |v, b| v < b, |value, bound| {
            ValidationError::NotBelowExclusiveMaximum { value, bound }
        }));
    }
}

fn compile_exact_checks(constraints: &Constraints, checks: &mut Vec<Check>) -> Result<(), String> {
    let convert = |bound: &Option<Number>| -> Result<Option<Decimal>, String> {
        bound
            .as_ref()
            .map(|n| decimal_from_number(n).ok_or_else(|| format!("bound {} is out of range", n)))
            .transpose()
    };

    bound_checks(
        [
            convert(&constraints.minimum)?,
            convert(&constraints.maximum)?,
            convert(&constraints.exclusive_minimum)?,
            convert(&constraints.exclusive_maximum)?,
        ],
        exact_of,
        checks,
    );

    if let Some(factor) = convert(&constraints.multiple_of)? {
        if factor <= Decimal::ZERO {
            return Err(format!("multipleOf must be positive, got {}", factor));
        }
        // Integers go through the same exact remainder, which is plain modulo for them
        checks.push(Box::new(move |value| match exact_of(value) {
            Some(v) if !(v % factor).is_zero() => Err(ValidationError::NotMultipleOf {
                value: v.to_string(),
                factor: factor.to_string(),
            }),
            _ => Ok(()),
        }));
    }
    Ok(())
}

fn compile_float_checks(constraints: &Constraints, checks: &mut Vec<Check>) -> Result<(), String> {
    let convert = |bound: &Option<Number>| -> Result<Option<f64>, String> {
        bound
            .as_ref()
            .map(|n| n.as_f64().ok_or_else(|| format!("bound {} is not a number", n)))
            .transpose()
    };

    bound_checks(
        [
            convert(&constraints.minimum)?,
            convert(&constraints.maximum)?,
            convert(&constraints.exclusive_minimum)?,
            convert(&constraints.exclusive_maximum)?,
        ],
        float_of,
        checks,
    );

    if let Some(factor) = convert(&constraints.multiple_of)? {
        if factor <= 0.0 {
            return Err(format!("multipleOf must be positive, got {}", factor));
        }
        // Exact zero remainder, no tolerance: 0.3 is not a multiple of 0.1 here
        checks.push(Box::new(move |value| match float_of(value) {
            Some(v) if v % factor != 0.0 => Err(ValidationError::NotMultipleOf {
                value: v.to_string(),
                factor: factor.to_string(),
            }),
            _ => Ok(()),
        }));
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// String Checks
// ─────────────────────────────────────────────────────────────────────────────

fn text_of(value: &ThingValue) -> Option<Cow<'_, str>> {
    match value {
        ThingValue::String(s) => Some(Cow::Borrowed(s.as_str())),
        ThingValue::DateTime(_) | ThingValue::Uuid(_) | ThingValue::Duration(_) => {
            match value.to_json() {
                JsonValue::String(s) => Some(Cow::Owned(s)),
                _ => None,
            }
        }
        _ => None,
    }
}

fn compile_text_checks(constraints: &Constraints, checks: &mut Vec<Check>) -> Result<(), String> {
    if let Some(min) = constraints.min_length {
        checks.push(Box::new(move |value| match text_of(value) {
            Some(text) if text.chars().count() < min => Err(ValidationError::TooShort {
                length: text.chars().count(),
                min,
            }),
            _ => Ok(()),
        }));
    }
    if let Some(max) = constraints.max_length {
        checks.push(Box::new(move |value| match text_of(value) {
            Some(text) if text.chars().count() > max => Err(ValidationError::TooLong {
                length: text.chars().count(),
                max,
            }),
            _ => Ok(()),
        }));
    }
    if let Some(pattern) = &constraints.pattern {
        let regex = Regex::new(pattern).map_err(|e| format!("bad pattern {:?}: {}", pattern, e))?;
        checks.push(Box::new(move |value| match text_of(value) {
            Some(text) if !regex.is_match(&text) => Err(ValidationError::PatternMismatch {
                value: text.into_owned(),
                pattern: regex.as_str().to_string(),
            }),
            _ => Ok(()),
        }));
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bind(value_type: ValueType, constraints: Constraints) -> ValueBinding {
        ValueBinding::compile("test", "value", value_type, &constraints)
            .unwrap()
            .unwrap()
    }

    #[test]
    fn test_unsupported_type_is_skipped() {
        let binding =
            ValueBinding::compile("test", "value", ValueType::Unsupported, &Constraints::new())
                .unwrap();
        assert!(binding.is_none());
    }

    #[test]
    fn test_integer_width() {
        let binding = bind(ValueType::UInt8, Constraints::new());
        assert_eq!(binding.convert(&json!(255)).unwrap(), ThingValue::UInt(255));
        assert!(matches!(
            binding.convert(&json!(256)),
            Err(ValidationError::OutOfRange { .. })
        ));
        assert!(matches!(
            binding.convert(&json!(-1)),
            Err(ValidationError::OutOfRange { .. })
        ));
        assert!(matches!(
            binding.convert(&json!(1.5)),
            Err(ValidationError::TypeMismatch { .. })
        ));
        assert!(matches!(
            binding.convert(&json!("7")),
            Err(ValidationError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_inclusive_and_exclusive_minimum() {
        let inclusive = bind(ValueType::Int32, Constraints::new().minimum(10));
        let exclusive = bind(ValueType::Int32, Constraints::new().exclusive_minimum(10));

        assert!(inclusive.convert(&json!(10)).is_ok());
        assert!(matches!(
            exclusive.convert(&json!(10)),
            Err(ValidationError::NotAboveExclusiveMinimum { .. })
        ));
        assert!(exclusive.convert(&json!(11)).is_ok());

        let float_exclusive = bind(ValueType::Float64, Constraints::new().exclusive_maximum(1.5));
        assert!(float_exclusive.convert(&json!(1.25)).is_ok());
        assert!(float_exclusive.convert(&json!(1.5)).is_err());
    }

    #[test]
    fn test_check_order_short_circuits() {
        // 200 violates both maximum and multipleOf; maximum runs first
        let binding = bind(
            ValueType::Int32,
            Constraints::new().maximum(100).multiple_of(3),
        );
        assert!(matches!(
            binding.convert(&json!(200)),
            Err(ValidationError::AboveMaximum { .. })
        ));
        assert!(matches!(
            binding.convert(&json!(50)),
            Err(ValidationError::NotMultipleOf { .. })
        ));
    }

    #[test]
    fn test_multiple_of_per_domain() {
        let ints = bind(ValueType::Int64, Constraints::new().multiple_of(5));
        for k in -3..=3 {
            assert!(ints.convert(&json!(k * 5)).is_ok());
            assert!(ints.convert(&json!(k * 5 + 1)).is_err());
        }

        let decimals = bind(ValueType::Decimal, Constraints::new().multiple_of(0.1));
        assert!(decimals.convert(&json!(0.3)).is_ok());
        assert!(decimals.convert(&json!(0.35)).is_err());

        let floats = bind(ValueType::Float64, Constraints::new().multiple_of(0.5));
        assert!(floats.convert(&json!(2.5)).is_ok());
        assert!(floats.convert(&json!(2.75)).is_err());

        // Exact float remainder: 0.3 % 0.1 is not zero in binary floating point
        let tenths = bind(ValueType::Float64, Constraints::new().multiple_of(0.1));
        assert!(tenths.convert(&json!(0.3)).is_err());
    }

    #[test]
    fn test_invalid_declarations() {
        let zero = ValueBinding::compile(
            "t",
            "v",
            ValueType::Int32,
            &Constraints::new().multiple_of(0),
        );
        assert!(matches!(zero, Err(CompileError::InvalidConstraint { .. })));

        let pattern = ValueBinding::compile(
            "t",
            "v",
            ValueType::String,
            &Constraints::new().pattern("(unclosed"),
        );
        assert!(pattern.is_err());

        let misplaced =
            ValueBinding::compile("t", "v", ValueType::Boolean, &Constraints::new().minimum(1));
        assert!(misplaced.is_err());

        let bad_enum = ValueBinding::compile(
            "t",
            "v",
            ValueType::Int8,
            &Constraints::new().one_of(vec![json!(1), json!("two")]),
        );
        assert!(bad_enum.is_err());
    }

    #[test]
    fn test_string_constraints() {
        let binding = bind(
            ValueType::String,
            Constraints::new().min_length(2).max_length(4).pattern("^[a-z]+$"),
        );
        assert!(binding.convert(&json!("abc")).is_ok());
        assert!(matches!(
            binding.convert(&json!("a")),
            Err(ValidationError::TooShort { length: 1, min: 2 })
        ));
        assert!(matches!(
            binding.convert(&json!("abcde")),
            Err(ValidationError::TooLong { length: 5, max: 4 })
        ));
        assert!(matches!(
            binding.convert(&json!("AB")),
            Err(ValidationError::PatternMismatch { .. })
        ));
        // Length counts characters, not bytes
        assert!(binding.convert(&json!("éé")).is_err());
    }

    #[test]
    fn test_null_in_enum() {
        let with_null = bind(
            ValueType::String,
            Constraints::new().one_of(vec![json!("on"), JsonValue::Null]),
        );
        assert_eq!(with_null.convert(&JsonValue::Null).unwrap(), ThingValue::Null);
        assert!(with_null.convert(&json!("on")).is_ok());
        assert!(matches!(
            with_null.convert(&json!("off")),
            Err(ValidationError::NotInEnum { .. })
        ));

        let without_null = bind(
            ValueType::String,
            Constraints::new().nullable(true).one_of(vec![json!("on")]),
        );
        assert_eq!(
            without_null.convert(&JsonValue::Null),
            Err(ValidationError::NullNotAllowed)
        );

        let nullable = bind(ValueType::Int32, Constraints::new().nullable(true));
        assert_eq!(nullable.convert(&JsonValue::Null).unwrap(), ThingValue::Null);
        assert_eq!(nullable.zero_value(), ThingValue::Null);
    }

    #[test]
    fn test_enum_compares_native_values() {
        let binding = bind(
            ValueType::Float64,
            Constraints::new().one_of(vec![json!(1), json!(2.5)]),
        );
        assert!(binding.convert(&json!(1.0)).is_ok());
        assert!(binding.convert(&json!(2.5)).is_ok());
        assert!(binding.convert(&json!(2)).is_err());
    }

    #[test]
    fn test_textual_types() {
        let dt = bind(ValueType::DateTime, Constraints::new());
        let parsed = dt.convert(&json!("2024-05-01T10:00:00+02:00")).unwrap();
        assert_eq!(parsed.to_json(), json!("2024-05-01T08:00:00Z"));
        assert!(matches!(
            dt.convert(&json!("yesterday")),
            Err(ValidationError::Unparsable { .. })
        ));

        let id = bind(ValueType::Uuid, Constraints::new());
        assert!(id.convert(&json!("67e55044-10b1-426f-9247-bb680e5fe0c8")).is_ok());
        assert!(id.convert(&json!("not-a-uuid")).is_err());

        let duration = bind(ValueType::Duration, Constraints::new());
        assert_eq!(
            duration.convert(&json!("2s")).unwrap(),
            ThingValue::Duration(std::time::Duration::from_secs(2))
        );
    }

    #[test]
    fn test_schema_fragment() {
        let binding = bind(
            ValueType::UInt8,
            Constraints::new().minimum(0).maximum(100).nullable(true),
        );
        let schema = binding.schema();
        assert_eq!(schema["type"], json!("integer"));
        assert_eq!(schema["maximum"], json!(100));
        assert!(!schema.contains_key("nullable"));
    }
}
