// Thing Types - Native value types understood by the runtime
//
// Every property and action parameter declares one of these. Anything the
// runtime does not understand deserializes to `Unsupported` and is left out of
// the compiled schema.

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Value Types
// ─────────────────────────────────────────────────────────────────────────────

/// Native type of a property or action parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Boolean,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    /// Exact decimal number
    Decimal,
    String,
    /// RFC 3339 timestamp, always normalized to UTC
    DateTime,
    Uuid,
    /// Human readable duration ("1h 30m", "250ms")
    Duration,
    /// Any type the runtime cannot bind
    #[serde(other)]
    Unsupported,
}

impl ValueType {
    /// Whether the runtime can compile a binding for this type
    pub fn is_supported(&self) -> bool {
        !matches!(self, ValueType::Unsupported)
    }

    /// Whether values of this type are numbers on the wire
    pub fn is_numeric(&self) -> bool {
        self.is_signed_integer()
            || self.is_unsigned_integer()
            || matches!(
                self,
                ValueType::Float32 | ValueType::Float64 | ValueType::Decimal
            )
    }

    /// Whether values of this type are strings on the wire
    pub fn is_textual(&self) -> bool {
        matches!(
            self,
            ValueType::String | ValueType::DateTime | ValueType::Uuid | ValueType::Duration
        )
    }

    pub fn is_signed_integer(&self) -> bool {
        matches!(
            self,
            ValueType::Int8 | ValueType::Int16 | ValueType::Int32 | ValueType::Int64
        )
    }

    pub fn is_unsigned_integer(&self) -> bool {
        matches!(
            self,
            ValueType::UInt8 | ValueType::UInt16 | ValueType::UInt32 | ValueType::UInt64
        )
    }

    pub fn is_integer(&self) -> bool {
        self.is_signed_integer() || self.is_unsigned_integer()
    }

    /// Inclusive range representable by an integer type
    pub fn integer_range(&self) -> Option<(i128, i128)> {
        let range = match self {
            ValueType::Int8 => (i8::MIN as i128, i8::MAX as i128),
            ValueType::Int16 => (i16::MIN as i128, i16::MAX as i128),
            ValueType::Int32 => (i32::MIN as i128, i32::MAX as i128),
            ValueType::Int64 => (i64::MIN as i128, i64::MAX as i128),
            ValueType::UInt8 => (0, u8::MAX as i128),
            ValueType::UInt16 => (0, u16::MAX as i128),
            ValueType::UInt32 => (0, u32::MAX as i128),
            ValueType::UInt64 => (0, u64::MAX as i128),
            _ => return None,
        };
        Some(range)
    }

    /// JSON-schema `type` keyword for this value type
    pub fn json_type(&self) -> &'static str {
        match self {
            ValueType::Boolean => "boolean",
            t if t.is_integer() => "integer",
            ValueType::Float32 | ValueType::Float64 | ValueType::Decimal => "number",
            ValueType::Unsupported => "null",
            _ => "string",
        }
    }

    /// JSON-schema `format` keyword, for string encoded types
    pub fn json_format(&self) -> Option<&'static str> {
        match self {
            ValueType::DateTime => Some("date-time"),
            ValueType::Uuid => Some("uuid"),
            ValueType::Duration => Some("duration"),
            _ => None,
        }
    }
}

impl std::fmt::Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ValueType::Boolean => "boolean",
            ValueType::Int8 => "int8",
            ValueType::Int16 => "int16",
            ValueType::Int32 => "int32",
            ValueType::Int64 => "int64",
            ValueType::UInt8 => "uint8",
            ValueType::UInt16 => "uint16",
            ValueType::UInt32 => "uint32",
            ValueType::UInt64 => "uint64",
            ValueType::Float32 => "float32",
            ValueType::Float64 => "float64",
            ValueType::Decimal => "decimal",
            ValueType::String => "string",
            ValueType::DateTime => "datetime",
            ValueType::Uuid => "uuid",
            ValueType::Duration => "duration",
            ValueType::Unsupported => "unsupported",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_type_is_unsupported() {
        let ty: ValueType = serde_json::from_str("\"matrix\"").unwrap();
        assert_eq!(ty, ValueType::Unsupported);
        assert!(!ty.is_supported());

        let ty: ValueType = serde_json::from_str("\"uint16\"").unwrap();
        assert_eq!(ty, ValueType::UInt16);
    }

    #[test]
    fn test_json_schema_names() {
        assert_eq!(ValueType::Int8.json_type(), "integer");
        assert_eq!(ValueType::Decimal.json_type(), "number");
        assert_eq!(ValueType::Uuid.json_type(), "string");
        assert_eq!(ValueType::DateTime.json_format(), Some("date-time"));
        assert_eq!(ValueType::UInt8.integer_range(), Some((0, 255)));
    }
}
