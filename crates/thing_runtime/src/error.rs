//! Runtime Errors
//!
//! `ValidationError` describes why a single value was rejected,
//! `ThingError` is what callers of a thing's registries see, and
//! `CompileError` reports a broken thing definition at registration time.

use thing_types::ValueType;

// ─────────────────────────────────────────────────────────────────────────────
// Validation Error
// ─────────────────────────────────────────────────────────────────────────────

/// Why a value failed coercion or a declared constraint
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("expected {expected}, got {found}")]
    TypeMismatch {
        expected: ValueType,
        found: &'static str,
    },

    #[error("{value} does not fit in {expected}")]
    OutOfRange { expected: ValueType, value: String },

    #[error("invalid {expected}: {reason}")]
    Unparsable { expected: ValueType, reason: String },

    #[error("null is not allowed")]
    NullNotAllowed,

    #[error("{value} is less than the minimum {bound}")]
    BelowMinimum { value: String, bound: String },

    #[error("{value} is greater than the maximum {bound}")]
    AboveMaximum { value: String, bound: String },

    #[error("{value} must be greater than {bound}")]
    NotAboveExclusiveMinimum { value: String, bound: String },

    #[error("{value} must be less than {bound}")]
    NotBelowExclusiveMaximum { value: String, bound: String },

    #[error("{value} is not a multiple of {factor}")]
    NotMultipleOf { value: String, factor: String },

    #[error("length {length} is shorter than {min}")]
    TooShort { length: usize, min: usize },

    #[error("length {length} is longer than {max}")]
    TooLong { length: usize, max: usize },

    #[error("{value:?} does not match {pattern}")]
    PatternMismatch { value: String, pattern: String },

    #[error("{value} is not one of the allowed values")]
    NotInEnum { value: String },
}

// ─────────────────────────────────────────────────────────────────────────────
// Thing Error
// ─────────────────────────────────────────────────────────────────────────────

/// Errors returned by thing operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum ThingError {
    #[error("invalid value for {name}: {source}")]
    Validation {
        name: String,
        #[source]
        source: ValidationError,
    },

    #[error("{kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },

    #[error("property is read-only: {0}")]
    ReadOnly(String),

    #[error("property is write-only: {0}")]
    WriteOnly(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ThingError {
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    pub fn validation(name: impl Into<String>, source: ValidationError) -> Self {
        Self::Validation {
            name: name.into(),
            source,
        }
    }

    /// HTTP status code this error maps to
    pub fn status_code(&self) -> u16 {
        match self {
            ThingError::NotFound { .. } => 404,
            ThingError::AlreadyExists(_) => 409,
            ThingError::Internal(_) => 500,
            ThingError::Validation { .. }
            | ThingError::ReadOnly(_)
            | ThingError::WriteOnly(_)
            | ThingError::InvalidRequest(_) => 400,
        }
    }
}

/// Result type for thing operations
pub type ThingResult<T> = Result<T, ThingError>;

// ─────────────────────────────────────────────────────────────────────────────
// Compile Error
// ─────────────────────────────────────────────────────────────────────────────

/// A thing definition that cannot be compiled
#[derive(Debug, Clone, thiserror::Error)]
pub enum CompileError {
    #[error("{owner}.{member}: invalid constraint: {reason}")]
    InvalidConstraint {
        owner: String,
        member: String,
        reason: String,
    },

    #[error("{owner}.{member}: invalid initial value: {source}")]
    InvalidInitial {
        owner: String,
        member: String,
        #[source]
        source: ValidationError,
    },

    #[error("{owner}: duplicate member {member}")]
    DuplicateMember { owner: String, member: String },
}

// ─────────────────────────────────────────────────────────────────────────────
// Handler Error
// ─────────────────────────────────────────────────────────────────────────────

/// Failure reported by an action handler; logged, never surfaced to clients
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct HandlerError(pub String);

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        Self(message)
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        Self(message.to_string())
    }
}

impl From<ThingError> for HandlerError {
    fn from(error: ThingError) -> Self {
        Self(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ThingError::not_found("property", "x").status_code(), 404);
        assert_eq!(ThingError::ReadOnly("x".into()).status_code(), 400);
        assert_eq!(
            ThingError::validation("level", ValidationError::NullNotAllowed).status_code(),
            400
        );
        assert_eq!(ThingError::Internal("boom".into()).status_code(), 500);
    }

    #[test]
    fn test_messages() {
        let err = ThingError::validation(
            "brightness",
            ValidationError::AboveMaximum {
                value: "150".into(),
                bound: "100".into(),
            },
        );
        assert_eq!(
            err.to_string(),
            "invalid value for brightness: 150 is greater than the maximum 100"
        );
    }
}
