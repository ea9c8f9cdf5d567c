//! Error types for the GBLN bridge

use thiserror::Error;

/// Errors that can occur while bridging host values and GBLN trees
#[derive(Error, Debug)]
pub enum GblnError {
    /// Malformed text, reported by the engine unchanged
    #[error("Parse error: {message}")]
    Parse { message: String },

    /// Accessor or type-tag mismatch
    #[error("Type error: expected {expected}, got {got}")]
    Type { expected: String, got: String },

    #[error("Integer out of range: {value} does not fit {type_name} ({min}..={max})")]
    IntegerOutOfRange {
        value: i128,
        type_name: &'static str,
        min: i128,
        max: i128,
    },

    #[error("String too long: {length} code points exceeds {max} (\"{preview}\")")]
    StringTooLong {
        length: usize,
        max: usize,
        preview: String,
    },

    #[error("Float precision loss: {value} cannot be represented as {type_name}")]
    FloatPrecisionLoss { value: f64, type_name: &'static str },

    #[error("Cannot convert {from} to {to}")]
    Conversion { from: String, to: String },

    #[error("Duplicate key: {key}")]
    DuplicateKey { key: String },

    /// The engine returned a null or invalid handle
    #[error("Null pointer in {operation}")]
    NullPointer { operation: String },

    #[error("I/O error: {message}")]
    Io { message: String },

    #[error("Serialisation error: {message}")]
    Serialisation { message: String },

    #[error("Invalid config: {field} {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    #[error("JSON conversion error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Number of code points kept in a `StringTooLong` preview
const PREVIEW_CHARS: usize = 32;

impl GblnError {
    pub fn type_mismatch(expected: impl Into<String>, got: impl Into<String>) -> Self {
        GblnError::Type {
            expected: expected.into(),
            got: got.into(),
        }
    }

    pub fn conversion(from: impl Into<String>, to: impl Into<String>) -> Self {
        GblnError::Conversion {
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn null_pointer(operation: impl Into<String>) -> Self {
        GblnError::NullPointer {
            operation: operation.into(),
        }
    }

    /// Build a `StringTooLong`, truncating the offending value for the message
    pub fn string_too_long(value: &str, length: usize, max: usize) -> Self {
        let mut preview: String = value.chars().take(PREVIEW_CHARS).collect();
        if length > PREVIEW_CHARS {
            preview.push_str("...");
        }
        GblnError::StringTooLong {
            length,
            max,
            preview,
        }
    }
}

pub type Result<T> = std::result::Result<T, GblnError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_too_long_preview_is_truncated() {
        let value = "x".repeat(40);
        let err = GblnError::string_too_long(&value, 40, 32);
        match &err {
            GblnError::StringTooLong { preview, .. } => {
                assert_eq!(preview.chars().count(), PREVIEW_CHARS + 3);
                assert!(preview.ends_with("..."));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("40 code points exceeds 32"));
    }

    #[test]
    fn test_short_preview_kept_whole() {
        let err = GblnError::string_too_long("abc", 3, 2);
        assert_eq!(
            err.to_string(),
            "String too long: 3 code points exceeds 2 (\"abc\")"
        );
    }

    #[test]
    fn test_integer_out_of_range_message() {
        let err = GblnError::IntegerOutOfRange {
            value: 999,
            type_name: "i8",
            min: -128,
            max: 127,
        };
        assert_eq!(
            err.to_string(),
            "Integer out of range: 999 does not fit i8 (-128..=127)"
        );
    }
}
