//! Validation Reports
//!
//! Typed errors produced while validating one input record, the append-only
//! sink they are collected in, and the final pass/fail result of a run.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

// =============================================================================
// Error Kinds
// =============================================================================

/// Category of a validation error
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Root input is not a keyed structure, or reformatting rejected it
    InvalidFormat,
    /// A required field is missing (or empty, for hard requirement)
    DoesNotExist,
    /// The field's type rejected the value
    DoesNotValidate,
    /// Input carries data no field definition accounts for
    IsntStrict,
    /// Caller-defined error added by an extension point
    Custom(String),
}

impl ErrorKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::InvalidFormat => "invalid_format",
            Self::DoesNotExist => "does_not_exist",
            Self::DoesNotValidate => "does_not_validate",
            Self::IsntStrict => "isnt_strict",
            Self::Custom(tag) => tag,
        }
    }

    /// Message used when nothing more specific is available
    pub fn default_message(&self) -> &'static str {
        match self {
            Self::InvalidFormat => "input data format is invalid",
            Self::DoesNotExist => "field is required",
            Self::DoesNotValidate => "validation fails",
            Self::IsntStrict => "input data has unexpected fields",
            Self::Custom(_) => "validation fails",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// One problem found in the input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Dotted field name, `None` for form-level errors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub kind: ErrorKind,
    pub message: String,
    /// Raw failure payload reported by a type, when it differs from `message`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
}

impl ValidationError {
    pub fn new(field: Option<String>, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            field,
            kind,
            message: message.into(),
            cause: None,
        }
    }

    /// Error attached to a named field
    pub fn field(field: impl Into<String>, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::new(Some(field.into()), kind, message)
    }

    /// Error about the input as a whole
    pub fn form(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::new(None, kind, message)
    }

    pub fn invalid_format() -> Self {
        let kind = ErrorKind::InvalidFormat;
        let message = kind.default_message();
        Self::form(kind, message)
    }

    pub fn does_not_exist(field: impl Into<String>) -> Self {
        let kind = ErrorKind::DoesNotExist;
        let message = kind.default_message();
        Self::field(field, kind, message)
    }

    pub fn does_not_validate(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::field(field, ErrorKind::DoesNotValidate, message)
    }

    pub fn isnt_strict() -> Self {
        let kind = ErrorKind::IsntStrict;
        let message = kind.default_message();
        Self::form(kind, message)
    }

    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    /// Re-home this error under `prefix`, as done for nested form failures
    pub fn nested_under(mut self, prefix: &str) -> Self {
        self.field = Some(match self.field.take() {
            Some(inner) if !inner.is_empty() => format!("{}.{}", prefix, inner),
            _ => prefix.to_string(),
        });
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) => write!(f, "{} [{}]: {}", field, self.kind, self.message),
            None => write!(f, "[{}]: {}", self.kind, self.message),
        }
    }
}

// =============================================================================
// Error Sink
// =============================================================================

/// Append-only, ordered collection of errors for one run
///
/// Extension points receive `&mut ErrorSink` so they can add domain errors
/// (cross-field checks and the like) in the same shape as built-in ones.
#[derive(Debug, Clone, Default)]
pub struct ErrorSink {
    errors: Vec<ValidationError>,
}

impl ErrorSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    /// Add a caller-defined error for `field`
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.push(ValidationError::field(
            field,
            ErrorKind::Custom("custom".to_string()),
            message,
        ));
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.errors.iter()
    }

    pub fn into_vec(self) -> Vec<ValidationError> {
        self.errors
    }
}

impl Extend<ValidationError> for ErrorSink {
    fn extend<I: IntoIterator<Item = ValidationError>>(&mut self, iter: I) {
        self.errors.extend(iter);
    }
}

// =============================================================================
// Validation Result
// =============================================================================

/// Outcome of one completed run: exactly one of cleaned fields or errors
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationResult {
    Valid(Value),
    Invalid(Vec<ValidationError>),
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    pub fn fields(&self) -> Option<&Value> {
        match self {
            Self::Valid(fields) => Some(fields),
            Self::Invalid(_) => None,
        }
    }

    pub fn errors(&self) -> &[ValidationError] {
        match self {
            Self::Valid(_) => &[],
            Self::Invalid(errors) => errors,
        }
    }

    pub fn into_errors(self) -> Option<Vec<ValidationError>> {
        match self {
            Self::Valid(_) => None,
            Self::Invalid(errors) => Some(errors),
        }
    }
}
