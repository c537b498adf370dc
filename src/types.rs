//! Field Types
//!
//! A field type is a predicate over values with an optional coercion. Plain
//! predicates and nested forms share the same [`FieldType`] capability, so
//! the field pipeline never needs to know which one it is talking to.

use regex::Regex;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::report::ValidationError;

// =============================================================================
// Capability
// =============================================================================

/// Why a value was rejected by a type
#[derive(Debug, Clone, PartialEq)]
pub enum TypeFailure {
    /// Plain rejection with the type's own description, if it has one
    Message(Option<String>),
    /// A nested schema failed; each item is re-homed under the outer field
    Nested(Vec<NestedFailure>),
}

/// One failure reported by a nested schema
#[derive(Debug, Clone, PartialEq)]
pub enum NestedFailure {
    Error(ValidationError),
    /// Unstructured failure text, wrapped as "does not validate"
    Raw(String),
}

/// Type predicate attached to a field
pub trait FieldType: fmt::Debug + Send + Sync {
    /// Short name used in default failure descriptions
    fn name(&self) -> &str;

    fn matches(&self, value: &Value) -> bool;

    /// Description of why `value` does not match
    fn explain(&self, value: &Value) -> Option<String> {
        let _ = value;
        Some(format!("must be {}", self.name()))
    }

    /// Whether [`FieldType::coerce`] does anything
    fn can_coerce(&self) -> bool {
        false
    }

    fn coerce(&self, value: Value) -> Value {
        value
    }

    /// Validate `value`, returning the value to keep on success.
    ///
    /// The default runs [`FieldType::matches`] and keeps the value as is.
    fn check(&self, value: Value) -> std::result::Result<Value, TypeFailure> {
        if self.matches(&value) {
            Ok(value)
        } else {
            Err(TypeFailure::Message(self.explain(&value)))
        }
    }
}

/// Shared handle to a field type
pub type SharedType = Arc<dyn FieldType>;

// =============================================================================
// Scalars
// =============================================================================

/// Any string
#[derive(Debug, Clone, Copy, Default)]
pub struct Str;

impl FieldType for Str {
    fn name(&self) -> &str {
        "a string"
    }

    fn matches(&self, value: &Value) -> bool {
        value.is_string()
    }
}

/// A string with at least one character
#[derive(Debug, Clone, Copy, Default)]
pub struct NonEmptyStr;

impl FieldType for NonEmptyStr {
    fn name(&self) -> &str {
        "a non-empty string"
    }

    fn matches(&self, value: &Value) -> bool {
        value.as_str().is_some_and(|s| !s.is_empty())
    }
}

/// A whole number
///
/// Coerces numeric strings and floats without a fractional part.
#[derive(Debug, Clone, Copy, Default)]
pub struct Int;

impl FieldType for Int {
    fn name(&self) -> &str {
        "an integer"
    }

    fn matches(&self, value: &Value) -> bool {
        value.is_i64() || value.is_u64()
    }

    fn can_coerce(&self) -> bool {
        true
    }

    fn coerce(&self, value: Value) -> Value {
        match &value {
            Value::String(s) => {
                let s = s.trim();
                if let Ok(i) = s.parse::<i64>() {
                    Value::from(i)
                } else if let Ok(u) = s.parse::<u64>() {
                    Value::from(u)
                } else {
                    value
                }
            }
            Value::Number(n) => match n.as_f64() {
                Some(f) if !(n.is_i64() || n.is_u64()) && f.fract() == 0.0 && f.abs() < 9.0e15 => {
                    Value::from(f as i64)
                }
                _ => value,
            },
            _ => value,
        }
    }
}

/// Any number
///
/// Coerces strings that parse as numbers.
#[derive(Debug, Clone, Copy, Default)]
pub struct Num;

impl FieldType for Num {
    fn name(&self) -> &str {
        "a number"
    }

    fn matches(&self, value: &Value) -> bool {
        value.is_number()
    }

    fn can_coerce(&self) -> bool {
        true
    }

    fn coerce(&self, value: Value) -> Value {
        let Some(s) = value.as_str() else {
            return value;
        };
        let s = s.trim();
        if let Ok(i) = s.parse::<i64>() {
            return Value::from(i);
        }
        match s.parse::<f64>().ok().and_then(serde_json::Number::from_f64) {
            Some(n) => Value::Number(n),
            None => value,
        }
    }
}

/// A boolean
///
/// Coerces `"true"`/`"false"`, `"1"`/`"0"` and the numbers 1 and 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct Bool;

impl FieldType for Bool {
    fn name(&self) -> &str {
        "a boolean"
    }

    fn matches(&self, value: &Value) -> bool {
        value.is_boolean()
    }

    fn can_coerce(&self) -> bool {
        true
    }

    fn coerce(&self, value: Value) -> Value {
        let coerced = match &value {
            Value::String(s) => match s.trim() {
                "true" | "1" => Some(true),
                "false" | "0" => Some(false),
                _ => None,
            },
            Value::Number(n) => match n.as_i64() {
                Some(1) => Some(true),
                Some(0) => Some(false),
                _ => None,
            },
            _ => None,
        };
        coerced.map(Value::Bool).unwrap_or(value)
    }
}

// =============================================================================
// Containers
// =============================================================================

/// A sequence
#[derive(Debug, Clone, Copy, Default)]
pub struct Seq;

impl FieldType for Seq {
    fn name(&self) -> &str {
        "an array"
    }

    fn matches(&self, value: &Value) -> bool {
        value.is_array()
    }
}

/// A mapping
#[derive(Debug, Clone, Copy, Default)]
pub struct Map;

impl FieldType for Map {
    fn name(&self) -> &str {
        "an object"
    }

    fn matches(&self, value: &Value) -> bool {
        value.is_object()
    }
}

// =============================================================================
// Constrained
// =============================================================================

/// A string matching a regular expression
#[derive(Debug, Clone)]
pub struct Pattern {
    regex: Regex,
    description: String,
}

impl Pattern {
    pub fn new(pattern: &str) -> Result<Self> {
        Ok(Self {
            regex: Regex::new(pattern)?,
            description: format!("a string matching /{}/", pattern),
        })
    }
}

impl FieldType for Pattern {
    fn name(&self) -> &str {
        &self.description
    }

    fn matches(&self, value: &Value) -> bool {
        value.as_str().is_some_and(|s| self.regex.is_match(s))
    }
}

/// One of a fixed set of values
#[derive(Debug, Clone)]
pub struct OneOf {
    allowed: Vec<Value>,
    description: String,
}

impl OneOf {
    pub fn new(allowed: impl IntoIterator<Item = Value>) -> Self {
        let allowed: Vec<Value> = allowed.into_iter().collect();
        let listed = allowed
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        Self {
            description: format!("one of: {}", listed),
            allowed,
        }
    }
}

impl FieldType for OneOf {
    fn name(&self) -> &str {
        &self.description
    }

    fn matches(&self, value: &Value) -> bool {
        self.allowed.contains(value)
    }
}

/// Caller-supplied predicate
#[derive(Clone)]
pub struct Predicate {
    name: String,
    test: Arc<dyn Fn(&Value) -> bool + Send + Sync>,
}

impl Predicate {
    pub fn new(name: impl Into<String>, test: impl Fn(&Value) -> bool + Send + Sync + 'static) -> Self {
        Self {
            name: name.into(),
            test: Arc::new(test),
        }
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predicate").field("name", &self.name).finish()
    }
}

impl FieldType for Predicate {
    fn name(&self) -> &str {
        &self.name
    }

    fn matches(&self, value: &Value) -> bool {
        (self.test)(value)
    }
}
