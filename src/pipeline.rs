//! Field Pipeline
//!
//! Decides the fate of one located value for one field definition:
//! existence gate, emptiness gate, `before_mangle` callbacks, coercion,
//! type validation, adjustment. The value is either accepted whole or
//! rejected with errors; nothing in between.

use serde_json::Value;

use crate::field::{FieldDefinition, Required};
use crate::hooks::Hooks;
use crate::report::{ErrorKind, ValidationError};
use crate::types::{NestedFailure, TypeFailure};

/// What a field contributes for one slot
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Absent and optional: no output, no error
    Skip,
    Accept(Value),
    Reject(Vec<ValidationError>),
}

/// Null, or a string that is empty
///
/// Numbers (zero included), booleans and containers are never blank.
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Run `def` against the value found at one slot (`None` when absent)
pub fn process(def: &FieldDefinition, hooks: &Hooks, found: Option<&Value>) -> Outcome {
    let Some(value) = found else {
        return if def.required().is_required() {
            Outcome::Reject(vec![ValidationError::does_not_exist(def.name())])
        } else {
            Outcome::Skip
        };
    };

    if def.required() == Required::Hard && is_blank(value) {
        return Outcome::Reject(vec![ValidationError::does_not_exist(def.name())]);
    }

    let value = hooks.run_before_mangle(def, value.clone());
    let value = def.coerce(value);

    let value = match def.field_type() {
        Some(field_type) => match field_type.check(value) {
            Ok(value) => value,
            Err(failure) => return Outcome::Reject(type_errors(def, failure)),
        },
        None => value,
    };

    Outcome::Accept(def.adjust(value))
}

fn type_errors(def: &FieldDefinition, failure: TypeFailure) -> Vec<ValidationError> {
    match failure {
        TypeFailure::Message(explanation) => {
            let message = def
                .message()
                .map(str::to_string)
                .or_else(|| explanation.clone())
                .unwrap_or_else(|| ErrorKind::DoesNotValidate.default_message().to_string());
            let mut error = ValidationError::does_not_validate(def.name(), message);
            if let Some(explanation) = explanation {
                if def.message().is_some() {
                    error = error.with_cause(explanation);
                }
            }
            vec![error]
        }
        TypeFailure::Nested(items) => items
            .into_iter()
            .map(|item| match item {
                NestedFailure::Error(error) => error.nested_under(def.name()),
                NestedFailure::Raw(raw) => {
                    ValidationError::does_not_validate(def.name(), raw.clone()).with_cause(raw)
                }
            })
            .collect(),
    }
}
