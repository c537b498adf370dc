//! Extension Points
//!
//! Optional behavior is attached to a schema as ordered lists of typed
//! callbacks, one list per slot. A run invokes the slots in this order:
//!
//! 1. `reformat` - replace the raw input, or reject it as invalid format
//! 2. `before_validate` - inspect the input before any field is processed
//! 3. `before_mangle` - transform each field value before coercion
//! 4. `after_validate` - inspect the output once every field is processed
//! 5. `cleanup` - only when no errors so far; may edit output and add errors
//!
//! Callbacks registered on the same slot run in registration order.

use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::field::FieldDefinition;
use crate::path::PathSegment;
use crate::report::{ErrorSink, ValidationError};
use crate::types::{FieldType, SharedType, Str};

pub type ReformatHook = Arc<dyn Fn(Value) -> Result<Value, String> + Send + Sync>;
pub type InspectHook = Arc<dyn Fn(&Value, &mut ErrorSink) + Send + Sync>;
pub type MangleHook = Arc<dyn Fn(&FieldDefinition, Value) -> Value + Send + Sync>;
pub type CleanupHook = Arc<dyn Fn(&mut Value, &mut ErrorSink) + Send + Sync>;

/// Callbacks registered on a schema
#[derive(Clone, Default)]
pub struct Hooks {
    reformat: Vec<ReformatHook>,
    before_validate: Vec<InspectHook>,
    before_mangle: Vec<MangleHook>,
    after_validate: Vec<InspectHook>,
    cleanup: Vec<CleanupHook>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reformat(
        mut self,
        f: impl Fn(Value) -> Result<Value, String> + Send + Sync + 'static,
    ) -> Self {
        self.reformat.push(Arc::new(f));
        self
    }

    pub fn before_validate(mut self, f: impl Fn(&Value, &mut ErrorSink) + Send + Sync + 'static) -> Self {
        self.before_validate.push(Arc::new(f));
        self
    }

    pub fn before_mangle(
        mut self,
        f: impl Fn(&FieldDefinition, Value) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.before_mangle.push(Arc::new(f));
        self
    }

    pub fn after_validate(mut self, f: impl Fn(&Value, &mut ErrorSink) + Send + Sync + 'static) -> Self {
        self.after_validate.push(Arc::new(f));
        self
    }

    pub fn cleanup(mut self, f: impl Fn(&mut Value, &mut ErrorSink) + Send + Sync + 'static) -> Self {
        self.cleanup.push(Arc::new(f));
        self
    }

    /// Register a filter as a `before_mangle` callback
    pub fn filter(self, filter: Filter) -> Self {
        self.before_mangle(move |_, value| filter.apply(value))
    }

    pub(crate) fn has_reformat(&self) -> bool {
        !self.reformat.is_empty()
    }

    pub(crate) fn run_reformat(&self, input: Value) -> Result<Value, String> {
        self.reformat.iter().try_fold(input, |value, f| f(value))
    }

    pub(crate) fn run_before_validate(&self, input: &Value, errors: &mut ErrorSink) {
        for f in &self.before_validate {
            f(input, errors);
        }
    }

    pub(crate) fn run_before_mangle(&self, def: &FieldDefinition, value: Value) -> Value {
        self.before_mangle.iter().fold(value, |value, f| f(def, value))
    }

    pub(crate) fn has_after_validate(&self) -> bool {
        !self.after_validate.is_empty()
    }

    pub(crate) fn run_after_validate(&self, output: &Value, errors: &mut ErrorSink) {
        for f in &self.after_validate {
            f(output, errors);
        }
    }

    pub(crate) fn run_cleanup(&self, output: &mut Value, errors: &mut ErrorSink) {
        for f in &self.cleanup {
            f(output, errors);
        }
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("reformat", &self.reformat.len())
            .field("before_validate", &self.before_validate.len())
            .field("before_mangle", &self.before_mangle.len())
            .field("after_validate", &self.after_validate.len())
            .field("cleanup", &self.cleanup.len())
            .finish()
    }
}

// =============================================================================
// Filters
// =============================================================================

/// A transform applied to field values that match a type
#[derive(Clone)]
pub struct Filter {
    applies_to: SharedType,
    transform: Arc<dyn Fn(Value) -> Value + Send + Sync>,
}

impl Filter {
    pub fn new(
        applies_to: impl FieldType + 'static,
        transform: impl Fn(Value) -> Value + Send + Sync + 'static,
    ) -> Self {
        Self {
            applies_to: Arc::new(applies_to),
            transform: Arc::new(transform),
        }
    }

    /// Strip surrounding whitespace from strings
    pub fn trim() -> Self {
        Self::new(Str, |value| match value {
            Value::String(s) => Value::String(s.trim().to_string()),
            other => other,
        })
    }

    pub fn apply(&self, value: Value) -> Value {
        if self.applies_to.matches(&value) {
            (self.transform)(value)
        } else {
            value
        }
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filter").field("applies_to", &self.applies_to).finish()
    }
}

// =============================================================================
// Strictness
// =============================================================================

/// Build a `before_validate` callback that rejects input carrying data no
/// field path accounts for.
pub fn strict_check(fields: &[FieldDefinition]) -> InspectHook {
    let paths: Vec<Vec<PathSegment>> = fields
        .iter()
        .map(|f| f.path().segments().to_vec())
        .collect();

    Arc::new(move |input: &Value, errors: &mut ErrorSink| {
        let all: Vec<&[PathSegment]> = paths.iter().map(Vec::as_slice).collect();
        if !is_covered(input, &all) {
            errors.push(ValidationError::isnt_strict());
        }
    })
}

/// Whether every piece of `value` is reachable through one of `paths`
///
/// A path that ends here covers the whole subtree.
fn is_covered(value: &Value, paths: &[&[PathSegment]]) -> bool {
    if paths.iter().any(|p| p.is_empty()) {
        return true;
    }

    match value {
        Value::Object(map) => map.iter().all(|(key, child)| {
            let rest: Vec<&[PathSegment]> = paths
                .iter()
                .filter_map(|p| match p.split_first() {
                    Some((PathSegment::Key(k), rest)) if k == key => Some(rest),
                    _ => None,
                })
                .collect();
            !rest.is_empty() && is_covered(child, &rest)
        }),
        Value::Array(items) => {
            let rest: Vec<&[PathSegment]> = paths
                .iter()
                .filter_map(|p| match p.split_first() {
                    Some((PathSegment::Wildcard, rest)) => Some(rest),
                    _ => None,
                })
                .collect();
            items.is_empty() || (!rest.is_empty() && items.iter().all(|item| is_covered(item, &rest)))
        }
        _ => false,
    }
}
