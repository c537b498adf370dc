//! Form Engine
//!
//! A [`Schema`] is the long-lived, shareable part: an ordered list of field
//! definitions plus registered callbacks. [`Schema::run`] performs one
//! complete validation of an input record. A [`Form`] binds a schema to the
//! current input and caches the result of the run until new input arrives.
//!
//! ## Run order
//!
//! ```text
//! reformat ──▶ root must be a mapping ──▶ before_validate (+ strictness)
//!     ──▶ for each field: resolve ─▶ pipeline ─▶ write into output
//!     ──▶ after_validate ──▶ cleanup (only if no errors) ──▶ result
//! ```

use serde_json::Value;
use std::cell::OnceCell;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::error::Result;
use crate::field::{FieldConfig, FieldDefinition};
use crate::hooks::{self, Hooks};
use crate::path::{self, format_location, OutputTree};
use crate::pipeline::{self, Outcome};
use crate::report::{ErrorSink, ValidationError, ValidationResult};
use crate::types::{FieldType, NestedFailure, TypeFailure};

// =============================================================================
// Schema
// =============================================================================

/// Ordered field definitions and the callbacks attached to them
#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: Vec<FieldDefinition>,
    hooks: Hooks,
}

impl Schema {
    pub fn new(fields: Vec<FieldDefinition>) -> Self {
        Self {
            fields,
            hooks: Hooks::default(),
        }
    }

    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    pub fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }

    pub fn hooks(&self) -> &Hooks {
        &self.hooks
    }

    /// Validate one input record
    pub fn run(&self, input: Value) -> ValidationResult {
        debug!(fields = self.fields.len(), "validation run started");

        let input = if self.hooks.has_reformat() {
            match self.hooks.run_reformat(input) {
                Ok(input) => input,
                Err(reason) => {
                    debug!(%reason, "input rejected by reformat");
                    return ValidationResult::Invalid(vec![ValidationError::invalid_format()]);
                }
            }
        } else {
            input
        };

        if !input.is_object() {
            debug!("input root is not a mapping");
            return ValidationResult::Invalid(vec![ValidationError::invalid_format()]);
        }

        let mut errors = ErrorSink::new();
        self.hooks.run_before_validate(&input, &mut errors);

        let mut output = OutputTree::new();
        for def in &self.fields {
            self.process_field(def, &input, &mut output, &mut errors);
        }

        if self.hooks.has_after_validate() {
            self.hooks.run_after_validate(&output.to_value(), &mut errors);
        }

        let mut fields = output.into_value();
        if errors.is_empty() {
            self.hooks.run_cleanup(&mut fields, &mut errors);
        }

        debug!(errors = errors.len(), "validation run finished");
        if errors.is_empty() {
            ValidationResult::Valid(fields)
        } else {
            ValidationResult::Invalid(errors.into_vec())
        }
    }

    fn process_field(
        &self,
        def: &FieldDefinition,
        input: &Value,
        output: &mut OutputTree,
        errors: &mut ErrorSink,
    ) {
        let resolution = path::resolve(input, def.path());

        if resolution.is_missing() {
            if let Some(default) = def.default_value() {
                trace!(field = def.name(), "using default value");
                if let Some(slot) = resolution.slots.first() {
                    output.insert(&slot.location, default.clone());
                }
                return;
            }
        }

        for sequence in &resolution.sequences {
            output.ensure_sequence(sequence);
        }

        for slot in &resolution.slots {
            match pipeline::process(def, &self.hooks, slot.value) {
                Outcome::Skip => {}
                Outcome::Accept(value) => {
                    trace!(field = def.name(), location = %format_location(&slot.location), "accepted");
                    output.insert(&slot.location, value);
                }
                Outcome::Reject(rejected) => {
                    for error in &rejected {
                        debug!(field = def.name(), kind = %error.kind, "field rejected");
                    }
                    errors.extend(rejected);
                }
            }
        }
    }
}

/// Incremental construction of a [`Schema`]
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    fields: Vec<FieldDefinition>,
    hooks: Hooks,
    strict: bool,
}

impl SchemaBuilder {
    pub fn field(mut self, def: FieldDefinition) -> Self {
        self.fields.push(def);
        self
    }

    /// Build a definition from `config` and append it
    pub fn add(self, config: FieldConfig) -> Result<Self> {
        Ok(self.field(FieldDefinition::new(config)?))
    }

    pub fn hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Edit the registered callbacks in place
    pub fn with_hooks(mut self, f: impl FnOnce(Hooks) -> Hooks) -> Self {
        self.hooks = f(std::mem::take(&mut self.hooks));
        self
    }

    /// Reject input carrying data no field accounts for
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn build(self) -> Schema {
        let mut hooks = self.hooks;
        if self.strict {
            let check = hooks::strict_check(&self.fields);
            hooks = hooks.before_validate(move |input, errors| check(input, errors));
        }
        Schema {
            fields: self.fields,
            hooks,
        }
    }
}

// =============================================================================
// Form
// =============================================================================

/// Where a form is in its validation cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormState {
    /// No input bound yet
    Idle,
    Succeeded,
    Failed,
}

/// A schema bound to one input record
///
/// The run happens lazily on first access to [`Form::is_valid`],
/// [`Form::fields`] or [`Form::errors`] and is cached until
/// [`Form::bind_input`] is called again.
#[derive(Debug)]
pub struct Form {
    schema: Arc<Schema>,
    input: Option<Value>,
    result: OnceCell<ValidationResult>,
}

impl Form {
    pub fn new(schema: Arc<Schema>) -> Self {
        Self {
            schema,
            input: None,
            result: OnceCell::new(),
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Bind new input, discarding any previous result
    pub fn bind_input(&mut self, input: Value) {
        self.input = Some(input);
        self.result = OnceCell::new();
    }

    pub fn input(&self) -> Option<&Value> {
        self.input.as_ref()
    }

    fn result(&self) -> Option<&ValidationResult> {
        let input = self.input.as_ref()?;
        Some(self.result.get_or_init(|| self.schema.run(input.clone())))
    }

    pub fn state(&self) -> FormState {
        match self.result() {
            None => FormState::Idle,
            Some(result) if result.is_valid() => FormState::Succeeded,
            Some(_) => FormState::Failed,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.result().is_some_and(ValidationResult::is_valid)
    }

    /// Cleaned output, only when valid
    pub fn fields(&self) -> Option<&Value> {
        self.result().and_then(ValidationResult::fields)
    }

    pub fn errors(&self) -> &[ValidationError] {
        self.result().map(ValidationResult::errors).unwrap_or_default()
    }

    /// Error messages grouped by field; form-level errors use the empty key
    pub fn errors_by_field(&self) -> BTreeMap<String, Vec<String>> {
        let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for error in self.errors() {
            grouped
                .entry(error.field.clone().unwrap_or_default())
                .or_default()
                .push(error.message.clone());
        }
        grouped
    }

    /// Bind `input` and return its errors, or `None` when it is valid
    pub fn validate(&mut self, input: Value) -> Option<Vec<ValidationError>> {
        self.bind_input(input);
        if self.is_valid() {
            None
        } else {
            Some(self.errors().to_vec())
        }
    }
}

// =============================================================================
// Nested Forms
// =============================================================================

/// A schema used as a field type
///
/// On success the nested run's cleaned fields replace the value; on failure
/// its errors are handed back to be re-homed under the outer field.
#[derive(Debug, Clone)]
pub struct FormType {
    schema: Arc<Schema>,
}

impl FormType {
    pub fn new(schema: Arc<Schema>) -> Self {
        Self { schema }
    }
}

impl FieldType for FormType {
    fn name(&self) -> &str {
        "a nested form"
    }

    fn matches(&self, value: &Value) -> bool {
        self.schema.run(value.clone()).is_valid()
    }

    fn explain(&self, value: &Value) -> Option<String> {
        let errors = self.schema.run(value.clone()).into_errors()?;
        Some(
            errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    fn check(&self, value: Value) -> std::result::Result<Value, TypeFailure> {
        match self.schema.run(value) {
            ValidationResult::Valid(fields) => Ok(fields),
            ValidationResult::Invalid(errors) => Err(TypeFailure::Nested(
                errors.into_iter().map(NestedFailure::Error).collect(),
            )),
        }
    }
}
