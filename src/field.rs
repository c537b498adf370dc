//! Field Definitions
//!
//! A [`FieldDefinition`] is built once from a [`FieldConfig`] and then shared
//! read-only by every validation run of its schema. All consistency checks
//! happen in [`FieldDefinition::new`], never during validation.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::error::{FormError, Result};
use crate::path::FieldPath;
use crate::types::{FieldType, SharedType};

/// Value transformation used for coercion and adjustment
pub type Transform = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// How strictly a field must be present
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Required {
    /// May be absent
    #[default]
    None,
    /// Must be present, may be null or empty
    Soft,
    /// Must be present, non-null and not an empty string
    Hard,
}

impl Required {
    pub fn is_required(&self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Coercion applied before type validation
#[derive(Clone, Default)]
pub enum Coerce {
    #[default]
    Off,
    /// Use the field type's own coercion
    ByType,
    With(Transform),
}

impl fmt::Debug for Coerce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Off => write!(f, "Off"),
            Self::ByType => write!(f, "ByType"),
            Self::With(_) => write!(f, "With(<fn>)"),
        }
    }
}

// =============================================================================
// Config
// =============================================================================

/// Everything needed to build a field definition
#[derive(Clone, Default)]
pub struct FieldConfig {
    pub name: String,
    pub required: Required,
    pub field_type: Option<SharedType>,
    pub coerce: Coerce,
    pub adjust: Option<Transform>,
    pub message: Option<String>,
    pub default: Option<Value>,
}

impl FieldConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn required(mut self, required: Required) -> Self {
        self.required = required;
        self
    }

    pub fn hard(self) -> Self {
        self.required(Required::Hard)
    }

    pub fn soft(self) -> Self {
        self.required(Required::Soft)
    }

    pub fn of_type(mut self, field_type: impl FieldType + 'static) -> Self {
        self.field_type = Some(Arc::new(field_type));
        self
    }

    pub fn of_shared_type(mut self, field_type: SharedType) -> Self {
        self.field_type = Some(field_type);
        self
    }

    pub fn coerce_by_type(mut self) -> Self {
        self.coerce = Coerce::ByType;
        self
    }

    pub fn coerce_with(mut self, f: impl Fn(Value) -> Value + Send + Sync + 'static) -> Self {
        self.coerce = Coerce::With(Arc::new(f));
        self
    }

    pub fn adjust(mut self, f: impl Fn(Value) -> Value + Send + Sync + 'static) -> Self {
        self.adjust = Some(Arc::new(f));
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Shorthand for [`FieldDefinition::new`]
    pub fn build(self) -> Result<FieldDefinition> {
        FieldDefinition::new(self)
    }
}

// =============================================================================
// Definition
// =============================================================================

/// Immutable description of one schema field
#[derive(Clone)]
pub struct FieldDefinition {
    name: String,
    path: FieldPath,
    required: Required,
    field_type: Option<SharedType>,
    coerce: Coerce,
    adjust: Option<Transform>,
    message: Option<String>,
    default: Option<Value>,
}

impl FieldDefinition {
    /// Build a definition, rejecting inconsistent configurations
    pub fn new(config: FieldConfig) -> Result<Self> {
        let path = FieldPath::parse(&config.name)?;

        if matches!(config.coerce, Coerce::ByType)
            && !config.field_type.as_ref().is_some_and(|t| t.can_coerce())
        {
            return Err(FormError::CoercionUnavailable { field: config.name });
        }

        if config.default.is_some() {
            if config.required.is_required() {
                return Err(FormError::DefaultOnRequired { field: config.name });
            }
            if path.has_wildcard() {
                return Err(FormError::DefaultOnWildcard { field: config.name });
            }
        }

        Ok(Self {
            name: config.name,
            path,
            required: config.required,
            field_type: config.field_type,
            coerce: config.coerce,
            adjust: config.adjust,
            message: config.message,
            default: config.default,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &FieldPath {
        &self.path
    }

    pub fn required(&self) -> Required {
        self.required
    }

    pub fn field_type(&self) -> Option<&dyn FieldType> {
        self.field_type.as_deref()
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn wants_array(&self) -> bool {
        self.path.wants_array()
    }

    /// Apply the configured coercion
    pub fn coerce(&self, value: Value) -> Value {
        match (&self.coerce, &self.field_type) {
            (Coerce::Off, _) => value,
            (Coerce::ByType, Some(field_type)) => field_type.coerce(value),
            (Coerce::ByType, None) => value,
            (Coerce::With(f), _) => f(value),
        }
    }

    /// Apply the configured adjustment
    pub fn adjust(&self, value: Value) -> Value {
        match &self.adjust {
            Some(f) => f(value),
            None => value,
        }
    }
}

impl fmt::Debug for FieldDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDefinition")
            .field("name", &self.name)
            .field("required", &self.required)
            .field("field_type", &self.field_type)
            .field("coerce", &self.coerce)
            .field("adjust", &self.adjust.as_ref().map(|_| "<fn>"))
            .field("message", &self.message)
            .field("default", &self.default)
            .finish()
    }
}
