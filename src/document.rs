//! Declarative Schema Documents
//!
//! A schema written as data, for callers (and the CLI) that cannot build
//! definitions in code. Documents are JSON or TOML, chosen by extension.
//!
//! ## Example (TOML)
//! ```toml
//! strict = true
//!
//! [[fields]]
//! name = "user.name"
//! required = "hard"
//! type = "non_empty_string"
//! adjust = "trim"
//!
//! [[fields]]
//! name = "user.age"
//! type = "int"
//! coerce = true
//!
//! [[fields]]
//! name = "tags.*"
//! type = { pattern = "^[a-z]+$" }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

use crate::error::{FormError, Result};
use crate::field::{FieldConfig, Required};
use crate::form::{FormType, Schema};
use crate::hooks::Filter;
use crate::types::{Bool, Int, Map, NonEmptyStr, Num, OneOf, Pattern, Seq, SharedType, Str};

/// A whole schema as data
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaDocument {
    /// Reject input carrying undeclared data
    #[serde(default)]
    pub strict: bool,

    /// Trim surrounding whitespace from every string value
    #[serde(default)]
    pub trim: bool,

    #[serde(default)]
    pub fields: Vec<FieldSpec>,
}

/// One field as data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,

    #[serde(default)]
    pub required: Required,

    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_spec: Option<TypeSpec>,

    /// Use the type's built-in coercion
    #[serde(default)]
    pub coerce: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adjust: Option<AdjustSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

/// Built-in types available to documents
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeSpec {
    String,
    NonEmptyString,
    Int,
    Number,
    Bool,
    Array,
    Object,
    Pattern(String),
    OneOf(Vec<Value>),
    /// A nested form described inline
    Form(Box<SchemaDocument>),
}

/// Built-in adjustments available to documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdjustSpec {
    Uppercase,
    Lowercase,
    Trim,
}

impl AdjustSpec {
    pub fn apply(self, value: Value) -> Value {
        let Value::String(s) = value else {
            return value;
        };
        Value::String(match self {
            Self::Uppercase => s.to_uppercase(),
            Self::Lowercase => s.to_lowercase(),
            Self::Trim => s.trim().to_string(),
        })
    }
}

impl TypeSpec {
    fn build(&self) -> Result<SharedType> {
        Ok(match self {
            Self::String => Arc::new(Str),
            Self::NonEmptyString => Arc::new(NonEmptyStr),
            Self::Int => Arc::new(Int),
            Self::Number => Arc::new(Num),
            Self::Bool => Arc::new(Bool),
            Self::Array => Arc::new(Seq),
            Self::Object => Arc::new(Map),
            Self::Pattern(pattern) => Arc::new(Pattern::new(pattern)?),
            Self::OneOf(values) => Arc::new(OneOf::new(values.iter().cloned())),
            Self::Form(doc) => Arc::new(FormType::new(Arc::new(doc.to_schema()?))),
        })
    }
}

impl FieldSpec {
    fn to_config(&self) -> Result<FieldConfig> {
        let mut config = FieldConfig::new(&self.name).required(self.required);
        if let Some(type_spec) = &self.type_spec {
            config = config.of_shared_type(type_spec.build()?);
        }
        if self.coerce {
            config = config.coerce_by_type();
        }
        if let Some(adjust) = self.adjust {
            config = config.adjust(move |v| adjust.apply(v));
        }
        if let Some(message) = &self.message {
            config = config.message(message.clone());
        }
        if let Some(default) = &self.default {
            config = config.default_value(default.clone());
        }
        Ok(config)
    }
}

impl SchemaDocument {
    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load from a `.json` or `.toml` file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&content),
            Some("toml") => Self::from_toml(&content),
            other => Err(FormError::UnsupportedFormat(
                other.unwrap_or("<none>").to_string(),
            )),
        }
    }

    /// Materialize the document into a schema
    pub fn to_schema(&self) -> Result<Schema> {
        let mut builder = Schema::builder().strict(self.strict);
        for spec in &self.fields {
            builder = builder.add(spec.to_config()?)?;
        }
        if self.trim {
            builder = builder.with_hooks(|h| h.filter(Filter::trim()));
        }
        Ok(builder.build())
    }
}
