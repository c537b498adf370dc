//! Formgate
//!
//! Declarative validation and coercion of nested input records. A schema is
//! an ordered list of field definitions; validating an input record yields
//! either a cleaned record holding only the declared fields, or an ordered
//! list of structured errors.
//!
//! ## Features
//!
//! - **Path Expressions**: `user.address.city`, `items.*.sku`, with `\` escapes
//! - **Requiredness**: optional, soft (present) and hard (present and non-empty)
//! - **Mangling**: filter, coerce, validate and adjust each field value
//! - **Nested Forms**: schemas used as field types, errors re-homed by path
//! - **Extension Points**: reformat, before/after validation, cleanup hooks
//! - **Strict Mode**: reject input carrying undeclared data
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use formgate::{FieldConfig, Form, Schema};
//! use formgate::types::NonEmptyStr;
//! use serde_json::json;
//!
//! let schema = Schema::builder()
//!     .add(
//!         FieldConfig::new("n")
//!             .of_type(NonEmptyStr)
//!             .hard()
//!             .adjust(|v| json!(v.as_str().unwrap_or_default().to_uppercase())),
//!     )?
//!     .build();
//!
//! let mut form = Form::new(Arc::new(schema));
//! form.bind_input(json!({"n": "ok", "other": 1}));
//! assert!(form.is_valid());
//! assert_eq!(form.fields(), Some(&json!({"n": "OK"})));
//! # Ok::<(), formgate::FormError>(())
//! ```

pub mod config;
pub mod document;
pub mod error;
pub mod field;
pub mod form;
pub mod hooks;
pub mod path;
pub mod pipeline;
pub mod report;
pub mod types;

pub use config::FormgateConfig;
pub use document::SchemaDocument;
pub use error::{FormError, Result};
pub use field::{Coerce, FieldConfig, FieldDefinition, Required};
pub use form::{Form, FormState, FormType, Schema, SchemaBuilder};
pub use hooks::{Filter, Hooks};
pub use path::{FieldPath, PathSegment};
pub use report::{ErrorKind, ErrorSink, ValidationError, ValidationResult};
pub use types::FieldType;
