//! # strata_schema
//!
//! Schema type library and attribute validator for Strata.
//!
//! A [`Schema`] declares the shape of a resource configuration: typed fields,
//! defaults, tagged unions of mutually exclusive fields and cross-field
//! rules. [`validate`] applies it to raw JSON input and yields a
//! [`ValidatedConfig`] or the first [`ValidationError`] found.
//!
//! ## Example
//!
//! ```rust
//! use serde_json::json;
//! use strata_schema::{validate, Attributes, Constraint, FieldType, Schema};
//!
//! let schema = Schema::builder("scaling_config")
//!     .required("min_size", FieldType::Integer.with(Constraint::at_least(0)))
//!     .required("max_size", FieldType::Integer)
//!     .rule("min_le_max", &["min_size", "max_size"], |c| {
//!         let (min, max) = (c.get_i64("min_size"), c.get_i64("max_size"));
//!         match (min, max) {
//!             (Some(min), Some(max)) if min > max => Err(format!(
//!                 "min_size ({}) cannot be greater than max_size ({})",
//!                 min, max
//!             )),
//!             _ => Ok(()),
//!         }
//!     })
//!     .build()
//!     .unwrap();
//!
//! let err = validate(&schema, &json!({"min_size": 5, "max_size": 3})).unwrap_err();
//! assert!(err.to_string().contains("min_size (5)"));
//! ```

pub mod config;
pub mod error;
pub mod formats;
pub mod schema;
pub mod types;
pub mod validator;

pub use config::{Attributes, ValidatedConfig};
pub use error::{SchemaError, SchemaResult, ValidationError, ValidationResult};
pub use schema::{CrossFieldRule, Field, Schema, SchemaBuilder, UnknownKeys, VariantGroup, VariantRule};
pub use types::{Constraint, FieldType};
pub use validator::{check_rules, is_interpolation, normalize_key, parse, validate};
