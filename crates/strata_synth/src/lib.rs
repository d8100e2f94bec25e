//! # strata_synth
//!
//! Terraform JSON synthesis for Strata.
//!
//! Turns a [`ValidatedConfig`](strata_schema::ValidatedConfig) into a
//! [`SynthesizedBlock`] following an [`EmissionPlan`], accumulates blocks in
//! a [`Document`], and builds the [`ResourceReference`] handed back to
//! callers.
//!
//! ## Example
//!
//! ```rust
//! use serde_json::json;
//! use strata_schema::{validate, FieldType, Schema};
//! use strata_synth::{build_reference, synthesize, Computed, Document, EmissionPlan};
//!
//! let schema = Schema::builder("aws_s3_bucket")
//!     .required("bucket", FieldType::String)
//!     .optional("tags", FieldType::map_of(FieldType::String))
//!     .build()
//!     .unwrap();
//! let plan = EmissionPlan::from_schema(&schema);
//! let config = validate(&schema, &json!({"bucket": "assets"})).unwrap();
//!
//! let mut document = Document::new();
//! document.insert(synthesize("aws_s3_bucket", "assets", &config, &plan).unwrap()).unwrap();
//! let reference = build_reference("aws_s3_bucket", "assets", config, &["id", "arn"], Computed::new()).unwrap();
//!
//! assert_eq!(reference.arn(), Some("${aws_s3_bucket.assets.arn}"));
//! ```

pub mod document;
pub mod error;
pub mod ident;
pub mod plan;
pub mod reference;
pub mod synthesizer;

pub use document::{Document, Output};
pub use error::{SynthError, SynthResult};
pub use plan::{Emit, EmissionPlan, EmitRule};
pub use reference::{build_reference, placeholder, Computed, ResourceReference};
pub use synthesizer::{synthesize, SynthesizedBlock};
