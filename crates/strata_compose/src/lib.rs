//! # strata_compose
//!
//! Template composition for Strata.
//!
//! A [`Template`] is an ordered list of steps. Each step names a resource
//! type, an instance name and a closure producing the raw configuration from
//! the [`References`] of earlier steps. The [`Composer`] runs the steps in
//! order, accumulating one Terraform JSON document, and stops at the first
//! failure.
//!
//! Templates can also be written as YAML or JSON ([`TemplateFile`]) and can
//! pull in the prebuilt [`architectures`].
//!
//! ## Example
//!
//! ```rust
//! use serde_json::json;
//! use strata_compose::{Composer, Template};
//!
//! let template = Template::new("edge")
//!     .step("aws_vpc", "main", |_| Ok(json!({"cidr_block": "10.0.0.0/16"})))
//!     .step("aws_security_group", "web", |refs| {
//!         Ok(json!({"name": "web", "vpc_id": refs.output("main", "id")?}))
//!     });
//!
//! let composition = Composer::standard().unwrap().compose(&template).unwrap();
//! assert_eq!(composition.document().resource_count(), 2);
//! ```

pub mod architectures;
pub mod composer;
pub mod error;
pub mod file;
pub mod template;

pub use composer::{Composer, Composition};
pub use error::{ComposeError, ComposeResult};
pub use file::{ArchitectureSpec, Interpolator, OutputSpec, ResourceSpec, TemplateFile};
pub use template::{ConfigFn, OutputFn, References, Step, Template};
