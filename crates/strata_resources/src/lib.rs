//! # strata_resources
//!
//! Resource type definitions for Strata.
//!
//! Each resource type implements [`Resource`]: a schema, an emission plan,
//! its documented outputs and the computed properties derived from a
//! validated configuration. [`ResourceRegistry::standard`] holds every type
//! shipped with Strata:
//!
//! - **AWS**: VPC, subnet, security group, load balancer, target group,
//!   listener, instance, launch template, autoscaling group, EKS node group, Cognito user
//!   pool domain, S3 bucket and object
//! - **Cloudflare**: zone, record, list item
//! - **Hetzner Cloud**: network, firewall, server
//!
//! ## Example
//!
//! ```rust
//! use serde_json::json;
//! use strata_resources::{PricingCatalog, ResourceRegistry};
//!
//! let registry = ResourceRegistry::standard().unwrap();
//! let built = registry
//!     .build(
//!         "aws_cognito_user_pool_domain",
//!         "auth",
//!         &json!({"domain": "myapp-auth", "user_pool_id": "pool1"}),
//!         &PricingCatalog::builtin(),
//!     )
//!     .unwrap();
//!
//! assert_eq!(built.reference.computed_bool("is_cognito_domain"), Some(true));
//! assert_eq!(built.reference.id(), Some("${aws_cognito_user_pool_domain.auth.id}"));
//! ```

pub mod aws;
pub mod cloudflare;
pub mod common;
pub mod error;
pub mod hetzner;
pub mod pricing;
pub mod provider;
pub mod registry;
pub mod resource;

pub use error::{ResourceError, ResourceResult};
pub use pricing::{PricingCatalog, PricingOverrides};
pub use provider::Provider;
pub use registry::ResourceRegistry;
pub use resource::{build, BuiltResource, Resource};
