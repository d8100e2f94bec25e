//! S3 buckets and objects.

use std::path::Path;

use serde_json::json;

use strata_schema::formats::{non_empty, tags};
use strata_schema::{
    is_interpolation, Attributes, Constraint, FieldType, Schema, SchemaResult, ValidatedConfig,
    ValidationError, ValidationResult,
};
use strata_synth::{Computed, EmissionPlan};

use crate::pricing::PricingCatalog;
use crate::provider::Provider;
use crate::resource::Resource;

/// `aws_s3_bucket`
pub struct S3Bucket {
    schema: Schema,
    plan: EmissionPlan,
}

impl S3Bucket {
    pub fn new() -> SchemaResult<Self> {
        let schema = Schema::builder("aws_s3_bucket")
            .optional(
                "bucket",
                FieldType::String.with(Constraint::pattern(
                    "S3 bucket name",
                    r"^[a-z0-9][a-z0-9.-]{1,61}[a-z0-9]$",
                )?),
            )
            .optional(
                "bucket_prefix",
                FieldType::String.with(Constraint::pattern(
                    "S3 bucket prefix",
                    r"^[a-z0-9][a-z0-9.-]{0,36}$",
                )?),
            )
            .with_default("force_destroy", FieldType::Boolean, json!(false))
            .optional("object_lock_enabled", FieldType::Boolean)
            .optional("tags", tags())
            .at_most_one_of(&["bucket", "bucket_prefix"])
            .rule("no_consecutive_dots", &["bucket"], |c| match c.get_str("bucket") {
                Some(bucket) if bucket.contains("..") => {
                    Err(format!("bucket name {:?} cannot contain consecutive dots", bucket))
                }
                _ => Ok(()),
            })
            .build()?;
        let plan = EmissionPlan::from_schema(&schema);
        Ok(Self { schema, plan })
    }
}

impl Resource for S3Bucket {
    fn resource_type(&self) -> &'static str {
        "aws_s3_bucket"
    }

    fn provider(&self) -> Provider {
        Provider::Aws
    }

    fn description(&self) -> &'static str {
        "S3 bucket"
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn plan(&self) -> &EmissionPlan {
        &self.plan
    }

    fn outputs(&self) -> &'static [&'static str] {
        &[
            "id",
            "arn",
            "bucket",
            "bucket_domain_name",
            "bucket_regional_domain_name",
            "hosted_zone_id",
            "region",
        ]
    }

    fn computed(&self, config: &ValidatedConfig, _pricing: &PricingCatalog) -> Computed {
        Computed::from([
            ("has_explicit_name".to_string(), json!(config.has("bucket"))),
            (
                "object_lock".to_string(),
                json!(config.get_bool("object_lock_enabled").unwrap_or(false)),
            ),
        ])
    }
}

/// `aws_s3_object`
pub struct S3Object {
    schema: Schema,
    plan: EmissionPlan,
}

const PUBLIC_ACLS: [&str; 2] = ["public-read", "public-read-write"];

impl S3Object {
    pub fn new() -> SchemaResult<Self> {
        let schema = Schema::builder("aws_s3_object")
            .required("bucket", non_empty())
            .required("key", FieldType::String.with(Constraint::length(Some(1), Some(1024))))
            .optional("source", non_empty())
            .optional("content", FieldType::String)
            .optional("content_base64", FieldType::String)
            .optional("content_type", FieldType::String)
            .optional("cache_control", FieldType::String)
            .optional("etag", FieldType::String)
            .optional(
                "acl",
                FieldType::enumeration(&[
                    "private",
                    "public-read",
                    "public-read-write",
                    "authenticated-read",
                    "bucket-owner-read",
                    "bucket-owner-full-control",
                ]),
            )
            .optional(
                "server_side_encryption",
                FieldType::enumeration(&["AES256", "aws:kms", "aws:kms:dsse"]),
            )
            .optional("kms_key_id", FieldType::String)
            .optional("metadata", FieldType::map_of(FieldType::String))
            .optional("tags", tags())
            .exactly_one_of(&["source", "content", "content_base64"])
            .rule("kms_key_encryption", &["kms_key_id", "server_side_encryption"], |c| {
                let kms = c
                    .get_str("server_side_encryption")
                    .is_some_and(|s| s.starts_with("aws:kms"));
                if c.has("kms_key_id") && !kms {
                    return Err("kms_key_id requires server_side_encryption aws:kms".to_string());
                }
                Ok(())
            })
            .build()?;
        let plan = EmissionPlan::from_schema(&schema);
        Ok(Self { schema, plan })
    }
}

impl Resource for S3Object {
    fn resource_type(&self) -> &'static str {
        "aws_s3_object"
    }

    fn provider(&self) -> Provider {
        Provider::Aws
    }

    fn description(&self) -> &'static str {
        "Object uploaded to an S3 bucket"
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn plan(&self) -> &EmissionPlan {
        &self.plan
    }

    fn outputs(&self) -> &'static [&'static str] {
        &["id", "etag", "version_id"]
    }

    fn computed(&self, config: &ValidatedConfig, _pricing: &PricingCatalog) -> Computed {
        let content_source = if config.has("source") {
            "file"
        } else if config.has("content_base64") {
            "base64"
        } else {
            "inline"
        };
        let is_public = config.get_str("acl").is_some_and(|acl| PUBLIC_ACLS.contains(&acl));
        Computed::from([
            ("content_source".to_string(), json!(content_source)),
            ("is_public".to_string(), json!(is_public)),
            ("is_encrypted".to_string(), json!(config.has("server_side_encryption"))),
        ])
    }

    /// The upload source must exist on the machine running synthesis.
    fn preflight(&self, config: &ValidatedConfig) -> ValidationResult<()> {
        match config.get_str("source") {
            Some(source) if !is_interpolation(source) && !Path::new(source).exists() => {
                Err(ValidationError::SourceNotFound {
                    field: "source".to_string(),
                    path: source.into(),
                })
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::build;
    use serde_json::Value;
    use std::fs;
    use tempfile::TempDir;

    fn object(raw: Value) -> crate::error::ResourceResult<crate::resource::BuiltResource> {
        build(&S3Object::new().unwrap(), "index", &raw, &PricingCatalog::builtin())
    }

    #[test]
    fn test_bucket_name_rules() {
        let bucket = S3Bucket::new().unwrap();
        let pricing = PricingCatalog::builtin();
        assert!(build(&bucket, "assets", &json!({"bucket": "Assets"}), &pricing).is_err());
        assert!(build(&bucket, "assets", &json!({"bucket": "my..assets"}), &pricing).is_err());

        let built = build(&bucket, "assets", &json!({"bucket_prefix": "assets-"}), &pricing).unwrap();
        assert_eq!(built.reference.computed_bool("has_explicit_name"), Some(false));
    }

    #[test]
    fn test_object_source_exists() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("index.html");
        fs::write(&path, "<h1>hi</h1>").unwrap();

        let built = object(json!({
            "bucket": "${aws_s3_bucket.site.id}",
            "key": "index.html",
            "source": path.to_string_lossy(),
            "content_type": "text/html"
        }))
        .unwrap();
        assert_eq!(built.reference.computed("content_source"), Some(&json!("file")));
    }

    #[test]
    fn test_object_missing_source() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("missing.html");

        let err = object(json!({"bucket": "site", "key": "index.html", "source": path.to_string_lossy()}))
            .unwrap_err();
        match err.validation_error() {
            Some(ValidationError::SourceNotFound { field, path: missing }) => {
                assert_eq!(field, "source");
                assert_eq!(missing, &path);
            }
            other => panic!("expected SourceNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_object_content_variants() {
        let err = object(json!({"bucket": "site", "key": "a", "content": "x", "content_base64": "eA=="})).unwrap_err();
        assert!(matches!(
            err.validation_error(),
            Some(ValidationError::AmbiguousVariant { .. })
        ));

        let err = object(json!({"bucket": "site", "key": "a"})).unwrap_err();
        assert!(matches!(
            err.validation_error(),
            Some(ValidationError::NoVariantSelected { .. })
        ));

        let built = object(json!({"bucket": "site", "key": "a", "content": "x", "acl": "public-read"})).unwrap();
        assert_eq!(built.reference.computed_bool("is_public"), Some(true));
    }

    #[test]
    fn test_kms_key_requires_kms_encryption() {
        let err = object(json!({
            "bucket": "site",
            "key": "a",
            "content": "x",
            "server_side_encryption": "AES256",
            "kms_key_id": "alias/site"
        }))
        .unwrap_err();
        assert!(err.to_string().contains("kms_key_id requires server_side_encryption aws:kms"));
    }
}
