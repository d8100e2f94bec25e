//! Cognito user pool domain.

use serde_json::{json, Map, Value};

use strata_schema::formats::{arn, non_empty};
use strata_schema::{is_interpolation, Attributes, Constraint, FieldType, Schema, SchemaResult, ValidatedConfig};
use strata_synth::{Computed, EmissionPlan};

use crate::pricing::PricingCatalog;
use crate::provider::Provider;
use crate::resource::Resource;

const RESERVED_PREFIX_WORDS: [&str; 3] = ["aws", "amazon", "cognito"];

/// `aws_cognito_user_pool_domain`
///
/// A domain containing a dot is a custom domain served with the caller's
/// certificate; anything else is a prefix under `auth.<region>.amazoncognito.com`.
pub struct CognitoUserPoolDomain {
    schema: Schema,
    plan: EmissionPlan,
}

fn is_custom_domain(domain: &str) -> bool {
    domain.contains('.')
}

/// A placeholder domain is unknown until apply; its kind follows the certificate.
fn resolves_custom(domain: &str, has_certificate: bool) -> bool {
    if is_interpolation(domain) {
        has_certificate
    } else {
        is_custom_domain(domain)
    }
}

fn check_prefix(config: &Map<String, Value>) -> Result<(), String> {
    let Some(domain) = config.get_str("domain") else {
        return Ok(());
    };
    if is_custom_domain(domain) || is_interpolation(domain) {
        return Ok(());
    }

    let well_formed = domain.len() <= 63
        && domain
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !domain.starts_with('-')
        && !domain.ends_with('-');
    if !well_formed {
        return Err(format!(
            "domain prefix {:?} must be lowercase letters, digits and inner hyphens",
            domain
        ));
    }

    if let Some(word) = RESERVED_PREFIX_WORDS.iter().find(|w| domain.contains(*w)) {
        return Err(format!("domain prefix cannot contain the reserved word {:?}", word));
    }
    Ok(())
}

impl CognitoUserPoolDomain {
    pub fn new() -> SchemaResult<Self> {
        let schema = Schema::builder("aws_cognito_user_pool_domain")
            .required("domain", non_empty())
            .required("user_pool_id", non_empty())
            .optional("certificate_arn", arn()?)
            .optional(
                "managed_login_version",
                FieldType::Integer.with(Constraint::between(1, 2)),
            )
            .rule("custom_domain_certificate", &["domain", "certificate_arn"], |c| {
                match c.get_str("domain") {
                    Some(domain) if is_interpolation(domain) => Ok(()),
                    Some(domain) if is_custom_domain(domain) && !c.has("certificate_arn") => {
                        Err("certificate_arn is required for custom domains".to_string())
                    }
                    Some(domain) if !is_custom_domain(domain) && c.has("certificate_arn") => {
                        Err("certificate_arn is only valid for custom domains".to_string())
                    }
                    _ => Ok(()),
                }
            })
            .rule("cognito_prefix", &["domain"], check_prefix)
            .build()?;
        let plan = EmissionPlan::from_schema(&schema);
        Ok(Self { schema, plan })
    }
}

impl Resource for CognitoUserPoolDomain {
    fn resource_type(&self) -> &'static str {
        "aws_cognito_user_pool_domain"
    }

    fn provider(&self) -> Provider {
        Provider::Aws
    }

    fn description(&self) -> &'static str {
        "Hosted UI domain for a Cognito user pool"
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
            "aws_account_id",
            "cloudfront_distribution",
            "cloudfront_distribution_arn",
            "cloudfront_distribution_zone_id",
            "s3_bucket",
            "version",
        ]
    }

    fn computed(&self, config: &ValidatedConfig, _pricing: &PricingCatalog) -> Computed {
        let custom = config
            .get_str("domain")
            .is_some_and(|d| resolves_custom(d, config.has("certificate_arn")));
        Computed::from([
            ("is_custom_domain".to_string(), json!(custom)),
            ("is_cognito_domain".to_string(), json!(!custom)),
            (
                "domain_type".to_string(),
                json!(if custom { "custom" } else { "cognito" }),
            ),
        ])
    }
}
