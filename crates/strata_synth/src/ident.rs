//! Identifier checks that keep placeholders well formed.

use crate::error::{SynthError, SynthResult};

/// Resource type tags: lowercase provider-prefixed names (`aws_lb`).
pub fn check_resource_type(value: &str) -> SynthResult<()> {
    let mut chars = value.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_lowercase())
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    ensure(valid, "resource type", value)
}

/// Instance names: Terraform identifiers.
pub fn check_instance_name(value: &str) -> SynthResult<()> {
    let mut chars = value.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    ensure(valid, "instance name", value)
}

/// Output attribute names (`id`, `dns_name`).
pub fn check_output_name(value: &str) -> SynthResult<()> {
    let valid = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    ensure(valid, "output", value)
}

fn ensure(valid: bool, kind: &'static str, value: &str) -> SynthResult<()> {
    if valid {
        Ok(())
    } else {
        Err(SynthError::InvalidIdentifier {
            kind,
            value: value.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_names() {
        assert!(check_instance_name("web_alb").is_ok());
        assert!(check_instance_name("_private").is_ok());
        assert!(check_instance_name("node-group-1").is_ok());
        assert!(check_instance_name("1st").is_err());
        assert!(check_instance_name("a.b").is_err());
        assert!(check_instance_name("${x}").is_err());
        assert!(check_instance_name("").is_err());
    }

    #[test]
    fn test_resource_types() {
        assert!(check_resource_type("aws_eks_node_group").is_ok());
        assert!(check_resource_type("AWS_LB").is_err());
        assert!(check_resource_type("_lb").is_err());
    }
}
