//! Rules and helpers shared across resource types.

use serde_json::{Map, Value};

use strata_schema::formats;
use strata_schema::Attributes;

/// Scaling triple check: `min ≤ desired ≤ max`.
///
/// Values that are absent or still placeholders are left to the evaluator.
pub fn check_scaling(
    config: &Map<String, Value>,
    min_key: &str,
    max_key: &str,
    desired_key: &str,
) -> Result<(), String> {
    let (min, max) = (config.get_i64(min_key), config.get_i64(max_key));

    if let (Some(min), Some(max)) = (min, max) {
        if min > max {
            return Err(format!(
                "{} ({}) cannot be greater than {} ({})",
                min_key, min, max_key, max
            ));
        }
    }

    if let Some(desired) = config.get_i64(desired_key) {
        let below = min.is_some_and(|min| desired < min);
        let above = max.is_some_and(|max| desired > max);
        if below || above {
            return Err(format!(
                "{} ({}) must be between {} ({}) and {} ({})",
                desired_key,
                desired,
                min_key,
                min.map_or_else(|| "?".to_string(), |v| v.to_string()),
                max_key,
                max.map_or_else(|| "?".to_string(), |v| v.to_string()),
            ));
        }
    }

    Ok(())
}

/// Number of addresses in an IPv4 CIDR block, 0 when not a literal CIDR.
pub fn address_count(cidr: Option<&Value>) -> u64 {
    cidr.and_then(formats::ipv4_prefix_len)
        .map_or(0, |prefix| 1u64 << (32 - u32::from(prefix)))
}

/// Whether any of `cidrs` is open to the whole internet.
pub fn any_open_cidr<'a>(cidrs: impl IntoIterator<Item = &'a str>) -> bool {
    cidrs.into_iter().any(formats::is_open_cidr)
}

/// Classify exposure from the ports open to the internet.
///
/// `high` with nothing public, `medium` when only web ports are public,
/// `low` otherwise.
pub fn security_level(public_ports: &[(i64, i64)]) -> &'static str {
    if public_ports.is_empty() {
        "high"
    } else if public_ports
        .iter()
        .all(|&(from, to)| from == to && (from == 80 || from == 443))
    {
        "medium"
    } else {
        "low"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_scaling_messages() {
        let err = check_scaling(
            &map(json!({"min_size": 5, "max_size": 3, "desired_size": 4})),
            "min_size",
            "max_size",
            "desired_size",
        )
        .unwrap_err();
        assert_eq!(err, "min_size (5) cannot be greater than max_size (3)");

        let err = check_scaling(
            &map(json!({"min_size": 1, "max_size": 3, "desired_size": 4})),
            "min_size",
            "max_size",
            "desired_size",
        )
        .unwrap_err();
        assert_eq!(err, "desired_size (4) must be between min_size (1) and max_size (3)");
    }

    #[test]
    fn test_scaling_skips_placeholders() {
        let config = map(json!({"min_size": "${var.min}", "max_size": 3, "desired_size": 2}));
        assert!(check_scaling(&config, "min_size", "max_size", "desired_size").is_ok());
    }

    #[test]
    fn test_address_count() {
        assert_eq!(address_count(Some(&json!("10.0.0.0/16"))), 65536);
        assert_eq!(address_count(Some(&json!("${aws_vpc.main.cidr_block}"))), 0);
        assert_eq!(address_count(None), 0);
    }

    #[test]
    fn test_security_level() {
        assert_eq!(security_level(&[]), "high");
        assert_eq!(security_level(&[(443, 443), (80, 80)]), "medium");
        assert_eq!(security_level(&[(22, 22)]), "low");
        assert_eq!(security_level(&[(0, 65535)]), "low");
    }
}
