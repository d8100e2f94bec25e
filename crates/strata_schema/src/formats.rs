//! Reusable field types for common infrastructure formats.

use std::net::{Ipv4Addr, Ipv6Addr};

use serde_json::Value;

use crate::error::SchemaResult;
use crate::types::{Constraint, FieldType};

/// IPv4 network in CIDR notation (`10.0.0.0/16`).
pub fn ipv4_cidr() -> FieldType {
    FieldType::String.with(Constraint::predicate("IPv4 CIDR block", |v| {
        v.as_str().is_some_and(is_ipv4_cidr)
    }))
}

/// IPv4 or IPv6 network in CIDR notation.
pub fn any_cidr() -> FieldType {
    FieldType::String.with(Constraint::predicate("CIDR block", |v| {
        v.as_str().is_some_and(|s| is_ipv4_cidr(s) || is_ipv6_cidr(s))
    }))
}

/// Bare IPv4 or IPv6 address.
pub fn ip_address() -> FieldType {
    FieldType::String.with(Constraint::predicate("IP address", |v| {
        v.as_str()
            .is_some_and(|s| s.parse::<Ipv4Addr>().is_ok() || s.parse::<Ipv6Addr>().is_ok())
    }))
}

/// TCP/UDP port, 0 allowed for "all ports" semantics.
pub fn port() -> FieldType {
    FieldType::Integer.with(Constraint::between(0, 65535))
}

/// Listener port, 1..=65535.
pub fn listener_port() -> FieldType {
    FieldType::Integer.with(Constraint::between(1, 65535))
}

/// Amazon Resource Name.
pub fn arn() -> SchemaResult<FieldType> {
    Ok(FieldType::String.with(Constraint::pattern("ARN", r"^arn:aws[a-z-]*:[a-z0-9-]+:")?))
}

/// AWS identifier with a fixed prefix (`vpc-`, `subnet-`, `sg-`, `ami-`).
pub fn aws_id(prefix: &str) -> SchemaResult<FieldType> {
    Ok(FieldType::String.with(Constraint::pattern(
        format!("{} id", prefix),
        &format!("^{}-[0-9a-f]{{8,17}}$", regex::escape(prefix)),
    )?))
}

/// Fully qualified DNS name.
pub fn dns_name() -> SchemaResult<FieldType> {
    Ok(FieldType::String.with(Constraint::pattern(
        "DNS name",
        r"^(\*\.)?([a-zA-Z0-9]([a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?\.)+[a-zA-Z]{2,63}$",
    )?))
}

/// String that must not be empty.
pub fn non_empty() -> FieldType {
    FieldType::String.with(Constraint::length(Some(1), None))
}

/// Map of string tags.
pub fn tags() -> FieldType {
    FieldType::map_of(FieldType::String)
}

pub fn is_ipv4_cidr(s: &str) -> bool {
    let Some((addr, prefix)) = s.split_once('/') else {
        return false;
    };
    addr.parse::<Ipv4Addr>().is_ok() && prefix.parse::<u8>().is_ok_and(|p| p <= 32)
}

pub fn is_ipv6_cidr(s: &str) -> bool {
    let Some((addr, prefix)) = s.split_once('/') else {
        return false;
    };
    addr.parse::<Ipv6Addr>().is_ok() && prefix.parse::<u8>().is_ok_and(|p| p <= 128)
}

/// Prefix length of an IPv4 CIDR block.
pub fn ipv4_prefix_len(value: &Value) -> Option<u8> {
    let s = value.as_str()?;
    if !is_ipv4_cidr(s) {
        return None;
    }
    s.split_once('/').and_then(|(_, p)| p.parse().ok())
}

const PRIVATE_IPV4_BLOCKS: [(Ipv4Addr, u8); 3] = [
    (Ipv4Addr::new(10, 0, 0, 0), 8),
    (Ipv4Addr::new(172, 16, 0, 0), 12),
    (Ipv4Addr::new(192, 168, 0, 0), 16),
];

/// Whether an IPv4 CIDR lies entirely inside RFC 1918 private space.
pub fn is_private_ipv4_cidr(s: &str) -> bool {
    let Some((addr, prefix)) = s.split_once('/') else {
        return false;
    };
    let (Ok(addr), Ok(prefix)) = (addr.parse::<Ipv4Addr>(), prefix.parse::<u8>()) else {
        return false;
    };
    if prefix > 32 {
        return false;
    }
    PRIVATE_IPV4_BLOCKS.iter().any(|(network, bits)| {
        let mask = u32::MAX << (32 - u32::from(*bits));
        prefix >= *bits && u32::from(addr) & mask == u32::from(*network)
    })
}

/// Whether a CIDR covers the whole internet.
pub fn is_open_cidr(s: &str) -> bool {
    s == "0.0.0.0/0" || s == "::/0"
}
