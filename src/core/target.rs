//! Scan target validation.
//!
//! Accepts the same shapes the scan form accepts: CIDR blocks, literal
//! IPv4/IPv6 addresses, http(s) URLs, and plain dotted hostnames.
//! Validation is synchronous and happens before any network call, so an
//! invalid target never reaches the Job Service.

use std::net::IpAddr;
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

const MAX_TARGET_LEN: usize = 255;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TargetError {
    #[error("target must not be empty")]
    Empty,
    #[error("target exceeds {MAX_TARGET_LEN} characters")]
    TooLong,
    #[error("target is not a valid URL, IP address, CIDR block, or hostname")]
    Unrecognized,
}

fn url_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^https?://[^/\s]+").unwrap())
}

fn hostname_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9]([A-Za-z0-9._-]*[A-Za-z0-9])?$").unwrap())
}

/// Validate a scan target.
pub fn validate(target: &str) -> Result<(), TargetError> {
    let target = target.trim();
    if target.is_empty() {
        return Err(TargetError::Empty);
    }
    if target.len() > MAX_TARGET_LEN {
        return Err(TargetError::TooLong);
    }

    // CIDR block. A slash can also mean a URL path, so a failed parse falls
    // through to the other checks.
    if let Some((addr, prefix)) = target.split_once('/') {
        if let (Ok(ip), Ok(bits)) = (addr.parse::<IpAddr>(), prefix.parse::<u8>()) {
            let max_bits = if ip.is_ipv4() { 32 } else { 128 };
            if bits <= max_bits {
                return Ok(());
            }
        }
    }

    // Literal IP address (v4 or v6).
    if target.parse::<IpAddr>().is_ok() {
        return Ok(());
    }

    // URL with scheme and host.
    if url_re().is_match(target) {
        return Ok(());
    }

    // Plain dotted hostname.
    if target.contains('.') && hostname_re().is_match(target) {
        return Ok(());
    }

    Err(TargetError::Unrecognized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_hostnames() {
        assert!(validate("example.com").is_ok());
        assert!(validate("sub.domain.example.co.uk").is_ok());
        assert!(validate("host-01.internal.lan").is_ok());
    }

    #[test]
    fn accepts_ip_addresses() {
        assert!(validate("192.168.1.10").is_ok());
        assert!(validate("10.0.0.1").is_ok());
        assert!(validate("2001:db8::1").is_ok());
    }

    #[test]
    fn accepts_cidr_blocks() {
        assert!(validate("192.168.1.0/24").is_ok());
        assert!(validate("10.0.0.0/8").is_ok());
        assert!(validate("2001:db8::/64").is_ok());
    }

    #[test]
    fn rejects_out_of_range_prefix() {
        assert_eq!(validate("192.168.1.0/33"), Err(TargetError::Unrecognized));
        assert_eq!(validate("10.0.0.0/abc"), Err(TargetError::Unrecognized));
    }

    #[test]
    fn accepts_urls() {
        assert!(validate("http://example.com").is_ok());
        assert!(validate("https://example.com/app/login").is_ok());
        assert!(validate("https://example.com:8443").is_ok());
    }

    #[test]
    fn rejects_other_schemes() {
        assert_eq!(validate("ftp://example.com"), Err(TargetError::Unrecognized));
    }

    #[test]
    fn rejects_empty_and_whitespace() {
        assert_eq!(validate(""), Err(TargetError::Empty));
        assert_eq!(validate("   "), Err(TargetError::Empty));
    }

    #[test]
    fn rejects_overlong_targets() {
        let long = format!("{}.com", "a".repeat(MAX_TARGET_LEN));
        assert_eq!(validate(&long), Err(TargetError::TooLong));
    }

    #[test]
    fn rejects_bare_words_and_junk() {
        assert_eq!(validate("localhost"), Err(TargetError::Unrecognized));
        assert_eq!(validate("not a target"), Err(TargetError::Unrecognized));
        assert_eq!(validate("exam ple.com"), Err(TargetError::Unrecognized));
    }
}
