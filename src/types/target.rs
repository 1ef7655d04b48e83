//! Target parsing.
//!
//! Only literal IPv4 dotted-quad addresses are accepted: no hostnames,
//! no CIDR blocks, no IPv6.

use std::net::{IpAddr, Ipv4Addr};

/// Error type for target parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TargetError {
    #[error("invalid target host '{0}': expected an IPv4 address such as 192.168.1.10")]
    InvalidFormat(String),
    #[error("IPv6 targets are not supported: {0}")]
    Ipv6Unsupported(String),
}

/// Parse a scan target into an IPv4 address.
pub fn parse_target(s: &str) -> Result<Ipv4Addr, TargetError> {
    let s = s.trim();
    match s.parse::<IpAddr>() {
        Ok(IpAddr::V4(ip)) => Ok(ip),
        Ok(IpAddr::V6(_)) => Err(TargetError::Ipv6Unsupported(s.to_string())),
        Err(_) => Err(TargetError::InvalidFormat(s.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ipv4() {
        assert_eq!(parse_target("127.0.0.1"), Ok(Ipv4Addr::LOCALHOST));
        assert_eq!(
            parse_target(" 192.168.1.254 "),
            Ok(Ipv4Addr::new(192, 168, 1, 254))
        );
    }

    #[test]
    fn test_rejects_non_ipv4() {
        assert!(matches!(
            parse_target("example.com"),
            Err(TargetError::InvalidFormat(_))
        ));
        assert!(matches!(
            parse_target("256.1.1.1"),
            Err(TargetError::InvalidFormat(_))
        ));
        assert!(matches!(
            parse_target("10.0.0"),
            Err(TargetError::InvalidFormat(_))
        ));
        assert!(matches!(
            parse_target("::1"),
            Err(TargetError::Ipv6Unsupported(_))
        ));
    }
}
