//! Scanner trait abstraction.
//!
//! Defines a common interface for all scanner implementations,
//! enabling polymorphism and easier testing.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::time::Duration;

/// State of a scanned port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortState {
    /// Port is open (service listening).
    Open,
    /// Port is closed (actively refused or RST received).
    Closed,
    /// Port is filtered (no answer, possibly a firewall).
    Filtered,
    /// Port is either open or filtered (UDP-specific ambiguity).
    #[serde(rename = "open/filtered")]
    OpenOrFiltered,
}

impl PortState {
    /// Open or possibly open; these are the ports the summary counts as up.
    pub fn is_up(self) -> bool {
        matches!(self, Self::Open | Self::OpenOrFiltered)
    }
}

impl fmt::Display for PortState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Closed => write!(f, "closed"),
            Self::Filtered => write!(f, "filtered"),
            Self::OpenOrFiltered => write!(f, "open/filtered"),
        }
    }
}

/// Result of scanning a single port.
///
/// Serialized with the `Port`, `Status`, `Service` field names used by the
/// CSV and JSON exports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortResult {
    /// The port number that was scanned.
    #[serde(rename = "Port")]
    pub port: u16,
    /// State determined by the scan.
    #[serde(rename = "Status")]
    pub state: PortState,
    /// Banner text or inferred service name, never empty.
    #[serde(rename = "Service")]
    pub service: String,
}

impl PortResult {
    pub fn new(port: u16, state: PortState, service: impl Into<String>) -> Self {
        Self {
            port,
            state,
            service: service.into(),
        }
    }

    /// Check if the port is open or possibly open.
    pub fn is_open(&self) -> bool {
        self.state.is_up()
    }
}

/// Available scan types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ScanType {
    /// TCP connect scan (default, no special privileges required).
    #[default]
    Tcp,
    /// UDP probe scan.
    Udp,
    /// SYN half-open scan (requires root/admin privileges).
    Syn,
}

impl fmt::Display for ScanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp => write!(f, "TCP"),
            Self::Udp => write!(f, "UDP"),
            Self::Syn => write!(f, "SYN"),
        }
    }
}

/// Trait for port scanner implementations.
///
/// Each implementation probes one port of one target within its timeout and
/// always produces a result; network errors are folded into the port state.
/// Scanners own whatever sockets or capture handles they open for a probe
/// and release them before `scan_port` returns.
///
/// # Example
///
/// ```ignore
/// use barnacle::scanner::{Scanner, PortResult};
///
/// async fn probe<S: Scanner + ?Sized>(scanner: &S, port: u16) -> PortResult {
///     scanner.scan_port(port).await
/// }
/// ```
#[async_trait]
pub trait Scanner: Send + Sync {
    /// Get the scan type this scanner implements.
    fn scan_type(&self) -> ScanType;

    /// Check if this scanner requires elevated privileges.
    fn requires_privileges(&self) -> bool;

    /// Get the target IP address.
    fn target(&self) -> Ipv4Addr;

    /// Get the configured per-probe timeout.
    fn timeout(&self) -> Duration;

    /// Scan a single port.
    async fn scan_port(&self, port: u16) -> PortResult;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_state_display() {
        assert_eq!(PortState::Open.to_string(), "open");
        assert_eq!(PortState::Closed.to_string(), "closed");
        assert_eq!(PortState::Filtered.to_string(), "filtered");
        assert_eq!(PortState::OpenOrFiltered.to_string(), "open/filtered");
    }

    #[test]
    fn test_port_result_serializes_export_fields() {
        let result = PortResult::new(53, PortState::OpenOrFiltered, "dns");
        let json = serde_json::to_string(&result).unwrap();
        assert_eq!(json, r#"{"Port":53,"Status":"open/filtered","Service":"dns"}"#);
        assert!(result.is_open());
    }
}
