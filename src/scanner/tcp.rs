//! TCP Connect Scanner implementation.
//!
//! Performs standard TCP connect scans using the operating system's
//! socket API. This is the most reliable scanning method but also
//! the most detectable as it completes the full TCP handshake.

use crate::banner::{identify, service_name};
use crate::error::{ScanError, ScanResult};
use crate::scanner::classify::{classify, ProbeOutcome};
use crate::scanner::traits::{PortResult, ScanType, Scanner};
use crate::services::ServiceTable;
use async_trait::async_trait;
use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

/// TCP Connect Scanner.
///
/// Uses standard socket connect() calls to determine port state.
/// Does not require elevated privileges.
pub struct TcpConnectScanner {
    target: Ipv4Addr,
    timeout: Duration,
    banner_timeout: Duration,
    services: Arc<ServiceTable>,
}

impl TcpConnectScanner {
    /// Create a new TCP connect scanner.
    ///
    /// # Arguments
    /// * `target` - Target IP address to scan
    /// * `timeout` - Connection timeout per port
    /// * `banner_timeout` - Deadline for the banner read on open ports
    /// * `services` - Fallback names for ports without a banner
    pub fn new(
        target: Ipv4Addr,
        timeout: Duration,
        banner_timeout: Duration,
        services: Arc<ServiceTable>,
    ) -> Self {
        Self {
            target,
            timeout,
            banner_timeout,
            services,
        }
    }

    /// Attempt to connect to the target address.
    async fn attempt_connect(&self, addr: SocketAddr) -> ScanResult<TcpStream> {
        connect_with_timeout(addr, self.timeout).await
    }
}

/// Connect to `addr`, translating the failure into a `ScanError`.
pub(crate) async fn connect_with_timeout(
    addr: SocketAddr,
    connect_timeout: Duration,
) -> ScanResult<TcpStream> {
    match timeout(connect_timeout, TcpStream::connect(addr)).await {
        Ok(Ok(stream)) => Ok(stream),
        Ok(Err(e)) => Err(connect_error(e)),
        Err(_) => Err(ScanError::Timeout),
    }
}

fn connect_error(e: io::Error) -> ScanError {
    match e.kind() {
        io::ErrorKind::ConnectionRefused => ScanError::ConnectionRefused,
        io::ErrorKind::TimedOut => ScanError::Timeout,
        io::ErrorKind::PermissionDenied => ScanError::PermissionDenied(e.to_string()),
        _ => {
            let error_str = e.to_string().to_lowercase();
            if error_str.contains("unreachable") {
                if error_str.contains("host") {
                    ScanError::HostUnreachable
                } else {
                    ScanError::NetworkUnreachable(e.to_string())
                }
            } else {
                ScanError::ConnectionFailed(e.to_string())
            }
        }
    }
}

#[async_trait]
impl Scanner for TcpConnectScanner {
    fn scan_type(&self) -> ScanType {
        ScanType::Tcp
    }

    fn requires_privileges(&self) -> bool {
        false
    }

    fn target(&self) -> Ipv4Addr {
        self.target
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn scan_port(&self, port: u16) -> PortResult {
        let addr = SocketAddr::V4(SocketAddrV4::new(self.target, port));

        let (outcome, banner) = match self.attempt_connect(addr).await {
            Ok(mut stream) => {
                // The stream is closed when it drops at the end of this arm.
                let banner = identify(&mut stream, self.banner_timeout).await;
                (ProbeOutcome::Connected, banner)
            }
            Err(e) => {
                debug!(%addr, error = %e, "tcp connect failed");
                (ProbeOutcome::from_connect_error(&e), String::new())
            }
        };

        let state = classify(outcome);
        debug!(%addr, %state, "tcp probe complete");

        PortResult::new(port, state, service_name(&banner, &self.services, port))
    }
}
