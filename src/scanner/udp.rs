//! UDP Scanner implementation.
//!
//! Sends a small datagram and waits once for an answer. UDP has no
//! handshake, so the only positive signal is a reply; silence leaves the
//! port open or filtered.
//!
//! # Detection
//!
//! 1. **Socket setup or send fails**: closed
//! 2. **UDP response**: open, and the payload is the banner
//! 3. **No response before the deadline**: open|filtered
//!
//! An ICMP port-unreachable surfacing as a read error is not treated as a
//! closed signal; it is indistinguishable here from any other missing reply.

use crate::banner::{sanitize_banner, service_name};
use crate::error::{ScanError, ScanResult};
use crate::scanner::classify::{classify, ProbeOutcome};
use crate::scanner::traits::{PortResult, ScanType, Scanner};
use crate::services::ServiceTable;
use async_trait::async_trait;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::timeout;
use tracing::debug;

/// Payload of every UDP probe.
pub const UDP_PROBE: &[u8; 4] = b"Ping";

const MAX_DATAGRAM: usize = 1024;

/// UDP Scanner for detecting open UDP ports.
pub struct UdpScanner {
    target: Ipv4Addr,
    timeout: Duration,
    services: Arc<ServiceTable>,
}

impl UdpScanner {
    /// Create a new UDP scanner.
    ///
    /// # Arguments
    /// * `target` - Target IP address
    /// * `timeout` - How long to wait for a response
    /// * `services` - Names for ports that do not answer
    pub fn new(target: Ipv4Addr, timeout: Duration, services: Arc<ServiceTable>) -> Self {
        Self {
            target,
            timeout,
            services,
        }
    }

    /// Bind an ephemeral local socket, associate it with the target, and send
    /// the probe.
    async fn send_probe(&self, addr: SocketAddr) -> ScanResult<UdpSocket> {
        let socket = UdpSocket::bind(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0)).await?;
        socket
            .connect(addr)
            .await
            .map_err(|e| ScanError::ConnectionFailed(e.to_string()))?;
        socket
            .send(UDP_PROBE)
            .await
            .map_err(|e| ScanError::ConnectionFailed(e.to_string()))?;
        Ok(socket)
    }

    /// Wait once for a reply.
    async fn await_reply(&self, socket: &UdpSocket) -> Option<Vec<u8>> {
        let mut buf = vec![0u8; MAX_DATAGRAM];
        match timeout(self.timeout, socket.recv(&mut buf)).await {
            Ok(Ok(n)) => {
                buf.truncate(n);
                Some(buf)
            }
            Ok(Err(e)) => {
                debug!(target_ip = %self.target, error = %e, "udp read error");
                None
            }
            Err(_) => None,
        }
    }
}

#[async_trait]
impl Scanner for UdpScanner {
    fn scan_type(&self) -> ScanType {
        ScanType::Udp
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

        let (outcome, banner) = match self.send_probe(addr).await {
            Err(e) => {
                debug!(%addr, error = %e, "udp probe could not be sent");
                (ProbeOutcome::SendFailed, String::new())
            }
            Ok(socket) => match self.await_reply(&socket).await {
                Some(reply) => (ProbeOutcome::Responded, sanitize_banner(&reply)),
                None => (ProbeOutcome::NoResponse, String::new()),
            },
        };

        let state = classify(outcome);
        debug!(%addr, %state, "udp probe complete");

        PortResult::new(port, state, service_name(&banner, &self.services, port))
    }
}
