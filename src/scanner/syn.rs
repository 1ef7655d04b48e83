//! SYN (Stealth) Scanner implementation.
//!
//! Performs half-open TCP scanning by sending SYN packets and analyzing
//! responses without completing the TCP handshake. Requires raw socket
//! access (elevated privileges).
//!
//! # How It Works
//!
//! 1. Open a capture channel on the interface that owns the outbound address
//! 2. Send a TCP SYN frame to the target port
//! 3. Watch for a frame passing the probe's [`CaptureFilter`]:
//!    - SYN/ACK: port is open; send RST so the remote drops the half-open
//!      connection, then grab a banner over an ordinary connection
//!    - RST: port is closed
//!    - Nothing before the timeout: port is filtered
//!
//! Every probe opens its own channel and drops it before returning.

use crate::banner::{identify, service_name};
use crate::error::{ScanError, ScanResult};
use crate::scanner::classify::{classify, ProbeOutcome};
use crate::scanner::packet::{build_rst, build_syn, CaptureFilter, Endpoints};
use crate::scanner::tcp::connect_with_timeout;
use crate::scanner::traits::{PortResult, ScanType, Scanner};
use crate::services::ServiceTable;
use async_trait::async_trait;
use pnet::datalink::{self, Channel, DataLinkReceiver, DataLinkSender, NetworkInterface};
use pnet::util::MacAddr;
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Source port of every SYN probe unless configured otherwise.
pub const DEFAULT_SOURCE_PORT: u16 = 12345;

/// How long one blocking read on the capture channel may wait before the
/// probe re-checks its deadline and cancellation.
const CAPTURE_POLL: Duration = Duration::from_millis(50);

/// SYN Scanner for stealth port scanning.
///
/// **Requires elevated privileges (root/sudo).**
pub struct SynScanner {
    target: Ipv4Addr,
    route: ScanResult<Route>,
    source_port: u16,
    timeout: Duration,
    banner_timeout: Duration,
    services: Arc<ServiceTable>,
    cancel: CancellationToken,
}

/// Interface and local address that probes leave from.
#[derive(Debug, Clone)]
struct Route {
    interface: NetworkInterface,
    source_ip: Ipv4Addr,
}

impl SynScanner {
    /// Create a new SYN scanner.
    ///
    /// Resolves the outbound IPv4 address toward `target` and the interface
    /// that owns it, or uses `interface_name` when given. A resolution
    /// failure does not stop construction: every probe then reports its port
    /// as filtered.
    pub fn new(
        target: Ipv4Addr,
        interface_name: Option<&str>,
        timeout: Duration,
        services: Arc<ServiceTable>,
    ) -> Self {
        let route = resolve_interface(target, interface_name)
            .map(|(interface, source_ip)| Route { interface, source_ip });
        match &route {
            Ok(route) => debug!(
                interface = %route.interface.name,
                source_ip = %route.source_ip,
                "syn scanner bound to interface"
            ),
            Err(e) => warn!(%target, error = %e, "no usable interface for syn probes"),
        }

        Self {
            target,
            route,
            source_port: DEFAULT_SOURCE_PORT,
            timeout,
            banner_timeout: crate::banner::BANNER_TIMEOUT,
            services,
            cancel: CancellationToken::new(),
        }
    }

    /// Use `port` as the source port of every probe.
    pub fn with_source_port(mut self, port: u16) -> Self {
        self.source_port = port;
        self
    }

    /// Deadline for the banner read after an open port is found.
    pub fn with_banner_timeout(mut self, banner_timeout: Duration) -> Self {
        self.banner_timeout = banner_timeout;
        self
    }

    /// Stop waiting on the capture channel once `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Name of the interface probes are sent on, if one was found.
    pub fn interface_name(&self) -> Option<&str> {
        self.route.as_ref().ok().map(|r| r.interface.name.as_str())
    }

    pub fn source_ip(&self) -> Option<Ipv4Addr> {
        self.route.as_ref().ok().map(|r| r.source_ip)
    }

    /// Why no interface could be used, if that is the case.
    pub fn setup_error(&self) -> Option<&ScanError> {
        self.route.as_ref().err()
    }

    fn endpoints(&self, route: &Route, port: u16) -> Endpoints {
        Endpoints {
            src_mac: route.interface.mac.unwrap_or_else(MacAddr::zero),
            src_ip: route.source_ip,
            src_port: self.source_port,
            dst_ip: self.target,
            dst_port: port,
        }
    }

    /// Run the send-and-capture exchange off the async runtime.
    async fn send_syn_and_wait(&self, route: &Route, port: u16) -> ScanResult<ProbeOutcome> {
        let interface = route.interface.clone();
        let endpoints = self.endpoints(route, port);
        let wait = self.timeout;
        let cancel = self.cancel.clone();

        tokio::task::spawn_blocking(move || probe_blocking(&interface, &endpoints, wait, &cancel))
            .await
            .map_err(|e| ScanError::RawSocketError(format!("capture task failed: {e}")))?
    }

    /// Read a banner over a normal kernel connection.
    ///
    /// The raw exchange left no socket to read from, so this is a second
    /// connection to the same port.
    async fn grab_banner(&self, port: u16) -> String {
        let addr = SocketAddr::V4(SocketAddrV4::new(self.target, port));
        match connect_with_timeout(addr, self.timeout).await {
            Ok(mut stream) => identify(&mut stream, self.banner_timeout).await,
            Err(e) => {
                debug!(%addr, error = %e, "banner connection failed");
                String::new()
            }
        }
    }
}

#[async_trait]
impl Scanner for SynScanner {
    fn scan_type(&self) -> ScanType {
        ScanType::Syn
    }

    fn requires_privileges(&self) -> bool {
        true
    }

    fn target(&self) -> Ipv4Addr {
        self.target
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn scan_port(&self, port: u16) -> PortResult {
        let outcome = match &self.route {
            Ok(route) => match self.send_syn_and_wait(route, port).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(port, error = %e, "syn probe failed");
                    ProbeOutcome::NoReply
                }
            },
            Err(e) => {
                warn!(port, error = %e, "syn probe has no interface");
                ProbeOutcome::NoReply
            }
        };

        let banner = if outcome == ProbeOutcome::SynAck {
            self.grab_banner(port).await
        } else {
            String::new()
        };

        let state = classify(outcome);
        debug!(target_ip = %self.target, port, %state, "syn probe complete");

        PortResult::new(port, state, service_name(&banner, &self.services, port))
    }
}

/// One complete probe: open the channel, send SYN, wait for a matching
/// reply, tear down with RST on SYN+ACK. The channel drops on every return.
fn probe_blocking(
    interface: &NetworkInterface,
    endpoints: &Endpoints,
    wait: Duration,
    cancel: &CancellationToken,
) -> ScanResult<ProbeOutcome> {
    let (mut tx, mut rx) = open_channel(interface)?;
    let filter = CaptureFilter::for_probe(endpoints);
    debug!(%filter, "capture filter installed");

    let syn = build_syn(endpoints)?;
    send_frame(tx.as_mut(), &syn)?;

    let deadline = Instant::now() + wait;
    while Instant::now() < deadline {
        if cancel.is_cancelled() {
            return Err(ScanError::Cancelled);
        }

        let segment = match next_frame(rx.as_mut())? {
            Some(frame) => filter.accept(frame),
            None => continue,
        };

        let Some(outcome) = segment.and_then(|s| ProbeOutcome::from_tcp_flags(s.flags)) else {
            continue;
        };

        if outcome == ProbeOutcome::SynAck {
            let rst = build_rst(endpoints)?;
            if let Err(e) = send_frame(tx.as_mut(), &rst) {
                warn!(port = endpoints.dst_port, error = %e, "failed to send RST");
            }
        }
        return Ok(outcome);
    }

    Ok(ProbeOutcome::NoReply)
}

fn open_channel(
    interface: &NetworkInterface,
) -> ScanResult<(Box<dyn DataLinkSender>, Box<dyn DataLinkReceiver>)> {
    let config = datalink::Config {
        read_timeout: Some(CAPTURE_POLL),
        ..Default::default()
    };

    match datalink::channel(interface, config) {
        Ok(Channel::Ethernet(tx, rx)) => Ok((tx, rx)),
        Ok(_) => Err(ScanError::RawSocketError(
            "Unsupported channel type".to_string(),
        )),
        Err(e) => {
            let err_str = e.to_string().to_lowercase();
            if e.kind() == io::ErrorKind::PermissionDenied
                || err_str.contains("permission")
                || err_str.contains("operation not permitted")
            {
                Err(ScanError::PermissionDenied(
                    "Raw socket access requires root/sudo privileges".to_string(),
                ))
            } else {
                Err(ScanError::RawSocketError(e.to_string()))
            }
        }
    }
}

fn send_frame(tx: &mut dyn DataLinkSender, frame: &[u8]) -> ScanResult<()> {
    tx.send_to(frame, None)
        .ok_or_else(|| ScanError::RawSocketError("Failed to send packet".to_string()))?
        .map_err(|e| ScanError::RawSocketError(e.to_string()))
}

/// Next captured frame, or `None` when the poll interval passed quietly.
fn next_frame(rx: &mut dyn DataLinkReceiver) -> ScanResult<Option<&[u8]>> {
    match rx.next() {
        Ok(frame) => Ok(Some(frame)),
        Err(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) => {
            Ok(None)
        }
        Err(e) => Err(ScanError::RawSocketError(e.to_string())),
    }
}

/// The local address the kernel would route `target` from.
///
/// Connecting a UDP socket sends nothing; it only selects a route.
pub fn detect_source_ip(target: Ipv4Addr) -> ScanResult<Ipv4Addr> {
    let sock = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
    sock.connect((target, 80))
        .map_err(|e| ScanError::NetworkUnreachable(format!("source IP detection: {e}")))?;
    match sock.local_addr()?.ip() {
        IpAddr::V4(ip) => Ok(ip),
        IpAddr::V6(_) => Err(ScanError::InvalidConfig(
            "expected an IPv4 source address".to_string(),
        )),
    }
}

/// Pick the interface and source address for probes toward `target`.
fn resolve_interface(
    target: Ipv4Addr,
    name: Option<&str>,
) -> ScanResult<(NetworkInterface, Ipv4Addr)> {
    let interfaces = datalink::interfaces();

    if let Some(name) = name {
        let interface = interfaces
            .into_iter()
            .find(|iface| iface.name == name)
            .ok_or_else(|| ScanError::InterfaceNotFound(name.to_string()))?;
        let source_ip = interface_ipv4(&interface)?;
        return Ok((interface, source_ip));
    }

    let source_ip = detect_source_ip(target)?;
    let interface = interfaces
        .into_iter()
        .find(|iface| iface.ips.iter().any(|ip| ip.ip() == IpAddr::V4(source_ip)))
        .ok_or_else(|| {
            ScanError::InterfaceNotFound(format!("no interface owns {source_ip}"))
        })?;
    Ok((interface, source_ip))
}

fn interface_ipv4(interface: &NetworkInterface) -> ScanResult<Ipv4Addr> {
    interface
        .ips
        .iter()
        .find_map(|ip| match ip.ip() {
            IpAddr::V4(addr) => Some(addr),
            IpAddr::V6(_) => None,
        })
        .ok_or_else(|| {
            ScanError::InvalidConfig(format!(
                "Interface {} has no IPv4 address",
                interface.name
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::traits::PortState;

    #[test]
    fn test_detect_source_ip_loopback() {
        let ip = detect_source_ip(Ipv4Addr::LOCALHOST).unwrap();
        assert!(ip.is_loopback());
    }

    #[tokio::test]
    async fn test_unknown_interface_reports_filtered() {
        let scanner = SynScanner::new(
            Ipv4Addr::LOCALHOST,
            Some("no-such-iface0"),
            Duration::from_millis(100),
            Arc::new(ServiceTable::well_known()),
        );
        assert!(matches!(
            scanner.setup_error(),
            Some(ScanError::InterfaceNotFound(name)) if name == "no-such-iface0"
        ));
        assert!(scanner.interface_name().is_none());

        let result = scanner.scan_port(22).await;
        assert_eq!(result.state, PortState::Filtered);
        assert_eq!(result.service, ServiceTable::well_known().resolve(22));

        let result = scanner.scan_port(9999).await;
        assert_eq!(result.state, PortState::Filtered);
        assert_eq!(result.service, "unknown");
    }

    #[test]
    fn test_loopback_resolution() {
        let scanner = SynScanner::new(
            Ipv4Addr::LOCALHOST,
            None,
            Duration::from_millis(100),
            Arc::new(ServiceTable::empty()),
        );
        assert!(scanner.requires_privileges());

        // Sandboxes without a visible loopback interface skip the rest.
        let Ok(route) = scanner.route.as_ref() else {
            return;
        };
        assert!(route.source_ip.is_loopback());
        assert_eq!(scanner.source_ip(), Some(route.source_ip));
        assert!(scanner.interface_name().is_some_and(|name| !name.is_empty()));

        let route = route.clone();
        let scanner = scanner.with_source_port(40000);
        let endpoints = scanner.endpoints(&route, 22);
        assert_eq!(endpoints.src_port, 40000);
        assert_eq!(endpoints.dst_port, 22);
        assert_eq!(endpoints.dst_ip, Ipv4Addr::LOCALHOST);
    }

    #[tokio::test]
    #[ignore = "requires root for raw packet capture"]
    async fn test_syn_probe_closed_port() {
        let scanner = SynScanner::new(
            Ipv4Addr::LOCALHOST,
            None,
            Duration::from_secs(1),
            Arc::new(ServiceTable::empty()),
        );
        assert!(scanner.setup_error().is_none());
        let result = scanner.scan_port(9).await;
        assert_ne!(result.state, PortState::OpenOrFiltered);
        assert!(!result.service.is_empty());
    }
}
