//! Raw Ethernet/IPv4/TCP frame construction and parsing for the SYN scanner.
//!
//! Builders size every header from the buffer they fill and compute both the
//! IPv4 header checksum and the TCP checksum (over the IPv4 pseudo-header),
//! so callers only supply addresses and ports.

use crate::error::{ScanError, ScanResult};
use pnet::packet::ethernet::{EtherTypes, EthernetPacket, MutableEthernetPacket};
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::ipv4::{self, Ipv4Flags, Ipv4Packet, MutableIpv4Packet};
use pnet::packet::tcp::{self, MutableTcpPacket, TcpFlags, TcpPacket};
use pnet::packet::{MutablePacket, Packet};
use pnet::util::MacAddr;
use std::fmt;
use std::net::Ipv4Addr;

pub const ETHERNET_HEADER_LEN: usize = 14;
pub const IPV4_HEADER_LEN: usize = 20;
pub const TCP_HEADER_LEN: usize = 20;

/// Size of a header-only Ethernet+IPv4+TCP frame.
pub const FRAME_LEN: usize = ETHERNET_HEADER_LEN + IPV4_HEADER_LEN + TCP_HEADER_LEN;

/// TCP window advertised in outgoing probes.
pub const SYN_WINDOW: u16 = 14600;

/// Initial sequence number of every SYN probe.
pub const SYN_SEQUENCE: u32 = 1_105_024_978;

const DEFAULT_TTL: u8 = 64;

/// Addressing for one probe, seen from the scanning host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoints {
    pub src_mac: MacAddr,
    pub src_ip: Ipv4Addr,
    pub src_port: u16,
    pub dst_ip: Ipv4Addr,
    pub dst_port: u16,
}

/// Build the SYN frame that opens a half-open probe.
pub fn build_syn(endpoints: &Endpoints) -> ScanResult<Vec<u8>> {
    build_frame(endpoints, TcpFlags::SYN, SYN_SEQUENCE, 0)
}

/// Build the RST frame that tears down a probe answered with SYN+ACK.
///
/// The kernel never saw our SYN, so only this frame closes the remote
/// half-open connection cleanly.
pub fn build_rst(endpoints: &Endpoints) -> ScanResult<Vec<u8>> {
    build_frame(endpoints, TcpFlags::RST, SYN_SEQUENCE.wrapping_add(1), 0)
}

/// Assemble a header-only Ethernet+IPv4+TCP frame.
pub(crate) fn build_frame(
    endpoints: &Endpoints,
    flags: u8,
    sequence: u32,
    acknowledgement: u32,
) -> ScanResult<Vec<u8>> {
    let mut buffer = vec![0u8; FRAME_LEN];
    let (eth_buf, ip_buf) = buffer.split_at_mut(ETHERNET_HEADER_LEN);

    {
        let mut eth_packet = MutableEthernetPacket::new(eth_buf)
            .ok_or_else(|| ScanError::InvalidPacket("ethernet buffer too small".to_string()))?;

        // No ARP resolution here; the frame is addressed to everyone on the link.
        eth_packet.set_destination(MacAddr::broadcast());
        eth_packet.set_source(endpoints.src_mac);
        eth_packet.set_ethertype(EtherTypes::Ipv4);
    }

    let total_length = u16::try_from(ip_buf.len())
        .map_err(|_| ScanError::InvalidPacket("IPv4 packet too large".to_string()))?;

    {
        let mut ip_packet = MutableIpv4Packet::new(ip_buf)
            .ok_or_else(|| ScanError::InvalidPacket("IPv4 buffer too small".to_string()))?;

        ip_packet.set_version(4);
        ip_packet.set_header_length((IPV4_HEADER_LEN / 4) as u8);
        ip_packet.set_dscp(0);
        ip_packet.set_ecn(0);
        ip_packet.set_total_length(total_length);
        ip_packet.set_identification(rand::random());
        ip_packet.set_flags(Ipv4Flags::DontFragment);
        ip_packet.set_fragment_offset(0);
        ip_packet.set_ttl(DEFAULT_TTL);
        ip_packet.set_next_level_protocol(IpNextHeaderProtocols::Tcp);
        ip_packet.set_source(endpoints.src_ip);
        ip_packet.set_destination(endpoints.dst_ip);

        {
            let mut tcp_packet = MutableTcpPacket::new(ip_packet.payload_mut())
                .ok_or_else(|| ScanError::InvalidPacket("TCP buffer too small".to_string()))?;

            tcp_packet.set_source(endpoints.src_port);
            tcp_packet.set_destination(endpoints.dst_port);
            tcp_packet.set_sequence(sequence);
            tcp_packet.set_acknowledgement(acknowledgement);
            tcp_packet.set_data_offset((TCP_HEADER_LEN / 4) as u8);
            tcp_packet.set_reserved(0);
            tcp_packet.set_flags(flags);
            tcp_packet.set_window(SYN_WINDOW);
            tcp_packet.set_urgent_ptr(0);

            let checksum = tcp::ipv4_checksum(
                &tcp_packet.to_immutable(),
                &endpoints.src_ip,
                &endpoints.dst_ip,
            );
            tcp_packet.set_checksum(checksum);
        }

        let checksum = ipv4::checksum(&ip_packet.to_immutable());
        ip_packet.set_checksum(checksum);
    }

    Ok(buffer)
}

/// The fields of a captured TCP segment that probe matching needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TcpSegment {
    pub src_ip: Ipv4Addr,
    pub dst_ip: Ipv4Addr,
    pub src_port: u16,
    pub dst_port: u16,
    pub flags: u8,
    pub sequence: u32,
    pub acknowledgement: u32,
}

/// Decode an Ethernet frame carrying IPv4/TCP. Anything else yields `None`.
pub fn parse_tcp_frame(frame: &[u8]) -> Option<TcpSegment> {
    let eth_packet = EthernetPacket::new(frame)?;
    if eth_packet.get_ethertype() != EtherTypes::Ipv4 {
        return None;
    }

    let ip_packet = Ipv4Packet::new(eth_packet.payload())?;
    if ip_packet.get_next_level_protocol() != IpNextHeaderProtocols::Tcp {
        return None;
    }
    let header_len = usize::from(ip_packet.get_header_length()) * 4;
    if header_len < IPV4_HEADER_LEN || usize::from(ip_packet.get_total_length()) < header_len {
        return None;
    }

    let tcp_packet = TcpPacket::new(ip_packet.payload())?;

    Some(TcpSegment {
        src_ip: ip_packet.get_source(),
        dst_ip: ip_packet.get_destination(),
        src_port: tcp_packet.get_source(),
        dst_port: tcp_packet.get_destination(),
        flags: tcp_packet.get_flags(),
        sequence: tcp_packet.get_sequence(),
        acknowledgement: tcp_packet.get_acknowledgement(),
    })
}

/// Selects the replies to one probe out of everything seen on an interface.
///
/// Equivalent to the BPF expression its `Display` renders: TCP segments from
/// the probed host and port, addressed to the probe's source port. Keeps
/// concurrent SYN probes on the same interface from reading each other's
/// replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureFilter {
    host: Ipv4Addr,
    port: u16,
    local_port: u16,
}

impl CaptureFilter {
    pub fn new(host: Ipv4Addr, port: u16, local_port: u16) -> Self {
        Self {
            host,
            port,
            local_port,
        }
    }

    /// The filter matching replies to a probe sent with `endpoints`.
    pub fn for_probe(endpoints: &Endpoints) -> Self {
        Self::new(endpoints.dst_ip, endpoints.dst_port, endpoints.src_port)
    }

    pub fn matches(&self, segment: &TcpSegment) -> bool {
        segment.src_ip == self.host
            && segment.src_port == self.port
            && segment.dst_port == self.local_port
    }

    /// Parse `frame` and keep it only if it passes the filter.
    pub fn accept(&self, frame: &[u8]) -> Option<TcpSegment> {
        parse_tcp_frame(frame).filter(|segment| self.matches(segment))
    }
}

impl fmt::Display for CaptureFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "tcp and src host {} and src port {} and dst port {}",
            self.host, self.port, self.local_port
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn probe() -> Endpoints {
        Endpoints {
            src_mac: MacAddr::new(0x02, 0x00, 0x00, 0xaa, 0xbb, 0xcc),
            src_ip: Ipv4Addr::new(192, 168, 1, 20),
            src_port: 12345,
            dst_ip: Ipv4Addr::new(192, 168, 1, 1),
            dst_port: 443,
        }
    }

    /// What the probed host would send back.
    fn reply(flags: u8) -> Vec<u8> {
        let ep = probe();
        let back = Endpoints {
            src_mac: MacAddr::zero(),
            src_ip: ep.dst_ip,
            src_port: ep.dst_port,
            dst_ip: ep.src_ip,
            dst_port: ep.src_port,
        };
        build_frame(&back, flags, 7, SYN_SEQUENCE + 1).unwrap()
    }

    #[test]
    fn test_syn_frame_layout() {
        let ep = probe();
        let frame = build_syn(&ep).unwrap();
        assert_eq!(frame.len(), FRAME_LEN);

        let eth = EthernetPacket::new(&frame).unwrap();
        assert_eq!(eth.get_source(), ep.src_mac);
        assert_eq!(eth.get_ethertype(), EtherTypes::Ipv4);

        let ip = Ipv4Packet::new(eth.payload()).unwrap();
        assert_eq!(ip.get_total_length() as usize, IPV4_HEADER_LEN + TCP_HEADER_LEN);
        assert_eq!(ip.get_checksum(), ipv4::checksum(&ip));

        let tcp_packet = TcpPacket::new(ip.payload()).unwrap();
        assert_eq!(tcp_packet.get_flags(), TcpFlags::SYN);
        assert_eq!(tcp_packet.get_window(), SYN_WINDOW);
        assert_eq!(tcp_packet.get_sequence(), SYN_SEQUENCE);
        assert_eq!(tcp_packet.get_source(), 12345);
        assert_eq!(tcp_packet.get_destination(), 443);
        assert_eq!(
            tcp_packet.get_checksum(),
            tcp::ipv4_checksum(&tcp_packet, &ep.src_ip, &ep.dst_ip)
        );
    }

    #[test]
    fn test_rst_frame_follows_syn() {
        let segment = parse_tcp_frame(&build_rst(&probe()).unwrap()).unwrap();
        assert_eq!(segment.flags, TcpFlags::RST);
        assert_eq!(segment.sequence, SYN_SEQUENCE + 1);
        assert_eq!(segment.dst_port, 443);
    }

    #[test]
    fn test_filter_accepts_reply() {
        let filter = CaptureFilter::for_probe(&probe());
        let segment = filter.accept(&reply(TcpFlags::SYN | TcpFlags::ACK)).unwrap();
        assert_eq!(segment.flags, TcpFlags::SYN | TcpFlags::ACK);
        assert_eq!(segment.acknowledgement, SYN_SEQUENCE + 1);
    }

    #[test]
    fn test_filter_rejects_other_traffic() {
        let filter = CaptureFilter::for_probe(&probe());

        // Our own outgoing SYN
        assert!(filter.accept(&build_syn(&probe()).unwrap()).is_none());

        // A reply for a different probed port
        let other = CaptureFilter::new(Ipv4Addr::new(192, 168, 1, 1), 80, 12345);
        assert!(other.accept(&reply(TcpFlags::RST)).is_none());

        // Truncated and non-IPv4 frames
        let frame = reply(TcpFlags::RST);
        assert!(filter.accept(&frame[..ETHERNET_HEADER_LEN + 10]).is_none());
        let mut arp = frame.clone();
        arp[12] = 0x08;
        arp[13] = 0x06;
        assert!(filter.accept(&arp).is_none());
    }

    #[test]
    fn test_filter_expression() {
        let filter = CaptureFilter::for_probe(&probe());
        assert_eq!(
            filter.to_string(),
            "tcp and src host 192.168.1.1 and src port 443 and dst port 12345"
        );
    }
}
