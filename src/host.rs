//! Host liveness checks run before a scan.
//!
//! The scan engine only needs a yes/no answer; [`IcmpEcho`] gets it from
//! ICMP echo requests, [`AssumeUp`] skips the question.

use async_trait::async_trait;
use pnet::packet::icmp::echo_reply::EchoReplyPacket;
use pnet::packet::icmp::echo_request::MutableEchoRequestPacket;
use pnet::packet::icmp::IcmpTypes;
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::Packet;
use pnet::transport::{
    icmp_packet_iter, transport_channel, TransportChannelType::Layer4, TransportProtocol::Ipv4,
};
use std::io;
use std::net::{IpAddr, Ipv4Addr};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Echo requests sent before a host is declared down.
pub const DEFAULT_PING_COUNT: u32 = 3;

const ECHO_PAYLOAD_LEN: usize = 16;
const ECHO_PACKET_LEN: usize = 8 + ECHO_PAYLOAD_LEN;

/// Answers whether a target is worth scanning.
#[async_trait]
pub trait HostCheck: Send + Sync {
    async fn is_up(&self, target: Ipv4Addr, timeout: Duration) -> bool;
}

/// Treats every target as up. Used for `--skip-ping`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeUp;

#[async_trait]
impl HostCheck for AssumeUp {
    async fn is_up(&self, _target: Ipv4Addr, _timeout: Duration) -> bool {
        true
    }
}

/// ICMP echo oracle: up as soon as any of `count` echo requests is answered.
///
/// Needs a raw ICMP socket. Without one the host is reported down and a
/// warning is logged.
#[derive(Debug, Clone, Copy)]
pub struct IcmpEcho {
    count: u32,
}

impl IcmpEcho {
    pub fn new(count: u32) -> Self {
        Self {
            count: count.max(1),
        }
    }

    pub fn count(&self) -> u32 {
        self.count
    }
}

impl Default for IcmpEcho {
    fn default() -> Self {
        Self::new(DEFAULT_PING_COUNT)
    }
}

#[async_trait]
impl HostCheck for IcmpEcho {
    async fn is_up(&self, target: Ipv4Addr, timeout: Duration) -> bool {
        let count = self.count;
        let outcome =
            tokio::task::spawn_blocking(move || ping_blocking(target, count, timeout)).await;

        match outcome {
            Ok(Ok(up)) => {
                debug!(%target, up, "icmp echo check complete");
                up
            }
            Ok(Err(e)) => {
                warn!(%target, error = %e, "icmp echo check failed");
                false
            }
            Err(e) => {
                warn!(%target, error = %e, "icmp echo task failed");
                false
            }
        }
    }
}

/// Send up to `count` echo requests, waiting `timeout` after each for a
/// reply carrying our identifier.
fn ping_blocking(target: Ipv4Addr, count: u32, timeout: Duration) -> io::Result<bool> {
    let (mut tx, mut rx) = transport_channel(4096, Layer4(Ipv4(IpNextHeaderProtocols::Icmp)))?;
    let identifier: u16 = rand::random();
    let mut replies = icmp_packet_iter(&mut rx);

    for sequence in 0..count {
        let mut buffer = [0u8; ECHO_PACKET_LEN];
        let request = build_echo_request(&mut buffer, identifier, sequence as u16)?;
        tx.send_to(request, IpAddr::V4(target))?;

        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            match replies.next_with_timeout(remaining)? {
                Some((packet, addr)) if addr == IpAddr::V4(target) => {
                    if packet.get_icmp_type() != IcmpTypes::EchoReply {
                        continue;
                    }
                    let matches = EchoReplyPacket::new(packet.packet())
                        .is_some_and(|reply| reply.get_identifier() == identifier);
                    if matches {
                        return Ok(true);
                    }
                }
                Some(_) => continue,
                None => break,
            }
        }
    }

    Ok(false)
}

fn build_echo_request(
    buffer: &mut [u8],
    identifier: u16,
    sequence: u16,
) -> io::Result<MutableEchoRequestPacket<'_>> {
    let mut request = MutableEchoRequestPacket::new(buffer).ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "echo buffer too small")
    })?;
    request.set_icmp_type(IcmpTypes::EchoRequest);
    request.set_identifier(identifier);
    request.set_sequence_number(sequence);
    request.set_checksum(0);
    let checksum = pnet::util::checksum(request.packet(), 1);
    request.set_checksum(checksum);
    Ok(request)
}

/// Raw sockets (SYN scans, ICMP echo) need an effective uid of 0.
pub fn is_root() -> bool {
    #[cfg(unix)]
    {
        unsafe { libc::geteuid() == 0 }
    }
    #[cfg(not(unix))]
    {
        false
    }
}
