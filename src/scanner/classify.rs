//! Port-state classification.
//!
//! Every strategy reduces what happened on the wire to a `ProbeOutcome`;
//! `classify` maps that to exactly one `PortState`. Nothing here touches the
//! network.

use super::traits::PortState;
use crate::error::ScanError;
use pnet::packet::tcp::TcpFlags;

/// What a single probe observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// TCP connect: handshake completed.
    Connected,
    /// TCP connect: the remote stack refused the connection.
    Refused,
    /// TCP connect: timeout, unreachable, or any other failure.
    ConnectFailed,
    /// UDP: the socket could not be set up or the datagram not sent.
    SendFailed,
    /// UDP: datagram sent, nothing came back before the deadline.
    NoResponse,
    /// UDP: a datagram came back.
    Responded,
    /// SYN: the target answered SYN+ACK.
    SynAck,
    /// SYN: the target answered with RST.
    Reset,
    /// SYN: no matching frame before the deadline.
    NoReply,
}

impl ProbeOutcome {
    /// Interpret a failed TCP connect attempt.
    pub fn from_connect_error(err: &ScanError) -> Self {
        match err {
            ScanError::ConnectionRefused => Self::Refused,
            _ => Self::ConnectFailed,
        }
    }

    /// Interpret the flags of a captured reply to our SYN.
    ///
    /// Returns `None` for segments that say nothing about the port (a bare
    /// ACK, for instance); the caller keeps waiting for another frame.
    pub fn from_tcp_flags(flags: u8) -> Option<Self> {
        let syn_ack = TcpFlags::SYN | TcpFlags::ACK;
        if flags & syn_ack == syn_ack {
            Some(Self::SynAck)
        } else if flags & TcpFlags::RST != 0 {
            Some(Self::Reset)
        } else {
            None
        }
    }
}

/// Map a probe outcome to the reported port state.
pub fn classify(outcome: ProbeOutcome) -> PortState {
    match outcome {
        ProbeOutcome::Connected | ProbeOutcome::Responded | ProbeOutcome::SynAck => {
            PortState::Open
        }
        ProbeOutcome::Refused | ProbeOutcome::SendFailed | ProbeOutcome::Reset => {
            PortState::Closed
        }
        ProbeOutcome::ConnectFailed | ProbeOutcome::NoReply => PortState::Filtered,
        // No reply to a datagram cannot tell a silent service from a drop.
        ProbeOutcome::NoResponse => PortState::OpenOrFiltered,
    }
}
