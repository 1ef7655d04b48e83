//! Banner grabbing and final service naming.
//!
//! A banner is whatever the remote side sends first on an already-open
//! connection. When one arrives it names the service; otherwise the port's
//! entry in the service table does.

use crate::services::{ServiceTable, UNKNOWN_SERVICE};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::timeout;

/// Maximum bytes to read for a banner.
const MAX_BANNER_SIZE: usize = 1024;

/// Longest banner kept after sanitizing.
const MAX_DISPLAY_LEN: usize = 256;

/// Default deadline for the single banner read.
pub const BANNER_TIMEOUT: Duration = Duration::from_secs(2);

/// Read one chunk from an open connection and return it as text.
///
/// Returns an empty string on timeout, EOF, or any read error.
pub async fn identify<S>(stream: &mut S, deadline: Duration) -> String
where
    S: AsyncRead + Unpin,
{
    let mut buffer = vec![0u8; MAX_BANNER_SIZE];

    match timeout(deadline, stream.read(&mut buffer)).await {
        Ok(Ok(n)) if n > 0 => sanitize_banner(&buffer[..n]),
        _ => String::new(),
    }
}

/// Pick the name reported for a port: banner first, then the table.
///
/// Never returns an empty string.
pub fn service_name(banner: &str, services: &ServiceTable, port: u16) -> String {
    let banner = banner.trim();
    if !banner.is_empty() {
        return banner.to_string();
    }
    match services.lookup(port) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => UNKNOWN_SERVICE.to_string(),
    }
}

/// Sanitize banner by removing non-printable characters and limiting length.
pub fn sanitize_banner(data: &[u8]) -> String {
    let s: String = data
        .iter()
        .take(MAX_DISPLAY_LEN)
        .map(|&b| {
            if b.is_ascii_graphic() || b == b' ' {
                b as char
            } else if b == b'\r' || b == b'\n' || b == b'\t' {
                ' '
            } else {
                '.'
            }
        })
        .collect();

    // Collapse runs of whitespace
    let mut result = String::with_capacity(s.len());
    let mut prev_space = false;
    for c in s.chars() {
        if c == ' ' {
            if !prev_space {
                result.push(c);
            }
            prev_space = true;
        } else {
            result.push(c);
            prev_space = false;
        }
    }

    result.trim().to_string()
}
