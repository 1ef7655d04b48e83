//! Port specification parsing.
//!
//! `PortRange` and `PortSpec` handle the `-p` argument: single ports,
//! comma-separated lists, inclusive `start-end` ranges, and the `-` shorthand
//! for every port. Ports are kept in the order the user wrote them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error type for port parsing and validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("port {0} is out of valid range (0-65535)")]
    OutOfRange(u64),
    #[error("invalid port number: '{0}'")]
    InvalidFormat(String),
    #[error("invalid port range: start ({0}) > end ({1})")]
    InvalidRange(u16, u16),
    #[error("empty port specification")]
    Empty,
}

/// A range of ports (inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortRange {
    start: u16,
    end: u16,
}

impl PortRange {
    /// Every port, 0 through 65535.
    pub const FULL: Self = Self {
        start: 0,
        end: u16::MAX,
    };

    /// Create a new port range.
    pub fn new(start: u16, end: u16) -> Result<Self, PortError> {
        if start > end {
            Err(PortError::InvalidRange(start, end))
        } else {
            Ok(Self { start, end })
        }
    }

    /// Create a range containing a single port.
    pub const fn single(port: u16) -> Self {
        Self {
            start: port,
            end: port,
        }
    }

    /// Get the number of ports in this range.
    pub const fn len(&self) -> usize {
        (self.end - self.start) as usize + 1
    }

    /// A valid range always holds at least one port.
    pub const fn is_empty(&self) -> bool {
        false
    }

    pub fn iter(&self) -> impl Iterator<Item = u16> {
        self.start..=self.end
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

/// A complete port specification that can contain multiple ranges.
///
/// Supports formats like:
/// - Single port: "80"
/// - Comma-separated: "20,21,22"
/// - Range: "0-1023"
/// - Mixed: "22,80,8000-8010"
/// - Every port: "-" (what `-p-` delivers) or "p-"
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortSpec {
    ranges: Vec<PortRange>,
}

impl PortSpec {
    pub const fn new() -> Self {
        Self { ranges: Vec::new() }
    }

    pub fn add_range(&mut self, range: PortRange) {
        self.ranges.push(range);
    }

    pub fn add_port(&mut self, port: u16) {
        self.ranges.push(PortRange::single(port));
    }

    /// Expand into the ordered port sequence, duplicates included.
    pub fn to_ports(&self) -> Vec<u16> {
        self.ranges.iter().flat_map(|r| r.iter()).collect()
    }

    /// Total number of ports the spec expands to.
    pub fn count(&self) -> usize {
        self.ranges.iter().map(PortRange::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Full port range (0-65535).
    pub fn full() -> Self {
        Self {
            ranges: vec![PortRange::FULL],
        }
    }
}

fn parse_port(s: &str) -> Result<u16, PortError> {
    let s = s.trim();
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(PortError::InvalidFormat(s.to_string()));
    }
    let value: u64 = s
        .parse()
        .map_err(|_| PortError::InvalidFormat(s.to_string()))?;
    u16::try_from(value).map_err(|_| PortError::OutOfRange(value))
}

impl FromStr for PortSpec {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(PortError::Empty);
        }
        if s == "-" || s == "p-" {
            return Ok(Self::full());
        }

        let mut spec = Self::new();

        for part in s.split(',') {
            let part = part.trim();
            if part.contains('-') {
                let bounds: Vec<&str> = part.split('-').collect();
                if bounds.len() != 2 {
                    return Err(PortError::InvalidFormat(part.to_string()));
                }
                let start = parse_port(bounds[0])?;
                let end = parse_port(bounds[1])?;
                spec.add_range(PortRange::new(start, end)?);
            } else {
                spec.add_port(parse_port(part)?);
            }
        }

        if spec.is_empty() {
            return Err(PortError::Empty);
        }

        Ok(spec)
    }
}

impl fmt::Display for PortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.ranges.iter().map(|r| r.to_string()).collect();
        write!(f, "{}", parts.join(","))
    }
}
