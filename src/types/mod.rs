//! Input types: port specifications and scan targets.
//!
//! Both are validated up front so that a bad `-p` or `-t` is reported
//! before any network activity starts.

mod port;
mod target;

pub use port::{PortError, PortRange, PortSpec};
pub use target::{parse_target, TargetError};
