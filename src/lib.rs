//! # Barnacle - A Concurrent Network Port Scanner
//!
//! Barnacle determines the state of each requested port on an IPv4 host
//! (open, closed, filtered, open/filtered) and names the service behind it.
//!
//! ## Features
//!
//! - **Three Strategies**: TCP connect, UDP probe, and raw SYN (half-open)
//! - **Bounded Concurrency**: One tokio task per port, capped pool size, optional rate limit
//! - **Service Identification**: Live banners first, well-known port table second
//! - **Export**: Plain text, CSV and JSON files
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use barnacle::scanner::{Scanner, TcpConnectScanner};
//! use barnacle::services::ServiceTable;
//! use std::net::Ipv4Addr;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let scanner = TcpConnectScanner::new(
//!         Ipv4Addr::new(192, 168, 1, 1),
//!         Duration::from_secs(1),
//!         Duration::from_secs(2),
//!         Arc::new(ServiceTable::well_known()),
//!     );
//!
//!     let result = scanner.scan_port(80).await;
//!     println!("Port {} is {} ({})", result.port, result.state, result.service);
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`scanner`] - The `Scanner` trait, the three strategies, packet codec and orchestrator
//! - [`banner`] and [`services`] - Service identification
//! - [`host`] - Liveness check before a scan
//! - [`types`] - Port spec and target parsing
//! - [`config`] - Settings file
//! - [`output`] - Terminal table and file export
//! - [`error`] - Error types

pub mod banner;
pub mod cli;
pub mod config;
pub mod error;
pub mod host;
pub mod output;
pub mod scanner;
pub mod services;
pub mod types;

// Re-export commonly used types
pub use error::{CliError, ScanError};
pub use scanner::{
    run_scan, scan_target, PortResult, PortState, ScanParameters, ScanReport, ScanType, Scanner,
};
pub use services::ServiceTable;
pub use types::{parse_target, PortSpec};
