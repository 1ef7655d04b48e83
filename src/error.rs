//! Error types for barnacle.
//!
//! Uses `thiserror` for ergonomic error definitions. Probe-level errors
//! (`ScanError`) are classified into port states by the strategies and never
//! escape a single probe; the remaining types surface at the command line.

use crate::types::{PortError, TargetError};
use std::net::Ipv4Addr;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for scanning operations.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Connection timed out")]
    Timeout,

    #[error("Connection refused")]
    ConnectionRefused,

    #[error("Network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("Host unreachable")]
    HostUnreachable,

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Raw socket error: {0}")]
    RawSocketError(String),

    #[error("Invalid packet: {0}")]
    InvalidPacket(String),

    #[error("Interface not found: {0}")]
    InterfaceNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Scan cancelled")]
    Cancelled,
}

/// Result type alias for scan operations.
pub type ScanResult<T> = Result<T, ScanError>;

/// Problems with user input, detected before any packet leaves the host.
#[derive(Error, Debug)]
pub enum InputError {
    #[error(transparent)]
    Port(#[from] PortError),

    #[error(transparent)]
    Target(#[from] TargetError),
}

/// Failures while writing results to a file.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("could not create {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not write results: {0}")]
    Write(#[from] std::io::Error),

    #[error("could not write CSV record: {0}")]
    Csv(#[from] csv::Error),

    #[error("could not encode results to JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration loading errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not determine configuration directory")]
    DirectoryNotFound,

    #[error("failed to read {path}: {reason}")]
    ReadFailed { path: PathBuf, reason: String },

    #[error("invalid settings file: {0}")]
    InvalidFormat(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Top-level error for the command-line driver.
#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("host {0} appears to be down (use --skip-ping to scan anyway)")]
    HostDown(Ipv4Addr),
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Input(_) => 2,
            Self::HostDown(_) => 3,
            Self::Scan(ScanError::Cancelled) => 130,
            Self::Scan(_) | Self::Export(_) | Self::Config(_) => 1,
        }
    }
}

impl From<PortError> for CliError {
    fn from(e: PortError) -> Self {
        Self::Input(e.into())
    }
}

impl From<TargetError> for CliError {
    fn from(e: TargetError) -> Self {
        Self::Input(e.into())
    }
}

pub type CliResult<T> = Result<T, CliError>;
