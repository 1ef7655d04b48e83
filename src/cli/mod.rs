//! Command-line interface definitions for Barnacle.
//!
//! Uses `clap` derive macros for declarative argument parsing. The scan
//! itself is driven from [`scan::execute`].

pub mod scan;

pub use scan::execute;

use crate::config::AppSettings;
use crate::output::ExportFormat;
use crate::scanner::ScanType;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

/// Barnacle - a concurrent TCP, UDP and SYN port scanner.
#[derive(Parser, Debug)]
#[command(name = "barnacle")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "A fast, concurrent port scanner", long_about = None)]
pub struct Cli {
    /// Target IPv4 address (dotted quad)
    #[arg(short, long, value_name = "IPV4")]
    pub target: String,

    /// Ports to scan: "80", "20,21,22", "0-1023"; "-p-" scans 0-65535
    #[arg(short, long = "port", value_name = "SPEC")]
    pub ports: Option<String>,

    /// Scan strategy
    #[arg(short = 's', long = "scan", value_enum, default_value = "tcp")]
    pub scan_type: ScanType,

    /// Export results to this file
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Export file format
    #[arg(short, long, value_enum, default_value = "txt")]
    pub format: ExportFormat,

    /// Only show and export open (or open/filtered) ports
    #[arg(long)]
    pub open: bool,

    /// Per-probe timeout, e.g. 500ms, 2s, 1m30s
    #[arg(long, value_name = "DURATION")]
    pub timeout: Option<String>,

    /// Maximum number of probes in flight
    #[arg(short = 'c', long)]
    pub concurrency: Option<usize>,

    /// Probes started per second (0 = unlimited)
    #[arg(short = 'r', long = "rate")]
    pub rate_limit: Option<u32>,

    /// Network interface for SYN scans
    #[arg(short = 'i', long)]
    pub interface: Option<String>,

    /// Do not check whether the host answers ICMP echo first
    #[arg(long)]
    pub skip_ping: bool,

    /// Show progress and debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Path to a settings file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Parse a duration such as `300ms`, `1.5s` or `1m30s`.
///
/// Units are `ns`, `us` (or `µs`), `ms`, `s`, `m` and `h`; a bare `0` is
/// accepted. Returns `None` for anything else.
pub fn parse_timeout(input: &str) -> Option<Duration> {
    let input = input.trim();
    if input == "0" {
        return Some(Duration::ZERO);
    }
    if input.is_empty() {
        return None;
    }

    let is_number = |c: char| c.is_ascii_digit() || c == '.';
    let mut rest = input;
    let mut nanos = 0f64;

    while !rest.is_empty() {
        let number_end = rest.find(|c: char| !is_number(c)).unwrap_or(rest.len());
        let (number, tail) = rest.split_at(number_end);
        let unit_end = tail.find(is_number).unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_end);

        let value: f64 = number.parse().ok()?;
        let scale = match unit {
            "ns" => 1.0,
            "us" | "µs" | "μs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            _ => return None,
        };
        nanos += value * scale;
        rest = tail;
    }

    nanos.is_finite().then(|| Duration::from_nanos(nanos.round() as u64))
}

/// The per-probe timeout for this run.
///
/// No `--timeout` means the configured default; an unparsable one logs a
/// warning and uses the configured fallback.
pub fn resolve_timeout(arg: Option<&str>, settings: &AppSettings) -> Duration {
    match arg {
        None => settings.default_timeout(),
        Some(raw) => parse_timeout(raw).unwrap_or_else(|| {
            let fallback = settings.fallback_timeout();
            warn!("invalid timeout value: {raw}, defaulting to {fallback:?}");
            fallback
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_arguments() {
        let cli = Cli::try_parse_from(["barnacle", "-t", "127.0.0.1"]).unwrap();
        assert_eq!(cli.target, "127.0.0.1");
        assert_eq!(cli.ports, None);
        assert_eq!(cli.scan_type, ScanType::Tcp);
        assert_eq!(cli.format, ExportFormat::Txt);
        assert!(!cli.open);
    }

    #[test]
    fn test_full_range_shorthand() {
        let cli = Cli::try_parse_from(["barnacle", "-t", "10.0.0.1", "-p-"]).unwrap();
        assert_eq!(cli.ports.as_deref(), Some("-"));
    }

    #[test]
    fn test_all_options() {
        let cli = Cli::try_parse_from([
            "barnacle", "--target", "10.0.0.1", "--port", "20-25", "--scan", "udp", "-o",
            "out", "-f", "json", "--open", "--timeout", "500ms", "-c", "50", "-r", "100",
            "-i", "eth0", "--skip-ping",
        ])
        .unwrap();

        assert_eq!(cli.scan_type, ScanType::Udp);
        assert_eq!(cli.format, ExportFormat::Json);
        assert_eq!(cli.output, Some(PathBuf::from("out")));
        assert_eq!(cli.timeout.as_deref(), Some("500ms"));
        assert_eq!(cli.concurrency, Some(50));
        assert_eq!(cli.rate_limit, Some(100));
        assert_eq!(cli.interface.as_deref(), Some("eth0"));
        assert!(cli.open && cli.skip_ping);
    }

    #[test]
    fn test_unsupported_values_rejected() {
        let err = Cli::try_parse_from(["barnacle", "-t", "1.2.3.4", "-s", "icmp"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidValue);
        assert_eq!(err.exit_code(), 2);

        let err = Cli::try_parse_from(["barnacle", "-t", "1.2.3.4", "-f", "xml"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidValue);
        assert_eq!(err.exit_code(), 2);

        assert!(Cli::try_parse_from(["barnacle", "-p", "80"]).is_err());
    }

    #[test]
    fn test_parse_timeout() {
        assert_eq!(parse_timeout("0"), Some(Duration::ZERO));
        assert_eq!(parse_timeout("500ms"), Some(Duration::from_millis(500)));
        assert_eq!(parse_timeout("2s"), Some(Duration::from_secs(2)));
        assert_eq!(parse_timeout("1.5s"), Some(Duration::from_millis(1500)));
        assert_eq!(parse_timeout("1m30s"), Some(Duration::from_secs(90)));
        assert_eq!(parse_timeout("250us"), Some(Duration::from_micros(250)));
        assert_eq!(parse_timeout("1h"), Some(Duration::from_secs(3600)));

        assert_eq!(parse_timeout(""), None);
        assert_eq!(parse_timeout("10"), None);
        assert_eq!(parse_timeout("fast"), None);
        assert_eq!(parse_timeout("5 s"), None);
        assert_eq!(parse_timeout("1.2.3s"), None);
        assert_eq!(parse_timeout("-1s"), None);
    }

    #[test]
    fn test_resolve_timeout() {
        let settings = AppSettings::default();
        assert_eq!(resolve_timeout(None, &settings), Duration::from_secs(1));
        assert_eq!(resolve_timeout(Some("3s"), &settings), Duration::from_secs(3));
        assert_eq!(resolve_timeout(Some("soon"), &settings), Duration::from_secs(2));
    }
}
