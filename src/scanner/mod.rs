//! Scanner module - coordinates different scanning techniques.
//!
//! Strategies implement [`Scanner`]; one is chosen by [`create_scanner`] and
//! [`run_scan`] fans the requested ports out across a bounded pool of tokio
//! tasks, one probe per port.

pub mod classify;
pub mod packet;
pub mod rate_limiter;
pub mod syn;
pub mod tcp;
pub mod traits;
pub mod udp;

use crate::banner::BANNER_TIMEOUT;
use crate::services::{ServiceTable, UNKNOWN_SERVICE};
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub use rate_limiter::RateLimiter;
pub use syn::SynScanner;
pub use tcp::TcpConnectScanner;
pub use traits::{PortResult, PortState, ScanType, Scanner};
pub use udp::UdpScanner;

/// Default number of probes in flight at once.
pub const DEFAULT_CONCURRENCY: usize = 500;

/// What to scan. Built once by the caller and only read afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanParameters {
    pub target: Ipv4Addr,
    /// Ports in the order requested; duplicates are probed again.
    pub ports: Vec<u16>,
    pub timeout: Duration,
}

/// Strategy-specific knobs that are not part of the target description.
#[derive(Debug, Clone)]
pub struct StrategyOptions {
    pub services: Arc<ServiceTable>,
    /// Capture interface for SYN scans; resolved from the route when `None`.
    pub interface: Option<String>,
    pub syn_source_port: u16,
    pub banner_timeout: Duration,
    pub cancel: CancellationToken,
}

impl Default for StrategyOptions {
    fn default() -> Self {
        Self {
            services: Arc::new(ServiceTable::well_known()),
            interface: None,
            syn_source_port: syn::DEFAULT_SOURCE_PORT,
            banner_timeout: BANNER_TIMEOUT,
            cancel: CancellationToken::new(),
        }
    }
}

/// How the pool runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanJobConfig {
    /// Maximum probes in flight.
    pub concurrency: usize,
    /// Probes started per second, `0` for no limit.
    pub rate_limit: u32,
    /// Draw a progress bar on stderr.
    pub progress: bool,
}

impl Default for ScanJobConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            rate_limit: 0,
            progress: false,
        }
    }
}

/// Complete scan results.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    /// One entry per completed probe, in completion order.
    pub results: Vec<PortResult>,
    pub ports_scanned: usize,
    /// Open and open/filtered.
    pub open_ports: usize,
    pub closed_ports: usize,
    pub filtered_ports: usize,
    pub duration_ms: u64,
    /// The scan was interrupted; `results` holds only the finished probes.
    pub cancelled: bool,
}

impl ScanReport {
    fn from_results(results: Vec<PortResult>, elapsed: Duration, cancelled: bool) -> Self {
        let count = |state: PortState| results.iter().filter(|r| r.state == state).count();

        Self {
            ports_scanned: results.len(),
            open_ports: results.iter().filter(|r| r.is_open()).count(),
            closed_ports: count(PortState::Closed),
            filtered_ports: count(PortState::Filtered),
            duration_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            cancelled,
            results,
        }
    }

    /// Results sorted by port, for display.
    pub fn sorted_results(&self) -> Vec<PortResult> {
        let mut results = self.results.clone();
        results.sort_by_key(|r| r.port);
        results
    }
}

/// Build the scanner for `scan_type`.
///
/// Setup problems such as a missing SYN interface do not fail here; they
/// surface per port as filtered results.
pub fn create_scanner(
    scan_type: ScanType,
    params: &ScanParameters,
    options: StrategyOptions,
) -> Arc<dyn Scanner> {
    match scan_type {
        ScanType::Tcp => Arc::new(TcpConnectScanner::new(
            params.target,
            params.timeout,
            options.banner_timeout,
            options.services,
        )),
        ScanType::Udp => Arc::new(UdpScanner::new(
            params.target,
            params.timeout,
            options.services,
        )),
        ScanType::Syn => Arc::new(
            SynScanner::new(
                params.target,
                options.interface.as_deref(),
                params.timeout,
                options.services,
            )
            .with_source_port(options.syn_source_port)
            .with_banner_timeout(options.banner_timeout)
            .with_cancellation(options.cancel),
        ),
    }
}

/// Create the strategy and scan every port in `params`.
pub async fn scan_target(
    params: &ScanParameters,
    scan_type: ScanType,
    options: StrategyOptions,
    job: &ScanJobConfig,
) -> ScanReport {
    let cancel = options.cancel.clone();
    let scanner = create_scanner(scan_type, params, options);
    run_scan(scanner, &params.ports, job, &cancel).await
}

/// Probe every port with `scanner`, at most `job.concurrency` at a time.
///
/// A probe that panics is reported as filtered and never affects the others.
/// When `cancel` fires, probes still running are dropped and the report
/// carries what had finished.
pub async fn run_scan(
    scanner: Arc<dyn Scanner>,
    ports: &[u16],
    job: &ScanJobConfig,
    cancel: &CancellationToken,
) -> ScanReport {
    let start_time = Instant::now();
    let limiter = RateLimiter::new(job.rate_limit);
    let progress = job.progress.then(|| progress_bar(ports.len()));

    let results: Vec<PortResult> = stream::iter(ports.iter().copied())
        .map(|port| {
            let scanner = Arc::clone(&scanner);
            let limiter = limiter.clone();
            let cancel = cancel.clone();
            let progress = progress.clone();

            async move {
                let task = tokio::spawn(async move {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => None,
                        result = probe(scanner.as_ref(), port, limiter.as_ref()) => Some(result),
                    }
                });

                let result = match task.await {
                    Ok(result) => result,
                    Err(e) => {
                        warn!(port, error = %e, "probe task failed");
                        Some(PortResult::new(port, PortState::Filtered, UNKNOWN_SERVICE))
                    }
                };

                if let (Some(pb), Some(result)) = (&progress, &result) {
                    pb.inc(1);
                    if result.state == PortState::Open {
                        pb.set_message(format!("Found open port: {}", result.port));
                    }
                }
                result
            }
        })
        .buffer_unordered(job.concurrency.max(1))
        .filter_map(futures::future::ready)
        .collect()
        .await;

    let cancelled = cancel.is_cancelled();
    if let Some(pb) = progress {
        if cancelled {
            pb.abandon_with_message("Scan interrupted");
        } else {
            pb.finish_with_message("Scan complete");
        }
    }

    let report = ScanReport::from_results(results, start_time.elapsed(), cancelled);
    info!(
        "{} ports scanned, {} up",
        report.ports_scanned, report.open_ports
    );
    report
}

async fn probe(scanner: &dyn Scanner, port: u16, limiter: Option<&RateLimiter>) -> PortResult {
    if let Some(limiter) = limiter {
        limiter.wait().await;
    }
    scanner.scan_port(port).await
}

fn progress_bar(len: usize) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    let style = ProgressStyle::default_bar()
        .template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
        )
        .map(|style| style.progress_chars("=>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb
}
