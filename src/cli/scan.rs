//! The scan driver behind the command line.
//!
//! Validates every argument before any packet is sent, checks the host, runs
//! the scan, prints the table and writes the export file.

use crate::cli::{resolve_timeout, Cli};
use crate::config::AppSettings;
use crate::error::{CliError, CliResult, ScanError};
use crate::host::{is_root, AssumeUp, HostCheck, IcmpEcho};
use crate::output;
use crate::scanner::{
    scan_target, ScanJobConfig, ScanParameters, ScanReport, ScanType, StrategyOptions,
};
use crate::types::{parse_target, PortSpec};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Run the scan described by `cli`.
///
/// `cancel` stops the scan early; the partial results are still printed but
/// nothing is exported and the call fails with `ScanError::Cancelled`.
pub async fn execute(cli: &Cli, cancel: CancellationToken) -> CliResult<ScanReport> {
    let settings = AppSettings::load(cli.config.as_deref())?;

    let target = parse_target(&cli.target)?;
    let port_spec: PortSpec = cli
        .ports
        .as_deref()
        .unwrap_or(&settings.default_ports)
        .parse()?;
    let ports = port_spec.to_ports();
    let timeout = resolve_timeout(cli.timeout.as_deref(), &settings);
    debug!(%target, ports = ports.len(), ?timeout, "arguments validated");

    if cli.scan_type == ScanType::Syn && !is_root() {
        output::print_warning(&format!(
            "{} scan requires root/sudo privileges for raw socket access.",
            cli.scan_type
        ));
        output::print_warning("Results may be incomplete or scanning may fail.");
    }

    if !host_check(cli, &settings).is_up(target, timeout).await {
        return Err(CliError::HostDown(target));
    }

    output::print_scan_header(target, cli.scan_type, ports.len());

    let params = ScanParameters {
        target,
        ports,
        timeout,
    };
    let options = StrategyOptions {
        services: Arc::new(settings.service_table()),
        interface: cli.interface.clone(),
        syn_source_port: settings.syn_source_port,
        banner_timeout: settings.banner_timeout(),
        cancel: cancel.clone(),
    };
    let job = ScanJobConfig {
        concurrency: cli.concurrency.unwrap_or(settings.default_concurrency),
        rate_limit: cli.rate_limit.unwrap_or(settings.rate_limit),
        progress: cli.verbose,
    };

    let report = scan_target(&params, cli.scan_type, options, &job).await;

    let shown = output::select_results(&report.sorted_results(), cli.open);
    output::print_results(&report, &shown).map_err(ScanError::from)?;

    if report.cancelled {
        return Err(ScanError::Cancelled.into());
    }

    if let Some(path) = &cli.output {
        let written = output::export_results(&shown, path, cli.format)?;
        info!(path = %written.display(), "results exported");
        output::print_success(&format!(
            "Results successfully exported to {}",
            written.display()
        ));
    }

    Ok(report)
}

/// The liveness oracle for this run.
///
/// ICMP echo needs a raw socket; without root the check is skipped rather
/// than reporting every host as down.
fn host_check(cli: &Cli, settings: &AppSettings) -> Box<dyn HostCheck> {
    if cli.skip_ping {
        return Box::new(AssumeUp);
    }
    if !is_root() {
        output::print_warning("Skipping host discovery: ICMP echo requires root/sudo privileges.");
        return Box::new(AssumeUp);
    }
    Box::new(IcmpEcho::new(settings.ping_count))
}
