//! Plain text output formatting.
//!
//! Produces human-readable output with colors and formatting.

use crate::scanner::{PortResult, PortState, ScanReport, ScanType};
use console::{style, Style};
use std::io::{self, Write};
use std::net::Ipv4Addr;

const RULE: &str = "═══════════════════════════════════════════════════════════════";
const THIN_RULE: &str = "───────────────────────────────────────────────────────────────";

/// Print the scan report as a table on stdout.
pub fn print_results(report: &ScanReport, results: &[PortResult]) -> io::Result<()> {
    let stdout = io::stdout();
    write_results(&mut stdout.lock(), report, results)
}

/// Render the report table; `results` is what the table lists, which may be
/// a filtered view of the report.
pub fn write_results<W: Write>(
    out: &mut W,
    report: &ScanReport,
    results: &[PortResult],
) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", style(RULE).cyan())?;
    writeln!(
        out,
        "                    {} Scan Results",
        style("Barnacle").cyan().bold()
    )?;
    writeln!(out, "{}", style(RULE).cyan())?;
    writeln!(out)?;

    writeln!(
        out,
        "  {} {} ports scanned in {:.2}s",
        style("Statistics:").bold(),
        report.ports_scanned,
        report.duration_ms as f64 / 1000.0
    )?;
    writeln!(
        out,
        "               {} open, {} closed, {} filtered",
        style(report.open_ports).green().bold(),
        style(report.closed_ports).red(),
        style(report.filtered_ports).yellow()
    )?;
    writeln!(out)?;

    if results.is_empty() {
        writeln!(out, "  {}", style("No ports to display.").dim())?;
    } else {
        writeln!(out, "  {}", style(THIN_RULE).dim())?;
        writeln!(
            out,
            "  {:>6}  {:^14}  {}",
            style("PORT").bold(),
            style("STATE").bold(),
            style("SERVICE").bold()
        )?;
        writeln!(out, "  {}", style(THIN_RULE).dim())?;

        for result in results {
            writeln!(
                out,
                "  {:>6}  {:^14}  {}",
                result.port,
                state_style(result.state).apply_to(result.state.to_string()),
                truncate_string(&result.service, 45)
            )?;
        }

        writeln!(out, "  {}", style(THIN_RULE).dim())?;
    }

    writeln!(out)?;
    writeln!(out, "{}", style(RULE).cyan())?;
    writeln!(out)?;

    Ok(())
}

fn state_style(state: PortState) -> Style {
    match state {
        PortState::Open => Style::new().green().bold(),
        PortState::OpenOrFiltered => Style::new().green(),
        PortState::Closed => Style::new().red(),
        PortState::Filtered => Style::new().yellow(),
    }
}

/// Print a scan header before scanning begins.
pub fn print_scan_header(target: Ipv4Addr, scan_type: ScanType, ports: usize) {
    println!();
    println!(
        "{} {} v{}",
        style("Starting").cyan(),
        style("Barnacle").cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!(
        "{} Scan type: {}",
        style("•").dim(),
        style(scan_type).yellow()
    );
    println!("{} Target: {}", style("•").dim(), style(target).white().bold());
    println!(
        "{} Scanning {} ports...",
        style("•").dim(),
        style(ports).white().bold()
    );
    println!();
}

/// Print an error message.
pub fn print_error(msg: &str) {
    eprintln!("{} {}", style("Error:").red().bold(), msg);
}

/// Print a warning message.
pub fn print_warning(msg: &str) {
    eprintln!("{} {}", style("Warning:").yellow().bold(), msg);
}

/// Print a success message.
pub fn print_success(msg: &str) {
    println!("{} {}", style("✓").green().bold(), msg);
}

/// Truncate a string to at most `max_len` characters, adding an ellipsis if
/// truncated.
fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(results: Vec<PortResult>) -> ScanReport {
        ScanReport {
            ports_scanned: results.len(),
            open_ports: results.iter().filter(|r| r.is_open()).count(),
            closed_ports: results.iter().filter(|r| r.state == PortState::Closed).count(),
            filtered_ports: 0,
            duration_ms: 1500,
            cancelled: false,
            results,
        }
    }

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("hello", 10), "hello");
        assert_eq!(truncate_string("hello world", 8), "hello...");
        assert_eq!(truncate_string("héllo wörld", 8), "héllo...");
    }

    #[test]
    fn test_table_lists_given_results() {
        console::set_colors_enabled(false);
        let report = report(vec![
            PortResult::new(22, PortState::Open, "ssh"),
            PortResult::new(23, PortState::Closed, "telnet"),
        ]);

        let mut out = Vec::new();
        write_results(&mut out, &report, &report.results[..1]).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("2 ports scanned in 1.50s"));
        assert!(text.contains("ssh"));
        assert!(!text.contains("telnet"));
    }

    #[test]
    fn test_empty_table() {
        console::set_colors_enabled(false);
        let report = report(Vec::new());

        let mut out = Vec::new();
        write_results(&mut out, &report, &[]).unwrap();
        assert!(String::from_utf8(out).unwrap().contains("No ports to display."));
    }
}
