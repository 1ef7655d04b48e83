//! Output formatting module.
//!
//! Terminal rendering of scan results plus the file export sink.

mod export;
mod plain;

pub use export::{
    export_path, export_results, write_csv, write_json, write_txt, ExportFormat,
};
pub use plain::{
    print_error, print_results, print_scan_header, print_success, print_warning, write_results,
};

use crate::scanner::PortResult;

/// The results to show and export: all of them, or only the open and
/// open/filtered ones for `--open`.
pub fn select_results(results: &[PortResult], open_only: bool) -> Vec<PortResult> {
    results
        .iter()
        .filter(|r| !open_only || r.is_open())
        .cloned()
        .collect()
}
