//! Writing results to a file as text, CSV or JSON.
//!
//! All three formats carry the same `Port`, `Status`, `Service` triple per
//! result.

use crate::error::ExportError;
use crate::scanner::PortResult;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// File format for `--output`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// One `Port: N, Status: S, Service: X` line per result
    #[default]
    Txt,
    /// Header row `Port,Status,Service`, then one row per result
    Csv,
    /// Array of `{"Port", "Status", "Service"}` objects
    Json,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Txt => "txt",
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// The file an export to `path` lands in: `path` itself when it already ends
/// in the format's extension, otherwise `path` with that extension appended
/// (`scan` and `scan.v2` become `scan.json` and `scan.v2.json`).
pub fn export_path(path: &Path, format: ExportFormat) -> PathBuf {
    let wanted = format.extension();
    let matches = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(wanted));
    if matches {
        return path.to_path_buf();
    }

    let mut name = path.as_os_str().to_os_string();
    name.push(".");
    name.push(wanted);
    PathBuf::from(name)
}

/// Write `results` to `path` and return the file actually written.
pub fn export_results(
    results: &[PortResult],
    path: &Path,
    format: ExportFormat,
) -> Result<PathBuf, ExportError> {
    let path = export_path(path, format);
    let file = File::create(&path).map_err(|source| ExportError::Create {
        path: path.clone(),
        source,
    })?;
    let mut writer = BufWriter::new(file);

    match format {
        ExportFormat::Txt => write_txt(results, &mut writer)?,
        ExportFormat::Csv => write_csv(results, &mut writer)?,
        ExportFormat::Json => write_json(results, &mut writer)?,
    }
    writer.flush()?;

    Ok(path)
}

pub fn write_txt<W: Write>(results: &[PortResult], mut writer: W) -> Result<(), ExportError> {
    for result in results {
        writeln!(
            writer,
            "Port: {}, Status: {}, Service: {}",
            result.port, result.state, result.service
        )?;
    }
    Ok(())
}

pub fn write_csv<W: Write>(results: &[PortResult], writer: W) -> Result<(), ExportError> {
    let mut wtr = csv::Writer::from_writer(writer);

    // An empty result set still gets its header row.
    if results.is_empty() {
        wtr.write_record(["Port", "Status", "Service"])?;
    }
    for result in results {
        wtr.serialize(result)?;
    }

    wtr.flush()?;
    Ok(())
}

pub fn write_json<W: Write>(results: &[PortResult], mut writer: W) -> Result<(), ExportError> {
    serde_json::to_writer_pretty(&mut writer, results)?;
    writeln!(writer)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::PortState;

    fn sample() -> Vec<PortResult> {
        vec![
            PortResult::new(22, PortState::Open, "SSH-2.0-OpenSSH_9.6"),
            PortResult::new(53, PortState::OpenOrFiltered, "dns"),
            PortResult::new(9999, PortState::Closed, "unknown"),
        ]
    }

    #[test]
    fn test_txt_lines() {
        let mut out = Vec::new();
        write_txt(&sample(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "Port: 22, Status: open, Service: SSH-2.0-OpenSSH_9.6");
        assert_eq!(lines[1], "Port: 53, Status: open/filtered, Service: dns");
    }

    #[test]
    fn test_csv_header_and_rows() {
        let mut out = Vec::new();
        write_csv(&sample(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Port,Status,Service");
        assert_eq!(lines[1], "22,open,SSH-2.0-OpenSSH_9.6");
        assert_eq!(lines[3], "9999,closed,unknown");

        let mut empty = Vec::new();
        write_csv(&[], &mut empty).unwrap();
        assert_eq!(String::from_utf8(empty).unwrap(), "Port,Status,Service\n");
    }

    #[test]
    fn test_json_array_fields() {
        let mut out = Vec::new();
        write_json(&sample(), &mut out).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        let entries = value.as_array().unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[1]["Port"], 53);
        assert_eq!(entries[1]["Status"], "open/filtered");
        assert_eq!(entries[1]["Service"], "dns");
    }

    #[test]
    fn test_export_appends_extension() {
        let dir = tempfile::tempdir().unwrap();

        let written = export_results(&sample(), &dir.path().join("scan"), ExportFormat::Csv).unwrap();
        assert_eq!(written, dir.path().join("scan.csv"));
        assert!(std::fs::read_to_string(&written).unwrap().starts_with("Port,Status,Service"));

        let explicit = dir.path().join("out.txt");
        let written = export_results(&sample(), &explicit, ExportFormat::Txt).unwrap();
        assert_eq!(written, explicit);
    }

    #[test]
    fn test_export_path_keeps_other_extensions() {
        assert_eq!(
            export_path(Path::new("scan.v2"), ExportFormat::Json),
            PathBuf::from("scan.v2.json")
        );
        assert_eq!(
            export_path(Path::new("out/scan.csv"), ExportFormat::Json),
            PathBuf::from("out/scan.csv.json")
        );
        assert_eq!(
            export_path(Path::new("scan.JSON"), ExportFormat::Json),
            PathBuf::from("scan.JSON")
        );
        assert_eq!(
            export_path(Path::new("scan"), ExportFormat::Txt),
            PathBuf::from("scan.txt")
        );
    }

    #[test]
    fn test_export_to_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("scan");

        let err = export_results(&sample(), &path, ExportFormat::Json).unwrap_err();
        assert!(matches!(err, ExportError::Create { .. }));
    }
}
