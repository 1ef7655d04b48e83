//! Application settings and paths.
//!
//! Settings live in `settings.json` under the XDG config directory, or in a
//! file named on the command line.

use crate::error::{ConfigError, ConfigResult};
use crate::services::ServiceTable;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Ports scanned when no `-p` is given.
pub const DEFAULT_PORTS: &str = "20,21,22,23,25,53,67,68,69,80,110,119,123,135,137,138,139,143,161,162,179,194,443,445,465,587,993,995,1433,3306";

/// Application directory paths following the XDG Base Directory layout.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Configuration directory (~/.config/barnacle)
    pub config_dir: PathBuf,
}

impl Paths {
    /// Locate the configuration directory. Nothing is created on disk.
    pub fn discover() -> ConfigResult<Self> {
        let project = ProjectDirs::from("com", "barnacle", "barnacle")
            .ok_or(ConfigError::DirectoryNotFound)?;

        Ok(Self {
            config_dir: project.config_dir().to_path_buf(),
        })
    }

    /// Get the path to the settings file.
    pub fn settings_file(&self) -> PathBuf {
        self.config_dir.join("settings.json")
    }
}

/// Application-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Probes in flight at once.
    pub default_concurrency: usize,
    /// Per-probe timeout when `--timeout` is absent.
    pub default_timeout_ms: u64,
    /// Per-probe timeout when `--timeout` does not parse.
    pub fallback_timeout_ms: u64,
    /// Port spec used when `-p` is absent.
    pub default_ports: String,
    /// Deadline for reading a banner from an open TCP port.
    pub banner_timeout_ms: u64,
    /// Source port of SYN probes.
    pub syn_source_port: u16,
    /// ICMP echo requests sent by the liveness check.
    pub ping_count: u32,
    /// Probes started per second, 0 for unlimited.
    pub rate_limit: u32,
    /// Port to service name entries layered over the well-known table.
    pub services: BTreeMap<u16, String>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            default_concurrency: 500,
            default_timeout_ms: 1000,
            fallback_timeout_ms: 2000,
            default_ports: DEFAULT_PORTS.to_string(),
            banner_timeout_ms: 2000,
            syn_source_port: 12345,
            ping_count: 3,
            rate_limit: 0,
            services: BTreeMap::new(),
        }
    }
}

impl AppSettings {
    /// Load settings from `path`, or from the default location.
    ///
    /// A missing default file means defaults; a missing explicit file is an
    /// error.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        if let Some(path) = path {
            return Self::load_from(path);
        }

        // No home directory means no default file either.
        let Ok(paths) = Paths::discover() else {
            return Ok(Self::default());
        };
        let file = paths.settings_file();
        if !file.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&file)
    }

    /// Load settings from a specific file.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        serde_json::from_str(&content).map_err(|e| ConfigError::InvalidFormat(e.to_string()))
    }

    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }

    pub fn fallback_timeout(&self) -> Duration {
        Duration::from_millis(self.fallback_timeout_ms)
    }

    pub fn banner_timeout(&self) -> Duration {
        Duration::from_millis(self.banner_timeout_ms)
    }

    /// The well-known table with this file's overrides applied.
    pub fn service_table(&self) -> ServiceTable {
        ServiceTable::well_known().with_overrides(self.services.clone())
    }
}
