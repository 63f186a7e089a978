use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::ReportError;
use crate::style::ColorMode;

pub const CONFIG_FILE: &str = "recap.toml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReporterConfig {
    /// Test paths in titles and slow-file keys are shown relative to this directory.
    /// Defaults to the directory the config was loaded from.
    #[serde(default)]
    pub root_dir: PathBuf,
    /// Global timeout for the whole run, only used to explain a timed-out run.
    #[serde(default)]
    pub global_timeout_ms: u64,
    /// Never print failure blocks in the epilogue, only the summary.
    #[serde(default)]
    pub omit_failures: bool,
    /// Include captured stdout/stderr in failure blocks.
    #[serde(default)]
    pub include_stdio: bool,
    #[serde(default)]
    pub color: ColorMode,
    /// Overrides the detected terminal width used for progress lines.
    pub terminal_width: Option<u16>,
    /// Print one line per finished test.
    #[serde(default)]
    pub progress: bool,
    /// Slow test file reporting; disabled when absent.
    pub slow_tests: Option<SlowTestsConfig>,
}

/// Files whose tests took longer than `threshold_ms` in total are reported.
#[derive(Debug, Clone, Deserialize)]
pub struct SlowTestsConfig {
    /// At most this many files; 0 means no limit.
    #[serde(default = "default_slow_max")]
    pub max: usize,
    #[serde(default = "default_slow_threshold")]
    pub threshold_ms: u64,
}

fn default_slow_max() -> usize {
    5
}

fn default_slow_threshold() -> u64 {
    15_000
}

impl Default for SlowTestsConfig {
    fn default() -> Self {
        Self {
            max: default_slow_max(),
            threshold_ms: default_slow_threshold(),
        }
    }
}

impl SlowTestsConfig {
    pub fn threshold(&self) -> Duration {
        Duration::from_millis(self.threshold_ms)
    }
}

impl ReporterConfig {
    /// Load `recap.toml` from the workspace root, falling back to defaults if absent or invalid.
    pub fn load(workspace: &Path) -> Self {
        let path = workspace.join(CONFIG_FILE);
        let mut config = match Self::read(&path) {
            Ok(Some(config)) => config,
            Ok(None) => {
                debug!(path = %path.display(), "no config file, using defaults");
                Self::default()
            }
            Err(e) => {
                warn!(error = %e, "ignoring config");
                Self::default()
            }
        };
        if config.root_dir.as_os_str().is_empty() {
            config.root_dir = workspace.to_path_buf();
        } else if config.root_dir.is_relative() {
            config.root_dir = workspace.join(&config.root_dir);
        }
        config
    }

    fn read(path: &Path) -> Result<Option<Self>, ReportError> {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Ok(None);
        };
        toml::from_str(&content)
            .map(Some)
            .map_err(|source| ReportError::Config {
                path: path.to_path_buf(),
                source,
            })
    }

    pub fn global_timeout(&self) -> Duration {
        Duration::from_millis(self.global_timeout_ms)
    }
}
