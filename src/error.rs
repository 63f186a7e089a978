use std::path::PathBuf;

use thiserror::Error;

/// Failures inside best-effort rendering steps.
///
/// None of these abort a report: callers fold them into "omit this section".
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to read source file {path}")]
    SourceRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line} is outside of the source ({total} lines)")]
    LineOutOfRange { line: u32, total: usize },

    #[error("invalid config {path}")]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
