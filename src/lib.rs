//! Terminal reporting for test runs: failure blocks with code frames,
//! retries, attachments and captured output, followed by an outcome summary.

pub mod ansi;
pub mod config;
pub mod error;
pub mod models;
pub mod report;
pub mod reporter;
pub mod runner;
pub mod style;

pub use config::ReporterConfig;
pub use error::ReportError;
pub use reporter::BaseReporter;
pub use runner::Session;
pub use style::{ColorMode, Styler};
