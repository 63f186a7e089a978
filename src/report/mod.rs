//! Text rendering for failures, errors and run summaries.
//!
//! Everything here is pure with respect to the test tree: functions read
//! `TestCase`/`TestResult` values and return strings. The only I/O is reading
//! source files for code frames, which is best-effort.

pub mod code_frame;
pub mod error;
pub mod failure;
pub mod result;
pub mod stack;
pub mod summary;

use std::path::{Component, Path};
use std::time::Duration;

use crate::style::Styler;

pub use code_frame::{CodeFrameRenderer, PlainCodeFrame};
pub use error::ErrorDetails;
pub use failure::{Annotation, FailureOptions, FailureReport};
pub use result::FailureDetails;
pub use stack::{PreparedStack, StackFrame, StackFrameParser, V8FrameParser, prepare_error_stack};
pub use summary::{TestSummary, generate_summary, slow_files};

/// Width of every separator banner, regardless of terminal size.
pub const BANNER_WIDTH: usize = 100;

/// Everything a rendering call needs besides the data being rendered.
pub struct Formatter<'a> {
    pub styler: Styler,
    /// Test file paths are shown relative to this directory.
    pub root_dir: &'a Path,
    /// Relative stack frames and attachment paths are resolved against this directory.
    pub cwd: &'a Path,
    pub frame_parser: &'a dyn StackFrameParser,
    pub code_frame: &'a dyn CodeFrameRenderer,
}

impl Formatter<'_> {
    /// Append a space and gray `fill` characters up to [`BANNER_WIDTH`].
    pub fn pad(&self, line: &str, fill: char) -> String {
        let mut out = line.to_string();
        if !out.is_empty() {
            out.push(' ');
        }
        let used = out.chars().count();
        let filler: String = std::iter::repeat_n(fill, BANNER_WIDTH.saturating_sub(used)).collect();
        out.push_str(&self.styler.gray(&filler));
        out
    }
}

/// Prefix every non-empty line of `text` with `tab`.
pub fn indent(text: &str, tab: &str) -> String {
    text.split('\n')
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{tab}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// `path` relative to `base`, walking up with `..` when needed. Paths on a
/// different root are returned as given.
pub fn relative_path(base: &Path, path: &Path) -> String {
    if let Ok(rest) = path.strip_prefix(base) {
        return rest.to_string_lossy().into_owned();
    }
    if base.is_absolute() != path.is_absolute() {
        return path.to_string_lossy().into_owned();
    }

    let base_parts: Vec<Component> = base.components().collect();
    let path_parts: Vec<Component> = path.components().collect();
    let common = base_parts
        .iter()
        .zip(&path_parts)
        .take_while(|(a, b)| a == b)
        .count();
    if common == 0 {
        return path.to_string_lossy().into_owned();
    }

    let mut parts: Vec<String> = vec!["..".to_string(); base_parts.len() - common];
    parts.extend(
        path_parts[common..]
            .iter()
            .map(|c| c.as_os_str().to_string_lossy().into_owned()),
    );
    parts.join(std::path::MAIN_SEPARATOR_STR)
}

/// Short human duration: `850ms`, `1.5s`, `2m 3.2s`, `1h 5m`.
pub fn format_duration(duration: Duration) -> String {
    let ms = duration.as_millis();
    if ms < 1000 {
        return format!("{ms}ms");
    }

    // Round to tenths first so a carry reaches minutes and hours.
    let tenths = (ms + 50) / 100;
    let hours = tenths / 36_000;
    let minutes = (tenths % 36_000) / 600;
    let seconds = tenths % 600;

    let mut parts = Vec::new();
    if hours > 0 {
        parts.push(format!("{hours}h"));
    }
    if minutes > 0 {
        parts.push(format!("{minutes}m"));
    }
    match (seconds / 10, seconds % 10) {
        (0, 0) => {}
        (whole, 0) => parts.push(format!("{whole}s")),
        (whole, frac) => parts.push(format!("{whole}.{frac}s")),
    }
    parts.join(" ")
}
