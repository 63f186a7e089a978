use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::models::Location;

/// Lines starting with this prefix are stack frames; everything above the
/// first one is the error message.
pub const FRAME_PREFIX: &str = "    at ";

/// One stack frame resolved to a source position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackFrame {
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub function: Option<String>,
}

/// Maps a raw stack line to the frame it describes.
pub trait StackFrameParser {
    /// `None` when the line is not a frame or points nowhere useful.
    fn parse_line(&self, line: &str) -> Option<StackFrame>;
}

static V8_FRAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*at (?:(?:async )?(?P<func>.+?) \()?(?P<file>.+?):(?P<line>\d+):(?P<col>\d+)\)?$")
        .expect("frame pattern is valid")
});

/// Understands V8-style frames: `at fn (file:line:col)` and `at file:line:col`.
#[derive(Debug, Clone, Copy, Default)]
pub struct V8FrameParser;

impl StackFrameParser for V8FrameParser {
    fn parse_line(&self, line: &str) -> Option<StackFrame> {
        let caps = V8_FRAME_RE.captures(line.trim_end())?;
        let raw_file = &caps["file"];
        let file = raw_file.strip_prefix("file://").unwrap_or(raw_file);
        if file.is_empty()
            || file.starts_with("node:")
            || file.starts_with("internal/")
            || file == "native"
        {
            return None;
        }
        Some(StackFrame {
            file: file.to_string(),
            line: caps["line"].parse().ok()?,
            column: caps["col"].parse().ok()?,
            function: caps.name("func").map(|m| m.as_str().to_string()),
        })
    }
}

/// A raw stack split into its message, frame lines and first resolvable location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedStack {
    pub message: String,
    pub stack_lines: Vec<String>,
    pub location: Option<Location>,
}

pub fn prepare_error_stack(
    stack: &str,
    cwd: &Path,
    parser: &dyn StackFrameParser,
) -> PreparedStack {
    let lines: Vec<&str> = stack.split('\n').collect();
    let first_frame = lines
        .iter()
        .position(|line| line.starts_with(FRAME_PREFIX))
        .unwrap_or(lines.len());

    let message = lines[..first_frame].join("\n");
    let stack_lines: Vec<String> = lines[first_frame..].iter().map(|l| l.to_string()).collect();

    let location = stack_lines.iter().find_map(|line| {
        let frame = parser.parse_line(line)?;
        Some(Location {
            file: resolve(cwd, &frame.file),
            line: frame.line,
            column: frame.column,
        })
    });

    PreparedStack {
        message,
        stack_lines,
        location,
    }
}

fn resolve(cwd: &Path, file: &str) -> PathBuf {
    let path = Path::new(file);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}
