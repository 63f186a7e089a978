use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use super::status::TestStatus;

/// A position in a source file. Lines and columns are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct Location {
    pub file: PathBuf,
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file.display(), self.line, self.column)
    }
}

/// An error recorded against an attempt, or reported outside of any test.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum TestError {
    /// A thrown error with its raw stack text. The stack usually repeats the message.
    Stack { message: String, stack: String },
    Plain { message: String },
    /// Something that was thrown but is not error-like, already stringified.
    Opaque { value: String },
}

impl TestError {
    pub fn message(&self) -> &str {
        match self {
            TestError::Stack { message, .. } | TestError::Plain { message } => message,
            TestError::Opaque { value } => value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub name: String,
    pub content_type: String,
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub body: Option<Vec<u8>>,
}

impl Attachment {
    pub fn is_text(&self) -> bool {
        self.content_type.starts_with("text/")
    }
}

/// One attempt at running a test.
#[derive(Debug, Clone, Default)]
pub struct TestResult {
    pub status: TestStatus,
    /// 0 for the first attempt.
    pub retry: usize,
    pub error: Option<TestError>,
    pub attachments: Vec<Attachment>,
    pub duration: Duration,
}

impl TestResult {
    pub fn new(retry: usize) -> Self {
        Self {
            retry,
            ..Self::default()
        }
    }
}
