use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::models::{Attachment, ChunkData, Location, RunStatus, TestCase, TestError, TestStatus};

/// Events emitted by the execution engine, one JSON object per line.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ReporterEvent {
    RunStarted {
        /// Tests known up front. Tests first seen in `test-begin` are added then.
        #[serde(default)]
        tests: Vec<TestDescriptor>,
    },
    TestBegin {
        #[serde(flatten)]
        test: TestDescriptor,
        #[serde(default)]
        retry: usize,
    },
    Stdout {
        test: Option<String>,
        #[serde(flatten)]
        chunk: WireChunk,
    },
    Stderr {
        test: Option<String>,
        #[serde(flatten)]
        chunk: WireChunk,
    },
    TestEnd {
        test: String,
        status: TestStatus,
        #[serde(default)]
        duration: f64,
        error: Option<TestError>,
        #[serde(default)]
        attachments: Vec<Attachment>,
    },
    Error {
        error: TestError,
    },
    RunFinished {
        #[serde(default)]
        status: RunStatus,
    },
}

/// Identity and settings of a test as reported by the engine.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestDescriptor {
    /// Engine-assigned id, referenced by later events.
    pub id: String,
    pub project: Option<String>,
    pub file: PathBuf,
    #[serde(default)]
    pub line: u32,
    #[serde(default)]
    pub column: u32,
    /// Describe titles followed by the test title.
    pub titles: Vec<String>,
    #[serde(default)]
    pub expected_status: TestStatus,
    pub timeout: Option<u64>,
    #[serde(default)]
    pub retries: usize,
}

impl TestDescriptor {
    /// A detached test case; describe titles are attached by the tree.
    pub fn to_test_case(&self) -> TestCase {
        let title = self.titles.last().cloned().unwrap_or_default();
        let mut case = TestCase::new(
            title,
            Location {
                file: self.file.clone(),
                line: self.line,
                column: self.column,
            },
        );
        case.expected_status = self.expected_status;
        if let Some(ms) = self.timeout {
            case.timeout = Duration::from_millis(ms);
        }
        case.retries = self.retries;
        case
    }

    pub fn describe_titles(&self) -> &[String] {
        match self.titles.split_last() {
            Some((_, describes)) => describes,
            None => &[],
        }
    }
}

/// Output payload: text, or raw bytes for binary output.
#[derive(Debug, Clone, Deserialize)]
pub struct WireChunk {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub bytes: Option<Vec<u8>>,
}

impl WireChunk {
    pub fn into_data(self) -> ChunkData {
        match (self.text, self.bytes) {
            (Some(text), _) => ChunkData::Text(text),
            (None, Some(bytes)) => ChunkData::Bytes(bytes),
            (None, None) => ChunkData::Text(String::new()),
        }
    }
}

/// Parse one line of the event stream. Blank lines yield `None`.
pub fn parse_line(line: &str) -> Option<serde_json::Result<ReporterEvent>> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    Some(serde_json::from_str(line))
}
