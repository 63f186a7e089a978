use std::collections::HashMap;

use super::tree::TestId;

/// Identifies one attempt of one test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResultKey {
    pub test: TestId,
    /// Position in `TestCase::results`.
    pub attempt: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkData {
    Text(String),
    Bytes(Vec<u8>),
}

/// A piece of output captured while an attempt was running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputChunk {
    pub stream: Stream,
    pub data: ChunkData,
}

impl OutputChunk {
    /// Decoded text; invalid UTF-8 is replaced rather than rejected.
    pub fn text(&self) -> String {
        match &self.data {
            ChunkData::Text(s) => s.clone(),
            ChunkData::Bytes(b) => String::from_utf8_lossy(b).into_owned(),
        }
    }
}

/// Captured output per attempt, kept outside of the results it describes.
#[derive(Debug, Default)]
pub struct OutputLog {
    chunks: HashMap<ResultKey, Vec<OutputChunk>>,
}

impl OutputLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append in arrival order, creating the attempt's buffer on first use.
    pub fn append(&mut self, key: ResultKey, chunk: OutputChunk) {
        self.chunks.entry(key).or_default().push(chunk);
    }

    pub fn get(&self, key: ResultKey) -> &[OutputChunk] {
        self.chunks.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }
}
