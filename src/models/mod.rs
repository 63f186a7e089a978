pub mod output;
pub mod result;
pub mod status;
pub mod tree;

pub use output::{ChunkData, OutputChunk, OutputLog, ResultKey, Stream};
pub use result::{Attachment, Location, TestError, TestResult};
pub use status::{Outcome, RunStatus, TestStatus};
pub use tree::{Child, NodeKind, SuiteNode, TestCase, TestId, TestTree};
