pub mod events;

use std::collections::HashMap;
use std::io::Write;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::models::{NodeKind, Outcome, ResultKey, TestId, TestResult, TestTree};
use crate::reporter::BaseReporter;

pub use events::{ReporterEvent, TestDescriptor, WireChunk, parse_line};

/// Applies engine events to a test tree and forwards them to a reporter.
///
/// The session plays the engine's side of the contract: it owns the tests and
/// their results, while the reporter only observes them.
pub struct Session<W: Write> {
    pub tree: TestTree,
    pub reporter: BaseReporter<W>,
    ids: HashMap<String, TestId>,
    begun: bool,
}

impl<W: Write> Session<W> {
    pub fn new(reporter: BaseReporter<W>) -> Self {
        Self {
            tree: TestTree::new(),
            reporter,
            ids: HashMap::new(),
            begun: false,
        }
    }

    pub fn handle_event(&mut self, event: ReporterEvent) -> Result<()> {
        match event {
            ReporterEvent::RunStarted { tests } => {
                for test in &tests {
                    self.register(test);
                }
                self.begin();
            }

            ReporterEvent::TestBegin { test, retry } => {
                let id = self.register(&test);
                self.begin();
                if let Some(case) = self.tree.test_mut(id) {
                    case.results.push(TestResult::new(retry));
                }
            }

            ReporterEvent::Stdout { test, chunk } => {
                let key = test.as_deref().and_then(|t| self.current_attempt(t));
                self.reporter.on_std_out(chunk.into_data(), key);
            }

            ReporterEvent::Stderr { test, chunk } => {
                let key = test.as_deref().and_then(|t| self.current_attempt(t));
                self.reporter.on_std_err(chunk.into_data(), key);
            }

            ReporterEvent::TestEnd {
                test,
                status,
                duration,
                error,
                attachments,
            } => {
                let Some(&id) = self.ids.get(&test) else {
                    warn!(test = %test, "test-end for unknown test");
                    return Ok(());
                };
                let Some(case) = self.tree.test_mut(id) else {
                    return Ok(());
                };
                if case.results.is_empty() {
                    case.results.push(TestResult::new(0));
                }
                if let Some(result) = case.results.last_mut() {
                    result.status = status;
                    result.duration = millis_to_duration(duration);
                    result.error = error;
                    result.attachments = attachments;
                }

                if let Some(case) = self.tree.test(id)
                    && let Some(result) = case.results.last()
                {
                    self.reporter
                        .on_test_end(case, result)
                        .context("failed to write progress")?;
                    if self.reporter.will_retry(case) {
                        debug!(test = %case.title(), attempts = case.results.len(), "retry expected");
                    }
                }
            }

            ReporterEvent::Error { error } => {
                self.reporter
                    .on_error(&error)
                    .context("failed to write error")?;
            }

            ReporterEvent::RunFinished { status } => {
                self.begin();
                self.reporter.on_end(status);
            }
        }
        Ok(())
    }

    /// Print the final report.
    pub fn finish(&mut self, full: bool) -> Result<()> {
        self.reporter
            .epilogue(&self.tree, full)
            .context("failed to write report")
    }

    /// True when any test ended with an unexpected outcome.
    pub fn has_failures(&self) -> bool {
        self.tree
            .all_tests()
            .iter()
            .any(|t| t.outcome() == Outcome::Unexpected)
    }

    fn begin(&mut self) {
        if !self.begun {
            self.begun = true;
            self.reporter.on_begin(&self.tree);
        }
    }

    fn current_attempt(&self, engine_id: &str) -> Option<ResultKey> {
        let &id = self.ids.get(engine_id)?;
        let attempts = self.tree.test(id)?.results.len();
        let attempt = attempts.checked_sub(1)?;
        Some(ResultKey { test: id, attempt })
    }

    /// Find or create the test described by `desc`, with its project, file
    /// and describe nodes.
    fn register(&mut self, desc: &TestDescriptor) -> TestId {
        if let Some(&id) = self.ids.get(&desc.id) {
            return id;
        }

        let file_title = desc.file.to_string_lossy().to_string();
        let mut parent = match desc.project.as_deref().filter(|p| !p.is_empty()) {
            Some(project) => {
                let project_id = self.find_or_create_root(NodeKind::Project, project);
                self.find_or_create_child(project_id, NodeKind::File, &file_title)
            }
            None => self.find_or_create_root(NodeKind::File, &file_title),
        };
        for title in desc.describe_titles() {
            parent = self.find_or_create_child(parent, NodeKind::Describe, title);
        }

        let id = self.tree.add_test(parent, desc.to_test_case());
        self.ids.insert(desc.id.clone(), id);
        id
    }

    fn find_or_create_root(&mut self, kind: NodeKind, title: &str) -> usize {
        match self.tree.find_root_by_title(title) {
            Some(id) => id,
            None => self.tree.add_root(kind, title.to_string(), None),
        }
    }

    fn find_or_create_child(&mut self, parent: usize, kind: NodeKind, title: &str) -> usize {
        match self.tree.find_child_by_title(parent, title) {
            Some(id) => id,
            None => self.tree.add_child(parent, kind, title.to_string(), None),
        }
    }
}

/// Engine durations arrive as float milliseconds. Negative values clamp to
/// zero and values too large for a `Duration` saturate.
fn millis_to_duration(ms: f64) -> Duration {
    Duration::try_from_secs_f64(ms.max(0.0) / 1000.0).unwrap_or_else(|e| {
        warn!(ms, error = %e, "duration out of range");
        Duration::MAX
    })
}

/// Read NDJSON events from `reader` and send them over the channel.
/// Lines that are not events are logged and skipped.
pub async fn stream_events<R>(reader: R, tx: mpsc::UnboundedSender<ReporterEvent>) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await.context("failed to read events")? {
        match parse_line(&line) {
            None => {}
            Some(Ok(event)) => {
                if tx.send(event).is_err() {
                    break;
                }
            }
            Some(Err(e)) => debug!(error = %e, line = %line, "skipping non-event line"),
        }
    }
    Ok(())
}
