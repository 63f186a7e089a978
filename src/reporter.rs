use std::collections::BTreeMap;
use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::ansi::fit_to_screen;
use crate::config::ReporterConfig;
use crate::models::{
    ChunkData, Outcome, OutputChunk, OutputLog, ResultKey, RunStatus, Stream, TestCase, TestError,
    TestResult, TestStatus, TestTree,
};
use crate::report::{
    Annotation, CodeFrameRenderer, FailureOptions, Formatter, PlainCodeFrame, StackFrameParser,
    TestSummary, V8FrameParser, format_duration, generate_summary, relative_path, slow_files,
};
use crate::style::Styler;

/// Receives lifecycle events from the execution engine and renders the
/// terminal report.
///
/// The reporter never mutates the tests it is shown. Captured output is kept
/// in its own [`OutputLog`], keyed by attempt.
pub struct BaseReporter<W: Write> {
    config: ReporterConfig,
    styler: Styler,
    cwd: PathBuf,
    terminal_width: u16,
    frame_parser: Box<dyn StackFrameParser>,
    code_frame: Box<dyn CodeFrameRenderer>,
    out: W,
    outputs: OutputLog,
    file_durations: BTreeMap<String, Duration>,
    annotations: Vec<Annotation>,
    started: Option<Instant>,
    duration: Duration,
    run_status: RunStatus,
    total_test_count: usize,
}

impl<W: Write> BaseReporter<W> {
    pub fn new(config: ReporterConfig, out: W) -> Self {
        let styler = Styler::detect(config.color);
        let cwd = std::env::current_dir().unwrap_or_else(|_| config.root_dir.clone());
        let terminal_width = config.terminal_width.unwrap_or_else(detect_terminal_width);
        Self {
            config,
            styler,
            cwd,
            terminal_width,
            frame_parser: Box::new(V8FrameParser),
            code_frame: Box::new(PlainCodeFrame),
            out,
            outputs: OutputLog::new(),
            file_durations: BTreeMap::new(),
            annotations: Vec::new(),
            started: None,
            duration: Duration::ZERO,
            run_status: RunStatus::default(),
            total_test_count: 0,
        }
    }

    pub fn with_styler(mut self, styler: Styler) -> Self {
        self.styler = styler;
        self
    }

    pub fn with_cwd(mut self, cwd: PathBuf) -> Self {
        self.cwd = cwd;
        self
    }

    pub fn with_frame_parser(mut self, parser: Box<dyn StackFrameParser>) -> Self {
        self.frame_parser = parser;
        self
    }

    pub fn with_code_frame(mut self, renderer: Box<dyn CodeFrameRenderer>) -> Self {
        self.code_frame = renderer;
        self
    }

    pub fn formatter(&self) -> Formatter<'_> {
        Formatter {
            styler: self.styler,
            root_dir: &self.config.root_dir,
            cwd: &self.cwd,
            frame_parser: self.frame_parser.as_ref(),
            code_frame: self.code_frame.as_ref(),
        }
    }

    pub fn on_begin(&mut self, suite: &TestTree) {
        self.started = Some(Instant::now());
        self.total_test_count = suite.all_tests().len();
        debug!(total = self.total_test_count, "run started");
    }

    /// Record stdout produced by an attempt. Output without an attempt is dropped.
    pub fn on_std_out(&mut self, data: ChunkData, result: Option<ResultKey>) {
        self.append_output(Stream::Stdout, data, result);
    }

    /// Record stderr produced by an attempt. Output without an attempt is dropped.
    pub fn on_std_err(&mut self, data: ChunkData, result: Option<ResultKey>) {
        self.append_output(Stream::Stderr, data, result);
    }

    fn append_output(&mut self, stream: Stream, data: ChunkData, result: Option<ResultKey>) {
        if let Some(key) = result {
            self.outputs.append(key, OutputChunk { stream, data });
        }
    }

    pub fn on_test_end(&mut self, test: &TestCase, result: &TestResult) -> io::Result<()> {
        let key = self.file_key(test);
        *self.file_durations.entry(key).or_default() += result.duration;

        if self.config.progress {
            let line = self.progress_line(test, result);
            writeln!(self.out, "{line}")?;
        }
        Ok(())
    }

    /// Print an error that does not belong to any test.
    pub fn on_error(&mut self, error: &TestError) -> io::Result<()> {
        let message = self
            .formatter()
            .format_error(error, self.styler.enabled(), None)
            .message;
        writeln!(self.out, "{message}")
    }

    pub fn on_end(&mut self, status: RunStatus) {
        self.duration = self.started.map(|s| s.elapsed()).unwrap_or_default();
        self.run_status = status;
        debug!(?status, elapsed_ms = self.duration.as_millis() as u64, "run finished");
    }

    /// Whether the engine should schedule another attempt of `test`.
    pub fn will_retry(&self, test: &TestCase) -> bool {
        test.outcome() == Outcome::Unexpected && test.results.len() <= test.retries
    }

    pub fn generate_summary<'a>(&self, suite: &'a TestTree) -> TestSummary<'a> {
        generate_summary(suite)
    }

    pub fn slow_tests(&self) -> Vec<(String, Duration)> {
        slow_files(&self.file_durations, self.config.slow_tests.as_ref())
    }

    /// Print the final report. `full = false` prints only the summary.
    pub fn epilogue(&mut self, suite: &TestTree, full: bool) -> io::Result<()> {
        let summary = generate_summary(suite);
        let formatter = self.formatter();
        let summary_message = formatter.generate_summary_message(
            &summary,
            self.duration,
            self.run_status,
            self.config.global_timeout(),
        );

        let mut failures = Vec::new();
        let mut annotations = Vec::new();
        if full && !summary.failures_to_print.is_empty() && !self.config.omit_failures {
            for (i, test) in summary.failures_to_print.iter().enumerate() {
                let report = formatter.format_failure(
                    test,
                    &self.outputs,
                    FailureOptions {
                        index: Some(i + 1),
                        include_stdio: self.config.include_stdio,
                        ..FailureOptions::default()
                    },
                );
                failures.push(report.message);
                annotations.extend(report.annotations);
            }
        }

        let slow_lines: Vec<String> = self
            .slow_tests()
            .into_iter()
            .map(|(file, duration)| {
                format!(
                    "{}{file}{}",
                    self.styler.yellow("  Slow test file: "),
                    self.styler.yellow(&format!(" ({})", format_duration(duration)))
                )
            })
            .collect();

        self.annotations.extend(annotations);

        if !failures.is_empty() {
            writeln!(self.out)?;
            for message in &failures {
                writeln!(self.out, "{message}")?;
            }
        }
        for line in &slow_lines {
            writeln!(self.out, "{line}")?;
        }
        if !slow_lines.is_empty() {
            writeln!(
                self.out,
                "{}",
                self.styler
                    .yellow("  Consider splitting slow test files to speed up parallel execution")
            )?;
        }
        if !summary_message.trim().is_empty() {
            writeln!(self.out)?;
            writeln!(self.out, "{summary_message}")?;
        }
        self.out.flush()
    }

    /// Annotations for every attempt printed by [`Self::epilogue`].
    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn outputs(&self) -> &OutputLog {
        &self.outputs
    }

    pub fn file_durations(&self) -> &BTreeMap<String, Duration> {
        &self.file_durations
    }

    pub fn total_test_count(&self) -> usize {
        self.total_test_count
    }

    pub fn writer(&self) -> &W {
        &self.out
    }

    pub fn into_writer(self) -> W {
        self.out
    }

    /// `[project] › relative/path`, or just the path when there is no project.
    fn file_key(&self, test: &TestCase) -> String {
        let relative = relative_path(&self.config.root_dir, &test.location.file);
        match test.project.as_deref().filter(|p| !p.is_empty()) {
            Some(project) => format!("[{project}] › {relative}"),
            None => relative,
        }
    }

    fn progress_line(&self, test: &TestCase, result: &TestResult) -> String {
        let icon = result.status.icon();
        let icon = if result.status == TestStatus::Skipped {
            self.styler.yellow(icon)
        } else if result.status == test.expected_status {
            self.styler.green(icon)
        } else {
            self.styler.red(icon)
        };
        let retry = if result.retry > 0 {
            format!(" (retry #{})", result.retry)
        } else {
            String::new()
        };
        let title = self.formatter().format_test_title(test, &[]);
        let line = format!("  {icon} {title}{retry}");
        let suffix = self
            .styler
            .dim(&format!(" ({})", format_duration(result.duration)));

        if self.terminal_width == 0 {
            format!("{line}{suffix}")
        } else {
            let fitted = fit_to_screen(&line, self.terminal_width as isize, Some(&suffix));
            format!("{fitted}{suffix}")
        }
    }
}

/// Columns of the attached terminal, or 0 when stdout is not a terminal.
fn detect_terminal_width() -> u16 {
    if !io::stdout().is_terminal() {
        return 0;
    }
    crossterm::terminal::size().map(|(cols, _)| cols).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Location, NodeKind};

    fn reporter(config: ReporterConfig) -> BaseReporter<Vec<u8>> {
        BaseReporter::new(config, Vec::new()).with_styler(Styler::plain())
    }

    fn output(r: &BaseReporter<Vec<u8>>) -> String {
        String::from_utf8(r.writer().clone()).unwrap()
    }

    fn case(results: &[TestStatus], retries: usize) -> TestCase {
        let mut test = TestCase::new("t", Location::default());
        test.retries = retries;
        test.results = results
            .iter()
            .enumerate()
            .map(|(retry, &status)| TestResult {
                status,
                ..TestResult::new(retry)
            })
            .collect();
        test
    }

    #[test]
    fn will_retry_follows_budget() {
        let r = reporter(ReporterConfig::default());
        assert!(r.will_retry(&case(&[TestStatus::Failed], 1)));
        assert!(!r.will_retry(&case(&[TestStatus::Failed, TestStatus::Failed], 1)));
        assert!(!r.will_retry(&case(&[TestStatus::Failed], 0)));
        assert!(!r.will_retry(&case(&[TestStatus::Passed], 3)));
    }

    #[test]
    fn output_without_result_is_dropped() {
        let mut r = reporter(ReporterConfig::default());
        r.on_std_out(ChunkData::Text("loose".into()), None);
        let key = ResultKey { test: 0, attempt: 0 };
        r.on_std_err(ChunkData::Text("kept".into()), Some(key));
        assert_eq!(r.outputs().get(key).len(), 1);
        assert_eq!(r.outputs().get(key)[0].stream, Stream::Stderr);
    }

    #[test]
    fn file_durations_accumulate_per_project_and_file() {
        let mut r = reporter(ReporterConfig {
            root_dir: PathBuf::from("/repo"),
            ..ReporterConfig::default()
        });
        let mut tree = TestTree::new();
        let project = tree.add_root(NodeKind::Project, "firefox".into(), None);
        let file = tree.add_child(project, NodeKind::File, "a.spec.ts".into(), None);
        let location = Location {
            file: PathBuf::from("/repo/a.spec.ts"),
            line: 1,
            column: 1,
        };
        let first = tree.add_test(file, TestCase::new("one", location.clone()));
        let second = tree.add_test(file, TestCase::new("two", location));

        for (id, ms) in [(first, 40), (second, 60), (first, 25)] {
            let result = TestResult {
                duration: Duration::from_millis(ms),
                ..TestResult::new(0)
            };
            r.on_test_end(tree.test(id).unwrap(), &result).unwrap();
        }
        assert_eq!(
            r.file_durations().get("[firefox] › a.spec.ts"),
            Some(&Duration::from_millis(125))
        );
    }

    #[test]
    fn progress_line_is_fitted_to_width() {
        let mut r = reporter(ReporterConfig {
            root_dir: PathBuf::from("/repo"),
            progress: true,
            terminal_width: Some(30),
            ..ReporterConfig::default()
        });
        let test = TestCase::new(
            "a very long test title that will not fit",
            Location {
                file: PathBuf::from("/repo/a.spec.ts"),
                line: 3,
                column: 1,
            },
        );
        let result = TestResult {
            duration: Duration::from_millis(12),
            ..TestResult::new(0)
        };
        r.on_test_end(&test, &result).unwrap();
        let text = output(&r);
        let line = crate::ansi::strip_ansi_escapes(text.trim_end());
        assert!(line.ends_with(" (12ms)"));
        assert_eq!(line.chars().count(), 30);
        assert!(line.starts_with("  ✔ a.spec.ts:3:1 › a v ("));
    }

    #[test]
    fn on_error_prints_immediately() {
        let mut r = reporter(ReporterConfig::default());
        r.on_error(&TestError::Plain {
            message: "worker crashed".into(),
        })
        .unwrap();
        assert_eq!(output(&r), "\nworker crashed\n");
    }
}
