use super::{Formatter, relative_path};
use crate::models::{Location, OutputLog, ResultKey, Stream, TestCase, TestResult};

/// Inline text attachments longer than this are cut off.
const MAX_INLINE_ATTACHMENT: usize = 300;

/// Command suggested for opening attachments named `trace`.
const TRACE_VIEWER: &str = "npx playwright show-trace";

/// A rendered attempt tagged with where its failure happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub title: String,
    pub message: String,
    pub location: Option<Location>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FailureReport {
    pub message: String,
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Clone, Copy)]
pub struct FailureOptions {
    /// 1-based position shown before the title.
    pub index: Option<usize>,
    pub include_stdio: bool,
    pub include_attachments: bool,
}

impl Default for FailureOptions {
    fn default() -> Self {
        Self {
            index: None,
            include_stdio: false,
            include_attachments: true,
        }
    }
}

impl Formatter<'_> {
    /// `[project] › file:line:col › describe › test`, followed by ` › step`
    /// for each active nested step. Step titles come from the engine; the
    /// epilogue and progress lines pass none.
    pub fn format_test_title(&self, test: &TestCase, steps: &[String]) -> String {
        let location = format!(
            "{}:{}:{}",
            relative_path(self.root_dir, &test.location.file),
            test.location.line,
            test.location.column
        );
        let project = test
            .project
            .as_deref()
            .filter(|p| !p.is_empty())
            .map(|p| format!("[{p}] › "))
            .unwrap_or_default();
        let steps: String = steps.iter().map(|s| format!(" › {s}")).collect();
        format!("{project}{location} › {}{steps}", test.titles.join(" › "))
    }

    pub fn format_test_header(&self, test: &TestCase, indent: &str, index: Option<usize>) -> String {
        let title = self.format_test_title(test, &[]);
        let index = index.map(|i| format!("{i}) ")).unwrap_or_default();
        self.pad(&format!("{indent}{index}{title}"), '=')
    }

    /// Render every reportable attempt of `test`.
    pub fn format_failure(
        &self,
        test: &TestCase,
        outputs: &OutputLog,
        options: FailureOptions,
    ) -> FailureReport {
        let title = self.format_test_title(test, &[]);
        let header = self.format_test_header(test, "  ", options.index);
        let mut lines = vec![self.styler.red(&header)];
        let mut annotations = Vec::new();

        for (attempt, result) in test.results.iter().enumerate() {
            let failure = self.format_result_failure(test, result, "    ", self.styler.enabled());
            if failure.tokens.is_empty() {
                continue;
            }

            let mut result_lines = Vec::new();
            if result.retry > 0 {
                result_lines.push(String::new());
                result_lines.push(
                    self.styler
                        .gray(&self.pad(&format!("    Retry #{}", result.retry), '-')),
                );
            }
            result_lines.extend(failure.tokens);

            if options.include_attachments {
                self.push_attachments(result, &mut result_lines);
            }

            let output = outputs.get(ResultKey {
                test: test.id,
                attempt,
            });
            if options.include_stdio && !output.is_empty() {
                let text: String = output
                    .iter()
                    .map(|chunk| match chunk.stream {
                        Stream::Stdout => chunk.text(),
                        Stream::Stderr => self.styler.red(&chunk.text()),
                    })
                    .collect();
                result_lines.push(String::new());
                result_lines.push(format!(
                    "{}\n\n{text}\n{}",
                    self.styler.gray(&self.pad("--- Test output", '-')),
                    self.pad("", '-')
                ));
            }

            let mut message = vec![header.clone()];
            message.extend(result_lines.iter().cloned());
            annotations.push(Annotation {
                title: title.clone(),
                message: message.join("\n"),
                location: failure.location,
            });
            lines.extend(result_lines);
        }

        lines.push(String::new());
        FailureReport {
            message: lines.join("\n"),
            annotations,
        }
    }

    fn push_attachments(&self, result: &TestResult, lines: &mut Vec<String>) {
        for (i, attachment) in result.attachments.iter().enumerate() {
            lines.push(String::new());
            lines.push(self.styler.cyan(&self.pad(
                &format!(
                    "    attachment #{}: {} ({})",
                    i + 1,
                    attachment.name,
                    attachment.content_type
                ),
                '-',
            )));
            if let Some(path) = &attachment.path {
                let relative = relative_path(self.cwd, path);
                lines.push(self.styler.cyan(&format!("    {relative}")));
                if attachment.name == "trace" {
                    lines.push(self.styler.cyan("    Usage:"));
                    lines.push(String::new());
                    lines.push(self.styler.cyan(&format!("        {TRACE_VIEWER} {relative}")));
                    lines.push(String::new());
                }
            } else if attachment.is_text()
                && let Some(body) = &attachment.body
            {
                let mut text = String::from_utf8_lossy(body).into_owned();
                if text.chars().count() > MAX_INLINE_ATTACHMENT {
                    text = text.chars().take(MAX_INLINE_ATTACHMENT).collect();
                    text.push_str("...");
                }
                lines.push(self.styler.cyan(&format!("    {text}")));
            }
            lines.push(self.styler.cyan(&self.pad("   ", '-')));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use super::*;
    use crate::models::{Attachment, ChunkData, OutputChunk, TestError, TestStatus};
    use crate::report::{PlainCodeFrame, V8FrameParser};
    use crate::style::Styler;

    fn with_formatter(check: impl FnOnce(&Formatter<'_>)) {
        let (parser, frame) = (V8FrameParser, PlainCodeFrame);
        let f = Formatter {
            styler: Styler::plain(),
            root_dir: Path::new("/repo"),
            cwd: Path::new("/repo"),
            frame_parser: &parser,
            code_frame: &frame,
        };
        check(&f);
    }

    fn sample_test() -> TestCase {
        let mut test = TestCase::new(
            "logs in",
            Location {
                file: PathBuf::from("/repo/tests/login.spec.ts"),
                line: 12,
                column: 5,
            },
        );
        test.titles.insert(0, "auth".into());
        test.project = Some("chromium".into());
        test
    }

    fn failed(retry: usize, message: &str) -> TestResult {
        TestResult {
            status: TestStatus::Failed,
            error: Some(TestError::Plain {
                message: message.into(),
            }),
            ..TestResult::new(retry)
        }
    }

    #[test]
    fn title_includes_project_location_and_steps() {
        with_formatter(|f| {
            let test = sample_test();
            assert_eq!(
                f.format_test_title(&test, &[]),
                "[chromium] › tests/login.spec.ts:12:5 › auth › logs in"
            );
            assert_eq!(
                f.format_test_title(&test, &["fill form".into(), "submit".into()]),
                "[chromium] › tests/login.spec.ts:12:5 › auth › logs in › fill form › submit"
            );
        });
    }

    #[test]
    fn header_is_padded_to_banner_width() {
        with_formatter(|f| {
            let header = f.format_test_header(&sample_test(), "  ", Some(3));
            assert!(header.starts_with("  3) [chromium] › tests/login.spec.ts:12:5"));
            assert_eq!(header.chars().count(), crate::report::BANNER_WIDTH);
            assert!(header.ends_with("=="));
        });
    }

    #[test]
    fn only_reportable_attempts_are_rendered() {
        with_formatter(|f| {
            let mut test = sample_test();
            test.results = vec![
                TestResult {
                    status: TestStatus::Failed,
                    ..TestResult::new(0)
                },
                failed(1, "second try broke"),
            ];
            let report = f.format_failure(&test, &OutputLog::new(), FailureOptions::default());
            assert_eq!(report.message.matches("Retry #1").count(), 1);
            assert_eq!(report.message.matches("second try broke").count(), 1);
            assert_eq!(report.annotations.len(), 1);
            assert!(report.annotations[0].message.contains("second try broke"));
            assert!(report.message.ends_with('\n'));
        });
    }

    #[test]
    fn attachments_render_paths_hints_and_text() {
        with_formatter(|f| {
            let mut test = sample_test();
            let mut result = failed(0, "boom");
            result.attachments = vec![
                Attachment {
                    name: "trace".into(),
                    content_type: "application/zip".into(),
                    path: Some(PathBuf::from("/repo/out/trace.zip")),
                    body: None,
                },
                Attachment {
                    name: "log".into(),
                    content_type: "text/plain".into(),
                    path: None,
                    body: Some("x".repeat(400).into_bytes()),
                },
                Attachment {
                    name: "screenshot".into(),
                    content_type: "image/png".into(),
                    path: None,
                    body: Some(vec![0x89, 0x50]),
                },
            ];
            test.results = vec![result];
            let report = f.format_failure(&test, &OutputLog::new(), FailureOptions::default());
            let message = &report.message;
            assert!(message.contains("    attachment #1: trace (application/zip) ---"));
            assert!(message.contains("\n    out/trace.zip\n"));
            assert!(message.contains("npx playwright show-trace out/trace.zip"));
            assert!(message.contains(&format!("    {}...", "x".repeat(300))));
            assert!(!message.contains(&"x".repeat(301)));
            assert!(message.contains("attachment #3: screenshot (image/png)"));

            let hidden = f.format_failure(
                &test,
                &OutputLog::new(),
                FailureOptions {
                    include_attachments: false,
                    ..FailureOptions::default()
                },
            );
            assert!(!hidden.message.contains("attachment #"));
        });
    }

    #[test]
    fn stdio_is_included_on_request() {
        with_formatter(|f| {
            let mut test = sample_test();
            test.results = vec![failed(0, "boom")];
            let mut outputs = OutputLog::new();
            let key = ResultKey {
                test: test.id,
                attempt: 0,
            };
            outputs.append(
                key,
                OutputChunk {
                    stream: Stream::Stdout,
                    data: ChunkData::Text("hello \x1b[1mbold\x1b[0m\n".into()),
                },
            );
            outputs.append(
                key,
                OutputChunk {
                    stream: Stream::Stderr,
                    data: ChunkData::Bytes(b"oops\n".to_vec()),
                },
            );

            let without = f.format_failure(&test, &outputs, FailureOptions::default());
            assert!(!without.message.contains("Test output"));

            let with = f.format_failure(
                &test,
                &outputs,
                FailureOptions {
                    include_stdio: true,
                    ..FailureOptions::default()
                },
            );
            assert!(with.message.contains("--- Test output ---"));
            assert!(with.message.contains("hello \x1b[1mbold\x1b[0m\noops\n"));
        });
    }
}
