use std::collections::BTreeMap;
use std::time::Duration;

use super::{Formatter, format_duration};
use crate::config::SlowTestsConfig;
use crate::models::{Outcome, RunStatus, TestCase, TestTree};

/// Tests of one run grouped by outcome.
#[derive(Debug, Default)]
pub struct TestSummary<'a> {
    pub skipped: usize,
    pub expected: usize,
    /// Skipped tests that still recorded an error.
    pub skipped_with_error: Vec<&'a TestCase>,
    pub unexpected: Vec<&'a TestCase>,
    pub flaky: Vec<&'a TestCase>,
    /// `unexpected`, then `flaky`, then `skipped_with_error`.
    pub failures_to_print: Vec<&'a TestCase>,
}

pub fn generate_summary(suite: &TestTree) -> TestSummary<'_> {
    let mut summary = TestSummary::default();
    for test in suite.all_tests() {
        match test.outcome() {
            Outcome::Skipped => {
                summary.skipped += 1;
                if test.results.iter().any(|r| r.error.is_some()) {
                    summary.skipped_with_error.push(test);
                }
            }
            Outcome::Expected => summary.expected += 1,
            Outcome::Unexpected => summary.unexpected.push(test),
            Outcome::Flaky => summary.flaky.push(test),
        }
    }
    summary.failures_to_print = summary
        .unexpected
        .iter()
        .chain(&summary.flaky)
        .chain(&summary.skipped_with_error)
        .copied()
        .collect();
    summary
}

/// Files slower than the configured threshold, slowest first.
pub fn slow_files(
    durations: &BTreeMap<String, Duration>,
    config: Option<&SlowTestsConfig>,
) -> Vec<(String, Duration)> {
    let Some(config) = config else {
        return Vec::new();
    };
    let mut files: Vec<(String, Duration)> = durations
        .iter()
        .map(|(file, duration)| (file.clone(), *duration))
        .collect();
    files.sort_by(|a, b| b.1.cmp(&a.1));

    let max = if config.max == 0 { usize::MAX } else { config.max };
    let threshold = config.threshold();
    files
        .into_iter()
        .filter(|(_, duration)| *duration > threshold)
        .take(max)
        .collect()
}

impl Formatter<'_> {
    pub fn generate_summary_message(
        &self,
        summary: &TestSummary<'_>,
        elapsed: Duration,
        status: RunStatus,
        global_timeout: Duration,
    ) -> String {
        let mut tokens = Vec::new();
        if !summary.unexpected.is_empty() {
            tokens.push(self.styler.red(&format!("  {} failed", summary.unexpected.len())));
            for test in &summary.unexpected {
                tokens.push(self.styler.red(&self.format_test_header(test, "    ", None)));
            }
        }
        if !summary.flaky.is_empty() {
            tokens.push(self.styler.yellow(&format!("  {} flaky", summary.flaky.len())));
            for test in &summary.flaky {
                tokens.push(self.styler.yellow(&self.format_test_header(test, "    ", None)));
            }
        }
        if summary.skipped > 0 {
            tokens.push(self.styler.yellow(&format!("  {} skipped", summary.skipped)));
        }
        if summary.expected > 0 {
            tokens.push(format!(
                "{}{}",
                self.styler.green(&format!("  {} passed", summary.expected)),
                self.styler.dim(&format!(" ({})", format_duration(elapsed)))
            ));
        }
        if status == RunStatus::TimedOut {
            tokens.push(self.styler.red(&format!(
                "  Timed out waiting {}s for the entire test run",
                global_timeout.as_secs_f64()
            )));
        }
        tokens.join("\n")
    }
}
