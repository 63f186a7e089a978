use serde::{Deserialize, Serialize};

use crate::style::Styler;

/// Final status of a single attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TestStatus {
    #[default]
    Passed,
    Failed,
    TimedOut,
    Skipped,
    Interrupted,
}

impl TestStatus {
    pub fn icon(&self) -> &'static str {
        match self {
            TestStatus::Passed => "✔",
            TestStatus::Failed | TestStatus::TimedOut => "✘",
            TestStatus::Skipped => "⊘",
            TestStatus::Interrupted => "◌",
        }
    }
}

/// Classification of a test across all of its attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Expected,
    Unexpected,
    Flaky,
    Skipped,
}

impl Outcome {
    pub fn paint(&self, styler: &Styler, text: &str) -> String {
        match self {
            Outcome::Expected => styler.green(text),
            Outcome::Unexpected => styler.red(text),
            Outcome::Flaky | Outcome::Skipped => styler.yellow(text),
        }
    }
}

/// Overall status of a run, reported by the execution engine at the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    #[default]
    Passed,
    Failed,
    TimedOut,
    Interrupted,
}
