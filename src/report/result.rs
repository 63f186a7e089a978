use super::{Formatter, indent};
use crate::models::{Location, TestCase, TestResult, TestStatus};

/// Rendered lines for one attempt and the location its error was traced to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FailureDetails {
    pub tokens: Vec<String>,
    pub location: Option<Location>,
}

impl Formatter<'_> {
    /// Explain why `result` is worth reporting. Empty tokens mean there is
    /// nothing to say about this attempt.
    pub fn format_result_failure(
        &self,
        test: &TestCase,
        result: &TestResult,
        initial_indent: &str,
        highlight: bool,
    ) -> FailureDetails {
        let mut tokens = Vec::new();
        if result.status == TestStatus::TimedOut {
            tokens.push(String::new());
            tokens.push(indent(
                &self.styler.red(&format!(
                    "Timeout of {}ms exceeded.",
                    test.timeout.as_millis()
                )),
                initial_indent,
            ));
        }
        if result.status == TestStatus::Passed && test.expected_status == TestStatus::Failed {
            tokens.push(String::new());
            tokens.push(indent(
                &self.styler.red("Expected to fail, but passed."),
                initial_indent,
            ));
        }

        let mut location = None;
        if let Some(error) = &result.error {
            let details = self.format_error(error, highlight, Some(test.location.file.as_path()));
            tokens.push(indent(&details.message, initial_indent));
            location = details.location;
        }

        FailureDetails { tokens, location }
    }
}
