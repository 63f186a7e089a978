use std::path::{Path, PathBuf};

use tracing::debug;

use super::{Formatter, prepare_error_stack, relative_path};
use crate::error::ReportError;
use crate::models::{Location, TestError};

/// A rendered error and the source location it was traced to, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDetails {
    pub message: String,
    pub location: Option<Location>,
}

impl Formatter<'_> {
    /// Render `error` as a block starting with an empty line.
    ///
    /// When the stack points at a readable source file a code frame is
    /// included. `exclude_file` suppresses the `at path:line` marker when the
    /// caller already shows that file.
    pub fn format_error(
        &self,
        error: &TestError,
        highlight: bool,
        exclude_file: Option<&Path>,
    ) -> ErrorDetails {
        let mut tokens = vec![String::new()];
        let mut location = None;

        match error {
            TestError::Stack { stack, .. } if !stack.is_empty() => {
                let parsed = prepare_error_stack(stack, self.cwd, self.frame_parser);
                tokens.push(parsed.message);
                if let Some(loc) = &parsed.location {
                    match self.code_frame_for(loc, highlight) {
                        Ok((real_file, frame)) => {
                            let excluded = exclude_file
                                .and_then(|f| std::fs::canonicalize(f).ok())
                                .is_some_and(|f| f == real_file);
                            if !excluded {
                                tokens.push(String::new());
                                tokens.push(format!(
                                    "{}{}:{}",
                                    self.styler.gray("    at "),
                                    relative_path(self.root_dir, &loc.file),
                                    loc.line
                                ));
                            }
                            tokens.push(String::new());
                            tokens.push(frame);
                        }
                        Err(e) => debug!(error = %e, location = %loc, "omitting code frame"),
                    }
                }
                tokens.push(String::new());
                tokens.push(self.styler.dim(&parsed.stack_lines.join("\n")));
                location = parsed.location;
            }
            TestError::Stack { message, .. } | TestError::Plain { message } => {
                tokens.push(message.clone());
            }
            TestError::Opaque { value } => tokens.push(value.clone()),
        }

        ErrorDetails {
            message: tokens.join("\n"),
            location,
        }
    }

    /// Read the symlink-resolved source behind `location` and render a frame for it.
    fn code_frame_for(
        &self,
        location: &Location,
        highlight: bool,
    ) -> Result<(PathBuf, String), ReportError> {
        let read_err = |source| ReportError::SourceRead {
            path: location.file.clone(),
            source,
        };
        let real_file = std::fs::canonicalize(&location.file).map_err(read_err)?;
        let source = std::fs::read_to_string(&real_file).map_err(read_err)?;
        let frame = self.code_frame.render(&source, location, highlight)?;
        Ok((real_file, frame))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{PlainCodeFrame, V8FrameParser};
    use crate::style::Styler;

    fn formatter<'a>(
        root: &'a Path,
        parser: &'a V8FrameParser,
        frame: &'a PlainCodeFrame,
    ) -> Formatter<'a> {
        Formatter {
            styler: Styler::plain(),
            root_dir: root,
            cwd: root,
            frame_parser: parser,
            code_frame: frame,
        }
    }

    #[test]
    fn stack_with_readable_source_gets_a_frame() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("math.spec.js");
        std::fs::write(&file, "test('adds', () => {\n  expect(1 + 1).toBe(3);\n});\n").unwrap();
        let stack = format!("Error: nope\n    at Object.<anonymous> ({}:2:17)", file.display());

        let (parser, frame) = (V8FrameParser, PlainCodeFrame);
        let f = formatter(dir.path(), &parser, &frame);
        let details = f.format_error(
            &TestError::Stack {
                message: "Error: nope".into(),
                stack,
            },
            false,
            None,
        );

        assert!(details.message.starts_with("\nError: nope\n"));
        assert!(details.message.contains("    at math.spec.js:2"));
        assert!(details.message.contains("> 2 |   expect(1 + 1).toBe(3);"));
        assert!(details.message.ends_with(&format!("    at Object.<anonymous> ({}:2:17)", file.display())));
        assert_eq!(details.location.map(|l| l.line), Some(2));
    }

    #[test]
    fn excluded_file_drops_the_at_marker_but_keeps_the_frame() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.spec.js");
        std::fs::write(&file, "one\ntwo\n").unwrap();
        let stack = format!("Error: x\n    at {}:1:1", file.display());

        let (parser, frame) = (V8FrameParser, PlainCodeFrame);
        let f = formatter(dir.path(), &parser, &frame);
        let details = f.format_error(
            &TestError::Stack {
                message: "Error: x".into(),
                stack,
            },
            false,
            Some(file.as_path()),
        );
        assert!(!details.message.contains("    at a.spec.js"));
        assert!(details.message.contains("> 1 | one"));
    }

    #[test]
    fn missing_source_keeps_message_and_stack() {
        let (parser, frame) = (V8FrameParser, PlainCodeFrame);
        let root = Path::new("/nonexistent-root");
        let f = formatter(root, &parser, &frame);
        let details = f.format_error(
            &TestError::Stack {
                message: "Error: gone".into(),
                stack: "Error: gone\n    at /nonexistent-root/x.js:4:2".into(),
            },
            false,
            None,
        );
        assert_eq!(details.message, "\nError: gone\n\n    at /nonexistent-root/x.js:4:2");
        assert_eq!(details.location.map(|l| l.column), Some(2));
    }

    #[test]
    fn plain_and_opaque_errors() {
        let (parser, frame) = (V8FrameParser, PlainCodeFrame);
        let f = formatter(Path::new("/"), &parser, &frame);

        let plain = f.format_error(&TestError::Plain { message: "bad".into() }, false, None);
        assert_eq!(plain.message, "\nbad");
        assert!(plain.location.is_none());

        let opaque = f.format_error(&TestError::Opaque { value: "42".into() }, false, None);
        assert_eq!(opaque.message, "\n42");

        let no_stack = f.format_error(
            &TestError::Stack {
                message: "only message".into(),
                stack: String::new(),
            },
            false,
            None,
        );
        assert_eq!(no_stack.message, "\nonly message");
    }
}
