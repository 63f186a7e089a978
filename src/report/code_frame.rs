use crate::error::ReportError;
use crate::models::Location;
use crate::style::Styler;

const LINES_ABOVE: u32 = 2;
const LINES_BELOW: u32 = 3;

/// Renders a short excerpt of `source` around `location`.
pub trait CodeFrameRenderer {
    fn render(&self, source: &str, location: &Location, highlight: bool)
    -> Result<String, ReportError>;
}

/// Gutter-numbered excerpt with a `>` marker on the failing line and a caret
/// under the failing column:
///
/// ```text
///   7 |   const a = 1;
/// > 8 |   expect(a).toBe(2);
///     |           ^
///   9 | });
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainCodeFrame;

impl CodeFrameRenderer for PlainCodeFrame {
    fn render(
        &self,
        source: &str,
        location: &Location,
        highlight: bool,
    ) -> Result<String, ReportError> {
        let lines: Vec<&str> = source.lines().collect();
        let total = lines.len();
        if location.line == 0 || location.line as usize > total {
            return Err(ReportError::LineOutOfRange {
                line: location.line,
                total,
            });
        }

        let styler = Styler::new(highlight);
        let start = location.line.saturating_sub(LINES_ABOVE).max(1);
        let end = (location.line + LINES_BELOW).min(total as u32);
        let width = end.to_string().len();

        let mut out = Vec::new();
        for number in start..=end {
            let text = lines[number as usize - 1];
            let gutter = styler.gray(&format!(" {number:>width$} |"));
            let code = if text.is_empty() {
                String::new()
            } else {
                format!(" {text}")
            };
            if number == location.line {
                out.push(format!("{}{gutter}{code}", styler.red(">")));
                let blank = " ".repeat(width);
                let column = (location.column.saturating_sub(1) as usize).min(text.chars().count());
                let offset = " ".repeat(column);
                out.push(format!(
                    " {} {offset}{}",
                    styler.gray(&format!(" {blank} |")),
                    styler.red("^")
                ));
            } else {
                out.push(format!(" {gutter}{code}"));
            }
        }
        Ok(out.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn at(line: u32, column: u32) -> Location {
        Location {
            file: PathBuf::from("/x.js"),
            line,
            column,
        }
    }

    const SOURCE: &str = "one\ntwo\nthree\nfour\nfive\nsix\nseven\n";

    #[test]
    fn marks_line_and_column() {
        let frame = PlainCodeFrame.render(SOURCE, &at(3, 2), false).unwrap();
        let expected = [
            "  1 | one",
            "  2 | two",
            "> 3 | three",
            "    |  ^",
            "  4 | four",
            "  5 | five",
            "  6 | six",
        ];
        assert_eq!(frame, expected.join("\n"));
    }

    #[test]
    fn clamps_to_file_bounds() {
        let frame = PlainCodeFrame.render(SOURCE, &at(7, 1), false).unwrap();
        let first = frame.lines().next().unwrap();
        assert!(first.ends_with("5 | five"));
        assert_eq!(frame.lines().last(), Some("    | ^"));
    }

    #[test]
    fn caret_stays_within_the_line() {
        let frame = PlainCodeFrame.render(SOURCE, &at(3, 4_000_000_000), false).unwrap();
        assert_eq!(frame.lines().nth(3), Some("    |      ^"));
    }

    #[test]
    fn out_of_range_line_is_an_error() {
        assert!(PlainCodeFrame.render(SOURCE, &at(40, 1), false).is_err());
        assert!(PlainCodeFrame.render(SOURCE, &at(0, 1), false).is_err());
    }
}
