use std::sync::LazyLock;

use regex::Regex;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Resets every SGR attribute so styling cannot leak past a truncated line.
pub const RESET: &str = "\x1b[0m";

/// Matches CSI sequences (`ESC [ ... final`) and OSC sequences terminated by BEL,
/// introduced either by ESC or by the single-byte CSI (U+009B).
static ANSI_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"[\x1b\x{9b}][\[\]()#;?]*",
        r"(?:(?:(?:[a-zA-Z0-9]*(?:;[-a-zA-Z0-9/#&.:=?%@~_]*)*)?\x07)",
        r"|(?:(?:[0-9]{1,4}(?:;[0-9]{0,4})*)?[0-9A-PR-TZcf-ntqry=><~]))",
    ))
    .expect("ANSI escape pattern is valid")
});

/// Strip ANSI escape sequences from a string.
pub fn strip_ansi_escapes(s: &str) -> String {
    ANSI_RE.replace_all(s, "").into_owned()
}

/// Terminal columns taken by `s`, ignoring escape sequences.
pub fn visible_len(s: &str) -> usize {
    strip_ansi_escapes(s).width()
}

/// Truncate `line` so its visible part fits in `width` columns, keeping room for
/// `suffix`. Escape sequences before the cut are preserved and a reset code is
/// appended whenever the line is shortened.
pub fn fit_to_screen(line: &str, width: isize, suffix: Option<&str>) -> String {
    let reserved = suffix.map(visible_len).unwrap_or(0) as isize;
    let target = width - reserved;
    if visible_len(line) as isize <= target {
        return line.to_string();
    }

    let mut out = String::new();
    let mut used = 0isize;
    let mut pos = 0;
    let escapes = ANSI_RE.find_iter(line).map(Some).chain(std::iter::once(None));
    'walk: for escape in escapes {
        let text_end = escape.map_or(line.len(), |m| m.start());
        for ch in line[pos..text_end].chars() {
            let w = ch.width().unwrap_or(0) as isize;
            if used + w > target {
                break 'walk;
            }
            used += w;
            out.push(ch);
        }
        // Escapes past the cut are dropped.
        let Some(m) = escape else { break };
        if used >= target {
            break;
        }
        out.push_str(m.as_str());
        pos = m.end();
    }
    out.push_str(RESET);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: &str = "\x1b[31m";

    #[test]
    fn strips_csi_and_osc_sequences() {
        let s = format!("{RED}fail{RESET} \x1b]8;;https://example.com\x07link\x1b]8;;\x07");
        assert_eq!(strip_ansi_escapes(&s), "fail link");
    }

    #[test]
    fn strip_is_idempotent() {
        let s = format!("{RED}a\x1b[1;2mb{RESET}c");
        let once = strip_ansi_escapes(&s);
        assert_eq!(strip_ansi_escapes(&once), once);
        assert!(!once.contains('\x1b'));
    }

    #[test]
    fn strip_is_repeatable_across_calls() {
        let s = format!("{RED}x{RESET}");
        for _ in 0..3 {
            assert_eq!(strip_ansi_escapes(&s), "x");
        }
    }

    #[test]
    fn fitting_line_is_returned_unchanged() {
        let s = format!("{RED}short{RESET}");
        assert_eq!(fit_to_screen(&s, 5, None), s);
        assert_eq!(fit_to_screen("abc", 10, None), "abc");
    }

    #[test]
    fn long_line_is_cut_at_visible_width() {
        let s = format!("{RED}abcdef{RESET}ghij");
        let fitted = fit_to_screen(&s, 4, None);
        assert_eq!(fitted, format!("{RED}abcd{RESET}"));
        assert_eq!(visible_len(&fitted), 4);
        assert!(fitted.ends_with(RESET));
    }

    #[test]
    fn escapes_inside_the_kept_prefix_are_preserved() {
        let s = format!("ab{RED}cd{RESET}efgh");
        let fitted = fit_to_screen(&s, 6, None);
        assert_eq!(strip_ansi_escapes(&fitted), "abcdef");
        assert!(fitted.starts_with(&format!("ab{RED}cd{RESET}")));
    }

    #[test]
    fn suffix_width_is_reserved() {
        let fitted = fit_to_screen("0123456789", 8, Some(&format!("{RED}xyz{RESET}")));
        assert_eq!(strip_ansi_escapes(&fitted), "01234");
    }

    #[test]
    fn non_positive_width_keeps_only_reset() {
        assert_eq!(fit_to_screen("hello", 0, None), RESET);
        assert_eq!(fit_to_screen("hello", -3, None), RESET);
    }

    #[test]
    fn wide_glyphs_count_as_two_columns() {
        assert_eq!(visible_len("日本語"), 6);
        assert_eq!(fit_to_screen("日本語です", 5, None), format!("日本{RESET}"));
        assert_eq!(fit_to_screen("日本語", 6, None), "日本語");
    }

    #[test]
    fn multibyte_text_is_cut_on_char_boundaries() {
        let fitted = fit_to_screen("✔✔✔✔✔", 2, None);
        assert_eq!(fitted, format!("✔✔{RESET}"));
    }
}
