use std::io::IsTerminal;

use crossterm::style::{Color, Stylize};
use serde::Deserialize;

/// When colour output should be produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    #[default]
    Auto,
    Always,
    Never,
}

/// Styling capability threaded through every formatting call.
///
/// A disabled styler returns its input untouched, so the same rendering code
/// produces plain text for pipes and files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Styler {
    enabled: bool,
}

impl Styler {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn plain() -> Self {
        Self::new(false)
    }

    /// Resolve a [`ColorMode`] against the environment. `NO_COLOR` wins over
    /// `FORCE_COLOR`, which wins over terminal detection.
    pub fn detect(mode: ColorMode) -> Self {
        let enabled = match mode {
            ColorMode::Always => true,
            ColorMode::Never => false,
            ColorMode::Auto => {
                if std::env::var_os("NO_COLOR").is_some() {
                    false
                } else if std::env::var("FORCE_COLOR").is_ok_and(|v| v != "0") {
                    true
                } else {
                    std::io::stdout().is_terminal()
                }
            }
        };
        Self::new(enabled)
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn red(&self, text: &str) -> String {
        self.fg(text, Color::Red)
    }

    pub fn yellow(&self, text: &str) -> String {
        self.fg(text, Color::Yellow)
    }

    pub fn green(&self, text: &str) -> String {
        self.fg(text, Color::Green)
    }

    pub fn gray(&self, text: &str) -> String {
        self.fg(text, Color::DarkGrey)
    }

    pub fn cyan(&self, text: &str) -> String {
        self.fg(text, Color::Cyan)
    }

    pub fn dim(&self, text: &str) -> String {
        if self.enabled {
            text.dim().to_string()
        } else {
            text.to_string()
        }
    }

    fn fg(&self, text: &str, color: Color) -> String {
        if self.enabled {
            text.with(color).to_string()
        } else {
            text.to_string()
        }
    }
}
