//! Terminal capability detection and utilities

use owo_colors::{OwoColorize, colors::css};

/// Widest rule printed above target banners.
const MAX_RULE_WIDTH: usize = 60;

/// Detects whether colored output should be enabled
pub fn supports_color() -> bool {
    supports_color::on(supports_color::Stream::Stdout).is_some()
}

/// Detects terminal width, returning None if not available
pub fn terminal_width() -> Option<u16> {
    terminal_size::terminal_size().map(|(w, _)| w.0)
}

/// A horizontal rule that fits the terminal
pub fn rule() -> String {
    let width = terminal_width().map_or(MAX_RULE_WIDTH, |w| usize::from(w).min(MAX_RULE_WIDTH));
    "=".repeat(width)
}

/// Prints a banner introducing a target's output
pub fn banner(title: &str) {
    let rule = rule();
    println!("\n{rule}");
    println!("   {}", title.info());
    println!("{rule}");
}

/// Extension trait for colorizing output
pub trait Colorize {
    /// Color as success (green)
    fn success(&self) -> String;
    /// Color as warning (amber)
    fn warning(&self) -> String;
    /// Color as info (blue)
    fn info(&self) -> String;
    /// Dim the text
    fn dim(&self) -> String;
}

fn paint(text: &str, style: impl FnOnce(&str) -> String) -> String {
    if supports_color() {
        style(text)
    } else {
        text.to_string()
    }
}

impl<T: AsRef<str> + ?Sized> Colorize for T {
    fn success(&self) -> String {
        paint(self.as_ref(), |t| t.fg::<css::Green>().to_string())
    }

    fn warning(&self) -> String {
        paint(self.as_ref(), |t| t.fg::<css::Orange>().to_string())
    }

    fn info(&self) -> String {
        paint(self.as_ref(), |t| t.fg::<css::LightBlue>().to_string())
    }

    fn dim(&self) -> String {
        paint(self.as_ref(), |t| t.dimmed().to_string())
    }
}
