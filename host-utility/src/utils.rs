use colored::Colorize;
use std::time::Duration;

use crate::constants::{THEME, THEME_RGB};

/// Calculate terminal display width, treating emojis as 2 cells wide
///
/// Terminals typically render emojis as 2 cells wide regardless of Unicode
/// Standard Annex #11 width properties, so we use a terminal-specific calculation.
fn terminal_width(s: &str) -> usize {
    use unicode_width::UnicodeWidthChar;
    s.chars()
        .map(|c| {
            if c.is_ascii() {
                1
            } else {
                let w = UnicodeWidthChar::width(c).unwrap_or(0);
                if w > 0 { 2 } else { 0 }
            }
        })
        .sum()
}

/// Print a styled title bar with a theme-colored separator matching the title width
pub fn print_title_bar(title: &str) {
    println!("{}", title.bold().bright_white());
    let separator: String = "─".repeat(terminal_width(title));
    println!("{}", separator.truecolor(THEME.0, THEME.1, THEME.2));
}

/// Print a subdued subtitle bar with gray separator matching the title width
pub fn print_subtitle_bar(title: &str) {
    println!("{}", title.white());
    let separator: String = "─".repeat(terminal_width(title));
    println!("{}", separator.dimmed());
}

/// Display a success message
pub fn success(message: &str) {
    if message.is_empty() {
        println!("  {}", "✓".green());
    } else {
        println!("  {} {}", "✓".green(), message);
    }
}

/// Display a failure line
pub fn failure(message: &str) {
    println!("  {} {}", "✗".red(), message);
}

/// Display a warning message
pub fn warning(message: &str) {
    println!("  {} {}", "⚠".bold().yellow(), message);
}

/// Display an info message
pub fn info(message: &str) {
    println!("  • {message}");
}

/// Render config for inquire prompts, indented to line up with `info`/`success`
pub fn create_theme() -> inquire::ui::RenderConfig<'static> {
    inquire::ui::RenderConfig {
        prompt_prefix: inquire::ui::Styled::new("  ?").with_fg(THEME_RGB),
        answered_prompt_prefix: inquire::ui::Styled::new("  ✓").with_fg(THEME_RGB),
        answer: inquire::ui::StyleSheet::new().with_fg(THEME_RGB),
        help_message: inquire::ui::StyleSheet::new().with_fg(THEME_RGB),
        ..Default::default()
    }
}

/// Create a ureq HTTP agent with the specified timeout
pub fn create_http_agent(timeout_secs: u64) -> ureq::Agent {
    let config = ureq::Agent::config_builder()
        .timeout_global(Some(Duration::from_secs(timeout_secs)))
        .build();
    config.into()
}

/// Human-readable byte count
pub fn format_size(bytes: usize) -> String {
    const UNITS: [&str; 3] = ["B", "KiB", "MiB"];
    let mut value = bytes;
    let mut unit = 0;
    while value >= 1024 && unit < UNITS.len() - 1 {
        value /= 1024;
        unit += 1;
    }
    format!("{value} {}", UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_width_counts_emoji_double() {
        assert_eq!(terminal_width("PIT"), 3);
        assert_eq!(terminal_width("📷 PIT"), 6);
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(2048), "2 KiB");
        assert_eq!(format_size(3 * 1024 * 1024), "3 MiB");
    }
}
