use anyhow::Result;
use colored::Colorize;
use inquire::Confirm;

use crate::utils::{create_theme, print_subtitle_bar};

/// Destructive changes awaiting operator approval
pub struct Mutations {
    pub target: String,
    pub actions: Vec<String>,
}

/// Check if we're in a non-interactive environment
pub fn is_non_interactive() -> bool {
    use std::io::IsTerminal;
    !std::io::stdin().is_terminal()
}

/// Show the mutations and ask; the default answer is no
///
/// Refuses to run without a terminal: destructive actions are never
/// auto-confirmed.
pub fn confirm_mutations(mutations: &Mutations) -> Result<bool> {
    if is_non_interactive() {
        anyhow::bail!(
            "Running in non-interactive environment (no TTY detected). \
             Destructive actions need an operator; use --dry-run to preview."
        );
    }

    println!();
    print_subtitle_bar(&format!(
        "The following will be permanently removed from {}:",
        mutations.target
    ));
    for action in &mutations.actions {
        println!("  • {action}");
    }
    println!();

    let answer = Confirm::new("Proceed?")
        .with_default(false)
        .with_help_message("This cannot be undone")
        .with_render_config(create_theme())
        .prompt();

    match answer {
        Ok(true) => Ok(true),
        Ok(false) => {
            println!("  {} {}", "⚠".yellow(), "Cancelled".dimmed());
            Ok(false)
        }
        // Ctrl+C / Esc
        Err(_) => Ok(false),
    }
}
