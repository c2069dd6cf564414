// Spinner-wrapped steps for the sequential install
//
// Each remote step shows `  ⠋ description` while it runs and is replaced by
// a `  ✓ description` line once it succeeds. Failures clear the spinner and
// propagate unchanged.

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};

use crate::constants::THEME_256;
use crate::utils;

/// Create a themed spinner that auto-ticks every 80ms
///
/// Call `.finish_and_clear()` when done.
pub fn create_spinner(message: &str) -> ProgressBar {
    use std::time::Duration;

    let spinner = ProgressBar::new_spinner();
    let template = format!("  {{spinner:.{THEME_256}}} {{msg}}");
    if let Ok(style) = ProgressStyle::default_spinner().template(&template) {
        spinner.set_style(
            style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
    }
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

/// Run one step under a spinner; the ✓ line carries `description`
pub fn run_step<F, R>(description: &str, f: F) -> Result<R>
where
    F: FnOnce() -> Result<R>,
{
    run_step_detail(description, || f().map(|value| (value, String::new())))
}

/// Like [`run_step`], with `detail` appended to the ✓ line when non-empty
pub fn run_step_detail<F, R>(description: &str, f: F) -> Result<R>
where
    F: FnOnce() -> Result<(R, String)>,
{
    let spinner = create_spinner(description);
    let result = f();
    spinner.finish_and_clear();
    let (value, detail) = result?;
    if detail.is_empty() {
        utils::success(description);
    } else {
        utils::success(&format!("{description} ({detail})"));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_step_propagates_success() {
        let result = run_step("test desc", || Ok(42));
        assert_eq!(result.unwrap(), 42);
    }

    #[test]
    fn test_run_step_propagates_error() {
        let result: Result<()> = run_step("test desc", || anyhow::bail!("camera unreachable"));
        assert_eq!(result.unwrap_err().to_string(), "camera unreachable");
    }

    #[test]
    fn test_run_step_detail_propagates_value() {
        let result = run_step_detail("desc", || Ok((7, "1 MiB".to_string())));
        assert_eq!(result.unwrap(), 7);
    }
}
