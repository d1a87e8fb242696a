//! Human-readable output formatting for the CLI surface.
//!
//! Every command also supports a `--json` mode (see [`crate::cli`]) that
//! bypasses these helpers entirely and prints the raw result value; these
//! are only reached on the human-readable path.

use std::fmt::Display;

use owo_colors::OwoColorize;

/// Print the application header.
pub fn header(version: &str) {
    println!("{} {}", "hl".bold(), version.dimmed());
    println!();
}

/// Print a labeled value.
pub fn field(label: &str, value: impl Display) {
    println!("  {:<12} {}", label.dimmed(), value);
}

/// Print a success line.
pub fn success(message: &str) {
    println!("  {} {}", "✓".green(), message);
}

/// Print a warning line.
pub fn warning(message: &str) {
    println!("  {} {}", "⚠".yellow(), message);
}

/// Print an error line. Matches the `Error: <message>` human-output policy.
pub fn error(message: &str) {
    eprintln!("{} {message}", "Error:".red());
}

/// Print a section header.
pub fn section(title: &str) {
    println!();
    println!("{}", title.bold());
}

/// Print a timestamped update line, used by `watch`'s streaming output.
pub fn update(timestamp: &str, coin: &str, message: &str) {
    println!("  {} {} {}", timestamp.dimmed(), coin.cyan(), message);
}

/// Print a timestamped error line from a watcher's `on_error` sink. Printing
/// it does not tear down the watcher.
pub fn watch_error(timestamp: &str, message: &str) {
    println!("  {} {} {}", timestamp.dimmed(), "error".red(), message);
}

/// Format a connected/disconnected indicator.
pub fn connection_indicator(connected: bool) -> String {
    if connected {
        format!("{}", "connected".green())
    } else {
        format!("{}", "disconnected".red())
    }
}

/// Format a present/absent cache-slot indicator with its age.
pub fn cache_slot_indicator(present: bool, age_ms: Option<i64>) -> String {
    match (present, age_ms) {
        (true, Some(age)) => format!("{} ({age}ms old)", "present".green()),
        (true, None) => format!("{}", "present".green()),
        (false, _) => format!("{}", "absent".dimmed()),
    }
}

/// Start a progress spinner, used while waiting for a detached daemon to
/// become ready.
pub fn spinner(message: &str) -> indicatif::ProgressBar {
    let pb = indicatif::ProgressBar::new_spinner();
    pb.set_style(
        indicatif::ProgressStyle::default_spinner()
            .template("  {spinner:.cyan} {msg}")
            .unwrap(),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(80));
    pb
}

/// Finish a spinner with success.
pub fn spinner_success(pb: &indicatif::ProgressBar, message: &str) {
    pb.finish_with_message(format!("{} {}", "✓".green(), message));
}

/// Finish a spinner with failure.
pub fn spinner_fail(pb: &indicatif::ProgressBar, message: &str) {
    pb.finish_with_message(format!("{} {}", "×".red(), message));
}

/// Format a highlighted value in cyan.
pub fn highlight(value: impl Display) -> String {
    format!("{}", value.to_string().cyan())
}

/// Format a dimmed/muted value.
pub fn muted(value: impl Display) -> String {
    format!("{}", value.to_string().dimmed())
}
