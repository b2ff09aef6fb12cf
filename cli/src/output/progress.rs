//! Step spinners using indicatif

#![allow(clippy::expect_used)] // Templates are compile-time constants

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

const TICK: Duration = Duration::from_millis(100);

/// Spinner shown while a teardown step runs.
///
/// # Panics
///
/// Never in practice; the template is a constant.
#[must_use]
pub fn spinner(msg: &str) -> ProgressBar {
    let style = ProgressStyle::with_template("  {spinner:.cyan} {msg}")
        .expect("valid template")
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ");
    let pb = ProgressBar::new_spinner()
        .with_style(style)
        .with_message(msg.to_string());
    pb.enable_steady_tick(TICK);
    pb
}

/// Stop `pb` and leave `marker msg` as its final line.
pub fn finish_with(pb: &ProgressBar, marker: &str, msg: &str) {
    let style = ProgressStyle::with_template("  {prefix} {msg}").expect("valid template");
    pb.set_style(style);
    pb.set_prefix(marker.to_string());
    pb.finish_with_message(msg.to_string());
}
