//! Busy indicator shown while a model request is in flight

use std::future::Future;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

/// Run `future` with a spinner on the terminal, clearing it when done
pub async fn with_spinner<F, T>(message: &str, future: F) -> T
where
    F: Future<Output = T>,
{
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed}]")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ");
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));

    let result = future.await;
    pb.finish_and_clear();
    result
}
