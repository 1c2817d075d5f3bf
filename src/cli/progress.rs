//! Progress display for downloads and listing fetches
//!
//! Wraps indicatif with terminal detection: interactive sessions get a
//! byte-progress bar (or a spinner while waiting on listings), while
//! non-interactive ones fall back to occasional log lines so piped output
//! stays clean.

use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use crate::app::models::format_bytes;
use crate::constants::progress;

/// Whether interactive progress should be drawn at all
pub fn interactive(quiet: bool) -> bool {
    !quiet && atty::is(atty::Stream::Stderr)
}

/// Spinner shown while a listing request is in flight.
///
/// Returns `None` outside interactive sessions; callers just drop the
/// result when done.
pub fn listing_spinner(enabled: bool, message: &str) -> Option<ProgressBar> {
    if !enabled {
        return None;
    }
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .expect("spinner template is valid")
            .tick_strings(&["◐", "◓", "◑", "◒", " "]),
    );
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(progress::TICK_INTERVAL);
    Some(spinner)
}

/// Finish and erase a listing spinner
pub fn clear_spinner(spinner: Option<ProgressBar>) {
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
}

/// Byte-level progress for a streaming archive download
pub struct DownloadProgress {
    bar: Option<ProgressBar>,
    enabled: bool,
    last_logged: u64,
}

impl DownloadProgress {
    /// Create a progress reporter; `enabled` selects bar vs. log lines
    pub fn new(enabled: bool) -> Self {
        Self {
            bar: None,
            enabled,
            last_logged: 0,
        }
    }

    /// Record progress. The bar is created lazily on the first call so the
    /// total (when the server sent one) shapes the template.
    pub fn update(&mut self, received: u64, total: Option<u64>) {
        if !self.enabled {
            // Log roughly every 256 MiB to keep non-interactive output sane
            if received.saturating_sub(self.last_logged) >= 256 * 1024 * 1024 {
                self.last_logged = received;
                info!("Downloaded {} so far", format_bytes(received));
            }
            return;
        }

        let bar = self.bar.get_or_insert_with(|| match total {
            Some(len) => {
                let bar = ProgressBar::new(len);
                bar.set_style(
                    ProgressStyle::default_bar()
                        .template(
                            "{spinner:.green} [{bar:30.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})",
                        )
                        .expect("progress template is valid")
                        .progress_chars("=> "),
                );
                bar
            }
            None => {
                let bar = ProgressBar::new_spinner();
                bar.set_style(
                    ProgressStyle::default_spinner()
                        .template("{spinner:.green} {bytes} ({bytes_per_sec})")
                        .expect("spinner template is valid"),
                );
                bar
            }
        });
        bar.set_position(received);
    }

    /// Finish and clear the bar
    pub fn finish(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

impl Drop for DownloadProgress {
    fn drop(&mut self) {
        self.finish();
    }
}
