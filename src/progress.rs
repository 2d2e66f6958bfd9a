//! Progress bar and logging utilities.
//!
//! Bars and spinners for store loads and ingestion. In log-only mode they are
//! hidden and progress is written as plain lines for tail-friendly output.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

/// Format duration in human-readable format
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        let mins = secs / 60.0;
        format!("{:.1}m", mins)
    }
}

/// Progress display settings for one CLI invocation.
#[derive(Debug, Clone, Copy, Default)]
pub struct Progress {
    pub log_only: bool,
}

impl Progress {
    pub fn new(log_only: bool) -> Self {
        Self { log_only }
    }

    /// Create a progress bar with consistent styling.
    pub fn bar(&self, len: u64, msg: &str) -> ProgressBar {
        let pb = ProgressBar::new(len);
        if self.log_only {
            pb.set_draw_target(ProgressDrawTarget::hidden());
        } else if let Ok(style) = ProgressStyle::default_bar()
            .template("{msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec}, ETA: {eta})")
        {
            pb.set_style(style.progress_chars("=> "));
        }
        pb.set_message(msg.to_string());
        pb
    }

    /// Create a spinner for indeterminate progress.
    pub fn spinner(&self, msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        if self.log_only {
            pb.set_draw_target(ProgressDrawTarget::hidden());
        } else {
            if let Ok(style) = ProgressStyle::default_spinner().template("{msg} {spinner} [{elapsed_precise}]") {
                pb.set_style(style);
            }
            pb.enable_steady_tick(Duration::from_millis(100));
        }
        pb.set_message(msg.to_string());
        pb
    }

    /// Log progress every `interval` items, only in log-only mode.
    pub fn log(&self, phase: &str, current: u64, total: u64, interval: u64) {
        if let Some(line) = self.log_line(phase, current, total, interval) {
            eprintln!("{}", line);
        }
    }

    fn log_line(&self, phase: &str, current: u64, total: u64, interval: u64) -> Option<String> {
        if !self.log_only || total == 0 {
            return None;
        }
        if current % interval.max(1) == 0 || current == total {
            let pct = 100.0 * current as f64 / total as f64;
            Some(format!("[{}] {}/{} ({:.1}%)", phase, current, total, pct))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.5s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1.5m");
    }

    #[test]
    fn test_log_line_only_in_log_only_mode() {
        assert!(Progress::new(false).log_line("ingest", 10, 10, 5).is_none());

        let progress = Progress::new(true);
        assert_eq!(
            progress.log_line("ingest", 5, 20, 5).as_deref(),
            Some("[ingest] 5/20 (25.0%)")
        );
        assert!(progress.log_line("ingest", 6, 20, 5).is_none());
        assert!(progress.log_line("ingest", 7, 7, 5).is_some());
        assert!(progress.log_line("ingest", 0, 0, 0).is_none());
    }

    #[test]
    fn test_hidden_bar_still_counts() {
        let pb = Progress::new(true).bar(3, "Writing");
        pb.inc(2);
        assert_eq!(pb.position(), 2);
        pb.finish_and_clear();
    }
}
