use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const TICK_INTERVAL: Duration = Duration::from_millis(120);
const TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}";

/// Terminal progress over the completion requests of a run.
///
/// The spinner ticks on its own until [`Progress::finish`] is called or the
/// value is dropped.
pub(crate) struct Progress {
    bar: ProgressBar,
}

impl Progress {
    /// Creates a bar for `total` steps; hidden when `visible` is false.
    pub(crate) fn new(total: u64, visible: bool) -> Self {
        if !visible {
            return Self {
                bar: ProgressBar::hidden(),
            };
        }

        let bar = ProgressBar::new(total);
        let style = ProgressStyle::with_template(TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        bar.set_style(style);
        bar.enable_steady_tick(TICK_INTERVAL);

        Self { bar }
    }

    /// Updates the message shown next to the bar.
    pub(crate) fn set_message(&self, message: impl Into<String>) {
        self.bar.set_message(message.into());
    }

    /// Advances the bar by one step.
    pub(crate) fn advance(&self) {
        self.bar.inc(1);
    }

    /// Returns the number of completed steps.
    pub(crate) fn position(&self) -> u64 {
        self.bar.position()
    }

    /// Stops the spinner and clears the bar.
    pub(crate) fn finish(&self) {
        self.bar.finish_and_clear();
    }

    /// Runs `f` with the bar hidden so printed lines don't interleave with it.
    pub(crate) fn suspend<R>(&self, f: impl FnOnce() -> R) -> R {
        self.bar.suspend(f)
    }
}

impl Drop for Progress {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.abandon();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_progress_counts() {
        let progress = Progress::new(3, false);
        progress.advance();
        progress.advance();
        progress.set_message("summarizing");

        assert_eq!(progress.position(), 2);
        progress.finish();
    }

    #[test]
    fn test_suspend_returns_value() {
        let progress = Progress::new(1, false);
        assert_eq!(progress.suspend(|| 42), 42);
    }
}
