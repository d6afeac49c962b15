//! Terminal progress bars for layout stages

use crate::algorithm::regeneration::ProgressSink;
use crate::io::configuration::PROGRESS_BAR_WIDTH;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::sync::LazyLock;

static STAGE_STYLE: LazyLock<ProgressStyle> = LazyLock::new(|| {
    ProgressStyle::default_bar()
        .template(&format!(
            "{{prefix:>8}} [{{bar:{PROGRESS_BAR_WIDTH}.cyan/blue}}] {{pos}}/{{len}} {{msg}}"
        ))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏ ")
});

/// One bar per running stage, stacked under a shared [`MultiProgress`]
///
/// Hidden managers accept every call and draw nothing, so callers never branch
/// on quiet mode.
pub struct ProgressManager {
    multi_progress: MultiProgress,
    stage_bar: Option<ProgressBar>,
    hidden: bool,
}

impl Default for ProgressManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressManager {
    /// Create a manager drawing to stderr
    pub fn new() -> Self {
        Self {
            multi_progress: MultiProgress::new(),
            stage_bar: None,
            hidden: false,
        }
    }

    /// Create a manager that draws nothing
    pub fn hidden() -> Self {
        Self {
            multi_progress: MultiProgress::with_draw_target(indicatif::ProgressDrawTarget::hidden()),
            stage_bar: None,
            hidden: true,
        }
    }

    /// Whether bars are suppressed
    pub const fn is_hidden(&self) -> bool {
        self.hidden
    }

    /// Position and length of the running stage
    pub fn position(&self) -> Option<(u64, u64)> {
        self.stage_bar
            .as_ref()
            .map(|bar| (bar.position(), bar.length().unwrap_or(0)))
    }

    /// Set the trailing message of the running stage
    pub fn set_message(&self, message: impl Into<String>) {
        if let Some(bar) = &self.stage_bar {
            bar.set_message(message.into());
        }
    }

    /// Clean up all progress displays
    pub fn clear(&self) {
        let _ = self.multi_progress.clear();
    }
}

impl ProgressSink for ProgressManager {
    fn begin(&mut self, stage: &str, total: usize) {
        self.finish();
        let bar = ProgressBar::new(total as u64);
        bar.set_style(STAGE_STYLE.clone());
        bar.set_prefix(stage.to_string());
        self.stage_bar = Some(self.multi_progress.add(bar));
    }

    fn advance(&mut self, steps: usize) {
        if let Some(bar) = &self.stage_bar {
            bar.inc(steps as u64);
        }
    }

    fn finish(&mut self) {
        if let Some(bar) = self.stage_bar.take() {
            bar.finish_and_clear();
            self.multi_progress.remove(&bar);
        }
    }
}
