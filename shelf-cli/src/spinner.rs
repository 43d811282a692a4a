//! Spinners for reconcile progress.

use std::collections::HashMap;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use shelf_reconcile::{ReconcileProgress, ReconcileStats};

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("  {spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("/-\\|")
}

/// Progress for a single reconcile run, shown on one spinner line.
pub(crate) struct SpinnerProgress {
    pb: ProgressBar,
}

impl SpinnerProgress {
    pub(crate) fn new(hidden: bool) -> Self {
        let pb = if hidden {
            ProgressBar::hidden()
        } else {
            ProgressBar::new_spinner()
        };
        pb.set_style(spinner_style());
        pb.enable_steady_tick(Duration::from_millis(100));
        Self { pb }
    }
}

impl ReconcileProgress for SpinnerProgress {
    fn on_phase(&self, message: &str) {
        self.pb.set_message(message.to_string());
        log::debug!("{}", message);
    }

    fn on_entity(&self, current: usize, total: usize, label: &str) {
        if current.is_multiple_of(100) || current == total {
            self.pb.set_message(format!("[{}/{}] {}", current, total, label));
        }
    }

    fn on_complete(&self, _stats: &ReconcileStats) {
        self.pb.finish_and_clear();
    }
}

impl Drop for SpinnerProgress {
    fn drop(&mut self) {
        self.pb.finish_and_clear();
    }
}

/// One spinner line per running pipeline, keyed by pipeline index.
pub(crate) struct SpinnerPool {
    mp: MultiProgress,
    hidden: bool,
    spinners: HashMap<usize, ProgressBar>,
}

impl SpinnerPool {
    pub(crate) fn new(hidden: bool) -> Self {
        let mp = if hidden {
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
        } else {
            MultiProgress::new()
        };
        Self {
            mp,
            hidden,
            spinners: HashMap::new(),
        }
    }

    pub(crate) fn claim(&mut self, key: usize, msg: String) {
        let pb = self.mp.add(ProgressBar::new_spinner());
        pb.set_style(spinner_style());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_message(msg);
        self.spinners.insert(key, pb);
    }

    pub(crate) fn update(&self, key: usize, msg: String) {
        if let Some(pb) = self.spinners.get(&key) {
            pb.set_message(msg);
        }
    }

    pub(crate) fn release(&mut self, key: usize) {
        if let Some(pb) = self.spinners.remove(&key) {
            pb.finish_and_clear();
        }
    }

    /// Print a line above the spinners without tearing them.
    pub(crate) fn println(&self, line: &str) {
        if self.hidden || self.spinners.is_empty() {
            log::info!("{}", line);
        } else {
            // Suspend so the log line lands above the spinner block.
            self.mp.suspend(|| log::info!("{}", line));
        }
    }

    pub(crate) fn clear_all(&mut self) {
        for (_, pb) in self.spinners.drain() {
            pb.finish_and_clear();
        }
    }
}
