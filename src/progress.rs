//! Progress bar helpers shared by every stage. Updates are batched to avoid lock
//! contention from many worker threads hitting the same bar.

use kdam::{Bar, BarExt};
use std::sync::{Arc, Mutex};

pub type ProgressBar = Arc<Mutex<Bar>>;

/// Create a bar with a known total (percentage display).
pub fn create_progress_bar(total: usize, desc: &'static str) -> ProgressBar {
    Arc::new(Mutex::new(kdam::tqdm!(total = total, desc = desc)))
}

/// Create a bar for an unknown-total count (e.g. the seeding walker).
pub fn create_counter(desc: &'static str) -> ProgressBar {
    Arc::new(Mutex::new(kdam::tqdm!(
        total = 0,
        desc = desc,
        position = 0,
        unit = " files"
    )))
}

/// Non-blocking update: skips the tick if another worker currently holds the lock,
/// trading a slightly stale bar for zero added contention on the hot path.
pub fn update(pb: &ProgressBar, n: usize) {
    if let Ok(mut bar) = pb.try_lock() {
        let _ = bar.update(n);
    }
}

/// Update the bar's total and force a redraw (e.g. once the candidate count is known).
pub fn set_total(pb: &ProgressBar, total: usize) {
    if let Ok(mut bar) = pb.try_lock() {
        bar.total = total;
        let _ = bar.refresh();
    }
}
