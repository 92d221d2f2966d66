//! Process-global cancellation flag, set by the interrupt handler and polled at
//! well-defined checkpoints (between page loads, between completions, inside the
//! rate limiter). No worker is ever killed mid-read; the flag only tells the
//! dispatcher to stop handing out new work and flush what it has.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Install a SIGINT handler and return the shared flag it sets.
pub fn install_handler() -> Result<Arc<AtomicBool>> {
    let flag = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&flag);
    ctrlc::set_handler(move || {
        handler_flag.store(true, Ordering::Relaxed);
    })
    .context("install Ctrl+C handler")?;
    Ok(flag)
}

#[inline]
pub fn is_cancelled(flag: &Arc<AtomicBool>) -> bool {
    flag.load(Ordering::Relaxed)
}
