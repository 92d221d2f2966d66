//! filecat: catalogs a filesystem tree into a SQLite index and finds byte-identical
//! duplicate files through a staged hashing pipeline (quick sample -> optional progressive
//! narrowing -> full cryptographic digest).

pub mod cancel;
pub mod cli;
pub mod config;
pub mod consts;
pub mod disk_detect;
pub mod error;
pub mod hashing;
pub mod logging;
pub mod passphrase;
pub mod pathutil;
pub mod pipeline;
pub mod progress;
pub mod pruner;
pub mod ratelimit;
pub mod scan;
pub mod store;
pub mod types;

pub use types::*;

/// Returns `(num_threads, drive_type)` for tuning a worker pool against a path's drive,
/// without needing a catalog connection open yet (§5).
pub fn tuning_for_path(
    path: &std::path::Path,
    available_threads: Option<usize>,
) -> (usize, disk_detect::DriveType) {
    let avail = available_threads.unwrap_or_else(rayon::current_num_threads);
    disk_detect::determine_threads_for_drive(path, avail)
}
