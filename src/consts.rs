//! Tuning constants and thresholds, collected in one place per the teacher's convention.

/// Worker thread limits for drive-type-based tuning. Use [`WorkerThreadLimits::current()`]
/// to fill `all_threads` from rayon; the rest are const.
#[derive(Clone, Copy, Debug)]
pub struct WorkerThreadLimits {
    pub all_threads: usize,
    pub hdd_max: usize,
    pub floor: usize,
    pub unknown_max: usize,
    pub network_max: usize,
}

impl Default for WorkerThreadLimits {
    fn default() -> Self {
        Self {
            all_threads: 0,
            hdd_max: Self::HDD_THREADS,
            floor: Self::FLOOR_THREADS,
            unknown_max: Self::UNKNOWN_MAX_THREADS,
            network_max: Self::NETWORK_MAX_THREADS,
        }
    }
}

impl WorkerThreadLimits {
    pub const HDD_THREADS: usize = 4;
    pub const FLOOR_THREADS: usize = 2;
    pub const UNKNOWN_MAX_THREADS: usize = 8;
    pub const NETWORK_MAX_THREADS: usize = 12;

    pub fn current() -> Self {
        Self {
            all_threads: rayon::current_num_threads(),
            ..Self::default()
        }
    }
}

/// Paging and batching sizes for the stage executor (§4.5).
pub struct StageConsts;

impl StageConsts {
    /// Candidate page size for the quick-hash stage.
    pub const PAGE_QUICK: i64 = 10_000;
    /// Candidate page size for the full-hash stage.
    pub const PAGE_FULL: i64 = 5_000;
    /// Batched update flush size for quick-hash / h1 / h2 writes.
    pub const BATCH_QUICK: usize = 1_000;
    /// Batched update flush size for full-hash / pruner writes.
    pub const BATCH_FULL: usize = 500;
    /// Emit a progress tick every N completions.
    pub const PROGRESS_EVERY: u64 = 100;
    /// Emit a human-readable log line at most this often.
    pub const LOG_EVERY_SECS: u64 = 30;
}

/// Defaults for the dedupe configuration document (§6), overridable by TOML and CLI flags.
pub struct DedupeDefaults;

impl DedupeDefaults {
    pub const MAX_WORKERS: usize = 8;
    pub const SMALL_FILE_THRESHOLD: u64 = 131_072;
    pub const MIN_FILE_SIZE: u64 = 1_024;
    pub const MIN_DUPLICATE_COUNT: u64 = 2;
    pub const QUICK_HASH_BYTES: usize = 262_144;
    pub const SHA_CHUNK_BYTES: usize = 2_097_152;
    /// Network-friendly overrides (§4.6).
    pub const NETWORK_QUICK_HASH_BYTES: usize = 65_536;
    pub const NETWORK_SHA_CHUNK_BYTES: usize = 262_144;
    pub const NETWORK_MAX_WORKERS: usize = 2;
    pub const NETWORK_SAMPLE_BYTES: usize = 65_536;
    pub const SAMPLE_BYTES: usize = 32_768;
}

/// Scanner defaults for the seeding walker.
pub struct ScannerDefaults;

impl ScannerDefaults {
    pub const MAX_WORKERS: usize = 8;
    pub const IO_CHUNK_BYTES: usize = 65_536;
}

/// Hashing I/O thresholds and buffer sizes (§4.1).
pub struct HashingConsts;

impl HashingConsts {
    /// File size above which full-hash reads use memory-mapped I/O (bytes).
    pub const HASH_MMAP_THRESHOLD: u64 = 100 * 1024 * 1024;
    /// Default chunk size when reading below the mmap threshold (bytes).
    pub const HASH_READ_CHUNK_SIZE: usize = 1024 * 1024;
}

/// Batch size for catalog-wide row operations outside the stage executor (e.g. the seeding walker).
pub const DB_INSERT_BATCH_SIZE: usize = 1000;

/// Pruner deletion chunk size (§4.7).
pub const PRUNE_DELETE_CHUNK: usize = 500;

/// Default report limit for `dedupe --report`.
pub const DEFAULT_REPORT_LIMIT: usize = 100;
