//! Core domain types shared across the catalog store, candidate selector, and pipeline.

use std::path::PathBuf;

/// Lifecycle state of a catalog row, per the data model's state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState {
    Pending,
    QuickHashed,
    Sampled,
    ShaVerified,
    Done,
    Missing,
    Error,
}

impl FileState {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileState::Pending => "pending",
            FileState::QuickHashed => "quick_hashed",
            FileState::Sampled => "sampled",
            FileState::ShaVerified => "sha_verified",
            FileState::Done => "done",
            FileState::Missing => "missing",
            FileState::Error => "error",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "quick_hashed" => FileState::QuickHashed,
            "sampled" => FileState::Sampled,
            "sha_verified" => FileState::ShaVerified,
            "done" => FileState::Done,
            "missing" => FileState::Missing,
            "error" => FileState::Error,
            _ => FileState::Pending,
        }
    }
}

/// A row of the `files` table, as read for a candidate set (only the columns a stage needs).
#[derive(Debug, Clone)]
pub struct CandidateRow {
    pub rowid: i64,
    pub file_id: i64,
    pub path_abs: PathBuf,
    pub size_bytes: u64,
}

/// Tagged outcome of a single per-file operation, routed by the stage executor into one of
/// three batched accumulators. `T` is whatever payload a successful operation produces
/// (a `u64` quick hash, a hex digest string, or a pair of digests).
pub enum StageOutcome<T> {
    Ok { file_id: i64, value: T },
    Missing { file_id: i64, reason: String },
    Error { file_id: i64, reason: String },
}

/// Which column a confirmation digest was written to, and therefore which column
/// duplicate grouping should key off for this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestColumn {
    Sha256,
    Blake3,
}

impl DigestColumn {
    pub fn column_name(&self) -> &'static str {
        match self {
            DigestColumn::Sha256 => "sha256",
            DigestColumn::Blake3 => "blake3",
        }
    }
}

/// Keeper-selection policy for the pruner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeepPolicy {
    Oldest,
    Newest,
}

/// A confirmed-duplicate group member, as fetched by the pruner.
#[derive(Debug, Clone)]
pub struct GroupMember {
    pub file_id: i64,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub mtime_utc: String,
}

/// Aggregate statistics returned by `detect_duplicates`.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct DedupeStats {
    pub files_processed: u64,
    pub files_missing: u64,
    pub files_error: u64,
    pub quick_hash_count: u64,
    pub sha256_count: u64,
    pub duplicate_groups: u64,
    pub duplicate_files: u64,
    pub wasted_bytes: u64,
}

/// Aggregate counters returned by the pruner.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct PruneStats {
    pub groups_considered: u64,
    pub groups_modified: u64,
    pub files_removed: u64,
    pub rows_removed: u64,
    pub bytes_reclaimed: u64,
    pub bytes_reclaimable: u64,
    pub errors: Vec<String>,
}
