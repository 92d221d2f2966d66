//! Crate-wide error type distinguishing the failure taxonomy the CLI maps to exit codes.

use std::fmt;
use std::path::PathBuf;

/// One error per taxonomy category in the error handling design: configuration,
/// catalog I/O, and cancellation are distinguished because the CLI needs a different
/// exit code and message for each. Per-file access/hash failures are not part of this
/// type: they are recorded on the row as `missing`/`error` state and never propagate.
#[derive(Debug)]
pub enum CatalogError {
    /// Missing catalog file, invalid flag combination, refused destructive operation.
    Configuration(String),
    /// Transactional failure on a batched write; fatal to the current stage.
    CatalogIo(rusqlite::Error),
    /// Unrecoverable I/O outside the catalog (e.g. reading the config file).
    Io(std::io::Error),
    /// User interrupt observed at a cancellation checkpoint.
    Cancelled,
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::Configuration(msg) => write!(f, "{msg}"),
            CatalogError::CatalogIo(e) => write!(f, "catalog database error: {e}"),
            CatalogError::Io(e) => write!(f, "I/O error: {e}"),
            CatalogError::Cancelled => write!(f, "cancelled by user"),
        }
    }
}

impl std::error::Error for CatalogError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CatalogError::CatalogIo(e) => Some(e),
            CatalogError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for CatalogError {
    fn from(e: rusqlite::Error) -> Self {
        CatalogError::CatalogIo(e)
    }
}

impl From<std::io::Error> for CatalogError {
    fn from(e: std::io::Error) -> Self {
        CatalogError::Io(e)
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;

/// Maps an error (or clean success) to the process exit code from the error handling design:
/// 0 success, 1 misuse/configuration, 130 cancelled, other non-zero unrecoverable I/O.
pub fn exit_code(result: &anyhow::Result<()>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            if let Some(ce) = e.downcast_ref::<CatalogError>() {
                match ce {
                    CatalogError::Configuration(_) => 1,
                    CatalogError::Cancelled => 130,
                    CatalogError::CatalogIo(_) | CatalogError::Io(_) => 2,
                }
            } else {
                1
            }
        }
    }
}

/// Reason a per-file operation could not complete, recorded on the row.
#[derive(Debug, Clone)]
pub struct FileFailure {
    pub path: PathBuf,
    pub reason: String,
}
