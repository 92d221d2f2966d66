//! Catalog store: schema, connection setup, and the small set of operations the
//! pipeline and pruner need beyond raw SQL (open/migrate, batched transactions,
//! cooperative cancellation of long-running queries).

mod where_clause;

pub mod candidates;

pub use where_clause::WhereClause;

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// WAL tuning pragmas, applied after `PRAGMA journal_mode = WAL`.
const WAL_PRAGMAS: &str = r#"
    PRAGMA synchronous = NORMAL;
    PRAGMA wal_autocheckpoint = 10000;
    PRAGMA busy_timeout = 30000;
    PRAGMA foreign_keys = ON;
"#;

/// Schema for the `scans` and `files` tables (§3). Idempotent: safe to run against an
/// existing database, including one created by an older engine version missing `h1`/`h2`/`blake3`.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS scans (
    scan_id      INTEGER PRIMARY KEY,
    started_at   TEXT NOT NULL,
    root_path    TEXT NOT NULL,
    host         TEXT,
    user         TEXT
);

CREATE TABLE IF NOT EXISTS files (
    file_id       INTEGER PRIMARY KEY,
    scan_run_id   INTEGER REFERENCES scans(scan_id),
    path_abs      TEXT NOT NULL UNIQUE,
    dir           TEXT NOT NULL,
    name          TEXT NOT NULL,
    ext           TEXT,
    size_bytes    INTEGER NOT NULL,
    mtime_utc     TEXT NOT NULL,
    ctime_utc     TEXT,
    last_seen_at  TEXT NOT NULL,
    quick_hash    TEXT,
    h1            TEXT,
    h2            TEXT,
    sha256        TEXT,
    blake3        TEXT,
    state         TEXT NOT NULL DEFAULT 'pending',
    error_code    TEXT,
    error_msg     TEXT
);

CREATE INDEX IF NOT EXISTS idx_files_path ON files(path_abs);
CREATE INDEX IF NOT EXISTS idx_files_size_ext ON files(size_bytes, ext);
CREATE INDEX IF NOT EXISTS idx_files_size_quick_hash ON files(size_bytes, quick_hash);
CREATE INDEX IF NOT EXISTS idx_files_sha256 ON files(sha256);
CREATE INDEX IF NOT EXISTS idx_files_ext ON files(ext);
CREATE INDEX IF NOT EXISTS idx_files_dir ON files(dir);
CREATE INDEX IF NOT EXISTS idx_files_state ON files(state);
"#;

/// Migration for legacy catalogs that predate the progressive-sampling and BLAKE3 columns.
const MIGRATE_ADD_COLUMNS: &[&str] = &[
    "ALTER TABLE files ADD COLUMN h1 TEXT",
    "ALTER TABLE files ADD COLUMN h2 TEXT",
    "ALTER TABLE files ADD COLUMN blake3 TEXT",
];

fn apply_wal_and_schema(conn: &Connection, db_path: Option<&Path>) -> Result<()> {
    let ctx = db_path
        .map(|p| format!(" at {}", p.display()))
        .unwrap_or_default();
    conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))
        .with_context(|| format!("enable WAL{ctx}"))?;
    conn.execute_batch(WAL_PRAGMAS)
        .with_context(|| format!("set pragmas{ctx}"))?;
    conn.execute_batch(SCHEMA)
        .with_context(|| format!("create schema{ctx}"))?;
    for stmt in MIGRATE_ADD_COLUMNS {
        // ALTER TABLE ADD COLUMN has no IF NOT EXISTS; ignore "duplicate column" errors.
        let _ = conn.execute(stmt, []);
    }
    Ok(())
}

/// Open (or create) the catalog at `path`, ensuring schema and WAL pragmas are applied.
/// If `passphrase` is `Some`, the SQLCipher key is set before any other statement.
pub fn open(path: &Path, passphrase: Option<&str>) -> Result<Connection> {
    let conn =
        Connection::open(path).with_context(|| format!("open catalog at {}", path.display()))?;
    if let Some(key) = passphrase {
        conn.pragma_update(None, "key", key)
            .with_context(|| format!("set encryption key for {}", path.display()))?;
    }
    apply_wal_and_schema(&conn, Some(path))?;
    Ok(conn)
}

/// Open an existing catalog, detecting whether it is encrypted: try reading without a key
/// first; on failure, resolve a passphrase and retry.
pub fn open_or_detect_encrypted(path: &Path, dir: &Path) -> Result<(Connection, Option<String>)> {
    let conn =
        Connection::open(path).with_context(|| format!("open catalog at {}", path.display()))?;
    if conn.query_row("SELECT 1", [], |_| Ok(())).is_ok() {
        apply_wal_and_schema(&conn, Some(path))?;
        return Ok((conn, None));
    }
    drop(conn);
    let pass = crate::passphrase::get_passphrase(dir, false)?;
    let conn = open(path, Some(pass.as_str()))?;
    Ok((conn, Some(pass)))
}

/// In-memory catalog for unit tests.
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory().context("open in-memory catalog")?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")
        .context("set pragmas")?;
    conn.execute_batch(SCHEMA).context("create schema")?;
    Ok(conn)
}

/// Count rows in `files`, used to size progress bars before a stage starts.
pub fn count_files(conn: &Connection) -> Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM files", [], |row| row.get(0))
        .context("count files")
}

/// Install a progress handler that polls `cancel_flag` every `n` VM instructions so long
/// `SELECT`/`CREATE TEMP TABLE ... AS` statements return promptly on interrupt (§4.3).
pub fn install_cancellation_hook(conn: &Connection, cancel_flag: Arc<AtomicBool>, n: i32) {
    let _ = conn.progress_handler(n, Some(move || cancel_flag.load(Ordering::Relaxed)));
}

/// Back up the live database to `dest_path` (used by the CLI's optional pre-prune safety copy).
pub fn backup_to_file(conn: &mut Connection, dest_path: &Path) -> Result<()> {
    conn.backup(rusqlite::MAIN_DB, dest_path, None)
        .with_context(|| format!("backup catalog to {}", dest_path.display()))
}
