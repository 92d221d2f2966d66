//! Seeds the catalog: walks a root, records one `files` row per regular file with its
//! size and mtime, and reconciles rows for files that vanished since the previous scan.
//! Thin by design — this is where the original's directory walk lived, trimmed down now
//! that hashing is the staged pipeline's job, not the walker's (§4, §6).

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use ignore::WalkBuilder;
use rusqlite::{Connection, OptionalExtension};

use crate::consts::DB_INSERT_BATCH_SIZE;
use crate::disk_detect;
use crate::error::CatalogError;
use crate::pathutil::{path_to_db_string, should_include_in_walk};
use crate::progress;

pub struct ScanOptions {
    pub root: PathBuf,
    pub db_path: PathBuf,
    pub exclude_patterns: Vec<String>,
    pub include_ext: Vec<String>,
    pub follow_symlinks: bool,
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct ScanStats {
    pub files_seen: u64,
    pub files_inserted: u64,
    pub files_updated: u64,
    pub files_marked_missing: u64,
}

fn system_time_to_rfc3339(t: SystemTime) -> String {
    let secs = t
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    humantime_secs(secs)
}

fn humantime_secs(secs: u64) -> String {
    // Minimal RFC 3339-ish formatter: avoids pulling in a datetime crate for one field.
    let days = secs / 86_400;
    let rem = secs % 86_400;
    let (h, m, s) = (rem / 3600, (rem % 3600) / 60, rem % 60);
    let (y, mo, d) = civil_from_days(days as i64);
    format!("{y:04}-{mo:02}-{d:02}T{h:02}:{m:02}:{s:02}Z")
}

/// Howard Hinnant's days-from-civil inverse, public-domain algorithm, for a dependency-free
/// Unix-epoch-days -> (year, month, day) conversion.
fn civil_from_days(z: i64) -> (i64, u32, u32) {
    let z = z + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = (z - era * 146_097) as u64;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let m = if mp < 10 { mp + 3 } else { mp - 9 } as u32;
    (if m <= 2 { y + 1 } else { y }, m, d)
}

/// Walk `opts.root`, upserting a `files` row per regular file, then mark any catalog row
/// under the root that was not seen this pass as `missing`. Worker count is tuned from the
/// root's drive type (§5): SSD walks use the full thread pool, HDD and network mounts are
/// capped to avoid thrashing a spinning disk or saturating a slow link.
pub fn scan_root(
    conn: &mut Connection,
    opts: &ScanOptions,
    cancel_flag: Arc<AtomicBool>,
) -> Result<ScanStats> {
    let scan_id: i64 = conn
        .query_row(
            "INSERT INTO scans (started_at, root_path, host, user) VALUES (?1, ?2, ?3, ?4)
             RETURNING scan_id",
            rusqlite::params![
                system_time_to_rfc3339(SystemTime::now()),
                path_to_db_string(&opts.root),
                hostname(),
                std::env::var("USER").ok(),
            ],
            |row| row.get(0),
        )
        .context("record scan run")?;

    let (_threads, drive_type) = disk_detect::determine_threads_for_drive(
        &opts.root,
        rayon::current_num_threads(),
    );
    log::info!("scanning {} (drive type: {:?})", opts.root.display(), drive_type);

    let db_canonical = opts.db_path.canonicalize().ok();
    let pb = progress::create_counter("scanning");

    let mut stats = ScanStats::default();
    let mut batch: Vec<(PathBuf, u64, String)> = Vec::with_capacity(DB_INSERT_BATCH_SIZE);

    let walker = WalkBuilder::new(&opts.root)
        .follow_links(opts.follow_symlinks)
        .standard_filters(false)
        .hidden(false)
        .build();

    for entry in walker {
        if cancel_flag.load(Ordering::Relaxed) {
            return Err(CatalogError::Cancelled.into());
        }
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                log::warn!("walk error: {e}");
                continue;
            }
        };
        let path = entry.path();
        if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }
        if !should_include_in_walk(path, &opts.root, &db_canonical, &opts.exclude_patterns) {
            continue;
        }
        if !opts.include_ext.is_empty() {
            let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
            if !opts.include_ext.iter().any(|e| e.eq_ignore_ascii_case(ext)) {
                continue;
            }
        }

        let meta = match path.metadata() {
            Ok(m) => m,
            Err(e) => {
                log::warn!("stat {}: {e}", path.display());
                continue;
            }
        };
        let mtime = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        stats.files_seen += 1;
        batch.push((path.to_path_buf(), meta.len(), system_time_to_rfc3339(mtime)));
        progress::update(&pb, 1);

        if batch.len() >= DB_INSERT_BATCH_SIZE {
            flush_batch(conn, scan_id, &mut batch, &mut stats)?;
        }
    }
    flush_batch(conn, scan_id, &mut batch, &mut stats)?;

    let root_prefix = format!("{}%", path_to_db_string(&opts.root));
    let marked = conn
        .execute(
            "UPDATE files SET state = 'missing'
             WHERE path_abs LIKE ?1 AND scan_run_id != ?2 AND state != 'missing'",
            rusqlite::params![root_prefix, scan_id],
        )
        .context("mark vanished files missing")?;
    stats.files_marked_missing = marked as u64;

    Ok(stats)
}

fn flush_batch(
    conn: &Connection,
    scan_id: i64,
    batch: &mut Vec<(PathBuf, u64, String)>,
    stats: &mut ScanStats,
) -> Result<()> {
    if batch.is_empty() {
        return Ok(());
    }
    let tx = conn.unchecked_transaction().context("begin scan batch")?;
    for (path, size, mtime) in batch.drain(..) {
        let path_str = path_to_db_string(&path);
        let dir = path_to_db_string(path.parent().unwrap_or(Path::new("")));
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|s| s.to_lowercase());

        let existed: bool = tx
            .query_row(
                "SELECT 1 FROM files WHERE path_abs = ?1",
                [&path_str],
                |_| Ok(()),
            )
            .optional()
            .context("check existing file row")?
            .is_some();

        tx.execute(
            "INSERT INTO files (scan_run_id, path_abs, dir, name, ext, size_bytes, mtime_utc, last_seen_at, state)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7, 'pending')
             ON CONFLICT(path_abs) DO UPDATE SET
                 scan_run_id = excluded.scan_run_id,
                 last_seen_at = excluded.last_seen_at,
                 state = CASE
                     WHEN files.size_bytes != excluded.size_bytes OR files.mtime_utc != excluded.mtime_utc
                     THEN 'pending'
                     ELSE files.state
                 END,
                 size_bytes = excluded.size_bytes,
                 mtime_utc = excluded.mtime_utc",
            rusqlite::params![scan_id, path_str, dir, name, ext, size as i64, mtime],
        )
        .context("upsert file row")?;

        if existed {
            stats.files_updated += 1;
        } else {
            stats.files_inserted += 1;
        }
    }
    tx.commit().context("commit scan batch")?;
    Ok(())
}

fn hostname() -> Option<String> {
    sysinfo::System::host_name()
}
