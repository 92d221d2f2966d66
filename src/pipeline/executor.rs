//! Generic paged, parallel, batched stage runner shared by the quick-hash, progressive-
//! sampling, and full-hash stages (§4.5). Each stage differs only in its source temp table,
//! its per-file operation, and how it writes results back — the paging, thread dispatch,
//! batching, progress reporting, and cancellation are identical across all three.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use rayon::prelude::*;
use rusqlite::Connection;

use crate::error::CatalogError;
use crate::progress::{self, ProgressBar};
use crate::types::StageOutcome;

/// A single row pulled from a candidate temp table: enough to run the stage's operation
/// without a second round trip to the database.
pub struct CandidateItem {
    pub rowid: i64,
    pub file_id: i64,
    pub path: PathBuf,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct StageSummary {
    pub processed: u64,
    pub missing: u64,
    pub errored: u64,
}

/// Page through `source_table` in `rowid` order, run `op` across each page with rayon,
/// flush outcomes in batches of `batch_size` via `write_batch`, and report progress.
/// Returns `Err(CatalogError::Cancelled)` the moment the flag is observed set, leaving
/// everything written so far committed — the next invocation resumes from the rows still
/// in `pending`/`quick_hashed` state rather than redoing completed work.
pub fn run_paged_stage<T, F, W>(
    conn: &Connection,
    source_table: &str,
    page_size: i64,
    batch_size: usize,
    cancel_flag: &Arc<AtomicBool>,
    progress: &ProgressBar,
    op: F,
    mut write_batch: W,
) -> Result<StageSummary>
where
    F: Fn(&CandidateItem) -> StageOutcome<T> + Sync,
    T: Send,
    W: FnMut(&Connection, &[StageOutcome<T>]) -> Result<()>,
{
    let mut last_rowid: i64 = 0;
    let mut summary = StageSummary::default();

    loop {
        if cancel_flag.load(Ordering::Relaxed) {
            return Err(CatalogError::Cancelled.into());
        }

        let mut stmt = conn.prepare(&format!(
            "SELECT rowid, file_id, path_abs, size_bytes FROM {source_table}
             WHERE rowid > ?1 ORDER BY rowid LIMIT ?2"
        ))?;
        let page: Vec<CandidateItem> = stmt
            .query_map(rusqlite::params![last_rowid, page_size], |row| {
                Ok(CandidateItem {
                    rowid: row.get(0)?,
                    file_id: row.get(1)?,
                    path: PathBuf::from(row.get::<_, String>(2)?),
                    size_bytes: row.get::<_, i64>(3)? as u64,
                })
            })?
            .collect::<rusqlite::Result<_>>()?;
        drop(stmt);

        if page.is_empty() {
            break;
        }
        last_rowid = page.last().expect("checked non-empty").rowid;

        // Cancellation is checked between batch-sized sub-chunks of the page, not only
        // between whole pages, so an interrupt lands within one batch's worth of work
        // rather than up to a full PAGE_* rows later (§4.5/§8).
        for page_chunk in page.chunks(batch_size.max(1)) {
            if cancel_flag.load(Ordering::Relaxed) {
                return Err(CatalogError::Cancelled.into());
            }

            let outcomes: Vec<StageOutcome<T>> = page_chunk.par_iter().map(&op).collect();
            write_batch(conn, &outcomes)?;

            for outcome in &outcomes {
                match outcome {
                    StageOutcome::Ok { .. } => summary.processed += 1,
                    StageOutcome::Missing { .. } => summary.missing += 1,
                    StageOutcome::Error { .. } => summary.errored += 1,
                }
            }
            progress::update(progress, outcomes.len());
        }

        if cancel_flag.load(Ordering::Relaxed) {
            return Err(CatalogError::Cancelled.into());
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::open_in_memory;

    #[test]
    fn pages_until_source_table_is_exhausted() {
        let conn = open_in_memory().unwrap();
        for i in 0..5 {
            conn.execute(
                "INSERT INTO files (path_abs, dir, name, ext, size_bytes, mtime_utc, last_seen_at, state)
                 VALUES (?1, '/', ?1, 'bin', 10, '2024-01-01', '2024-01-01', 'pending')",
                [format!("/f{i}")],
            )
            .unwrap();
        }
        conn.execute("CREATE TEMP TABLE src AS SELECT file_id, path_abs, size_bytes FROM files", [])
            .unwrap();

        let cancel = Arc::new(AtomicBool::new(false));
        let pb = progress::create_counter("test");
        let summary = run_paged_stage::<u64, _, _>(
            &conn,
            "src",
            2,
            10,
            &cancel,
            &pb,
            |item| StageOutcome::Ok {
                file_id: item.file_id,
                value: item.size_bytes,
            },
            |_conn, _batch| Ok(()),
        )
        .unwrap();
        assert_eq!(summary.processed, 5);
    }

    #[test]
    fn stops_immediately_when_cancelled() {
        let conn = open_in_memory().unwrap();
        conn.execute(
            "INSERT INTO files (path_abs, dir, name, ext, size_bytes, mtime_utc, last_seen_at, state)
             VALUES ('/f', '/', 'f', 'bin', 10, '2024-01-01', '2024-01-01', 'pending')",
            [],
        )
        .unwrap();
        conn.execute("CREATE TEMP TABLE src AS SELECT file_id, path_abs, size_bytes FROM files", [])
            .unwrap();

        let cancel = Arc::new(AtomicBool::new(true));
        let pb = progress::create_counter("test");
        let result = run_paged_stage::<u64, _, _>(
            &conn,
            "src",
            2,
            10,
            &cancel,
            &pb,
            |item| StageOutcome::Ok {
                file_id: item.file_id,
                value: item.size_bytes,
            },
            |_conn, _batch| Ok(()),
        );
        assert!(result.is_err());
    }
}
