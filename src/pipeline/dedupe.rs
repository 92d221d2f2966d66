//! Orchestrates the staged hashing pipeline: quick hash → optional progressive sampling →
//! full cryptographic hash → duplicate grouping. Grounded in the original catalog's
//! `detect_duplicates`, reshaped into the generic paged executor (§4.2/§4.5).

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use anyhow::Result;
use rusqlite::Connection;

use crate::consts::StageConsts;
use crate::hashing::full::{HashAlgorithm, hash_file_full};
use crate::hashing::quick::{SamplePosition, quick_hash, sample_hash};
use crate::pipeline::executor::{CandidateItem, run_paged_stage};
use crate::progress::{self, ProgressBar};
use crate::ratelimit::RateLimiter;
use crate::store::{WhereClause, candidates};
use crate::types::{DedupeStats, StageOutcome};

pub struct DedupeOptions {
    pub algo: HashAlgorithm,
    pub mirror_to_sha256: bool,
    pub progressive: bool,
    pub metadata_only: bool,
    pub min_file_size: u64,
    pub min_duplicate_count: u64,
    pub quick_hash_bytes: usize,
    pub sha_chunk_bytes: usize,
    pub sample_bytes: usize,
    pub rate_limit_bytes_per_sec: Option<u64>,
    pub where_clause: WhereClause,
}

fn write_quick_batch(conn: &Connection, batch: &[StageOutcome<u64>]) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    for outcome in batch {
        match outcome {
            StageOutcome::Ok { file_id, value } => tx.execute(
                "UPDATE files SET quick_hash = ?1, state = 'quick_hashed' WHERE file_id = ?2",
                rusqlite::params![value.to_string(), file_id],
            )?,
            StageOutcome::Missing { file_id, reason } => tx.execute(
                "UPDATE files SET state = 'missing', error_msg = ?1 WHERE file_id = ?2",
                rusqlite::params![reason, file_id],
            )?,
            StageOutcome::Error { file_id, reason } => tx.execute(
                "UPDATE files SET state = 'error', error_msg = ?1 WHERE file_id = ?2",
                rusqlite::params![reason, file_id],
            )?,
        };
    }
    tx.commit()?;
    Ok(())
}

fn write_sample_batch(conn: &Connection, column: &'static str, batch: &[StageOutcome<u64>]) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    for outcome in batch {
        match outcome {
            StageOutcome::Ok { file_id, value } => tx.execute(
                &format!("UPDATE files SET {column} = ?1, state = 'sampled' WHERE file_id = ?2"),
                rusqlite::params![value.to_string(), file_id],
            )?,
            StageOutcome::Missing { file_id, reason } => tx.execute(
                "UPDATE files SET state = 'missing', error_msg = ?1 WHERE file_id = ?2",
                rusqlite::params![reason, file_id],
            )?,
            StageOutcome::Error { file_id, reason } => tx.execute(
                "UPDATE files SET state = 'error', error_msg = ?1 WHERE file_id = ?2",
                rusqlite::params![reason, file_id],
            )?,
        };
    }
    tx.commit()?;
    Ok(())
}

fn write_full_batch(conn: &Connection, column: &'static str, batch: &[StageOutcome<String>]) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    for outcome in batch {
        match outcome {
            StageOutcome::Ok { file_id, value } => tx.execute(
                &format!("UPDATE files SET {column} = ?1, state = 'done' WHERE file_id = ?2"),
                rusqlite::params![value, file_id],
            )?,
            StageOutcome::Missing { file_id, reason } => tx.execute(
                "UPDATE files SET state = 'missing', error_msg = ?1 WHERE file_id = ?2",
                rusqlite::params![reason, file_id],
            )?,
            StageOutcome::Error { file_id, reason } => tx.execute(
                "UPDATE files SET state = 'error', error_msg = ?1 WHERE file_id = ?2",
                rusqlite::params![reason, file_id],
            )?,
        };
    }
    tx.commit()?;
    Ok(())
}

/// Seeds `pending_candidates` with only the rows whose `(size_bytes, ext)` group has at
/// least `min_duplicate_count` members (§4.4 shape 1) — a file with a size/extension no
/// other pending file shares can never collide, so it is never even quick-hashed.
fn seed_pending(
    conn: &Connection,
    min_file_size: u64,
    min_duplicate_count: u64,
    where_clause: &WhereClause,
) -> Result<()> {
    candidates::drop_temp(conn, "pending_candidates")?;
    let (extra_sql, extra_params) = where_clause.render();
    let sql = format!(
        "CREATE TEMP TABLE pending_candidates AS
         SELECT f.file_id, f.path_abs, f.size_bytes FROM files f
         JOIN (
             SELECT size_bytes, ext, COUNT(*) AS n
             FROM files
             WHERE state = 'pending' AND size_bytes >= ? AND {extra_sql}
             GROUP BY size_bytes, ext
             HAVING COUNT(*) >= ?
         ) g ON f.size_bytes = g.size_bytes AND f.ext IS g.ext
         WHERE f.state = 'pending' AND f.size_bytes >= ? AND {extra_sql}"
    );
    let mut params: Vec<rusqlite::types::Value> = vec![rusqlite::types::Value::Integer(min_file_size as i64)];
    params.extend(extra_params.iter().cloned());
    params.push(rusqlite::types::Value::Integer(min_duplicate_count as i64));
    params.push(rusqlite::types::Value::Integer(min_file_size as i64));
    params.extend(extra_params.iter().cloned());
    conn.execute(&sql, rusqlite::params_from_iter(params))?;
    Ok(())
}

fn quick_hash_stage(
    conn: &Connection,
    cancel_flag: &Arc<AtomicBool>,
    pb: &ProgressBar,
    opts: &DedupeOptions,
    limiter: &Arc<RateLimiter>,
) -> Result<crate::pipeline::executor::StageSummary> {
    let sample_bytes = opts.quick_hash_bytes;
    let limiter = limiter.clone();
    run_paged_stage::<u64, _, _>(
        conn,
        "pending_candidates",
        StageConsts::PAGE_QUICK,
        StageConsts::BATCH_QUICK,
        cancel_flag,
        pb,
        move |item: &CandidateItem| match quick_hash(&item.path, sample_bytes, &limiter) {
            Ok(h) => StageOutcome::Ok {
                file_id: item.file_id,
                value: h,
            },
            Err(e) if !item.path.exists() => StageOutcome::Missing {
                file_id: item.file_id,
                reason: e.to_string(),
            },
            Err(e) => StageOutcome::Error {
                file_id: item.file_id,
                reason: e.to_string(),
            },
        },
        write_quick_batch,
    )
}

fn sample_stage(
    conn: &Connection,
    source_table: &'static str,
    column: &'static str,
    position: SamplePosition,
    sample_bytes: usize,
    cancel_flag: &Arc<AtomicBool>,
    pb: &ProgressBar,
    limiter: &Arc<RateLimiter>,
) -> Result<crate::pipeline::executor::StageSummary> {
    let limiter = limiter.clone();
    run_paged_stage::<u64, _, _>(
        conn,
        source_table,
        StageConsts::PAGE_QUICK,
        StageConsts::BATCH_QUICK,
        cancel_flag,
        pb,
        move |item: &CandidateItem| match sample_hash(&item.path, position, sample_bytes, &limiter) {
            Ok(h) => StageOutcome::Ok {
                file_id: item.file_id,
                value: h,
            },
            Err(e) if !item.path.exists() => StageOutcome::Missing {
                file_id: item.file_id,
                reason: e.to_string(),
            },
            Err(e) => StageOutcome::Error {
                file_id: item.file_id,
                reason: e.to_string(),
            },
        },
        move |conn, batch| write_sample_batch(conn, column, batch),
    )
}

fn full_hash_stage(
    conn: &Connection,
    source_table: &'static str,
    algo: HashAlgorithm,
    chunk_bytes: usize,
    limiter: Arc<RateLimiter>,
    cancel_flag: &Arc<AtomicBool>,
    pb: &ProgressBar,
) -> Result<crate::pipeline::executor::StageSummary> {
    let column = algo.column().column_name();
    run_paged_stage::<String, _, _>(
        conn,
        source_table,
        StageConsts::PAGE_FULL,
        StageConsts::BATCH_FULL,
        cancel_flag,
        pb,
        move |item: &CandidateItem| match hash_file_full(&item.path, algo, chunk_bytes, &limiter) {
            Ok(digest) => StageOutcome::Ok {
                file_id: item.file_id,
                value: digest,
            },
            Err(e) if !item.path.exists() => StageOutcome::Missing {
                file_id: item.file_id,
                reason: e.to_string(),
            },
            Err(e) => StageOutcome::Error {
                file_id: item.file_id,
                reason: e.to_string(),
            },
        },
        move |conn, batch| write_full_batch(conn, column, batch),
    )
}

/// Run the full pipeline against `conn` and return aggregate statistics (§4.2, §9). When
/// `opts.metadata_only` is set, no hash is ever computed or written — grouping is purely by
/// `(size_bytes, name)`, matching the CLI's refusal to let this mode feed the pruner (§4.7/§7).
pub fn detect_duplicates(
    conn: &Connection,
    cancel_flag: Arc<AtomicBool>,
    opts: &DedupeOptions,
) -> Result<DedupeStats> {
    let mut stats = DedupeStats::default();

    if opts.metadata_only {
        let groups = candidates::metadata_only_groups(conn, opts.min_duplicate_count, &opts.where_clause)?;
        stats.duplicate_groups = groups.len() as u64;
        for g in &groups {
            stats.duplicate_files += g.len() as u64;
            if let Some(biggest) = g.iter().map(|m| m.size_bytes).max() {
                stats.wasted_bytes += biggest * (g.len() as u64 - 1);
            }
        }
        return Ok(stats);
    }

    let limiter = Arc::new(RateLimiter::new(opts.rate_limit_bytes_per_sec));

    let quick_pb = progress::create_counter("quick hash");
    seed_pending(conn, opts.min_file_size, opts.min_duplicate_count, &opts.where_clause)?;
    let quick_summary = quick_hash_stage(conn, &cancel_flag, &quick_pb, opts, &limiter)?;
    stats.files_processed += quick_summary.processed;
    stats.files_missing += quick_summary.missing;
    stats.files_error += quick_summary.errored;
    stats.quick_hash_count = quick_summary.processed;

    let quick_group_count = candidates::build_quick_hash_candidates(conn, &opts.where_clause)?;
    log::info!("{quick_group_count} files share a size/quick-hash with at least one other file");

    let full_source_table: &'static str = if opts.progressive {
        let h1_pb = progress::create_counter("sample head");
        sample_stage(
            conn,
            "quick_candidates",
            "h1",
            SamplePosition::Head,
            opts.sample_bytes,
            &cancel_flag,
            &h1_pb,
            &limiter,
        )?;
        let n = candidates::build_sample_collision_candidates(conn)?;
        log::info!("{n} files survive the head-sample narrowing pass");

        let h2_pb = progress::create_counter("sample tail");
        sample_stage(
            conn,
            "sample_candidates",
            "h2",
            SamplePosition::Tail,
            opts.sample_bytes,
            &cancel_flag,
            &h2_pb,
            &limiter,
        )?;
        candidates::drop_temp(conn, "full_candidates")?;
        conn.execute(
            "CREATE TEMP TABLE full_candidates AS
             SELECT f.file_id, f.path_abs, f.size_bytes
             FROM files f
             JOIN (
                 SELECT size_bytes, quick_hash, h1, h2, COUNT(*) AS n
                 FROM files
                 WHERE h2 IS NOT NULL
                 GROUP BY size_bytes, quick_hash, h1, h2
                 HAVING COUNT(*) > 1
             ) g ON f.size_bytes = g.size_bytes AND f.quick_hash = g.quick_hash
                 AND f.h1 = g.h1 AND f.h2 = g.h2",
            [],
        )?;
        "full_candidates"
    } else {
        "quick_candidates"
    };

    let full_pb = progress::create_counter("full hash");
    let full_summary = full_hash_stage(
        conn,
        full_source_table,
        opts.algo,
        opts.sha_chunk_bytes,
        limiter.clone(),
        &cancel_flag,
        &full_pb,
    )?;
    stats.sha256_count = full_summary.processed;
    stats.files_error += full_summary.errored;
    stats.files_missing += full_summary.missing;

    if opts.mirror_to_sha256 && opts.algo == HashAlgorithm::Blake3 {
        let mirror_pb = progress::create_counter("sha256 mirror");
        full_hash_stage(
            conn,
            full_source_table,
            HashAlgorithm::Sha256,
            opts.sha_chunk_bytes,
            limiter,
            &cancel_flag,
            &mirror_pb,
        )?;
        warn_on_mirror_mismatch(conn)?;
    }

    let groups = candidates::full_digest_groups(
        conn,
        opts.algo.column(),
        opts.min_duplicate_count,
        opts.min_file_size,
    )?;
    stats.duplicate_groups = groups.len() as u64;
    for g in &groups {
        stats.duplicate_files += g.len() as u64;
        if let Some(biggest) = g.iter().map(|m| m.size_bytes).max() {
            stats.wasted_bytes += biggest * (g.len() as u64 - 1);
        }
    }

    Ok(stats)
}

/// A BLAKE3 group whose members disagree on SHA-256 indicates a near-impossible BLAKE3
/// collision (or catalog corruption); surfaced as a warning rather than a hard failure
/// since the BLAKE3 grouping remains the run's source of truth.
fn warn_on_mirror_mismatch(conn: &Connection) -> Result<()> {
    let mut stmt = conn.prepare(
        "SELECT blake3, COUNT(DISTINCT sha256) FROM files
         WHERE blake3 IS NOT NULL AND sha256 IS NOT NULL
         GROUP BY blake3 HAVING COUNT(DISTINCT sha256) > 1",
    )?;
    let mismatches: Vec<String> = stmt
        .query_map([], |row| row.get(0))?
        .collect::<rusqlite::Result<_>>()?;
    for digest in mismatches {
        log::warn!("blake3 group {digest} disagrees on mirrored sha256 digest");
    }
    Ok(())
}

pub fn hash_single_file(path: &Path, algo: HashAlgorithm, chunk_bytes: usize) -> Result<String> {
    hash_file_full(path, algo, chunk_bytes, &RateLimiter::unlimited())
}

pub struct HashAllOptions {
    pub algo: HashAlgorithm,
    pub force: bool,
    pub mirror_to_sha256: bool,
    pub chunk_bytes: usize,
    pub rate_limit_bytes_per_sec: Option<u64>,
    pub where_clause: WhereClause,
}

/// Drives the standalone `hash` command: hashes every catalog row under the optional
/// path filters (or only unhashed ones without `--force`), writing straight into the
/// algorithm's own column rather than going through the quick-hash pre-filter.
pub fn hash_all(
    conn: &Connection,
    cancel_flag: Arc<AtomicBool>,
    opts: &HashAllOptions,
) -> Result<crate::pipeline::executor::StageSummary> {
    let n = candidates::build_hash_candidates(conn, &opts.where_clause, opts.algo.column(), opts.force)?;
    log::info!("{n} files selected for hashing");

    let limiter = Arc::new(RateLimiter::new(opts.rate_limit_bytes_per_sec));
    let pb = progress::create_counter("hash");
    let summary = full_hash_stage(
        conn,
        "hash_candidates",
        opts.algo,
        opts.chunk_bytes,
        limiter.clone(),
        &cancel_flag,
        &pb,
    )?;

    if opts.mirror_to_sha256 && opts.algo == HashAlgorithm::Blake3 {
        let mirror_pb = progress::create_counter("sha256 mirror");
        full_hash_stage(
            conn,
            "hash_candidates",
            HashAlgorithm::Sha256,
            opts.chunk_bytes,
            limiter,
            &cancel_flag,
            &mirror_pb,
        )?;
        warn_on_mirror_mismatch(conn)?;
    }

    candidates::drop_temp(conn, "hash_candidates")?;
    Ok(summary)
}
