//! Deletes confirmed-duplicate files, keeping exactly one member per group. Grounded in
//! the original metadata-dedupe pruning script's keeper rule (oldest `mtime`, tie-broken by
//! lowercased path then row id) and its dry-run/report preview, but deviates from that
//! script's whole-transaction rollback on error: each file is removed independently so one
//! bad path (permission denied, already gone) doesn't undo every deletion that preceded it
//! in the same run (§4.7).

use std::fs;

use anyhow::{Context, Result};
use rusqlite::Connection;

use crate::consts::PRUNE_DELETE_CHUNK;
use crate::store::candidates;
use crate::types::{DigestColumn, GroupMember, KeepPolicy, PruneStats};

pub struct PruneOptions {
    pub policy: KeepPolicy,
    pub dry_run: bool,
    pub delete_from_disk: bool,
    pub min_group_size: u64,
    pub min_file_size: u64,
}

fn tie_break_key(m: &GroupMember) -> (String, i64) {
    (m.path.to_string_lossy().to_lowercase(), m.file_id)
}

/// Partition a group into `(keeper, losers)` per `policy`. The keeper is never deleted.
/// Only the `mtime` ordering flips between `Oldest`/`Newest`; the lowercased-path-then-
/// `file_id` tie-break always stays ascending (§4.7 step 2).
fn split_group(mut members: Vec<GroupMember>, policy: KeepPolicy) -> (GroupMember, Vec<GroupMember>) {
    members.sort_by(|a, b| {
        let mtime_order = match policy {
            KeepPolicy::Oldest => a.mtime_utc.cmp(&b.mtime_utc),
            KeepPolicy::Newest => b.mtime_utc.cmp(&a.mtime_utc),
        };
        mtime_order.then_with(|| tie_break_key(a).cmp(&tie_break_key(b)))
    });
    let keeper = members.remove(0);
    (keeper, members)
}

/// Remove `loser` from disk (if requested) and from the catalog. Never lets an error on one
/// loser abort the batch: the caller records it in `stats.errors` and moves on. Returns
/// whether a file was actually unlinked, so a group whose members were already gone reports
/// zero file removals even though its stale catalog rows still get cleaned up (§4.7 step 4).
fn remove_one(conn: &Connection, loser: &GroupMember, delete_from_disk: bool) -> Result<bool> {
    let mut unlinked = false;
    if delete_from_disk {
        match fs::remove_file(&loser.path) {
            Ok(()) => unlinked = true,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::warn!("{} already gone from disk", loser.path.display());
            }
            Err(e) => return Err(e).with_context(|| format!("delete {}", loser.path.display())),
        }
    }
    conn.execute("DELETE FROM files WHERE file_id = ?1", [loser.file_id])
        .with_context(|| format!("remove catalog row for {}", loser.path.display()))?;
    Ok(unlinked)
}

/// Plan and, unless `opts.dry_run`, execute deletion of every non-keeper in every
/// confirmed-duplicate group keyed by `column`. Deletions are chunked into batches of
/// [`PRUNE_DELETE_CHUNK`] committed transactions so a crash mid-run loses at most one chunk
/// of already-decided work, not the whole plan.
pub fn prune_duplicates(conn: &mut Connection, column: DigestColumn, opts: &PruneOptions) -> Result<PruneStats> {
    let groups = candidates::full_digest_groups(conn, column, opts.min_group_size, opts.min_file_size)?;
    let mut stats = PruneStats::default();
    stats.groups_considered = groups.len() as u64;

    // Members whose file no longer exists still get a catalog row removed (§4.7 step 4),
    // but never count against files_removed/bytes_reclaimed(able) — those track disk state.
    let mut pending_losers = Vec::new();
    for group in groups {
        if group.len() < 2 {
            continue;
        }
        let existing: Vec<GroupMember> = group.iter().filter(|m| m.path.exists()).cloned().collect();
        let all_missing = existing.is_empty();
        let group = if all_missing { group } else { existing };
        if group.len() < 2 {
            continue;
        }
        let (_keeper, losers) = split_group(group, opts.policy);
        if losers.is_empty() {
            continue;
        }
        stats.groups_modified += 1;
        for loser in losers {
            let on_disk = !all_missing && loser.path.exists();
            if on_disk {
                stats.bytes_reclaimable += loser.size_bytes;
            }
            pending_losers.push((loser, on_disk));
        }
    }

    if opts.dry_run {
        stats.files_removed = pending_losers.iter().filter(|(_, on_disk)| *on_disk).count() as u64;
        return Ok(stats);
    }

    for chunk in pending_losers.chunks(PRUNE_DELETE_CHUNK) {
        let tx = conn.transaction().context("begin prune chunk")?;
        for (loser, on_disk) in chunk {
            match remove_one(&tx, loser, opts.delete_from_disk) {
                Ok(unlinked) => {
                    stats.rows_removed += 1;
                    if unlinked || (*on_disk && !opts.delete_from_disk) {
                        stats.files_removed += 1;
                        stats.bytes_reclaimed += loser.size_bytes;
                    }
                }
                Err(e) => {
                    stats.errors.push(format!("{}: {e}", loser.path.display()));
                }
            }
        }
        tx.commit().context("commit prune chunk")?;
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn member(id: i64, path: &str, mtime: &str) -> GroupMember {
        GroupMember {
            file_id: id,
            path: PathBuf::from(path),
            size_bytes: 100,
            mtime_utc: mtime.to_string(),
        }
    }

    #[test]
    fn oldest_policy_keeps_earliest_mtime() {
        let members = vec![
            member(1, "/b", "2024-02-01"),
            member(2, "/a", "2024-01-01"),
            member(3, "/c", "2024-03-01"),
        ];
        let (keeper, losers) = split_group(members, KeepPolicy::Oldest);
        assert_eq!(keeper.file_id, 2);
        assert_eq!(losers.len(), 2);
    }

    #[test]
    fn newest_policy_keeps_latest_mtime() {
        let members = vec![
            member(1, "/b", "2024-02-01"),
            member(2, "/a", "2024-01-01"),
            member(3, "/c", "2024-03-01"),
        ];
        let (keeper, _losers) = split_group(members, KeepPolicy::Newest);
        assert_eq!(keeper.file_id, 3);
    }

    #[test]
    fn tie_breaks_on_lowercased_path_then_file_id() {
        let members = vec![
            member(2, "/Zebra", "2024-01-01"),
            member(1, "/apple", "2024-01-01"),
        ];
        let (keeper, _) = split_group(members, KeepPolicy::Oldest);
        assert_eq!(keeper.file_id, 1);
    }

    #[test]
    fn newest_policy_tie_still_breaks_on_lowercased_path_ascending() {
        let members = vec![
            member(2, "/Zebra", "2024-01-01"),
            member(1, "/apple", "2024-01-01"),
        ];
        let (keeper, _) = split_group(members, KeepPolicy::Newest);
        assert_eq!(keeper.file_id, 1);
    }
}
