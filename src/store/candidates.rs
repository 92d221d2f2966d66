//! The five candidate-set shapes the pipeline stages and the pruner select from.
//! Each builds a temp table materializing the group membership so downstream readers
//! page through `rowid` ranges instead of re-running the aggregate each time.

use anyhow::{Context, Result};
use rusqlite::Connection;

use crate::store::WhereClause;
use crate::types::{DigestColumn, GroupMember};

/// Drop a temp table if it exists, for callers building successive narrowing passes.
pub fn drop_temp(conn: &Connection, name: &str) -> Result<()> {
    conn.execute(&format!("DROP TABLE IF EXISTS {name}"), [])
        .with_context(|| format!("drop temp table {name}"))?;
    Ok(())
}

/// Shape 1: files sharing `(size_bytes, quick_hash)` with more than one member and a
/// non-null quick hash. Seeds the full-hash stage.
pub fn build_quick_hash_candidates(conn: &Connection, where_clause: &WhereClause) -> Result<usize> {
    drop_temp(conn, "quick_candidates")?;
    let (extra_sql, extra_params) = where_clause.render();
    let sql = format!(
        "CREATE TEMP TABLE quick_candidates AS
         SELECT f.file_id, f.path_abs, f.size_bytes, f.quick_hash
         FROM files f
         JOIN (
             SELECT size_bytes, quick_hash, COUNT(*) AS n
             FROM files
             WHERE quick_hash IS NOT NULL AND state = 'quick_hashed' AND {extra_sql}
             GROUP BY size_bytes, quick_hash
             HAVING COUNT(*) > 1
         ) g ON f.size_bytes = g.size_bytes AND f.quick_hash = g.quick_hash
         WHERE f.quick_hash IS NOT NULL"
    );
    conn.execute(&sql, rusqlite::params_from_iter(extra_params))
        .context("build quick_candidates")?;
    conn.query_row("SELECT COUNT(*) FROM quick_candidates", [], |r| r.get::<_, i64>(0))
        .map(|n| n as usize)
        .context("count quick_candidates")
}

/// Shape 2: progressive-sampling collisions on `h1` within a quick-hash group, narrowing
/// the set that needs a full read before the cryptographic stage.
pub fn build_sample_collision_candidates(conn: &Connection) -> Result<usize> {
    drop_temp(conn, "sample_candidates")?;
    conn.execute(
        "CREATE TEMP TABLE sample_candidates AS
         SELECT f.file_id, f.path_abs, f.size_bytes, f.quick_hash, f.h1
         FROM files f
         JOIN (
             SELECT size_bytes, quick_hash, h1, COUNT(*) AS n
             FROM files
             WHERE h1 IS NOT NULL AND state = 'sampled'
             GROUP BY size_bytes, quick_hash, h1
             HAVING COUNT(*) > 1
         ) g ON f.size_bytes = g.size_bytes
             AND f.quick_hash = g.quick_hash
             AND f.h1 = g.h1",
        [],
    )
    .context("build sample_candidates")?;
    conn.query_row("SELECT COUNT(*) FROM sample_candidates", [], |r| r.get::<_, i64>(0))
        .map(|n| n as usize)
        .context("count sample_candidates")
}

/// Shape 3/4: confirmed duplicate groups by full cryptographic digest (SHA-256 or BLAKE3,
/// whichever column the run used). Used both as the final report source and, in
/// `--mirror-to-sha256` mode, to cross-check the two digests agree.
pub fn full_digest_groups(
    conn: &Connection,
    column: DigestColumn,
    min_group_size: u64,
    min_file_size: u64,
) -> Result<Vec<Vec<GroupMember>>> {
    let col = column.column_name();
    let mut group_stmt = conn
        .prepare(&format!(
            "SELECT {col} FROM files
             WHERE {col} IS NOT NULL AND size_bytes >= ?1
             GROUP BY {col}
             HAVING COUNT(*) >= ?2"
        ))
        .context("prepare digest group query")?;
    let digests: Vec<String> = group_stmt
        .query_map(
            rusqlite::params![min_file_size as i64, min_group_size as i64],
            |row| row.get(0),
        )
        .context("query digest groups")?
        .collect::<rusqlite::Result<_>>()
        .context("collect digest groups")?;

    let mut member_stmt = conn
        .prepare(&format!(
            "SELECT file_id, path_abs, size_bytes, mtime_utc FROM files WHERE {col} = ?1"
        ))
        .context("prepare digest member query")?;

    let mut groups = Vec::with_capacity(digests.len());
    for digest in digests {
        let rows = member_stmt
            .query_map([&digest], |row| {
                Ok(GroupMember {
                    file_id: row.get(0)?,
                    path: std::path::PathBuf::from(row.get::<_, String>(1)?),
                    size_bytes: row.get::<_, i64>(2)? as u64,
                    mtime_utc: row.get(3)?,
                })
            })
            .context("query digest group members")?
            .collect::<rusqlite::Result<_>>()
            .context("collect digest group members")?;
        groups.push(rows);
    }
    Ok(groups)
}

/// Standalone `hash` command candidates: every row under the optional path filters, or
/// (without `--force`) only those missing the target digest column.
pub fn build_hash_candidates(
    conn: &Connection,
    where_clause: &WhereClause,
    column: DigestColumn,
    force: bool,
) -> Result<usize> {
    drop_temp(conn, "hash_candidates")?;
    let col = column.column_name();
    let (extra_sql, extra_params) = where_clause.render();
    let force_sql = if force {
        String::new()
    } else {
        format!(" AND {col} IS NULL")
    };
    let sql = format!(
        "CREATE TEMP TABLE hash_candidates AS
         SELECT file_id, path_abs, size_bytes
         FROM files
         WHERE state NOT IN ('missing', 'error') AND {extra_sql}{force_sql}"
    );
    conn.execute(&sql, rusqlite::params_from_iter(extra_params))
        .context("build hash_candidates")?;
    conn.query_row("SELECT COUNT(*) FROM hash_candidates", [], |r| r.get::<_, i64>(0))
        .map(|n| n as usize)
        .context("count hash_candidates")
}

/// Shape 5: metadata-only candidates — same `(size_bytes, lower(name))` with no hash
/// computed at all. Surfaced for review via `dedupe --metadata-only`; never reaches the
/// pruner (§4.7/§7).
pub fn metadata_only_groups(
    conn: &Connection,
    min_group_size: u64,
    where_clause: &WhereClause,
) -> Result<Vec<Vec<GroupMember>>> {
    let (extra_sql, extra_params) = where_clause.render();
    let mut group_stmt = conn
        .prepare(&format!(
            "SELECT size_bytes, LOWER(name) FROM files
             WHERE {extra_sql}
             GROUP BY size_bytes, LOWER(name)
             HAVING COUNT(*) >= ?"
        ))
        .context("prepare metadata group query")?;
    let mut params: Vec<rusqlite::types::Value> = extra_params.to_vec();
    params.push(rusqlite::types::Value::Integer(min_group_size as i64));
    let keys: Vec<(i64, String)> = group_stmt
        .query_map(rusqlite::params_from_iter(params), |row| {
            Ok((row.get(0)?, row.get(1)?))
        })
        .context("query metadata groups")?
        .collect::<rusqlite::Result<_>>()
        .context("collect metadata groups")?;

    let mut member_stmt = conn
        .prepare("SELECT file_id, path_abs, size_bytes, mtime_utc FROM files WHERE size_bytes = ?1 AND LOWER(name) = ?2")
        .context("prepare metadata member query")?;

    let mut groups = Vec::with_capacity(keys.len());
    for (size, name) in keys {
        let rows = member_stmt
            .query_map(rusqlite::params![size, name], |row| {
                Ok(GroupMember {
                    file_id: row.get(0)?,
                    path: std::path::PathBuf::from(row.get::<_, String>(1)?),
                    size_bytes: row.get::<_, i64>(2)? as u64,
                    mtime_utc: row.get(3)?,
                })
            })
            .context("query metadata group members")?
            .collect::<rusqlite::Result<_>>()
            .context("collect metadata group members")?;
        groups.push(rows);
    }
    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::open_in_memory;

    fn insert_file(conn: &Connection, path: &str, size: i64, quick_hash: Option<&str>, state: &str) {
        conn.execute(
            "INSERT INTO files (path_abs, dir, name, ext, size_bytes, mtime_utc, last_seen_at, quick_hash, state)
             VALUES (?1, '/', ?1, 'bin', ?2, '2024-01-01', '2024-01-01', ?3, ?4)",
            rusqlite::params![path, size, quick_hash, state],
        )
        .unwrap();
    }

    #[test]
    fn quick_hash_candidates_require_more_than_one_member() {
        let conn = open_in_memory().unwrap();
        insert_file(&conn, "/a", 10, Some("h1"), "quick_hashed");
        insert_file(&conn, "/b", 10, Some("h1"), "quick_hashed");
        insert_file(&conn, "/c", 10, Some("h2"), "quick_hashed");
        let n = build_quick_hash_candidates(&conn, &WhereClause::new()).unwrap();
        assert_eq!(n, 2);
    }

    #[test]
    fn metadata_only_groups_match_on_size_and_name() {
        let conn = open_in_memory().unwrap();
        conn.execute(
            "INSERT INTO files (path_abs, dir, name, ext, size_bytes, mtime_utc, last_seen_at, state)
             VALUES ('/x/a.txt', '/x', 'a.txt', 'txt', 5, '2024-01-01', '2024-01-01', 'pending')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO files (path_abs, dir, name, ext, size_bytes, mtime_utc, last_seen_at, state)
             VALUES ('/y/a.txt', '/y', 'a.txt', 'txt', 5, '2024-01-01', '2024-01-01', 'pending')",
            [],
        )
        .unwrap();
        let groups = metadata_only_groups(&conn, 2, &WhereClause::new()).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 2);
    }
}
