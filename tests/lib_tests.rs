//! End-to-end tests for the staged dedupe pipeline and the pruner, run against an
//! in-memory catalog seeded directly (bypassing the walker so the test stays fast).

use filecat::hashing::full::HashAlgorithm;
use filecat::pipeline::dedupe::{DedupeOptions, detect_duplicates};
use filecat::pruner::{PruneOptions, prune_duplicates};
use filecat::store;
use filecat::store::WhereClause;
use filecat::types::KeepPolicy;
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tempfile::TempDir;

fn write_file(dir: &std::path::Path, name: &str, content: &[u8]) -> std::path::PathBuf {
    let path = dir.join(name);
    let mut f = std::fs::File::create(&path).unwrap();
    f.write_all(content).unwrap();
    path
}

fn insert_pending(conn: &rusqlite::Connection, path: &std::path::Path) {
    let meta = std::fs::metadata(path).unwrap();
    conn.execute(
        "INSERT INTO files (path_abs, dir, name, ext, size_bytes, mtime_utc, last_seen_at, state)
         VALUES (?1, ?2, ?3, ?4, ?5, '2024-01-01', '2024-01-01', 'pending')",
        rusqlite::params![
            path.to_string_lossy(),
            path.parent().unwrap().to_string_lossy(),
            path.file_name().unwrap().to_string_lossy(),
            path.extension().map(|e| e.to_string_lossy().to_string()),
            meta.len() as i64,
        ],
    )
    .unwrap();
}

fn default_opts() -> DedupeOptions {
    DedupeOptions {
        algo: HashAlgorithm::Blake3,
        mirror_to_sha256: false,
        progressive: false,
        metadata_only: false,
        min_file_size: 0,
        min_duplicate_count: 2,
        quick_hash_bytes: 65_536,
        sha_chunk_bytes: 65_536,
        sample_bytes: 4_096,
        rate_limit_bytes_per_sec: None,
        where_clause: WhereClause::new(),
    }
}

#[test]
fn detects_duplicate_group_by_full_hash() {
    let tmp = TempDir::new().unwrap();
    let payload: &[u8] = b"duplicate content here";
    let a = write_file(tmp.path(), "a.bin", payload);
    let b = write_file(tmp.path(), "b.bin", payload);
    let c = write_file(tmp.path(), "c.bin", b"different content entirely");

    let conn = store::open_in_memory().unwrap();
    insert_pending(&conn, &a);
    insert_pending(&conn, &b);
    insert_pending(&conn, &c);

    let cancel = Arc::new(AtomicBool::new(false));
    let stats = detect_duplicates(&conn, cancel, &default_opts()).unwrap();

    assert_eq!(stats.duplicate_groups, 1);
    assert_eq!(stats.duplicate_files, 2);
    assert_eq!(stats.wasted_bytes, payload.len() as u64);
}

#[test]
fn progressive_sampling_still_finds_duplicates() {
    let tmp = TempDir::new().unwrap();
    let payload = vec![b'x'; 20_000];
    let a = write_file(tmp.path(), "a.bin", &payload);
    let b = write_file(tmp.path(), "b.bin", &payload);

    let conn = store::open_in_memory().unwrap();
    insert_pending(&conn, &a);
    insert_pending(&conn, &b);

    let mut opts = default_opts();
    opts.progressive = true;
    opts.sample_bytes = 256;

    let cancel = Arc::new(AtomicBool::new(false));
    let stats = detect_duplicates(&conn, cancel, &opts).unwrap();
    assert_eq!(stats.duplicate_groups, 1);
    assert_eq!(stats.duplicate_files, 2);
}

#[test]
fn metadata_only_never_writes_a_hash_column() {
    let tmp = TempDir::new().unwrap();
    let a = write_file(tmp.path(), "same.bin", b"aaa");
    let b = write_file(tmp.path(), "same.bin", b"aaa");
    // distinguish paths by directory, same name+size
    let dir2 = tmp.path().join("sub");
    std::fs::create_dir_all(&dir2).unwrap();
    let b2 = dir2.join("same.bin");
    std::fs::rename(&b, &b2).unwrap();

    let conn = store::open_in_memory().unwrap();
    insert_pending(&conn, &a);
    insert_pending(&conn, &b2);

    let mut opts = default_opts();
    opts.metadata_only = true;
    let cancel = Arc::new(AtomicBool::new(false));
    let stats = detect_duplicates(&conn, cancel, &opts).unwrap();
    assert_eq!(stats.duplicate_groups, 1);

    let hashed: i64 = conn
        .query_row("SELECT COUNT(*) FROM files WHERE blake3 IS NOT NULL", [], |r| r.get(0))
        .unwrap();
    assert_eq!(hashed, 0);
}

#[test]
fn prune_keeps_oldest_and_removes_the_rest() {
    let tmp = TempDir::new().unwrap();
    let a = write_file(tmp.path(), "a.bin", b"duplicate payload");
    let b = write_file(tmp.path(), "b.bin", b"duplicate payload");

    let mut conn = store::open_in_memory().unwrap();
    insert_pending(&conn, &a);
    insert_pending(&conn, &b);
    conn.execute(
        "UPDATE files SET mtime_utc = '2020-01-01' WHERE path_abs = ?1",
        [a.to_string_lossy().to_string()],
    )
    .unwrap();
    conn.execute(
        "UPDATE files SET mtime_utc = '2024-01-01' WHERE path_abs = ?1",
        [b.to_string_lossy().to_string()],
    )
    .unwrap();

    let cancel = Arc::new(AtomicBool::new(false));
    detect_duplicates(&conn, cancel, &default_opts()).unwrap();

    let prune_opts = PruneOptions {
        policy: KeepPolicy::Oldest,
        dry_run: false,
        delete_from_disk: true,
        min_group_size: 2,
        min_file_size: 0,
    };
    let stats = prune_duplicates(&mut conn, HashAlgorithm::Blake3.column(), &prune_opts).unwrap();

    assert_eq!(stats.files_removed, 1);
    assert!(a.exists());
    assert!(!b.exists());
}

#[test]
fn prune_dry_run_leaves_disk_and_catalog_untouched() {
    let tmp = TempDir::new().unwrap();
    let a = write_file(tmp.path(), "a.bin", b"duplicate payload");
    let b = write_file(tmp.path(), "b.bin", b"duplicate payload");

    let mut conn = store::open_in_memory().unwrap();
    insert_pending(&conn, &a);
    insert_pending(&conn, &b);

    let cancel = Arc::new(AtomicBool::new(false));
    detect_duplicates(&conn, cancel, &default_opts()).unwrap();

    let prune_opts = PruneOptions {
        policy: KeepPolicy::Oldest,
        dry_run: true,
        delete_from_disk: true,
        min_group_size: 2,
        min_file_size: 0,
    };
    let stats = prune_duplicates(&mut conn, HashAlgorithm::Blake3.column(), &prune_opts).unwrap();
    assert_eq!(stats.files_removed, 1);
    assert!(a.exists());
    assert!(b.exists());

    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM files", [], |r| r.get(0))
        .unwrap();
    assert_eq!(count, 2);
}
