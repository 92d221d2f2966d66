//! Integration tests against a real temp-file catalog: schema creation, scan seeding,
//! and the candidate-set queries end to end.

use filecat::scan::{ScanOptions, scan_root};
use filecat::store;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tempfile::TempDir;

fn write_file(dir: &std::path::Path, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(name);
    let mut f = std::fs::File::create(&path).unwrap();
    f.write_all(content).unwrap();
    path
}

#[test]
fn open_creates_schema_with_wal_journal() {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("catalog.db");
    let conn = store::open(&db_path, None).unwrap();
    let count = store::count_files(&conn).unwrap();
    assert_eq!(count, 0);

    let mode: String = conn
        .query_row("PRAGMA journal_mode", [], |r| r.get(0))
        .unwrap();
    assert_eq!(mode.to_lowercase(), "wal");
}

#[test]
fn scan_root_inserts_rows_and_marks_vanished_files_missing() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("data");
    std::fs::create_dir_all(&root).unwrap();
    write_file(&root, "a.txt", b"hello world");
    write_file(&root, "b.txt", b"hello world");
    let keep_path = write_file(&root, "keep.txt", b"unique contents");

    let db_path = tmp.path().join("catalog.db");
    let mut conn = store::open(&db_path, None).unwrap();
    let cancel = Arc::new(AtomicBool::new(false));

    let opts = ScanOptions {
        root: root.clone(),
        db_path: db_path.clone(),
        exclude_patterns: vec![],
        include_ext: vec![],
        follow_symlinks: false,
    };
    let stats = scan_root(&mut conn, &opts, cancel.clone()).unwrap();
    assert_eq!(stats.files_seen, 3);
    assert_eq!(stats.files_inserted, 3);

    std::fs::remove_file(&keep_path).unwrap();
    let second = scan_root(&mut conn, &opts, cancel).unwrap();
    assert_eq!(second.files_seen, 2);
    assert_eq!(second.files_marked_missing, 1);

    let missing: i64 = conn
        .query_row("SELECT COUNT(*) FROM files WHERE state = 'missing'", [], |r| r.get(0))
        .unwrap();
    assert_eq!(missing, 1);
}

#[test]
fn scan_root_skips_excluded_glob() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("data");
    std::fs::create_dir_all(&root).unwrap();
    write_file(&root, "keep.rs", b"fn main() {}");
    write_file(&root, "ignore.log", b"log line");

    let db_path = tmp.path().join("catalog.db");
    let mut conn = store::open(&db_path, None).unwrap();
    let cancel = Arc::new(AtomicBool::new(false));

    let opts = ScanOptions {
        root: root.clone(),
        db_path,
        exclude_patterns: vec!["*.log".to_string()],
        include_ext: vec![],
        follow_symlinks: false,
    };
    let stats = scan_root(&mut conn, &opts, cancel).unwrap();
    assert_eq!(stats.files_seen, 1);
}
