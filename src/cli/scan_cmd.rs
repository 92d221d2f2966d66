use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use crate::cli::Cli;
use crate::config::CatalogConfig;
use crate::scan::{ScanOptions, scan_root};

#[derive(Args, Clone)]
pub struct ScanArgs {
    /// Directory tree to walk. Repeatable; each root is scanned in turn.
    #[arg(long = "root")]
    pub roots: Vec<PathBuf>,

    /// Glob pattern to exclude, matched against file name and full path. Repeatable.
    #[arg(long = "exclude")]
    pub exclude: Vec<String>,

    /// Only catalog files with one of these extensions (without the dot). Repeatable.
    #[arg(long = "ext")]
    pub include_ext: Vec<String>,

    /// Follow symlinks while walking.
    #[arg(long = "follow-links")]
    pub follow_symlinks: bool,

    /// Create the catalog encrypted (SQLCipher) if it does not already exist.
    #[arg(long)]
    pub encrypt: bool,
}

pub fn run(
    args: ScanArgs,
    cli: &Cli,
    cfg: &CatalogConfig,
    cancel_flag: std::sync::Arc<std::sync::atomic::AtomicBool>,
) -> Result<()> {
    let db_path = super::resolve_db_path(cli, cfg);
    let dir = db_path.parent().unwrap_or(std::path::Path::new(".")).to_path_buf();
    std::fs::create_dir_all(&dir)?;

    let mut conn = super::open_catalog(&db_path, &dir, args.encrypt)?;

    let roots = if args.roots.is_empty() {
        cfg.roots.clone()
    } else {
        args.roots
    };
    if roots.is_empty() {
        return Err(crate::error::CatalogError::Configuration(
            "no scan root given on the command line or in the config file".to_string(),
        )
        .into());
    }

    let exclude = if args.exclude.is_empty() {
        cfg.exclude_paths.clone()
    } else {
        args.exclude
    };
    let include_ext = if args.include_ext.is_empty() {
        cfg.include_ext.clone()
    } else {
        args.include_ext
    };

    let mut total = crate::scan::ScanStats::default();
    for root in roots {
        let root = root.canonicalize().unwrap_or(root);
        let opts = ScanOptions {
            root,
            db_path: db_path.clone(),
            exclude_patterns: exclude.clone(),
            include_ext: include_ext.clone(),
            follow_symlinks: args.follow_symlinks,
        };
        let stats = scan_root(&mut conn, &opts, cancel_flag.clone())?;
        log::info!(
            "{}: {} seen, {} inserted, {} updated, {} marked missing",
            opts.root.display(),
            stats.files_seen,
            stats.files_inserted,
            stats.files_updated,
            stats.files_marked_missing
        );
        total.files_seen += stats.files_seen;
        total.files_inserted += stats.files_inserted;
        total.files_updated += stats.files_updated;
        total.files_marked_missing += stats.files_marked_missing;
    }

    println!("{}", serde_json::to_string_pretty(&total)?);
    Ok(())
}
