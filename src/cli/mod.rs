//! Command-line surface: `scan`, `hash`, `dedupe`, `export`, each a thin translation from
//! flags to the corresponding library call (§6).

mod dedupe_cmd;
mod export_cmd;
mod hash_cmd;
mod scan_cmd;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "filecat", version, about = "Catalogs a filesystem tree and finds duplicate files.")]
pub struct Cli {
    /// Increase log verbosity. Repeatable (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to the SQLite catalog. Defaults to `data/catalog.db` or the config file's value.
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Path to a `.catalog.toml` config document. Defaults to discovering one in the cwd.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Walk a directory tree and seed or refresh catalog rows.
    Scan(scan_cmd::ScanArgs),
    /// Compute BLAKE3 for every catalog row (or every row still missing one).
    Hash(hash_cmd::HashArgs),
    /// Run the staged hashing pipeline and report duplicate groups.
    Dedupe(dedupe_cmd::DedupeArgs),
    /// Export catalog rows or duplicate-group reports to JSON/CSV.
    Export(export_cmd::ExportArgs),
}

/// `--db` overrides the config file's `db.path`, which itself defaults to `data/catalog.db`.
fn resolve_db_path(cli: &Cli, cfg: &crate::config::CatalogConfig) -> PathBuf {
    cli.db.clone().unwrap_or_else(|| cfg.db.path.clone())
}

/// Open the catalog at `path`, creating it if absent. Only `scan` (the seeding operation)
/// should use this. `encrypt` requests a fresh passphrase for a brand-new catalog; an
/// existing catalog's encryption is auto-detected.
fn open_catalog(path: &PathBuf, dir: &std::path::Path, encrypt: bool) -> Result<rusqlite::Connection> {
    if path.is_file() {
        let (conn, _pass) = crate::store::open_or_detect_encrypted(path, dir)?;
        return Ok(conn);
    }
    if encrypt {
        let pass = crate::passphrase::get_passphrase(dir, true)?;
        return Ok(crate::store::open(path, Some(pass.as_str()))?);
    }
    Ok(crate::store::open(path, None)?)
}

/// Open a catalog that must already exist, refusing with a `Configuration` error otherwise
/// (§7 taxonomy item 1). `hash` and `dedupe` read and mutate an existing catalog; neither
/// should silently conjure an empty one the way `scan`'s seeding helper does.
fn open_existing_catalog(path: &PathBuf, dir: &std::path::Path) -> Result<rusqlite::Connection> {
    if !path.is_file() {
        return Err(crate::error::CatalogError::Configuration(format!(
            "catalog database not found at {}",
            path.display()
        ))
        .into());
    }
    let (conn, _pass) = crate::store::open_or_detect_encrypted(path, dir)?;
    Ok(conn)
}

pub fn run(cli: Cli, cancel_flag: std::sync::Arc<std::sync::atomic::AtomicBool>) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let cfg_path = cli.config.clone();
    let cfg = match cfg_path {
        Some(path) => crate::config::load_config(&path)?,
        None => crate::config::load_or_default(&cwd),
    };

    match &cli.command {
        Commands::Scan(args) => scan_cmd::run(args.clone(), &cli, &cfg, cancel_flag),
        Commands::Hash(args) => hash_cmd::run(args.clone(), &cli, &cfg, cancel_flag),
        Commands::Dedupe(args) => dedupe_cmd::run(args.clone(), &cli, &cfg, cancel_flag),
        Commands::Export(args) => export_cmd::run(args.clone(), &cli, &cfg),
    }
}
