use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use anyhow::Result;
use clap::{Args, ValueEnum};

use crate::cli::Cli;
use crate::config::CatalogConfig;
use crate::hashing::full::HashAlgorithm;
use crate::pipeline::dedupe::{HashAllOptions, hash_all};
use crate::store::WhereClause;

#[derive(Clone, Copy, ValueEnum)]
pub enum HashAlgoArg {
    Blake3,
    Sha256,
}

impl From<HashAlgoArg> for HashAlgorithm {
    fn from(a: HashAlgoArg) -> Self {
        match a {
            HashAlgoArg::Blake3 => HashAlgorithm::Blake3,
            HashAlgoArg::Sha256 => HashAlgorithm::Sha256,
        }
    }
}

/// `hash` always confirms with BLAKE3; recompute already-hashed rows with `--force`.
#[derive(Args, Clone)]
pub struct HashArgs {
    /// Recompute even rows that already carry a digest.
    #[arg(long)]
    pub force: bool,

    #[arg(long)]
    pub max_workers: Option<usize>,

    /// Restrict to paths starting with this prefix. Repeatable.
    #[arg(long)]
    pub include_prefix: Vec<String>,

    /// Skip paths starting with this prefix. Repeatable.
    #[arg(long)]
    pub exclude_prefix: Vec<String>,

    #[arg(long)]
    pub io_bytes_per_sec: Option<u64>,

    #[arg(long, default_value_t = crate::consts::DedupeDefaults::SHA_CHUNK_BYTES)]
    pub chunk_bytes: usize,

    /// Also compute SHA-256 for every row and cross-check agreement.
    #[arg(long)]
    pub mirror_to_sha256: bool,
}

pub fn run(args: HashArgs, cli: &Cli, cfg: &CatalogConfig, cancel_flag: Arc<AtomicBool>) -> Result<()> {
    let db_path = super::resolve_db_path(cli, cfg);
    let dir = db_path.parent().unwrap_or(std::path::Path::new(".")).to_path_buf();
    let conn = super::open_existing_catalog(&db_path, &dir)?;

    let where_clause = WhereClause::new().path_prefixes("path_abs", &args.include_prefix, &args.exclude_prefix);

    let max_workers = args.max_workers.unwrap_or(cfg.dedupe.max_workers);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(max_workers)
        .build()
        .map_err(|e| crate::error::CatalogError::Configuration(format!("build worker pool: {e}")))?;

    let opts = HashAllOptions {
        algo: HashAlgorithm::Blake3,
        force: args.force,
        mirror_to_sha256: args.mirror_to_sha256,
        chunk_bytes: args.chunk_bytes,
        rate_limit_bytes_per_sec: args.io_bytes_per_sec,
        where_clause,
    };

    let summary = pool.in_place_scope(|_| hash_all(&conn, cancel_flag, &opts))?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
