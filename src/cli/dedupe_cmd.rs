use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use anyhow::Result;
use clap::Args;

use crate::cli::Cli;
use crate::cli::hash_cmd::HashAlgoArg;
use crate::config::CatalogConfig;
use crate::consts::{DedupeDefaults, DEFAULT_REPORT_LIMIT};
use crate::error::CatalogError;
use crate::hashing::full::HashAlgorithm;
use crate::pipeline::dedupe::{DedupeOptions, detect_duplicates};
use crate::pruner::{PruneOptions, prune_duplicates};
use crate::store::{WhereClause, candidates};
use crate::types::KeepPolicy;

#[derive(Args, Clone)]
pub struct DedupeArgs {
    #[arg(long, value_enum, default_value = "blake3")]
    pub algo: HashAlgoArg,

    /// Also compute SHA-256 for every BLAKE3 candidate and cross-check group agreement.
    #[arg(long)]
    pub mirror_to_sha256: bool,

    /// Narrow candidates with a progressive head/tail sample before the full hash.
    #[arg(long)]
    pub progressive: bool,

    /// Group by `(size, name)` only; never computes or writes a hash, never feeds `--prune`.
    #[arg(long)]
    pub metadata_only: bool,

    #[arg(long)]
    pub min_file_size: Option<u64>,

    #[arg(long)]
    pub min_duplicate_count: Option<u64>,

    #[arg(long)]
    pub rate_limit_mb_s: Option<f64>,

    /// Shrink worker count, sample sizes, and chunk sizes for a slow network mount (§4.6).
    #[arg(long)]
    pub network_friendly: bool,

    /// After detection, delete all but one member of every confirmed group.
    #[arg(long)]
    pub prune: bool,

    #[arg(long, value_enum, default_value = "oldest")]
    pub keep: KeepArg,

    /// Plan deletions and print them without touching disk or the catalog.
    #[arg(long)]
    pub dry_run: bool,

    /// With `--prune`, also remove the file from disk (not just the catalog row).
    #[arg(long)]
    pub delete_from_disk: bool,

    /// With `--prune`, copy the catalog file aside before any deletion runs.
    #[arg(long)]
    pub backup_before_prune: bool,

    #[arg(long, default_value_t = DEFAULT_REPORT_LIMIT)]
    pub report_limit: usize,

    /// Restrict candidates to paths starting with this prefix. Repeatable.
    #[arg(long)]
    pub include_prefix: Vec<String>,

    /// Skip paths starting with this prefix. Repeatable.
    #[arg(long)]
    pub exclude_prefix: Vec<String>,

    /// Skip the interactive confirmation prompt before `--prune` deletes anything.
    #[arg(long)]
    pub no_confirm: bool,
}

#[derive(Clone, Copy, clap::ValueEnum)]
pub enum KeepArg {
    Oldest,
    Newest,
}

impl From<KeepArg> for KeepPolicy {
    fn from(k: KeepArg) -> Self {
        match k {
            KeepArg::Oldest => KeepPolicy::Oldest,
            KeepArg::Newest => KeepPolicy::Newest,
        }
    }
}

pub fn run(args: DedupeArgs, cli: &Cli, cfg: &CatalogConfig, cancel_flag: Arc<AtomicBool>) -> Result<()> {
    if args.metadata_only && args.prune {
        return Err(CatalogError::Configuration(
            "--metadata-only never computes a verified hash and cannot feed --prune".to_string(),
        )
        .into());
    }

    let db_path = super::resolve_db_path(cli, cfg);
    let dir = db_path.parent().unwrap_or(std::path::Path::new(".")).to_path_buf();
    let mut conn = super::open_existing_catalog(&db_path, &dir)?;

    let algo: HashAlgorithm = args.algo.into();
    let min_file_size = args.min_file_size.unwrap_or(cfg.dedupe.min_file_size);
    let min_duplicate_count = args.min_duplicate_count.unwrap_or(DedupeDefaults::MIN_DUPLICATE_COUNT);

    let (quick_hash_bytes, sha_chunk_bytes, sample_bytes, max_workers) = if args.network_friendly {
        (
            DedupeDefaults::NETWORK_QUICK_HASH_BYTES,
            DedupeDefaults::NETWORK_SHA_CHUNK_BYTES,
            DedupeDefaults::NETWORK_SAMPLE_BYTES,
            DedupeDefaults::NETWORK_MAX_WORKERS,
        )
    } else {
        (
            cfg.dedupe.quick_hash_bytes,
            cfg.dedupe.sha_chunk_bytes,
            DedupeDefaults::SAMPLE_BYTES,
            cfg.dedupe.max_workers,
        )
    };

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(max_workers)
        .build()
        .map_err(|e| CatalogError::Configuration(format!("build worker pool: {e}")))?;

    let where_clause = WhereClause::new().path_prefixes("path_abs", &args.include_prefix, &args.exclude_prefix);

    let opts = DedupeOptions {
        algo,
        mirror_to_sha256: args.mirror_to_sha256,
        progressive: args.progressive,
        metadata_only: args.metadata_only,
        min_file_size,
        min_duplicate_count,
        quick_hash_bytes,
        sha_chunk_bytes,
        sample_bytes,
        rate_limit_bytes_per_sec: args.rate_limit_mb_s.map(|mb| (mb * 1_048_576.0) as u64),
        where_clause: where_clause.clone(),
    };

    let stats = pool.in_place_scope(|_| detect_duplicates(&conn, cancel_flag.clone(), &opts))?;
    println!("{}", serde_json::to_string_pretty(&stats)?);

    if args.metadata_only {
        let groups = candidates::metadata_only_groups(&conn, min_duplicate_count, &where_clause)?;
        print_metadata_groups(&groups, args.report_limit);
        return Ok(());
    }

    if args.prune {
        // A preview always runs first, even in execute mode, so the confirmation prompt
        // (and --no-confirm) is answered against the actual plan, not a blind guess.
        let preview_opts = PruneOptions {
            policy: args.keep.into(),
            dry_run: true,
            delete_from_disk: args.delete_from_disk,
            min_group_size: min_duplicate_count,
            min_file_size,
        };
        let preview = prune_duplicates(&mut conn, algo.column(), &preview_opts)?;
        println!("{}", serde_json::to_string_pretty(&preview)?);

        if args.dry_run {
            return Ok(());
        }
        if preview.files_removed == 0 {
            return Ok(());
        }
        if !args.no_confirm && !confirm_prune(preview.files_removed)? {
            log::info!("prune cancelled by user");
            return Ok(());
        }
        if args.backup_before_prune {
            let backup_path = db_path.with_extension("db.bak");
            crate::store::backup_to_file(&mut conn, &backup_path)?;
            log::info!("catalog backed up to {}", backup_path.display());
        }
        let prune_opts = PruneOptions {
            policy: args.keep.into(),
            dry_run: false,
            delete_from_disk: args.delete_from_disk,
            min_group_size: min_duplicate_count,
            min_file_size,
        };
        let prune_stats = prune_duplicates(&mut conn, algo.column(), &prune_opts)?;
        println!("{}", serde_json::to_string_pretty(&prune_stats)?);
    }

    Ok(())
}

fn confirm_prune(files_removed: u64) -> Result<bool> {
    use std::io::Write;
    print!("delete {files_removed} file(s) per the plan above? [y/N] ");
    std::io::stdout().flush().ok();
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(matches!(line.trim().to_lowercase().as_str(), "y" | "yes"))
}

fn print_metadata_groups(groups: &[Vec<crate::types::GroupMember>], limit: usize) {
    for g in groups.iter().take(limit) {
        println!("--- metadata-only group ({} files) ---", g.len());
        for m in g {
            println!("  {}", m.path.display());
        }
    }
}
