//! Layered configuration: built-in defaults < on-disk TOML document < CLI flag overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::consts::{DedupeDefaults, ScannerDefaults};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    pub max_workers: usize,
    pub io_chunk_bytes: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            max_workers: ScannerDefaults::MAX_WORKERS,
            io_chunk_bytes: ScannerDefaults::IO_CHUNK_BYTES,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DedupeConfig {
    pub enabled: bool,
    pub max_workers: usize,
    pub small_file_threshold: u64,
    pub min_file_size: u64,
    pub min_duplicate_count: u64,
    pub quick_hash_bytes: usize,
    pub sha_chunk_bytes: usize,
}

impl Default for DedupeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_workers: DedupeDefaults::MAX_WORKERS,
            small_file_threshold: DedupeDefaults::SMALL_FILE_THRESHOLD,
            min_file_size: DedupeDefaults::MIN_FILE_SIZE,
            min_duplicate_count: DedupeDefaults::MIN_DUPLICATE_COUNT,
            quick_hash_bytes: DedupeDefaults::QUICK_HASH_BYTES,
            sha_chunk_bytes: DedupeDefaults::SHA_CHUNK_BYTES,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    pub path: PathBuf,
    pub journal_mode: String,
    pub synchronous: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/catalog.db"),
            journal_mode: "WAL".to_string(),
            synchronous: "NORMAL".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub parquet_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub roots: Vec<PathBuf>,
    pub include_ext: Vec<String>,
    pub exclude_paths: Vec<String>,
    pub scanner: ScannerConfig,
    pub dedupe: DedupeConfig,
    pub db: DbConfig,
    pub export: ExportConfig,
}

/// Load a TOML config document from `path`. Missing file is not an error: callers that pass
/// no `--config` flag fall back to built-in defaults entirely.
pub fn load_config(path: &Path) -> anyhow::Result<CatalogConfig> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("read config {}: {}", path.display(), e))?;
    let cfg: CatalogConfig = toml::from_str(&text)
        .map_err(|e| anyhow::anyhow!("parse config {}: {}", path.display(), e))?;
    Ok(cfg)
}

/// Discover `.catalog.toml` in `dir`, loading it if present. Returns defaults otherwise.
pub fn load_or_default(dir: &Path) -> CatalogConfig {
    let path = dir.join(".catalog.toml");
    if path.is_file() {
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => log::warn!("{}: {}", path.display(), e),
        }
    }
    CatalogConfig::default()
}
