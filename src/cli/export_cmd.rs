use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};

use crate::cli::Cli;
use crate::config::CatalogConfig;
use crate::store::WhereClause;

#[derive(Clone, Copy, ValueEnum)]
pub enum ExportFormat {
    Json,
    Csv,
}

#[derive(Args, Clone)]
pub struct ExportArgs {
    /// Destination file. Defaults to stdout.
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// JSON Lines (one row object per line) or CSV.
    #[arg(long, value_enum, default_value = "json")]
    pub format: ExportFormat,

    /// Restrict to paths starting with this prefix. Repeatable.
    #[arg(long)]
    pub include_prefix: Vec<String>,

    /// Skip paths starting with this prefix. Repeatable.
    #[arg(long)]
    pub exclude_prefix: Vec<String>,
}

struct FileRow {
    file_id: i64,
    path_abs: String,
    size_bytes: i64,
    mtime_utc: String,
    state: String,
    quick_hash: Option<String>,
    sha256: Option<String>,
    blake3: Option<String>,
}

pub fn run(args: ExportArgs, cli: &Cli, cfg: &CatalogConfig) -> Result<()> {
    let db_path = super::resolve_db_path(cli, cfg);
    let dir = db_path.parent().unwrap_or(std::path::Path::new(".")).to_path_buf();
    let conn = super::open_existing_catalog(&db_path, &dir)?;

    let where_clause = WhereClause::new().path_prefixes("path_abs", &args.include_prefix, &args.exclude_prefix);
    let (extra_sql, extra_params) = where_clause.render();
    let mut stmt = conn
        .prepare(&format!(
            "SELECT file_id, path_abs, size_bytes, mtime_utc, state, quick_hash, sha256, blake3
             FROM files WHERE {extra_sql} ORDER BY file_id"
        ))
        .context("prepare export query")?;
    let rows: Vec<FileRow> = stmt
        .query_map(rusqlite::params_from_iter(extra_params), |row| {
            Ok(FileRow {
                file_id: row.get(0)?,
                path_abs: row.get(1)?,
                size_bytes: row.get(2)?,
                mtime_utc: row.get(3)?,
                state: row.get(4)?,
                quick_hash: row.get(5)?,
                sha256: row.get(6)?,
                blake3: row.get(7)?,
            })
        })
        .context("query export rows")?
        .collect::<rusqlite::Result<_>>()
        .context("collect export rows")?;

    let mut out: Box<dyn Write> = match &args.out {
        Some(path) => Box::new(
            std::fs::File::create(path).with_context(|| format!("create {}", path.display()))?,
        ),
        None => Box::new(std::io::stdout()),
    };

    match args.format {
        ExportFormat::Json => {
            for r in &rows {
                let line = serde_json::json!({
                    "file_id": r.file_id,
                    "path": r.path_abs,
                    "size_bytes": r.size_bytes,
                    "mtime_utc": r.mtime_utc,
                    "state": r.state,
                    "quick_hash": r.quick_hash,
                    "sha256": r.sha256,
                    "blake3": r.blake3,
                });
                writeln!(out, "{line}")?;
            }
        }
        ExportFormat::Csv => {
            writeln!(out, "file_id,path,size_bytes,mtime_utc,state,quick_hash,sha256,blake3")?;
            for r in &rows {
                writeln!(
                    out,
                    "{},{},{},{},{},{},{},{}",
                    r.file_id,
                    csv_escape(&r.path_abs),
                    r.size_bytes,
                    r.mtime_utc,
                    r.state,
                    r.quick_hash.as_deref().unwrap_or(""),
                    r.sha256.as_deref().unwrap_or(""),
                    r.blake3.as_deref().unwrap_or(""),
                )?;
            }
        }
    }

    Ok(())
}

fn csv_escape(s: &str) -> String {
    if s.contains(',') || s.contains('"') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
