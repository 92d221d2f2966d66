//! Passphrase loading for an encrypted catalog: env var -> .env next to the catalog -> secure prompt.

use anyhow::{Context, Result};
use colored::Colorize;
use log::{info, warn};
use std::path::Path;

const ENV_KEY: &str = "FILECAT_DB_KEY";

fn try_env_then_dotenv(dir: &Path) -> Option<String> {
    if let Ok(s) = std::env::var(ENV_KEY) {
        let s = s.trim().to_string();
        if !s.is_empty() {
            return Some(s);
        }
    }
    let env_path = dir.join(".env");
    if env_path.is_file() {
        let _ = dotenvy::from_path(&env_path);
        if let Ok(s) = std::env::var(ENV_KEY) {
            let s = s.trim().to_string();
            if !s.is_empty() {
                return Some(s);
            }
        }
    }
    None
}

/// Resolve a passphrase: env (`FILECAT_DB_KEY`) -> `.env` in `dir` -> interactive secure prompt.
/// `is_new` selects the prompt wording for creating a fresh encrypted catalog.
pub fn get_passphrase(dir: &Path, is_new: bool) -> Result<String> {
    if let Some(s) = try_env_then_dotenv(dir) {
        info!("catalog passphrase found in environment");
        return Ok(s);
    }
    let label = format!("[{}]", env!("CARGO_PKG_NAME")).cyan().bold();
    let prompt = if is_new {
        "Create new catalog passphrase: "
    } else {
        "Enter catalog passphrase: "
    };
    let pass =
        rpassword::prompt_password(format!("{} {}", label, prompt)).context("read passphrase")?;
    if is_new {
        warn!("lost passphrase means lost access to this catalog");
    }
    Ok(pass.trim().to_string())
}
