use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use khata_core::{StatsSummary, Transaction};

pub fn khata_home() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".khata"))
}

pub fn ensure_khata_home() -> Result<PathBuf> {
    let dir = khata_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

/// A normalized upload kept on disk after a persistence failure, so the user
/// can retry without re-uploading the statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingUpload {
    pub month_key: String,
    pub transactions: Vec<Transaction>,
    pub stats: StatsSummary,
}

fn pending_dir() -> Result<PathBuf> {
    let dir = ensure_khata_home()?.join("pending");
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

pub fn pending_path(month_key: &str) -> Result<PathBuf> {
    Ok(pending_dir()?.join(format!("{month_key}.json")))
}

pub fn stash_pending(pending: &PendingUpload) -> Result<PathBuf> {
    let p = pending_path(&pending.month_key)?;
    let json = serde_json::to_string_pretty(pending)?;
    fs::write(&p, json).with_context(|| format!("write {}", p.display()))?;
    Ok(p)
}

pub fn read_pending(month_key: &str) -> Result<Option<PendingUpload>> {
    let p = pending_path(month_key)?;
    if !p.exists() {
        return Ok(None);
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    Ok(Some(serde_json::from_str(&s).with_context(|| format!("parse {}", p.display()))?))
}

pub fn clear_pending(month_key: &str) -> Result<()> {
    let p = pending_path(month_key)?;
    if p.exists() {
        fs::remove_file(&p).with_context(|| format!("remove {}", p.display()))?;
    }
    Ok(())
}
