//! On-disk data directory for the categorizer bundle and override store

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// `$CENTIME_HOME` when set, else `~/.centime`.
pub fn centime_home() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("CENTIME_HOME") {
        return Ok(PathBuf::from(dir));
    }
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".centime"))
}

pub fn ensure_centime_home() -> Result<PathBuf> {
    let dir = centime_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

pub fn model_path() -> Result<PathBuf> {
    Ok(ensure_centime_home()?.join("categorizer.json"))
}

pub fn overrides_path() -> Result<PathBuf> {
    Ok(ensure_centime_home()?.join("overrides.json"))
}
