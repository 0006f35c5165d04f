// FILE: src/config.rs
//! Runtime configuration: where notes and staged media live, how long an
//! exported archive survives and how chatty the logs are.

use crate::core::MediaDirs;
use crate::error::{NoteError, Result};
use crate::storage::archive::DEFAULT_ARCHIVE_TTL;
use crate::tags::DEFAULT_PALETTE;
use clap::Args;
use std::path::PathBuf;
use std::time::Duration;

const APP_DIR: &str = "notestash";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub notes_dir: PathBuf,
    pub staging_dir: PathBuf,
    pub archive_ttl: Duration,
    pub log_level: String,
    pub palette: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        let base = default_base_dir();
        Self {
            notes_dir: base.join("notes"),
            staging_dir: base.join("temp"),
            archive_ttl: DEFAULT_ARCHIVE_TTL,
            log_level: "info".to_string(),
            palette: DEFAULT_PALETTE.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// `<data dir>/notestash`, or the current directory if the platform has none.
fn default_base_dir() -> PathBuf {
    match dirs::data_dir() {
        Some(dir) => dir.join(APP_DIR),
        None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

impl Config {
    /// Both directories rooted at `base`, everything else default.
    pub fn rooted_at(base: impl Into<PathBuf>) -> Self {
        let base = base.into();
        Self {
            notes_dir: base.join("notes"),
            staging_dir: base.join("temp"),
            ..Self::default()
        }
    }

    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [&self.notes_dir, &self.staging_dir] {
            std::fs::create_dir_all(dir).map_err(|e| NoteError::write(dir, e))?;
        }
        Ok(())
    }

    pub fn media_dirs(&self) -> Result<MediaDirs> {
        MediaDirs::new(self.notes_dir.clone(), self.staging_dir.clone())
    }
}

/// Command-line overrides, each with an environment fallback.
#[derive(Debug, Clone, Default, Args)]
pub struct ConfigArgs {
    /// Directory holding notes, sidecars and promoted media
    #[arg(long, global = true, env = "NOTESTASH_NOTES_DIR")]
    pub notes_dir: Option<PathBuf>,

    /// Directory for uploads that have not been saved yet
    #[arg(long, global = true, env = "NOTESTASH_STAGING_DIR")]
    pub staging_dir: Option<PathBuf>,

    /// Seconds an exported archive is kept before deletion
    #[arg(long, global = true, env = "NOTESTASH_ARCHIVE_TTL_SECS")]
    pub archive_ttl_secs: Option<u64>,

    /// Default log filter; RUST_LOG takes precedence
    #[arg(long, global = true, env = "NOTESTASH_LOG")]
    pub log_level: Option<String>,

    /// Tag colors (comma-separated)
    #[arg(long, global = true, value_delimiter = ',', env = "NOTESTASH_PALETTE")]
    pub palette: Vec<String>,
}

impl ConfigArgs {
    pub fn into_config(self) -> Config {
        let mut config = Config::default();
        if let Some(dir) = self.notes_dir {
            config.notes_dir = dir;
        }
        if let Some(dir) = self.staging_dir {
            config.staging_dir = dir;
        }
        if let Some(secs) = self.archive_ttl_secs {
            config.archive_ttl = Duration::from_secs(secs);
        }
        if let Some(level) = self.log_level {
            config.log_level = level;
        }
        let palette: Vec<String> = self
            .palette
            .into_iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
        if !palette.is_empty() {
            config.palette = palette;
        }
        config
    }
}
