// FILE: src/storage/sidecar.rs
//! Sidecar Store
//!
//! Each note `<name>.md` is paired with a hidden `.<name>.md.sidecar` file
//! holding `{ "<name>.md": { "images": [...], "tags": [...] } }`.
//! The older images-only form `{ "<name>.md": [...] }` is still accepted and
//! is migrated to the current form the next time the record is written.

use crate::core::refs::is_plain_filename;
use crate::error::{NoteError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const SIDECAR_SUFFIX: &str = ".sidecar";
const TEMP_SUFFIX: &str = ".tmp";

/// Per-note metadata record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SidecarRecord {
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl SidecarRecord {
    pub fn new(images: Vec<String>, tags: Vec<String>) -> Self {
        Self { images, tags }
    }
}

/// On-disk entry, either format.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SidecarEntry {
    Legacy(Vec<String>),
    Current(SidecarRecord),
}

impl From<SidecarEntry> for SidecarRecord {
    fn from(entry: SidecarEntry) -> Self {
        match entry {
            SidecarEntry::Legacy(images) => SidecarRecord { images, tags: Vec::new() },
            SidecarEntry::Current(record) => record,
        }
    }
}

/// Reads and writes sidecar files inside the permanent directory.
#[derive(Debug, Clone)]
pub struct SidecarStore {
    dir: PathBuf,
}

impl SidecarStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, filename: &str) -> PathBuf {
        self.dir.join(format!(".{}{}", filename, SIDECAR_SUFFIX))
    }

    /// True for sidecar files and their in-flight temporaries.
    pub fn is_sidecar_name(name: &str) -> bool {
        name.starts_with('.') && (name.ends_with(SIDECAR_SUFFIX) || name.ends_with(TEMP_SUFFIX))
    }

    /// Load the record for `filename`. `Ok(None)` when no sidecar exists.
    pub fn read(&self, filename: &str) -> Result<Option<SidecarRecord>> {
        let path = self.path_for(filename);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(NoteError::read(path, e)),
        };

        let mut entries: HashMap<String, SidecarEntry> = serde_json::from_str(&raw)
            .map_err(|e| NoteError::SidecarCorrupt { path: path.clone(), reason: e.to_string() })?;

        let entry = entries.remove(filename).ok_or_else(|| NoteError::SidecarCorrupt {
            path: path.clone(),
            reason: format!("no entry for {}", filename),
        })?;

        let mut record: SidecarRecord = entry.into();
        record.images.retain(|name| {
            let plain = is_plain_filename(name);
            if !plain {
                tracing::warn!("[Sidecar] Ignoring image entry '{}' in {}", name, path.display());
            }
            plain
        });

        tracing::debug!("[Sidecar] Read {}", path.display());
        Ok(Some(record))
    }

    /// Persist `record` for `filename`.
    ///
    /// Written to a temporary sibling first and renamed into place, so a
    /// reader sees either the previous record or the new one.
    pub fn write(&self, filename: &str, record: &SidecarRecord) -> Result<()> {
        let path = self.path_for(filename);
        let temp = self.dir.join(format!(".{}{}{}", filename, SIDECAR_SUFFIX, TEMP_SUFFIX));

        let mut body = BTreeMap::new();
        body.insert(filename, record);
        let json = serde_json::to_string_pretty(&body)?;

        fs::write(&temp, json).map_err(|e| NoteError::write(&temp, e))?;
        if let Err(e) = fs::rename(&temp, &path) {
            let _ = fs::remove_file(&temp);
            return Err(NoteError::write(path, e));
        }

        tracing::debug!("[Sidecar] Wrote {}", path.display());
        Ok(())
    }

    /// Return the existing record, creating one seeded with `default_images`
    /// and no tags if it is missing. A corrupt sidecar is replaced the same way.
    pub fn ensure_exists(&self, filename: &str, default_images: &[String]) -> Result<SidecarRecord> {
        match self.read(filename) {
            Ok(Some(record)) => return Ok(record),
            Ok(None) => {
                tracing::warn!("[Sidecar] No sidecar for {}, creating one", filename);
            }
            Err(NoteError::SidecarCorrupt { path, reason }) => {
                tracing::warn!("[Sidecar] Recreating corrupt sidecar {}: {}", path.display(), reason);
            }
            Err(e) => return Err(e),
        }

        let images = default_images.iter().filter(|n| is_plain_filename(n)).cloned().collect();
        let record = SidecarRecord::new(images, Vec::new());
        self.write(filename, &record)?;
        Ok(record)
    }

    /// Delete the sidecar. `Ok(false)` if there was none.
    pub fn remove(&self, filename: &str) -> Result<bool> {
        let path = self.path_for(filename);
        remove_if_present(&path)
    }
}

/// Remove a file, treating "already gone" as success.
pub(crate) fn remove_if_present(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(NoteError::delete(path, e)),
    }
}
