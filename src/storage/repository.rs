// FILE: src/storage/repository.rs
//! Note Repository
//!
//! Owns the permanent directory: scanning it into `Note` records and
//! performing create / edit / delete / rename so that a note's text, its
//! sidecar and its media files stay consistent.
//!
//! Write ordering rules:
//! - the note text is written before the sidecar, and a failed sidecar write
//!   on create removes the fresh note file again;
//! - orphaned media are deleted only after both text and sidecar are written;
//! - cleanup of media and sidecars is best-effort and never fails the call.
//!
//! Operations on one note are serialized through a per-filename mutex.
//! The original single-user tool had no such guard; it is added here so a
//! concurrent edit and delete of the same note cannot interleave.

use crate::core::promoter::{demote, promote};
use crate::core::reconcile::{orphaned, plan_edit};
use crate::core::refs::{extract_refs, is_plain_filename, strip_markers};
use crate::core::MediaDirs;
use crate::error::{NoteError, Result};
use crate::storage::sidecar::{remove_if_present, SidecarRecord, SidecarStore};
use crate::storage::{filename_for_title, is_note_filename, title_for_filename, Note};
use crate::tags::normalize_tags;
use chrono::{DateTime, Local};
use dashmap::DashMap;
use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use walkdir::WalkDir;

/// What a delete is about to remove, for confirmation prompts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletePlan {
    pub filename: String,
    pub title: String,
    pub media: Vec<String>,
}

impl DeletePlan {
    pub fn describe(&self) -> String {
        if self.media.is_empty() {
            "This will permanently delete the note.".to_string()
        } else {
            format!("This will permanently delete the note and {} associated images.", self.media.len())
        }
    }
}

/// Outcome of a delete. Only the note file removal is authoritative.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteReport {
    /// False when the note file was already gone
    pub note_removed: bool,
    pub media_removed: Vec<String>,
    pub sidecar_removed: bool,
}

pub struct NoteRepository {
    dirs: MediaDirs,
    sidecars: SidecarStore,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl NoteRepository {
    pub fn new(dirs: MediaDirs) -> Self {
        let sidecars = SidecarStore::new(dirs.permanent());
        Self { dirs, sidecars, locks: DashMap::new() }
    }

    pub fn dirs(&self) -> &MediaDirs {
        &self.dirs
    }

    pub fn sidecars(&self) -> &SidecarStore {
        &self.sidecars
    }

    pub fn note_path(&self, filename: &str) -> PathBuf {
        self.dirs.permanent().join(filename)
    }

    fn lock_for(&self, filename: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(filename.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Forget the lock for `filename` unless some caller still holds it.
    fn release_lock(&self, filename: &str) {
        self.locks.remove_if(filename, |_, lock| Arc::strong_count(lock) == 1);
    }

    // ========== SCAN ==========

    /// Scan the permanent directory and build every note.
    ///
    /// A note that cannot be read is logged and skipped; the scan itself
    /// never fails.
    pub fn refresh(&self) -> Vec<Note> {
        let dir = self.dirs.permanent();
        if !dir.exists() {
            tracing::warn!("[Repository] Notes directory {} does not exist", dir.display());
            return Vec::new();
        }

        let mut notes = Vec::new();
        for entry in WalkDir::new(dir).min_depth(1).max_depth(1).follow_links(false).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("[Repository] Skipping unreadable entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str() else {
                tracing::warn!("[Repository] Skipping non UTF-8 filename {:?}", entry.file_name());
                continue;
            };
            if SidecarStore::is_sidecar_name(name) || !is_note_filename(name) {
                continue;
            }

            match self.load(name) {
                Ok(note) => notes.push(note),
                Err(e) => tracing::error!("[Repository] Error processing note {}: {}", name, e),
            }
        }

        tracing::info!("[Repository] Scanned {} notes from {}", notes.len(), dir.display());
        notes
    }

    /// Build one note from disk, creating its sidecar if missing.
    pub fn load(&self, filename: &str) -> Result<Note> {
        let path = self.note_path(filename);
        let content = fs::read_to_string(&path).map_err(|e| NoteError::read(&path, e))?;
        let modified = modified_time(&path)?;
        let image_refs = extract_refs(&content, self.dirs.permanent_label());

        let sidecar = match self.sidecars.ensure_exists(filename, &image_refs) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!("[Repository] Sidecar unavailable for {}: {}", filename, e);
                None
            }
        };
        let tags = sidecar.as_ref().map(|s| s.tags.clone()).unwrap_or_default();

        Ok(Note {
            filename: filename.to_string(),
            title: title_for_filename(filename),
            content,
            modified,
            image_refs,
            tags,
            sidecar,
        })
    }

    // ========== CREATE ==========

    /// Save a new note. Fails with `TitleTaken` if a note with the derived
    /// filename already exists; an existing note is never overwritten.
    pub fn create(&self, title: &str, raw_content: &str, tags: &[String]) -> Result<Note> {
        let filename = filename_for_title(title);
        let lock = self.lock_for(&filename);
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());

        let path = self.note_path(&filename);
        if path.is_file() {
            return Err(NoteError::TitleTaken(title_for_filename(&filename)));
        }
        let promotion = promote(raw_content, &self.dirs)?;

        if let Err(e) = write_new(&path, &promotion.text) {
            demote(&promotion.moved, &self.dirs);
            return Err(NoteError::write(path, e));
        }
        tracing::info!("[Repository] Saved note titled {}", filename);

        let image_refs = extract_refs(&promotion.text, self.dirs.permanent_label());
        let record = SidecarRecord::new(image_refs.clone(), normalize_tags(tags));
        if let Err(e) = self.sidecars.write(&filename, &record) {
            // Leave nothing behind that a later scan would pick up
            if let Err(cleanup) = remove_if_present(&path) {
                tracing::error!("[Repository] Could not remove half-created note {}: {}", filename, cleanup);
            }
            demote(&promotion.moved, &self.dirs);
            return Err(e);
        }
        tracing::info!("[Repository] Saved sidecar for {}", filename);

        Ok(Note {
            title: title_for_filename(&filename),
            content: promotion.text,
            modified: modified_time(&path)?,
            image_refs,
            tags: record.tags.clone(),
            sidecar: Some(record),
            filename,
        })
    }

    // ========== EDIT ==========

    /// Replace a note's content and tags, promoting newly staged media and
    /// evicting media the new content no longer references.
    ///
    /// Fails with `NotFound` if the note was deleted in the meantime; an
    /// edit never brings a deleted note back.
    pub fn apply_edit(&self, note: &Note, new_content: &str, new_tags: &[String]) -> Result<Note> {
        let lock = self.lock_for(&note.filename);
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());

        let path = self.note_path(&note.filename);
        if fs::symlink_metadata(&path).is_err() {
            return Err(NoteError::NotFound(note.filename.clone()));
        }
        let old_refs = &note.image_refs;

        // 1. Decide what happens to each reference
        let plan = plan_edit(old_refs, new_content, &self.dirs, |f| self.dirs.staged_path(f).exists());
        tracing::debug!(
            "[Repository] Edit plan for {}: keep={:?} promote={:?} strip={:?} delete={:?}",
            note.filename, plan.keep, plan.promote, plan.strip, plan.delete
        );

        // 2. Drop staged references that no longer resolve
        let (text, stripped) = strip_markers(new_content, self.dirs.staging_label(), |f| plan.strip.iter().any(|s| s == f));
        for name in &stripped {
            tracing::warn!("[Repository] Referenced staged file does not exist: {}", name);
        }

        // 3. Promote newly added media
        let promotion = promote(&text, &self.dirs)?;

        // 4. Content first; nothing is deleted unless this succeeds
        if let Err(e) = fs::write(&path, &promotion.text) {
            demote(&promotion.moved, &self.dirs);
            return Err(NoteError::write(path, e));
        }

        // 5. Sidecar mirrors what the saved text actually references
        let image_refs = extract_refs(&promotion.text, self.dirs.permanent_label());
        let record = SidecarRecord::new(image_refs.clone(), normalize_tags(new_tags));
        self.sidecars.write(&note.filename, &record)?;

        // 6. Evict orphans, best-effort
        let current: HashSet<&str> = image_refs.iter().map(String::as_str).collect();
        for name in orphaned(old_refs, &current) {
            match remove_if_present(&self.dirs.permanent_path(&name)) {
                Ok(true) => tracing::info!("[Repository] Removed unused image {}", name),
                Ok(false) => {}
                Err(e) => tracing::error!("[Repository] Error removing unused image {}: {}", name, e),
            }
        }

        tracing::info!("[Repository] Saved changes to {}", note.filename);
        Ok(Note {
            filename: note.filename.clone(),
            title: note.title.clone(),
            content: promotion.text,
            modified: modified_time(&path)?,
            image_refs,
            tags: record.tags.clone(),
            sidecar: Some(record),
        })
    }

    // ========== DELETE ==========

    pub fn delete_plan(&self, note: &Note) -> DeletePlan {
        DeletePlan {
            filename: note.filename.clone(),
            title: note.title.clone(),
            media: self.media_to_clean(note),
        }
    }

    /// Remove the note file, its media and its sidecar.
    ///
    /// Fails only if the note file exists and cannot be removed. Media and
    /// sidecar removal failures are logged. Deleting an already missing
    /// note succeeds.
    pub fn delete(&self, note: &Note) -> Result<DeleteReport> {
        let result = {
            let lock = self.lock_for(&note.filename);
            let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());
            self.delete_locked(note)
        };
        self.release_lock(&note.filename);
        result
    }

    fn delete_locked(&self, note: &Note) -> Result<DeleteReport> {
        // Read the cleanup list before the sidecar goes away
        let media = self.media_to_clean(note);

        let note_removed = remove_if_present(&self.note_path(&note.filename))?;
        let mut report = DeleteReport { note_removed, ..Default::default() };

        for name in media {
            match remove_if_present(&self.dirs.permanent_path(&name)) {
                Ok(true) => report.media_removed.push(name),
                Ok(false) => {}
                Err(e) => tracing::error!("[Repository] Error removing image {}: {}", name, e),
            }
        }

        match self.sidecars.remove(&note.filename) {
            Ok(removed) => report.sidecar_removed = removed,
            Err(e) => tracing::error!("[Repository] Error removing sidecar for {}: {}", note.filename, e),
        }

        tracing::info!("[Repository] Deleted {} ({} images)", note.filename, report.media_removed.len());
        Ok(report)
    }

    /// Content references plus whatever the sidecar still lists.
    /// Only plain file names inside the permanent directory qualify.
    fn media_to_clean(&self, note: &Note) -> Vec<String> {
        let mut media: Vec<String> = note.image_refs.iter().filter(|n| is_plain_filename(n)).cloned().collect();
        let listed = match self.sidecars.read(&note.filename) {
            Ok(Some(record)) => record.images,
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::debug!("[Repository] Ignoring sidecar hints for {}: {}", note.filename, e);
                Vec::new()
            }
        };
        for name in listed {
            if is_plain_filename(&name) && !media.contains(&name) {
                media.push(name);
            }
        }
        media
    }

    // ========== RENAME ==========

    /// Re-save a note under the filename derived from `new_title`.
    /// Media stay where they are; only the note file and sidecar move.
    pub fn rename(&self, note: &Note, new_title: &str) -> Result<Note> {
        let new_filename = filename_for_title(new_title);
        if new_filename == note.filename {
            return Ok(note.clone());
        }

        let result = {
            // Fixed lock order so two crossing renames cannot deadlock
            let (first, second) = if note.filename < new_filename {
                (self.lock_for(&note.filename), self.lock_for(&new_filename))
            } else {
                (self.lock_for(&new_filename), self.lock_for(&note.filename))
            };
            let _first = first.lock().unwrap_or_else(|e| e.into_inner());
            let _second = second.lock().unwrap_or_else(|e| e.into_inner());
            self.rename_locked(note, &new_filename)
        };
        self.release_lock(&note.filename);
        self.release_lock(&new_filename);

        result?;
        self.load(&new_filename)
    }

    fn rename_locked(&self, note: &Note, new_filename: &str) -> Result<()> {
        let old_path = self.note_path(&note.filename);
        let new_path = self.note_path(new_filename);
        if new_path.exists() {
            return Err(NoteError::TitleTaken(title_for_filename(new_filename)));
        }

        let content = fs::read_to_string(&old_path).map_err(|e| NoteError::read(&old_path, e))?;
        write_new(&new_path, &content).map_err(|e| NoteError::write(&new_path, e))?;

        let record = SidecarRecord::new(extract_refs(&content, self.dirs.permanent_label()), note.tags.clone());
        if let Err(e) = self.sidecars.write(new_filename, &record) {
            let _ = remove_if_present(&new_path);
            return Err(e);
        }

        if let Err(e) = remove_if_present(&old_path) {
            let _ = remove_if_present(&new_path);
            let _ = self.sidecars.remove(new_filename);
            return Err(e);
        }
        if let Err(e) = self.sidecars.remove(&note.filename) {
            tracing::warn!("[Repository] Stale sidecar left for {}: {}", note.filename, e);
        }

        tracing::info!("[Repository] Renamed {} -> {}", note.filename, new_filename);
        Ok(())
    }
}

/// Write a file that must not exist yet.
fn write_new(path: &Path, text: &str) -> io::Result<()> {
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    if let Err(e) = file.write_all(text.as_bytes()) {
        let _ = fs::remove_file(path);
        return Err(e);
    }
    Ok(())
}

fn modified_time(path: &Path) -> Result<DateTime<Local>> {
    let modified = fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(|e| match e.kind() {
            ErrorKind::NotFound => NoteError::NotFound(path.display().to_string()),
            _ => NoteError::read(path, e),
        })?;
    Ok(DateTime::<Local>::from(modified))
}
