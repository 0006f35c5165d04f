// FILE: src/desk.rs
//! Desk: the session facade a front-end talks to.
//!
//! Wraps the repository with the bookkeeping around it: the cached note
//! list and tag colors, the set of uploads staged by the current draft,
//! title collision checks and post-save staging cleanup.

use crate::config::Config;
use crate::core::refs::extract_refs;
use crate::engine::{list_view, SortKey};
use crate::error::{NoteError, Result};
use crate::state::{GlobalState, SharedState};
use crate::storage::sidecar::remove_if_present;
use crate::storage::{
    filename_for_title, title_for_filename, ArchiveExporter, DeletePlan, DeleteReport, ExportedArchive, Note,
    NoteRepository,
};
use crate::tags::TagIndex;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;
use uuid::Uuid;

pub struct Desk {
    repo: NoteRepository,
    exporter: ArchiveExporter,
    state: SharedState,
}

impl Desk {
    /// Create the directories if needed and load the initial note list.
    pub fn open(config: &Config) -> Result<Self> {
        config.ensure_dirs()?;
        let dirs = config.media_dirs()?;

        let state = Arc::new(GlobalState::with_tag_index(TagIndex::with_palette(config.palette.clone())));
        let desk = Self {
            repo: NoteRepository::new(dirs.clone()),
            exporter: ArchiveExporter::new(dirs, config.archive_ttl),
            state,
        };
        desk.refresh();
        tracing::info!("[Desk] Opened {}", config.notes_dir.display());
        Ok(desk)
    }

    pub fn repository(&self) -> &NoteRepository {
        &self.repo
    }

    pub fn state(&self) -> SharedState {
        Arc::clone(&self.state)
    }

    // ========== READ SIDE ==========

    /// Rescan disk, replace the cache and rebuild tag colors.
    pub fn refresh(&self) -> Vec<Note> {
        let notes = self.repo.refresh();

        {
            let mut index = self.state.tag_index.write().unwrap_or_else(|e| e.into_inner());
            index.rebuild(&notes);
        }
        *self.state.notes.write().unwrap_or_else(|e| e.into_inner()) = notes.clone();
        *self.state.refreshed_at.write().unwrap_or_else(|e| e.into_inner()) = Some(SystemTime::now());

        notes
    }

    /// Cached notes, sorted then filtered.
    pub fn list(&self, sort: SortKey, term: &str) -> Vec<Note> {
        list_view(self.state.notes(), sort, term)
    }

    pub fn note(&self, filename: &str) -> Result<Note> {
        self.state
            .find(filename)
            .ok_or_else(|| NoteError::NotFound(filename.to_string()))
    }

    pub fn tag_colors(&self) -> BTreeMap<String, String> {
        self.state.tag_index.read().unwrap_or_else(|e| e.into_inner()).colors().clone()
    }

    // ========== STAGING ==========

    /// Store an upload in staging as `<uuid>.<ext>` and return the marker
    /// target for it.
    pub fn stage_upload(&self, original_name: &str, bytes: &[u8]) -> Result<String> {
        let filename = match Path::new(original_name).extension().and_then(|e| e.to_str()) {
            Some(ext) if !ext.is_empty() => format!("{}.{}", Uuid::new_v4(), ext),
            _ => Uuid::new_v4().to_string(),
        };
        let dirs = self.repo.dirs();
        let path = dirs.staged_path(&filename);
        std::fs::write(&path, bytes).map_err(|e| NoteError::write(&path, e))?;

        self.state
            .staging
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .staged
            .insert(filename.clone());

        tracing::info!("[Desk] Staged upload {} as {}", original_name, filename);
        Ok(dirs.staged_target(&filename))
    }

    /// Record which staged files the live draft references.
    pub fn track_draft(&self, text: &str) {
        let refs = extract_refs(text, self.repo.dirs().staging_label());
        let mut session = self.state.staging.lock().unwrap_or_else(|e| e.into_inner());
        let referenced = refs.into_iter().filter(|f| session.staged.contains(f)).collect();
        session.referenced = referenced;
    }

    /// Delete staged files the draft no longer references.
    pub fn discard_unreferenced(&self) -> Vec<String> {
        let mut session = self.state.staging.lock().unwrap_or_else(|e| e.into_inner());
        let mut removed = Vec::new();
        for name in session.unreferenced() {
            match remove_if_present(&self.repo.dirs().staged_path(&name)) {
                Ok(_) => {
                    tracing::info!("[Desk] Removed unreferenced staged file {}", name);
                    session.staged.remove(&name);
                    removed.push(name);
                }
                Err(e) => tracing::error!("[Desk] Error removing staged file {}: {}", name, e),
            }
        }
        removed
    }

    /// After a save: whatever is still in staging from this session goes.
    fn clear_staging(&self) {
        let staged = self.state.staging.lock().unwrap_or_else(|e| e.into_inner()).take();
        for name in staged {
            match remove_if_present(&self.repo.dirs().staged_path(&name)) {
                Ok(true) => tracing::info!("[Desk] Removed leftover staged file {}", name),
                Ok(false) => {}
                Err(e) => tracing::error!("[Desk] Error cleaning staged file {}: {}", name, e),
            }
        }
    }

    // ========== WRITE SIDE ==========

    fn check_title_free(&self, filename: &str) -> Result<()> {
        let title = title_for_filename(filename);
        if self.state.title_taken(&title) || self.repo.note_path(filename).exists() {
            return Err(NoteError::TitleTaken(title));
        }
        Ok(())
    }

    pub fn save_new(&self, title: &str, content: &str, tags: &[String]) -> Result<Note> {
        if content.trim().is_empty() {
            return Err(NoteError::EmptyNote);
        }
        let filename = filename_for_title(title);
        self.check_title_free(&filename)?;

        let note = self.repo.create(title, content, tags)?;
        self.clear_staging();
        self.refresh();
        Ok(note)
    }

    pub fn save_edit(&self, filename: &str, content: &str, tags: &[String]) -> Result<Note> {
        let current = self.note(filename)?;
        let note = self.repo.apply_edit(&current, content, tags)?;
        self.clear_staging();
        self.refresh();
        Ok(note)
    }

    pub fn delete_plan(&self, filename: &str) -> Result<DeletePlan> {
        Ok(self.repo.delete_plan(&self.note(filename)?))
    }

    pub fn delete(&self, filename: &str) -> Result<DeleteReport> {
        let note = self.note(filename)?;
        let report = self.repo.delete(&note)?;
        self.refresh();
        Ok(report)
    }

    pub fn rename(&self, filename: &str, new_title: &str) -> Result<Note> {
        let note = self.note(filename)?;
        let target = filename_for_title(new_title);
        if target == note.filename {
            return Ok(note);
        }
        self.check_title_free(&target)?;

        let renamed = self.repo.rename(&note, new_title)?;
        self.refresh();
        Ok(renamed)
    }

    pub async fn export(&self, filename: &str) -> Result<ExportedArchive> {
        let note = self.note(filename)?;
        self.exporter.export(&note).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn open() -> (TempDir, Desk) {
        let root = TempDir::new().unwrap();
        let mut config = Config::rooted_at(root.path());
        config.archive_ttl = Duration::from_millis(20);
        let desk = Desk::open(&config).unwrap();
        (root, desk)
    }

    #[test]
    fn test_stage_upload_names_and_target() {
        let (_root, desk) = open();
        let target = desk.stage_upload("photo.JPG", b"x").unwrap();

        assert!(target.starts_with("/temp/"));
        assert!(target.ends_with(".JPG"));
        let name = target.trim_start_matches("/temp/");
        assert!(desk.repository().dirs().staged_path(name).exists());
        assert!(desk.state().staging.lock().unwrap().staged.contains(name));
    }

    #[test]
    fn test_discard_unreferenced() {
        let (_root, desk) = open();
        let keep = desk.stage_upload("a.png", b"1").unwrap();
        let drop = desk.stage_upload("b.png", b"2").unwrap();

        desk.track_draft(&format!("![a]({})", keep));
        let removed = desk.discard_unreferenced();

        let dropped = drop.trim_start_matches("/temp/");
        assert_eq!(removed, vec![dropped.to_string()]);
        assert!(!desk.repository().dirs().staged_path(dropped).exists());
        assert!(desk.repository().dirs().staged_path(keep.trim_start_matches("/temp/")).exists());
    }

    #[test]
    fn test_save_new_rejects_empty_and_taken() {
        let (_root, desk) = open();
        assert!(matches!(desk.save_new("x", "  ", &[]), Err(NoteError::EmptyNote)));

        desk.save_new("Trip", "first", &[]).unwrap();
        assert!(matches!(desk.save_new("Trip", "second", &[]), Err(NoteError::TitleTaken(_))));
    }

    #[test]
    fn test_save_clears_session_staging() {
        let (_root, desk) = open();
        let used = desk.stage_upload("a.png", b"1").unwrap();
        let abandoned = desk.stage_upload("b.png", b"2").unwrap();

        let note = desk.save_new("Pics", &format!("![a]({})", used), &["travel".to_string()]).unwrap();

        assert_eq!(note.image_refs.len(), 1);
        let dirs = desk.repository().dirs();
        assert!(!dirs.staged_path(abandoned.trim_start_matches("/temp/")).exists());
        assert!(desk.state().staging.lock().unwrap().staged.is_empty());
        assert!(desk.tag_colors().contains_key("travel"));
    }

    #[test]
    fn test_list_search_and_sort() {
        let (_root, desk) = open();
        desk.save_new("note10", "ten", &[]).unwrap();
        desk.save_new("note2", "two", &["work".to_string()]).unwrap();

        let titles: Vec<String> = desk.list(SortKey::TitleAsc, "").into_iter().map(|n| n.title).collect();
        assert_eq!(titles, vec!["note2", "note10"]);

        let hits = desk.list(SortKey::MostRecent, "WORK");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "note2");
    }

    #[test]
    fn test_spaced_staging_dir_promotes_on_save() {
        let root = TempDir::new().unwrap();
        let mut config = Config::rooted_at(root.path());
        config.staging_dir = root.path().join("my uploads");
        let desk = Desk::open(&config).unwrap();

        let target = desk.stage_upload("a.png", b"pixels").unwrap();
        assert!(target.starts_with("/my uploads/"));
        let name = target.trim_start_matches("/my uploads/").to_string();

        let note = desk.save_new("Trip", &format!("![a]({})", target), &[]).unwrap();

        assert_eq!(note.content, format!("![a](/notes/{})", name));
        assert_eq!(note.image_refs, vec![name.clone()]);
        assert!(config.notes_dir.join(&name).exists());
        assert!(!config.staging_dir.join(&name).exists());
    }

    #[test]
    fn test_dot_title_stays_listed() {
        let (_root, desk) = open();
        let note = desk.save_new(".plan", "secret plans", &[]).unwrap();

        assert_eq!(note.filename, "plan.md");
        let listed = desk.list(SortKey::TitleAsc, "");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].filename, "plan.md");
    }

    #[test]
    fn test_concurrent_save_same_title_keeps_one() {
        let (_root, desk) = open();

        let results: Vec<Result<Note>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|i| {
                    let desk = &desk;
                    s.spawn(move || desk.save_new("Shared", &format!("draft {}", i), &[]))
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let saved: Vec<&Note> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
        assert_eq!(saved.len(), 1);
        assert!(results.iter().filter(|r| r.is_err()).all(|r| matches!(r, Err(NoteError::TitleTaken(_)))));
        assert_eq!(desk.note("Shared.md").unwrap().content, saved[0].content);
    }

    #[test]
    fn test_rename_checks_collisions() {
        let (_root, desk) = open();
        desk.save_new("A", "a", &[]).unwrap();
        desk.save_new("B", "b", &[]).unwrap();

        assert!(matches!(desk.rename("A.md", "B"), Err(NoteError::TitleTaken(_))));
        let renamed = desk.rename("A.md", "C").unwrap();
        assert_eq!(renamed.filename, "C.md");
        assert!(desk.note("A.md").is_err());
    }

    #[test]
    fn test_delete_unknown_note() {
        let (_root, desk) = open();
        assert!(matches!(desk.delete("nope.md"), Err(NoteError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_export_through_desk() {
        let (_root, desk) = open();
        desk.save_new("Out", "body", &[]).unwrap();

        let exported = desk.export("Out.md").await.unwrap();
        assert_eq!(exported.url, "/temp/Out.zip");
        exported.cleanup.await.unwrap();
        assert!(!exported.path.exists());
    }
}
