// FILE: src/storage/archive.rs
//! Archive Exporter
//!
//! Bundles a note and its media into `<stem>.zip` inside the staging
//! directory, then removes the archive again after a delay on a detached
//! task.

use crate::core::MediaDirs;
use crate::error::{NoteError, Result};
use crate::storage::{Note, NOTE_EXTENSION};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::task::JoinHandle;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const DEFAULT_ARCHIVE_TTL: Duration = Duration::from_secs(10);

/// A freshly written archive and its pending cleanup.
#[derive(Debug)]
pub struct ExportedArchive {
    pub path: PathBuf,
    /// Marker-style reference, `/<staging-label>/<stem>.zip`
    pub url: String,
    /// Media that were listed but no longer on disk
    pub skipped: Vec<String>,
    pub cleanup: JoinHandle<()>,
}

#[derive(Debug, Clone)]
pub struct ArchiveExporter {
    dirs: MediaDirs,
    ttl: Duration,
}

impl ArchiveExporter {
    pub fn new(dirs: MediaDirs, ttl: Duration) -> Self {
        Self { dirs, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Zip the note file and every referenced media file still on disk.
    ///
    /// Must be called from within a tokio runtime; the archive build runs on
    /// the blocking pool and the cleanup is spawned as a background task.
    pub async fn export(&self, note: &Note) -> Result<ExportedArchive> {
        let stem = note
            .filename
            .strip_suffix(NOTE_EXTENSION)
            .and_then(|s| s.strip_suffix('.'))
            .unwrap_or(&note.filename);
        let archive_name = format!("{}.zip", stem);
        let path = self.dirs.staging().join(&archive_name);
        let url = format!("/{}/{}", self.dirs.staging_label(), archive_name);

        let note_path = self.dirs.permanent().join(&note.filename);
        let media: Vec<(String, PathBuf)> = note
            .image_refs
            .iter()
            .map(|name| (name.clone(), self.dirs.permanent_path(name)))
            .collect();

        let target = path.clone();
        let entry = note.filename.clone();
        let skipped = tokio::task::spawn_blocking(move || write_archive(&target, &entry, &note_path, &media))
            .await
            .map_err(|e| NoteError::Other(anyhow::anyhow!("archive task failed: {}", e)))??;

        tracing::info!("[Archive] Created {} ({} media skipped)", path.display(), skipped.len());

        let cleanup = schedule_cleanup(path.clone(), self.ttl);
        Ok(ExportedArchive { path, url, skipped, cleanup })
    }
}

/// Write the archive; returns the media names that were missing.
fn write_archive(target: &Path, note_name: &str, note_path: &Path, media: &[(String, PathBuf)]) -> Result<Vec<String>> {
    let mut source = File::open(note_path).map_err(|e| NoteError::read(note_path, e))?;
    let file = File::create(target).map_err(|e| NoteError::write(target, e))?;

    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(file);

    zip.start_file(note_name, options)?;
    io::copy(&mut source, &mut zip).map_err(|e| NoteError::write(target, e))?;

    let mut skipped = Vec::new();
    for (name, path) in media {
        let mut image = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("[Archive] Skipping missing media {}", name);
                skipped.push(name.clone());
                continue;
            }
            Err(e) => return Err(NoteError::read(path, e)),
        };
        zip.start_file(name.as_str(), options)?;
        io::copy(&mut image, &mut zip).map_err(|e| NoteError::write(target, e))?;
    }

    zip.finish()?;
    Ok(skipped)
}

/// Delete `path` after `ttl`. A missing archive is not an error.
fn schedule_cleanup(path: PathBuf, ttl: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(ttl).await;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => tracing::info!("[Archive] Deleted {}", path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("[Archive] {} already gone", path.display());
            }
            Err(e) => tracing::error!("[Archive] Error deleting {}: {}", path.display(), e),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::NoteRepository;
    use std::fs;
    use std::io::Read;
    use tempfile::TempDir;

    fn setup() -> (TempDir, NoteRepository) {
        let root = TempDir::new().unwrap();
        let notes = root.path().join("notes");
        let temp = root.path().join("temp");
        fs::create_dir_all(&notes).unwrap();
        fs::create_dir_all(&temp).unwrap();
        (root, NoteRepository::new(MediaDirs::new(notes, temp).unwrap()))
    }

    fn entry_names(path: &Path) -> Vec<String> {
        let archive = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
        let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_export_bundles_note_and_media() {
        let (_root, repo) = setup();
        fs::write(repo.dirs().staged_path("a.png"), b"pixels").unwrap();
        let note = repo.create("Trip", "![a](/temp/a.png)", &[]).unwrap();

        let exporter = ArchiveExporter::new(repo.dirs().clone(), Duration::from_secs(60));
        let exported = exporter.export(&note).await.unwrap();

        assert_eq!(exported.url, "/temp/Trip.zip");
        assert_eq!(exported.path, repo.dirs().staging().join("Trip.zip"));
        assert_eq!(entry_names(&exported.path), vec!["Trip.md", "a.png"]);

        let mut archive = zip::ZipArchive::new(File::open(&exported.path).unwrap()).unwrap();
        let mut body = String::new();
        archive.by_name("Trip.md").unwrap().read_to_string(&mut body).unwrap();
        assert_eq!(body, "![a](/notes/a.png)");
        exported.cleanup.abort();
    }

    #[tokio::test]
    async fn test_export_skips_missing_media() {
        let (_root, repo) = setup();
        fs::write(repo.dirs().staged_path("a.png"), b"1").unwrap();
        let note = repo.create("Lost", "![a](/temp/a.png)", &[]).unwrap();
        fs::remove_file(repo.dirs().permanent_path("a.png")).unwrap();

        let exporter = ArchiveExporter::new(repo.dirs().clone(), Duration::from_secs(60));
        let exported = exporter.export(&note).await.unwrap();

        assert_eq!(exported.skipped, vec!["a.png"]);
        assert_eq!(entry_names(&exported.path), vec!["Lost.md"]);
        exported.cleanup.abort();
    }

    #[tokio::test]
    async fn test_archive_is_removed_after_ttl() {
        let (_root, repo) = setup();
        let note = repo.create("Short", "brief", &[]).unwrap();

        let exporter = ArchiveExporter::new(repo.dirs().clone(), Duration::from_millis(50));
        let exported = exporter.export(&note).await.unwrap();
        assert!(exported.path.exists());

        exported.cleanup.await.unwrap();
        assert!(!exported.path.exists());
    }

    #[tokio::test]
    async fn test_cleanup_tolerates_missing_archive() {
        let (_root, repo) = setup();
        let note = repo.create("Gone", "x", &[]).unwrap();

        let exporter = ArchiveExporter::new(repo.dirs().clone(), Duration::from_millis(50));
        let exported = exporter.export(&note).await.unwrap();
        fs::remove_file(&exported.path).unwrap();

        // Completes without panicking
        exported.cleanup.await.unwrap();
    }
}
