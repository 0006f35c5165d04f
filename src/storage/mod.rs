// FILE: src/storage/mod.rs
pub mod archive;
pub mod repository;
pub mod sidecar;

// Common exports
pub use archive::{ArchiveExporter, ExportedArchive};
pub use repository::{DeletePlan, DeleteReport, NoteRepository};
pub use sidecar::{SidecarRecord, SidecarStore};

use chrono::{DateTime, Local};

pub const NOTE_EXTENSION: &str = "md";

// Data Types
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pub filename: String,
    pub title: String,
    pub content: String,
    pub modified: DateTime<Local>,
    /// Permanent media referenced by `content`, recomputed on every load
    pub image_refs: Vec<String>,
    pub tags: Vec<String>,
    /// `None` only if the sidecar could neither be read nor created
    pub sidecar: Option<SidecarRecord>,
}

impl std::fmt::Display for Note {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (modified: {}, images: {})", self.title, self.modified.format("%Y-%m-%d %H:%M"), self.image_refs.len())
    }
}

/// Filename for a title: spaces become `_`, path separators become `-`,
/// leading dots are dropped so the note never becomes a hidden file.
/// A blank title gets `untitled_<DDMMYYYYHHMMSS>.md`.
pub fn filename_for_title(title: &str) -> String {
    let title = title.trim().trim_start_matches('.').trim_start();
    if title.is_empty() {
        return format!("untitled_{}.{}", Local::now().format("%d%m%Y%H%M%S"), NOTE_EXTENSION);
    }

    let stem: String = title
        .chars()
        .map(|c| match c {
            ' ' => '_',
            '/' | '\\' => '-',
            _ => c,
        })
        .collect();
    format!("{}.{}", stem, NOTE_EXTENSION)
}

/// Display title for a note filename: the stem with `_` shown as spaces.
pub fn title_for_filename(filename: &str) -> String {
    let stem = filename
        .strip_suffix(NOTE_EXTENSION)
        .and_then(|s| s.strip_suffix('.'))
        .unwrap_or(filename);
    stem.replace('_', " ")
}

/// Note files are visible `.md` files.
pub fn is_note_filename(name: &str) -> bool {
    !name.starts_with('.') && name.len() > NOTE_EXTENSION.len() + 1 && name.ends_with(&format!(".{}", NOTE_EXTENSION))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filename_for_title() {
        assert_eq!(filename_for_title("Trip to Rome"), "Trip_to_Rome.md");
        assert_eq!(filename_for_title("  a/b  "), "a-b.md");
    }

    #[test]
    fn test_leading_dots_never_hide_a_note() {
        assert_eq!(filename_for_title(".plan"), "plan.md");
        assert_eq!(filename_for_title("..  notes"), "notes.md");
        assert!(is_note_filename(&filename_for_title(".plan")));
        assert!(filename_for_title("...").starts_with("untitled_"));
    }

    #[test]
    fn test_untitled_filename() {
        let name = filename_for_title("   ");
        assert!(name.starts_with("untitled_"));
        assert!(name.ends_with(".md"));
        // untitled_ + 14 digits + .md
        assert_eq!(name.len(), "untitled_".len() + 14 + 3);
    }

    #[test]
    fn test_title_round_trip() {
        assert_eq!(title_for_filename("Trip_to_Rome.md"), "Trip to Rome");
        assert_eq!(title_for_filename("README"), "README");
    }

    #[test]
    fn test_is_note_filename() {
        assert!(is_note_filename("a.md"));
        assert!(!is_note_filename(".a.md.sidecar"));
        assert!(!is_note_filename(".hidden.md"));
        assert!(!is_note_filename("image.png"));
        assert!(!is_note_filename(".md"));
    }
}
