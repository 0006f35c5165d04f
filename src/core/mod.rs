// FILE: src/core/mod.rs
pub mod promoter;
pub mod reconcile;
pub mod refs;

use crate::error::{NoteError, Result};
use std::path::{Path, PathBuf};

/// The permanent and staging directories together with the labels
/// that embedded-media markers use to address them.
#[derive(Debug, Clone)]
pub struct MediaDirs {
    permanent: PathBuf,
    staging: PathBuf,
    permanent_label: String,
    staging_label: String,
}

impl MediaDirs {
    pub fn new(permanent: impl Into<PathBuf>, staging: impl Into<PathBuf>) -> Result<Self> {
        let permanent = permanent.into();
        let staging = staging.into();

        let permanent_label = refs::dir_label(&permanent)
            .ok_or_else(|| NoteError::InvalidPath(permanent.display().to_string()))?
            .to_string();
        let staging_label = refs::dir_label(&staging)
            .ok_or_else(|| NoteError::InvalidPath(staging.display().to_string()))?
            .to_string();

        for label in [&permanent_label, &staging_label] {
            if !refs::is_marker_label(label) {
                return Err(NoteError::InvalidPath(format!("'{}' cannot be used in a media marker", label)));
            }
        }

        // Markers carry only the label, so the two must be distinguishable.
        if permanent_label == staging_label {
            return Err(NoteError::InvalidPath(format!(
                "permanent and staging directories share the label '{}'",
                permanent_label
            )));
        }

        Ok(Self { permanent, staging, permanent_label, staging_label })
    }

    pub fn permanent(&self) -> &Path {
        &self.permanent
    }

    pub fn staging(&self) -> &Path {
        &self.staging
    }

    pub fn permanent_label(&self) -> &str {
        &self.permanent_label
    }

    pub fn staging_label(&self) -> &str {
        &self.staging_label
    }

    /// Marker target for a staged file, e.g. `/temp/<filename>`.
    pub fn staged_target(&self, filename: &str) -> String {
        format!("/{}/{}", self.staging_label, filename)
    }

    pub fn staged_path(&self, filename: &str) -> PathBuf {
        self.staging.join(filename)
    }

    pub fn permanent_path(&self, filename: &str) -> PathBuf {
        self.permanent.join(filename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_from_final_component() {
        let dirs = MediaDirs::new("/data/notes", "/data/temp").unwrap();
        assert_eq!(dirs.permanent_label(), "notes");
        assert_eq!(dirs.staging_label(), "temp");
        assert_eq!(dirs.staged_target("a.png"), "/temp/a.png");
    }

    #[test]
    fn test_label_with_spaces_round_trips() {
        let dirs = MediaDirs::new("/data/notes", "/data/my uploads").unwrap();
        let target = dirs.staged_target("a.png");
        assert_eq!(target, "/my uploads/a.png");
        let text = format!("![a]({})", target);
        assert_eq!(refs::extract_refs(&text, dirs.staging_label()), vec!["a.png"]);
    }

    #[test]
    fn test_rejects_unaddressable_label() {
        let err = MediaDirs::new("/data/notes", "/data/up)loads").unwrap_err();
        assert!(matches!(err, NoteError::InvalidPath(_)));
    }

    #[test]
    fn test_rejects_shared_label() {
        let err = MediaDirs::new("/a/notes", "/b/notes").unwrap_err();
        assert!(matches!(err, NoteError::InvalidPath(_)));
    }
}
