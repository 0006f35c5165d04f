// FILE: src/core/promoter.rs
//! Media Promoter
//!
//! Moves staged media into permanent storage and rewrites the markers
//! that point at them. Markers already under the permanent directory
//! are left untouched.

use crate::core::refs::{markers_in, render_marker};
use crate::core::MediaDirs;
use crate::error::{NoteError, Result};
use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;

/// Outcome of a promotion pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Promotion {
    /// Text with every staged marker rewritten (or stripped if dangling)
    pub text: String,
    /// Filenames physically moved into the permanent directory
    pub moved: Vec<String>,
    /// Staged references whose source file was gone; their markers were removed
    pub dangling: Vec<String>,
}

/// Move one staged file into the permanent directory.
///
/// Fails with `MediaMove` when the staged source no longer exists.
/// Falls back to copy + remove when a rename is not possible
/// (e.g. staging and permanent storage live on different devices).
pub fn relocate(filename: &str, dirs: &MediaDirs) -> Result<()> {
    let source = dirs.staged_path(filename);
    let destination = dirs.permanent_path(filename);

    if let Err(e) = fs::symlink_metadata(&source) {
        return Err(NoteError::MediaMove { filename: filename.to_string(), source: e });
    }

    tracing::info!("[Promoter] Moving {} from {} to {}", filename, source.display(), destination.display());

    match fs::rename(&source, &destination) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            // Raced with a cleanup between the existence check and the rename
            Err(NoteError::MediaMove { filename: filename.to_string(), source: e })
        }
        Err(e) => {
            tracing::debug!("[Promoter] Rename failed ({}), copying instead", e);
            fs::copy(&source, &destination).map_err(|e| NoteError::write(&destination, e))?;
            if let Err(e) = fs::remove_file(&source) {
                tracing::warn!("[Promoter] Copied {} but could not remove staged source: {}", filename, e);
            }
            Ok(())
        }
    }
}

/// Promote every staged marker in `text`.
///
/// A missing staged file is not fatal: its marker is stripped and the
/// filename reported in `dangling`. Any other failure moves the already
/// promoted files back to staging before returning the error, so the draft
/// text stays valid.
pub fn promote(text: &str, dirs: &MediaDirs) -> Result<Promotion> {
    let mut out = String::with_capacity(text.len());
    let mut moved: Vec<String> = Vec::new();
    let mut dangling: Vec<String> = Vec::new();
    let mut settled: HashSet<&str> = HashSet::new();
    let mut cursor = 0;

    for marker in markers_in(text, dirs.staging_label()) {
        out.push_str(&text[cursor..marker.span.start]);
        cursor = marker.span.end;

        if !settled.contains(marker.filename) {
            match relocate(marker.filename, dirs) {
                Ok(()) => moved.push(marker.filename.to_string()),
                Err(NoteError::MediaMove { filename, source }) => {
                    tracing::warn!("[Promoter] Dropping dangling reference {}: {}", filename, source);
                    dangling.push(filename);
                }
                Err(e) => {
                    demote(&moved, dirs);
                    return Err(e);
                }
            }
            settled.insert(marker.filename);
        }

        if !dangling.iter().any(|d| d == marker.filename) {
            out.push_str(&render_marker(marker.alt, dirs.permanent_label(), marker.filename));
        }
    }
    out.push_str(&text[cursor..]);

    Ok(Promotion { text: out, moved, dangling })
}

/// Best-effort undo of a promotion: move files back into staging.
pub(crate) fn demote(moved: &[String], dirs: &MediaDirs) {
    for filename in moved {
        let from = dirs.permanent_path(filename);
        let to = dirs.staged_path(filename);
        if let Err(e) = fs::rename(&from, &to) {
            tracing::error!("[Promoter] Could not return {} to staging: {}", filename, e);
        }
    }
}
