// FILE: src/core/reconcile.rs
//! Edit reconciliation as a pure function.
//!
//! Given the media a note referenced before an edit and the new draft text,
//! decide which media stay, which staged files get promoted, which dangling
//! staged markers get stripped and which permanent files become orphans.
//! No I/O happens here; staged-file existence is asked through a callback.

use crate::core::refs::extract_refs;
use crate::core::MediaDirs;
use std::collections::HashSet;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditPlan {
    /// Permanent media referenced before and after the edit
    pub keep: Vec<String>,
    /// Staged media to move into permanent storage
    pub promote: Vec<String>,
    /// Staged references whose file no longer exists
    pub strip: Vec<String>,
    /// Permanent media referenced before the edit but not after it
    pub delete: Vec<String>,
}

impl EditPlan {
    /// Media the note references once the plan has been applied.
    pub fn final_media(&self) -> Vec<String> {
        let mut out = self.keep.clone();
        for name in &self.promote {
            if !out.contains(name) {
                out.push(name.clone());
            }
        }
        out
    }
}

pub fn plan_edit<F>(old_refs: &[String], new_text: &str, dirs: &MediaDirs, staged_exists: F) -> EditPlan
where
    F: Fn(&str) -> bool,
{
    let permanent_now = extract_refs(new_text, dirs.permanent_label());
    let (promote, strip): (Vec<String>, Vec<String>) = extract_refs(new_text, dirs.staging_label())
        .into_iter()
        .partition(|name| staged_exists(name.as_str()));

    let mut after: HashSet<&str> = permanent_now.iter().map(String::as_str).collect();
    after.extend(promote.iter().map(String::as_str));

    let delete = orphaned(old_refs, &after);

    EditPlan { keep: permanent_now, promote, strip, delete }
}

/// Entries of `before` that are absent from `after`, order preserved.
pub fn orphaned(before: &[String], after: &HashSet<&str>) -> Vec<String> {
    let mut seen = HashSet::new();
    before
        .iter()
        .filter(|name| !after.contains(name.as_str()) && seen.insert(name.as_str()))
        .cloned()
        .collect()
}
