// FILE: src/state.rs

use crate::storage::Note;
use crate::tags::TagIndex;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, RwLock};
use std::time::SystemTime;

/// Media uploaded during the current editing session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StagingSession {
    /// Every file written into staging since the last save
    pub staged: BTreeSet<String>,
    /// Subset of `staged` the live draft still references
    pub referenced: BTreeSet<String>,
}

impl StagingSession {
    /// Staged files the draft no longer points at.
    pub fn unreferenced(&self) -> Vec<String> {
        self.staged.difference(&self.referenced).cloned().collect()
    }

    /// Forget everything, returning what was staged.
    pub fn take(&mut self) -> BTreeSet<String> {
        self.referenced.clear();
        std::mem::take(&mut self.staged)
    }
}

/// Process-wide state shared by every front-end handler.
pub struct GlobalState {
    /// Last scan of the permanent directory, replaced wholesale on refresh
    pub notes: RwLock<Vec<Note>>,

    /// Tag -> color, rebuilt after each refresh
    pub tag_index: RwLock<TagIndex>,

    pub staging: Mutex<StagingSession>,

    /// When was the cache last rebuilt? `None` until the first refresh.
    pub refreshed_at: RwLock<Option<SystemTime>>,
}

impl GlobalState {
    pub fn new() -> Self {
        Self::with_tag_index(TagIndex::default())
    }

    pub fn with_tag_index(tag_index: TagIndex) -> Self {
        Self {
            notes: RwLock::new(Vec::new()),
            tag_index: RwLock::new(tag_index),
            staging: Mutex::new(StagingSession::default()),
            refreshed_at: RwLock::new(None),
        }
    }

    /// Snapshot of the cached note list.
    pub fn notes(&self) -> Vec<Note> {
        self.notes.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Is some cached note already using this title? Case-sensitive, as filenames are.
    pub fn title_taken(&self, title: &str) -> bool {
        self.notes
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .any(|n| n.title == title)
    }

    pub fn find(&self, filename: &str) -> Option<Note> {
        self.notes
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .find(|n| n.filename == filename)
            .cloned()
    }
}

impl Default for GlobalState {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared state wrapper for easy cloning and sharing
pub type SharedState = Arc<GlobalState>;
