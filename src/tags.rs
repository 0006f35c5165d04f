// FILE: src/tags.rs
//! Tag Index: tag name -> display color.
//!
//! Rebuilt from every note's tags on each refresh. A tag keeps its color for
//! as long as some note still carries it; new tags take the first palette
//! color no live tag is using, and cycle through the palette once it runs out.

use crate::storage::Note;
use std::collections::{BTreeMap, HashSet};

pub const DEFAULT_PALETTE: &[&str] = &[
    "#3B82F6", "#6B9F78", "#F59E0B", "#EF4444", "#8B5CF6", "#EC4899",
    "#14B8A6", "#F97316", "#6366F1", "#84CC16", "#06B6D4", "#6B7280",
];

#[derive(Debug, Clone)]
pub struct TagIndex {
    palette: Vec<String>,
    colors: BTreeMap<String, String>,
    /// Wraparound position once every palette color is taken
    cursor: usize,
}

impl Default for TagIndex {
    fn default() -> Self {
        Self::with_palette(DEFAULT_PALETTE.iter().map(|c| c.to_string()).collect())
    }
}

impl TagIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty palette falls back to the default one.
    pub fn with_palette(palette: Vec<String>) -> Self {
        let palette = if palette.is_empty() {
            DEFAULT_PALETTE.iter().map(|c| c.to_string()).collect()
        } else {
            palette
        };
        Self { palette, colors: BTreeMap::new(), cursor: 0 }
    }

    /// Start from known assignments, e.g. restored from an earlier session.
    pub fn with_colors<I>(palette: Vec<String>, colors: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut index = Self::with_palette(palette);
        index.colors.extend(colors);
        index
    }

    pub fn color_of(&self, tag: &str) -> Option<&str> {
        self.colors.get(tag).map(String::as_str)
    }

    pub fn colors(&self) -> &BTreeMap<String, String> {
        &self.colors
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Recompute the index from `notes`.
    pub fn rebuild(&mut self, notes: &[Note]) -> &BTreeMap<String, String> {
        self.rebuild_from(notes.iter().flat_map(|n| n.tags.iter().map(String::as_str)))
    }

    /// Recompute the index from tags in first-seen order.
    pub fn rebuild_from<'a, I>(&mut self, tags: I) -> &BTreeMap<String, String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut seen: HashSet<&str> = HashSet::new();
        let ordered: Vec<&str> = tags.into_iter().filter(|t| seen.insert(*t)).collect();

        let before = self.colors.len();
        self.colors.retain(|tag, _| seen.contains(tag.as_str()));
        let dropped = before - self.colors.len();

        let mut added = 0;
        for tag in ordered {
            if !self.colors.contains_key(tag) {
                let color = self.next_color();
                self.colors.insert(tag.to_string(), color);
                added += 1;
            }
        }

        tracing::debug!("[TagIndex] Rebuilt: {} tags ({} new, {} dropped)", self.colors.len(), added, dropped);
        &self.colors
    }

    fn next_color(&mut self) -> String {
        let used: HashSet<&str> = self.colors.values().map(String::as_str).collect();
        if let Some(free) = self.palette.iter().find(|c| !used.contains(c.as_str())) {
            return free.clone();
        }
        let color = self.palette[self.cursor % self.palette.len()].clone();
        self.cursor += 1;
        color
    }
}

/// Trim, drop empties, dedupe; insertion order kept.
pub fn normalize_tags<S: AsRef<str>>(tags: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();
    tags.iter()
        .map(|t| t.as_ref().trim())
        .filter(|t| !t.is_empty() && seen.insert(t.to_string()))
        .map(str::to_string)
        .collect()
}
