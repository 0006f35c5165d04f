// FILE: src/engine/searcher.rs
use crate::storage::Note;

/// Does `note` match `needle`? `needle` must already be lowercase.
fn matches(note: &Note, needle: &str) -> bool {
    note.title.to_lowercase().contains(needle)
        || note.content.to_lowercase().contains(needle)
        || note.tags.iter().any(|t| t.to_lowercase().contains(needle))
}

/// Case-insensitive substring filter over title, content and tags.
/// A blank term returns the input unchanged.
pub fn search(notes: Vec<Note>, term: &str) -> Vec<Note> {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return notes;
    }

    let total = notes.len();
    let hits: Vec<Note> = notes.into_iter().filter(|n| matches(n, &needle)).collect();
    tracing::debug!("[Searcher] '{}' matched {} of {} notes", term, hits.len(), total);
    hits
}
