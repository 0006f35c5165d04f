// FILE: src/engine/mod.rs
pub mod searcher;
pub mod sorter;

pub use searcher::search;
pub use sorter::{natural_cmp, sort_notes, sorted, SortKey};

use crate::storage::Note;

/// Sort then filter, the way the note list is presented.
pub fn list_view(notes: Vec<Note>, key: SortKey, term: &str) -> Vec<Note> {
    search(sorted(notes, key), term)
}
