// FILE: src/engine/sorter.rs
use crate::storage::Note;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Orderings offered for the note list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    #[default]
    MostRecent,
    LeastRecent,
    TitleAsc,
    TitleDesc,
}

impl SortKey {
    pub const ALL: [SortKey; 4] = [SortKey::MostRecent, SortKey::LeastRecent, SortKey::TitleAsc, SortKey::TitleDesc];

    pub fn label(&self) -> &'static str {
        match self {
            SortKey::MostRecent => "Most recent",
            SortKey::LeastRecent => "Least recent",
            SortKey::TitleAsc => "Title (A-Z)",
            SortKey::TitleDesc => "Title (Z-A)",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "recent" | "most-recent" | "newest" => Ok(SortKey::MostRecent),
            "least-recent" | "oldest" => Ok(SortKey::LeastRecent),
            "title" | "title-asc" | "a-z" => Ok(SortKey::TitleAsc),
            "title-desc" | "z-a" => Ok(SortKey::TitleDesc),
            other => Err(format!(
                "unknown sort '{}' (expected recent, oldest, title or title-desc)",
                other
            )),
        }
    }
}

/// One run of a natural sort key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Chunk {
    // Digits order before text, as with a leading-number filename
    Number(u128, usize),
    Text(String),
}

/// Split into alternating digit / non-digit runs. Digit runs compare
/// numerically (ties broken by run length, so `01` sorts after `1`);
/// text runs compare case-insensitively.
fn natural_key(s: &str) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut rest = s;
    while let Some(first) = rest.chars().next() {
        let is_digit = first.is_ascii_digit();
        let end = rest
            .find(|c: char| c.is_ascii_digit() != is_digit)
            .unwrap_or(rest.len());
        let (run, tail) = rest.split_at(end);
        if is_digit {
            // Overlong runs saturate rather than fail
            let value = run.parse::<u128>().unwrap_or(u128::MAX);
            chunks.push(Chunk::Number(value, run.len()));
        } else {
            chunks.push(Chunk::Text(run.to_lowercase()));
        }
        rest = tail;
    }
    chunks
}

pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    natural_key(a).cmp(&natural_key(b))
}

/// Sort in place. Ties keep their scan order.
pub fn sort_notes(notes: &mut [Note], key: SortKey) {
    match key {
        SortKey::MostRecent => notes.sort_by(|a, b| b.modified.cmp(&a.modified)),
        SortKey::LeastRecent => notes.sort_by(|a, b| a.modified.cmp(&b.modified)),
        SortKey::TitleAsc => notes.sort_by_cached_key(|n| natural_key(&n.filename)),
        SortKey::TitleDesc => {
            notes.sort_by_cached_key(|n| std::cmp::Reverse(natural_key(&n.filename)))
        }
    }
}

/// Owned variant of [`sort_notes`].
pub fn sorted(mut notes: Vec<Note>, key: SortKey) -> Vec<Note> {
    sort_notes(&mut notes, key);
    notes
}
