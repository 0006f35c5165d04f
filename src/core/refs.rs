// FILE: src/core/refs.rs
//! Reference Extractor
//!
//! Finds embedded-media markers of the form `![alt](/<dir>/<filename>)`.
//! Nothing else in the markup is interpreted.

use regex::Regex;
use std::collections::HashSet;
use std::ops::Range;
use std::path::{Component, Path};
use std::sync::LazyLock;

static MEDIA_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"!\[(.*?)\]\(/([^/)]+)/([^/)]+)\)").expect("valid media marker regex")
});

/// One embedded-media marker found in a text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaMarker<'a> {
    /// Byte range of the whole marker in the source text
    pub span: Range<usize>,
    pub alt: &'a str,
    pub dir: &'a str,
    pub filename: &'a str,
}

/// Every well-formed marker in `text`, in order of appearance.
///
/// Only markers whose filename is a plain file name are yielded, so a
/// marker cannot address a file outside its directory.
pub fn markers(text: &str) -> impl Iterator<Item = MediaMarker<'_>> {
    MEDIA_MARKER.captures_iter(text).filter_map(|caps| {
        let whole = caps.get(0)?;
        let filename = caps.get(3)?.as_str();
        if !is_plain_filename(filename) {
            return None;
        }
        Some(MediaMarker {
            span: whole.range(),
            alt: caps.get(1).map_or("", |m| m.as_str()),
            dir: caps.get(2)?.as_str(),
            filename,
        })
    })
}

/// Markers pointing at `/<dir_label>/`.
pub fn markers_in<'a>(text: &'a str, dir_label: &'a str) -> impl Iterator<Item = MediaMarker<'a>> + 'a {
    markers(text).filter(move |m| m.dir == dir_label)
}

/// Filenames embedded in `text` under `/<dir_label>/`, deduplicated,
/// in order of first appearance.
pub fn extract_refs(text: &str, dir_label: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    markers_in(text, dir_label)
        .filter(|m| seen.insert(m.filename))
        .map(|m| m.filename.to_string())
        .collect()
}

/// Render a marker.
pub fn render_marker(alt: &str, dir_label: &str, filename: &str) -> String {
    format!("![{}](/{}/{})", alt, dir_label, filename)
}

/// Remove every marker under `/<dir_label>/` for which `drop` returns true.
/// Returns the rewritten text and the filenames that were stripped.
pub fn strip_markers<F>(text: &str, dir_label: &str, mut drop: F) -> (String, Vec<String>)
where
    F: FnMut(&str) -> bool,
{
    let mut out = String::with_capacity(text.len());
    let mut stripped = Vec::new();
    let mut cursor = 0;

    for marker in markers_in(text, dir_label) {
        if drop(marker.filename) {
            out.push_str(&text[cursor..marker.span.start]);
            cursor = marker.span.end;
            stripped.push(marker.filename.to_string());
        }
    }
    out.push_str(&text[cursor..]);
    (out, stripped)
}

/// True when `name` is exactly one normal path component: no separators,
/// no `.` or `..`, no root or prefix.
pub fn is_plain_filename(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!((components.next(), components.next()), (Some(Component::Normal(_)), None))
}

/// Can `label` be written in the directory part of a marker?
pub fn is_marker_label(label: &str) -> bool {
    !label.is_empty() && !label.contains(['/', ')'])
}

/// Final path component of a directory, used as its marker label.
pub fn dir_label(dir: &Path) -> Option<&str> {
    dir.file_name().and_then(|n| n.to_str())
}
