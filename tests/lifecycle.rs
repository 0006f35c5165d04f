// FILE: tests/lifecycle.rs
// End-to-end note lifecycle through the public API.

use notestash::core::refs::extract_refs;
use notestash::{Config, Desk, NoteError, SortKey, TagIndex};
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

fn open_desk() -> (TempDir, Desk, Config) {
    let root = TempDir::new().unwrap();
    let mut config = Config::rooted_at(root.path());
    config.archive_ttl = Duration::from_millis(20);
    let desk = Desk::open(&config).unwrap();
    (root, desk, config)
}

fn staged_name(target: &str) -> &str {
    target.rsplit('/').next().unwrap()
}

#[test]
fn test_create_trip_with_staged_media() {
    let (_root, desk, config) = open_desk();
    let target = desk.stage_upload("beach.png", b"pixels").unwrap();
    let name = staged_name(&target).to_string();

    let note = desk.save_new("Trip", &format!("Day one\n![beach]({})\n", target), &[]).unwrap();

    let on_disk = fs::read_to_string(config.notes_dir.join("Trip.md")).unwrap();
    assert!(on_disk.contains(&format!("![beach](/notes/{})", name)));
    assert!(!on_disk.contains("/temp/"));
    assert!(!config.staging_dir.join(&name).exists());
    assert!(config.notes_dir.join(&name).exists());

    let sidecar = desk.repository().sidecars().read("Trip.md").unwrap().unwrap();
    assert_eq!(sidecar.images, vec![name.clone()]);
    assert_eq!(note.image_refs, vec![name]);
}

#[test]
fn test_edit_removing_only_media() {
    let (_root, desk, config) = open_desk();
    let target = desk.stage_upload("a.png", b"1").unwrap();
    let name = staged_name(&target).to_string();
    desk.save_new("Solo", &format!("![a]({})", target), &[]).unwrap();

    let edited = desk.save_edit("Solo.md", "words only", &["kept".to_string()]).unwrap();

    assert!(!config.notes_dir.join(&name).exists());
    let sidecar = desk.repository().sidecars().read("Solo.md").unwrap().unwrap();
    assert!(sidecar.images.is_empty());
    assert_eq!(sidecar.tags, vec!["kept"]);
    assert!(edited.image_refs.is_empty());
}

#[test]
fn test_sidecar_tracks_content_across_edits() {
    let (_root, desk, _config) = open_desk();
    let first = desk.stage_upload("1.png", b"1").unwrap();
    desk.save_new("Album", &format!("![1]({})", first), &[]).unwrap();

    let second = desk.stage_upload("2.png", b"2").unwrap();
    let current = desk.note("Album.md").unwrap();
    let draft = format!("{}\n![2]({})\n![ghost](/temp/ghost.png)", current.content, second);
    let edited = desk.save_edit("Album.md", &draft, &[]).unwrap();

    let sidecar = desk.repository().sidecars().read("Album.md").unwrap().unwrap();
    assert_eq!(sidecar.images, extract_refs(&edited.content, "notes"));
    assert_eq!(sidecar.images.len(), 2);
    assert!(!edited.content.contains("ghost"));
}

#[test]
fn test_delete_twice() {
    let (_root, desk, config) = open_desk();
    let target = desk.stage_upload("a.png", b"1").unwrap();
    let name = staged_name(&target).to_string();
    let note = desk.save_new("Gone", &format!("![a]({})", target), &[]).unwrap();

    desk.delete("Gone.md").unwrap();
    assert!(!config.notes_dir.join("Gone.md").exists());
    assert!(!config.notes_dir.join(".Gone.md.sidecar").exists());
    assert!(!config.notes_dir.join(&name).exists());

    // Gone from the cache, so the desk reports it; the repository tolerates it
    assert!(matches!(desk.delete("Gone.md"), Err(NoteError::NotFound(_))));
    assert!(desk.repository().delete(&note).is_ok());
}

#[test]
fn test_natural_title_sort() {
    let (_root, desk, _config) = open_desk();
    for title in ["note2", "note10", "note1"] {
        desk.save_new(title, "x", &[]).unwrap();
    }

    let names: Vec<String> = desk.list(SortKey::TitleAsc, "").into_iter().map(|n| n.filename).collect();
    assert_eq!(names, vec!["note1.md", "note2.md", "note10.md"]);
}

#[test]
fn test_tag_color_stability() {
    let mut index = TagIndex::with_colors(
        vec!["#111".into(), "#222".into()],
        [("work".to_string(), "#111".to_string())],
    );
    index.rebuild_from(["work", "home"]);

    assert_eq!(index.color_of("work"), Some("#111"));
    assert_eq!(index.color_of("home"), Some("#222"));
}

#[test]
fn test_legacy_sidecar_is_read_and_migrated() {
    let (_root, desk, config) = open_desk();
    fs::write(config.notes_dir.join("old.md"), "![x](/notes/x.png)").unwrap();
    fs::write(config.notes_dir.join("x.png"), b"x").unwrap();
    fs::write(config.notes_dir.join(".old.md.sidecar"), r#"{"old.md": ["x.png"]}"#).unwrap();

    desk.refresh();
    let note = desk.note("old.md").unwrap();
    assert!(note.tags.is_empty());
    assert_eq!(note.image_refs, vec!["x.png"]);

    desk.save_edit("old.md", &note.content, &["migrated".to_string()]).unwrap();
    let raw = fs::read_to_string(config.notes_dir.join(".old.md.sidecar")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(json["old.md"]["images"][0], "x.png");
    assert_eq!(json["old.md"]["tags"][0], "migrated");
}

#[tokio::test]
async fn test_export_and_cleanup() {
    let (_root, desk, _config) = open_desk();
    let target = desk.stage_upload("a.png", b"1").unwrap();
    desk.save_new("Pack", &format!("![a]({})", target), &[]).unwrap();

    let exported = desk.export("Pack.md").await.unwrap();
    let archive = zip::ZipArchive::new(fs::File::open(&exported.path).unwrap()).unwrap();
    assert_eq!(archive.len(), 2);
    drop(archive);

    exported.cleanup.await.unwrap();
    assert!(!exported.path.exists());
}
