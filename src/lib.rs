//! notestash: a filesystem-backed note and media repository
//!
//! Notes are plain markdown files in a permanent directory. Media embedded
//! in a note live next to it; fresh uploads wait in a staging directory
//! until the note that references them is saved. Each note carries a hidden
//! JSON sidecar with its media list and tags.
//!
//! - Core (reference extraction, media promotion, edit reconciliation)
//! - Storage (sidecars, the note repository, archive export)
//! - Engine (sorting and search over the cached list)
//! - Desk (session facade: staging, collision checks, refresh)

pub mod config;
pub mod core;
pub mod desk;
pub mod engine;
pub mod error;
pub mod state;
pub mod storage;
pub mod tags;

pub use config::{Config, ConfigArgs};
pub use crate::core::MediaDirs;
pub use desk::Desk;
pub use engine::SortKey;
pub use error::{NoteError, Result};
pub use state::{GlobalState, SharedState, StagingSession};
pub use storage::{
    ArchiveExporter, DeletePlan, DeleteReport, ExportedArchive, Note, NoteRepository, SidecarRecord, SidecarStore,
};
pub use tags::TagIndex;
