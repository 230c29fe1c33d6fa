//! Core library for Leafnotes, a local-first, hierarchical note-taking application.
//!
//! The primary entry point is [`Workspace`], an open workspace directory: a
//! `nodes.jsonl` log describing the folder/note tree plus one content object
//! per note. All tree mutations go through `Workspace` methods. Packages
//! exported with [`export_package`] can be merged into another workspace
//! with [`import_package`], which deduplicates identical notes by content
//! hash. [`NotesApp`] wraps a workspace behind the uniform command results a
//! user interface consumes.
//!
//! Types are re-exported from their respective sub-modules for convenience;
//! consumers should import from the crate root rather than the `core` module.

pub mod core;

// Re-export commonly used types.
#[doc(inline)]
pub use core::{
    app::{CommandResult, NotesApp, PathPrompt, Reported},
    content_store::ContentStore,
    delete::{CascadeResult, EmptyTrashResult},
    error::{LeafnotesError, Result},
    export::{
        default_package_name, export_flat, export_package, ExportSummary, FlatExportSummary,
        Manifest, APP_VERSION, PACKAGE_VERSION,
    },
    hashing::ContentHash,
    i18n::{Catalog, Translator},
    import::{import_flat, import_package, note_title, FlatImportReport, ImportReport},
    init::{ensure_workspace, open_workspace, WorkspaceMeta},
    node::{Node, NodeType},
    node_log::NodeLog,
    settings::{load_settings, save_settings, AppSettings},
    workspace::Workspace,
};
