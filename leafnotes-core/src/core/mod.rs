//! Internal domain modules for the Leafnotes core library.
//!
//! All public types from these modules are re-exported at the crate root
//! with `#[doc(inline)]`; import from there in preference to this module.

pub mod app;
pub(crate) mod archive;
pub mod content_store;
pub mod delete;
pub mod error;
pub mod export;
pub mod hashing;
pub mod i18n;
pub mod import;
pub mod init;
pub mod node;
pub mod node_log;
pub mod settings;
pub mod workspace;

#[doc(inline)]
pub use app::{CommandResult, NotesApp, PathPrompt, Reported};
#[doc(inline)]
pub use content_store::ContentStore;
#[doc(inline)]
pub use delete::{CascadeResult, EmptyTrashResult};
#[doc(inline)]
pub use error::{LeafnotesError, Result};
#[doc(inline)]
pub use export::{
    export_flat, export_package, ExportSummary, FlatExportSummary, Manifest, APP_VERSION,
};
#[doc(inline)]
pub use hashing::ContentHash;
#[doc(inline)]
pub use i18n::{Catalog, Translator};
#[doc(inline)]
pub use import::{import_flat, import_package, FlatImportReport, ImportReport};
#[doc(inline)]
pub use init::{ensure_workspace, open_workspace, WorkspaceMeta};
#[doc(inline)]
pub use node::{Node, NodeType};
#[doc(inline)]
pub use node_log::NodeLog;
#[doc(inline)]
pub use settings::AppSettings;
#[doc(inline)]
pub use workspace::Workspace;
