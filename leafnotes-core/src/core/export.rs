//! Workspace export as `.zip` packages and as a plain folder copy.

use crate::core::archive::{self, CopyAction};
use crate::core::content_store::{IMAGES_DIR, OBJECTS_DIR, TRASH_DIR};
use crate::core::init::META_FILE;
use crate::core::node_log::{NodeLog, NODE_LOG_FILE};
use crate::{LeafnotesError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use zip::ZipWriter;

/// Crate version recorded in every manifest.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Newest package layout this version writes and accepts.
pub const PACKAGE_VERSION: u32 = 1;

pub const MANIFEST_FILE: &str = "manifest.json";

/// Top-level JSON structure in `manifest.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub version: u32,
    pub app_version: String,
    pub export_date: DateTime<Utc>,
    #[serde(default)]
    pub note_count: usize,
    #[serde(default)]
    pub active_notes: usize,
    #[serde(default)]
    pub trashed_notes: usize,
    #[serde(default)]
    pub description: String,
}

impl Manifest {
    /// Describes the notes in `log`. Only file nodes count as notes.
    pub fn for_log(log: &NodeLog, export_date: DateTime<Utc>) -> Self {
        let (active, trashed) = log
            .iter()
            .filter(|n| n.is_file())
            .fold((0usize, 0usize), |(a, t), n| if n.trashed { (a, t + 1) } else { (a + 1, t) });
        Self {
            version: PACKAGE_VERSION,
            app_version: APP_VERSION.to_string(),
            export_date,
            note_count: active + trashed,
            active_notes: active,
            trashed_notes: trashed,
            description: format!("Leafnotes workspace export ({active} active, {trashed} trashed)"),
        }
    }
}

/// What [`export_package`] wrote.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSummary {
    pub path: PathBuf,
    pub manifest: Manifest,
    /// Number of content objects and images packed.
    pub file_count: usize,
}

/// What [`export_flat`] copied.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatExportSummary {
    pub path: PathBuf,
    pub file_count: usize,
}

/// Suggested file name for a package exported at `now`.
pub fn default_package_name(now: DateTime<Utc>) -> String {
    format!("leafnotes-export-{}.zip", now.format("%Y%m%d-%H%M%S"))
}

/// Packs the workspace at `root` into a zip archive at `dest`.
///
/// The archive holds `manifest.json`, the raw `nodes.jsonl`, `meta.json` and
/// the `objects/`, `trash/` and `images/` directories. It is assembled in a
/// temporary file next to `dest` and renamed into place once complete. The
/// workspace is only read.
///
/// # Errors
///
/// Returns [`LeafnotesError::NotFound`] if `root` or its node log does not
/// exist, or [`LeafnotesError::Io`] / [`LeafnotesError::Zip`] if writing fails.
pub fn export_package(root: &Path, dest: &Path) -> Result<ExportSummary> {
    let log_path = require_workspace(root)?;
    let log = NodeLog::load(&log_path)?;
    let manifest = Manifest::for_log(&log, Utc::now());

    let dest_dir = dest
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let tmp = NamedTempFile::new_in(dest_dir)?;

    let mut zip = ZipWriter::new(tmp.reopen()?);
    archive::add_bytes(&mut zip, MANIFEST_FILE, &serde_json::to_vec_pretty(&manifest)?)?;
    archive::add_file(&mut zip, NODE_LOG_FILE, &log_path)?;
    let meta_path = root.join(META_FILE);
    if meta_path.is_file() {
        archive::add_file(&mut zip, META_FILE, &meta_path)?;
    }
    let mut file_count = 0;
    for dir in [OBJECTS_DIR, TRASH_DIR, IMAGES_DIR] {
        file_count += archive::add_dir_tree(&mut zip, root, dir)?;
    }
    zip.finish()?;
    tmp.persist(dest)?;

    log::info!(
        "Exported {} notes ({} files) to {}",
        manifest.note_count,
        file_count,
        dest.display()
    );
    Ok(ExportSummary {
        path: dest.to_path_buf(),
        manifest,
        file_count,
    })
}

/// Copies the note bodies and images of the workspace into `dest_dir`.
///
/// Produces `dest_dir/objects/` and `dest_dir/images/` for use with other
/// tools; no node log or manifest is written. Existing files are replaced.
///
/// # Errors
///
/// Returns [`LeafnotesError::NotFound`] if `root` is not a workspace, or
/// [`LeafnotesError::Io`] if a copy fails.
pub fn export_flat(root: &Path, dest_dir: &Path) -> Result<FlatExportSummary> {
    require_workspace(root)?;
    fs::create_dir_all(dest_dir)?;
    let mut file_count = 0;
    for dir in [OBJECTS_DIR, IMAGES_DIR] {
        file_count += archive::copy_dir_tree(&root.join(dir), &dest_dir.join(dir), |rel| {
            CopyAction::Overwrite(rel.to_path_buf())
        })?;
    }
    log::info!("Copied {file_count} files to {}", dest_dir.display());
    Ok(FlatExportSummary {
        path: dest_dir.to_path_buf(),
        file_count,
    })
}

fn require_workspace(root: &Path) -> Result<PathBuf> {
    if !root.is_dir() {
        return Err(LeafnotesError::NotFound(format!(
            "workspace directory {}",
            root.display()
        )));
    }
    let log_path = root.join(NODE_LOG_FILE);
    if !log_path.is_file() {
        return Err(LeafnotesError::NotFound(format!(
            "{NODE_LOG_FILE} in {}",
            root.display()
        )));
    }
    Ok(log_path)
}
