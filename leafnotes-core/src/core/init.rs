//! On-disk layout of a workspace and resolution of which root to open.

use crate::core::content_store::{OBJECTS_DIR, TRASH_DIR};
use crate::core::node_log::{NodeLog, NODE_LOG_FILE};
use crate::core::settings::{default_workspace_root, AppSettings};
use crate::{Result, Workspace};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const META_FILE: &str = "meta.json";

/// Schema version written to `meta.json` for new workspaces.
pub const WORKSPACE_VERSION: u32 = 1;

/// Contents of `meta.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceMeta {
    pub workspace_id: String,
    pub version: u32,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub last_opened_at: Option<DateTime<Utc>>,
}

impl WorkspaceMeta {
    fn new() -> Self {
        Self {
            workspace_id: Uuid::new_v4().to_string(),
            version: WORKSPACE_VERSION,
            created_at: Utc::now(),
            last_opened_at: None,
        }
    }

    /// Writes the metadata to `<root>/meta.json`.
    pub fn save(&self, root: &Path) -> Result<()> {
        fs::write(root.join(META_FILE), serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// Creates whatever part of the workspace layout is missing under `root`.
///
/// Safe to call on an existing workspace: directories, the log and the
/// metadata are only created when absent. Unreadable metadata is replaced
/// with fresh metadata.
///
/// # Errors
///
/// Returns [`crate::LeafnotesError::Io`] if a directory or file cannot be created.
pub fn ensure_workspace(root: &Path) -> Result<WorkspaceMeta> {
    fs::create_dir_all(root.join(OBJECTS_DIR))?;
    fs::create_dir_all(root.join(TRASH_DIR))?;

    match OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(root.join(NODE_LOG_FILE))
    {
        Ok(_) => log::info!("Created empty node log in {}", root.display()),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
        Err(e) => return Err(e.into()),
    }

    let meta_path = root.join(META_FILE);
    let existing = match fs::read_to_string(&meta_path) {
        Ok(text) => match serde_json::from_str::<WorkspaceMeta>(&text) {
            Ok(meta) => Some(meta),
            Err(e) => {
                log::warn!("Replacing unreadable {}: {e}", meta_path.display());
                None
            }
        },
        Err(e) if e.kind() == io::ErrorKind::NotFound => None,
        Err(e) => return Err(e.into()),
    };

    match existing {
        Some(meta) => Ok(meta),
        None => {
            let meta = WorkspaceMeta::new();
            meta.save(root)?;
            log::info!("Initialised workspace {} in {}", meta.workspace_id, root.display());
            Ok(meta)
        }
    }
}

/// Parses the node log of the workspace at `root`.
pub fn load_workspace(root: &Path) -> Result<NodeLog> {
    NodeLog::load(root.join(NODE_LOG_FILE))
}

/// Opens the workspace at `root`, else the last one used, else the platform default.
///
/// If the chosen root cannot be set up, a warning is logged and the platform
/// default is used instead. The opened root is recorded in `settings`; the
/// caller decides when to save them.
///
/// # Errors
///
/// Returns an error only if the platform default itself cannot be opened.
pub fn open_workspace(root: Option<&Path>, settings: &mut AppSettings) -> Result<Workspace> {
    open_workspace_with_default(root, settings, &default_workspace_root())
}

pub(crate) fn open_workspace_with_default(
    root: Option<&Path>,
    settings: &mut AppSettings,
    default_root: &Path,
) -> Result<Workspace> {
    let candidate: PathBuf = root
        .map(Path::to_path_buf)
        .or_else(|| settings.last_workspace.clone())
        .unwrap_or_else(|| default_root.to_path_buf());

    let workspace = match Workspace::open(&candidate) {
        Ok(ws) => ws,
        Err(e) if candidate != default_root => {
            log::warn!(
                "Could not open workspace at {} ({e}); falling back to {}",
                candidate.display(),
                default_root.display()
            );
            Workspace::open(default_root)?
        }
        Err(e) => return Err(e),
    };

    settings.last_workspace = Some(workspace.root().to_path_buf());
    Ok(workspace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_ensure_creates_layout() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("ws");
        let meta = ensure_workspace(&root).unwrap();

        assert!(root.join("objects").is_dir());
        assert!(root.join("trash").is_dir());
        assert_eq!(fs::read_to_string(root.join("nodes.jsonl")).unwrap(), "");
        assert_eq!(meta.version, WORKSPACE_VERSION);
        assert!(root.join("meta.json").is_file());
    }

    #[test]
    fn test_ensure_is_idempotent() {
        let dir = tempdir().unwrap();
        let first = ensure_workspace(dir.path()).unwrap();
        fs::write(
            dir.path().join("nodes.jsonl"),
            r#"{"id":"a","type":"folder","name":"A"}"#.to_string() + "\n",
        )
        .unwrap();

        let second = ensure_workspace(dir.path()).unwrap();
        assert_eq!(first.workspace_id, second.workspace_id);
        assert_eq!(load_workspace(dir.path()).unwrap().len(), 1);
    }

    #[test]
    fn test_corrupt_meta_is_replaced() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("meta.json"), "garbage").unwrap();
        let meta = ensure_workspace(dir.path()).unwrap();
        let on_disk: WorkspaceMeta =
            serde_json::from_str(&fs::read_to_string(dir.path().join("meta.json")).unwrap())
                .unwrap();
        assert_eq!(meta.workspace_id, on_disk.workspace_id);
    }

    #[test]
    fn test_open_prefers_explicit_then_last_used() {
        let dir = tempdir().unwrap();
        let default_root = dir.path().join("default");
        let explicit = dir.path().join("explicit");
        let previous = dir.path().join("previous");

        let mut settings = AppSettings {
            last_workspace: Some(previous.clone()),
            ..AppSettings::default()
        };
        let ws = open_workspace_with_default(Some(&explicit), &mut settings, &default_root).unwrap();
        assert_eq!(ws.root(), explicit.as_path());
        assert_eq!(settings.last_workspace, Some(explicit.clone()));

        settings.last_workspace = Some(previous.clone());
        let ws = open_workspace_with_default(None, &mut settings, &default_root).unwrap();
        assert_eq!(ws.root(), previous.as_path());

        let mut fresh = AppSettings::default();
        let ws = open_workspace_with_default(None, &mut fresh, &default_root).unwrap();
        assert_eq!(ws.root(), default_root.as_path());
    }

    #[test]
    fn test_open_falls_back_when_root_cannot_be_created() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("a-file");
        fs::write(&blocker, "not a directory").unwrap();
        let default_root = dir.path().join("default");

        let mut settings = AppSettings::default();
        let ws = open_workspace_with_default(
            Some(&blocker.join("workspace")),
            &mut settings,
            &default_root,
        )
        .unwrap();
        assert_eq!(ws.root(), default_root.as_path());
        assert_eq!(settings.last_workspace, Some(default_root));
    }
}
