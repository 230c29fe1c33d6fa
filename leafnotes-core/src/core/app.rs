//! The command boundary a host UI calls into.
//!
//! [`NotesApp`] owns the open [`Workspace`] behind a mutex and turns every
//! operation into a [`CommandResult`], the uniform shape a frontend renders:
//!
//! ```json
//! {"success": true, "noteCount": 3, "message": "Imported 3 notes (3 active, 0 in trash)"}
//! {"success": false, "error": "Invalid package: manifest.json is missing"}
//! {"success": false, "cancelled": true}
//! ```
//!
//! Errors are translated before they leave this module; cancellation of a
//! path prompt is reported as its own outcome and never as an error.

use crate::core::export::{self, ExportSummary, FlatExportSummary};
use crate::core::i18n::{fill, Translator};
use crate::core::import::{self, FlatImportReport, ImportReport};
use crate::{CascadeResult, EmptyTrashResult, Node, Result, Workspace};
use chrono::Utc;
use serde::ser::{Error as _, SerializeMap};
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// File and confirmation dialogs supplied by the host.
///
/// Every path method returns `None` when the user cancels.
pub trait PathPrompt {
    /// Asks where to save a new file, suggesting `default_name`.
    fn save_path(&self, default_name: &str) -> Option<PathBuf>;
    /// Asks for one existing file.
    fn open_file(&self) -> Option<PathBuf>;
    /// Asks for any number of existing files.
    fn open_files(&self) -> Option<Vec<PathBuf>>;
    /// Asks for a directory.
    fn pick_folder(&self) -> Option<PathBuf>;
    /// Shows `message` and returns whether the user agreed.
    fn confirm(&self, message: &str) -> bool;
}

/// Outcome of one command.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandResult<T> {
    Success(T),
    /// The operation failed; `error` is already translated for display.
    Failed { error: String },
    /// The user dismissed a prompt. Hosts show nothing for this.
    Cancelled,
}

impl<T> CommandResult<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The success details, if any.
    pub fn success(self) -> Option<T> {
        match self {
            Self::Success(details) => Some(details),
            _ => None,
        }
    }
}

/// Success details of object type are flattened next to `"success": true`;
/// any other value goes under `"data"`, and `()` adds nothing.
impl<T: Serialize> Serialize for CommandResult<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        match self {
            Self::Success(details) => {
                map.serialize_entry("success", &true)?;
                match serde_json::to_value(details).map_err(S::Error::custom)? {
                    Value::Object(fields) => {
                        for (key, value) in &fields {
                            map.serialize_entry(key, value)?;
                        }
                    }
                    Value::Null => {}
                    other => map.serialize_entry("data", &other)?,
                }
            }
            Self::Failed { error } => {
                map.serialize_entry("success", &false)?;
                map.serialize_entry("error", error)?;
            }
            Self::Cancelled => {
                map.serialize_entry("success", &false)?;
                map.serialize_entry("cancelled", &true)?;
            }
        }
        map.end()
    }
}

/// Details of a successful export or import, with a translated summary line.
#[derive(Debug, Clone, Serialize)]
pub struct Reported<T> {
    pub message: String,
    #[serde(flatten)]
    pub details: T,
}

/// One open workspace plus the host collaborators it needs.
pub struct NotesApp<P, T> {
    workspace: Mutex<Workspace>,
    prompt: P,
    translator: T,
}

impl<P: PathPrompt, T: Translator> NotesApp<P, T> {
    pub fn new(workspace: Workspace, prompt: P, translator: T) -> Self {
        Self {
            workspace: Mutex::new(workspace),
            prompt,
            translator,
        }
    }

    /// Locks the workspace for direct access.
    ///
    /// A panic in an earlier holder does not make the workspace unusable:
    /// the log on disk is only ever replaced whole.
    pub fn workspace(&self) -> MutexGuard<'_, Workspace> {
        self.workspace.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn translator(&self) -> &T {
        &self.translator
    }

    /// Asks for a destination and writes a package archive there.
    pub fn export_package(&self) -> CommandResult<Reported<ExportSummary>> {
        let default_name = export::default_package_name(Utc::now());
        let Some(dest) = self.prompt.save_path(&default_name) else {
            return CommandResult::Cancelled;
        };
        let result = {
            let ws = self.workspace();
            export::export_package(ws.root(), &dest)
        };
        self.finish(result.map(|summary| {
            let manifest = &summary.manifest;
            let message = fill(
                &self.translator.t("export.done"),
                &[
                    ("notes", manifest.note_count.to_string()),
                    ("active", manifest.active_notes.to_string()),
                    ("trashed", manifest.trashed_notes.to_string()),
                ],
            );
            Reported { message, details: summary }
        }))
    }

    /// Asks for a package and merges it into the workspace.
    ///
    /// The workspace stays locked for the whole merge.
    pub fn import_package(&self) -> CommandResult<Reported<ImportReport>> {
        let Some(path) = self.prompt.open_file() else {
            return CommandResult::Cancelled;
        };
        let result = import::import_package(&mut self.workspace(), &path);
        self.finish(result.map(|report| {
            let mut message = fill(
                &self.translator.t("import.done"),
                &[
                    ("notes", report.note_count.to_string()),
                    ("active", report.active_notes.to_string()),
                    ("trashed", report.trashed_notes.to_string()),
                ],
            );
            if report.conflict_count > 0 || report.skipped_count > 0 {
                message.push_str(". ");
                message.push_str(&fill(
                    &self.translator.t("import.details"),
                    &[
                        ("conflicts", report.conflict_count.to_string()),
                        ("skipped", report.skipped_count.to_string()),
                    ],
                ));
            }
            if report.rejected_count > 0 || report.rerooted_count > 0 {
                message.push_str(". ");
                message.push_str(&fill(
                    &self.translator.t("import.repaired"),
                    &[
                        ("rejected", report.rejected_count.to_string()),
                        ("rerooted", report.rerooted_count.to_string()),
                    ],
                ));
            }
            Reported { message, details: report }
        }))
    }

    /// Asks for a folder and copies the note bodies and images into it.
    pub fn export_flat(&self) -> CommandResult<Reported<FlatExportSummary>> {
        let Some(dir) = self.prompt.pick_folder() else {
            return CommandResult::Cancelled;
        };
        let result = {
            let ws = self.workspace();
            export::export_flat(ws.root(), &dir)
        };
        self.finish(result.map(|summary| Reported {
            message: fill(
                &self.translator.t("export.flatDone"),
                &[("files", summary.file_count.to_string())],
            ),
            details: summary,
        }))
    }

    /// Asks for note files and adds each one as a new note under `parent_id`.
    pub fn import_flat(&self, parent_id: Option<&str>) -> CommandResult<Reported<FlatImportReport>> {
        let Some(files) = self.prompt.open_files() else {
            return CommandResult::Cancelled;
        };
        let result = import::import_flat(&mut self.workspace(), &files, parent_id);
        self.finish(result.map(|report| {
            let mut message = fill(
                &self.translator.t("import.flatDone"),
                &[("notes", report.note_count.to_string())],
            );
            if !report.unreadable.is_empty() {
                message.push_str(". ");
                message.push_str(&fill(
                    &self.translator.t("import.unreadable"),
                    &[("files", report.unreadable.len().to_string())],
                ));
            }
            Reported { message, details: report }
        }))
    }

    /// Permanently deletes everything in the trash after asking the user.
    pub fn empty_trash(&self) -> CommandResult<Reported<EmptyTrashResult>> {
        let pending = self.workspace().node_log().iter().filter(|n| n.trashed).count();
        let question = fill(
            &self.translator.t("trash.confirmEmpty"),
            &[("count", pending.to_string())],
        );
        if !self.prompt.confirm(&question) {
            return CommandResult::Cancelled;
        }
        let result = self.workspace().empty_trash();
        self.finish(result.map(|emptied| Reported {
            message: fill(
                &self.translator.t("trash.emptied"),
                &[("count", emptied.deleted_count.to_string())],
            ),
            details: emptied,
        }))
    }

    pub fn get_node(&self, id: &str) -> CommandResult<Node> {
        self.finish(self.workspace().get_node(id).cloned())
    }

    pub fn list_children(&self, parent_id: Option<&str>, include_trashed: bool) -> CommandResult<Vec<Node>> {
        CommandResult::Success(self.workspace().list_children(parent_id, include_trashed))
    }

    pub fn list_trash(&self) -> CommandResult<Vec<Node>> {
        CommandResult::Success(self.workspace().list_trash())
    }

    pub fn create_folder(&self, parent_id: Option<&str>, name: &str) -> CommandResult<Node> {
        self.finish(self.workspace().create_folder(parent_id, name))
    }

    pub fn create_file(
        &self,
        parent_id: Option<&str>,
        name: &str,
        content: Option<&str>,
    ) -> CommandResult<Node> {
        self.finish(self.workspace().create_file(parent_id, name, content))
    }

    pub fn read_content(&self, id: &str) -> CommandResult<String> {
        self.finish(self.workspace().read_content(id))
    }

    pub fn write_content(&self, id: &str, body: &str) -> CommandResult<()> {
        self.finish(self.workspace().write_content(id, body))
    }

    pub fn rename(&self, id: &str, new_name: &str) -> CommandResult<Node> {
        self.finish(self.workspace().rename(id, new_name))
    }

    pub fn move_node(&self, id: &str, new_parent_id: Option<&str>, new_order: i64) -> CommandResult<Node> {
        self.finish(self.workspace().move_node(id, new_parent_id, new_order))
    }

    pub fn soft_delete(&self, id: &str) -> CommandResult<CascadeResult> {
        self.finish(self.workspace().soft_delete(id))
    }

    pub fn restore(&self, id: &str) -> CommandResult<CascadeResult> {
        self.finish(self.workspace().restore(id))
    }

    pub fn purge(&self, id: &str) -> CommandResult<CascadeResult> {
        self.finish(self.workspace().purge(id))
    }

    fn finish<U>(&self, result: Result<U>) -> CommandResult<U> {
        match result {
            Ok(details) => CommandResult::Success(details),
            Err(e) => {
                log::error!("Command failed: {e}");
                CommandResult::Failed {
                    error: e.user_message(&self.translator),
                }
            }
        }
    }
}
