//! Error types for the Leafnotes core library.

use crate::core::i18n::Translator;
use thiserror::Error;

/// All errors that can occur within the Leafnotes core library.
///
/// A user cancelling a path prompt is not an error; see
/// [`CommandResult::Cancelled`](crate::CommandResult::Cancelled).
#[derive(Debug, Error)]
pub enum LeafnotesError {
    /// A package is missing its manifest or node log, or one of them is malformed.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The workspace root or one of its required directories does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A node ID was requested that does not exist in the node log.
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    /// A create or move would place a node under a non-folder or create a cycle.
    #[error("Invalid move: {0}")]
    InvalidMove(String),

    /// The directory could not be turned into a usable workspace.
    #[error("Invalid workspace: {0}")]
    InvalidWorkspace(String),

    /// An I/O operation on the filesystem failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Metadata, a manifest or a settings file could not be (de)serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A package archive could not be read or written.
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

/// Convenience alias that pins the error type to [`LeafnotesError`].
pub type Result<T> = std::result::Result<T, LeafnotesError>;

impl From<walkdir::Error> for LeafnotesError {
    fn from(e: walkdir::Error) -> Self {
        Self::Io(e.into())
    }
}

impl From<tempfile::PersistError> for LeafnotesError {
    fn from(e: tempfile::PersistError) -> Self {
        Self::Io(e.error)
    }
}

impl LeafnotesError {
    /// Translation key of the short message shown for this error.
    #[must_use]
    pub fn message_key(&self) -> &'static str {
        match self {
            Self::Validation(_) => "error.invalidPackage",
            Self::NotFound(_) => "error.workspaceNotFound",
            Self::NodeNotFound(_) => "error.nodeNotFound",
            Self::InvalidMove(_) => "error.invalidMove",
            Self::InvalidWorkspace(_) => "error.invalidWorkspace",
            Self::Io(_) => "error.io",
            Self::Json(_) => "error.dataFormat",
            Self::Zip(_) => "error.archive",
        }
    }

    /// Returns a short, human-readable message suitable for display to the end user.
    ///
    /// The translated headline is followed by the underlying detail, except for
    /// [`NodeNotFound`](Self::NodeNotFound) where the raw ID means nothing to a user.
    #[must_use]
    pub fn user_message(&self, translator: &dyn Translator) -> String {
        let headline = translator.t(self.message_key());
        match self {
            Self::NodeNotFound(_) => headline,
            Self::Validation(detail)
            | Self::NotFound(detail)
            | Self::InvalidMove(detail)
            | Self::InvalidWorkspace(detail) => format!("{headline}: {detail}"),
            Self::Io(e) => format!("{headline}: {e}"),
            Self::Json(e) => format!("{headline}: {e}"),
            Self::Zip(e) => format!("{headline}: {e}"),
        }
    }
}
