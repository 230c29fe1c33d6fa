//! Storage of note bodies as plain files under the workspace root.
//!
//! Every file node owns one object, `<contentId>.md`, kept in `objects/` while
//! the note is active and in `trash/` while it is trashed. Content IDs come
//! from node logs, which may arrive inside imported packages, so every
//! operation refuses IDs that are not a single plain file name.

use crate::core::node::NOTE_EXTENSION;
use crate::{LeafnotesError, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const OBJECTS_DIR: &str = "objects";
pub const TRASH_DIR: &str = "trash";
pub const IMAGES_DIR: &str = "images";

/// Note bodies stored as `<contentId>.md` in the active or trash directory.
///
/// There is no locking here; writes are serialized by whoever owns the
/// [`Workspace`](crate::Workspace).
#[derive(Debug, Clone)]
pub struct ContentStore {
    objects_dir: PathBuf,
    trash_dir: PathBuf,
}

impl ContentStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            objects_dir: root.as_ref().join(OBJECTS_DIR),
            trash_dir: root.as_ref().join(TRASH_DIR),
        }
    }

    /// Location of the active copy. Does not check `content_id`; see [`is_valid_content_id`].
    pub fn active_path(&self, content_id: &str) -> PathBuf {
        self.objects_dir.join(object_file_name(content_id))
    }

    pub fn trash_path(&self, content_id: &str) -> PathBuf {
        self.trash_dir.join(object_file_name(content_id))
    }

    /// Path of the existing copy, checking the active directory first.
    pub fn locate(&self, content_id: &str) -> Option<PathBuf> {
        if !is_valid_content_id(content_id) {
            return None;
        }
        [self.active_path(content_id), self.trash_path(content_id)]
            .into_iter()
            .find(|p| p.is_file())
    }

    pub fn exists(&self, content_id: &str) -> bool {
        self.locate(content_id).is_some()
    }

    /// Reads a note body. A missing object, or an unusable ID, reads as empty content.
    pub fn read(&self, content_id: &str) -> Result<String> {
        let Some(path) = self.locate(content_id) else {
            return Ok(String::new());
        };
        match fs::read_to_string(&path) {
            Ok(body) => Ok(body),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Overwrites the active copy of a note body.
    ///
    /// # Errors
    ///
    /// Returns [`LeafnotesError::Validation`] if `content_id` is not a plain file name.
    pub fn write(&self, content_id: &str, body: &str) -> Result<()> {
        if !is_valid_content_id(content_id) {
            return Err(LeafnotesError::Validation(format!(
                "invalid content ID {content_id:?}"
            )));
        }
        fs::create_dir_all(&self.objects_dir)?;
        fs::write(self.active_path(content_id), body)?;
        Ok(())
    }

    /// Moves the active copy into the trash directory; returns whether anything moved.
    pub fn move_to_trash(&self, content_id: &str) -> Result<bool> {
        if !usable(content_id) {
            return Ok(false);
        }
        fs::create_dir_all(&self.trash_dir)?;
        relocate(&self.active_path(content_id), &self.trash_path(content_id))
    }

    /// Moves the trash copy back into the active directory; returns whether anything moved.
    pub fn restore_from_trash(&self, content_id: &str) -> Result<bool> {
        if !usable(content_id) {
            return Ok(false);
        }
        fs::create_dir_all(&self.objects_dir)?;
        relocate(&self.trash_path(content_id), &self.active_path(content_id))
    }

    /// Deletes the object from both directories. Missing copies are not an error.
    pub fn remove(&self, content_id: &str) -> Result<()> {
        if !usable(content_id) {
            return Ok(());
        }
        for path in [self.active_path(content_id), self.trash_path(content_id)] {
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

/// Whether `content_id` can name an object: one path segment, no separators,
/// no `.`/`..`, no drive prefix and no control characters.
pub fn is_valid_content_id(content_id: &str) -> bool {
    !content_id.is_empty()
        && content_id != "."
        && content_id != ".."
        && !content_id
            .chars()
            .any(|c| matches!(c, '/' | '\\' | ':') || c.is_control())
}

fn usable(content_id: &str) -> bool {
    let valid = is_valid_content_id(content_id);
    if !valid {
        log::warn!("Ignoring invalid content ID {content_id:?}");
    }
    valid
}

pub fn object_file_name(content_id: &str) -> String {
    format!("{content_id}.{NOTE_EXTENSION}")
}

fn relocate(from: &Path, to: &Path) -> Result<bool> {
    if !from.is_file() {
        return Ok(false);
    }
    fs::rename(from, to)?;
    Ok(true)
}
