//! Line-delimited JSON record of every node in a workspace.

use crate::{Node, Result};
use indexmap::IndexMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub const NODE_LOG_FILE: &str = "nodes.jsonl";

/// In-memory view of `nodes.jsonl`, keyed by node ID in file order.
///
/// Mutations happen in memory; [`persist`](Self::persist) writes the whole map
/// to a temporary file next to the log and renames it over the original, so
/// the previous log stays intact until the rename succeeds.
#[derive(Debug)]
pub struct NodeLog {
    path: PathBuf,
    nodes: IndexMap<String, Node>,
}

impl NodeLog {
    /// Loads the log at `path`. A missing file is an empty log.
    ///
    /// # Errors
    ///
    /// Returns [`crate::LeafnotesError::Io`] if the file exists but cannot be read.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };
        let mut nodes = IndexMap::new();
        for node in parse_lines(&text) {
            nodes.insert(node.id.clone(), node);
        }
        Ok(Self { path, nodes })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes in log order.
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// IDs of the direct children of `parent_id`, trashed or not, in log order.
    pub fn child_ids(&self, parent_id: &str) -> Vec<String> {
        self.nodes
            .values()
            .filter(|n| n.parent_id.as_deref() == Some(parent_id))
            .map(|n| n.id.clone())
            .collect()
    }

    /// Adds or replaces a node in memory. Call [`persist`](Self::persist) afterwards.
    pub fn insert(&mut self, node: Node) {
        self.nodes.insert(node.id.clone(), node);
    }

    /// Removes a node from memory, keeping the order of the remaining lines.
    pub fn remove(&mut self, id: &str) -> Option<Node> {
        self.nodes.shift_remove(id)
    }

    /// Adds a batch of new nodes and persists them with a single rewrite.
    ///
    /// If the rewrite fails the batch is taken out of memory again.
    pub fn append(&mut self, batch: Vec<Node>) -> Result<()> {
        let snapshot = self.snapshot();
        for node in batch {
            self.insert(node);
        }
        if let Err(e) = self.persist() {
            self.rollback(snapshot);
            return Err(e);
        }
        Ok(())
    }

    /// Copy of the in-memory state, for [`rollback`](Self::rollback).
    pub(crate) fn snapshot(&self) -> IndexMap<String, Node> {
        self.nodes.clone()
    }

    pub(crate) fn rollback(&mut self, snapshot: IndexMap<String, Node>) {
        self.nodes = snapshot;
    }

    /// Rewrites the log atomically: temp file in the same directory, then rename.
    ///
    /// # Errors
    ///
    /// Returns [`crate::LeafnotesError::Io`] if the temp file cannot be written or
    /// renamed, or [`crate::LeafnotesError::Json`] if a node cannot be serialised.
    /// The existing log is untouched in either case.
    pub fn persist(&self) -> Result<()> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = NamedTempFile::new_in(dir)?;
        {
            let mut out = io::BufWriter::new(tmp.as_file_mut());
            for node in self.nodes.values() {
                serde_json::to_writer(&mut out, node)?;
                out.write_all(b"\n")?;
            }
            out.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)?;
        Ok(())
    }
}

/// Parses log text line by line, skipping blank and unparseable lines.
pub fn parse_lines(text: &str) -> Vec<Node> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .filter_map(|(i, line)| match serde_json::from_str::<Node>(line) {
            Ok(node) => Some(node),
            Err(e) => {
                log::warn!("Skipping unreadable node log line {}: {e}", i + 1);
                None
            }
        })
        .collect()
}
