//! Tree entries stored one per line in the node log.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Extension given to content objects and derived file names.
pub const NOTE_EXTENSION: &str = "md";

/// Whether a node is a folder or a note file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Folder,
    File,
}

/// A folder or file entry in the workspace tree.
///
/// Field names serialize in camelCase to match the on-disk log format.
/// Fields this version does not know about are kept in `extra` and written
/// back unchanged on every rewrite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub order: i64,
    #[serde(default)]
    pub content_id: Option<String>,
    #[serde(default)]
    pub trashed: bool,
    #[serde(default)]
    pub trashed_at: Option<i64>,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Node {
    /// Builds a new root-level or nested folder stamped with `now` (milliseconds).
    pub fn new_folder(parent_id: Option<&str>, name: &str, now: i64) -> Self {
        Self {
            id: new_id(),
            node_type: NodeType::Folder,
            name: name.to_string(),
            file_name: None,
            parent_id: parent_id.map(str::to_string),
            order: now,
            content_id: None,
            trashed: false,
            trashed_at: None,
            created_at: now,
            updated_at: now,
            extra: Map::new(),
        }
    }

    /// Builds a new file node with a freshly allocated content ID.
    pub fn new_file(parent_id: Option<&str>, name: &str, now: i64) -> Self {
        Self {
            node_type: NodeType::File,
            file_name: Some(derive_file_name(name)),
            content_id: Some(new_id()),
            ..Self::new_folder(parent_id, name, now)
        }
    }

    pub fn is_file(&self) -> bool {
        self.node_type == NodeType::File
    }

    pub fn is_folder(&self) -> bool {
        self.node_type == NodeType::Folder
    }

    /// On-disk file name, derived from the display name when the log omits it.
    ///
    /// Returns `None` for folders.
    pub fn effective_file_name(&self) -> Option<String> {
        if !self.is_file() {
            return None;
        }
        Some(
            self.file_name
                .clone()
                .unwrap_or_else(|| derive_file_name(&self.name)),
        )
    }
}

/// Allocates an opaque identifier for a node or content object.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn derive_file_name(name: &str) -> String {
    format!("{name}.{NOTE_EXTENSION}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_node_serializes_camel_case() {
        let node = Node::new_file(Some("parent-1"), "Groceries", 1_700_000_000_000);
        let json = serde_json::to_string(&node).unwrap();
        assert!(json.contains("\"type\":\"file\""));
        assert!(json.contains("\"parentId\":\"parent-1\""));
        assert!(json.contains("\"fileName\":\"Groceries.md\""));
        assert!(json.contains("\"contentId\":"));
        assert!(json.contains("\"trashedAt\":null"));
    }

    #[test]
    fn test_folder_has_no_content() {
        let node = Node::new_folder(None, "Projects", 5);
        assert!(node.is_folder());
        assert!(node.content_id.is_none());
        assert!(node.effective_file_name().is_none());
        assert_eq!(node.order, 5);
    }

    #[test]
    fn test_unknown_fields_survive_round_trip() {
        let line = r#"{"id":"n1","type":"file","name":"Todo","parentId":null,"order":3,"contentId":"c1","pinned":true,"color":"red"}"#;
        let node: Node = serde_json::from_str(line).unwrap();
        assert_eq!(node.extra.get("pinned"), Some(&Value::Bool(true)));

        let written = serde_json::to_string(&node).unwrap();
        assert!(written.contains("\"pinned\":true"));
        assert!(written.contains("\"color\":\"red\""));
    }

    #[test]
    fn test_missing_file_name_is_derived() {
        let line = r#"{"id":"n1","type":"file","name":"Todo","contentId":"c1"}"#;
        let node: Node = serde_json::from_str(line).unwrap();
        assert!(!node.trashed);
        assert_eq!(node.effective_file_name().as_deref(), Some("Todo.md"));
    }
}
