//! Result types for trash, restore and purge operations.
//!
//! Every removal in a [`Workspace`](super::workspace::Workspace) cascades over
//! a subtree:
//!
//! - [`Workspace::soft_delete`](super::workspace::Workspace::soft_delete) trashes
//!   the node and every descendant that is not already trashed.
//! - [`Workspace::restore`](super::workspace::Workspace::restore) restores the
//!   node and every trashed descendant.
//! - [`Workspace::purge`](super::workspace::Workspace::purge) permanently removes
//!   the node and all descendants, trashed or not.
//!
//! Each returns a [`CascadeResult`]. Emptying the trash purges every *root*
//! trashed node (one whose parent is absent or not trashed itself) and reports
//! an [`EmptyTrashResult`], so that descendants already covered by an
//! ancestor's cascade are counted once.
//!
//! ## Serialization
//!
//! Both types serialize in camelCase (`affectedIds`, `rootCount`), consistent
//! with all other return types crossing the application boundary.
//!
//! ## Examples
//!
//! ```rust
//! use leafnotes_core::EmptyTrashResult;
//!
//! let result = EmptyTrashResult { root_count: 1, deleted_count: 3 };
//! let json = serde_json::to_string(&result).unwrap();
//! assert_eq!(json, r#"{"rootCount":1,"deletedCount":3}"#);
//! ```

use serde::{Deserialize, Serialize};

/// The nodes touched by a cascading trash, restore or purge.
///
/// # Examples
///
/// ```rust
/// use leafnotes_core::CascadeResult;
///
/// let result = CascadeResult {
///     count: 2,
///     affected_ids: vec!["folder".to_string(), "child".to_string()],
/// };
/// let json = serde_json::to_string(&result).unwrap();
/// assert!(json.contains("affectedIds"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CascadeResult {
    /// Number of nodes whose state changed.
    pub count: usize,

    /// IDs of those nodes, the target first and descendants after it.
    pub affected_ids: Vec<String>,
}

impl CascadeResult {
    pub(crate) fn push(&mut self, id: &str) {
        self.count += 1;
        self.affected_ids.push(id.to_string());
    }
}

/// The outcome of emptying the trash.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmptyTrashResult {
    /// Number of root trashed nodes that were purged.
    pub root_count: usize,

    /// Total number of nodes permanently removed, descendants included.
    pub deleted_count: usize,
}
