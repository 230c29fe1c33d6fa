//! High-level tree operations over a Leafnotes workspace directory.

use crate::core::content_store::ContentStore;
use crate::core::init::{ensure_workspace, load_workspace, WorkspaceMeta};
use crate::core::node_log::NodeLog;
use crate::{CascadeResult, EmptyTrashResult, LeafnotesError, Node, Result};
use chrono::Utc;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// An open workspace: its node log loaded in memory plus the content store.
///
/// `Workspace` is the primary interface for all tree mutations. Every
/// mutating method rewrites the node log before returning. Mutations take
/// `&mut self`; an application sharing one workspace between threads wraps
/// it in a `Mutex` (see [`NotesApp`](crate::NotesApp)).
#[derive(Debug)]
pub struct Workspace {
    root: PathBuf,
    meta: WorkspaceMeta,
    log: NodeLog,
    store: ContentStore,
}

impl Workspace {
    /// Opens the workspace at `root`, creating its layout first if needed.
    ///
    /// Refreshes `lastOpenedAt` in the metadata.
    ///
    /// # Errors
    ///
    /// Returns [`LeafnotesError::Io`] if the layout cannot be created or the log
    /// cannot be read.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let mut meta = ensure_workspace(&root)?;
        meta.last_opened_at = Some(Utc::now());
        meta.save(&root)?;
        let log = load_workspace(&root)?;
        log::info!("Opened workspace {} ({} nodes)", root.display(), log.len());
        Ok(Self {
            store: ContentStore::new(&root),
            root,
            meta,
            log,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn meta(&self) -> &WorkspaceMeta {
        &self.meta
    }

    pub fn node_log(&self) -> &NodeLog {
        &self.log
    }

    pub(crate) fn node_log_mut(&mut self) -> &mut NodeLog {
        &mut self.log
    }

    pub fn content_store(&self) -> &ContentStore {
        &self.store
    }

    /// Fetches a single node by ID.
    ///
    /// # Errors
    ///
    /// Returns [`LeafnotesError::NodeNotFound`] if no node has this ID.
    pub fn get_node(&self, id: &str) -> Result<&Node> {
        self.log
            .get(id)
            .ok_or_else(|| LeafnotesError::NodeNotFound(id.to_string()))
    }

    /// Returns the direct children of `parent_id` (`None` for the root level).
    ///
    /// Children are sorted by `order`, ties broken by name, so the result is
    /// stable for display. Trashed children are left out unless
    /// `include_trashed` is set.
    pub fn list_children(&self, parent_id: Option<&str>, include_trashed: bool) -> Vec<Node> {
        let mut children: Vec<Node> = self
            .log
            .iter()
            .filter(|n| n.parent_id.as_deref() == parent_id)
            .filter(|n| include_trashed || !n.trashed)
            .cloned()
            .collect();
        children.sort_by(sibling_order);
        children
    }

    /// Returns the trashed nodes whose parent is absent or not trashed itself.
    ///
    /// These are the entries a trash view shows; their trashed descendants come
    /// along with them on restore or purge.
    pub fn list_trash(&self) -> Vec<Node> {
        let mut roots: Vec<Node> = self
            .log
            .iter()
            .filter(|n| self.is_trash_root(n))
            .cloned()
            .collect();
        roots.sort_by(sibling_order);
        roots
    }

    /// Creates a folder under `parent_id` (`None` for the root level).
    ///
    /// # Errors
    ///
    /// Returns [`LeafnotesError::InvalidMove`] if the parent is not an active
    /// folder, or [`LeafnotesError::NodeNotFound`] if it does not exist.
    pub fn create_folder(&mut self, parent_id: Option<&str>, name: &str) -> Result<Node> {
        self.check_parent(parent_id)?;
        let node = Node::new_folder(parent_id, name, now_millis());
        self.transact(|ws| {
            ws.log.insert(node.clone());
            Ok(node)
        })
    }

    /// Creates a note under `parent_id` with a fresh content object.
    ///
    /// Without `content` the note starts from a heading with its name.
    ///
    /// # Errors
    ///
    /// Same as [`create_folder`](Self::create_folder), plus
    /// [`LeafnotesError::Io`] if the content object cannot be written.
    pub fn create_file(
        &mut self,
        parent_id: Option<&str>,
        name: &str,
        content: Option<&str>,
    ) -> Result<Node> {
        self.check_parent(parent_id)?;
        let node = Node::new_file(parent_id, name, now_millis());
        let body = content.map_or_else(|| default_body(name), str::to_string);
        if let Some(content_id) = &node.content_id {
            self.store.write(content_id, &body)?;
        }
        self.transact(|ws| {
            ws.log.insert(node.clone());
            Ok(node)
        })
    }

    /// Reads the body of a file node. A missing content object reads as empty.
    pub fn read_content(&self, id: &str) -> Result<String> {
        let node = self.get_node(id)?;
        match &node.content_id {
            Some(content_id) => self.store.read(content_id),
            None => Ok(String::new()),
        }
    }

    /// Replaces the body of an active file node and refreshes `updatedAt`.
    ///
    /// # Errors
    ///
    /// Returns [`LeafnotesError::Validation`] for folders and trashed notes.
    pub fn write_content(&mut self, id: &str, body: &str) -> Result<()> {
        let node = self.get_node(id)?;
        if node.trashed {
            return Err(LeafnotesError::Validation(
                "A note in the trash cannot be edited".to_string(),
            ));
        }
        let Some(content_id) = node.content_id.clone() else {
            return Err(LeafnotesError::Validation("A folder has no content".to_string()));
        };
        self.store.write(&content_id, body)?;
        self.transact(|ws| ws.touch(id))
    }

    /// Renames a node. File nodes get a matching `fileName`.
    ///
    /// # Errors
    ///
    /// Returns [`LeafnotesError::Validation`] if the new name is blank.
    pub fn rename(&mut self, id: &str, new_name: &str) -> Result<Node> {
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return Err(LeafnotesError::Validation("Name cannot be empty".to_string()));
        }
        self.transact(|ws| {
            let node = ws.node_mut(id)?;
            node.name = new_name.to_string();
            if node.is_file() {
                node.file_name = None;
                node.file_name = node.effective_file_name();
            }
            node.updated_at = now_millis();
            Ok(node.clone())
        })
    }

    /// Moves a node under `new_parent_id` (`None` for the root level) with a new `order`.
    ///
    /// # Errors
    ///
    /// Returns [`LeafnotesError::InvalidMove`] if the node would become its own
    /// parent or ancestor, or if the target is not an active folder.
    pub fn move_node(
        &mut self,
        id: &str,
        new_parent_id: Option<&str>,
        new_order: i64,
    ) -> Result<Node> {
        self.get_node(id)?;

        // 1. Self-move check
        if new_parent_id == Some(id) {
            return Err(LeafnotesError::InvalidMove(
                "A node cannot be its own parent".to_string(),
            ));
        }

        // 2. Target must be an active folder
        self.check_parent(new_parent_id)?;

        // 3. Cycle check: walk the ancestor chain of the new parent
        let mut seen = HashSet::new();
        let mut current = new_parent_id.map(str::to_string);
        while let Some(ancestor) = current {
            if ancestor == id || !seen.insert(ancestor.clone()) {
                return Err(LeafnotesError::InvalidMove(
                    "Move would create a cycle".to_string(),
                ));
            }
            current = self.log.get(&ancestor).and_then(|n| n.parent_id.clone());
        }

        self.transact(|ws| {
            let node = ws.node_mut(id)?;
            node.parent_id = new_parent_id.map(str::to_string);
            node.order = new_order;
            node.updated_at = now_millis();
            Ok(node.clone())
        })
    }

    /// Moves a node and every active descendant to the trash.
    ///
    /// Content objects of file nodes move from `objects/` to `trash/`.
    /// Descendants that were already trashed keep their own `trashedAt`.
    /// On failure nothing changes: the log is untouched and objects already
    /// moved are put back.
    ///
    /// # Errors
    ///
    /// Returns [`LeafnotesError::NodeNotFound`] if `id` does not exist, or
    /// [`LeafnotesError::Io`] if a content object cannot be moved.
    pub fn soft_delete(&mut self, id: &str) -> Result<CascadeResult> {
        self.get_node(id)?;
        let now = now_millis();
        let mut moved = Vec::new();

        let outcome = self.transact(|ws| {
            let mut result = CascadeResult::default();
            let mut seen = HashSet::new();
            let mut stack = vec![id.to_string()];
            while let Some(current) = stack.pop() {
                if !seen.insert(current.clone()) {
                    continue;
                }
                let node = ws.node_mut(&current)?;
                if !node.trashed {
                    node.trashed = true;
                    node.trashed_at = Some(now);
                    node.updated_at = now;
                    let content_id = node.content_id.clone();
                    if let Some(content_id) = content_id {
                        if ws.store.move_to_trash(&content_id)? {
                            moved.push(content_id);
                        }
                    }
                    result.push(&current);
                }
                let active_children = ws
                    .log
                    .child_ids(&current)
                    .into_iter()
                    .filter(|child| ws.log.get(child).is_some_and(|n| !n.trashed));
                stack.extend(active_children.rev().collect::<Vec<_>>());
            }
            Ok(result)
        });

        if outcome.is_err() {
            for content_id in &moved {
                if let Err(e) = self.store.restore_from_trash(content_id) {
                    log::warn!("Could not move {content_id} back out of the trash: {e}");
                }
            }
        }
        outcome
    }

    /// Restores a node, its whole trashed subtree and any trashed ancestors.
    ///
    /// Restoring the ancestors keeps the node visible: an active node never
    /// sits under a trashed folder. Siblings trashed with an ancestor stay in
    /// the trash. On failure nothing changes.
    ///
    /// # Errors
    ///
    /// Returns [`LeafnotesError::NodeNotFound`] if `id` does not exist, or
    /// [`LeafnotesError::Io`] if a content object cannot be moved back.
    pub fn restore(&mut self, id: &str) -> Result<CascadeResult> {
        let mut ids = self.trashed_ancestors(id)?;
        ids.extend(self.subtree_ids(id)?);
        let now = now_millis();
        let mut moved = Vec::new();

        let outcome = self.transact(|ws| {
            let mut result = CascadeResult::default();
            for current in &ids {
                let node = ws.node_mut(current)?;
                if !node.trashed {
                    continue;
                }
                node.trashed = false;
                node.trashed_at = None;
                node.updated_at = now;
                let content_id = node.content_id.clone();
                if let Some(content_id) = content_id {
                    if ws.store.restore_from_trash(&content_id)? {
                        moved.push(content_id);
                    }
                }
                result.push(current);
            }
            Ok(result)
        });

        if outcome.is_err() {
            for content_id in &moved {
                if let Err(e) = self.store.move_to_trash(content_id) {
                    log::warn!("Could not move {content_id} back into the trash: {e}");
                }
            }
        }
        outcome
    }

    /// Permanently deletes a node and every descendant, trashed or not.
    ///
    /// The log is rewritten first; content objects are deleted afterwards from
    /// whichever directory holds them. An object that cannot be deleted is
    /// logged and left behind unreferenced. There is no undo.
    ///
    /// # Errors
    ///
    /// Returns [`LeafnotesError::NodeNotFound`] if `id` does not exist, or
    /// [`LeafnotesError::Io`] if the log cannot be rewritten.
    pub fn purge(&mut self, id: &str) -> Result<CascadeResult> {
        let mut content_ids = Vec::new();
        let result = self.transact(|ws| ws.remove_subtree(id, &mut content_ids))?;
        self.remove_objects(&content_ids);
        Ok(result)
    }

    /// Purges every root trashed node, counting each removed node once.
    pub fn empty_trash(&mut self) -> Result<EmptyTrashResult> {
        let roots: Vec<String> = self
            .log
            .iter()
            .filter(|n| self.is_trash_root(n))
            .map(|n| n.id.clone())
            .collect();

        let mut content_ids = Vec::new();
        let result = self.transact(|ws| {
            let mut result = EmptyTrashResult::default();
            for root in &roots {
                result.deleted_count += ws.remove_subtree(root, &mut content_ids)?.count;
                result.root_count += 1;
            }
            Ok(result)
        })?;
        self.remove_objects(&content_ids);
        log::info!(
            "Emptied trash: {} roots, {} nodes",
            result.root_count,
            result.deleted_count
        );
        Ok(result)
    }

    /// Applies `op` to the in-memory log, then rewrites the log on disk.
    ///
    /// If either step fails the in-memory log is put back as it was, so a
    /// later successful mutation never persists half of a failed one.
    fn transact<T>(&mut self, op: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let snapshot = self.log.snapshot();
        let outcome = op(self).and_then(|value| self.log.persist().map(|()| value));
        if outcome.is_err() {
            self.log.rollback(snapshot);
        }
        outcome
    }

    /// Removes `id` and its descendants from memory, collecting their content IDs.
    fn remove_subtree(&mut self, id: &str, content_ids: &mut Vec<String>) -> Result<CascadeResult> {
        let mut result = CascadeResult::default();
        for current in self.subtree_ids(id)? {
            if let Some(node) = self.log.remove(&current) {
                content_ids.extend(node.content_id);
                result.push(&current);
            }
        }
        Ok(result)
    }

    fn remove_objects(&self, content_ids: &[String]) {
        for content_id in content_ids {
            if let Err(e) = self.store.remove(content_id) {
                log::warn!("Could not delete content object {content_id}: {e}");
            }
        }
    }

    /// `id` followed by all of its descendants, depth-first, each once.
    fn subtree_ids(&self, id: &str) -> Result<Vec<String>> {
        self.get_node(id)?;
        let mut seen = HashSet::new();
        let mut ids = Vec::new();
        let mut stack = vec![id.to_string()];
        while let Some(current) = stack.pop() {
            if !seen.insert(current.clone()) {
                continue;
            }
            let mut children = self.log.child_ids(&current);
            children.reverse();
            stack.extend(children);
            ids.push(current);
        }
        Ok(ids)
    }

    /// Trashed ancestors of `id`, outermost first, up to the first active one.
    fn trashed_ancestors(&self, id: &str) -> Result<Vec<String>> {
        let mut seen = HashSet::from([id.to_string()]);
        let mut chain = Vec::new();
        let mut current = self.get_node(id)?.parent_id.clone();
        while let Some(parent_id) = current {
            let Some(parent) = self.log.get(&parent_id) else {
                break;
            };
            if !parent.trashed || !seen.insert(parent_id.clone()) {
                break;
            }
            current = parent.parent_id.clone();
            chain.push(parent_id);
        }
        chain.reverse();
        Ok(chain)
    }

    fn is_trash_root(&self, node: &Node) -> bool {
        node.trashed
            && node
                .parent_id
                .as_deref()
                .and_then(|pid| self.log.get(pid))
                .map_or(true, |parent| !parent.trashed)
    }

    pub(crate) fn check_parent(&self, parent_id: Option<&str>) -> Result<()> {
        let Some(pid) = parent_id else {
            return Ok(());
        };
        let parent = self.get_node(pid)?;
        if !parent.is_folder() {
            return Err(LeafnotesError::InvalidMove(format!(
                "'{}' is not a folder",
                parent.name
            )));
        }
        if parent.trashed {
            return Err(LeafnotesError::InvalidMove(format!(
                "'{}' is in the trash",
                parent.name
            )));
        }
        Ok(())
    }

    fn node_mut(&mut self, id: &str) -> Result<&mut Node> {
        self.log
            .get_mut(id)
            .ok_or_else(|| LeafnotesError::NodeNotFound(id.to_string()))
    }

    fn touch(&mut self, id: &str) -> Result<()> {
        self.node_mut(id)?.updated_at = now_millis();
        Ok(())
    }
}

/// Current time in milliseconds, the unit of `order` and all node timestamps.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Sibling display order: `order`, then name compared case-insensitively, then exactly.
///
/// Names are compared by Unicode scalar value after lowercasing, not by a
/// locale's collation, so accented initials sort after `z` (`"Zebra"` before
/// `"Élan"`).
pub fn sibling_order(a: &Node, b: &Node) -> Ordering {
    a.order
        .cmp(&b.order)
        .then_with(|| compare_names(&a.name, &b.name))
}

fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

fn default_body(name: &str) -> String {
    format!("# {name}\n\n")
}
