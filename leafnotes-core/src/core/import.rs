//! Merging exported packages and loose note files into a live workspace.
//!
//! A package import reconciles incoming nodes against the destination in
//! log order:
//!
//! 1. a node whose `id` already exists is skipped as already merged;
//! 2. a file node whose `contentId` is unused is accepted unchanged;
//! 3. a file node whose `contentId` is used with identical content (by
//!    SHA-256) is skipped as a duplicate;
//! 4. a file node whose `contentId` is used with different content gets a
//!    fresh `<contentId>_<n>` and its object is copied under that name.
//!
//! Package contents are not trusted. A node whose `contentId` is not a plain
//! file name, or that sits on a `parentId` cycle, is rejected. A node whose
//! parent is missing, is a file, or is trashed while the node is not, is moved
//! to the top level. Both outcomes are counted in the [`ImportReport`].
//!
//! Objects are copied before the accepted nodes are appended to the log, so
//! a crash in between leaves at most some unreferenced objects behind.

use crate::core::archive::{self, CopyAction};
use crate::core::content_store::{
    is_valid_content_id, object_file_name, ContentStore, IMAGES_DIR, OBJECTS_DIR, TRASH_DIR,
};
use crate::core::export::{Manifest, MANIFEST_FILE, PACKAGE_VERSION};
use crate::core::hashing::{self, ContentHash};
use crate::core::node::NOTE_EXTENSION;
use crate::core::node_log::{parse_lines, NodeLog, NODE_LOG_FILE};
use crate::core::workspace::now_millis;
use crate::{LeafnotesError, Node, Result, Workspace};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

/// Outcome of [`import_package`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    /// File nodes merged into the workspace.
    pub note_count: usize,
    pub active_notes: usize,
    pub trashed_notes: usize,
    /// Folder nodes merged into the workspace.
    pub folder_count: usize,
    /// Notes merged under a new content ID because theirs was taken by different content.
    pub conflict_count: usize,
    /// Nodes left out because they were already present or identical to existing content.
    pub skipped_count: usize,
    /// Nodes left out because of an unusable content ID or a parent cycle.
    #[serde(default)]
    pub rejected_count: usize,
    /// Nodes moved to the top level because their parent could not hold them.
    #[serde(default)]
    pub rerooted_count: usize,
    pub manifest: Manifest,
}

/// Outcome of [`import_flat`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatImportReport {
    pub note_count: usize,
    pub imported_ids: Vec<String>,
    /// Files that could not be read; the rest were still imported.
    pub unreadable: Vec<PathBuf>,
}

/// Destination state consulted while merging one package.
///
/// Built fresh for every import: destination content can change in between.
struct ImportSession {
    /// Content ID → digest for every content ID in use, including ones accepted so far.
    content_hashes: HashMap<String, ContentHash>,
    /// Node IDs present in the destination or accepted so far.
    node_ids: HashSet<String>,
    /// Content IDs referenced anywhere in the package; never handed out as new IDs.
    package_content_ids: HashSet<String>,
    /// Package content ID → destination content ID for colliding content.
    renames: HashMap<String, String>,
}

impl ImportSession {
    fn new(workspace: &Workspace, package_nodes: &[Node]) -> Self {
        let store = workspace.content_store();
        let content_hashes = workspace
            .node_log()
            .iter()
            .filter_map(|n| n.content_id.as_deref())
            .map(|cid| {
                let hash = store
                    .locate(cid)
                    .map_or(ContentHash::Missing, |path| hashing::digest_file(&path));
                (cid.to_string(), hash)
            })
            .collect();
        Self {
            content_hashes,
            node_ids: workspace.node_log().iter().map(|n| n.id.clone()).collect(),
            package_content_ids: package_nodes
                .iter()
                .filter_map(|n| n.content_id.clone())
                .collect(),
            renames: HashMap::new(),
        }
    }

    /// First `<base>_<n>` not used by the destination, this import, or the package.
    fn allocate_content_id(&self, base: &str, store: &ContentStore) -> String {
        let mut n = 1;
        loop {
            let candidate = format!("{base}_{n}");
            if !self.content_hashes.contains_key(&candidate)
                && !self.package_content_ids.contains(&candidate)
                && !store.exists(&candidate)
            {
                return candidate;
            }
            n += 1;
        }
    }
}

/// Merges the package at `archive_path` into `workspace`.
///
/// The archive is unpacked into a temporary directory that is removed on
/// every exit path. The workspace's node log is rewritten once, at the end.
///
/// # Errors
///
/// Returns [`LeafnotesError::Validation`] if the package has no manifest or
/// node log, the manifest is malformed, or it was written by a newer
/// version. Returns [`LeafnotesError::Zip`] / [`LeafnotesError::Io`] if the
/// archive cannot be unpacked or objects cannot be copied.
pub fn import_package(workspace: &mut Workspace, archive_path: &Path) -> Result<ImportReport> {
    let staging = tempfile::Builder::new()
        .prefix("leafnotes-import-")
        .tempdir()?;
    let report = merge_extracted(workspace, archive_path, staging.path())?;
    if let Err(e) = staging.close() {
        log::warn!("Could not remove import staging directory: {e}");
    }
    Ok(report)
}

fn merge_extracted(
    workspace: &mut Workspace,
    archive_path: &Path,
    staging: &Path,
) -> Result<ImportReport> {
    archive::extract_to(archive_path, staging)?;
    let (manifest, package_nodes) = read_package(staging)?;

    let mut session = ImportSession::new(workspace, &package_nodes);
    let mut report = ImportReport {
        note_count: 0,
        active_notes: 0,
        trashed_notes: 0,
        folder_count: 0,
        conflict_count: 0,
        skipped_count: 0,
        rejected_count: 0,
        rerooted_count: 0,
        manifest,
    };
    let mut batch = Vec::new();
    // Node ID → package file its content is taken from.
    let mut sources: HashMap<String, PathBuf> = HashMap::new();
    let mut renamed_nodes = HashSet::new();

    for mut node in package_nodes {
        if session.node_ids.contains(&node.id) {
            log::debug!("Skipping {}: already present", node.id);
            report.skipped_count += 1;
            continue;
        }

        if let Some(cid) = node.content_id.clone() {
            if !is_valid_content_id(&cid) {
                log::warn!("Rejecting {}: unusable content ID {cid:?}", node.id);
                report.rejected_count += 1;
                continue;
            }
            let source = package_object(staging, &cid, node.trashed);
            let incoming = hashing::digest_file(&source);
            let duplicate = session
                .content_hashes
                .get(&cid)
                .map(|existing| existing.same_content(&incoming));
            match duplicate {
                None => {
                    session.content_hashes.insert(cid, incoming);
                }
                Some(true) => {
                    log::debug!("Skipping {}: content {cid} already present", node.id);
                    report.skipped_count += 1;
                    continue;
                }
                Some(false) => {
                    let new_cid = match session.renames.get(&cid) {
                        Some(renamed) => renamed.clone(),
                        None => {
                            let renamed =
                                session.allocate_content_id(&cid, workspace.content_store());
                            session.renames.insert(cid.clone(), renamed.clone());
                            session.content_hashes.insert(renamed.clone(), incoming);
                            renamed
                        }
                    };
                    log::debug!("Content {cid} of {} differs; importing as {new_cid}", node.id);
                    node.content_id = Some(new_cid);
                    renamed_nodes.insert(node.id.clone());
                }
            }
            sources.insert(node.id.clone(), source);
        }

        session.node_ids.insert(node.id.clone());
        batch.push(node);
    }

    let (rejected, rerooted) = repair_forest(&mut batch, workspace.node_log());
    report.rejected_count += rejected;
    report.rerooted_count = rerooted;

    for node in &batch {
        if node.is_file() {
            report.note_count += 1;
            if node.trashed {
                report.trashed_notes += 1;
            } else {
                report.active_notes += 1;
            }
        } else {
            report.folder_count += 1;
        }
        if renamed_nodes.contains(&node.id) {
            report.conflict_count += 1;
        }
    }

    let placed = place_objects(workspace.content_store(), &batch, &sources)?;
    copy_package_files(staging, workspace.root(), &session.renames, &placed)?;
    workspace.node_log_mut().append(batch)?;

    log::info!(
        "Imported {} notes, {} folders ({} conflicts renamed, {} skipped, {} rejected, {} moved to top level)",
        report.note_count,
        report.folder_count,
        report.conflict_count,
        report.skipped_count,
        report.rejected_count,
        report.rerooted_count
    );
    Ok(report)
}

/// Makes the accepted nodes a forest when added to `existing`.
///
/// Nodes on a `parentId` cycle are dropped. Nodes whose parent is missing, is
/// not a folder, or is trashed while they are active get `parentId = None`.
/// Returns `(dropped, moved to top level)`.
fn repair_forest(batch: &mut Vec<Node>, existing: &NodeLog) -> (usize, usize) {
    let batch_parents: HashMap<String, Option<String>> = batch
        .iter()
        .map(|n| (n.id.clone(), n.parent_id.clone()))
        .collect();
    let parent_of = |id: &str| match batch_parents.get(id) {
        Some(parent) => parent.clone(),
        None => existing.get(id).and_then(|n| n.parent_id.clone()),
    };

    let on_cycle: HashSet<String> = batch
        .iter()
        .filter(|node| {
            let mut seen = HashSet::new();
            let mut current = node.parent_id.clone();
            while let Some(ancestor) = current {
                if ancestor == node.id {
                    return true;
                }
                if !seen.insert(ancestor.clone()) {
                    return false;
                }
                current = parent_of(&ancestor);
            }
            false
        })
        .map(|node| node.id.clone())
        .collect();
    for id in &on_cycle {
        log::warn!("Rejecting {id}: its parent chain loops back to itself");
    }
    batch.retain(|node| !on_cycle.contains(&node.id));

    // (is folder, is trashed) of every possible parent.
    let batch_kinds: HashMap<String, (bool, bool)> = batch
        .iter()
        .map(|n| (n.id.clone(), (n.is_folder(), n.trashed)))
        .collect();
    let mut rerooted = 0;
    for node in batch.iter_mut() {
        let Some(parent_id) = node.parent_id.as_deref() else {
            continue;
        };
        let parent = batch_kinds
            .get(parent_id)
            .copied()
            .or_else(|| existing.get(parent_id).map(|p| (p.is_folder(), p.trashed)));
        let fits = matches!(parent, Some((true, parent_trashed)) if node.trashed || !parent_trashed);
        if !fits {
            log::warn!("Moving {} to the top level: parent {parent_id} cannot hold it", node.id);
            node.parent_id = None;
            rerooted += 1;
        }
    }
    (on_cycle.len(), rerooted)
}

/// Copies the object of every accepted node into the directory matching its
/// trashed state, replacing whatever stray copy was there.
///
/// Returns the content IDs placed.
fn place_objects(
    store: &ContentStore,
    batch: &[Node],
    sources: &HashMap<String, PathBuf>,
) -> Result<HashSet<String>> {
    let mut placed = HashSet::new();
    for node in batch {
        let (Some(content_id), Some(source)) = (node.content_id.as_deref(), sources.get(&node.id))
        else {
            continue;
        };
        if placed.contains(content_id) || !source.is_file() {
            continue;
        }
        store.remove(content_id)?;
        let target = if node.trashed {
            store.trash_path(content_id)
        } else {
            store.active_path(content_id)
        };
        if let Some(dir) = target.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::copy(source, &target)?;
        placed.insert(content_id.to_string());
    }
    Ok(placed)
}

fn read_package(staging: &Path) -> Result<(Manifest, Vec<Node>)> {
    let manifest_path = staging.join(MANIFEST_FILE);
    let log_path = staging.join(NODE_LOG_FILE);
    if !manifest_path.is_file() {
        return Err(LeafnotesError::Validation(format!("{MANIFEST_FILE} is missing")));
    }
    if !log_path.is_file() {
        return Err(LeafnotesError::Validation(format!("{NODE_LOG_FILE} is missing")));
    }

    let manifest: Manifest = serde_json::from_str(&fs::read_to_string(&manifest_path)?)
        .map_err(|e| LeafnotesError::Validation(format!("{MANIFEST_FILE} is malformed: {e}")))?;
    if manifest.version > PACKAGE_VERSION {
        return Err(LeafnotesError::Validation(format!(
            "package version {} is newer than supported version {PACKAGE_VERSION}",
            manifest.version
        )));
    }

    let nodes = parse_lines(&fs::read_to_string(&log_path)?);
    Ok((manifest, nodes))
}

/// Where the package keeps the object for `content_id`.
///
/// Looks in the directory matching the node's trashed state first.
fn package_object(staging: &Path, content_id: &str, trashed: bool) -> PathBuf {
    let file_name = object_file_name(content_id);
    let (first, second) = if trashed {
        (TRASH_DIR, OBJECTS_DIR)
    } else {
        (OBJECTS_DIR, TRASH_DIR)
    };
    let preferred = staging.join(first).join(&file_name);
    if preferred.is_file() {
        preferred
    } else {
        staging.join(second).join(file_name)
    }
}

/// Copies the rest of `objects/`, `trash/` and `images/` into the workspace.
///
/// Objects already placed for accepted nodes are left out. Everything else,
/// under its new name when renamed, is only copied where nothing exists yet,
/// so existing destination content is never replaced.
fn copy_package_files(
    staging: &Path,
    root: &Path,
    renames: &HashMap<String, String>,
    placed: &HashSet<String>,
) -> Result<usize> {
    let mut copied = 0;
    for dir in [OBJECTS_DIR, TRASH_DIR] {
        copied += archive::copy_dir_tree(&staging.join(dir), &root.join(dir), |rel| {
            let Some(content_id) = object_content_id(rel) else {
                return CopyAction::IfAbsent(rel.to_path_buf());
            };
            let target = renames.get(content_id).map_or(content_id, String::as_str);
            if placed.contains(target) {
                CopyAction::Skip
            } else {
                CopyAction::IfAbsent(PathBuf::from(object_file_name(target)))
            }
        })?;
    }
    copied += archive::copy_dir_tree(&staging.join(IMAGES_DIR), &root.join(IMAGES_DIR), |rel| {
        CopyAction::IfAbsent(rel.to_path_buf())
    })?;
    Ok(copied)
}

/// Content ID of a top-level `<id>.md` object path.
fn object_content_id(rel: &Path) -> Option<&str> {
    if rel.components().count() != 1 {
        return None;
    }
    if rel.extension()?.to_str()? != NOTE_EXTENSION {
        return None;
    }
    rel.file_stem()?.to_str()
}

/// Imports loose note files as new notes under `parent_id`.
///
/// Each file gets fresh IDs; there is nothing to deduplicate against. The
/// title is the first level-1 heading, else the file name without extension.
/// Unreadable files are reported and skipped. The log is rewritten once.
///
/// # Errors
///
/// Returns [`LeafnotesError::InvalidMove`] / [`LeafnotesError::NodeNotFound`]
/// if `parent_id` is not an active folder, or [`LeafnotesError::Io`] if a
/// content object cannot be written.
pub fn import_flat(
    workspace: &mut Workspace,
    files: &[PathBuf],
    parent_id: Option<&str>,
) -> Result<FlatImportReport> {
    workspace.check_parent(parent_id)?;
    let mut report = FlatImportReport::default();
    let mut batch = Vec::new();
    let base_order = now_millis();

    for (i, path) in files.iter().enumerate() {
        let body = match fs::read_to_string(path) {
            Ok(body) => body,
            Err(e) => {
                log::warn!("Could not read {}: {e}", path.display());
                report.unreadable.push(path.clone());
                continue;
            }
        };
        let fallback = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("Untitled");
        let title = note_title(&body, fallback);

        // Offsetting `order` keeps the files in the order they were given.
        let node = Node::new_file(parent_id, &title, base_order + i as i64);
        if let Some(content_id) = &node.content_id {
            workspace.content_store().write(content_id, &body)?;
        }
        report.imported_ids.push(node.id.clone());
        batch.push(node);
    }

    report.note_count = batch.len();
    workspace.node_log_mut().append(batch)?;
    log::info!("Imported {} loose notes", report.note_count);
    Ok(report)
}

/// Text of the first `# ` heading in `body`, or `fallback`.
pub fn note_title(body: &str, fallback: &str) -> String {
    body.lines()
        .filter_map(|line| line.trim_start().strip_prefix("# "))
        .map(str::trim)
        .find(|title| !title.is_empty())
        .unwrap_or(fallback)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    /// Writes a zip with the given `(name, contents)` entries.
    fn write_zip(path: &Path, entries: &[(&str, &str)]) {
        let mut zip = ZipWriter::new(fs::File::create(path).unwrap());
        for (name, contents) in entries {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(contents.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    const MANIFEST: &str = r#"{"version":1,"appVersion":"0.1.0","exportDate":"2024-01-01T00:00:00Z","noteCount":1,"activeNotes":1,"trashedNotes":0,"description":""}"#;

    #[test]
    fn test_note_title() {
        assert_eq!(note_title("# Shopping\n\n- milk", "file"), "Shopping");
        assert_eq!(note_title("intro\n## Sub\n  # Real Title  \n", "file"), "Real Title");
        assert_eq!(note_title("no heading here", "file"), "file");
        assert_eq!(note_title("#\n# \n", "fallback"), "fallback");
    }

    #[test]
    fn test_object_content_id() {
        assert_eq!(object_content_id(Path::new("abc.md")), Some("abc"));
        assert_eq!(object_content_id(Path::new("abc.txt")), None);
        assert_eq!(object_content_id(Path::new("nested/abc.md")), None);
    }

    #[test]
    fn test_missing_manifest_is_validation_error() {
        let temp = tempdir().unwrap();
        let mut ws = Workspace::open(temp.path().join("ws")).unwrap();
        let zip_path = temp.path().join("bad.zip");
        write_zip(&zip_path, &[("nodes.jsonl", "")]);

        let err = import_package(&mut ws, &zip_path).unwrap_err();
        assert!(matches!(err, LeafnotesError::Validation(_)), "got {err}");
    }

    #[test]
    fn test_missing_log_is_validation_error() {
        let temp = tempdir().unwrap();
        let mut ws = Workspace::open(temp.path().join("ws")).unwrap();
        let zip_path = temp.path().join("bad.zip");
        write_zip(&zip_path, &[("manifest.json", MANIFEST)]);

        let err = import_package(&mut ws, &zip_path).unwrap_err();
        assert!(err.to_string().contains("nodes.jsonl"));
    }

    #[test]
    fn test_malformed_manifest_is_validation_error() {
        let temp = tempdir().unwrap();
        let mut ws = Workspace::open(temp.path().join("ws")).unwrap();
        let zip_path = temp.path().join("bad.zip");
        write_zip(&zip_path, &[("manifest.json", "{ not json"), ("nodes.jsonl", "")]);

        let err = import_package(&mut ws, &zip_path).unwrap_err();
        assert!(matches!(err, LeafnotesError::Validation(_)));
        assert!(ws.node_log().is_empty());
    }

    #[test]
    fn test_newer_package_version_is_rejected() {
        let temp = tempdir().unwrap();
        let mut ws = Workspace::open(temp.path().join("ws")).unwrap();
        let zip_path = temp.path().join("future.zip");
        let manifest = MANIFEST.replace("\"version\":1", "\"version\":99");
        write_zip(&zip_path, &[("manifest.json", manifest.as_str()), ("nodes.jsonl", "")]);

        let err = import_package(&mut ws, &zip_path).unwrap_err();
        assert!(err.to_string().contains("newer"));
    }

    #[test]
    fn test_not_a_zip_is_an_error() {
        let temp = tempdir().unwrap();
        let mut ws = Workspace::open(temp.path().join("ws")).unwrap();
        let path = temp.path().join("plain.zip");
        fs::write(&path, "definitely not a zip").unwrap();
        assert!(matches!(
            import_package(&mut ws, &path),
            Err(LeafnotesError::Zip(_))
        ));
    }

    #[test]
    fn test_renamed_id_avoids_package_ids() {
        let temp = tempdir().unwrap();
        let mut ws = Workspace::open(temp.path().join("ws")).unwrap();
        let existing = ws.create_file(None, "mine", Some("Hello")).unwrap();
        let cid = existing.content_id.clone().unwrap();

        // The package uses both `cid` (different content) and `cid_1` for its own notes.
        let log = [
            format!(r#"{{"id":"p1","type":"file","name":"theirs","parentId":null,"order":1,"contentId":"{cid}"}}"#),
            format!(r#"{{"id":"p2","type":"file","name":"other","parentId":null,"order":2,"contentId":"{cid}_1"}}"#),
        ]
        .join("\n");
        let zip_path = temp.path().join("pkg.zip");
        let obj_a = format!("objects/{cid}.md");
        let obj_b = format!("objects/{cid}_1.md");
        write_zip(
            &zip_path,
            &[
                ("manifest.json", MANIFEST),
                ("nodes.jsonl", log.as_str()),
                (obj_a.as_str(), "World"),
                (obj_b.as_str(), "Other"),
            ],
        );

        let report = import_package(&mut ws, &zip_path).unwrap();
        assert_eq!(report.note_count, 2);
        assert_eq!(report.conflict_count, 1);

        let p1 = ws.get_node("p1").unwrap().clone();
        assert_eq!(p1.content_id, Some(format!("{cid}_2")));
        assert_eq!(ws.read_content("p1").unwrap(), "World");
        assert_eq!(ws.read_content("p2").unwrap(), "Other");
        assert_eq!(ws.read_content(&existing.id).unwrap(), "Hello");
    }

    #[test]
    fn test_import_flat() {
        let temp = tempdir().unwrap();
        let mut ws = Workspace::open(temp.path().join("ws")).unwrap();
        let folder = ws.create_folder(None, "Inbox").unwrap();

        let a = temp.path().join("meeting.md");
        let b = temp.path().join("scratch.txt");
        fs::write(&a, "# Weekly Meeting\n\nagenda").unwrap();
        fs::write(&b, "just text").unwrap();
        let missing = temp.path().join("gone.md");

        let files = vec![a.clone(), missing.clone(), b.clone(), a];
        let report = import_flat(&mut ws, &files, Some(&folder.id)).unwrap();
        assert_eq!(report.note_count, 3);
        assert_eq!(report.unreadable, vec![missing]);

        let kids = ws.list_children(Some(&folder.id), false);
        let names: Vec<&str> = kids.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["Weekly Meeting", "scratch", "Weekly Meeting"]);
        // Same file twice gives two independent notes.
        assert_ne!(kids[0].content_id, kids[2].content_id);
        assert_eq!(ws.read_content(&kids[1].id).unwrap(), "just text");
    }

    #[test]
    fn test_import_flat_into_file_is_rejected() {
        let temp = tempdir().unwrap();
        let mut ws = Workspace::open(temp.path().join("ws")).unwrap();
        let note = ws.create_file(None, "n", None).unwrap();
        let err = import_flat(&mut ws, &[], Some(&note.id)).unwrap_err();
        assert!(matches!(err, LeafnotesError::InvalidMove(_)));
    }

    fn file_line(id: &str, parent: Option<&str>, content_id: &str, trashed: bool) -> String {
        serde_json::json!({
            "id": id, "type": "file", "name": id, "parentId": parent,
            "order": 1, "contentId": content_id, "trashed": trashed,
        })
        .to_string()
    }

    fn folder_line(id: &str, parent: Option<&str>, trashed: bool) -> String {
        serde_json::json!({
            "id": id, "type": "folder", "name": id, "parentId": parent,
            "order": 1, "trashed": trashed,
        })
        .to_string()
    }

    #[test]
    fn test_traversal_content_id_is_rejected() {
        let temp = tempdir().unwrap();
        let mut ws = Workspace::open(temp.path().join("ws")).unwrap();
        // `objects/../../victim.md` would resolve to this file.
        let victim = temp.path().join("victim.md");
        fs::write(&victim, "precious").unwrap();

        let log = [
            file_line("evil", None, "../../victim", false),
            file_line("fine", None, "ok", false),
        ]
        .join("\n");
        let zip_path = temp.path().join("pkg.zip");
        write_zip(
            &zip_path,
            &[("manifest.json", MANIFEST), ("nodes.jsonl", log.as_str()), ("objects/ok.md", "fine body")],
        );

        let report = import_package(&mut ws, &zip_path).unwrap();
        assert_eq!(report.rejected_count, 1);
        assert_eq!(report.note_count, 1);
        assert!(ws.get_node("evil").is_err());
        assert_eq!(ws.read_content("fine").unwrap(), "fine body");

        ws.empty_trash().unwrap();
        ws.purge("fine").unwrap();
        assert_eq!(fs::read_to_string(&victim).unwrap(), "precious");
    }

    #[test]
    fn test_inconsistent_parents_are_repaired() {
        let temp = tempdir().unwrap();
        let mut ws = Workspace::open(temp.path().join("ws")).unwrap();
        let log = [
            // a and b are each other's parent; c hangs below the loop.
            folder_line("a", Some("b"), false),
            folder_line("b", Some("a"), false),
            folder_line("c", Some("a"), false),
            folder_line("self", Some("self"), false),
            file_line("orphan", Some("nowhere"), "c-orphan", false),
            file_line("leaf", None, "c-leaf", false),
            file_line("under-leaf", Some("leaf"), "c-under", false),
            folder_line("binned", None, true),
            file_line("active-in-bin", Some("binned"), "c-active", false),
            file_line("trashed-in-bin", Some("binned"), "c-trashed", true),
        ]
        .join("\n");
        let zip_path = temp.path().join("pkg.zip");
        write_zip(&zip_path, &[("manifest.json", MANIFEST), ("nodes.jsonl", log.as_str())]);

        let report = import_package(&mut ws, &zip_path).unwrap();
        assert_eq!(report.rejected_count, 3);
        assert_eq!(report.rerooted_count, 4);
        assert_eq!(report.folder_count, 2);
        assert_eq!(report.note_count, 5);

        for id in ["a", "b", "self"] {
            assert!(ws.get_node(id).is_err(), "{id} should be rejected");
        }
        for id in ["c", "orphan", "under-leaf", "active-in-bin"] {
            assert_eq!(ws.get_node(id).unwrap().parent_id, None, "{id}");
        }
        assert_eq!(
            ws.get_node("trashed-in-bin").unwrap().parent_id.as_deref(),
            Some("binned")
        );

        // Every cascade terminates on the repaired tree.
        let result = ws.empty_trash().unwrap();
        assert_eq!(result.deleted_count, 2);
        for node in ws.list_children(None, false) {
            ws.purge(&node.id).unwrap();
        }
        assert!(ws.node_log().is_empty());
    }

    #[test]
    fn test_object_in_both_directories_follows_node_state() {
        let temp = tempdir().unwrap();
        let mut ws = Workspace::open(temp.path().join("ws")).unwrap();
        let log = [
            file_line("live", None, "dual", false),
            file_line("binned", None, "dual-t", true),
        ]
        .join("\n");
        let zip_path = temp.path().join("pkg.zip");
        write_zip(
            &zip_path,
            &[
                ("manifest.json", MANIFEST),
                ("nodes.jsonl", log.as_str()),
                ("objects/dual.md", "active body"),
                ("trash/dual.md", "stale copy"),
                ("objects/dual-t.md", "stale copy"),
                ("trash/dual-t.md", "trashed body"),
            ],
        );

        import_package(&mut ws, &zip_path).unwrap();
        let store = ws.content_store().clone();
        assert_eq!(ws.read_content("live").unwrap(), "active body");
        assert!(!store.trash_path("dual").exists());
        assert_eq!(ws.read_content("binned").unwrap(), "trashed body");
        assert!(!store.active_path("dual-t").exists());

        ws.restore("binned").unwrap();
        assert_eq!(ws.read_content("binned").unwrap(), "trashed body");
        ws.purge("live").unwrap();
        assert!(!store.exists("dual"));
    }
}
