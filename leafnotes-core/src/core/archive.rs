//! Zip packing/unpacking and directory copies shared by export and import.

use crate::Result;
use std::fs::{self, File};
use std::io::{self, Seek, Write};
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub(crate) fn file_options() -> SimpleFileOptions {
    SimpleFileOptions::default().compression_method(CompressionMethod::Deflated)
}

/// Adds one in-memory entry.
pub(crate) fn add_bytes<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    name: &str,
    bytes: &[u8],
) -> Result<()> {
    zip.start_file(name, file_options())?;
    zip.write_all(bytes)?;
    Ok(())
}

/// Adds the file at `path` under `name`, streaming its contents.
pub(crate) fn add_file<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    name: &str,
    path: &Path,
) -> Result<()> {
    zip.start_file(name, file_options())?;
    io::copy(&mut File::open(path)?, zip)?;
    Ok(())
}

/// Adds every file below `root/dir_name` under the `dir_name/` prefix.
///
/// A missing directory adds nothing. Returns the number of files added.
pub(crate) fn add_dir_tree<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    root: &Path,
    dir_name: &str,
) -> Result<usize> {
    let dir = root.join(dir_name);
    if !dir.is_dir() {
        return Ok(0);
    }
    zip.add_directory(format!("{dir_name}/"), file_options())?;

    let mut added = 0;
    for entry in WalkDir::new(&dir).min_depth(1).sort_by_file_name() {
        let entry = entry?;
        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        let name = entry_name(relative);
        if entry.file_type().is_dir() {
            zip.add_directory(format!("{name}/"), file_options())?;
        } else if entry.file_type().is_file() {
            add_file(zip, &name, entry.path())?;
            added += 1;
        }
    }
    Ok(added)
}

/// Unpacks `archive_path` into `dest`, skipping entries whose names would
/// escape it. Returns the number of files written.
pub(crate) fn extract_to(archive_path: &Path, dest: &Path) -> Result<usize> {
    let mut archive = ZipArchive::new(File::open(archive_path)?)?;
    let mut written = 0;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let Some(relative) = entry.enclosed_name() else {
            log::warn!("Skipping unsafe archive entry {:?}", entry.name());
            continue;
        };
        let out_path = dest.join(relative);
        if entry.is_dir() {
            fs::create_dir_all(&out_path)?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        io::copy(&mut entry, &mut File::create(&out_path)?)?;
        written += 1;
    }
    Ok(written)
}

/// How [`copy_dir_tree`] places one source file.
pub(crate) enum CopyAction {
    /// Write to this path relative to the destination directory, replacing any file there.
    Overwrite(PathBuf),
    /// Write to this relative path only if nothing exists there yet.
    IfAbsent(PathBuf),
    /// Leave this file out.
    Skip,
}

/// Copies every file below `src` into `dst`, asking `plan` where each one goes.
///
/// `plan` receives the path relative to `src`. A missing `src` copies nothing.
/// Returns the number of files written.
pub(crate) fn copy_dir_tree<F>(src: &Path, dst: &Path, mut plan: F) -> Result<usize>
where
    F: FnMut(&Path) -> CopyAction,
{
    if !src.is_dir() {
        return Ok(0);
    }
    let mut copied = 0;
    for entry in WalkDir::new(src).min_depth(1) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry.path().strip_prefix(src).unwrap_or(entry.path());
        let (target, overwrite) = match plan(relative) {
            CopyAction::Overwrite(rel) => (dst.join(rel), true),
            CopyAction::IfAbsent(rel) => (dst.join(rel), false),
            CopyAction::Skip => continue,
        };
        if !overwrite && target.exists() {
            log::debug!("Keeping existing {}", target.display());
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(entry.path(), &target)?;
        copied += 1;
    }
    Ok(copied)
}

// Zip entry names always use forward slashes.
fn entry_name(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_dir_tree_round_trip() {
        let src = tempdir().unwrap();
        fs::create_dir_all(src.path().join("images").join("2024")).unwrap();
        fs::write(src.path().join("images").join("a.png"), [1u8, 2, 3]).unwrap();
        fs::write(src.path().join("images").join("2024").join("b.png"), [4u8]).unwrap();

        let out = tempdir().unwrap();
        let zip_path = out.path().join("test.zip");
        {
            let mut zip = ZipWriter::new(File::create(&zip_path).unwrap());
            add_bytes(&mut zip, "hello.txt", b"hi").unwrap();
            assert_eq!(add_dir_tree(&mut zip, src.path(), "images").unwrap(), 2);
            assert_eq!(add_dir_tree(&mut zip, src.path(), "objects").unwrap(), 0);
            zip.finish().unwrap();
        }

        let dest = tempdir().unwrap();
        assert_eq!(extract_to(&zip_path, dest.path()).unwrap(), 3);
        assert_eq!(fs::read(dest.path().join("images/2024/b.png")).unwrap(), vec![4u8]);
        assert_eq!(fs::read_to_string(dest.path().join("hello.txt")).unwrap(), "hi");
    }

    #[test]
    fn test_copy_dir_tree_respects_plan() {
        let src = tempdir().unwrap();
        let dst = tempdir().unwrap();
        fs::write(src.path().join("keep.md"), "new keep").unwrap();
        fs::write(src.path().join("force.md"), "new force").unwrap();
        fs::write(src.path().join("renamed.md"), "moved").unwrap();
        fs::write(src.path().join("ignored.md"), "never copied").unwrap();
        fs::write(dst.path().join("keep.md"), "old keep").unwrap();
        fs::write(dst.path().join("force.md"), "old force").unwrap();

        let copied = copy_dir_tree(src.path(), dst.path(), |rel| match rel.to_str() {
            Some("force.md") => CopyAction::Overwrite(rel.to_path_buf()),
            Some("renamed.md") => CopyAction::IfAbsent(PathBuf::from("other.md")),
            Some("ignored.md") => CopyAction::Skip,
            _ => CopyAction::IfAbsent(rel.to_path_buf()),
        })
        .unwrap();

        assert_eq!(copied, 2);
        assert_eq!(fs::read_to_string(dst.path().join("keep.md")).unwrap(), "old keep");
        assert_eq!(fs::read_to_string(dst.path().join("force.md")).unwrap(), "new force");
        assert_eq!(fs::read_to_string(dst.path().join("other.md")).unwrap(), "moved");
        assert!(!dst.path().join("renamed.md").exists());
        assert!(!dst.path().join("ignored.md").exists());
    }
}
