//! SHA-256 content digests used for deduplication and change detection.

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io;
use std::path::Path;

/// Digest of a content object.
///
/// [`ContentHash::Missing`] stands for a file that could not be read. It is
/// never the same content as anything, itself included, so a missing object
/// always takes the conflict path instead of being deduplicated.
#[derive(Debug, Clone)]
pub enum ContentHash {
    Sha256(String),
    Missing,
}

impl ContentHash {
    /// Returns true only when both sides are real digests with equal values.
    pub fn same_content(&self, other: &ContentHash) -> bool {
        match (self, other) {
            (Self::Sha256(a), Self::Sha256(b)) => a == b,
            _ => false,
        }
    }

    /// Hex string of the digest, or `None` for a missing file.
    pub fn as_hex(&self) -> Option<&str> {
        match self {
            Self::Sha256(hex) => Some(hex),
            Self::Missing => None,
        }
    }
}

/// Hashes an in-memory buffer.
pub fn digest(bytes: &[u8]) -> ContentHash {
    ContentHash::Sha256(hex::encode(Sha256::digest(bytes)))
}

/// Hashes a file by streaming it through the hasher.
pub fn digest_file(path: &Path) -> ContentHash {
    match try_digest_file(path) {
        Ok(hash) => hash,
        Err(e) => {
            if e.kind() != io::ErrorKind::NotFound {
                log::warn!("Could not hash {}: {e}", path.display());
            }
            ContentHash::Missing
        }
    }
}

fn try_digest_file(path: &Path) -> io::Result<ContentHash> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(ContentHash::Sha256(hex::encode(hasher.finalize())))
}
