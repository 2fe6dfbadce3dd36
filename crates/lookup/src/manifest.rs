//! Manifest discovery on the local filesystem.
//!
//! The resolver needs two kinds of upward walks: from a source file to the
//! nearest project manifest, and from an installed package directory to the
//! manifest that declares its name and version. Both are the same operation,
//! abstracted behind [`ManifestLocator`] so tests can substitute an in-memory
//! tree.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

/// Name of the manifest file searched for during upward walks.
pub const MANIFEST_FILE: &str = "package.json";

/// A manifest found during an upward walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestInfo {
    /// Directory containing the manifest file.
    pub directory: PathBuf,
    /// Declared package name, if the manifest has one.
    pub name: Option<String>,
    /// Declared version, if the manifest has one.
    pub version: Option<String>,
}

/// Locates the nearest manifest at or above a starting path.
///
/// Implementations must be cheap to call repeatedly; the resolver memoizes
/// project roots but probes installed package directories on every uncached
/// resolution.
pub trait ManifestLocator: Send + Sync + 'static {
    /// Walks from `start` toward the filesystem root and returns the first
    /// manifest found. `start` may be a file or a directory; a file path
    /// simply fails its own lookup and the walk continues at its parent.
    ///
    /// Returns `None` when no ancestor directory contains a readable
    /// manifest.
    fn locate_up(&self, start: &Path) -> Option<ManifestInfo>;
}

/// Only the fields the resolver cares about; everything else is ignored.
#[derive(Debug, Deserialize)]
struct RawManifest {
    name: Option<String>,
    version: Option<String>,
}

/// [`ManifestLocator`] backed by the real filesystem.
///
/// Performs blocking `std::fs` reads. On an async runtime, call it through
/// `tokio::task::spawn_blocking` rather than directly on a worker thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsManifestLocator;

impl FsManifestLocator {
    /// Creates a new filesystem locator.
    pub fn new() -> Self {
        Self
    }
}

impl ManifestLocator for FsManifestLocator {
    fn locate_up(&self, start: &Path) -> Option<ManifestInfo> {
        for ancestor in start.ancestors() {
            let candidate = ancestor.join(MANIFEST_FILE);
            let raw = match fs::read_to_string(&candidate) {
                Ok(raw) => raw,
                // Missing or unreadable at this level; keep walking up.
                Err(_) => continue,
            };

            match serde_json::from_str::<RawManifest>(&raw) {
                Ok(manifest) => {
                    return Some(ManifestInfo {
                        directory: ancestor.to_path_buf(),
                        name: manifest.name,
                        version: manifest.version,
                    });
                }
                Err(error) => {
                    // A corrupt manifest should not mask a valid one above it.
                    debug!(
                        path = %candidate.display(),
                        error = %error,
                        "skipping unparseable manifest"
                    );
                }
            }
        }
        None
    }
}
