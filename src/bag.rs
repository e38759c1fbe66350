/*!
 * BagIt directories on the local filesystem
 *
 * [`BagDirectory`] is the filesystem implementation of the manifest engine's
 * [`Package`] trait: it lists payload and tag manifests with glob patterns,
 * enumerates payload files under `data/`, renames payload files and runs
 * full fixity validation.
 */

use crate::core::validation::{validate_bag, ValidationSummary};
use crate::error::{BagError, Result};
use bagmend_core_manifest::naming::relative_to;
use bagmend_core_manifest::{Error as ManifestError, ManifestKind, ManifestNaming, Package};
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Bag declaration file that marks a directory as a bag
pub const BAG_DECLARATION: &str = "bagit.txt";

/// Directory holding the payload
pub const PAYLOAD_DIR: &str = "data";

/// A bag rooted at a directory
#[derive(Debug, Clone)]
pub struct BagDirectory {
    root: PathBuf,
    naming: ManifestNaming,
    processes: usize,
    show_progress: bool,
}

impl BagDirectory {
    /// Open the bag at `path`. The directory must contain `bagit.txt`.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.join(BAG_DECLARATION).is_file() {
            return Err(BagError::InvalidBag(path.to_path_buf()));
        }
        let root = fs::canonicalize(path)?;
        debug!(bag = %root.display(), "Opened bag");

        Ok(Self {
            root,
            naming: ManifestNaming::default(),
            processes: 1,
            show_progress: false,
        })
    }

    /// Number of hashing threads used by [`Package::validate`]
    pub fn with_processes(mut self, processes: usize) -> Self {
        self.processes = processes.max(1);
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn with_naming(mut self, naming: ManifestNaming) -> Self {
        self.naming = naming;
        self
    }

    /// Re-open the same directory, picking up everything on disk afresh
    pub fn refresh(&self) -> Result<Self> {
        Ok(Self::open(&self.root)?
            .with_processes(self.processes)
            .with_progress(self.show_progress)
            .with_naming(self.naming.clone()))
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Final component of the bag directory
    pub fn name(&self) -> String {
        self.root
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    pub fn naming(&self) -> &ManifestNaming {
        &self.naming
    }

    pub fn processes(&self) -> usize {
        self.processes
    }

    /// Manifest files of `kind`, sorted
    pub fn manifest_files(&self, kind: ManifestKind) -> Result<Vec<PathBuf>> {
        let root = self
            .root
            .to_str()
            .ok_or_else(|| BagError::InvalidBag(self.root.clone()))?;
        let pattern = format!(
            "{}/{}",
            glob::Pattern::escape(root),
            self.naming.glob(kind)
        );

        let entries = glob::glob(&pattern)
            .map_err(|e| BagError::Other(format!("Invalid manifest pattern: {}", e)))?;
        let mut files = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| BagError::Io(e.into_error()))?;
            if path.is_file() {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Every regular file under `data/`, relative to the bag root and `/`-separated
    pub fn payload_files(&self) -> Result<Vec<String>> {
        let payload_dir = self.root.join(PAYLOAD_DIR);
        if !payload_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&payload_dir).follow_links(false) {
            let entry = entry.map_err(|e| {
                BagError::Io(std::io::Error::other(format!("Failed to walk payload: {}", e)))
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            match relative_to(&self.root, entry.path()) {
                Some(rel) => files.push(rel),
                None => warn!(path = %entry.path().display(), "Skipping payload file with a non UTF-8 name"),
            }
        }
        files.sort();
        Ok(files)
    }

    /// Rename one payload file, both paths relative to the bag root.
    ///
    /// Returns `Ok(false)` without touching anything unless the paths differ,
    /// the source exists and the destination does not.
    pub fn rename_file(&self, old: &str, new: &str) -> Result<bool> {
        if !self.can_rename(old, new) {
            debug!(old, new, "Rename refused");
            return Ok(false);
        }

        let source = self.root.join(old);
        let dest = self.root.join(new);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::rename(&source, &dest)?;
        debug!(old, new, "Renamed payload file");
        Ok(true)
    }

    /// Whether [`rename_file`](Self::rename_file) would go ahead
    pub fn can_rename(&self, old: &str, new: &str) -> bool {
        self.can_rename_with(old, new, |rel| self.exists(rel))
    }

    /// The rename guard evaluated against `exists` instead of the disk
    pub fn can_rename_with<F: Fn(&str) -> bool>(&self, old: &str, new: &str, exists: F) -> bool {
        old != new && is_contained(old) && is_contained(new) && exists(old) && !exists(new)
    }

    /// Whether anything (file, directory or dangling link) sits at `rel`
    pub fn exists(&self, rel: &str) -> bool {
        self.root.join(rel).symlink_metadata().is_ok()
    }

    /// Full fixity validation on `processes` hashing threads
    pub fn validate_fixity(&self, processes: usize) -> Result<ValidationSummary> {
        validate_bag(self, processes, self.show_progress)
    }
}

/// Relative path that stays inside the bag
fn is_contained(rel: &str) -> bool {
    let path = Path::new(rel);
    !rel.is_empty() && path.components().all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

fn into_package_error(err: BagError) -> ManifestError {
    match err {
        BagError::Validation { problems } => ManifestError::Validation { problems },
        BagError::Io(e) => ManifestError::Io(e),
        BagError::Manifest(e) => e,
        other => ManifestError::package(other.to_string()),
    }
}

impl Package for BagDirectory {
    fn root(&self) -> &Path {
        &self.root
    }

    fn payload_manifests(&self) -> bagmend_core_manifest::Result<Vec<PathBuf>> {
        self.manifest_files(ManifestKind::Payload)
            .map_err(into_package_error)
    }

    fn tag_manifests(&self) -> bagmend_core_manifest::Result<Vec<PathBuf>> {
        self.manifest_files(ManifestKind::Tag)
            .map_err(into_package_error)
    }

    fn rename_payload_file(&self, old: &str, new: &str) -> bagmend_core_manifest::Result<bool> {
        self.rename_file(old, new).map_err(into_package_error)
    }

    fn validate(&self) -> bagmend_core_manifest::Result<()> {
        self.validate_fixity(self.processes)
            .map(|_| ())
            .map_err(into_package_error)
    }
}
