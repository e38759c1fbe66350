//! The package collaborator seen by the rehash engine

use crate::error::Result;
use std::path::{Path, PathBuf};

/// A package directory whose manifests the engine rewrites.
///
/// The engine only enumerates manifests through this trait. Moving payload
/// files and validating fixity are driven by the caller, before and after a
/// rehash run.
pub trait Package {
    /// Package root; manifest entries are relative to it
    fn root(&self) -> &Path;

    /// Every payload manifest file
    fn payload_manifests(&self) -> Result<Vec<PathBuf>>;

    /// Every tag manifest file
    fn tag_manifests(&self) -> Result<Vec<PathBuf>>;

    /// Move a payload file. Returns `false` without touching anything when
    /// the paths are equal, the source is missing, or the destination
    /// already exists.
    fn rename_payload_file(&self, old: &str, new: &str) -> Result<bool>;

    /// Check every recorded checksum against the files on disk
    fn validate(&self) -> Result<()>;
}
