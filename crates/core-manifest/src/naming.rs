//! Manifest file naming and descriptors
//!
//! Payload manifests are named `manifest-<algorithm>.txt` and tag manifests
//! `tagmanifest-<algorithm>.txt`. The algorithm token is only used as a key
//! here; whether it can be computed is decided by [`crate::digest`].

use crate::error::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// Default file name grammar: `<kind>-<algorithm>.txt`.
///
/// The kind group is lazy so that everything after the first hyphen belongs
/// to the algorithm: `manifest-sha-512.txt` is kind `manifest`, algorithm
/// `sha-512`. A greedy group would split it as `manifest-sha` / `512`.
pub const DEFAULT_MANIFEST_NAME_PATTERN: &str = r"\A(\S+?)-(\S+)\.txt\z";

/// Which layer of the package a manifest belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManifestKind {
    /// Lists payload files
    Payload,
    /// Lists manifests and metadata files
    Tag,
}

impl fmt::Display for ManifestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManifestKind::Payload => write!(f, "payload"),
            ManifestKind::Tag => write!(f, "tag"),
        }
    }
}

/// Compiled naming convention for manifest files
#[derive(Debug, Clone)]
pub struct ManifestNaming {
    pattern: Regex,
    payload_prefix: String,
    tag_prefix: String,
}

impl ManifestNaming {
    pub fn new(pattern: &str, payload_prefix: &str, tag_prefix: &str) -> Result<Self> {
        let pattern = Regex::new(pattern)?;
        if pattern.captures_len() < 3 {
            return Err(Error::InvalidGrammar(
                "manifest name pattern needs kind and algorithm groups".to_string(),
            ));
        }
        Ok(Self {
            pattern,
            payload_prefix: payload_prefix.to_string(),
            tag_prefix: tag_prefix.to_string(),
        })
    }

    /// Glob matching every manifest of `kind` directly under a root
    pub fn glob(&self, kind: ManifestKind) -> String {
        format!("{}-*.txt", self.prefix(kind))
    }

    pub fn prefix(&self, kind: ManifestKind) -> &str {
        match kind {
            ManifestKind::Payload => &self.payload_prefix,
            ManifestKind::Tag => &self.tag_prefix,
        }
    }

    /// Split a file name into kind and algorithm
    pub fn classify(&self, file_name: &str) -> Option<(ManifestKind, String)> {
        let caps = self.pattern.captures(file_name)?;
        let prefix = caps.get(1)?.as_str();
        let algorithm = caps.get(2)?.as_str();

        let kind = if prefix == self.payload_prefix {
            ManifestKind::Payload
        } else if prefix == self.tag_prefix {
            ManifestKind::Tag
        } else {
            return None;
        };
        Some((kind, algorithm.to_string()))
    }
}

impl Default for ManifestNaming {
    fn default() -> Self {
        Self {
            pattern: Regex::new(DEFAULT_MANIFEST_NAME_PATTERN)
                .expect("default manifest name pattern compiles"),
            payload_prefix: "manifest".to_string(),
            tag_prefix: "tagmanifest".to_string(),
        }
    }
}

/// A manifest file located inside a package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestDescriptor {
    pub kind: ManifestKind,
    pub algorithm: String,
    /// Absolute path on disk
    pub path: PathBuf,
    /// Path relative to the package root, `/`-separated
    pub relative_path: String,
}

impl ManifestDescriptor {
    /// Describe `path` (absolute, or relative to `root`) as a manifest of
    /// `expected` kind.
    pub fn resolve(
        root: &Path,
        path: &Path,
        expected: ManifestKind,
        naming: &ManifestNaming,
    ) -> Result<Self> {
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            root.join(path)
        };

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::malformed(&path))?;

        let (kind, algorithm) = naming
            .classify(file_name)
            .ok_or_else(|| Error::malformed(&path))?;
        if kind != expected {
            return Err(Error::malformed(&path));
        }

        let relative_path = relative_to(root, &path).ok_or_else(|| Error::malformed(&path))?;

        Ok(Self {
            kind,
            algorithm,
            path,
            relative_path,
        })
    }
}

/// Render `path` relative to `root` with `/` separators
pub fn relative_to(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let mut parts = Vec::new();
    for component in rel.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?.to_string()),
            Component::CurDir => {}
            _ => return None,
        }
    }
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}

/// Index descriptors by algorithm, rejecting duplicates
pub fn index_by_algorithm(
    descriptors: Vec<ManifestDescriptor>,
) -> Result<BTreeMap<String, ManifestDescriptor>> {
    let mut index: BTreeMap<String, ManifestDescriptor> = BTreeMap::new();
    for descriptor in descriptors {
        if let Some(existing) = index.get(&descriptor.algorithm) {
            return Err(Error::DuplicateAlgorithm {
                kind: existing.kind.to_string(),
                algorithm: descriptor.algorithm,
            });
        }
        index.insert(descriptor.algorithm.clone(), descriptor);
    }
    Ok(index)
}
