/*!
 * Confirmation of applied renames
 *
 * Checks a rename log against the files on disk: every new path in the log
 * must exist, and every file present that the log does not name as a new
 * path is reported as unlogged. For a bag only the payload directory is
 * walked, since tag files are never renamed.
 */

use crate::bag::{BAG_DECLARATION, PAYLOAD_DIR};
use crate::error::{BagError, Result};
use bagmend_core_manifest::naming::relative_to;
use bagmend_core_manifest::RenameMap;
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PathStatus {
    /// The new path exists
    ChangesMade,
    /// The new path is not on disk
    Missing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfirmedPath {
    pub path: String,
    pub status: PathStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConfirmationReport {
    /// One entry per new path in the log, in log order
    pub renamed: Vec<ConfirmedPath>,
    /// Files on disk that the log does not mention as a new path
    pub unlogged: Vec<String>,
}

impl ConfirmationReport {
    /// Compare `log` with the files under `root`
    pub fn build(root: &Path, log: &RenameMap) -> Result<Self> {
        let mut report = ConfirmationReport::default();

        for entry in log {
            let status = if root.join(&entry.new).is_file() {
                PathStatus::ChangesMade
            } else {
                PathStatus::Missing
            };
            report.renamed.push(ConfirmedPath {
                path: entry.new.clone(),
                status,
            });
        }

        let logged: HashSet<&str> = log.iter().map(|e| e.new.as_str()).collect();
        let scan_root = if root.join(BAG_DECLARATION).is_file() {
            root.join(PAYLOAD_DIR)
        } else {
            root.to_path_buf()
        };

        for entry in WalkDir::new(&scan_root).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                BagError::Io(std::io::Error::other(format!("Failed to walk {}: {}", scan_root.display(), e)))
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(rel) = relative_to(root, entry.path()) {
                if !logged.contains(rel.as_str()) {
                    debug!(path = %rel, "File not found in rename log");
                    report.unlogged.push(rel);
                }
            }
        }

        Ok(report)
    }

    /// Number of logged paths that do not exist
    pub fn missing(&self) -> usize {
        self.renamed
            .iter()
            .filter(|p| p.status == PathStatus::Missing)
            .count()
    }

    /// Every logged rename is present on disk
    pub fn is_confirmed(&self) -> bool {
        self.missing() == 0
    }
}
