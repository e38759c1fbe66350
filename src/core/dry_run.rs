/*!
 * Dry-run simulation mode
 *
 * Records the payload renames and manifest updates a rename session would
 * perform, without performing them.
 */

use serde::Serialize;
use tracing::{debug, info};

/// Dry-run operation tracker
#[derive(Debug, Clone)]
pub struct DryRunRecorder {
    enabled: bool,
    operations: Vec<DryRunOperation>,
}

/// Types of operations that can be simulated
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DryRunOperation {
    RenameFile { old: String, new: String },
    SkipFile { path: String, reason: String },
    RewriteManifest { manifest: String },
}

impl DryRunRecorder {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            operations: Vec::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Record a payload rename
    pub fn record_rename(&mut self, old: &str, new: &str) {
        if !self.enabled {
            return;
        }

        info!(target: "dry_run", "[DRY-RUN] Would rename: {} -> {}", old, new);

        self.operations.push(DryRunOperation::RenameFile {
            old: old.to_string(),
            new: new.to_string(),
        });
    }

    /// Record a file left alone
    pub fn record_skip(&mut self, path: &str, reason: &str) {
        if !self.enabled {
            return;
        }

        debug!(target: "dry_run", "[DRY-RUN] Would skip: {} - {}", path, reason);

        self.operations.push(DryRunOperation::SkipFile {
            path: path.to_string(),
            reason: reason.to_string(),
        });
    }

    /// Record a manifest that would be rewritten or patched
    pub fn record_manifest(&mut self, manifest: &str) {
        if !self.enabled {
            return;
        }

        info!(target: "dry_run", "[DRY-RUN] Would update manifest: {}", manifest);

        self.operations.push(DryRunOperation::RewriteManifest {
            manifest: manifest.to_string(),
        });
    }

    pub fn operations(&self) -> &[DryRunOperation] {
        &self.operations
    }

    pub fn summary(&self) -> DryRunSummary {
        let mut summary = DryRunSummary::default();
        for op in &self.operations {
            match op {
                DryRunOperation::RenameFile { .. } => summary.rename_count += 1,
                DryRunOperation::SkipFile { .. } => summary.skip_count += 1,
                DryRunOperation::RewriteManifest { .. } => summary.manifest_count += 1,
            }
        }
        summary
    }
}

/// Summary statistics for dry-run operations
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DryRunSummary {
    pub rename_count: usize,
    pub skip_count: usize,
    pub manifest_count: usize,
}
