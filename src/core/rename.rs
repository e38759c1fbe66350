/*!
 * Rename session: payload renames followed by a manifest rehash
 *
 * A session validates the bag, renames payload files according to a plan,
 * rewrites payload manifests and patches tag manifests for the renames that
 * actually happened, then re-opens and validates the bag again. In dry-run
 * mode (the default) nothing is renamed or rewritten; the would-be
 * operations are recorded instead.
 */

use super::convention::NamingConvention;
use super::dry_run::{DryRunOperation, DryRunRecorder};
use super::validation::ValidationSummary;
use crate::bag::BagDirectory;
use crate::config::BagmendConfig;
use crate::error::Result;
use crate::mapfile::{default_log_name, save_rename_map};
use bagmend_core_manifest::{EngineConfig, Package, RehashReport, Rehasher, RenameMap};
use chrono::Local;
use serde::Serialize;
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::{error, info, warn};

/// Where the renames of a session come from
#[derive(Debug, Clone)]
pub enum RenamePlan {
    /// Explicit old-to-new table
    Map(RenameMap),
    /// Derive new names from the payload files
    Convention(NamingConvention),
}

/// Destination of the rename log
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenameLog {
    Disabled,
    /// `renameLog-<bag>-<timestamp>.json` in the working directory
    Default,
    Path(PathBuf),
}

#[derive(Debug, Clone)]
pub struct RenameOptions {
    pub dry_run: bool,
    pub validate_before: bool,
    pub validate_after: bool,
    pub processes: usize,
    pub log: RenameLog,
}

impl Default for RenameOptions {
    fn default() -> Self {
        Self::from(&BagmendConfig::default())
    }
}

impl From<&BagmendConfig> for RenameOptions {
    fn from(config: &BagmendConfig) -> Self {
        let log = match (&config.log_path, config.write_log) {
            (Some(path), _) => RenameLog::Path(path.clone()),
            (None, true) => RenameLog::Default,
            (None, false) => RenameLog::Disabled,
        };
        Self {
            dry_run: config.dry_run,
            validate_before: config.validate_before,
            validate_after: config.validate_after,
            processes: config.processes,
            log,
        }
    }
}

/// Everything a session did (or would have done)
#[derive(Debug, Clone, Default, Serialize)]
pub struct RenameOutcome {
    pub bag: PathBuf,
    pub dry_run: bool,
    pub successes: usize,
    pub failures: usize,
    pub previously_renamed: usize,
    /// Renames that happened, or would happen in dry-run
    pub applied: RenameMap,
    /// Sources that could not be renamed
    pub failed: Vec<String>,
    pub validated_before: Option<ValidationSummary>,
    pub validated_after: Option<ValidationSummary>,
    pub rehash: Option<RehashReport>,
    pub log_file: Option<PathBuf>,
    pub dry_run_operations: Vec<DryRunOperation>,
}

pub struct RenameSession {
    options: RenameOptions,
    engine: EngineConfig,
}

impl RenameSession {
    pub fn new(options: RenameOptions, engine: EngineConfig) -> Self {
        Self { options, engine }
    }

    pub fn from_config(config: &BagmendConfig) -> Self {
        Self::new(RenameOptions::from(config), config.engine_config())
    }

    pub fn options(&self) -> &RenameOptions {
        &self.options
    }

    pub fn run(&self, bag: &BagDirectory, plan: &RenamePlan) -> Result<RenameOutcome> {
        let mut outcome = RenameOutcome {
            bag: bag.path().to_path_buf(),
            dry_run: self.options.dry_run,
            ..RenameOutcome::default()
        };
        let mut recorder = DryRunRecorder::new(self.options.dry_run);

        if self.options.validate_before {
            outcome.validated_before = Some(bag.validate_fixity(self.options.processes)?);
        }

        // Refuse a bag the engine cannot rehash before any file is moved
        Rehasher::new(self.engine.clone()).preflight(bag)?;

        let renames = match plan {
            RenamePlan::Map(map) => map.clone(),
            RenamePlan::Convention(convention) => {
                let planned = convention.plan(&bag.name(), &bag.payload_files()?)?;
                for path in &planned.previously_renamed {
                    recorder.record_skip(path, "already renamed");
                }
                outcome.previously_renamed = planned.previously_renamed.len();
                planned.renames
            }
        };

        let mut simulated = SimulatedPayload::default();
        for entry in &renames {
            let renamed = if self.options.dry_run {
                let allowed = simulated.rename(bag, &entry.old, &entry.new);
                if allowed {
                    recorder.record_rename(&entry.old, &entry.new);
                } else {
                    recorder.record_skip(&entry.old, "source missing or destination exists");
                }
                allowed
            } else {
                match bag.rename_file(&entry.old, &entry.new) {
                    Ok(renamed) => renamed,
                    Err(e) => {
                        error!(old = %entry.old, new = %entry.new, "Rename failed: {}", e);
                        false
                    }
                }
            };

            if renamed {
                outcome.successes += 1;
                outcome.applied.insert(entry.old.as_str(), entry.new.as_str())?;
            } else {
                warn!(old = %entry.old, new = %entry.new, "Payload file not renamed");
                outcome.failures += 1;
                outcome.failed.push(entry.old.clone());
            }
        }

        info!(
            successes = outcome.successes,
            failures = outcome.failures,
            previously_renamed = outcome.previously_renamed,
            "Summary filesystem renaming"
        );

        // The log is written before the manifests are touched so a failed
        // rehash can be repaired from it.
        outcome.log_file = self.write_log(bag, &outcome.applied)?;

        if self.options.dry_run {
            if !outcome.applied.is_empty() {
                for manifest in bag.payload_manifests()?.iter().chain(bag.tag_manifests()?.iter()) {
                    let rel = manifest.strip_prefix(bag.path()).unwrap_or(manifest);
                    recorder.record_manifest(&rel.display().to_string());
                }
            }
            let summary = recorder.summary();
            info!(
                renames = summary.rename_count,
                skips = summary.skip_count,
                manifests = summary.manifest_count,
                "Dry-run complete, no changes made"
            );
            outcome.dry_run_operations = recorder.operations().to_vec();
            return Ok(outcome);
        }

        let report = Rehasher::new(self.engine.clone()).run(bag, &outcome.applied)?;
        outcome.rehash = Some(report);

        if self.options.validate_after {
            let refreshed = bag.refresh()?;
            outcome.validated_after = Some(refreshed.validate_fixity(self.options.processes)?);
        }

        Ok(outcome)
    }

    fn write_log(&self, bag: &BagDirectory, applied: &RenameMap) -> Result<Option<PathBuf>> {
        let path = match &self.options.log {
            RenameLog::Disabled => return Ok(None),
            RenameLog::Default => PathBuf::from(default_log_name(&bag.name(), Local::now().naive_local())),
            RenameLog::Path(path) => path.clone(),
        };
        save_rename_map(&path, applied)?;
        info!(path = %path.display(), renames = applied.len(), "Rename log written");
        Ok(Some(path))
    }
}

/// The payload as it would look after the dry-run renames recorded so far
#[derive(Debug, Default)]
struct SimulatedPayload {
    /// Destinations of earlier simulated renames
    claimed: HashSet<String>,
    /// Sources of earlier simulated renames
    freed: HashSet<String>,
}

impl SimulatedPayload {
    fn exists(&self, bag: &BagDirectory, rel: &str) -> bool {
        self.claimed.contains(rel) || (!self.freed.contains(rel) && bag.exists(rel))
    }

    /// Apply one rename to the simulated view if the real guard would allow it
    fn rename(&mut self, bag: &BagDirectory, old: &str, new: &str) -> bool {
        if !bag.can_rename_with(old, new, |rel| self.exists(bag, rel)) {
            return false;
        }
        self.claimed.remove(old);
        self.freed.insert(old.to_string());
        self.freed.remove(new);
        self.claimed.insert(new.to_string());
        true
    }
}
