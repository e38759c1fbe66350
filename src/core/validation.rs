/*!
 * Fixity validation for bags
 *
 * Checks, in order: manifest names and algorithms, payload completeness
 * (every payload file listed in every payload manifest), then the checksum
 * of every payload and tag manifest entry. Hashing runs on a dedicated rayon
 * pool. Problems are collected rather than short-circuited so a single run
 * reports everything that is wrong with a bag.
 */

use crate::bag::BagDirectory;
use crate::error::{BagError, Result};
use bagmend_core_manifest::naming::index_by_algorithm;
use bagmend_core_manifest::{
    hash_file, DigestAlgorithm, Error as ManifestError, ManifestDescriptor, ManifestKind,
    ManifestLine, RecordGrammar,
};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufReader, ErrorKind};
use std::path::Path;
use tracing::{debug, info, warn};

/// Counts from a successful validation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationSummary {
    pub payload_manifests: usize,
    pub tag_manifests: usize,
    pub payload_files: usize,
    /// Manifest entries whose checksum was verified
    pub entries_checked: usize,
}

/// One checksum to verify
#[derive(Debug, Clone)]
struct FixityCheck {
    manifest: String,
    algorithm: DigestAlgorithm,
    file: String,
    expected: String,
}

/// Validate every manifest of `bag` using `processes` hashing threads
pub fn validate_bag(
    bag: &BagDirectory,
    processes: usize,
    show_progress: bool,
) -> Result<ValidationSummary> {
    let grammar = RecordGrammar::default();
    let mut problems = Vec::new();
    let mut checks = Vec::new();

    let payload = descriptors(bag, ManifestKind::Payload)?;
    let tags = descriptors(bag, ManifestKind::Tag)?;
    if payload.is_empty() {
        problems.push("No payload manifest found".to_string());
    }

    let payload_files = bag.payload_files()?;
    for descriptor in payload.values() {
        let listed = collect_checks(bag.path(), descriptor, &grammar, &mut checks, &mut problems)?;
        for file in &payload_files {
            if !listed.contains(file.as_str()) {
                problems.push(format!(
                    "{}: payload file not listed in {}",
                    file, descriptor.relative_path
                ));
            }
        }
    }
    for descriptor in tags.values() {
        collect_checks(bag.path(), descriptor, &grammar, &mut checks, &mut problems)?;
    }

    debug!(
        bag = %bag.path().display(),
        checks = checks.len(),
        processes,
        "Verifying checksums"
    );

    problems.extend(verify_checksums(bag.path(), &checks, processes, show_progress)?);

    if !problems.is_empty() {
        problems.sort();
        for problem in &problems {
            warn!(bag = %bag.path().display(), "{}", problem);
        }
        return Err(BagError::Validation { problems });
    }

    let summary = ValidationSummary {
        payload_manifests: payload.len(),
        tag_manifests: tags.len(),
        payload_files: payload_files.len(),
        entries_checked: checks.len(),
    };
    info!(
        bag = %bag.path().display(),
        entries = summary.entries_checked,
        "Bag is valid"
    );
    Ok(summary)
}

fn descriptors(bag: &BagDirectory, kind: ManifestKind) -> Result<BTreeMap<String, ManifestDescriptor>> {
    let resolved = bag
        .manifest_files(kind)?
        .iter()
        .map(|path| ManifestDescriptor::resolve(bag.path(), path, kind, bag.naming()))
        .collect::<bagmend_core_manifest::Result<Vec<_>>>()?;
    Ok(index_by_algorithm(resolved)?)
}

/// Queue every entry of one manifest, returning the listed file names
fn collect_checks(
    root: &Path,
    descriptor: &ManifestDescriptor,
    grammar: &RecordGrammar,
    checks: &mut Vec<FixityCheck>,
    problems: &mut Vec<String>,
) -> Result<BTreeSet<String>> {
    let mut listed = BTreeSet::new();

    let algorithm: DigestAlgorithm = match descriptor.algorithm.parse() {
        Ok(algorithm) => algorithm,
        Err(e) => {
            problems.push(format!("{}: {}", descriptor.relative_path, e));
            return Ok(listed);
        }
    };

    let reader = BufReader::new(File::open(&descriptor.path)?);
    for (index, line) in grammar.reader(reader).enumerate() {
        match line? {
            ManifestLine::Record(record) => {
                if root.join(&record.filename).symlink_metadata().is_err() {
                    problems.push(format!(
                        "{}: listed in {} but missing",
                        record.filename, descriptor.relative_path
                    ));
                } else {
                    checks.push(FixityCheck {
                        manifest: descriptor.relative_path.clone(),
                        algorithm,
                        file: record.filename.clone(),
                        expected: record.hash,
                    });
                }
                listed.insert(record.filename);
            }
            ManifestLine::Opaque(raw) => {
                if !raw.iter().all(u8::is_ascii_whitespace) {
                    problems.push(format!(
                        "{}: line {} is not a manifest entry",
                        descriptor.relative_path,
                        index + 1
                    ));
                }
            }
        }
    }

    Ok(listed)
}

fn verify_checksums(
    root: &Path,
    checks: &[FixityCheck],
    processes: usize,
    show_progress: bool,
) -> Result<Vec<String>> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(processes.max(1))
        .build()
        .map_err(|e| BagError::Other(format!("Failed to create hashing pool: {}", e)))?;

    let progress = if show_progress {
        let pb = ProgressBar::new(checks.len() as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} files ({eta})")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb
    } else {
        ProgressBar::hidden()
    };

    let mut problems: Vec<String> = pool.install(|| {
        checks
            .par_iter()
            .filter_map(|check| {
                let problem = verify_one(root, check);
                progress.inc(1);
                problem
            })
            .collect()
    });
    progress.finish_and_clear();

    problems.sort();
    Ok(problems)
}

fn verify_one(root: &Path, check: &FixityCheck) -> Option<String> {
    match hash_file(&root.join(&check.file), check.algorithm) {
        Ok(actual) if actual.eq_ignore_ascii_case(&check.expected) => None,
        Ok(actual) => Some(format!(
            "{}: {} checksum mismatch in {} (expected {}, found {})",
            check.file, check.algorithm, check.manifest, check.expected, actual
        )),
        Err(ManifestError::Io(e)) if e.kind() == ErrorKind::NotFound => Some(format!(
            "{}: listed in {} but missing",
            check.file, check.manifest
        )),
        Err(e) => Some(format!("{}: {}", check.file, e)),
    }
}
