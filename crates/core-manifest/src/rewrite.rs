//! Payload manifest rewriting
//!
//! Streams a payload manifest through a [`RenameMap`] into an atomic
//! replacement. Each output line is fed to one digest accumulator per tag
//! algorithm before it is written, so the new manifest's checksums come out
//! of the same single pass and always describe exactly the persisted bytes.

use crate::atomic::{replace_atomically, ReplaceOptions};
use crate::digest::{DigestAlgorithm, DigestSet};
use crate::error::Result;
use crate::naming::ManifestDescriptor;
use crate::record::{ManifestLine, RecordGrammar};
use crate::rename_map::RenameMap;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::BufReader;
use tracing::{debug, trace};

/// Result of rewriting one payload manifest
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PayloadRewrite {
    /// Relative path of the manifest
    pub manifest: String,
    /// Digest of the new content for every requested algorithm
    pub digests: BTreeMap<DigestAlgorithm, String>,
    pub lines: usize,
    pub records: usize,
    /// Rename sources that were found and substituted
    pub substituted: BTreeSet<String>,
}

/// Rewrite the file names of `descriptor` through `rename_map`.
///
/// Returns `None` without reading or writing anything when the map is empty.
pub fn rewrite_payload_manifest(
    descriptor: &ManifestDescriptor,
    rename_map: &RenameMap,
    tag_algorithms: &[DigestAlgorithm],
    grammar: &RecordGrammar,
    options: &ReplaceOptions,
) -> Result<Option<PayloadRewrite>> {
    if rename_map.is_empty() {
        debug!(manifest = %descriptor.relative_path, "Empty rename map, manifest left untouched");
        return Ok(None);
    }

    let reader = BufReader::new(File::open(&descriptor.path)?);
    let mut digests = DigestSet::new(tag_algorithms);
    let mut rewrite = PayloadRewrite {
        manifest: descriptor.relative_path.clone(),
        ..PayloadRewrite::default()
    };

    replace_atomically(&descriptor.path, options, |out| {
        let mut buf = Vec::new();
        for line in grammar.reader(reader) {
            let mut line = line?;

            if let ManifestLine::Record(record) = &mut line {
                rewrite.records += 1;
                if let Some(new_name) = rename_map.get(&record.filename) {
                    trace!(old = %record.filename, new = %new_name, "Substituting payload path");
                    rewrite.substituted.insert(record.filename.clone());
                    record.filename = new_name.to_string();
                }
            }

            buf.clear();
            line.write_to(&mut buf);
            digests.update(&buf);
            out.write_all(&buf)?;
            rewrite.lines += 1;
        }
        Ok(())
    })?;

    rewrite.digests = digests.finalize().into_iter().collect();

    debug!(
        manifest = %rewrite.manifest,
        lines = rewrite.lines,
        substituted = rewrite.substituted.len(),
        "Payload manifest rewritten"
    );

    Ok(Some(rewrite))
}
