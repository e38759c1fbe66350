//! Tag manifest patching
//!
//! After payload manifests are rewritten their checksums change. A tag
//! manifest records those checksums, so every entry naming a rewritten
//! manifest gets the freshly computed digest. All other lines, including
//! entries for metadata files, are copied unchanged.

use crate::atomic::{replace_atomically, ReplaceOptions};
use crate::error::Result;
use crate::naming::ManifestDescriptor;
use crate::record::{ManifestLine, RecordGrammar};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use tracing::{debug, warn};

/// Result of patching one tag manifest
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TagPatch {
    /// Relative path of the tag manifest
    pub manifest: String,
    pub algorithm: String,
    pub lines: usize,
    /// Manifest paths whose checksum was replaced
    pub patched: Vec<String>,
}

/// Replace the checksums of rewritten manifests listed in `descriptor`.
///
/// `digests` maps a manifest's relative path to its new digest in this tag
/// manifest's algorithm. Returns `None` and leaves the file alone when there
/// is nothing to patch.
pub fn patch_tag_manifest(
    descriptor: &ManifestDescriptor,
    digests: Option<&BTreeMap<String, String>>,
    grammar: &RecordGrammar,
    options: &ReplaceOptions,
) -> Result<Option<TagPatch>> {
    let digests = match digests {
        Some(d) if !d.is_empty() => d,
        _ => {
            debug!(manifest = %descriptor.relative_path, "No new digests, tag manifest left untouched");
            return Ok(None);
        }
    };

    let reader = BufReader::new(File::open(&descriptor.path)?);
    let mut patch = TagPatch {
        manifest: descriptor.relative_path.clone(),
        algorithm: descriptor.algorithm.clone(),
        ..TagPatch::default()
    };

    replace_atomically(&descriptor.path, options, |out| {
        let mut buf = Vec::new();
        for line in grammar.reader(reader) {
            let mut line = line?;

            if let ManifestLine::Record(record) = &mut line {
                if let Some(digest) = digests.get(&record.filename) {
                    record.hash = digest.clone();
                    patch.patched.push(record.filename.clone());
                }
            }

            buf.clear();
            line.write_to(&mut buf);
            out.write_all(&buf)?;
            patch.lines += 1;
        }
        Ok(())
    })?;

    for manifest in digests.keys() {
        if !patch.patched.contains(manifest) {
            warn!(
                tag_manifest = %patch.manifest,
                manifest = %manifest,
                "Rewritten manifest is not listed in tag manifest"
            );
        }
    }

    debug!(
        manifest = %patch.manifest,
        patched = patch.patched.len(),
        "Tag manifest patched"
    );

    Ok(Some(patch))
}
