//! Rehash orchestration for one package
//!
//! A run goes through four phases:
//!
//! 1. **Resolve**: list payload and tag manifests and index them by algorithm.
//! 2. **Guard**: an empty rename map ends the run with no side effects.
//! 3. **Rewrite**: every payload manifest is rewritten through the rename map,
//!    collecting its new digest in every tag algorithm.
//! 4. **Patch**: every tag manifest receives the new digests.
//!
//! Any failure during rewrite stops the run before a single tag manifest is
//! touched, so tag manifests are never patched against a partially updated
//! set of payload manifests.

use crate::atomic::ReplaceOptions;
use crate::digest::DigestAlgorithm;
use crate::error::Result;
use crate::naming::{index_by_algorithm, ManifestDescriptor, ManifestKind, ManifestNaming};
use crate::package::Package;
use crate::patch::{patch_tag_manifest, TagPatch};
use crate::record::RecordGrammar;
use crate::rename_map::RenameMap;
use crate::rewrite::{rewrite_payload_manifest, PayloadRewrite};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use tracing::{info, warn};

/// Immutable parameters of a run
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub grammar: RecordGrammar,
    pub naming: ManifestNaming,
    pub replace: ReplaceOptions,
}

/// New digests of rewritten payload manifests, per tag algorithm
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DigestMap {
    entries: BTreeMap<String, BTreeMap<String, String>>,
}

impl DigestMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tag_algorithm: &str, manifest: &str, digest: String) {
        self.entries
            .entry(tag_algorithm.to_string())
            .or_default()
            .insert(manifest.to_string(), digest);
    }

    pub fn get(&self, tag_algorithm: &str, manifest: &str) -> Option<&str> {
        self.entries
            .get(tag_algorithm)
            .and_then(|m| m.get(manifest))
            .map(String::as_str)
    }

    /// Every new digest for one tag algorithm, keyed by manifest path
    pub fn slice(&self, tag_algorithm: &str) -> Option<&BTreeMap<String, String>> {
        self.entries.get(tag_algorithm)
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Manifests of a package, indexed by algorithm token
#[derive(Debug, Clone, Default)]
pub struct ResolvedManifests {
    pub payload: BTreeMap<String, ManifestDescriptor>,
    pub tag: BTreeMap<String, ManifestDescriptor>,
}

/// Summary of one run
#[derive(Debug, Clone, Default, Serialize)]
pub struct RehashReport {
    /// True when the run ended at the guard
    pub skipped: bool,
    pub payload_manifests: Vec<PayloadRewrite>,
    pub tag_manifests: Vec<TagPatch>,
    pub digests: DigestMap,
    /// Rename sources that no payload manifest listed
    pub unmatched: Vec<String>,
}

impl RehashReport {
    /// Every rename source substituted in at least one manifest
    pub fn substituted(&self) -> BTreeSet<&str> {
        self.payload_manifests
            .iter()
            .flat_map(|p| p.substituted.iter().map(String::as_str))
            .collect()
    }
}

/// Drives manifest rewriting for a package
#[derive(Debug, Clone, Default)]
pub struct Rehasher {
    config: EngineConfig,
}

impl Rehasher {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Describe every manifest of `package`
    pub fn resolve<P: Package + ?Sized>(&self, package: &P) -> Result<ResolvedManifests> {
        let root = package.root();
        let describe = |paths: Vec<PathBuf>, kind: ManifestKind| -> Result<Vec<ManifestDescriptor>> {
            paths
                .iter()
                .map(|p| ManifestDescriptor::resolve(root, p, kind, &self.config.naming))
                .collect()
        };

        let payload = describe(package.payload_manifests()?, ManifestKind::Payload)?;
        let tag = describe(package.tag_manifests()?, ManifestKind::Tag)?;

        Ok(ResolvedManifests {
            payload: index_by_algorithm(payload)?,
            tag: index_by_algorithm(tag)?,
        })
    }

    /// Check that `package` can be rehashed without writing anything:
    /// every manifest name resolves and every tag algorithm is computable.
    ///
    /// Callers that move payload files before rehashing run this first, so a
    /// package the engine would refuse is never left half renamed.
    pub fn preflight<P: Package + ?Sized>(&self, package: &P) -> Result<ResolvedManifests> {
        let manifests = self.resolve(package)?;
        tag_algorithms(&manifests)?;
        Ok(manifests)
    }

    /// Rewrite payload manifests through `rename_map` and patch tag
    /// manifests with their new digests.
    ///
    /// The payload files must already have been moved by the caller.
    pub fn run<P: Package + ?Sized>(&self, package: &P, rename_map: &RenameMap) -> Result<RehashReport> {
        let manifests = self.resolve(package)?;

        if rename_map.is_empty() {
            info!(root = %package.root().display(), "Rename map is empty, nothing to rehash");
            return Ok(RehashReport {
                skipped: true,
                ..RehashReport::default()
            });
        }

        // Every tag algorithm must be computable before anything is written.
        let tag_algorithms = tag_algorithms(&manifests)?;
        let algorithms: Vec<DigestAlgorithm> = tag_algorithms.iter().map(|(_, a)| *a).collect();

        info!(
            root = %package.root().display(),
            payload_manifests = manifests.payload.len(),
            tag_manifests = manifests.tag.len(),
            renames = rename_map.len(),
            "Rehashing package manifests"
        );

        let mut report = RehashReport::default();

        for descriptor in manifests.payload.values() {
            let Some(rewrite) = rewrite_payload_manifest(
                descriptor,
                rename_map,
                &algorithms,
                &self.config.grammar,
                &self.config.replace,
            )?
            else {
                continue;
            };

            for (token, algorithm) in &tag_algorithms {
                if let Some(digest) = rewrite.digests.get(algorithm) {
                    report
                        .digests
                        .insert(token, &descriptor.relative_path, digest.clone());
                }
            }
            report.payload_manifests.push(rewrite);
        }

        let substituted = report.substituted();
        let unmatched: Vec<String> = rename_map
            .iter()
            .filter(|entry| !substituted.contains(entry.old.as_str()))
            .map(|entry| entry.old.clone())
            .collect();
        report.unmatched = unmatched;
        for old in &report.unmatched {
            warn!(path = %old, "Renamed path not found in any payload manifest");
        }

        for (token, descriptor) in &manifests.tag {
            if let Some(patch) = patch_tag_manifest(
                descriptor,
                report.digests.slice(token),
                &self.config.grammar,
                &self.config.replace,
            )? {
                report.tag_manifests.push(patch);
            }
        }

        info!(
            payload_manifests = report.payload_manifests.len(),
            tag_manifests = report.tag_manifests.len(),
            unmatched = report.unmatched.len(),
            "Rehash complete"
        );

        Ok(report)
    }
}

fn tag_algorithms(manifests: &ResolvedManifests) -> Result<Vec<(String, DigestAlgorithm)>> {
    manifests
        .tag
        .keys()
        .map(|token| token.parse::<DigestAlgorithm>().map(|a| (token.clone(), a)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::fs;
    use std::path::Path;
    use tempfile::{tempdir, TempDir};

    struct DirPackage {
        dir: TempDir,
        payload: Vec<&'static str>,
        tag: Vec<&'static str>,
    }

    impl Package for DirPackage {
        fn root(&self) -> &Path {
            self.dir.path()
        }

        fn payload_manifests(&self) -> Result<Vec<PathBuf>> {
            Ok(self.payload.iter().map(|n| self.dir.path().join(n)).collect())
        }

        fn tag_manifests(&self) -> Result<Vec<PathBuf>> {
            Ok(self.tag.iter().map(|n| self.dir.path().join(n)).collect())
        }

        fn rename_payload_file(&self, _old: &str, _new: &str) -> Result<bool> {
            Ok(false)
        }

        fn validate(&self) -> Result<()> {
            Ok(())
        }
    }

    fn package(payload: Vec<&'static str>, tag: Vec<&'static str>) -> DirPackage {
        DirPackage {
            dir: tempdir().unwrap(),
            payload,
            tag,
        }
    }

    #[test]
    fn test_digest_map() {
        let mut map = DigestMap::new();
        assert!(map.is_empty());
        map.insert("md5", "manifest-md5.txt", "aa".to_string());
        map.insert("sha256", "manifest-md5.txt", "bb".to_string());
        assert_eq!(map.get("md5", "manifest-md5.txt"), Some("aa"));
        assert_eq!(map.slice("sha256").unwrap().len(), 1);
        assert!(map.slice("sha512").is_none());
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_run_rewrites_and_patches() {
        let pkg = package(vec!["manifest-md5.txt"], vec!["tagmanifest-md5.txt"]);
        let root = pkg.dir.path();
        fs::write(root.join("manifest-md5.txt"), "abc123  data/old_name_1.txt\n").unwrap();
        fs::write(
            root.join("tagmanifest-md5.txt"),
            "d41d8cd98f00b204e9800998ecf8427e  manifest-md5.txt\n",
        )
        .unwrap();

        let map = RenameMap::from_pairs([("data/old_name_1.txt", "data/new_name_1.txt")]).unwrap();
        let report = Rehasher::default().run(&pkg, &map).unwrap();

        let new_manifest = "abc123  data/new_name_1.txt\n";
        let digest = DigestAlgorithm::Md5.digest_hex(new_manifest.as_bytes());
        assert_eq!(fs::read_to_string(root.join("manifest-md5.txt")).unwrap(), new_manifest);
        assert_eq!(report.digests.get("md5", "manifest-md5.txt"), Some(digest.as_str()));
        assert_eq!(
            fs::read_to_string(root.join("tagmanifest-md5.txt")).unwrap(),
            format!("{}  manifest-md5.txt\n", digest)
        );
        assert!(report.unmatched.is_empty());
        assert!(!report.skipped);
    }

    #[test]
    fn test_empty_map_skips_without_writes() {
        let pkg = package(vec!["manifest-md5.txt"], vec!["tagmanifest-md5.txt"]);
        let root = pkg.dir.path();
        fs::write(root.join("manifest-md5.txt"), "abc  data/a\n").unwrap();
        fs::write(root.join("tagmanifest-md5.txt"), "def  manifest-md5.txt\n").unwrap();

        let report = Rehasher::default().run(&pkg, &RenameMap::new()).unwrap();
        assert!(report.skipped);
        assert!(report.digests.is_empty());
        assert_eq!(fs::read_to_string(root.join("manifest-md5.txt")).unwrap(), "abc  data/a\n");
    }

    #[test]
    fn test_unsupported_tag_algorithm_aborts_before_writes() {
        let pkg = package(vec!["manifest-md5.txt"], vec!["tagmanifest-sha3.txt"]);
        let root = pkg.dir.path();
        fs::write(root.join("manifest-md5.txt"), "abc  data/a\n").unwrap();
        fs::write(root.join("tagmanifest-sha3.txt"), "def  manifest-md5.txt\n").unwrap();

        let map = RenameMap::from_pairs([("data/a", "data/b")]).unwrap();
        let err = Rehasher::default().run(&pkg, &map).unwrap_err();

        assert!(matches!(err, Error::UnsupportedAlgorithm(ref a) if a == "sha3"));
        assert_eq!(fs::read_to_string(root.join("manifest-md5.txt")).unwrap(), "abc  data/a\n");
    }

    #[test]
    fn test_preflight_checks_tag_algorithms() {
        let pkg = package(vec!["manifest-md5.txt"], vec!["tagmanifest-md5.txt"]);
        fs::write(pkg.dir.path().join("manifest-md5.txt"), "abc  data/a\n").unwrap();
        fs::write(pkg.dir.path().join("tagmanifest-md5.txt"), "def  manifest-md5.txt\n").unwrap();
        let resolved = Rehasher::default().preflight(&pkg).unwrap();
        assert!(resolved.payload.contains_key("md5"));

        let pkg = package(vec!["manifest-md5.txt"], vec!["tagmanifest-sha3.txt"]);
        let err = Rehasher::default().preflight(&pkg).unwrap_err();
        assert!(matches!(err, Error::UnsupportedAlgorithm(ref a) if a == "sha3"));

        let pkg = package(vec!["manifest.txt"], vec![]);
        let err = Rehasher::default().preflight(&pkg).unwrap_err();
        assert!(matches!(err, Error::MalformedDescriptor { .. }));
    }

    #[test]
    fn test_sha1_tag_manifest_is_patched() {
        let pkg = package(vec!["manifest-sha1.txt"], vec!["tagmanifest-sha1.txt"]);
        let root = pkg.dir.path();
        fs::write(root.join("manifest-sha1.txt"), "abc  data/a\n").unwrap();
        fs::write(root.join("tagmanifest-sha1.txt"), "def  manifest-sha1.txt\n").unwrap();

        let map = RenameMap::from_pairs([("data/a", "data/b")]).unwrap();
        Rehasher::default().run(&pkg, &map).unwrap();

        let digest = DigestAlgorithm::Sha1.digest_hex(b"abc  data/b\n");
        assert_eq!(
            fs::read_to_string(root.join("tagmanifest-sha1.txt")).unwrap(),
            format!("{}  manifest-sha1.txt\n", digest)
        );
    }

    #[test]
    fn test_malformed_manifest_name_aborts() {
        let pkg = package(vec!["manifest.txt"], vec![]);
        fs::write(pkg.dir.path().join("manifest.txt"), "abc  data/a\n").unwrap();

        let map = RenameMap::from_pairs([("data/a", "data/b")]).unwrap();
        let err = Rehasher::default().run(&pkg, &map).unwrap_err();
        assert!(matches!(err, Error::MalformedDescriptor { .. }));
    }

    #[test]
    fn test_unmatched_renames_are_reported() {
        let pkg = package(vec!["manifest-sha256.txt"], vec![]);
        fs::write(pkg.dir.path().join("manifest-sha256.txt"), "abc  data/a\n").unwrap();

        let map = RenameMap::from_pairs([("data/a", "data/b"), ("data/ghost", "data/c")]).unwrap();
        let report = Rehasher::default().run(&pkg, &map).unwrap();

        assert_eq!(report.unmatched, vec!["data/ghost".to_string()]);
        assert!(report.substituted().contains("data/a"));
        assert!(report.tag_manifests.is_empty());
    }
}
