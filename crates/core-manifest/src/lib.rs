//! Fixity-preserving manifest rewriting for BagIt-style packages
//!
//! A package carries two coupled layers of checksummed manifests: payload
//! manifests (`manifest-<alg>.txt`) list payload files, tag manifests
//! (`tagmanifest-<alg>.txt`) list the payload manifests themselves. Renaming
//! payload files therefore means rewriting the payload manifests and then
//! re-checksumming them into the tag manifests. This crate does both in a
//! single pass per manifest, with every file replaced atomically.
//!
//! # Key Concepts
//!
//! - **Record Codec**: byte-preserving parse/format of manifest lines
//! - **Atomic Replacer**: same-directory temp file renamed over the target
//! - **Rewriter / Patcher**: streaming payload rewrite and tag patch
//! - **Rehasher**: sequences both phases for one package
//!
//! # Example
//!
//! ```no_run
//! use bagmend_core_manifest::{Package, RenameMap, Rehasher};
//!
//! fn rehash(package: &dyn Package) -> bagmend_core_manifest::Result<()> {
//!     let renames = RenameMap::from_pairs([("data/old.txt", "data/new.txt")])?;
//!     let report = Rehasher::default().run(package, &renames)?;
//!     println!("{} digests updated", report.digests.len());
//!     Ok(())
//! }
//! ```

pub mod atomic;
pub mod digest;
pub mod error;
pub mod naming;
pub mod package;
pub mod patch;
pub mod record;
pub mod rehash;
pub mod rename_map;
pub mod rewrite;

// Re-export main types for convenience
pub use atomic::{replace_atomically, AtomicFile, ReplaceOptions};
pub use digest::{hash_file, DigestAlgorithm, DigestSet, StreamingDigest};
pub use error::{Error, ReplaceStage, Result};
pub use naming::{ManifestDescriptor, ManifestKind, ManifestNaming};
pub use package::Package;
pub use patch::{patch_tag_manifest, TagPatch};
pub use record::{ManifestLine, ManifestReader, ManifestRecord, RecordGrammar};
pub use rehash::{DigestMap, EngineConfig, RehashReport, Rehasher, ResolvedManifests};
pub use rename_map::{RenameEntry, RenameMap};
pub use rewrite::{rewrite_payload_manifest, PayloadRewrite};
