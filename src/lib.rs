/*!
 * bagmend - rename payload files inside BagIt bags
 *
 * Renames payload files and keeps the bag valid:
 * - payload manifests rewritten with the new file names
 * - tag manifests patched with the new payload manifest checksums
 * - every manifest replaced atomically
 * - fixity validation before and after, hashed in parallel
 * - dry-run by default, with a JSON rename log for audit and confirmation
 *
 * The manifest engine lives in the `bagmend-core-manifest` crate; this crate
 * supplies the filesystem bag, the rename workflow and the CLI plumbing.
 */

pub mod bag;
pub mod cli_style;
pub mod config;
pub mod confirm;
pub mod core;
pub mod error;
pub mod logging;
pub mod mapfile;

// Re-export commonly used types
pub use bag::BagDirectory;
pub use config::{BagmendConfig, ConventionConfig, LogLevel};
pub use confirm::{ConfirmationReport, PathStatus};
pub use crate::core::{
    NamingConvention, RenameLog, RenameOptions, RenameOutcome, RenamePlan, RenameSession,
    ValidationSummary,
};
pub use error::{BagError, Result};

pub use bagmend_core_manifest as manifest;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
