/*!
 * Error types for bagmend
 */

use bagmend_core_manifest::Error as ManifestError;
use std::fmt;
use std::io;
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, BagError>;

/// Exit code constants for structured process exit
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_PARTIAL: i32 = 1;
pub const EXIT_FATAL: i32 = 2;
pub const EXIT_INTEGRITY: i32 = 3;

#[derive(Debug)]
pub enum BagError {
    /// Directory is not a bag (no `bagit.txt`)
    InvalidBag(PathBuf),

    /// I/O error
    Io(io::Error),

    /// Configuration error
    Config(String),

    /// Rename map or rename log could not be read or written
    MapFile { path: PathBuf, message: String },

    /// Manifest engine error
    Manifest(ManifestError),

    /// Fixity validation found problems
    Validation { problems: Vec<String> },

    /// Some payload files could not be renamed
    RenameFailures { failures: usize },

    /// Generic error with message
    Other(String),
}

impl BagError {
    /// Get the process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            BagError::InvalidBag(_) | BagError::Config(_) | BagError::MapFile { .. } => EXIT_FATAL,
            BagError::Validation { .. } => EXIT_INTEGRITY,
            BagError::Manifest(err) => match err {
                ManifestError::Validation { .. } => EXIT_INTEGRITY,
                ManifestError::MalformedDescriptor { .. }
                | ManifestError::DuplicateAlgorithm { .. }
                | ManifestError::UnsupportedAlgorithm(_)
                | ManifestError::DuplicateRename { .. }
                | ManifestError::InvalidPattern(_)
                | ManifestError::InvalidGrammar(_) => EXIT_FATAL,
                _ => EXIT_PARTIAL,
            },
            BagError::RenameFailures { .. } => EXIT_PARTIAL,
            _ => EXIT_PARTIAL,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> ErrorCategory {
        match self {
            BagError::InvalidBag(_) => ErrorCategory::Validation,
            BagError::Io(_) => ErrorCategory::IoError,
            BagError::Config(_) | BagError::MapFile { .. } => ErrorCategory::Configuration,
            BagError::Manifest(ManifestError::Validation { .. }) | BagError::Validation { .. } => {
                ErrorCategory::Integrity
            }
            BagError::Manifest(ManifestError::AtomicWrite { .. }) => ErrorCategory::Filesystem,
            BagError::Manifest(_) => ErrorCategory::Manifest,
            BagError::RenameFailures { .. } => ErrorCategory::Filesystem,
            BagError::Other(_) => ErrorCategory::Unknown,
        }
    }
}

/// Error category for classification and reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Path validation errors
    Validation,
    /// I/O operation errors
    IoError,
    /// Configuration and input file errors
    Configuration,
    /// Data integrity errors (checksums)
    Integrity,
    /// Manifest naming and grammar errors
    Manifest,
    /// Filesystem operations (renames, atomic replacement)
    Filesystem,
    /// Uncategorized errors
    Unknown,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Validation => write!(f, "validation"),
            ErrorCategory::IoError => write!(f, "io"),
            ErrorCategory::Configuration => write!(f, "configuration"),
            ErrorCategory::Integrity => write!(f, "integrity"),
            ErrorCategory::Manifest => write!(f, "manifest"),
            ErrorCategory::Filesystem => write!(f, "filesystem"),
            ErrorCategory::Unknown => write!(f, "unknown"),
        }
    }
}

impl fmt::Display for BagError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BagError::InvalidBag(path) => {
                write!(f, "Not a bag (missing bagit.txt): {}", path.display())
            }
            BagError::Io(err) => {
                write!(f, "I/O error: {}", err)
            }
            BagError::Config(msg) => {
                write!(f, "Configuration error: {}", msg)
            }
            BagError::MapFile { path, message } => {
                write!(f, "Rename map {}: {}", path.display(), message)
            }
            BagError::Manifest(err) => {
                write!(f, "Manifest error: {}", err)
            }
            BagError::Validation { problems } => {
                write!(f, "Bag validation failed with {} problem(s)", problems.len())
            }
            BagError::RenameFailures { failures } => {
                write!(f, "{} payload file(s) could not be renamed", failures)
            }
            BagError::Other(msg) => {
                write!(f, "{}", msg)
            }
        }
    }
}

impl std::error::Error for BagError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BagError::Io(err) => Some(err),
            BagError::Manifest(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for BagError {
    fn from(err: io::Error) -> Self {
        BagError::Io(err)
    }
}

impl From<ManifestError> for BagError {
    fn from(err: ManifestError) -> Self {
        match err {
            ManifestError::Validation { problems } => BagError::Validation { problems },
            ManifestError::Io(io) => BagError::Io(io),
            other => BagError::Manifest(other),
        }
    }
}

impl From<serde_json::Error> for BagError {
    fn from(err: serde_json::Error) -> Self {
        BagError::Config(format!("JSON parse error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(BagError::InvalidBag(PathBuf::from("/tmp")).exit_code(), EXIT_FATAL);
        assert_eq!(BagError::Config("bad".to_string()).exit_code(), EXIT_FATAL);
        assert_eq!(
            BagError::Validation {
                problems: vec!["x".to_string()]
            }
            .exit_code(),
            EXIT_INTEGRITY
        );
        assert_eq!(BagError::RenameFailures { failures: 2 }.exit_code(), EXIT_PARTIAL);
        assert_eq!(BagError::Io(io::Error::other("test")).exit_code(), EXIT_PARTIAL);
    }

    #[test]
    fn test_manifest_error_exit_codes() {
        let unsupported: BagError = ManifestError::UnsupportedAlgorithm("sha3".to_string()).into();
        assert_eq!(unsupported.exit_code(), EXIT_FATAL);
        assert_eq!(unsupported.category(), ErrorCategory::Manifest);

        let atomic: BagError = ManifestError::AtomicWrite {
            path: PathBuf::from("manifest-md5.txt"),
            stage: bagmend_core_manifest::ReplaceStage::Rename,
            source: io::Error::other("disk gone"),
        }
        .into();
        assert_eq!(atomic.exit_code(), EXIT_PARTIAL);
        assert_eq!(atomic.category(), ErrorCategory::Filesystem);
    }

    #[test]
    fn test_engine_validation_becomes_bag_validation() {
        let err: BagError = ManifestError::Validation {
            problems: vec!["data/a.txt: checksum mismatch".to_string()],
        }
        .into();
        assert!(matches!(err, BagError::Validation { ref problems } if problems.len() == 1));
        assert_eq!(err.category(), ErrorCategory::Integrity);
    }

    #[test]
    fn test_error_display() {
        let err = BagError::InvalidBag(PathBuf::from("/bags/x"));
        assert_eq!(err.to_string(), "Not a bag (missing bagit.txt): /bags/x");

        let err = BagError::Validation {
            problems: vec!["a".to_string(), "b".to_string()],
        };
        assert_eq!(err.to_string(), "Bag validation failed with 2 problem(s)");
    }

    #[test]
    fn test_other_error() {
        let err = BagError::Other("custom error message".to_string());
        assert_eq!(err.to_string(), "custom error message");
        assert_eq!(err.category(), ErrorCategory::Unknown);
    }
}
