//! Error types for manifest operations

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for manifest operations
pub type Result<T> = std::result::Result<T, Error>;

/// Step of an atomic replacement that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceStage {
    Stat,
    Create,
    Permissions,
    Ownership,
    Write,
    Sync,
    Rename,
}

impl std::fmt::Display for ReplaceStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ReplaceStage::Stat => "stat",
            ReplaceStage::Create => "create",
            ReplaceStage::Permissions => "permissions",
            ReplaceStage::Ownership => "ownership",
            ReplaceStage::Write => "write",
            ReplaceStage::Sync => "sync",
            ReplaceStage::Rename => "rename",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while rewriting manifests
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Manifest file name does not follow `<kind>-<algorithm>.txt`
    #[error("Malformed manifest name: {path}")]
    MalformedDescriptor { path: PathBuf },

    /// Two manifests of the same kind share an algorithm
    #[error("Duplicate {kind} manifest for algorithm {algorithm}")]
    DuplicateAlgorithm { kind: String, algorithm: String },

    /// Digest algorithm is not known to this build
    #[error("Unsupported digest algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Temporary file handling failed; the target is untouched
    #[error("Atomic write of {path} failed during {stage}: {source}")]
    AtomicWrite {
        path: PathBuf,
        stage: ReplaceStage,
        #[source]
        source: io::Error,
    },

    /// The same source path appears twice in a rename map
    #[error("Duplicate rename source: {path}")]
    DuplicateRename { path: String },

    /// A manifest grammar could not be compiled
    #[error("Invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// A grammar compiled but cannot describe manifest entries
    #[error("Invalid grammar: {0}")]
    InvalidGrammar(String),

    /// Package fixity validation found problems
    #[error("Package validation failed with {} problem(s)", problems.len())]
    Validation { problems: Vec<String> },

    /// Error raised by a package implementation
    #[error("Package error: {0}")]
    Package(String),
}

impl Error {
    /// Create a malformed descriptor error
    pub fn malformed<P: Into<PathBuf>>(path: P) -> Self {
        Error::MalformedDescriptor { path: path.into() }
    }

    /// Create an atomic write failure
    pub fn atomic_write<P: Into<PathBuf>>(path: P, stage: ReplaceStage, source: io::Error) -> Self {
        Error::AtomicWrite {
            path: path.into(),
            stage,
            source,
        }
    }

    /// Create an unsupported algorithm error
    pub fn unsupported<S: Into<String>>(algorithm: S) -> Self {
        Error::UnsupportedAlgorithm(algorithm.into())
    }

    /// Create a package error with a message
    pub fn package<S: Into<String>>(message: S) -> Self {
        Error::Package(message.into())
    }
}
