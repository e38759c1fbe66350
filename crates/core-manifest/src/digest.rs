//! Streaming digests for manifest and payload checksums
//!
//! Manifest file names carry the algorithm as an opaque token
//! (`tagmanifest-sha256.txt`). Only tokens that resolve to a
//! [`DigestAlgorithm`] can be used to compute new checksums; anything else
//! fails with [`Error::UnsupportedAlgorithm`].

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::str::FromStr;

/// Checksum algorithms available for computing manifest digests
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    Md5,
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
    Blake3,
}

impl DigestAlgorithm {
    /// Canonical manifest token for this algorithm
    pub fn name(&self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha1 => "sha1",
            Self::Sha224 => "sha224",
            Self::Sha256 => "sha256",
            Self::Sha384 => "sha384",
            Self::Sha512 => "sha512",
            Self::Blake3 => "blake3",
        }
    }

    /// Start a fresh accumulator
    pub fn hasher(&self) -> StreamingDigest {
        let state = match self {
            Self::Md5 => HashState::Md5(md5::Context::new()),
            Self::Sha1 => HashState::Sha1(Sha1::new()),
            Self::Sha224 => HashState::Sha224(Sha224::new()),
            Self::Sha256 => HashState::Sha256(Sha256::new()),
            Self::Sha384 => HashState::Sha384(Sha384::new()),
            Self::Sha512 => HashState::Sha512(Sha512::new()),
            Self::Blake3 => HashState::Blake3(Box::new(blake3::Hasher::new())),
        };
        StreamingDigest {
            algorithm: *self,
            state,
        }
    }

    /// Hex digest of an in-memory buffer
    pub fn digest_hex(&self, data: &[u8]) -> String {
        let mut hasher = self.hasher();
        hasher.update(data);
        hasher.finalize_hex()
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DigestAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_ascii_lowercase();

        match normalized.as_str() {
            "md5" => Ok(Self::Md5),
            "sha1" => Ok(Self::Sha1),
            "sha224" => Ok(Self::Sha224),
            "sha256" => Ok(Self::Sha256),
            "sha384" => Ok(Self::Sha384),
            "sha512" => Ok(Self::Sha512),
            "blake3" => Ok(Self::Blake3),
            _ => Err(Error::unsupported(s)),
        }
    }
}

enum HashState {
    Md5(md5::Context),
    Sha1(Sha1),
    Sha224(Sha224),
    Sha256(Sha256),
    Sha384(Sha384),
    Sha512(Sha512),
    Blake3(Box<blake3::Hasher>),
}

/// Incremental hasher for one algorithm
pub struct StreamingDigest {
    algorithm: DigestAlgorithm,
    state: HashState,
}

impl StreamingDigest {
    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    /// Update the hash with new data
    pub fn update(&mut self, data: &[u8]) {
        match &mut self.state {
            HashState::Md5(ctx) => ctx.consume(data),
            HashState::Sha1(h) => h.update(data),
            HashState::Sha224(h) => h.update(data),
            HashState::Sha256(h) => h.update(data),
            HashState::Sha384(h) => h.update(data),
            HashState::Sha512(h) => h.update(data),
            HashState::Blake3(h) => {
                h.update(data);
            }
        }
    }

    /// Finalize and return the lowercase hex digest
    pub fn finalize_hex(self) -> String {
        match self.state {
            HashState::Md5(ctx) => format!("{:x}", ctx.compute()),
            HashState::Sha1(h) => format!("{:x}", h.finalize()),
            HashState::Sha224(h) => format!("{:x}", h.finalize()),
            HashState::Sha256(h) => format!("{:x}", h.finalize()),
            HashState::Sha384(h) => format!("{:x}", h.finalize()),
            HashState::Sha512(h) => format!("{:x}", h.finalize()),
            HashState::Blake3(h) => h.finalize().to_hex().to_string(),
        }
    }
}

impl fmt::Debug for StreamingDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamingDigest")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

/// A fan-out of accumulators fed identical bytes
#[derive(Debug, Default)]
pub struct DigestSet {
    digests: Vec<StreamingDigest>,
}

impl DigestSet {
    pub fn new(algorithms: &[DigestAlgorithm]) -> Self {
        let mut digests: Vec<StreamingDigest> = Vec::with_capacity(algorithms.len());
        for algorithm in algorithms {
            if !digests.iter().any(|d| d.algorithm == *algorithm) {
                digests.push(algorithm.hasher());
            }
        }
        Self { digests }
    }

    pub fn is_empty(&self) -> bool {
        self.digests.is_empty()
    }

    pub fn update(&mut self, data: &[u8]) {
        for digest in &mut self.digests {
            digest.update(data);
        }
    }

    /// Finalize every accumulator
    pub fn finalize(self) -> Vec<(DigestAlgorithm, String)> {
        self.digests
            .into_iter()
            .map(|d| (d.algorithm, d.finalize_hex()))
            .collect()
    }
}

/// Calculate the hex digest of a file
pub fn hash_file(path: &Path, algorithm: DigestAlgorithm) -> Result<String> {
    let mut file = BufReader::new(File::open(path)?);
    let mut hasher = algorithm.hasher();
    let mut buffer = vec![0u8; 64 * 1024];

    loop {
        let n = file.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(hasher.finalize_hex())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_input_digests() {
        assert_eq!(
            DigestAlgorithm::Md5.digest_hex(b""),
            "d41d8cd98f00b204e9800998ecf8427e"
        );
        assert_eq!(
            DigestAlgorithm::Sha1.digest_hex(b""),
            "da39a3ee5e6b4b0d3255bfef95601890afd80709"
        );
        assert_eq!(
            DigestAlgorithm::Sha256.digest_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_streaming_matches_one_shot() {
        let mut hasher = DigestAlgorithm::Sha256.hasher();
        hasher.update(b"hello ");
        hasher.update(b"world");

        // SHA256 of "hello world"
        assert_eq!(
            hasher.finalize_hex(),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_algorithm_names() {
        assert_eq!("md5".parse::<DigestAlgorithm>().unwrap(), DigestAlgorithm::Md5);
        assert_eq!("SHA-256".parse::<DigestAlgorithm>().unwrap(), DigestAlgorithm::Sha256);
        assert_eq!("sha512".parse::<DigestAlgorithm>().unwrap(), DigestAlgorithm::Sha512);
        assert_eq!("blake3".parse::<DigestAlgorithm>().unwrap().to_string(), "blake3");

        assert_eq!("SHA1".parse::<DigestAlgorithm>().unwrap(), DigestAlgorithm::Sha1);
        assert_eq!("sha-1".parse::<DigestAlgorithm>().unwrap().to_string(), "sha1");

        let err = "sha3".parse::<DigestAlgorithm>().unwrap_err();
        assert!(matches!(err, Error::UnsupportedAlgorithm(ref name) if name == "sha3"));
    }

    #[test]
    fn test_digest_set_fans_out() {
        let mut set = DigestSet::new(&[
            DigestAlgorithm::Md5,
            DigestAlgorithm::Sha256,
            DigestAlgorithm::Md5,
        ]);
        set.update(b"abc");

        let results = set.finalize();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0], (DigestAlgorithm::Md5, DigestAlgorithm::Md5.digest_hex(b"abc")));
        assert_eq!(
            results[1],
            (DigestAlgorithm::Sha256, DigestAlgorithm::Sha256.digest_hex(b"abc"))
        );
    }

    #[test]
    fn test_hash_file() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(b"test data").unwrap();
        temp.flush().unwrap();

        let checksum = hash_file(temp.path(), DigestAlgorithm::Sha512).unwrap();
        assert_eq!(checksum, DigestAlgorithm::Sha512.digest_hex(b"test data"));
        assert_eq!(checksum.len(), 128);
    }
}
