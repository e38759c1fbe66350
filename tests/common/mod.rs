//! Shared bag fixtures for integration tests

#![allow(dead_code)]

use bagmend::manifest::DigestAlgorithm;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const DECLARATION: &str = "BagIt-Version: 0.97\nTag-File-Character-Encoding: UTF-8\n";

/// A valid bag with md5 and sha256 payload manifests and md5 and sha512 tag manifests
pub struct BagFixture {
    pub dir: TempDir,
    pub root: PathBuf,
}

impl BagFixture {
    pub fn new(name: &str, files: &[(&str, &str)]) -> Self {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join(name);
        fs::create_dir(&root).unwrap();
        fs::write(root.join("bagit.txt"), DECLARATION).unwrap();
        fs::write(root.join("bag-info.txt"), "Source-Organization: Test\n").unwrap();

        for (path, content) in files {
            let full = root.join(path);
            fs::create_dir_all(full.parent().unwrap()).unwrap();
            fs::write(full, content).unwrap();
        }

        let fixture = Self { dir, root };
        fixture.write_payload_manifest(DigestAlgorithm::Md5, files);
        fixture.write_payload_manifest(DigestAlgorithm::Sha256, files);
        fixture.write_tag_manifest(DigestAlgorithm::Md5);
        fixture.write_tag_manifest(DigestAlgorithm::Sha512);
        fixture
    }

    fn write_payload_manifest(&self, algorithm: DigestAlgorithm, files: &[(&str, &str)]) {
        let mut manifest = String::new();
        for (path, content) in files {
            manifest.push_str(&format!("{}  {}\n", algorithm.digest_hex(content.as_bytes()), path));
        }
        fs::write(self.root.join(format!("manifest-{}.txt", algorithm)), manifest).unwrap();
    }

    fn write_tag_manifest(&self, algorithm: DigestAlgorithm) {
        let mut tag = String::new();
        for name in ["bag-info.txt", "bagit.txt", "manifest-md5.txt", "manifest-sha256.txt"] {
            let bytes = fs::read(self.root.join(name)).unwrap();
            tag.push_str(&format!("{} {}\n", algorithm.digest_hex(&bytes), name));
        }
        fs::write(self.root.join(format!("tagmanifest-{}.txt", algorithm)), tag).unwrap();
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn read(&self, name: &str) -> String {
        fs::read_to_string(self.root.join(name)).unwrap()
    }

    pub fn snapshot(&self) -> Vec<(String, Vec<u8>)> {
        let mut files = Vec::new();
        for entry in walkdir::WalkDir::new(&self.root).sort_by_file_name() {
            let entry = entry.unwrap();
            if entry.file_type().is_file() {
                let rel = entry.path().strip_prefix(&self.root).unwrap();
                files.push((rel.display().to_string(), fs::read(entry.path()).unwrap()));
            }
        }
        files
    }
}
