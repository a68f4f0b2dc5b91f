//! This module contains functions for hashing files and writing package manifests.

use crate::error::Result;
use crate::utils::log::{log, LogLevel};
use sha1::{Digest, Sha1};
use std::cmp::min;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use walkdir::WalkDir;

const CHUNK_SIZE: usize = 1024 * 1024; // 1MB: read files in chunks for efficiency

/// File name of the manifest written into every package folder
pub const MANIFEST: &str = "manifest.txt";

pub struct Hasher;

impl Hasher {
    /// Hashes a file and returns the hash as a string.
    pub fn hash_file(path: &Path) -> Result<String> {
        let mut file = File::open(path)?;
        let mut limit = file.metadata()?.len();

        let mut buffer = vec![0; CHUNK_SIZE];
        let mut hasher = Sha1::new();

        while limit > 0 {
            let read_size = min(limit, CHUNK_SIZE as u64) as usize;
            let read = file.read(&mut buffer[0..read_size])?;
            if read == 0 {
                break;
            }
            hasher.update(&buffer[0..read]);
            limit -= read as u64;
        }

        Ok(to_hex(&hasher.finalize()))
    }

    /// Hashes a string and returns the hash as a string.
    /// # Arguments
    /// * `content` - Contains the content to be hashed.
    pub fn hash_string(content: &str) -> String {
        let mut hasher = Sha1::new();
        hasher.update(content.as_bytes());
        to_hex(&hasher.finalize())
    }

    /// Hashes every file under `root` (except the manifest itself) and
    /// writes `<hash>  <relative path>` lines, sorted by path.
    /// Returns the entries written.
    pub fn write_manifest(root: &Path) -> Result<Vec<(String, String)>> {
        let mut entries = Vec::new();
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry.map_err(std::io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let rel = match entry.path().strip_prefix(root) {
                Ok(rel) => rel.to_string_lossy().replace('\\', "/"),
                Err(_) => continue,
            };
            if rel == MANIFEST {
                continue;
            }
            let hash = Hasher::hash_file(entry.path())?;
            entries.push((rel, hash));
        }
        entries.sort();

        let mut content = String::new();
        for (rel, hash) in &entries {
            content.push_str(&format!("{}  {}\n", hash, rel));
        }
        std::fs::write(root.join(MANIFEST), content)?;
        log(LogLevel::Debug, &format!("Wrote manifest with {} entries", entries.len()));
        Ok(entries)
    }

    /// Loads a manifest as (relative path, hash) pairs
    pub fn load_manifest(root: &Path) -> Result<Vec<(String, String)>> {
        let content = std::fs::read_to_string(root.join(MANIFEST))?;
        Ok(content
            .lines()
            .filter_map(|line| line.split_once("  "))
            .map(|(hash, rel)| (rel.to_string(), hash.to_string()))
            .collect())
    }
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| format!("{:02x}", byte)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_hash_string_known_value() {
        assert_eq!(Hasher::hash_string("abc"), "a9993e364706816aba3e25717850c26c9cd0d89d");
    }

    #[test]
    fn test_hash_file_matches_hash_string() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("f.txt");
        fs::write(&path, "abc").unwrap();
        assert_eq!(Hasher::hash_file(&path).unwrap(), Hasher::hash_string("abc"));
    }

    #[test]
    fn test_hash_missing_file_errors() {
        assert!(Hasher::hash_file(Path::new("/nonexistent/file")).is_err());
    }

    #[test]
    fn test_manifest_lists_every_file_sorted() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("lib")).unwrap();
        fs::create_dir_all(dir.path().join("include/pomar")).unwrap();
        fs::write(dir.path().join("lib/libpomar.a"), "archive").unwrap();
        fs::write(dir.path().join("include/pomar/tree.h"), "header").unwrap();

        let entries = Hasher::write_manifest(dir.path()).unwrap();
        let paths: Vec<&str> = entries.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(paths, vec!["include/pomar/tree.h", "lib/libpomar.a"]);

        // rewriting must not pick up the manifest itself
        let again = Hasher::write_manifest(dir.path()).unwrap();
        assert_eq!(again, entries);
        assert_eq!(Hasher::load_manifest(dir.path()).unwrap(), entries);
    }
}
