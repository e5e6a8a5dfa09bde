//! Content addressing for bundle blobs
//!
//! Blobs are identified by a BLAKE3 digest. Inside a bundle they are named by
//! the digest's short prefix; in the shared object store they live under a
//! two-character fan-out directory:
//!
//! ```text
//! <root>/.objectstore/<hash[0..2]>/<hash>
//! <workdir>/data/<hash[0..16]>  -> link into the object store
//! ```

use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use blake3::Hasher;
use serde::{Deserialize, Serialize};

use crate::error::{MlboxError, Result, fs, manifest};

/// Hash algorithm every store in this client is configured with
pub const OBJECT_HASH_ALGO: &str = "blake3";

/// Length of the short hash used as a local file name
pub const SHORT_SIGN_LEN: usize = 16;

/// Length of the fan-out directory prefix in the object store
const OBJECT_FANOUT_LEN: usize = 2;

/// Object store directory under the client root
pub const OBJECT_STORE_DIR: &str = ".objectstore";

/// Per-bundle data directory holding short-named links
pub const BUNDLE_DATA_DIR: &str = "data";

/// Truncate a digest to its short name.
///
/// Digests shorter than `len` are returned whole.
pub fn short_name(hash: &str, len: usize) -> &str {
    match hash.char_indices().nth(len) {
        Some((idx, _)) => &hash[..idx],
        None => hash,
    }
}

/// Layout of a content-addressed store on the local filesystem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLayout {
    /// Directory holding the object store fan-out directories
    pub object_root: PathBuf,
    /// Algorithm all signature entries must use
    pub hash_algorithm: String,
    /// Short name length for bundle-local file names
    pub short_len: usize,
}

impl StoreLayout {
    /// Layout rooted at `<root>/.objectstore` with the default algorithm
    pub fn new(root: &Path) -> Self {
        Self {
            object_root: root.join(OBJECT_STORE_DIR),
            hash_algorithm: OBJECT_HASH_ALGO.to_string(),
            short_len: SHORT_SIGN_LEN,
        }
    }

    /// Short file name for a digest
    pub fn short_name<'a>(&self, hash: &'a str) -> &'a str {
        short_name(hash, self.short_len)
    }

    /// Location of a blob in the shared object store
    pub fn object_path(&self, hash: &str) -> PathBuf {
        self.object_root
            .join(short_name(hash, OBJECT_FANOUT_LEN))
            .join(hash)
    }

    /// Location of a blob inside a bundle working directory
    pub fn bundle_data_path(&self, workdir: &Path, hash: &str) -> PathBuf {
        workdir.join(BUNDLE_DATA_DIR).join(self.short_name(hash))
    }
}

/// One `size:algorithm:hash` entry of a bundle manifest signature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SignatureEntry {
    pub size: u64,
    pub algorithm: String,
    pub hash: String,
}

impl SignatureEntry {
    /// Build the signature entry for a file on disk
    pub fn for_file(path: &Path) -> Result<Self> {
        let size = std::fs::metadata(path)
            .map_err(|e| fs::read_failed(path, e))?
            .len();
        Ok(Self {
            size,
            algorithm: OBJECT_HASH_ALGO.to_string(),
            hash: hash_file(path)?,
        })
    }
}

impl fmt::Display for SignatureEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.size, self.algorithm, self.hash)
    }
}

impl FromStr for SignatureEntry {
    type Err = MlboxError;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(':').collect();
        let [size, algorithm, hash] = parts.as_slice() else {
            return Err(manifest::invalid_signature(
                s,
                format!("expected 3 fields, found {}", parts.len()),
            ));
        };

        let size = size
            .parse::<u64>()
            .map_err(|e| manifest::invalid_signature(s, format!("bad size: {}", e)))?;
        if algorithm.is_empty() {
            return Err(manifest::invalid_signature(s, "empty algorithm"));
        }
        if hash.is_empty() || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(manifest::invalid_signature(s, "hash is not hex"));
        }

        Ok(Self {
            size,
            algorithm: algorithm.to_string(),
            hash: hash.to_ascii_lowercase(),
        })
    }
}

impl TryFrom<String> for SignatureEntry {
    type Error = MlboxError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<SignatureEntry> for String {
    fn from(entry: SignatureEntry) -> Self {
        entry.to_string()
    }
}

/// Calculate the BLAKE3 digest of a file as lowercase hex
pub fn hash_file(path: &Path) -> Result<String> {
    let file = File::open(path).map_err(|e| fs::read_failed(path, e))?;

    let mut reader = BufReader::new(file);
    let mut hasher = Hasher::new();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = reader
            .read(&mut buffer)
            .map_err(|e| fs::read_failed(path, e))?;

        if bytes_read == 0 {
            break;
        }

        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hasher.finalize().to_hex().to_string())
}

/// Calculate the BLAKE3 digest of an in-memory buffer
pub fn hash_bytes(data: &[u8]) -> String {
    blake3::hash(data).to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const DIGEST: &str = "9f2c1b7e4a5d6c8b0e1f2a3b4c5d6e7f8091a2b3c4d5e6f708192a3b4c5d6e7f";

    #[test]
    fn test_short_name_truncates() {
        assert_eq!(short_name(DIGEST, 16), "9f2c1b7e4a5d6c8b");
        assert_eq!(short_name("abc", 16), "abc");
    }

    #[test]
    fn test_object_path_uses_fanout() {
        let layout = StoreLayout::new(Path::new("/root/.mlbox"));
        assert_eq!(
            layout.object_path(DIGEST),
            PathBuf::from("/root/.mlbox/.objectstore/9f").join(DIGEST)
        );
    }

    #[test]
    fn test_bundle_data_path() {
        let layout = StoreLayout::new(Path::new("/r"));
        assert_eq!(
            layout.bundle_data_path(Path::new("/w"), DIGEST),
            PathBuf::from("/w/data/9f2c1b7e4a5d6c8b")
        );
    }

    #[test]
    fn test_signature_entry_parse() {
        let entry: SignatureEntry = format!("1024:blake3:{}", DIGEST).parse().unwrap();
        assert_eq!(entry.size, 1024);
        assert_eq!(entry.algorithm, "blake3");
        assert_eq!(entry.hash, DIGEST);
        assert_eq!(entry.to_string(), format!("1024:blake3:{}", DIGEST));
    }

    #[test]
    fn test_signature_entry_rejects_malformed() {
        assert!("1024:blake3".parse::<SignatureEntry>().is_err());
        assert!("big:blake3:abcd".parse::<SignatureEntry>().is_err());
        assert!("10::abcd".parse::<SignatureEntry>().is_err());
        assert!("10:blake3:not-hex".parse::<SignatureEntry>().is_err());
        assert!("1:2:3:4".parse::<SignatureEntry>().is_err());
    }

    #[test]
    fn test_signature_entry_yaml_string_form() {
        let entry: SignatureEntry = serde_yaml::from_str("\"7:blake3:abcd\"").unwrap();
        assert_eq!(entry.size, 7);
        let dumped = serde_yaml::to_string(&entry).unwrap();
        assert!(dumped.contains("7:blake3:abcd"));
    }

    #[test]
    fn test_hash_file_matches_hash_bytes() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("blob");
        std::fs::write(&path, b"label,image\n7,xxx\n").unwrap();

        assert_eq!(hash_file(&path).unwrap(), hash_bytes(b"label,image\n7,xxx\n"));
    }

    #[test]
    fn test_hash_file_not_found() {
        assert!(hash_file(Path::new("/nonexistent/blob")).is_err());
    }

    #[test]
    fn test_signature_for_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("blob");
        std::fs::write(&path, b"0123456789").unwrap();

        let entry = SignatureEntry::for_file(&path).unwrap();
        assert_eq!(entry.size, 10);
        assert_eq!(entry.algorithm, OBJECT_HASH_ALGO);
        assert_eq!(entry.hash, hash_bytes(b"0123456789"));
    }
}
