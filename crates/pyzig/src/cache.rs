//! Build cache: SHA-256 content hash sidecars (spec.md §3, §4.6, §6).
//!
//! A `.hash` file next to the output binary holds the hex-encoded digest
//! of the exact source bytes that produced it. The orchestrator treats
//! any content other than a matching digest as a cache miss.

use std::{
    fs,
    path::{Path, PathBuf},
};

use sha2::{Digest, Sha256};

use crate::error::ToolError;

#[must_use]
pub fn digest_hex(source: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source);
    hex_encode(&hasher.finalize())
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        use std::fmt::Write as _;
        let _ = write!(out, "{byte:02x}");
    }
    out
}

#[must_use]
pub fn hash_sidecar_path(output_path: &Path) -> PathBuf {
    let mut path = output_path.as_os_str().to_owned();
    path.push(".hash");
    PathBuf::from(path)
}

/// True if `output_path` exists and its `.hash` sidecar contains exactly
/// `digest_hex(source)` (spec.md §4.6 step 2).
#[must_use]
pub fn is_fresh(output_path: &Path, source: &[u8]) -> bool {
    if !output_path.exists() {
        return false;
    }
    let sidecar = hash_sidecar_path(output_path);
    match fs::read_to_string(&sidecar) {
        Ok(stored) => stored.trim() == digest_hex(source),
        Err(_) => false,
    }
}

pub fn write_sidecar(output_path: &Path, source: &[u8]) -> Result<(), ToolError> {
    let sidecar = hash_sidecar_path(output_path);
    fs::write(&sidecar, digest_hex(source)).map_err(|source_err| ToolError::Io { path: sidecar, source: source_err })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_64_lowercase_hex_chars() {
        let digest = digest_hex(b"print(1)");
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn one_byte_change_invalidates() {
        assert_ne!(digest_hex(b"a = 1"), digest_hex(b"a = 2"));
    }

    #[test]
    fn missing_binary_is_never_fresh() {
        let dir = std::env::temp_dir().join("pyzig-cache-test-missing");
        let _ = fs::remove_file(&dir);
        assert!(!is_fresh(&dir, b"source"));
    }
}
