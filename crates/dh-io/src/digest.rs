//! Input-file content digest, recorded in the KPI contract's metadata
//! (spec §4.13: "Timestamp and an input-file digest are recorded in
//! metadata") so that two runs over byte-identical inputs can be compared
//! without re-reading every file.

use dh_core::DhResult;
use sha2::{Digest, Sha256};
use std::path::Path;

/// SHA-256 digest of the concatenation of every given file's contents, in
/// the order given, prefixed by its path so two runs over reordered but
/// identical file sets still produce distinct digests. Returned as a lower-
/// case hex string.
pub fn input_digest(paths: &[impl AsRef<Path>]) -> DhResult<String> {
    let mut hasher = Sha256::new();
    for path in paths {
        let path = path.as_ref();
        hasher.update(path.to_string_lossy().as_bytes());
        hasher.update(b"\0");
        let bytes = std::fs::read(path)?;
        hasher.update(&bytes);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let f = dir.path().join("a.txt");
        std::fs::write(&f, b"hello").unwrap();
        let d1 = input_digest(&[&f]).unwrap();
        let d2 = input_digest(&[&f]).unwrap();
        assert_eq!(d1, d2);
    }

    #[test]
    fn digest_changes_with_content() {
        let dir = tempfile::tempdir().unwrap();
        let f = dir.path().join("a.txt");
        std::fs::write(&f, b"hello").unwrap();
        let d1 = input_digest(&[&f]).unwrap();
        std::fs::write(&f, b"world").unwrap();
        let d2 = input_digest(&[&f]).unwrap();
        assert_ne!(d1, d2);
    }
}
