//! Checksum calculation using SHA-256
//!
//! Files are streamed through the hasher so memory use stays flat regardless
//! of file size. Digests are rendered as 64 lowercase hex characters, the
//! format stored in manifests.

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io;
use std::path::Path;

/// Length of a hex-encoded SHA-256 digest
pub const DIGEST_HEX_LEN: usize = 64;

/// Compute the hex SHA-256 digest of in-memory content
///
/// # Example
///
/// ```
/// use dir_verifier::content::checksum::sha256_hex;
///
/// let hash = sha256_hex(b"hello");
/// assert_eq!(
///     hash,
///     "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
/// );
/// ```
pub fn sha256_hex(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}

/// Stream a file through SHA-256 and return its hex digest
///
/// The file handle is opened and closed within this call.
pub fn sha256_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

/// Whether `value` looks like a digest produced by this module
pub fn is_digest(value: &str) -> bool {
    value.len() == DIGEST_HEX_LEN
        && value
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}
