//! SHA-256 integrity gate
//!
//! No downloaded archive is extracted before it passes through here.

use std::path::Path;

use sha2::{Digest as _, Sha256};
use tokio::io::AsyncReadExt;

use crate::error::{ActionError, ActionResult};

/// Hex length of a SHA-256 digest
const SHA256_HEX_LEN: usize = 64;

/// SHA-256 of an in-memory buffer as lowercase hex
pub fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// SHA-256 of a file as lowercase hex, streamed in chunks
pub async fn sha256_file(path: &Path) -> ActionResult<String> {
    let mut file = tokio::fs::File::open(path)
        .await
        .map_err(|e| ActionError::io("open", path, e))?;

    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let n = file
            .read(&mut buf)
            .await
            .map_err(|e| ActionError::io("read", path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Normalize a user/manifest supplied checksum to lowercase hex.
///
/// Fails if the value is not 64 hex characters after trimming.
pub fn normalize_checksum(raw: &str) -> ActionResult<String> {
    let normalized = raw.trim().to_ascii_lowercase();
    if !is_sha256_hex(&normalized) {
        return Err(ActionError::config(format!(
            "invalid SHA256 checksum '{}': expected {} hex characters",
            raw.trim(),
            SHA256_HEX_LEN
        )));
    }
    Ok(normalized)
}

/// True for exactly 64 lowercase hex characters
pub fn is_sha256_hex(value: &str) -> bool {
    value.len() == SHA256_HEX_LEN
        && value
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

/// Compare a computed digest against the expected one
fn compare(subject: &str, actual: String, expected: &str) -> ActionResult<()> {
    let expected = normalize_checksum(expected)?;
    if actual != expected {
        return Err(ActionError::ChecksumMismatch {
            subject: subject.to_string(),
            expected,
            actual,
        });
    }
    Ok(())
}

/// Verify a file's SHA-256 against `expected`
pub async fn verify_file(path: &Path, expected: &str, subject: &str) -> ActionResult<()> {
    let actual = sha256_file(path).await?;
    compare(subject, actual, expected)
}

/// Verify an in-memory buffer's SHA-256 against `expected`
pub fn verify_bytes(bytes: &[u8], expected: &str, subject: &str) -> ActionResult<()> {
    compare(subject, sha256_hex(bytes), expected)
}
