//! Content integrity verification using SHA-256 checksums
//!
//! Downloaded assets are verified against the server-declared checksum
//! before they are promoted into the good cache. Files are hashed in
//! chunks so large videos never have to fit in memory.

use std::io;
use std::path::Path;

use ring::digest::{Context, SHA256};
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

const CHECKSUM_PREFIX: &str = "sha256:";
const READ_CHUNK: usize = 64 * 1024;

/// Compute SHA-256 checksum of in-memory content
///
/// # Returns
/// Checksum string in format "sha256:hexstring"
///
/// # Example
/// ```
/// use atlas_core::cache::checksum_bytes;
///
/// let checksum = checksum_bytes(b"hello world");
/// assert!(checksum.starts_with("sha256:"));
/// ```
pub fn checksum_bytes(data: &[u8]) -> String {
    let mut context = Context::new(&SHA256);
    context.update(data);
    format_digest(context)
}

/// Compute SHA-256 checksum of a file's full contents
pub async fn compute_checksum(path: &Path) -> Result<String, IntegrityError> {
    let mut file = File::open(path).await?;
    let mut context = Context::new(&SHA256);
    let mut buf = vec![0u8; READ_CHUNK];

    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        context.update(&buf[..n]);
    }

    Ok(format_digest(context))
}

/// Verify a file against an expected checksum
///
/// An absent or empty `expected` passes: assets without a checksum are
/// trusted as-is. A mismatch is reported as `Ok(false)`, the caller decides
/// what to do with the file.
pub async fn verify_checksum(path: &Path, expected: Option<&str>) -> Result<bool, IntegrityError> {
    let Some(expected) = expected.filter(|e| !e.is_empty()) else {
        return Ok(true);
    };

    let actual = compute_checksum(path).await?;
    let matches = checksums_match(expected, &actual);
    if !matches {
        tracing::warn!(
            path = %path.display(),
            expected,
            actual = %actual,
            "checksum mismatch"
        );
    }
    Ok(matches)
}

/// Compare two "sha256:hex" strings, ignoring hex case.
pub fn checksums_match(expected: &str, actual: &str) -> bool {
    match (
        expected.strip_prefix(CHECKSUM_PREFIX),
        actual.strip_prefix(CHECKSUM_PREFIX),
    ) {
        (Some(e), Some(a)) => e.eq_ignore_ascii_case(a),
        _ => false,
    }
}

fn format_digest(context: Context) -> String {
    let digest = context.finish();
    format!("{}{}", CHECKSUM_PREFIX, hex::encode(digest.as_ref()))
}

/// Errors that can occur during integrity verification
#[derive(Debug, Error)]
pub enum IntegrityError {
    /// The file could not be read
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}
