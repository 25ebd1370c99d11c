// tapkit-net/src/validation.rs
use std::fs::File;
use std::io;
use std::path::Path;

use sha2::{Digest, Sha256};
use tapkit_common::error::{Result, TapkitError};
use url::Url;

/// Hex-encoded SHA-256 of a file's contents.
pub fn compute_sha256(path: &Path) -> Result<String> {
    let file = File::open(path)?;
    let mut reader = io::BufReader::new(file);
    let mut hasher = Sha256::new();
    let bytes_copied = io::copy(&mut reader, &mut hasher)?;
    let actual = hex::encode(hasher.finalize());
    tracing::debug!(
        "Calculated SHA256 of {}: {} ({} bytes read)",
        path.display(),
        actual,
        bytes_copied
    );
    Ok(actual)
}

pub fn verify_checksum(path: &Path, expected: &str) -> Result<()> {
    tracing::debug!("Verifying checksum for: {}", path.display());
    let actual = compute_sha256(path)?;
    tracing::debug!("Expected SHA256:   {}", expected);
    if actual.eq_ignore_ascii_case(expected) {
        Ok(())
    } else {
        Err(TapkitError::ChecksumError(format!(
            "Checksum mismatch for {}: expected {}, got {}",
            path.display(),
            expected,
            actual
        )))
    }
}

/// Validates a URL, ensuring it uses the HTTPS scheme.
pub fn validate_url(url_str: &str) -> Result<()> {
    let url = Url::parse(url_str)
        .map_err(|e| TapkitError::ValidationError(format!("Failed to parse URL '{url_str}': {e}")))?;
    if url.scheme() == "https" {
        Ok(())
    } else {
        Err(TapkitError::ValidationError(format!(
            "Invalid URL scheme for '{}': Must be https, but got '{}'",
            url_str,
            url.scheme()
        )))
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    // sha256("hello world")
    const HELLO_SHA: &str = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

    #[test]
    fn checksum_matches_regardless_of_case() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("hello.txt");
        fs::write(&path, b"hello world").unwrap();

        assert_eq!(compute_sha256(&path).unwrap(), HELLO_SHA);
        verify_checksum(&path, HELLO_SHA).unwrap();
        verify_checksum(&path, &HELLO_SHA.to_ascii_uppercase()).unwrap();
    }

    #[test]
    fn corrupted_file_fails_verification() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("hello.txt");
        fs::write(&path, b"hello world!").unwrap();

        let err = verify_checksum(&path, HELLO_SHA).unwrap_err();
        assert!(matches!(err, TapkitError::ChecksumError(_)));
        assert!(err.to_string().contains(HELLO_SHA));
    }

    #[test]
    fn only_https_urls_are_accepted() {
        validate_url("https://github.com/raymonepping/homebrew-docker-janitor-cli").unwrap();
        assert!(validate_url("http://example.com/a.tar.gz").is_err());
        assert!(validate_url("not a url").is_err());
    }
}
