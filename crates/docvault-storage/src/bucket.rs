//! Bucket name validation shared by all backends.
//!
//! S3/MinIO bucket naming rules: 3-63 characters, lowercase letters, digits
//! and hyphens, starting and ending with a letter or digit. Underscores are
//! rejected by the gateway and surface to the caller as a bad request.

use crate::traits::{StorageError, StorageResult};

pub fn validate_bucket_name(name: &str) -> StorageResult<()> {
    if name.len() < 3 || name.len() > 63 {
        return Err(StorageError::InvalidBucketName(format!(
            "'{}': length must be between 3 and 63 characters",
            name
        )));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(StorageError::InvalidBucketName(format!(
            "'{}': only lowercase letters, digits and hyphens are allowed",
            name
        )));
    }
    let first = name.chars().next().unwrap_or('-');
    let last = name.chars().last().unwrap_or('-');
    if first == '-' || last == '-' {
        return Err(StorageError::InvalidBucketName(format!(
            "'{}': must start and end with a letter or digit",
            name
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        for name in ["documents", "doc-vault-1", "a1b", "x".repeat(63).as_str()] {
            assert!(validate_bucket_name(name).is_ok(), "{}", name);
        }
    }

    #[test]
    fn test_rejects_underscores_and_case() {
        assert!(validate_bucket_name("doc_vault").is_err());
        assert!(validate_bucket_name("DocVault").is_err());
    }

    #[test]
    fn test_rejects_bad_length_and_edges() {
        assert!(validate_bucket_name("ab").is_err());
        assert!(validate_bucket_name(&"x".repeat(64)).is_err());
        assert!(validate_bucket_name("-docs").is_err());
        assert!(validate_bucket_name("docs-").is_err());
    }
}
