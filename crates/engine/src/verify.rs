// crates/engine/src/verify.rs
//! Post-download verification

use chrono::{DateTime, Utc};
use driftsync_backend::local::file_checksum;
use driftsync_core::{timestamps_equal, VerifyPolicy, VerifyResult};
use std::path::Path;

/// Confirms a downloaded file matches the expected metadata under the
/// given policy.
///
/// Checks build on each other: `SizeAndMtime` implies the size check,
/// `Full` implies both plus a content checksum when one is expected.
/// Expected values the source side never reported are skipped rather
/// than failed.
pub async fn verify_local_transfer(
    local_path: &Path,
    expected_size: u64,
    expected_mtime: Option<DateTime<Utc>>,
    expected_checksum: Option<&str>,
    policy: VerifyPolicy,
) -> VerifyResult {
    if !policy.is_enabled() {
        return VerifyResult::pass();
    }

    let metadata = match tokio::fs::metadata(local_path).await {
        Ok(m) => m,
        Err(e) => {
            return VerifyResult::fail(format!(
                "cannot stat {}: {}",
                local_path.display(),
                e
            ))
        }
    };

    if metadata.len() != expected_size {
        return VerifyResult::fail(format!(
            "size mismatch: expected {} bytes, found {}",
            expected_size,
            metadata.len()
        ));
    }

    if matches!(policy, VerifyPolicy::SizeAndMtime | VerifyPolicy::Full) {
        if let Some(expected) = expected_mtime {
            let actual = metadata.modified().ok().map(DateTime::<Utc>::from);
            if !timestamps_equal(actual, Some(expected)) {
                return VerifyResult::fail(format!(
                    "mtime mismatch: expected {}, found {:?}",
                    expected, actual
                ));
            }
        }
    }

    if policy == VerifyPolicy::Full {
        if let Some(expected) = expected_checksum {
            match file_checksum(local_path) {
                Ok(actual) if actual == expected => {}
                Ok(actual) => {
                    return VerifyResult::fail(format!(
                        "checksum mismatch: expected {}, found {}",
                        expected, actual
                    ))
                }
                Err(e) => {
                    return VerifyResult::fail(format!("cannot checksum: {}", e));
                }
            }
        }
    }

    VerifyResult::pass()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn write_file(dir: &TempDir, name: &str, contents: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        tokio::fs::write(&path, contents).await.expect("write");
        path
    }

    #[tokio::test]
    async fn test_policy_none_always_passes() {
        let result = verify_local_transfer(
            Path::new("/nonexistent"),
            0,
            None,
            None,
            VerifyPolicy::None,
        )
        .await;
        assert!(result.passed);
    }

    #[tokio::test]
    async fn test_size_only_pass_and_fail() {
        let tmp = TempDir::new().expect("tempdir");
        let path = write_file(&tmp, "a.txt", b"12345").await;

        let ok = verify_local_transfer(&path, 5, None, None, VerifyPolicy::SizeOnly).await;
        assert!(ok.passed);

        let bad = verify_local_transfer(&path, 7, None, None, VerifyPolicy::SizeOnly).await;
        assert!(!bad.passed);
        assert!(bad.message.contains("size mismatch"));
    }

    #[tokio::test]
    async fn test_missing_file_fails() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp.path().join("gone.txt");
        let result =
            verify_local_transfer(&path, 5, None, None, VerifyPolicy::SizeOnly).await;
        assert!(!result.passed);
    }

    #[tokio::test]
    async fn test_size_and_mtime_within_tolerance() {
        let tmp = TempDir::new().expect("tempdir");
        let path = write_file(&tmp, "a.txt", b"12345").await;

        // The file was just written, so "now" is within tolerance
        let result = verify_local_transfer(
            &path,
            5,
            Some(Utc::now()),
            None,
            VerifyPolicy::SizeAndMtime,
        )
        .await;
        assert!(result.passed);
    }

    #[tokio::test]
    async fn test_mtime_out_of_tolerance_fails() {
        let tmp = TempDir::new().expect("tempdir");
        let path = write_file(&tmp, "a.txt", b"12345").await;

        let stale = Utc::now() - chrono::Duration::hours(2);
        let result =
            verify_local_transfer(&path, 5, Some(stale), None, VerifyPolicy::SizeAndMtime)
                .await;
        assert!(!result.passed);
        assert!(result.message.contains("mtime"));
    }

    #[tokio::test]
    async fn test_full_checks_checksum() {
        let tmp = TempDir::new().expect("tempdir");
        let path = write_file(&tmp, "a.txt", b"hello").await;
        let good = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

        let result =
            verify_local_transfer(&path, 5, None, Some(good), VerifyPolicy::Full).await;
        assert!(result.passed);

        let result =
            verify_local_transfer(&path, 5, None, Some("deadbeef"), VerifyPolicy::Full).await;
        assert!(!result.passed);
        assert!(result.message.contains("checksum"));
    }

    #[tokio::test]
    async fn test_missing_expected_values_are_skipped() {
        let tmp = TempDir::new().expect("tempdir");
        let path = write_file(&tmp, "a.txt", b"12345").await;

        // No expected mtime or checksum reported by the source side
        let result = verify_local_transfer(&path, 5, None, None, VerifyPolicy::Full).await;
        assert!(result.passed);
    }
}
