//! Filesystem utilities for destination folders.
//!
//! Folder writability is checked with a real test write rather than by
//! inspecting permission bits, so ACLs, read-only mounts and quotas are all
//! covered.

use std::path::Path;
use std::str::FromStr;

use tokio::fs;
use tracing::debug;

use crate::error::{MediaError, MediaResult};

/// Name of the test file written into the destination folder.
pub const WRITE_TEST_FILE_NAME: &str = "temp_write_test.txt";

/// What to do when the destination folder does not exist yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FolderPolicy {
    /// The folder must already exist and be writable.
    #[default]
    RequireExisting,
    /// Create the folder (and parents) first, then test it.
    CreateMissing,
}

impl FromStr for FolderPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "require-existing" | "require_existing" => Ok(FolderPolicy::RequireExisting),
            "create-missing" | "create_missing" => Ok(FolderPolicy::CreateMissing),
            other => Err(format!("unknown folder policy: {}", other)),
        }
    }
}

/// Verify that the process can write into `folder`.
///
/// Writes and removes a small test file. Under
/// [`FolderPolicy::CreateMissing`] the folder is created first.
///
/// # Errors
///
/// - [`MediaError::FolderNotWritable`] if the test file cannot be written
///   (including a missing folder under [`FolderPolicy::RequireExisting`])
/// - [`MediaError::WriteTestCleanup`] if the test file cannot be removed
pub async fn ensure_writable(folder: impl AsRef<Path>, policy: FolderPolicy) -> MediaResult<()> {
    let folder = folder.as_ref();

    if policy == FolderPolicy::CreateMissing {
        fs::create_dir_all(folder)
            .await
            .map_err(|source| MediaError::FolderNotWritable {
                path: folder.to_path_buf(),
                source,
            })?;
    }

    let test_file = folder.join(WRITE_TEST_FILE_NAME);

    fs::write(&test_file, b"test")
        .await
        .map_err(|source| MediaError::FolderNotWritable {
            path: folder.to_path_buf(),
            source,
        })?;

    fs::remove_file(&test_file)
        .await
        .map_err(|source| MediaError::WriteTestCleanup {
            path: test_file.clone(),
            source,
        })?;

    debug!(folder = %folder.display(), "Destination folder is writable");
    Ok(())
}

/// Remove a partially written output file (best effort).
pub async fn discard_partial_output(path: &Path) {
    match fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "Removed partial output"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(
            "Failed to remove partial output {}: {}",
            path.display(),
            e
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_writable_folder_passes_and_leaves_no_test_file() {
        let dir = TempDir::new().unwrap();

        ensure_writable(dir.path(), FolderPolicy::RequireExisting)
            .await
            .unwrap();

        assert!(!dir.path().join(WRITE_TEST_FILE_NAME).exists());
    }

    #[tokio::test]
    async fn test_missing_folder_fails_when_required() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");

        let err = ensure_writable(&missing, FolderPolicy::RequireExisting)
            .await
            .unwrap_err();

        assert!(matches!(err, MediaError::FolderNotWritable { .. }));
        assert!(err.is_permission_error());
        assert_eq!(err.to_string(), "Folder is not writable");
        assert!(!missing.exists());
    }

    #[tokio::test]
    async fn test_missing_folder_created_when_allowed() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");

        ensure_writable(&nested, FolderPolicy::CreateMissing)
            .await
            .unwrap();

        assert!(nested.is_dir());
        assert!(!nested.join(WRITE_TEST_FILE_NAME).exists());
    }

    #[tokio::test]
    async fn test_file_path_is_not_a_writable_folder() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("plain.txt");
        fs::write(&file, b"x").await.unwrap();

        let err = ensure_writable(&file, FolderPolicy::RequireExisting)
            .await
            .unwrap_err();
        assert!(err.is_permission_error());
    }

    #[tokio::test]
    async fn test_discard_partial_output() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("partial.mp4");
        fs::write(&out, b"half").await.unwrap();

        discard_partial_output(&out).await;
        assert!(!out.exists());

        // Missing file is not an error
        discard_partial_output(&out).await;
    }

    #[test]
    fn test_folder_policy_from_str() {
        assert_eq!("create-missing".parse::<FolderPolicy>().unwrap(), FolderPolicy::CreateMissing);
        assert_eq!("REQUIRE_EXISTING".parse::<FolderPolicy>().unwrap(), FolderPolicy::RequireExisting);
        assert!("sometimes".parse::<FolderPolicy>().is_err());
    }
}
