//! Confining request paths to the served root.

use std::path::{Path, PathBuf};

use crate::http::Status;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// Nothing at the path, or it could not be resolved.
    #[error("path does not exist")]
    NotFound,
    /// The path resolves outside the root.
    #[error("path escapes the served root")]
    Escape,
}

impl PathError {
    pub fn status(&self) -> Status {
        match self {
            PathError::NotFound => Status::NOT_FOUND,
            PathError::Escape => Status::FORBIDDEN,
        }
    }
}

/// Resolve `relative` below `root`.
///
/// `root` must already be canonical. The joined path is canonicalized, so
/// `..` segments and symlinks are followed before the containment check.
pub async fn sanitize_path(root: &Path, relative: &str) -> Result<PathBuf, PathError> {
    let joined = root.join(relative.trim_start_matches('/'));

    let resolved = tokio::fs::canonicalize(&joined)
        .await
        .map_err(|_| PathError::NotFound)?;

    if !resolved.starts_with(root) {
        tracing::warn!(requested = %relative, resolved = %resolved.display(), "Path escapes root");
        return Err(PathError::Escape);
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn scratch_root() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let root = tokio::fs::canonicalize(dir.path()).await.unwrap();
        tokio::fs::create_dir(root.join("sub")).await.unwrap();
        tokio::fs::write(root.join("sub/a.txt"), "a").await.unwrap();
        (dir, root)
    }

    #[tokio::test]
    async fn test_paths_inside_root() {
        let (_dir, root) = scratch_root().await;

        assert_eq!(sanitize_path(&root, "").await, Ok(root.clone()));
        assert_eq!(sanitize_path(&root, "/").await, Ok(root.clone()));
        assert_eq!(sanitize_path(&root, "sub/a.txt").await, Ok(root.join("sub/a.txt")));
        assert_eq!(sanitize_path(&root, "sub/../sub/./a.txt").await, Ok(root.join("sub/a.txt")));
        assert_eq!(sanitize_path(&root, "sub/..").await, Ok(root.clone()));
    }

    #[tokio::test]
    async fn test_missing_path() {
        let (_dir, root) = scratch_root().await;
        assert_eq!(sanitize_path(&root, "nope.txt").await, Err(PathError::NotFound));
        assert_eq!(sanitize_path(&root, "sub/a.txt/deeper").await, Err(PathError::NotFound));
    }

    #[tokio::test]
    async fn test_parent_traversal_is_rejected() {
        let (_dir, root) = scratch_root().await;
        let outside = sanitize_path(&root, "..").await;
        assert_eq!(outside, Err(PathError::Escape));
        assert_eq!(outside.unwrap_err().status(), Status::FORBIDDEN);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlink_out_of_root_is_rejected() {
        let (_dir, root) = scratch_root().await;
        let elsewhere = tempfile::tempdir().unwrap();
        std::fs::write(elsewhere.path().join("secret.txt"), "s").unwrap();
        std::os::unix::fs::symlink(elsewhere.path(), root.join("link")).unwrap();

        assert_eq!(sanitize_path(&root, "link/secret.txt").await, Err(PathError::Escape));
    }
}
