//! Static file service.
//!
//! # Data Flow
//! ```text
//! subdir (path below the mount point)
//!     → sanitize.rs (canonicalize, confine to root)
//!     → directory: index.html, else listing.rs (when enabled), else 404
//!     → file: bytes + mime.rs content type
//! ```
//!
//! # Design Decisions
//! - Root is canonicalized once; every request path is canonicalized and
//!   must stay under it (symlinks included)
//! - Whole files are read into memory (no range requests, no streaming)
//! - Used standalone as a `Service`, or from a router handler via `serve`

pub mod listing;
pub mod mime;
pub mod sanitize;

use std::io;
use std::path::{Path, PathBuf};

use futures_util::future::BoxFuture;

pub use listing::listing_html;
pub use mime::content_type_for;
pub use sanitize::{sanitize_path, PathError};

use crate::config::ServerConfig;
use crate::http::{HttpResponse, Method, Request, Service, Status};

const INDEX_FILE: &str = "index.html";

/// Serves files below a root directory.
#[derive(Debug, Clone)]
pub struct StaticFiles {
    root: PathBuf,
    listing: bool,
}

impl StaticFiles {
    /// Fails when `root` does not exist or is not a directory.
    pub async fn new(root: impl AsRef<Path>) -> io::Result<Self> {
        let root = tokio::fs::canonicalize(root.as_ref()).await?;
        if !tokio::fs::metadata(&root).await?.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a directory", root.display()),
            ));
        }
        Ok(Self {
            root,
            listing: true,
        })
    }

    pub fn with_listing(mut self, listing: bool) -> Self {
        self.listing = listing;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn listing(&self) -> bool {
        self.listing
    }

    /// Whether the root has its own index page.
    pub async fn has_index(&self) -> bool {
        tokio::fs::metadata(self.root.join(INDEX_FILE))
            .await
            .is_ok_and(|meta| meta.is_file())
    }

    /// Response for the path `subdir` below the root.
    pub async fn serve(&self, subdir: &str) -> HttpResponse {
        self.serve_with(subdir, self.listing).await
    }

    async fn serve_with(&self, subdir: &str, listing: bool) -> HttpResponse {
        let path = match sanitize_path(&self.root, subdir).await {
            Ok(path) => path,
            Err(err) => return HttpResponse::new(err.status()),
        };

        let is_dir = match tokio::fs::metadata(&path).await {
            Ok(meta) => meta.is_dir(),
            Err(err) => return io_error_response(&path, err),
        };

        if !is_dir {
            return self.read_file(&path).await;
        }

        let index = path.join(INDEX_FILE);
        if tokio::fs::metadata(&index).await.is_ok_and(|meta| meta.is_file()) {
            return self.read_file(&index).await;
        }

        if !listing {
            return HttpResponse::new(Status::NOT_FOUND);
        }

        match listing_html(&self.root, &path).await {
            Ok(html) => HttpResponse::html(html),
            Err(err) => io_error_response(&path, err),
        }
    }

    async fn read_file(&self, path: &Path) -> HttpResponse {
        match tokio::fs::read(path).await {
            Ok(bytes) => HttpResponse::file(content_type_for(path), bytes),
            Err(err) => io_error_response(path, err),
        }
    }
}

fn io_error_response(path: &Path, err: io::Error) -> HttpResponse {
    match err.kind() {
        io::ErrorKind::NotFound => HttpResponse::new(Status::NOT_FOUND),
        io::ErrorKind::PermissionDenied => HttpResponse::new(Status::FORBIDDEN),
        _ => {
            tracing::error!(path = %path.display(), error = %err, "Failed to read from disk");
            HttpResponse::new(Status::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Standalone file server: GET only, listing follows the live config.
impl Service for StaticFiles {
    fn call<'a>(&'a self, request: Request, config: &'a ServerConfig) -> BoxFuture<'a, HttpResponse> {
        Box::pin(async move {
            if request.method != Method::Get {
                return HttpResponse::new(Status::METHOD_NOT_ALLOWED);
            }
            self.serve_with(request.path(), config.static_files.directory_listing)
                .await
        })
    }

    fn advertised_paths(&self) -> Vec<String> {
        vec!["/".to_string()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn scratch_files() -> (tempfile::TempDir, StaticFiles) {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::create_dir(dir.path().join("site")).await.unwrap();
        tokio::fs::write(dir.path().join("site/index.html"), "<h1>site</h1>").await.unwrap();
        tokio::fs::create_dir(dir.path().join("empty")).await.unwrap();
        tokio::fs::write(dir.path().join("style.css"), "body{}").await.unwrap();
        let files = StaticFiles::new(dir.path()).await.unwrap();
        (dir, files)
    }

    #[tokio::test]
    async fn test_new_rejects_missing_or_file_root() {
        let dir = tempfile::tempdir().unwrap();
        assert!(StaticFiles::new(dir.path().join("missing")).await.is_err());

        tokio::fs::write(dir.path().join("file"), "").await.unwrap();
        let err = StaticFiles::new(dir.path().join("file")).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn test_serves_files_with_content_type() {
        let (_dir, files) = scratch_files().await;
        let response = files.serve("style.css").await;
        assert_eq!(response.status, Status::OK);
        assert_eq!(response.content_type.as_deref(), Some("text/css; charset=utf-8"));
        assert_eq!(response.body, b"body{}");
    }

    #[tokio::test]
    async fn test_directory_prefers_index() {
        let (_dir, files) = scratch_files().await;
        let response = files.serve("site/").await;
        assert_eq!(response.body, b"<h1>site</h1>");
        assert_eq!(response.content_type.as_deref(), Some("text/html; charset=utf-8"));
        assert!(!files.has_index().await);
    }

    #[tokio::test]
    async fn test_listing_toggle() {
        let (_dir, files) = scratch_files().await;
        let listed = files.serve("empty").await;
        assert_eq!(listed.status, Status::OK);
        assert!(String::from_utf8(listed.body).unwrap().contains("Directory Listing for /empty/"));

        let files = files.with_listing(false);
        assert_eq!(files.serve("empty").await.status, Status::NOT_FOUND);
        assert_eq!(files.serve("site").await.status, Status::OK);
    }

    #[tokio::test]
    async fn test_missing_and_escaping_paths() {
        let (_dir, files) = scratch_files().await;
        assert_eq!(files.serve("nope").await.status, Status::NOT_FOUND);
        assert_eq!(files.serve("../").await.status, Status::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_service_accepts_only_get() {
        let (_dir, files) = scratch_files().await;
        let config = ServerConfig::default();

        let get = Request::parse(b"GET /style.css HTTP/1.1\r\n").unwrap();
        assert_eq!(files.call(get, &config).await.status, Status::OK);

        let post = Request::parse(b"POST /style.css HTTP/1.1\r\n").unwrap();
        assert_eq!(files.call(post, &config).await.status, Status::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_service_listing_follows_config() {
        let (_dir, files) = scratch_files().await;
        let mut config = ServerConfig::default();
        config.static_files.directory_listing = false;

        let request = Request::parse(b"GET /empty HTTP/1.1\r\n").unwrap();
        assert_eq!(files.call(request, &config).await.status, Status::NOT_FOUND);
    }
}
