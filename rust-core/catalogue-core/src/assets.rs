//! # Static Files
//!
//! Serves files from a directory for requests no route claimed.

use crate::server::HttpResponse;
use hyper::body::Bytes;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// A directory of static assets
#[derive(Debug, Clone)]
pub struct StaticFiles {
    root: PathBuf,
}

impl StaticFiles {
    /// Serve files below `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory files are served from
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a request path to a file below the root
    ///
    /// Rejects anything that would step outside the root. A trailing `/`
    /// maps to `index.html`.
    #[must_use]
    pub fn resolve(&self, request_path: &str) -> Option<PathBuf> {
        let relative = request_path.trim_start_matches('/');
        let mut resolved = self.root.clone();
        for component in Path::new(relative).components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
            }
        }
        if relative.is_empty() || relative.ends_with('/') {
            resolved.push("index.html");
        }
        Some(resolved)
    }

    /// Load the file for a request path
    ///
    /// Returns `None` when the path is rejected or no regular file exists.
    pub async fn load(&self, request_path: &str) -> Option<HttpResponse> {
        let path = self.resolve(request_path)?;
        let metadata = tokio::fs::metadata(&path).await.ok()?;
        if !metadata.is_file() {
            return None;
        }
        match tokio::fs::read(&path).await {
            Ok(contents) => Some(
                HttpResponse::bytes(Bytes::from(contents))
                    .with_header("Content-Type", content_type(&path)),
            ),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Static file unreadable");
                None
            }
        }
    }
}

/// Content type for a file, by extension
#[must_use]
pub fn content_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js" | "mjs") => "text/javascript; charset=utf-8",
        Some("json") => "application/json",
        Some("txt") => "text/plain; charset=utf-8",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("ico") => "image/x-icon",
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("catalogue-assets-{name}-{}", std::process::id()));
        std::fs::create_dir_all(dir.join("css")).unwrap();
        dir
    }

    #[test]
    fn test_resolve_rejects_parent_segments() {
        let files = StaticFiles::new("/srv/public");
        assert!(files.resolve("/../etc/passwd").is_none());
        assert!(files.resolve("/css/../../secret").is_none());
    }

    #[test]
    fn test_resolve_maps_paths() {
        let files = StaticFiles::new("/srv/public");
        assert_eq!(
            files.resolve("/css/site.css"),
            Some(PathBuf::from("/srv/public/css/site.css"))
        );
        assert_eq!(
            files.resolve("/"),
            Some(PathBuf::from("/srv/public/index.html"))
        );
    }

    #[test]
    fn test_content_type() {
        assert_eq!(content_type(Path::new("a/site.CSS")), "text/css; charset=utf-8");
        assert_eq!(content_type(Path::new("logo.png")), "image/png");
        assert_eq!(content_type(Path::new("blob")), "application/octet-stream");
    }

    #[tokio::test]
    async fn test_load_existing_file() {
        let dir = scratch_dir("load");
        std::fs::write(dir.join("css/site.css"), "body { margin: 0 }").unwrap();
        let files = StaticFiles::new(&dir);

        let res = files.load("/css/site.css").await.unwrap();
        assert_eq!(res.status, 200);
        assert_eq!(res.content_type, "text/css; charset=utf-8");
        assert_eq!(res.body_str(), Some("body { margin: 0 }"));

        assert!(files.load("/css/missing.css").await.is_none());
        assert!(files.load("/css").await.is_none());

        std::fs::remove_dir_all(dir).ok();
    }
}
