//! # Application State
//!
//! Everything a page handler needs, built once in `main` and cloned into
//! each handler. Holds no globals.

use crate::error::{Result, WebError};
use crate::templates::Templates;
use catalogue_core::json::read_json_file;
use catalogue_core::QueryExecutor;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Site-wide document merged into every page under `common`
#[derive(Debug, Clone)]
pub enum CommonData {
    /// Loaded once at startup
    Cached(Value),
    /// Re-read from disk on every request
    Live(PathBuf),
}

impl CommonData {
    /// Load the document at `path` now and keep it
    ///
    /// # Errors
    ///
    /// Returns `WebError::CommonData` if the file is missing or not JSON
    pub async fn cached(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::Cached(read_document(path.as_ref()).await?))
    }

    /// Read the document at `path` on every request
    pub fn live(path: impl Into<PathBuf>) -> Self {
        Self::Live(path.into())
    }

    /// Current document
    ///
    /// # Errors
    ///
    /// Returns `WebError::CommonData` if a live document can't be read
    pub async fn get(&self) -> Result<Value> {
        match self {
            Self::Cached(value) => Ok(value.clone()),
            Self::Live(path) => read_document(path).await,
        }
    }
}

async fn read_document(path: &Path) -> Result<Value> {
    read_json_file(path)
        .await
        .map_err(|source| WebError::CommonData {
            path: path.to_path_buf(),
            source,
        })
}

/// Shared state handed to page handlers
#[derive(Clone)]
pub struct AppState {
    /// Runs page queries
    pub executor: Arc<dyn QueryExecutor>,
    /// Renders pages
    pub templates: Arc<Templates>,
    /// Document merged into every page
    pub common: Arc<CommonData>,
}

impl AppState {
    /// Bundle the page dependencies
    pub fn new(executor: Arc<dyn QueryExecutor>, templates: Templates, common: CommonData) -> Self {
        Self {
            executor,
            templates: Arc::new(templates),
            common: Arc::new(common),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scratch_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("catalogue-common-{name}-{}.json", std::process::id()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[tokio::test]
    async fn test_cached_document_is_read_once() {
        let path = scratch_file("cached", r#"{"title": "Sakila"}"#);
        let common = CommonData::cached(&path).await.unwrap();

        std::fs::write(&path, r#"{"title": "Changed"}"#).unwrap();
        assert_eq!(common.get().await.unwrap(), json!({"title": "Sakila"}));

        std::fs::remove_file(path).ok();
    }

    #[tokio::test]
    async fn test_live_document_follows_the_file() {
        let path = scratch_file("live", r#"{"title": "Sakila"}"#);
        let common = CommonData::live(&path);
        assert_eq!(common.get().await.unwrap(), json!({"title": "Sakila"}));

        std::fs::write(&path, r#"{"title": "Changed"}"#).unwrap();
        assert_eq!(common.get().await.unwrap(), json!({"title": "Changed"}));

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_missing_document() {
        let result = tokio_test::block_on(CommonData::cached("/nonexistent/common.json"));
        assert!(matches!(result, Err(WebError::CommonData { .. })));
    }

    #[test]
    fn test_invalid_document() {
        let path = scratch_file("invalid", "{ not json");
        let common = CommonData::live(&path);
        let result = tokio_test::block_on(common.get());
        assert!(matches!(result, Err(WebError::CommonData { .. })));
        std::fs::remove_file(path).ok();
    }
}
