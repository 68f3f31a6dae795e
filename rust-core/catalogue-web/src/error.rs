//! # Error Handling
//!
//! Errors raised while assembling and serving the site.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for the web layer
pub type Result<T> = std::result::Result<T, WebError>;

/// Web layer error types
#[derive(Error, Debug)]
pub enum WebError {
    /// Error from the core runtime (database, projection, server)
    #[error(transparent)]
    Core(#[from] catalogue_core::Error),

    /// A template failed to compile
    #[error("Template error: {0}")]
    Template(#[from] handlebars::TemplateError),

    /// A template failed to render
    #[error("Render error: {0}")]
    Render(#[from] handlebars::RenderError),

    /// The views directory couldn't be read
    #[error("Failed to read templates from {path}: {source}")]
    TemplateDir {
        /// Directory being read
        path: PathBuf,
        /// The underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Configuration file couldn't be read or parsed
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Host and port don't form a socket address
    #[error("Invalid listen address {address}: {reason}")]
    Address {
        /// The host:port that failed to parse
        address: String,
        /// Parser message
        reason: String,
    },

    /// The common data document couldn't be loaded
    #[error("Failed to load common data from {path}: {source}")]
    CommonData {
        /// Document path
        path: PathBuf,
        /// The underlying core error
        #[source]
        source: catalogue_core::Error,
    },
}

impl From<toml::de::Error> for WebError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_error_is_transparent() {
        let err: WebError = catalogue_core::Error::Database {
            message: "connection refused".to_string(),
        }
        .into();
        assert_eq!(err.to_string(), "Database error: connection refused");
    }

    #[test]
    fn test_toml_error_conversion() {
        let parsed: std::result::Result<toml::Value, _> = toml::from_str("port = ");
        let err: WebError = parsed.unwrap_err().into();
        assert!(matches!(err, WebError::Config(_)));
    }
}
