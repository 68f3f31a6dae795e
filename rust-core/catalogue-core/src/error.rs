//! # Error Handling
//!
//! Centralized error types for the catalogue core.
//! Uses `thiserror` for ergonomic error definitions.

use thiserror::Error;

/// Result type alias for catalogue core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for the catalogue runtime
#[derive(Error, Debug)]
pub enum Error {
    /// Server failed to bind to the specified address
    #[error("Failed to bind server to {address}: {source}")]
    BindError {
        /// The address we tried to bind to
        address: String,
        /// The underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Router failed to match the requested path
    #[error("No route found for path: {path}")]
    RouteNotFound {
        /// The path that wasn't matched
        path: String,
    },

    /// Invalid route pattern provided
    #[error("Invalid route pattern: {pattern}: {reason}")]
    InvalidRoutePattern {
        /// The invalid pattern
        pattern: String,
        /// Reason for invalidity
        reason: String,
    },

    /// HTTP protocol error
    #[error("HTTP error: {0}")]
    Http(#[from] hyper::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// JSON document could not be parsed
    #[error("Invalid JSON: {reason}")]
    InvalidJson {
        /// Parser message
        reason: String,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Database error
    #[error("Database error: {message}")]
    Database {
        /// Error message from database
        message: String,
    },

    /// Request body stream failed before it was fully read
    #[error("Failed to read request body: {reason}")]
    BodyRead {
        /// Underlying stream error
        reason: String,
    },

    /// Request payload too large
    #[error("Payload too large: limit={limit} bytes, received={actual} bytes")]
    PayloadTooLarge {
        /// Max allowed size
        limit: usize,
        /// Actual size
        actual: usize,
    },

    /// Column schema declares a type tag the projector does not know
    #[error("Unknown column type '{tag}' for column '{column}' (expected number, string, boolean or date)")]
    UnknownColumnType {
        /// Column the tag was declared for
        column: String,
        /// The unrecognised tag
        tag: String,
    },
}
