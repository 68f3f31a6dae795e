//! # Catalogue Core
//!
//! Core runtime library for the rental catalogue.
//! Provides the HTTP server, routing, SQL access and typed row projection.
//!
//! ## Architecture
//!
//! Pages run a fixed query through a [`QueryExecutor`], project the raw rows
//! through a [`ColumnSchema`] into [`ProjectedRecord`]s and hand those to a
//! renderer. The executor is a trait so tests can stand in for the database.
//!
//! ## Modules
//!
//! - `server` - HTTP server built on Hyper
//! - `router` - Routing using matchit (radix trie)
//! - `request` - HTTP request wrapper with headers and query parsing
//! - `middleware` - Request/response middleware system
//! - `assets` - Static file serving
//! - `json` - JSON parsing with simd-json
//! - `database` - SQLx database connectivity (MySQL, PostgreSQL, SQLite)
//! - `types` - Column types and projected values
//! - `projection` - Row projection and auditing
//! - `validation` - Structured validation errors
//! - `error` - Error types and handling

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod assets;
pub mod database;
pub mod error;
pub mod json;
pub mod middleware;
pub mod projection;
pub mod request;
pub mod router;
pub mod server;
pub mod types;
pub mod validation;

pub use assets::StaticFiles;
pub use database::{DatabasePool, DbValue, QueryExecutor, RawRow};
pub use error::{Error, Result};
pub use json::{parse_json, to_json};
pub use middleware::{
    LoggingMiddleware, Middleware, MiddlewareChain, NoCacheMiddleware, TimingMiddleware,
};
pub use projection::{
    audit, project, project_row, project_strict, project_tagged, ColumnSchema, ProjectedRecord,
};
pub use request::HttpRequest;
pub use router::{Match, Method, Router};
pub use server::{handler, Handler, HttpResponse, Server, ServerConfig};
pub use types::{ColumnType, ProjectedValue};
pub use validation::{FieldError, ValidationCode, ValidationErrors, ValidationResult};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
