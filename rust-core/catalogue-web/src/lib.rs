//! # Catalogue Web
//!
//! Server-rendered browser for the sakila movie-rental catalogue.
//!
//! ## Modules
//!
//! - `config` - TOML configuration with environment overrides
//! - `cli` - Command line flags
//! - `templates` - Handlebars registry and helpers
//! - `state` - Shared state handed to page handlers
//! - `pages` - Page queries, schemas and handlers
//! - `error` - Error types and handling

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod cli;
pub mod config;
pub mod error;
pub mod pages;
pub mod state;
pub mod templates;

pub use cli::Cli;
pub use config::AppConfig;
pub use error::{Result, WebError};
pub use pages::{register_pages, Page, PageQuery, PAGES};
pub use state::{AppState, CommonData};
pub use templates::Templates;
