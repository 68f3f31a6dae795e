//! # Middleware System
//!
//! Request/response interception for logging, timing and cache headers.

use crate::request::HttpRequest;
use crate::server::HttpResponse;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, info};

/// Middleware trait for request/response interception
///
/// Middlewares are called in order before the handler, and in reverse order after.
pub trait Middleware: Send + Sync {
    /// Called before the request handler
    ///
    /// Can inspect the request or return early with a response.
    fn before_request(&self, _req: &HttpRequest) -> MiddlewareResult {
        MiddlewareResult::Continue
    }

    /// Called after the request handler
    ///
    /// Can modify the response or perform logging.
    fn after_response(&self, _req: &HttpRequest, _res: &mut HttpResponse) {}

    /// Middleware name for logging
    fn name(&self) -> &'static str {
        "Unknown"
    }
}

/// Result of middleware execution
#[derive(Debug)]
pub enum MiddlewareResult {
    /// Continue to next middleware/handler
    Continue,
    /// Short-circuit with this response (skip handler)
    Respond(HttpResponse),
}

/// Middleware chain for processing requests
#[derive(Default, Clone)]
pub struct MiddlewareChain {
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareChain {
    /// Create a new empty middleware chain
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a middleware to the chain
    pub fn add<M: Middleware + 'static>(&mut self, middleware: M) {
        self.middlewares.push(Arc::new(middleware));
    }

    /// Execute `before_request` for all middlewares
    pub fn run_before(&self, req: &HttpRequest) -> MiddlewareResult {
        for mw in &self.middlewares {
            if let MiddlewareResult::Respond(res) = mw.before_request(req) {
                debug!(middleware = mw.name(), "Middleware short-circuited request");
                return MiddlewareResult::Respond(res);
            }
        }
        MiddlewareResult::Continue
    }

    /// Execute `after_response` for all middlewares (in reverse order)
    pub fn run_after(&self, req: &HttpRequest, res: &mut HttpResponse) {
        for mw in self.middlewares.iter().rev() {
            mw.after_response(req, res);
        }
    }

    /// Get the number of middlewares
    #[must_use]
    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    /// Check if chain is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }
}

/// Logging middleware - structured request/response events
#[derive(Default)]
pub struct LoggingMiddleware;

impl LoggingMiddleware {
    /// Create a new logging middleware
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Middleware for LoggingMiddleware {
    fn before_request(&self, req: &HttpRequest) -> MiddlewareResult {
        let request_id = req.header("x-request-id").unwrap_or("-");
        info!(
            method = %req.method,
            path = %req.path,
            request_id = %request_id,
            "Request received"
        );
        MiddlewareResult::Continue
    }

    fn after_response(&self, req: &HttpRequest, res: &mut HttpResponse) {
        let request_id = req.header("x-request-id").unwrap_or("-");
        info!(
            method = %req.method,
            path = %req.path,
            status = res.status,
            request_id = %request_id,
            "Response sent"
        );
    }

    fn name(&self) -> &'static str {
        "LoggingMiddleware"
    }
}

/// Timing middleware - measures request duration
///
/// Start times are keyed by `x-request-id`, which the server assigns before
/// the chain runs.
#[derive(Default)]
pub struct TimingMiddleware {
    start_times: Mutex<HashMap<String, Instant>>,
}

impl TimingMiddleware {
    /// Create a new timing middleware
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn key(req: &HttpRequest) -> String {
        req.header("x-request-id")
            .map_or_else(|| format!("{}:{}", req.method, req.path), str::to_string)
    }

    /// Number of requests currently being timed
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.start_times.lock().map_or(0, |times| times.len())
    }
}

impl Middleware for TimingMiddleware {
    fn before_request(&self, req: &HttpRequest) -> MiddlewareResult {
        if let Ok(mut times) = self.start_times.lock() {
            times.insert(Self::key(req), Instant::now());
        }
        MiddlewareResult::Continue
    }

    fn after_response(&self, req: &HttpRequest, _res: &mut HttpResponse) {
        let started = self
            .start_times
            .lock()
            .ok()
            .and_then(|mut times| times.remove(&Self::key(req)));
        if let Some(start) = started {
            debug!(
                method = %req.method,
                path = %req.path,
                duration_ms = %start.elapsed().as_millis(),
                "Request timing"
            );
        }
    }

    fn name(&self) -> &'static str {
        "TimingMiddleware"
    }
}

/// Disables client and proxy caching on every response
#[derive(Default, Clone, Copy)]
pub struct NoCacheMiddleware;

impl NoCacheMiddleware {
    /// Create a new no-cache middleware
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Middleware for NoCacheMiddleware {
    fn after_response(&self, _req: &HttpRequest, res: &mut HttpResponse) {
        res.set_header(
            "Cache-Control",
            "no-store, no-cache, must-revalidate, proxy-revalidate",
        );
        res.set_header("Pragma", "no-cache");
        res.set_header("Expires", "0");
        res.set_header("Surrogate-Control", "no-store");
    }

    fn name(&self) -> &'static str {
        "NoCacheMiddleware"
    }
}
