//! # Router
//!
//! Radix-trie based router using `matchit`, one trie per HTTP method.
//!
//! Supports path parameters (`/films/{id}`) and catch-alls (`/assets/{*path}`).

use crate::error::{Error, Result};
use matchit::Router as MatchitRouter;
use std::collections::HashMap;

/// HTTP methods supported by the router
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// HTTP GET
    Get,
    /// HTTP POST
    Post,
    /// HTTP PUT
    Put,
    /// HTTP DELETE
    Delete,
    /// HTTP PATCH
    Patch,
    /// HTTP HEAD
    Head,
    /// HTTP OPTIONS
    Options,
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
            Self::Put => write!(f, "PUT"),
            Self::Delete => write!(f, "DELETE"),
            Self::Patch => write!(f, "PATCH"),
            Self::Head => write!(f, "HEAD"),
            Self::Options => write!(f, "OPTIONS"),
        }
    }
}

/// Route handler identifier
pub type HandlerId = usize;

/// Matched route with extracted parameters
#[derive(Debug)]
pub struct Match<'a> {
    /// The handler ID for this route
    pub handler_id: HandlerId,
    /// Extracted path parameters
    pub params: HashMap<&'a str, &'a str>,
}

impl<'a> Match<'a> {
    /// Get a path parameter by name
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&'a str> {
        self.params.get(name).copied()
    }
}

/// HTTP router keyed by method
#[derive(Clone, Default)]
pub struct Router {
    /// Per-method routers for efficient matching
    method_routes: HashMap<Method, MatchitRouter<HandlerId>>,
    /// Counter for generating handler IDs
    next_handler_id: HandlerId,
}

impl Router {
    /// Create a new empty router
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a route with the given method and path pattern
    ///
    /// Handler IDs are handed out sequentially across all methods, starting
    /// at zero.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidRoutePattern` if the pattern is malformed or
    /// conflicts with an existing route
    pub fn add_route(&mut self, method: Method, path: &str) -> Result<HandlerId> {
        let handler_id = self.next_handler_id;

        self.method_routes
            .entry(method)
            .or_insert_with(MatchitRouter::new)
            .insert(path, handler_id)
            .map_err(|e| Error::InvalidRoutePattern {
                pattern: path.to_string(),
                reason: e.to_string(),
            })?;

        self.next_handler_id += 1;
        Ok(handler_id)
    }

    /// Match a request path against registered routes
    ///
    /// `HEAD` falls back to the `GET` routes.
    ///
    /// # Errors
    ///
    /// Returns `Error::RouteNotFound` if no matching route exists
    pub fn match_route<'a>(&'a self, method: Method, path: &'a str) -> Result<Match<'a>> {
        let found = self.lookup(method, path).or_else(|| {
            (method == Method::Head)
                .then(|| self.lookup(Method::Get, path))
                .flatten()
        });

        found.ok_or_else(|| Error::RouteNotFound {
            path: path.to_string(),
        })
    }

    fn lookup<'a>(&'a self, method: Method, path: &'a str) -> Option<Match<'a>> {
        let matched = self.method_routes.get(&method)?.at(path).ok()?;
        Some(Match {
            handler_id: *matched.value,
            params: matched.params.iter().collect(),
        })
    }

    /// Convenience method to add a GET route
    pub fn get(&mut self, path: &str) -> Result<HandlerId> {
        self.add_route(Method::Get, path)
    }

    /// Convenience method to add a POST route
    pub fn post(&mut self, path: &str) -> Result<HandlerId> {
        self.add_route(Method::Post, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_routing() {
        let mut router = Router::new();

        let id1 = router.get("/").unwrap();
        let id2 = router.get("/movies").unwrap();
        let id3 = router.post("/movies").unwrap();

        assert_eq!((id1, id2, id3), (0, 1, 2));

        let m = router.match_route(Method::Get, "/").unwrap();
        assert_eq!(m.handler_id, 0);

        let m = router.match_route(Method::Get, "/movies").unwrap();
        assert_eq!(m.handler_id, 1);

        let m = router.match_route(Method::Post, "/movies").unwrap();
        assert_eq!(m.handler_id, 2);
    }

    #[test]
    fn test_path_parameters() {
        let mut router = Router::new();
        router.get("/films/{id}").unwrap();
        router.get("/customers/{customer_id}/rentals/{rental_id}").unwrap();

        let m = router.match_route(Method::Get, "/films/123").unwrap();
        assert_eq!(m.param("id"), Some("123"));

        let m = router
            .match_route(Method::Get, "/customers/456/rentals/789")
            .unwrap();
        assert_eq!(m.param("customer_id"), Some("456"));
        assert_eq!(m.param("rental_id"), Some("789"));
    }

    #[test]
    fn test_head_falls_back_to_get() {
        let mut router = Router::new();
        router.get("/customers").unwrap();

        let m = router.match_route(Method::Head, "/customers").unwrap();
        assert_eq!(m.handler_id, 0);
    }

    #[test]
    fn test_conflicting_route_is_rejected() {
        let mut router = Router::new();
        router.get("/movies").unwrap();
        let err = router.get("/movies").unwrap_err();
        assert!(matches!(err, Error::InvalidRoutePattern { .. }));

        // The failed insert must not burn a handler id
        assert_eq!(router.get("/customers").unwrap(), 1);
    }

    #[test]
    fn test_route_not_found() {
        let router = Router::new();
        let result = router.match_route(Method::Get, "/nonexistent");
        assert!(result.is_err());
    }

    #[test]
    fn test_method_not_allowed() {
        let mut router = Router::new();
        router.get("/movies").unwrap();

        let result = router.match_route(Method::Post, "/movies");
        assert!(result.is_err());
    }
}
