//! # HTTP Server
//!
//! HTTP/1.1 server built on Hyper and Tokio.
//! Implements graceful shutdown with signal handling.
//!
//! ## Key Features
//!
//! - Async request handling with Tokio runtime
//! - Graceful shutdown on SIGINT/SIGTERM: idle keep-alive connections are
//!   closed, in-flight requests finish within a timeout
//! - Connection keep-alive support
//! - Static file fallback for unrouted `GET`/`HEAD` requests

use crate::assets::StaticFiles;
use crate::error::{Error, Result};
use crate::middleware::{Middleware, MiddlewareChain, MiddlewareResult};
use crate::request::HttpRequest;
use crate::router::{Match, Method, Router};
use http_body_util::Full;
pub use hyper::body::Bytes;
use hyper::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use hyper_util::server::graceful::GracefulShutdown;
use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info};

/// Wait after an accept failure that isn't specific to one peer
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// HTTP Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the server to
    pub address: SocketAddr,
    /// Enable keep-alive connections
    pub keep_alive: bool,
    /// Shutdown timeout for graceful shutdown (default: 30 seconds)
    pub shutdown_timeout: Duration,
    /// Max request body size in bytes
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: ([127, 0, 0, 1], 3000).into(),
            keep_alive: true,
            shutdown_timeout: Duration::from_secs(30),
            max_body_size: 1024 * 1024,
        }
    }
}

/// HTTP response produced by handlers
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body
    pub body: Bytes,
    /// Content type
    pub content_type: String,
    /// Extra response headers, names lowercased
    pub headers: HashMap<String, String>,
}

impl Default for HttpResponse {
    fn default() -> Self {
        Self {
            status: 200,
            body: Bytes::new(),
            content_type: "text/plain; charset=utf-8".to_string(),
            headers: HashMap::new(),
        }
    }
}

impl HttpResponse {
    /// Create an HTML response
    #[must_use]
    pub fn html(body: impl Into<String>) -> Self {
        Self {
            body: Bytes::from(body.into()),
            content_type: "text/html; charset=utf-8".to_string(),
            ..Self::default()
        }
    }

    /// Create a JSON response
    #[must_use]
    pub fn json(body: impl Into<String>) -> Self {
        Self {
            body: Bytes::from(body.into()),
            content_type: "application/json".to_string(),
            ..Self::default()
        }
    }

    /// Create a text response
    #[must_use]
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            body: Bytes::from(body.into()),
            ..Self::default()
        }
    }

    /// Create a binary response
    #[must_use]
    pub fn bytes(body: Bytes) -> Self {
        Self {
            body,
            content_type: "application/octet-stream".to_string(),
            ..Self::default()
        }
    }

    /// Set status code
    #[must_use]
    pub const fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Set a header
    #[must_use]
    pub fn with_header(mut self, key: &str, value: &str) -> Self {
        self.set_header(key, value);
        self
    }

    /// Set or override a header
    pub fn set_header(&mut self, key: &str, value: &str) {
        if key.eq_ignore_ascii_case("content-type") {
            self.content_type = value.to_string();
        } else {
            self.headers
                .insert(key.to_ascii_lowercase(), value.to_string());
        }
    }

    /// Get a header value (case-insensitive)
    #[must_use]
    pub fn header(&self, key: &str) -> Option<&str> {
        if key.eq_ignore_ascii_case("content-type") {
            return Some(&self.content_type);
        }
        self.headers
            .get(&key.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Body as UTF-8, if it is
    #[must_use]
    pub fn body_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }

    /// Convert to hyper Response
    fn into_hyper(self) -> Response<Full<Bytes>> {
        let mut response = Response::new(Full::new(self.body));
        *response.status_mut() =
            StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let headers = response.headers_mut();
        if let Ok(value) = HeaderValue::from_str(&self.content_type) {
            headers.insert(CONTENT_TYPE, value);
        }
        for (k, v) in &self.headers {
            if let (Ok(name), Ok(value)) =
                (HeaderName::from_bytes(k.as_bytes()), HeaderValue::from_str(v))
            {
                headers.insert(name, value);
            }
        }
        response
    }
}

/// Boxed future returned by handlers
pub type ResponseFuture = Pin<Box<dyn Future<Output = HttpResponse> + Send>>;

/// Handler function type (async)
pub type Handler = Arc<dyn Fn(&HttpRequest, &Match<'_>) -> ResponseFuture + Send + Sync>;

/// Wrap an async function as a [`Handler`]
///
/// The returned future can't borrow from the request; copy out what it needs
/// first.
pub fn handler<F, Fut>(f: F) -> Handler
where
    F: Fn(&HttpRequest, &Match<'_>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HttpResponse> + Send + 'static,
{
    Arc::new(move |req: &HttpRequest, matched: &Match<'_>| -> ResponseFuture {
        Box::pin(f(req, matched))
    })
}

/// Everything needed to turn a request into a response
#[derive(Clone, Default)]
struct Pipeline {
    router: Router,
    handlers: Vec<Handler>,
    middleware: MiddlewareChain,
    assets: Option<StaticFiles>,
}

/// HTTP server
#[derive(Default)]
pub struct Server {
    config: ServerConfig,
    pipeline: Pipeline,
}

impl Server {
    /// Create a new Server instance with default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new Server instance with the given configuration
    #[must_use]
    pub fn with_config(config: ServerConfig) -> Self {
        Self {
            config,
            pipeline: Pipeline::default(),
        }
    }

    /// Bind the server to an address
    #[must_use]
    pub const fn bind(mut self, addr: SocketAddr) -> Self {
        self.config.address = addr;
        self
    }

    /// Current configuration
    #[must_use]
    pub const fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Set max request body size
    pub fn set_max_body_size(&mut self, bytes: usize) {
        self.config.max_body_size = bytes;
    }

    /// Add a middleware to the chain
    pub fn add_middleware<M: Middleware + 'static>(&mut self, middleware: M) {
        self.pipeline.middleware.add(middleware);
    }

    /// Serve files from `dir` for requests no route matches
    pub fn serve_static(&mut self, dir: impl Into<PathBuf>) {
        self.pipeline.assets = Some(StaticFiles::new(dir));
    }

    /// Add a route and its handler
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidRoutePattern` if the path is malformed or
    /// already registered for this method
    pub fn add_route(&mut self, method: Method, path: &str, handler: Handler) -> Result<()> {
        self.pipeline.router.add_route(method, path)?;
        self.pipeline.handlers.push(handler);
        Ok(())
    }

    /// Add a GET route and its handler
    ///
    /// # Errors
    ///
    /// See [`Server::add_route`]
    pub fn get(&mut self, path: &str, handler: Handler) -> Result<()> {
        self.add_route(Method::Get, path, handler)
    }

    /// Start the server; stops on Ctrl-C or SIGTERM
    ///
    /// # Errors
    ///
    /// See [`Server::serve_with_shutdown`]
    pub async fn serve(&self) -> Result<()> {
        self.serve_with_shutdown(shutdown_signal()).await
    }

    /// Start the server; stops when `signal` completes
    ///
    /// In-flight connections get up to `shutdown_timeout` to finish.
    ///
    /// # Errors
    ///
    /// Returns `Error::BindError` if the address can't be bound
    pub async fn serve_with_shutdown<F>(&self, signal: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let addr = self.config.address;
        let listener = bind_listener(addr).map_err(|source| Error::BindError {
            address: addr.to_string(),
            source,
        })?;
        self.serve_listener(listener, signal).await
    }

    /// Serve connections from an already bound listener until `signal`
    /// completes
    ///
    /// Failed accepts are logged and retried. After the signal, idle
    /// keep-alive connections are closed and busy ones finish their current
    /// request, bounded by `shutdown_timeout`.
    ///
    /// # Errors
    ///
    /// Does not fail today: accept errors are logged and retried.
    pub async fn serve_listener<F>(&self, listener: TcpListener, signal: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        if let Ok(local) = listener.local_addr() {
            info!("Server listening on http://{}", local);
        }

        let pipeline = Arc::new(self.pipeline.clone());
        let graceful = GracefulShutdown::new();
        let max_body_size = self.config.max_body_size;
        let keep_alive = self.config.keep_alive;

        tokio::pin!(signal);

        loop {
            tokio::select! {
                accept_result = listener.accept() => {
                    let (stream, remote_addr) = match accept_result {
                        Ok(accepted) => accepted,
                        Err(e) => {
                            error!("Failed to accept connection: {}", e);
                            let delay = accept_backoff(&e);
                            if !delay.is_zero() {
                                tokio::time::sleep(delay).await;
                            }
                            continue;
                        }
                    };
                    let io = TokioIo::new(stream);

                    let pipeline = pipeline.clone();
                    let service = service_fn(move |req| {
                        let pipeline = pipeline.clone();
                        async move {
                            let method = req.method().clone();
                            let path = req.uri().path().to_string();
                            let version = req.version();

                            let result =
                                handle_request(req, &pipeline, remote_addr, max_body_size).await;

                            match &result {
                                Ok(resp) => info!(
                                    "    {} - \"{} {} {:?}\" {}",
                                    remote_addr,
                                    method,
                                    path,
                                    version,
                                    resp.status()
                                ),
                                Err(_) => error!(
                                    "    {} - \"{} {} {:?}\" ERROR",
                                    remote_addr, method, path, version
                                ),
                            }
                            result
                        }
                    });

                    let conn = http1::Builder::new()
                        .keep_alive(keep_alive)
                        .serve_connection(io, service);
                    let conn = graceful.watch(conn);
                    tokio::task::spawn(async move {
                        if let Err(err) = conn.await {
                            error!("Error serving connection: {:?}", err);
                        }
                    });
                }
                () = &mut signal => {
                    info!("Shutdown signal received, stopping server...");
                    break;
                }
            }
        }

        drop(listener);

        tokio::select! {
            () = graceful.shutdown() => {
                info!("All connections closed");
            }
            () = tokio::time::sleep(self.config.shutdown_timeout) => {
                info!("Shutdown timeout reached with connections still open");
            }
        }
        Ok(())
    }

    /// Execute a test request directly without network stack
    pub async fn test_request(
        &self,
        method: Method,
        path: String,
        headers: HashMap<String, String>,
        body: Option<Bytes>,
    ) -> HttpResponse {
        if let Some(b) = body.as_ref() {
            if b.len() > self.config.max_body_size {
                return HttpResponse::text("Payload Too Large").with_status(413);
            }
        }
        let mut req = HttpRequest::new(method, path, headers, body);
        req.set_header("x-client-ip", "test");

        process_request(&mut req, &self.pipeline).await
    }
}

/// Pause before the next accept after `err`
///
/// Errors tied to a single peer are retried at once; anything else (such as
/// running out of file descriptors) waits so the loop doesn't spin.
fn accept_backoff(err: &std::io::Error) -> Duration {
    use std::io::ErrorKind;
    match err.kind() {
        ErrorKind::ConnectionAborted | ErrorKind::ConnectionReset | ErrorKind::Interrupted => {
            Duration::ZERO
        }
        _ => ACCEPT_BACKOFF,
    }
}

fn bind_listener(addr: SocketAddr) -> std::io::Result<TcpListener> {
    let socket = if addr.is_ipv4() {
        tokio::net::TcpSocket::new_v4()?
    } else {
        tokio::net::TcpSocket::new_v6()?
    };
    socket.set_reuseaddr(true)?;
    socket.bind(addr)?;
    socket.listen(1024)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install CTRL+C signal handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}

/// Core request processing logic (network agnostic)
async fn process_request(req: &mut HttpRequest, pipeline: &Pipeline) -> HttpResponse {
    if req.header("x-request-id").is_none() {
        let request_id = generate_request_id();
        req.set_header("x-request-id", &request_id);
    }

    let mut response = match pipeline.middleware.run_before(req) {
        MiddlewareResult::Continue => dispatch(req, pipeline).await,
        MiddlewareResult::Respond(resp) => resp,
    };

    if let Some(request_id) = req.header("x-request-id") {
        response.set_header("x-request-id", request_id);
    }
    pipeline.middleware.run_after(req, &mut response);
    response
}

async fn dispatch(req: &HttpRequest, pipeline: &Pipeline) -> HttpResponse {
    if let Ok(matched) = pipeline.router.match_route(req.method, &req.path) {
        return match pipeline.handlers.get(matched.handler_id) {
            Some(handler) => handler(req, &matched).await,
            None => {
                error!(handler_id = matched.handler_id, "Route has no handler");
                HttpResponse::text("Internal Server Error").with_status(500)
            }
        };
    }

    if matches!(req.method, Method::Get | Method::Head) {
        if let Some(assets) = &pipeline.assets {
            if let Some(file) = assets.load(&req.path).await {
                return file;
            }
        }
    }

    HttpResponse::text("Not Found").with_status(404)
}

async fn handle_request(
    req: Request<hyper::body::Incoming>,
    pipeline: &Pipeline,
    remote_addr: SocketAddr,
    max_body_size: usize,
) -> std::result::Result<Response<Full<Bytes>>, hyper::Error> {
    let mut request = match HttpRequest::from_hyper_with_limit(req, max_body_size).await {
        Ok(r) => r,
        Err(Error::PayloadTooLarge { .. }) => {
            return Ok(HttpResponse::text("Payload Too Large")
                .with_status(413)
                .into_hyper());
        }
        Err(e) => {
            error!("Failed to parse request: {}", e);
            return Ok(HttpResponse::text("Bad Request").with_status(400).into_hyper());
        }
    };

    request.set_header("x-client-ip", &remote_addr.ip().to_string());
    let response = process_request(&mut request, pipeline).await;
    Ok(response.into_hyper())
}

static REQUEST_COUNTER: AtomicUsize = AtomicUsize::new(1);

fn generate_request_id() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    let counter = REQUEST_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{:x}-{:x}", now.as_nanos(), counter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::NoCacheMiddleware;

    fn page(body: &'static str) -> Handler {
        handler(move |_req, _matched| async move { HttpResponse::html(body) })
    }

    fn echo_param() -> Handler {
        handler(|_req, matched| {
            let id = matched.param("id").unwrap_or("?").to_string();
            async move { HttpResponse::text(id) }
        })
    }

    #[test]
    fn test_html_response() {
        let resp = HttpResponse::html("<h1>Sakila</h1>");
        assert_eq!(resp.status, 200);
        assert_eq!(resp.content_type, "text/html; charset=utf-8");
        assert_eq!(resp.body_str(), Some("<h1>Sakila</h1>"));
    }

    #[test]
    fn test_response_with_status() {
        let resp = HttpResponse::text("Not Found").with_status(404);
        assert_eq!(resp.status, 404);
    }

    #[test]
    fn test_into_hyper_copies_headers() {
        let resp = HttpResponse::json("{}")
            .with_status(201)
            .with_header("X-Request-Id", "r1")
            .into_hyper();
        assert_eq!(resp.status(), StatusCode::CREATED);
        assert_eq!(resp.headers()["content-type"], "application/json");
        assert_eq!(resp.headers()["x-request-id"], "r1");
    }

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.address.port(), 3000);
        assert!(config.keep_alive);
    }

    #[tokio::test]
    async fn test_routes_and_not_found() {
        let mut server = Server::new();
        server.get("/", page("home")).unwrap();
        server.get("/films/{id}", echo_param()).unwrap();

        let resp = server
            .test_request(Method::Get, "/".to_string(), HashMap::new(), None)
            .await;
        assert_eq!(resp.body_str(), Some("home"));
        assert!(resp.header("x-request-id").is_some());

        let resp = server
            .test_request(Method::Get, "/films/42".to_string(), HashMap::new(), None)
            .await;
        assert_eq!(resp.body_str(), Some("42"));

        let resp = server
            .test_request(Method::Get, "/nope".to_string(), HashMap::new(), None)
            .await;
        assert_eq!(resp.status, 404);
    }

    #[tokio::test]
    async fn test_duplicate_route_is_rejected() {
        let mut server = Server::new();
        server.get("/movies", page("a")).unwrap();
        assert!(server.get("/movies", page("b")).is_err());
    }

    #[tokio::test]
    async fn test_request_id_is_echoed() {
        let mut server = Server::new();
        server.get("/", page("home")).unwrap();

        let mut headers = HashMap::new();
        headers.insert("x-request-id".to_string(), "fixed-id".to_string());
        let resp = server
            .test_request(Method::Get, "/".to_string(), headers, None)
            .await;
        assert_eq!(resp.header("x-request-id"), Some("fixed-id"));
    }

    #[tokio::test]
    async fn test_middleware_applies_to_responses() {
        let mut server = Server::new();
        server.add_middleware(NoCacheMiddleware::new());
        server.get("/", page("home")).unwrap();

        let resp = server
            .test_request(Method::Get, "/".to_string(), HashMap::new(), None)
            .await;
        assert_eq!(resp.header("pragma"), Some("no-cache"));
    }

    #[tokio::test]
    async fn test_body_limit() {
        let mut server = Server::new();
        server.set_max_body_size(4);
        let resp = server
            .test_request(
                Method::Post,
                "/".to_string(),
                HashMap::new(),
                Some(Bytes::from_static(b"too large")),
            )
            .await;
        assert_eq!(resp.status, 413);
    }

    #[tokio::test]
    async fn test_static_fallback() {
        let dir = std::env::temp_dir().join(format!("catalogue-server-static-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("site.css"), "h1 {}").unwrap();

        let mut server = Server::new();
        server.serve_static(&dir);

        let resp = server
            .test_request(Method::Get, "/site.css".to_string(), HashMap::new(), None)
            .await;
        assert_eq!(resp.status, 200);
        assert_eq!(resp.content_type, "text/css; charset=utf-8");

        let resp = server
            .test_request(Method::Post, "/site.css".to_string(), HashMap::new(), None)
            .await;
        assert_eq!(resp.status, 404);

        std::fs::remove_dir_all(dir).ok();
    }

    #[tokio::test]
    async fn test_serve_stops_on_signal() {
        let server = Server::new().bind(([127, 0, 0, 1], 0).into());
        let result = server.serve_with_shutdown(async {}).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_idle_keep_alive_does_not_delay_shutdown() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let mut server = Server::with_config(ServerConfig {
            shutdown_timeout: Duration::from_secs(10),
            ..ServerConfig::default()
        });
        server.get("/", page("home")).unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let serving = tokio::spawn(async move {
            server
                .serve_listener(listener, async {
                    let _ = rx.await;
                })
                .await
        });

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .await
            .unwrap();
        let mut received = Vec::new();
        let mut buf = [0u8; 1024];
        while !received.ends_with(b"home") {
            let n = stream.read(&mut buf).await.unwrap();
            assert!(n > 0, "connection closed before the response");
            received.extend_from_slice(&buf[..n]);
        }
        assert!(received.starts_with(b"HTTP/1.1 200"));

        // The connection stays open and idle
        tx.send(()).unwrap();
        let started = std::time::Instant::now();
        let result = tokio::time::timeout(Duration::from_secs(5), serving)
            .await
            .expect("shutdown waited on an idle connection")
            .unwrap();
        assert!(result.is_ok());
        assert!(started.elapsed() < Duration::from_secs(2));

        let n = stream.read(&mut buf).await.unwrap_or(0);
        assert_eq!(n, 0);
    }

    #[test]
    fn test_accept_backoff() {
        use std::io::{Error as IoError, ErrorKind};

        let reset = IoError::from(ErrorKind::ConnectionReset);
        assert_eq!(accept_backoff(&reset), Duration::ZERO);
        let aborted = IoError::from(ErrorKind::ConnectionAborted);
        assert_eq!(accept_backoff(&aborted), Duration::ZERO);

        // EMFILE and friends surface as uncategorized OS errors
        let exhausted = IoError::from_raw_os_error(24);
        assert_eq!(accept_backoff(&exhausted), ACCEPT_BACKOFF);
        let other = IoError::new(ErrorKind::Other, "listener broke");
        assert_eq!(accept_backoff(&other), ACCEPT_BACKOFF);
    }
}
