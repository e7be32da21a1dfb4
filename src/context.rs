//! # Request Context
//!
//! [`RequestContext`] binds one inbound request to its matched route, the shared
//! configuration, and a logger, and resolves every parameter the handler can see.
//!
//! ## Parameter resolution
//!
//! Parameters come from three places:
//!
//! 1. the url-encoded request body,
//! 2. the query string,
//! 3. path variables bound by the route (`/users/{id}`).
//!
//! The body and route parses each run at most once per request and are cached.
//! Every call to [`params`](RequestContext::params) then builds a fresh
//! [`Params`] by adding body/query values first and route values second. Since
//! [`Params::get`] returns the first value, a query or body value shadows a path
//! variable of the same name.
//!
//! ```rust
//! use brrtrouter_context::config::AppConfig;
//! use brrtrouter_context::context::RequestContext;
//! use brrtrouter_context::logging::TracingLogger;
//! use brrtrouter_context::request::Request;
//! use brrtrouter_context::response::Response;
//! use brrtrouter_context::route::Route;
//! use http::Method;
//! use std::sync::Arc;
//!
//! let route = Arc::new(Route::new(Method::GET, "/users/{id}", "get_user").unwrap());
//! let matched = route.try_match(&Method::GET, "/users/42").unwrap();
//! let ctx = RequestContext::new(
//!     Response::new(),
//!     Request::new(Method::GET, "/users/42?id=7&page=2"),
//!     matched,
//!     Arc::new(AppConfig::default()),
//!     Arc::new(TracingLogger),
//! );
//!
//! assert_eq!(ctx.param("id"), "7");       // query wins over the path variable
//! assert_eq!(ctx.route_param("id"), "42");
//! assert_eq!(ctx.param_int("page"), 2);
//! ```
//!
//! ## Strict and convenience accessors
//!
//! [`params`](RequestContext::params) returns parse failures to the caller.
//! [`param`](RequestContext::param) and [`param_int`](RequestContext::param_int)
//! log them and return `""` / `0`, so they cannot tell a missing key from a bad
//! body. Use the strict accessor where that distinction matters.
//!
//! ## Sharing
//!
//! The request sits behind a mutex and both caches are `OnceCell`s, so a context
//! may be shared by reference across threads working on the same request.

use crate::config::Config;
use crate::error::{ContextError, FormError, MultipartError};
use crate::logging::Logger;
use crate::multipart::Part;
use crate::params::Params;
use crate::request::{validate_form_encoding, Request, TransportRequest};
use crate::response::{Response, ResponseWriter};
use crate::route::RouteMatch;
use http::{HeaderMap, Method};
use once_cell::sync::OnceCell;
use parking_lot::{Mutex, MutexGuard};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, Level};
use ulid::Ulid;

/// Header carrying a caller-supplied request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// ULID tying together every log line written for one request.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub struct RequestId(Ulid);

impl RequestId {
    /// Reuse a well-formed `x-request-id` header, otherwise mint a fresh id.
    #[must_use]
    pub fn for_request(headers: &HeaderMap) -> Self {
        headers
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Ulid::from_string(s.trim()).ok())
            .map_or_else(|| Self(Ulid::new()), Self)
    }

    #[must_use]
    pub fn ulid(&self) -> Ulid {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Per-request state for one HTTP exchange.
pub struct RequestContext<R = Request, W = Response>
where
    R: TransportRequest,
    W: ResponseWriter,
{
    writer: W,
    request: Mutex<R>,
    method: Method,
    path: String,
    route: RouteMatch,
    errors: Vec<ContextError>,
    request_id: RequestId,
    config: Arc<dyn Config>,
    logger: Arc<dyn Logger>,
    form: OnceCell<Result<Params, FormError>>,
}

impl<R, W> fmt::Debug for RequestContext<R, W>
where
    R: TransportRequest,
    W: ResponseWriter,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("request_id", &self.request_id)
            .field("method", &self.method)
            .field("path", &self.path)
            .field("route", &self.route)
            .field("errors", &self.errors)
            .field("form_parsed", &self.form.get().is_some())
            .finish_non_exhaustive()
    }
}

impl<R, W> RequestContext<R, W>
where
    R: TransportRequest,
    W: ResponseWriter,
{
    /// Create the context for one request. Nothing is parsed yet.
    pub fn new(
        writer: W,
        request: R,
        route: RouteMatch,
        config: Arc<dyn Config>,
        logger: Arc<dyn Logger>,
    ) -> Self {
        let method = request.method().clone();
        let path = request.path().to_string();
        let request_id = RequestId::for_request(request.headers());
        debug!(
            request_id = %request_id,
            method = %method,
            path = %path,
            handler_name = %route.handler_name(),
            "Request context created"
        );
        Self {
            writer,
            request: Mutex::new(request),
            method,
            path,
            route,
            errors: Vec::new(),
            request_id,
            config,
            logger,
            form: OnceCell::new(),
        }
    }

    /// Log through the context logger.
    pub fn logf(&self, level: Level, args: fmt::Arguments<'_>) {
        self.logger.log(level, args);
    }

    /// All parameters: body and query values first, then route path variables.
    ///
    /// Body parsing and route binding each happen once per request; the merged
    /// [`Params`] is rebuilt on every call.
    ///
    /// # Errors
    ///
    /// [`ContextError::BodyParse`] when the body or query string is malformed.
    /// The failure is cached; later calls return it again without re-reading.
    pub fn params(&self) -> Result<Params, ContextError> {
        let mut params = match self.form_values() {
            Ok(form) => form.clone(),
            Err(err) => {
                self.logf(
                    Level::ERROR,
                    format_args!("error parsing request params: {err}"),
                );
                return Err(err.clone().into());
            }
        };

        for (name, value) in self.route.parse(&self.path) {
            params.add(Arc::clone(name), value.clone());
        }

        Ok(params)
    }

    /// First value for `key`, or `""` if absent or if parsing failed.
    pub fn param(&self, key: &str) -> String {
        match self.params() {
            Ok(params) => params.get(key).to_string(),
            Err(err) => {
                self.logf(Level::ERROR, format_args!("error parsing request: {err}"));
                String::new()
            }
        }
    }

    /// First value for `key` as an integer, `0` if absent, non-numeric, or if
    /// parsing failed.
    pub fn param_int(&self, key: &str) -> i64 {
        match self.params() {
            Ok(params) => params.get_int(key),
            Err(err) => {
                self.logf(Level::ERROR, format_args!("error parsing request: {err}"));
                0
            }
        }
    }

    /// A path variable from the route only. Does not touch the body.
    pub fn route_param(&self, key: &str) -> String {
        self.route.parse(&self.path);
        self.route.param(key).unwrap_or_default().to_string()
    }

    /// Uploaded files from a `multipart/form-data` body.
    ///
    /// Parts without a file name (plain form fields) are skipped. The body can
    /// only be streamed once, so a second call fails.
    ///
    /// # Errors
    ///
    /// [`MultipartError`] when the request is not multipart, the body was already
    /// consumed, or the stream is malformed.
    pub fn param_files(&self) -> Result<Vec<Part>, MultipartError> {
        let mut reader = self.request.lock().multipart_reader()?;
        let mut parts = Vec::new();
        while let Some(part) = reader.next_part()? {
            if part.file_name().map_or(true, str::is_empty) {
                continue;
            }
            parts.push(part);
        }
        debug!(
            request_id = %self.request_id,
            file_count = parts.len(),
            "Multipart files read"
        );
        Ok(parts)
    }

    fn form_values(&self) -> Result<&Params, &FormError> {
        self.form
            .get_or_init(|| {
                let mut request = self.request.lock();
                if request.has_body() {
                    request.parse_form()?;
                } else {
                    // Same query rules as a form parse, without a body to read.
                    validate_form_encoding(request.raw_query().as_bytes())?;
                }
                let values = request
                    .form()
                    .cloned()
                    .unwrap_or_else(|| request.query().clone());
                debug!(
                    request_id = %self.request_id,
                    param_count = values.len(),
                    "Request params parsed"
                );
                Ok(values)
            })
            .as_ref()
    }

    /// The cleaned request path, still percent-encoded.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Alias of [`path`](Self::path).
    #[must_use]
    pub fn current_path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Exclusive access to the underlying request.
    pub fn request(&self) -> MutexGuard<'_, R> {
        self.request.lock()
    }

    #[must_use]
    pub fn route(&self) -> &RouteMatch {
        &self.route
    }

    #[must_use]
    pub fn writer(&self) -> &W {
        &self.writer
    }

    pub fn writer_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    /// Consume the context, returning the response sink.
    pub fn into_writer(self) -> W {
        self.writer
    }

    /// Setting from the shared configuration, `""` when unset.
    #[must_use]
    pub fn config(&self, key: &str) -> String {
        self.config.config(key)
    }

    #[must_use]
    pub fn production(&self) -> bool {
        self.config.production()
    }

    /// Record a routing or rendering failure for this request.
    pub fn add_error(&mut self, err: impl Into<ContextError>) {
        self.errors.push(err.into());
    }

    #[must_use]
    pub fn errors(&self) -> &[ContextError] {
        &self.errors
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}
