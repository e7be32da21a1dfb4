use crate::error::{FormError, MultipartError};
use crate::multipart::{boundary_from_content_type, parse_header_params, MultipartReader};
use crate::params::Params;
use http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use http::{HeaderMap, Method};
use std::fmt;
use std::io::{Cursor, Read};
use tracing::{debug, info};

/// Upper bound on a url-encoded body read for form parsing (10 MiB).
pub const MAX_FORM_BODY_BYTES: usize = 10 << 20;

/// Request body stream. Read at most once.
pub type Body = Box<dyn Read + Send>;

/// Inbound request as seen by the request context.
///
/// The transport layer owns the connection; this is the narrow surface the
/// context needs. [`Request`] is the stock implementation.
pub trait TransportRequest: Send {
    fn method(&self) -> &Method;

    /// Cleaned request path without the query string, still percent-encoded.
    /// See [`clean_path`].
    fn path(&self) -> &str;

    /// Query string as received, without the leading `?`.
    fn raw_query(&self) -> &str;

    fn headers(&self) -> &HeaderMap;

    /// Whether an unread body stream is still attached.
    fn has_body(&self) -> bool;

    /// Decode url-encoded body values together with the query string into
    /// [`form`](Self::form).
    ///
    /// # Errors
    ///
    /// [`FormError`] if the body cannot be read or either source is malformed.
    fn parse_form(&mut self) -> Result<(), FormError>;

    /// Values decoded by [`parse_form`](Self::parse_form), `None` until it succeeds.
    fn form(&self) -> Option<&Params>;

    /// Query string values, available without touching the body.
    fn query(&self) -> &Params;

    /// Take the body as a multipart stream.
    ///
    /// # Errors
    ///
    /// [`MultipartError`] when the request is not multipart or the body is gone.
    fn multipart_reader(&mut self) -> Result<MultipartReader<Body>, MultipartError>;
}

/// Parsed HTTP request data used by the request context.
pub struct Request {
    method: Method,
    path: String,
    raw_query: String,
    headers: HeaderMap,
    query: Params,
    body: Option<Body>,
    form: Option<Params>,
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("headers", &self.headers)
            .field("query", &self.query)
            .field("has_body", &self.body.is_some())
            .field("form", &self.form)
            .finish()
    }
}

impl Request {
    /// Build a request from a method and request target (`/path?query`).
    ///
    /// The path is cleaned but left percent-encoded; the query is decoded
    /// leniently and checked strictly by [`parse_form`](TransportRequest::parse_form).
    #[must_use]
    pub fn new(method: Method, target: &str) -> Self {
        let (raw_path, raw_query) = target.split_once('?').unwrap_or((target, ""));
        let path = clean_path(raw_path);
        let query = parse_query_params(target);

        debug!(
            method = %method,
            path = %path,
            param_count = query.len(),
            "Query params parsed"
        );

        Self {
            method,
            path,
            raw_query: raw_query.to_string(),
            headers: HeaderMap::new(),
            query,
            body: None,
            form: None,
        }
    }

    /// Convert an `http::Request` with a buffered body.
    #[must_use]
    pub fn from_http(req: http::Request<Vec<u8>>) -> Self {
        let (parts, body) = req.into_parts();
        let target = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let mut request = Self::new(parts.method, target);
        request.headers = parts.headers;
        if !body.is_empty() {
            request.body = Some(Box::new(Cursor::new(body)));
        }
        request
    }

    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Read + Send + 'static) -> Self {
        self.body = Some(Box::new(body));
        self
    }

    #[must_use]
    pub fn with_body_bytes(self, body: impl Into<Vec<u8>>) -> Self {
        self.with_body(Cursor::new(body.into()))
    }

    /// `Content-Type` header, if present and valid UTF-8.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    fn is_urlencoded(&self) -> bool {
        self.content_type()
            .map(|ct| {
                parse_header_params(ct)
                    .0
                    .eq_ignore_ascii_case("application/x-www-form-urlencoded")
            })
            .unwrap_or(false)
    }
}

impl TransportRequest for Request {
    fn method(&self) -> &Method {
        &self.method
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn raw_query(&self) -> &str {
        &self.raw_query
    }

    fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn has_body(&self) -> bool {
        self.body.is_some()
    }

    fn parse_form(&mut self) -> Result<(), FormError> {
        if self.form.is_some() {
            return Ok(());
        }

        validate_form_encoding(self.raw_query.as_bytes())?;

        // Multipart and other bodies are left for their own readers.
        let mut form = Params::new();
        if self.is_urlencoded() {
            if let Some(body) = self.body.take() {
                let raw = read_limited(body, MAX_FORM_BODY_BYTES)?;
                form = parse_form_body(&raw)?;
                info!(
                    body_size_bytes = raw.len(),
                    param_count = form.len(),
                    "Form body parsed"
                );
            }
        }

        // Body values first, then the query string.
        form.extend(self.query.iter().map(|(k, v)| (k.to_string(), v.to_string())));
        self.form = Some(form);
        Ok(())
    }

    fn form(&self) -> Option<&Params> {
        self.form.as_ref()
    }

    fn query(&self) -> &Params {
        &self.query
    }

    fn multipart_reader(&mut self) -> Result<MultipartReader<Body>, MultipartError> {
        let boundary = boundary_from_content_type(self.content_type())?;
        let body = self.body.take().ok_or(MultipartError::BodyConsumed)?;
        Ok(MultipartReader::new(body, &boundary))
    }
}

/// Parse query string parameters from a request target.
///
/// Everything after the first `?` is decoded as `application/x-www-form-urlencoded`.
/// Repeated names keep every value in order.
#[must_use]
pub fn parse_query_params(target: &str) -> Params {
    match target.split_once('?') {
        Some((_, query)) => url::form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect(),
        None => Params::new(),
    }
}

/// Decode a url-encoded body, rejecting malformed escapes.
///
/// # Errors
///
/// [`FormError::InvalidEscape`] or [`FormError::Semicolon`].
pub fn parse_form_body(raw: &[u8]) -> Result<Params, FormError> {
    validate_form_encoding(raw)?;
    Ok(url::form_urlencoded::parse(raw)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect())
}

pub(crate) fn validate_form_encoding(raw: &[u8]) -> Result<(), FormError> {
    let mut i = 0;
    while i < raw.len() {
        match raw[i] {
            b';' => return Err(FormError::Semicolon),
            b'%' => {
                let valid = raw.len() > i + 2
                    && raw[i + 1].is_ascii_hexdigit()
                    && raw[i + 2].is_ascii_hexdigit();
                if !valid {
                    let end = (i + 3).min(raw.len());
                    return Err(FormError::InvalidEscape {
                        escape: String::from_utf8_lossy(&raw[i..end]).into_owned(),
                        offset: i,
                    });
                }
                i += 3;
            }
            _ => i += 1,
        }
    }
    Ok(())
}

fn read_limited(body: Body, limit: usize) -> Result<Vec<u8>, FormError> {
    let mut buf = Vec::new();
    body.take(limit as u64 + 1).read_to_end(&mut buf)?;
    if buf.len() > limit {
        return Err(FormError::TooLarge { limit });
    }
    Ok(buf)
}

/// Canonical form of a request path, still percent-encoded.
///
/// Collapses repeated slashes and resolves `.` and `..` segments on the raw
/// text, so `%2F` and `%2E` stay inside their segment and never act as
/// separators or traversal. Path variables are decoded once, when a route
/// binds them. The result always starts with `/` and has no trailing slash
/// except for the root.
#[must_use]
pub fn clean_path(raw: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in raw.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }

    let mut cleaned = String::with_capacity(raw.len() + 1);
    for segment in &segments {
        cleaned.push('/');
        cleaned.push_str(segment);
    }
    if cleaned.is_empty() {
        cleaned.push('/');
    }
    cleaned
}
