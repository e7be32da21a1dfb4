#![allow(dead_code)]

use brrtrouter_context::config::AppConfig;
use brrtrouter_context::context::RequestContext;
use brrtrouter_context::error::{FormError, MultipartError};
use brrtrouter_context::logging::Logger;
use brrtrouter_context::multipart::MultipartReader;
use brrtrouter_context::params::Params;
use brrtrouter_context::request::{Body, Request, TransportRequest};
use brrtrouter_context::response::Response;
use brrtrouter_context::route::{Route, RouteMatch};
use http::header::{HeaderValue, CONTENT_TYPE};
use http::{HeaderMap, Method};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::Level;

pub const BOUNDARY: &str = "----brrtBoundary7MA4YWxk";

/// Logger that keeps every message for assertions.
#[derive(Default)]
pub struct CaptureLogger {
    entries: Mutex<Vec<(Level, String)>>,
}

impl CaptureLogger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn entries(&self) -> Vec<(Level, String)> {
        self.entries.lock().clone()
    }

    pub fn count(&self, level: Level) -> usize {
        self.entries.lock().iter().filter(|(l, _)| *l == level).count()
    }

    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.entries
            .lock()
            .iter()
            .any(|(l, msg)| *l == level && msg.contains(needle))
    }
}

impl Logger for CaptureLogger {
    fn log(&self, level: Level, args: fmt::Arguments<'_>) {
        self.entries.lock().push((level, args.to_string()));
    }
}

/// Wraps a [`Request`] and counts calls to the form-parse primitive.
pub struct CountingRequest {
    inner: Request,
    parse_calls: Arc<AtomicUsize>,
}

impl CountingRequest {
    pub fn new(inner: Request) -> (Self, Arc<AtomicUsize>) {
        let parse_calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                inner,
                parse_calls: Arc::clone(&parse_calls),
            },
            parse_calls,
        )
    }
}

impl TransportRequest for CountingRequest {
    fn method(&self) -> &Method {
        self.inner.method()
    }

    fn path(&self) -> &str {
        self.inner.path()
    }

    fn raw_query(&self) -> &str {
        self.inner.raw_query()
    }

    fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    fn has_body(&self) -> bool {
        // Report a body even after it was consumed so a second parse would be visible.
        true
    }

    fn parse_form(&mut self) -> Result<(), FormError> {
        self.parse_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.parse_form()
    }

    fn form(&self) -> Option<&Params> {
        self.inner.form()
    }

    fn query(&self) -> &Params {
        self.inner.query()
    }

    fn multipart_reader(&mut self) -> Result<MultipartReader<Body>, MultipartError> {
        self.inner.multipart_reader()
    }
}

pub fn route(method: Method, pattern: &str) -> Arc<Route> {
    Arc::new(Route::new(method, pattern, "test_handler").unwrap())
}

pub fn context_with<R: TransportRequest>(
    pattern: &str,
    request: R,
    config: AppConfig,
) -> (RequestContext<R, Response>, Arc<CaptureLogger>) {
    let logger = CaptureLogger::new();
    let matched = RouteMatch::new(route(request.method().clone(), pattern));
    let ctx = RequestContext::new(
        Response::new(),
        request,
        matched,
        Arc::new(config),
        Arc::clone(&logger) as Arc<dyn Logger>,
    );
    (ctx, logger)
}

pub fn context(pattern: &str, request: Request) -> (RequestContext, Arc<CaptureLogger>) {
    context_with(pattern, request, AppConfig::default())
}

pub fn get(target: &str) -> Request {
    Request::new(Method::GET, target)
}

pub fn form_post(target: &str, body: &str) -> Request {
    Request::new(Method::POST, target)
        .with_header(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        )
        .with_body_bytes(body.as_bytes().to_vec())
}

/// One multipart part: field name, optional file name, content.
pub struct PartSpec<'a> {
    pub name: &'a str,
    pub filename: Option<&'a str>,
    pub content_type: Option<&'a str>,
    pub data: &'a [u8],
}

pub fn multipart_body(parts: &[PartSpec<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        let disposition = match part.filename {
            Some(f) => format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{f}\"\r\n",
                part.name
            ),
            None => format!("Content-Disposition: form-data; name=\"{}\"\r\n", part.name),
        };
        body.extend_from_slice(disposition.as_bytes());
        if let Some(ct) = part.content_type {
            body.extend_from_slice(format!("Content-Type: {ct}\r\n").as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn multipart_post(target: &str, body: Vec<u8>) -> Request {
    let content_type = format!("multipart/form-data; boundary={BOUNDARY}");
    Request::new(Method::POST, target)
        .with_header(CONTENT_TYPE, HeaderValue::from_str(&content_type).unwrap())
        .with_body_bytes(body)
}
