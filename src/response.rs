use http::header::{HeaderName, HeaderValue, CONTENT_TYPE, LOCATION};
use http::{HeaderMap, Method, StatusCode};

/// Outbound response sink.
///
/// Transports implement the three primitives; [`redirect`](Self::redirect) is
/// built on top of them.
pub trait ResponseWriter: Send {
    fn set_status(&mut self, status: StatusCode);

    fn insert_header(&mut self, name: HeaderName, value: HeaderValue);

    fn write_body(&mut self, bytes: &[u8]);

    /// Reply with a redirect to `location`.
    ///
    /// Sets `Location` and the status; GET requests also get a short HTML body
    /// linking to the target. Non-ASCII and control bytes in `location` are
    /// percent-encoded.
    fn redirect(&mut self, method: &Method, location: &str, status: StatusCode) {
        let location = escape_location(location);
        let Ok(value) = HeaderValue::from_str(&location) else {
            return;
        };
        self.insert_header(LOCATION, value);
        if *method == Method::GET || *method == Method::HEAD {
            self.insert_header(
                CONTENT_TYPE,
                HeaderValue::from_static("text/html; charset=utf-8"),
            );
        }
        self.set_status(status);
        if *method == Method::GET {
            let body = format!(
                "<a href=\"{}\">{}</a>.\n",
                html_escape(&location),
                status_reason(status)
            );
            self.write_body(body.as_bytes());
        }
    }
}

/// Buffered response, convertible to `http::Response`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl Response {
    #[must_use]
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Vec::new(),
        }
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// `Location` header, if one was written.
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.headers.get(LOCATION).and_then(|v| v.to_str().ok())
    }

    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    #[must_use]
    pub fn into_http(self) -> http::Response<Vec<u8>> {
        let mut res = http::Response::new(self.body);
        *res.status_mut() = self.status;
        *res.headers_mut() = self.headers;
        res
    }
}

impl ResponseWriter for Response {
    fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    fn insert_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    fn write_body(&mut self, bytes: &[u8]) {
        self.body.extend_from_slice(bytes);
    }
}

fn status_reason(status: StatusCode) -> &'static str {
    status.canonical_reason().unwrap_or("Redirect")
}

const HEX: &[u8; 16] = b"0123456789ABCDEF";

fn escape_location(location: &str) -> String {
    let mut out = String::with_capacity(location.len());
    for b in location.bytes() {
        if b.is_ascii_graphic() {
            out.push(b as char);
        } else {
            out.push('%');
            out.push(char::from(HEX[usize::from(b >> 4)]));
            out.push(char::from(HEX[usize::from(b & 0x0F)]));
        }
    }
    out
}

fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_reason() {
        assert_eq!(status_reason(StatusCode::FOUND), "Found");
        assert_eq!(status_reason(StatusCode::SEE_OTHER), "See Other");
    }

    #[test]
    fn test_redirect_get_writes_body() {
        let mut res = Response::new();
        res.redirect(&Method::GET, "/a?b=<c>", StatusCode::FOUND);
        assert_eq!(res.status(), StatusCode::FOUND);
        assert_eq!(res.location(), Some("/a?b=<c>"));
        let body = String::from_utf8(res.body().to_vec()).unwrap();
        assert_eq!(body, "<a href=\"/a?b=&lt;c&gt;\">Found</a>.\n");
    }

    #[test]
    fn test_redirect_post_has_no_body() {
        let mut res = Response::new();
        res.redirect(&Method::POST, "/done", StatusCode::SEE_OTHER);
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(res.location(), Some("/done"));
        assert!(res.body().is_empty());
        assert!(res.headers().get(CONTENT_TYPE).is_none());
    }

    #[test]
    fn test_redirect_escapes_location() {
        let mut res = Response::new();
        res.redirect(&Method::HEAD, "/café plan", StatusCode::FOUND);
        assert_eq!(res.location(), Some("/caf%C3%A9%20plan"));
        assert!(res.body().is_empty());
    }

    #[test]
    fn test_into_http() {
        let mut res = Response::new();
        res.redirect(&Method::GET, "/x", StatusCode::TEMPORARY_REDIRECT);
        let http_res = res.into_http();
        assert_eq!(http_res.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(http_res.headers()[LOCATION], "/x");
    }
}
