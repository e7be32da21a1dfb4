//! `multipart/form-data` reading.
//!
//! [`MultipartReader`] walks the parts of a multipart body one at a time with
//! [`next_part`](MultipartReader::next_part) until the closing delimiter. The
//! body is read from the underlying stream in chunks, only as far as the
//! delimiter that ends the current part, so memory is bounded by the largest
//! part ([`MAX_PART_BYTES`]) rather than the whole body. The stream is not
//! rewindable, so a reader can only be built once per request.
//!
//! ```rust
//! use brrtrouter_context::multipart::MultipartReader;
//!
//! let body = b"--xyz\r\n\
//! Content-Disposition: form-data; name=\"doc\"; filename=\"a.txt\"\r\n\
//! \r\n\
//! hello\r\n\
//! --xyz--\r\n";
//!
//! let mut reader = MultipartReader::new(&body[..], "xyz");
//! let part = reader.next_part().unwrap().unwrap();
//! assert_eq!(part.file_name(), Some("a.txt"));
//! assert_eq!(part.data(), b"hello");
//! assert!(reader.next_part().unwrap().is_none());
//! ```

use crate::error::MultipartError;
use http::header::{HeaderName, HeaderValue, CONTENT_DISPOSITION, CONTENT_TYPE};
use http::HeaderMap;
use std::io::{self, Read};
use tracing::debug;

/// Upper bound on the bytes buffered for a single part (32 MiB).
pub const MAX_PART_BYTES: usize = 32 << 20;

/// RFC 2046 caps boundaries at 70 characters.
const MAX_BOUNDARY_LEN: usize = 70;

const READ_CHUNK: usize = 8 * 1024;

/// One part of a multipart body.
#[derive(Debug, Clone)]
pub struct Part {
    headers: HeaderMap,
    name: Option<String>,
    filename: Option<String>,
    data: Vec<u8>,
}

impl Part {
    /// Part headers as sent.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Form field name from `Content-Disposition`.
    #[must_use]
    pub fn form_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Base name of the uploaded file, if this part is a file.
    ///
    /// Any directory components a client sent are stripped.
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    #[must_use]
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}

/// Markers the reader scans ahead for.
#[derive(Clone, Copy)]
enum Marker {
    /// `--boundary`, opening the first part.
    Open,
    /// `CRLF--boundary`, ending a part body.
    Close,
    /// `CRLF` after a delimiter.
    LineEnd,
    /// Blank line ending part headers.
    HeadersEnd,
}

/// Sequential reader over the parts of a multipart body.
///
/// Bytes already handed out are dropped from the front of the buffer, which
/// only ever holds the unread tail of the current part plus one read chunk.
pub struct MultipartReader<R> {
    source: R,
    eof: bool,
    limit: usize,
    open: Vec<u8>,
    close: Vec<u8>,
    buf: Vec<u8>,
    started: bool,
    done: bool,
    bytes_read: usize,
}

impl<R: Read> MultipartReader<R> {
    /// Reader for `source` framed by `boundary` (without the leading `--`).
    pub fn new(source: R, boundary: &str) -> Self {
        let mut open = Vec::with_capacity(boundary.len() + 2);
        open.extend_from_slice(b"--");
        open.extend_from_slice(boundary.as_bytes());
        let mut close = Vec::with_capacity(open.len() + 2);
        close.extend_from_slice(b"\r\n");
        close.extend_from_slice(&open);
        Self {
            source,
            eof: false,
            limit: MAX_PART_BYTES,
            open,
            close,
            buf: Vec::new(),
            started: false,
            done: false,
            bytes_read: 0,
        }
    }

    /// Override the per-part size limit.
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Bytes pulled from the underlying stream so far.
    #[must_use]
    pub fn bytes_read(&self) -> usize {
        self.bytes_read
    }

    /// Next part, or `None` once the closing delimiter has been read.
    ///
    /// # Errors
    ///
    /// Fails on read errors, parts larger than the limit, and framing that
    /// does not follow RFC 7578. After an error the reader yields `None`.
    pub fn next_part(&mut self) -> Result<Option<Part>, MultipartError> {
        if self.done {
            return Ok(None);
        }
        let result = self.read_part();
        if result.is_err() {
            self.done = true;
        }
        result
    }

    fn marker(&self, marker: Marker) -> &[u8] {
        match marker {
            Marker::Open => &self.open,
            Marker::Close => &self.close,
            Marker::LineEnd => b"\r\n",
            Marker::HeadersEnd => b"\r\n\r\n",
        }
    }

    /// Pull one chunk from the source; `false` at end of stream.
    fn read_more(&mut self) -> Result<bool, MultipartError> {
        if self.eof {
            return Ok(false);
        }
        let start = self.buf.len();
        self.buf.resize(start + READ_CHUNK, 0);
        let n = loop {
            match self.source.read(&mut self.buf[start..]) {
                Ok(n) => break n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    self.buf.truncate(start);
                    return Err(err.into());
                }
            }
        };
        self.buf.truncate(start + n);
        self.bytes_read += n;
        if n == 0 {
            self.eof = true;
        }
        Ok(n > 0)
    }

    /// Buffer until `marker` appears and return its offset. No more than
    /// `limit` bytes may precede it.
    fn fill_until(&mut self, marker: Marker, missing: &'static str) -> Result<usize, MultipartError> {
        let mut from = 0;
        loop {
            let needle = self.marker(marker);
            let needle_len = needle.len();
            if let Some(at) = find(&self.buf, needle, from) {
                if at > self.limit {
                    return Err(MultipartError::TooLarge { limit: self.limit });
                }
                return Ok(at);
            }
            if self.buf.len() > self.limit + needle_len {
                return Err(MultipartError::TooLarge { limit: self.limit });
            }
            // A match may straddle the chunk boundary.
            from = self.buf.len().saturating_sub(needle_len - 1);
            if !self.read_more()? {
                return Err(MultipartError::Malformed(missing));
            }
        }
    }

    fn fill_at_least(&mut self, n: usize) -> Result<(), MultipartError> {
        while self.buf.len() < n && self.read_more()? {}
        Ok(())
    }

    fn read_part(&mut self) -> Result<Option<Part>, MultipartError> {
        if !self.started {
            // Skip any preamble up to the first delimiter.
            let start = self.fill_until(Marker::Open, "missing opening boundary")?;
            self.buf.drain(..start + self.open.len());
            self.started = true;
            if self.after_delimiter()? {
                return Ok(None);
            }
        }

        let headers = self.read_headers()?;

        let end = self.fill_until(Marker::Close, "missing closing boundary")?;
        let data = self.buf[..end].to_vec();
        self.buf.drain(..end + self.close.len());
        self.after_delimiter()?;

        let (name, filename) = headers
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .map(disposition_names)
            .unwrap_or_default();

        debug!(
            form_name = ?name,
            file_name = ?filename,
            part_size_bytes = data.len(),
            "Multipart part read"
        );

        Ok(Some(Part {
            headers,
            name,
            filename,
            data,
        }))
    }

    /// Consume what follows a delimiter; `true` when it was the closing one.
    fn after_delimiter(&mut self) -> Result<bool, MultipartError> {
        self.fill_at_least(2)?;
        if self.buf.starts_with(b"--") {
            self.done = true;
            return Ok(true);
        }
        let eol = self.fill_until(Marker::LineEnd, "expected line break after boundary")?;
        // Transport padding is allowed before the line break.
        if !self.buf[..eol].iter().all(|b| *b == b' ' || *b == b'\t') {
            return Err(MultipartError::Malformed("expected line break after boundary"));
        }
        self.buf.drain(..eol + 2);
        Ok(false)
    }

    fn read_headers(&mut self) -> Result<HeaderMap, MultipartError> {
        let mut headers = HeaderMap::new();
        self.fill_at_least(2)?;
        if self.buf.starts_with(b"\r\n") {
            self.buf.drain(..2);
            return Ok(headers);
        }
        let end = self.fill_until(Marker::HeadersEnd, "unterminated part headers")?;
        for line in self.buf[..end].split(|b| *b == b'\n') {
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            let colon = line
                .iter()
                .position(|b| *b == b':')
                .ok_or(MultipartError::Malformed("part header without colon"))?;
            let name = HeaderName::from_bytes(line[..colon].trim_ascii())
                .map_err(|_| MultipartError::Malformed("invalid part header name"))?;
            let value = HeaderValue::from_bytes(line[colon + 1..].trim_ascii())
                .map_err(|_| MultipartError::Malformed("invalid part header value"))?;
            headers.append(name, value);
        }
        self.buf.drain(..end + 4);
        Ok(headers)
    }
}

impl<R: Read> Iterator for MultipartReader<R> {
    type Item = Result<Part, MultipartError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_part().transpose()
    }
}

/// Extract the boundary from a `multipart/form-data` `Content-Type`.
///
/// # Errors
///
/// [`MultipartError::NotMultipart`] for any other media type (or none), and
/// [`MultipartError::MissingBoundary`] when the boundary is absent or invalid.
pub fn boundary_from_content_type(content_type: Option<&str>) -> Result<String, MultipartError> {
    let content_type = content_type.ok_or(MultipartError::NotMultipart)?;
    let (media_type, params) = parse_header_params(content_type);
    if !media_type.eq_ignore_ascii_case("multipart/form-data")
        && !media_type.eq_ignore_ascii_case("multipart/mixed")
    {
        return Err(MultipartError::NotMultipart);
    }
    params
        .into_iter()
        .find(|(k, _)| k == "boundary")
        .map(|(_, v)| v)
        .filter(|b| !b.is_empty() && b.len() <= MAX_BOUNDARY_LEN)
        .ok_or(MultipartError::MissingBoundary)
}

/// Split a header value such as `form-data; name="a"; filename="b.txt"` into its
/// leading token and lower-cased parameter names with unquoted values.
pub(crate) fn parse_header_params(value: &str) -> (&str, Vec<(String, String)>) {
    let (head, mut rest) = value.split_once(';').unwrap_or((value, ""));
    let mut params = Vec::new();

    loop {
        rest = rest.trim_start_matches(|c: char| c == ';' || c.is_ascii_whitespace());
        if rest.is_empty() {
            break;
        }
        let Some(eq) = rest.find('=') else {
            break;
        };
        let key = rest[..eq].trim().to_ascii_lowercase();
        let after = rest[eq + 1..].trim_start();

        let (val, remaining) = if let Some(quoted) = after.strip_prefix('"') {
            let mut val = String::new();
            let mut end = quoted.len();
            let mut escaped = false;
            for (i, c) in quoted.char_indices() {
                if escaped {
                    val.push(c);
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == '"' {
                    end = i + 1;
                    break;
                } else {
                    val.push(c);
                }
            }
            (val, &quoted[end..])
        } else {
            match after.find(';') {
                Some(i) => (after[..i].trim().to_string(), &after[i..]),
                None => (after.trim().to_string(), ""),
            }
        };

        params.push((key, val));
        rest = remaining;
    }

    (head.trim(), params)
}

fn disposition_names(value: &str) -> (Option<String>, Option<String>) {
    let (_, params) = parse_header_params(value);
    let mut name = None;
    let mut filename = None;
    for (k, v) in params {
        match k.as_str() {
            "name" => name = Some(v),
            "filename" => filename = Some(base_name(&v).to_string()),
            _ => {}
        }
    }
    (name, filename)
}

fn base_name(filename: &str) -> &str {
    filename
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or(filename)
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from > haystack.len() || needle.is_empty() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|i| i + from)
}
