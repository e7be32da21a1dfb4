//! Error types surfaced by the request context.
//!
//! Two failure domains reach callers:
//!
//! - [`FormError`] - the request body (or query string) could not be decoded as
//!   `application/x-www-form-urlencoded`. Returned by the strict
//!   [`RequestContext::params`](crate::context::RequestContext::params) accessor and
//!   logged-then-swallowed by the convenience accessors.
//! - [`MultipartError`] - the request is not `multipart/form-data` or its stream is
//!   malformed. Always surfaced, never swallowed.
//!
//! Refused redirects are deliberately *not* an error type: the redirect guard
//! logs and declines, see [`crate::redirect`].

use std::io;
use thiserror::Error;

/// Failure while decoding form-encoded parameters.
///
/// Cloneable so the outcome of the single body parse can be cached on the
/// context and handed to every later caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    /// A `%` escape was not followed by two hex digits.
    #[error("invalid URL escape {escape:?} at byte {offset}")]
    InvalidEscape {
        /// The offending escape sequence as it appeared in the input
        escape: String,
        /// Byte offset of the `%`
        offset: usize,
    },
    /// `;` is not accepted as a pair separator.
    #[error("invalid semicolon separator in form data")]
    Semicolon,
    /// Body exceeded [`MAX_FORM_BODY_BYTES`](crate::request::MAX_FORM_BODY_BYTES).
    #[error("form body too large (limit {limit} bytes)")]
    TooLarge {
        /// Configured limit in bytes
        limit: usize,
    },
    /// Reading the body stream failed.
    #[error("failed to read request body: {0}")]
    Read(String),
}

impl From<io::Error> for FormError {
    fn from(err: io::Error) -> Self {
        FormError::Read(err.to_string())
    }
}

/// Failure while reading a `multipart/form-data` body.
#[derive(Debug, Error)]
pub enum MultipartError {
    /// `Content-Type` is missing or is not `multipart/form-data`.
    #[error("request Content-Type isn't multipart/form-data")]
    NotMultipart,
    /// `Content-Type` is multipart but carries no usable boundary.
    #[error("no multipart boundary param in Content-Type")]
    MissingBoundary,
    /// The body was already consumed by an earlier reader.
    #[error("request body already consumed")]
    BodyConsumed,
    /// A part exceeded [`MAX_PART_BYTES`](crate::multipart::MAX_PART_BYTES).
    #[error("multipart part too large (limit {limit} bytes)")]
    TooLarge {
        /// Configured limit in bytes
        limit: usize,
    },
    /// The stream does not follow the multipart framing.
    #[error("malformed multipart body: {0}")]
    Malformed(&'static str),
    /// Underlying read failed.
    #[error("failed to read multipart body: {0}")]
    Io(#[from] io::Error),
}

/// Errors accumulated on, or returned from, a [`RequestContext`](crate::context::RequestContext).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextError {
    /// Parameter parsing failed.
    #[error("error parsing request params: {0}")]
    BodyParse(#[from] FormError),
    /// A routing or rendering failure recorded by a handler.
    #[error("{0}")]
    Handler(String),
}
