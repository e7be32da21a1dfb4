//! Redirects with an open-redirect guard.
//!
//! The checked entry points ([`RequestContext::redirect`],
//! [`RequestContext::redirect_status`]) only follow targets that are paths on the
//! current origin, see [`is_internal_path`]. A refused target is logged at error
//! level and nothing is written; the handler stays responsible for whatever it
//! sends instead.
//!
//! Following a caller-supplied `redirect` parameter (the usual "return to" link
//! after login) is opt-in through
//! [`RequestContext::redirect_with_param_override`], and that value goes through
//! the same guard.
//!
//! [`RequestContext::redirect_external`] skips every check and is meant for
//! trusted code paths that deliberately leave the site.

use crate::context::RequestContext;
use crate::request::TransportRequest;
use crate::response::ResponseWriter;
use http::StatusCode;
use tracing::{info, Level};

/// Parameter consulted by [`RequestContext::redirect_with_param_override`].
pub const REDIRECT_PARAM: &str = "redirect";

/// Status used when none is given. Temporary, since route targets may move.
pub const DEFAULT_REDIRECT_STATUS: StatusCode = StatusCode::FOUND;

/// Whether the caller's `redirect` parameter may replace the target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RedirectOverride {
    #[default]
    Ignore,
    FromParam,
}

/// Whether `path` is safe to redirect to on the current origin.
///
/// The path must start with `/` and must not contain `:`, which rejects
/// scheme-qualified targets such as `javascript:` or `http://host`. Protocol
/// relative targets (`//host`) and backslashes, which browsers treat as `/`, are
/// rejected as well.
#[must_use]
pub fn is_internal_path(path: &str) -> bool {
    path.starts_with('/')
        && !path.starts_with("//")
        && !path.contains(':')
        && !path.contains('\\')
}

impl<R, W> RequestContext<R, W>
where
    R: TransportRequest,
    W: ResponseWriter,
{
    /// Redirect to an internal path with `302 Found`.
    pub fn redirect(&mut self, path: &str) {
        self.redirect_status(path, DEFAULT_REDIRECT_STATUS);
    }

    /// Redirect to an internal path with the given status.
    ///
    /// External or relative targets are refused and logged.
    pub fn redirect_status(&mut self, path: &str, status: StatusCode) {
        self.checked_redirect(path, status, RedirectOverride::Ignore);
    }

    /// As [`redirect_status`](Self::redirect_status), but a non-empty
    /// [`REDIRECT_PARAM`] parameter replaces `path`. The replacement is checked
    /// like any other target.
    pub fn redirect_with_param_override(&mut self, path: &str, status: StatusCode) {
        self.checked_redirect(path, status, RedirectOverride::FromParam);
    }

    /// Redirect anywhere with `302 Found`. No checks; use with caution.
    pub fn redirect_external(&mut self, url: &str) {
        info!(
            request_id = %self.request_id(),
            location = %url,
            status = DEFAULT_REDIRECT_STATUS.as_u16(),
            "External redirect"
        );
        let method = self.method().clone();
        self.writer_mut()
            .redirect(&method, url, DEFAULT_REDIRECT_STATUS);
    }

    /// Shared guard behind the checked entry points.
    pub fn checked_redirect(&mut self, path: &str, status: StatusCode, mode: RedirectOverride) {
        let mut target = path.to_string();
        if mode == RedirectOverride::FromParam {
            let requested = self.param(REDIRECT_PARAM);
            if !requested.is_empty() {
                target = requested;
            }
        }

        if !is_internal_path(&target) {
            self.logf(
                Level::ERROR,
                format_args!("Ignoring redirect to external path {target}"),
            );
            return;
        }

        self.logf(
            Level::INFO,
            format_args!("Redirecting ({}) to path:{target}", status.as_u16()),
        );
        let method = self.method().clone();
        self.writer_mut().redirect(&method, &target, status);
    }
}
