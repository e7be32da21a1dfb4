use crate::params::ParamVec;
use http::Method;
use once_cell::sync::OnceCell;
use regex::Regex;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// A compiled route template.
///
/// Shared between requests; never mutated after construction.
pub struct Route {
    method: Method,
    pattern: String,
    handler_name: String,
    regex: Regex,
    param_names: Vec<Arc<str>>,
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("pattern", &self.pattern)
            .field("handler_name", &self.handler_name)
            .field("param_names", &self.param_names)
            .finish()
    }
}

impl Route {
    /// Compile a route template.
    ///
    /// # Errors
    ///
    /// Returns the regex error if the template produces an invalid pattern.
    pub fn new(
        method: Method,
        pattern: impl Into<String>,
        handler_name: impl Into<String>,
    ) -> Result<Self, regex::Error> {
        let pattern = pattern.into();
        let (regex, param_names) = Self::path_to_regex(&pattern)?;
        Ok(Self {
            method,
            pattern,
            handler_name: handler_name.into(),
            regex,
            param_names,
        })
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    #[must_use]
    pub fn handler_name(&self) -> &str {
        &self.handler_name
    }

    /// Placeholder names in template order.
    #[must_use]
    pub fn param_names(&self) -> &[Arc<str>] {
        &self.param_names
    }

    /// Whether `path` matches this template (method not considered).
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// Start a per-request match if both method and path fit this route.
    ///
    /// Bindings are not extracted here; see [`RouteMatch::parse`].
    #[must_use]
    pub fn try_match(self: &Arc<Self>, method: &Method, path: &str) -> Option<RouteMatch> {
        if self.method == *method && self.matches(path) {
            Some(RouteMatch::new(Arc::clone(self)))
        } else {
            None
        }
    }

    /// Extract path-variable bindings for `path`.
    ///
    /// `path` is matched in its percent-encoded form and each bound segment is
    /// decoded exactly once, so `a%2Fb` binds `a/b`. A segment that does not
    /// decode to UTF-8 is bound as sent. Returns no bindings when the path does
    /// not match. A placeholder name used twice keeps the last segment bound
    /// to it.
    #[must_use]
    pub fn bind(&self, path: &str) -> ParamVec {
        let mut params = ParamVec::new();
        let Some(captures) = self.regex.captures(path) else {
            return params;
        };
        for (i, name) in self.param_names.iter().enumerate() {
            let Some(raw) = captures.get(i + 1) else {
                continue;
            };
            let value = decode_segment(raw.as_str());
            match params.iter_mut().find(|(k, _)| k == name) {
                Some(slot) => slot.1 = value,
                None => params.push((Arc::clone(name), value)),
            }
        }
        params
    }

    /// Convert a template to an anchored regex and its ordered placeholder names.
    ///
    /// `/users/{id}/posts/:post_id` becomes `^/users/([^/]+)/posts/([^/]+)$` with
    /// names `["id", "post_id"]`. Static segments are escaped.
    pub(crate) fn path_to_regex(path: &str) -> Result<(Regex, Vec<Arc<str>>), regex::Error> {
        if path == "/" || path.is_empty() {
            return Ok((Regex::new(r"^/$")?, Vec::new()));
        }

        let mut pattern = String::with_capacity(path.len() + 5);
        pattern.push('^');
        let mut param_names = Vec::new();

        for segment in path.split('/') {
            let placeholder = if segment.starts_with('{') && segment.ends_with('}') {
                Some(segment.trim_start_matches('{').trim_end_matches('}'))
            } else {
                segment.strip_prefix(':')
            };
            match placeholder {
                Some(name) if !name.is_empty() => {
                    pattern.push_str("/([^/]+)");
                    param_names.push(Arc::from(name));
                }
                _ if !segment.is_empty() => {
                    pattern.push('/');
                    pattern.push_str(&regex::escape(segment));
                }
                _ => {}
            }
        }

        pattern.push('$');
        Ok((Regex::new(&pattern)?, param_names))
    }
}

fn decode_segment(raw: &str) -> String {
    urlencoding::decode(raw).map_or_else(|_| raw.to_string(), |v| v.into_owned())
}

/// Per-request binding of a request path to a [`Route`].
///
/// Owns the lazily computed path-variable bindings for exactly one request.
/// The cell guarantees a single extraction even if the match is shared across
/// threads within that request.
#[derive(Debug)]
pub struct RouteMatch {
    route: Arc<Route>,
    bindings: OnceCell<ParamVec>,
}

impl RouteMatch {
    /// Begin a binding record for `route`; nothing is parsed yet.
    #[must_use]
    pub fn new(route: Arc<Route>) -> Self {
        Self {
            route,
            bindings: OnceCell::new(),
        }
    }

    #[must_use]
    pub fn route(&self) -> &Route {
        &self.route
    }

    #[must_use]
    pub fn handler_name(&self) -> &str {
        self.route.handler_name()
    }

    /// Bind path variables for `path`. Only the first call does work; later
    /// calls return the cached bindings whatever path they are given.
    pub fn parse(&self, path: &str) -> &ParamVec {
        self.bindings.get_or_init(|| {
            let params = self.route.bind(path);
            debug!(
                route_pattern = %self.route.pattern(),
                path = %path,
                path_params = ?params,
                "Route params bound"
            );
            params
        })
    }

    #[must_use]
    pub fn is_parsed(&self) -> bool {
        self.bindings.get().is_some()
    }

    /// Bindings, or `None` before the first [`parse`](Self::parse).
    #[must_use]
    pub fn params(&self) -> Option<&ParamVec> {
        self.bindings.get()
    }

    /// A bound value by name; `None` before parsing or when unbound.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.bindings
            .get()?
            .iter()
            .find(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }
}
