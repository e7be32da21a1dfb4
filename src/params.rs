//! Multi-valued parameter storage.
//!
//! [`Params`] is the merged view of every parameter known for a request. It keeps
//! each `(name, value)` pair in arrival order, so a name that appears several times
//! (`?tag=a&tag=b`) keeps all of its values and a later source never replaces an
//! earlier one.
//!
//! # Lookup semantics
//!
//! | Accessor | Absent key | Present key |
//! |---|---|---|
//! | [`Params::get`] | `""` | first value |
//! | [`Params::first`] | `None` | `Some(first value)` |
//! | [`Params::get_int`] | `0` | first value parsed, `0` on failure |
//! | [`Params::try_get_int`] | `None` | `Some(Ok(n))` / `Some(Err(_))` |
//!
//! `get` and `get_int` are the convenience layer and cannot tell an absent key from
//! an empty or non-numeric one; use `first` / `try_get_int` when that matters.
//!
//! ```rust
//! use brrtrouter_context::params::Params;
//!
//! let mut params = Params::new();
//! params.add("id", "42");
//! params.add("id", "43");
//!
//! assert_eq!(params.get("id"), "42");
//! assert_eq!(params.get_int("id"), 42);
//! assert_eq!(params.get_all("id").collect::<Vec<_>>(), vec!["42", "43"]);
//! assert_eq!(params.get("missing"), "");
//! ```

use smallvec::SmallVec;
use std::num::ParseIntError;
use std::sync::Arc;

/// Number of pairs stored inline before spilling to the heap.
/// Most requests carry a handful of path and query values.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Inline pair storage shared with route bindings.
///
/// Names are `Arc<str>` because route placeholders are shared with the route
/// template; values are per-request.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Ordered, multi-valued mapping from parameter name to values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    pairs: ParamVec,
}

impl Params {
    /// Create an empty parameter space.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `value` under `key`. Existing values for `key` are kept.
    pub fn add(&mut self, key: impl Into<Arc<str>>, value: impl Into<String>) {
        self.pairs.push((key.into(), value.into()));
    }

    /// First value added for `key`, or `""` when the key is absent.
    #[must_use]
    pub fn get(&self, key: &str) -> &str {
        self.first(key).unwrap_or("")
    }

    /// First value added for `key`, `None` when absent.
    #[must_use]
    pub fn first(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k.as_ref() == key)
            .map(|(_, v)| v.as_str())
    }

    /// All values for `key` in insertion order.
    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.pairs
            .iter()
            .filter(move |(k, _)| k.as_ref() == key)
            .map(|(_, v)| v.as_str())
    }

    /// First value for `key` parsed as a base-10 `i64`.
    ///
    /// Returns `0` when the key is absent or the value does not parse.
    #[must_use]
    pub fn get_int(&self, key: &str) -> i64 {
        self.try_get_int(key).and_then(Result::ok).unwrap_or(0)
    }

    /// Strict form of [`get_int`](Self::get_int): `None` when absent, the parse
    /// result otherwise.
    #[must_use]
    pub fn try_get_int(&self, key: &str) -> Option<Result<i64, ParseIntError>> {
        self.first(key).map(str::parse::<i64>)
    }

    /// Whether at least one value was added for `key`.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.pairs.iter().any(|(k, _)| k.as_ref() == key)
    }

    /// Distinct names in order of first appearance.
    #[must_use]
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = Vec::new();
        for (k, _) in &self.pairs {
            if !keys.contains(&k.as_ref()) {
                keys.push(k.as_ref());
            }
        }
        keys
    }

    /// Every `(name, value)` pair in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_ref(), v.as_str()))
    }

    /// Total number of values across all names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl<K: Into<Arc<str>>, V: Into<String>> Extend<(K, V)> for Params {
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        for (k, v) in iter {
            self.add(k, v);
        }
    }
}

impl<K: Into<Arc<str>>, V: Into<String>> FromIterator<(K, V)> for Params {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut params = Params::new();
        params.extend(iter);
        params
    }
}

impl From<ParamVec> for Params {
    fn from(pairs: ParamVec) -> Self {
        Self { pairs }
    }
}

impl<'a> IntoIterator for &'a Params {
    type Item = (&'a str, &'a str);
    type IntoIter = std::iter::Map<
        std::slice::Iter<'a, (Arc<str>, String)>,
        fn(&'a (Arc<str>, String)) -> (&'a str, &'a str),
    >;

    fn into_iter(self) -> Self::IntoIter {
        fn split(pair: &(Arc<str>, String)) -> (&str, &str) {
            (pair.0.as_ref(), pair.1.as_str())
        }
        self.pairs
            .iter()
            .map(split as fn(&'a (Arc<str>, String)) -> (&'a str, &'a str))
    }
}
