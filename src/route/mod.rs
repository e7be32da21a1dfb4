//! # Route Module
//!
//! Route templates and the per-request binding record produced when a request
//! path is matched against one.
//!
//! ## Overview
//!
//! A [`Route`] is a compiled path template (`/users/{id}` or `/users/:id`) plus the
//! HTTP method and handler name it serves. Routes are built once and shared across
//! requests behind an `Arc`.
//!
//! A [`RouteMatch`] is created for a single request. It points at the shared
//! template and owns the path-variable bindings for that request's path. Bindings
//! are computed lazily by [`RouteMatch::parse`] and cached, so repeated lookups
//! during one request extract them only once, and nothing is written back into
//! the shared template.
//!
//! ## Example
//!
//! ```rust
//! use brrtrouter_context::route::{Route, RouteMatch};
//! use http::Method;
//! use std::sync::Arc;
//!
//! let route = Arc::new(Route::new(Method::GET, "/users/{id}", "get_user").unwrap());
//! let matched = route.try_match(&Method::GET, "/users/42").unwrap();
//!
//! assert!(matched.params().is_none());
//! matched.parse("/users/42");
//! assert_eq!(matched.param("id"), Some("42"));
//! ```

mod core;

pub use core::{Route, RouteMatch};
