//! # brrtrouter-context
//!
//! The request-context and parameter-resolution layer of BRRTRouter.
//!
//! ## Overview
//!
//! Given an inbound request and the route it matched, a
//! [`RequestContext`](context::RequestContext) produces one merged, multi-valued
//! view of every parameter the handler can read, with typed accessors and a
//! redirect helper that refuses to leave the site.
//!
//! Parameters arrive from three sources with different costs:
//!
//! - **Path variables** bound by matching the request path against the route
//!   template (`/users/{id}` against `/users/42` binds `id=42`). The path is
//!   matched still percent-encoded and each bound value is decoded once.
//! - **Query string** values, decoded when the request is built.
//! - **Form body** values, decoded from `application/x-www-form-urlencoded` bodies.
//!
//! The body and the route are each parsed at most once per request; the merge
//! runs on every [`params`](context::RequestContext::params) call.
//!
//! ## Architecture
//!
//! - **[`params`]** - ordered multi-valued [`Params`](params::Params)
//! - **[`route`]** - route templates and per-request [`RouteMatch`](route::RouteMatch) bindings
//! - **[`request`]** - the transport request surface and the stock [`Request`](request::Request)
//! - **[`multipart`]** - `multipart/form-data` part reader
//! - **[`response`]** - response sink and buffered [`Response`](response::Response)
//! - **[`context`]** - [`RequestContext`](context::RequestContext)
//! - **[`redirect`]** - checked and unchecked redirects
//! - **[`config`]** - static configuration
//! - **[`logging`]** - logger handed to contexts and subscriber setup
//!
//! ### Request Handling Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Handler
//!     participant Ctx as RequestContext
//!     participant Req as Request
//!     participant Route as RouteMatch
//!
//!     Handler->>Ctx: param("id")
//!     Ctx->>Req: parse_form() (first call only)
//!     Req-->>Ctx: body + query values
//!     Ctx->>Route: parse(path) (first call only)
//!     Route-->>Ctx: path variables
//!     Ctx->>Ctx: merge: form values, then route values
//!     Ctx-->>Handler: first value for "id"
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use brrtrouter_context::config::AppConfig;
//! use brrtrouter_context::context::RequestContext;
//! use brrtrouter_context::logging::TracingLogger;
//! use brrtrouter_context::request::Request;
//! use brrtrouter_context::response::Response;
//! use brrtrouter_context::route::Route;
//! use http::{Method, StatusCode};
//! use std::sync::Arc;
//!
//! let route = Arc::new(Route::new(Method::POST, "/pets/{id}", "update_pet").unwrap());
//! let matched = route.try_match(&Method::POST, "/pets/5").unwrap();
//!
//! let mut ctx = RequestContext::new(
//!     Response::new(),
//!     Request::new(Method::POST, "/pets/5"),
//!     matched,
//!     Arc::new(AppConfig::default()),
//!     Arc::new(TracingLogger),
//! );
//!
//! assert_eq!(ctx.param_int("id"), 5);
//! ctx.redirect_status("/pets", StatusCode::SEE_OTHER);
//! assert_eq!(ctx.writer().location(), Some("/pets"));
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod logging;
pub mod multipart;
pub mod params;
pub mod redirect;
pub mod request;
pub mod response;
pub mod route;

pub use config::{AppConfig, Config};
pub use context::RequestContext;
pub use error::{ContextError, FormError, MultipartError};
pub use logging::{Logger, TracingLogger};
pub use params::Params;
pub use redirect::is_internal_path;
pub use request::{Request, TransportRequest};
pub use response::{Response, ResponseWriter};
pub use route::{Route, RouteMatch};
