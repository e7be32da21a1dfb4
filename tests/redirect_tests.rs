mod common;

use common::{context, form_post, get};
use http::header::LOCATION;
use http::StatusCode;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;

/// Records the level of every `tracing` event.
struct EventLevels(Arc<Mutex<Vec<Level>>>);

impl<S: Subscriber> Layer<S> for EventLevels {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        self.0.lock().push(*event.metadata().level());
    }
}

#[test]
fn test_redirect_defaults_to_found() {
    let (mut ctx, logger) = context("/login", get("/login"));
    ctx.redirect("/dashboard");
    let res = ctx.writer();
    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(res.location(), Some("/dashboard"));
    assert!(logger.contains(Level::INFO, "Redirecting (302) to path:/dashboard"));
}

#[test]
fn test_redirect_status_is_honoured() {
    let (mut ctx, _) = context("/login", get("/login"));
    ctx.redirect_status("/dashboard", StatusCode::MOVED_PERMANENTLY);
    assert_eq!(ctx.writer().status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(ctx.writer().location(), Some("/dashboard"));
}

#[test]
fn test_redirect_param_ignored_by_default() {
    let (mut ctx, _) = context("/login", get("/login?redirect=/settings"));
    ctx.redirect_status("/dashboard", StatusCode::FOUND);
    assert_eq!(ctx.writer().location(), Some("/dashboard"));
}

#[test]
fn test_redirect_param_override_when_opted_in() {
    let (mut ctx, _) = context("/login", get("/login?redirect=/settings"));
    ctx.redirect_with_param_override("/dashboard", StatusCode::FOUND);
    assert_eq!(ctx.writer().status(), StatusCode::FOUND);
    assert_eq!(ctx.writer().location(), Some("/settings"));
}

#[test]
fn test_redirect_param_override_from_form_body() {
    let (mut ctx, _) = context("/login", form_post("/login", "user=ann&redirect=%2Faccount"));
    ctx.redirect_with_param_override("/dashboard", StatusCode::SEE_OTHER);
    assert_eq!(ctx.writer().status(), StatusCode::SEE_OTHER);
    assert_eq!(ctx.writer().location(), Some("/account"));
    assert!(ctx.writer().body().is_empty());
}

#[test]
fn test_empty_redirect_param_keeps_target() {
    let (mut ctx, _) = context("/login", get("/login?redirect="));
    ctx.redirect_with_param_override("/dashboard", StatusCode::FOUND);
    assert_eq!(ctx.writer().location(), Some("/dashboard"));
}

#[test]
fn test_external_param_override_refused() {
    let (mut ctx, logger) = context("/login", get("/login?redirect=http://evil.example/"));
    ctx.redirect_with_param_override("/dashboard", StatusCode::FOUND);
    assert!(ctx.writer().headers().get(LOCATION).is_none());
    assert_eq!(ctx.writer().status(), StatusCode::OK);
    assert!(logger.contains(Level::ERROR, "http://evil.example/"));
}

#[test]
fn test_scheme_target_refused() {
    let (mut ctx, logger) = context("/", get("/"));
    ctx.redirect("http://evil.example/");
    assert!(ctx.writer().location().is_none());
    assert!(ctx.writer().body().is_empty());
    assert!(logger.contains(Level::ERROR, "Ignoring redirect to external path"));
}

#[test]
fn test_relative_target_refused() {
    let (mut ctx, logger) = context("/", get("/"));
    ctx.redirect("relative/path");
    assert!(ctx.writer().location().is_none());
    assert_eq!(logger.count(Level::ERROR), 1);
}

#[test]
fn test_refused_redirect_logged_once_at_error() {
    let levels = Arc::new(Mutex::new(Vec::new()));
    let subscriber = tracing_subscriber::registry().with(EventLevels(Arc::clone(&levels)));

    let logger = tracing::subscriber::with_default(subscriber, || {
        let (mut ctx, logger) = context("/", get("/"));
        ctx.redirect("https://evil.example/");
        assert!(ctx.writer().location().is_none());
        logger
    });

    assert_eq!(logger.entries().len(), 1);
    assert_eq!(logger.count(Level::ERROR), 1);
    assert!(!levels.lock().contains(&Level::WARN));
}

#[test]
fn test_protocol_relative_target_refused() {
    let (mut ctx, _) = context("/", get("/"));
    ctx.redirect("//evil.example/");
    assert!(ctx.writer().location().is_none());
}

#[test]
fn test_external_redirect_skips_checks() {
    let (mut ctx, logger) = context("/", get("/?redirect=/settings"));
    ctx.redirect_external("http://example.com/");
    assert_eq!(ctx.writer().status(), StatusCode::FOUND);
    assert_eq!(ctx.writer().location(), Some("http://example.com/"));
    assert_eq!(logger.count(Level::ERROR), 0);
}

#[test]
fn test_redirect_response_converts_to_http() {
    let (mut ctx, _) = context("/", get("/"));
    ctx.redirect("/next");
    let res = ctx.into_writer().into_http();
    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(res.headers()[LOCATION], "/next");
    assert!(!res.body().is_empty());
}
