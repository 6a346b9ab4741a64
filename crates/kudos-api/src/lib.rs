//! # kudos-api — Axum API Service for the Kudos Stack
//!
//! The REST surface of the peer-recognition service: thanks cards with
//! point allocations, 2-point likes with a per-card cap, reactions,
//! comments, weekly budgets, teams/departments, server-side
//! notifications, and dashboards.
//!
//! ## API Surface
//!
//! | Prefix                  | Module                       | Domain              |
//! |-------------------------|------------------------------|---------------------|
//! | `/api/auth/*`           | [`routes::auth`]             | Sessions, OAuth, reset |
//! | `/api/users/*`          | [`routes::users`]            | Accounts            |
//! | `/api/cards/*`          | [`routes::cards`]            | Cards + interactions |
//! | `/api/comments/*`       | [`routes::cards`]            | Comment edits       |
//! | `/api/teams/*`          | [`routes::orgs`]             | Teams               |
//! | `/api/departments/*`    | [`routes::orgs`]             | Org tree            |
//! | `/api/notifications/*`  | [`routes::notifications`]    | Feed                |
//! | `/api/dashboard/*`      | [`routes::dashboard`]        | Rankings            |
//! | `/api/admin/*`          | [`routes::admin`]            | Weekly reset        |
//! | `/openapi.json`         | [`openapi`]                  | Spec                |
//! | `/health/*`, `/metrics` | here                         | Operator surface    |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → SessionMiddleware → RateLimitMiddleware → Handler
//! ```
//!
//! Sessions run before rate limiting so unauthenticated requests are
//! rejected without consuming a real caller's quota.

pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::response::IntoResponse;
use axum::{Extension, Router};
use tower_http::trace::TraceLayer;

use crate::middleware::metrics::ApiMetrics;
use crate::middleware::rate_limit::{RateLimitConfig, RateLimiter};
use crate::state::AppState;

pub use crate::config::AppConfig;
pub use crate::error::ApiError;

/// Check if metrics are enabled via the `KUDOS_METRICS_ENABLED` env var.
/// Defaults to `true` when the variable is absent or set to anything
/// other than `"false"`.
fn metrics_enabled() -> bool {
    std::env::var("KUDOS_METRICS_ENABLED")
        .map(|v| v.to_lowercase() != "false")
        .unwrap_or(true)
}

/// Assemble the full application router with all routes and middleware.
///
/// Health probes (`/health/*`), `/metrics`, and the public auth endpoints
/// (register, login, OAuth bootstrap, password reset) are mounted outside
/// the session middleware so they remain reachable without credentials.
pub fn app(state: AppState) -> Router {
    let metrics = ApiMetrics::new();
    let limiter = RateLimiter::new(RateLimitConfig::default());
    let metrics_on = metrics_enabled();

    // Authenticated API routes.
    //
    // Body size limit: 1 MiB. Card messages are 140 characters; anything
    // bigger than this is not a legitimate request.
    let api = Router::new()
        .merge(routes::auth::router())
        .merge(routes::users::router())
        .merge(routes::cards::router())
        .merge(routes::orgs::router())
        .merge(routes::notifications::router())
        .merge(routes::dashboard::router())
        .merge(routes::admin::router())
        .merge(openapi::router());

    let mut api = api
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(from_fn(middleware::rate_limit::rate_limit_middleware))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::auth::session_middleware,
        ));

    if metrics_on {
        api = api
            .layer(from_fn(middleware::metrics::metrics_middleware))
            .layer(Extension(metrics.clone()));
    }

    let api = api
        .layer(TraceLayer::new_for_http())
        .layer(Extension(limiter.clone()))
        .with_state(state.clone());

    // Unauthenticated surface: the login/registration endpoints plus the
    // operator probes. Rate limiting still applies (shared anonymous
    // bucket), auth obviously does not.
    let mut unauthenticated = Router::new()
        .merge(routes::auth::public_router())
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness))
        .layer(DefaultBodyLimit::max(64 * 1024))
        .layer(from_fn(middleware::rate_limit::rate_limit_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(limiter));

    if metrics_on {
        unauthenticated = unauthenticated
            .route("/metrics", axum::routing::get(prometheus_metrics))
            .layer(Extension(metrics));
    }

    let unauthenticated = unauthenticated.with_state(state);

    Router::new().merge(unauthenticated).merge(api)
}

/// GET /metrics — Prometheus metrics scrape endpoint.
///
/// Updates domain gauges from the current directory on each scrape (pull
/// model), then gathers and encodes all metrics in Prometheus text
/// exposition format.
async fn prometheus_metrics(
    State(state): State<AppState>,
    Extension(metrics): Extension<ApiMetrics>,
) -> impl IntoResponse {
    {
        let directory = state.directory.read();
        let now = chrono::Utc::now();

        let active = directory.users.values().filter(|u| u.is_active).count();
        let inactive = directory.users.len() - active;
        metrics.users_total().reset();
        metrics
            .users_total()
            .with_label_values(&["active"])
            .set(active as f64);
        metrics
            .users_total()
            .with_label_values(&["inactive"])
            .set(inactive as f64);

        let hidden = directory.cards.values().filter(|c| c.hidden).count();
        let visible = directory.cards.len() - hidden;
        metrics.cards_total().reset();
        metrics
            .cards_total()
            .with_label_values(&["visible"])
            .set(visible as f64);
        metrics
            .cards_total()
            .with_label_values(&["hidden"])
            .set(hidden as f64);

        metrics.likes_total().set(directory.likes.len() as f64);

        let unread = directory
            .notifications
            .values()
            .filter(|n| n.is_unread())
            .count();
        let read = directory.notifications.len() - unread;
        metrics.notifications_total().reset();
        metrics
            .notifications_total()
            .with_label_values(&["unread"])
            .set(unread as f64);
        metrics
            .notifications_total()
            .with_label_values(&["read"])
            .set(read as f64);

        let live_sessions = directory
            .sessions
            .values()
            .filter(|s| s.is_valid(now))
            .count();
        metrics.sessions_active().set(live_sessions as f64);
        metrics.teams_total().set(directory.teams.len() as f64);
    }

    match metrics.gather_and_encode() {
        Ok(body) => (
            StatusCode::OK,
            [(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4; charset=utf-8",
            )],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode Prometheus metrics: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, e).into_response()
        }
    }
}

/// Liveness probe — always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe — verifies the application is ready to serve traffic.
///
/// Checks:
/// - The directory lock is acquirable (not deadlocked).
/// - Database connection is healthy (when configured).
///
/// Returns 200 "ready" or 503 with a diagnostic message.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    // parking_lot::RwLock::try_read is non-blocking.
    if state.directory.try_read().is_none() {
        return (StatusCode::SERVICE_UNAVAILABLE, "directory locked").into_response();
    }

    if let Some(pool) = &state.db_pool {
        if let Err(e) = sqlx::query("SELECT 1").execute(pool).await {
            tracing::warn!("database health check failed: {e}");
            return (StatusCode::SERVICE_UNAVAILABLE, "database unreachable").into_response();
        }
    }

    (StatusCode::OK, "ready").into_response()
}
