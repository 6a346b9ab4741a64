//! # Tower Middleware
//!
//! - [`auth`] — session resolution (bearer/cookie hybrid).
//! - [`metrics`] — Prometheus HTTP metrics recording.
//! - [`rate_limit`] — per-caller token bucket.

pub mod auth;
pub mod metrics;
pub mod rate_limit;
