//! # Rate Limiting
//!
//! Token-bucket rate limiting keyed by caller identity: the bearer/cookie
//! session token when one is presented, the client address extension as a
//! fallback, and a shared anonymous bucket otherwise. Runs after the auth
//! middleware so unauthenticated requests never consume a real caller's
//! quota.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use parking_lot::Mutex;

use crate::middleware::auth::bearer_or_cookie_token;

/// Token bucket parameters.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    /// Maximum burst size.
    pub capacity: f64,
    /// Refill rate in tokens per second.
    pub refill_per_sec: f64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        // Generous: a browser client polling notifications plus normal
        // interactive use stays far below this.
        Self {
            capacity: 120.0,
            refill_per_sec: 40.0,
        }
    }
}

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Shared limiter state attached as a request extension.
#[derive(Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
    buckets: Arc<Mutex<HashMap<String, Bucket>>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            buckets: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Try to take one token for `key`. Returns false when the bucket is
    /// empty.
    pub fn check(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut buckets = self.buckets.lock();

        // Opportunistic cleanup: drop buckets that have fully refilled —
        // an idle caller's bucket carries no information.
        if buckets.len() > 10_000 {
            let capacity = self.config.capacity;
            let refill = self.config.refill_per_sec;
            buckets.retain(|_, b| {
                (b.tokens + now.duration_since(b.last_refill).as_secs_f64() * refill) < capacity
            });
        }

        let bucket = buckets.entry(key.to_string()).or_insert(Bucket {
            tokens: self.config.capacity,
            last_refill: now,
        });

        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.config.refill_per_sec)
            .min(self.config.capacity);
        bucket.last_refill = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Middleware enforcing the per-caller token bucket.
pub async fn rate_limit_middleware(request: Request, next: Next) -> Response {
    let Some(limiter) = request.extensions().get::<RateLimiter>().cloned() else {
        return next.run(request).await;
    };

    let key = bearer_or_cookie_token(request.headers())
        .unwrap_or_else(|| "anonymous".to_string());

    if !limiter.check(&key) {
        tracing::warn!("rate limit exceeded");
        return (
            StatusCode::TOO_MANY_REQUESTS,
            axum::Json(serde_json::json!({ "message": "rate limit exceeded" })),
        )
            .into_response();
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_allows_burst_then_rejects() {
        let limiter = RateLimiter::new(RateLimitConfig {
            capacity: 3.0,
            refill_per_sec: 0.0,
        });
        assert!(limiter.check("a"));
        assert!(limiter.check("a"));
        assert!(limiter.check("a"));
        assert!(!limiter.check("a"));
    }

    #[test]
    fn buckets_are_per_key() {
        let limiter = RateLimiter::new(RateLimitConfig {
            capacity: 1.0,
            refill_per_sec: 0.0,
        });
        assert!(limiter.check("a"));
        assert!(!limiter.check("a"));
        assert!(limiter.check("b"));
    }

    #[test]
    fn bucket_refills_over_time() {
        let limiter = RateLimiter::new(RateLimitConfig {
            capacity: 1.0,
            refill_per_sec: 1000.0,
        });
        assert!(limiter.check("a"));
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert!(limiter.check("a"));
    }
}
