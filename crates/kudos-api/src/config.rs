//! # Application Configuration
//!
//! Environment-driven configuration, parsed once at startup. Every knob
//! has a default so a bare `kudos-api` starts a working in-memory
//! development server.

use kudos_ledger::DEFAULT_WEEKLY_BUDGET;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "kudos_session";

/// Runtime configuration for the API service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// TCP port to bind.
    pub port: u16,
    /// Weekly spending budget restored by the reset.
    pub weekly_budget: u32,
    /// Session lifetime in seconds (default 14 days).
    pub session_ttl_secs: i64,
    /// Password reset token lifetime in seconds (default 15 minutes).
    pub reset_token_ttl_secs: i64,
    /// Pending OAuth authorization lifetime in seconds (default 10 minutes).
    pub oauth_state_ttl_secs: i64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            weekly_budget: DEFAULT_WEEKLY_BUDGET,
            session_ttl_secs: 14 * 24 * 60 * 60,
            reset_token_ttl_secs: 15 * 60,
            oauth_state_ttl_secs: 10 * 60,
        }
    }
}

impl AppConfig {
    /// Build configuration from `KUDOS_*` environment variables, falling
    /// back to defaults for anything unset or unparsable (unparsable
    /// values are logged and ignored rather than failing startup).
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            port: env_parse("KUDOS_PORT", defaults.port),
            weekly_budget: env_parse("KUDOS_WEEKLY_BUDGET", defaults.weekly_budget),
            session_ttl_secs: env_parse("KUDOS_SESSION_TTL_SECS", defaults.session_ttl_secs),
            reset_token_ttl_secs: env_parse(
                "KUDOS_RESET_TOKEN_TTL_SECS",
                defaults.reset_token_ttl_secs,
            ),
            oauth_state_ttl_secs: env_parse(
                "KUDOS_OAUTH_STATE_TTL_SECS",
                defaults.oauth_state_ttl_secs,
            ),
        }
    }
}

fn env_parse<T: std::str::FromStr + std::fmt::Display>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => match raw.parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(%key, %raw, %default, "unparsable value, using default");
                default
            }
        },
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = AppConfig::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.weekly_budget, DEFAULT_WEEKLY_BUDGET);
        assert_eq!(config.session_ttl_secs, 14 * 24 * 60 * 60);
        assert_eq!(config.reset_token_ttl_secs, 900);
    }
}
