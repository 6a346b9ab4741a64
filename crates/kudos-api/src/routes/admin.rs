//! # Admin API
//!
//! Operator mutations that do not belong to any one resource. Currently
//! the weekly point reset; scheduling it is an external concern (cron
//! hitting this endpoint or the CLI subcommand that wraps it).

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::extractors::CurrentUser;
use crate::state::AppState;

/// Result of a weekly reset.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct WeeklyResetResponse {
    pub users_reset: usize,
    pub teams_reset: usize,
    pub weekly_budget: u32,
}

/// Build the admin router.
pub fn router() -> Router<AppState> {
    Router::new().route("/api/admin/weekly-reset", post(weekly_reset))
}

/// POST /api/admin/weekly-reset — Restore every active user's budget and
/// zero the weekly received counters.
#[utoipa::path(
    post,
    path = "/api/admin/weekly-reset",
    responses(
        (status = 200, description = "Reset applied", body = WeeklyResetResponse),
        (status = 403, description = "Admin only", body = crate::error::ErrorBody),
    ),
    tag = "admin"
)]
async fn weekly_reset(
    State(state): State<AppState>,
    caller: CurrentUser,
) -> Result<Json<WeeklyResetResponse>, ApiError> {
    caller.require_admin()?;
    let budget = state.config.weekly_budget;

    let (users_reset, teams_reset) = state.directory.write().apply_weekly_reset(budget);

    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::ledger::persist_weekly_reset(pool, budget).await {
            tracing::error!(error = %e, "failed to persist weekly reset");
            return Err(ApiError::Internal(
                "reset applied in-memory but database persist failed".to_string(),
            ));
        }
    }

    tracing::info!(users_reset, teams_reset, budget, "weekly reset applied");
    Ok(Json(WeeklyResetResponse {
        users_reset,
        teams_reset,
        weekly_budget: budget,
    }))
}
