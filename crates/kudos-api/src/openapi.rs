//! # OpenAPI Specification Assembly
//!
//! Assembles all utoipa-documented routes into a single OpenAPI spec,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::state::AppState;

/// Adds the session bearer security scheme to the OpenAPI spec.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "session_token",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .description(Some(
                            "Opaque session token from /api/auth/login, also accepted \
                             as the kudos_session cookie.",
                        ))
                        .build(),
                ),
            );
        }
    }
}

/// Assembled OpenAPI spec for the entire API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Kudos API — Peer Recognition Service",
        version = "0.3.2",
        description = "REST API for the kudos stack, an internal peer-recognition service.\n\nProvides:\n- **Thanks cards** with sender-chosen point allocations (0–140)\n- **Likes** costing 2 points, split 1/1 between card sender and recipient, capped at 30 points per user per card\n- **Emoji reactions** (one per user per card) and **comments**\n- **Weekly point budgets** with an admin-triggered reset\n- **Teams and departments** for recipient grouping\n- **Server-side notifications** and dashboard rankings\n\nAuthentication: opaque session token via `Authorization: Bearer <token>` or the `kudos_session` cookie. Health probes (`/health/*`) and `/metrics` are unauthenticated.",
        license(name = "MIT"),
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server"),
    ),
    security(
        ("session_token" = [])
    ),
    paths(
        // ── Auth ─────────────────────────────────────────────────────────
        crate::routes::auth::register,
        crate::routes::auth::login,
        crate::routes::auth::logout,
        crate::routes::auth::me,
        crate::routes::auth::oauth_authorize_url,
        crate::routes::auth::oauth_callback,
        crate::routes::auth::password_reset_request,
        crate::routes::auth::password_reset_confirm,
        // ── Users ────────────────────────────────────────────────────────
        crate::routes::users::list_users,
        crate::routes::users::create_user,
        crate::routes::users::get_user,
        crate::routes::users::update_user,
        crate::routes::users::deactivate_user,
        crate::routes::users::assign_departments,
        // ── Cards ────────────────────────────────────────────────────────
        crate::routes::cards::create_card,
        crate::routes::cards::list_cards,
        crate::routes::cards::get_card,
        crate::routes::cards::hide_card,
        crate::routes::cards::unhide_card,
        // ── Likes ────────────────────────────────────────────────────────
        crate::routes::cards::create_like,
        crate::routes::cards::delete_like,
        // ── Reactions ────────────────────────────────────────────────────
        crate::routes::cards::put_reaction,
        crate::routes::cards::delete_reaction,
        // ── Comments ─────────────────────────────────────────────────────
        crate::routes::cards::create_comment,
        crate::routes::cards::update_comment,
        crate::routes::cards::delete_comment,
        // ── Orgs ─────────────────────────────────────────────────────────
        crate::routes::orgs::list_teams,
        crate::routes::orgs::create_team,
        crate::routes::orgs::get_team,
        crate::routes::orgs::add_member,
        crate::routes::orgs::remove_member,
        crate::routes::orgs::list_departments,
        crate::routes::orgs::create_department,
        // ── Notifications ────────────────────────────────────────────────
        crate::routes::notifications::list_notifications,
        crate::routes::notifications::mark_read,
        crate::routes::notifications::mark_all_read,
        crate::routes::notifications::clear_notifications,
        // ── Dashboard ────────────────────────────────────────────────────
        crate::routes::dashboard::summary,
        crate::routes::dashboard::ranking,
        crate::routes::dashboard::leaderboard,
        // ── Admin ────────────────────────────────────────────────────────
        crate::routes::admin::weekly_reset,
    ),
    components(schemas(
        crate::error::ErrorBody,
        crate::routes::auth::RegisterRequest,
        crate::routes::auth::LoginRequest,
        crate::routes::auth::OAuthCallbackRequest,
        crate::routes::auth::ResetRequest,
        crate::routes::auth::ResetConfirmRequest,
        crate::routes::auth::SessionResponse,
        crate::routes::auth::AuthorizeUrlResponse,
        crate::routes::users::UserView,
        crate::routes::users::CreateUserRequest,
        crate::routes::users::UpdateUserRequest,
        crate::routes::users::AssignDepartmentsRequest,
        crate::routes::cards::CreateCardRequest,
        crate::routes::cards::RecipientRequest,
        crate::routes::cards::ReactionRequest,
        crate::routes::cards::CommentRequest,
        crate::routes::cards::CardView,
        crate::routes::cards::CardDetailView,
        crate::routes::cards::LikeView,
        crate::routes::cards::ReactionView,
        crate::routes::cards::CommentView,
        crate::routes::orgs::CreateTeamRequest,
        crate::routes::orgs::AddMemberRequest,
        crate::routes::orgs::CreateDepartmentRequest,
        crate::routes::orgs::TeamView,
        crate::routes::orgs::TeamDetailView,
        crate::routes::orgs::DepartmentView,
        crate::routes::notifications::NotificationView,
        crate::routes::notifications::BulkResult,
        crate::routes::dashboard::DashboardSummary,
        crate::routes::dashboard::CounterpartView,
        crate::routes::dashboard::LeaderboardEntry,
        crate::routes::admin::WeeklyResetResponse,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Registration, login, password reset"),
        (name = "users", description = "Accounts and profiles"),
        (name = "cards", description = "Thanks cards"),
        (name = "likes", description = "Point-moving likes"),
        (name = "reactions", description = "Emoji reactions"),
        (name = "comments", description = "Card comments"),
        (name = "orgs", description = "Teams and departments"),
        (name = "notifications", description = "Server-side notification feed"),
        (name = "dashboard", description = "Rankings and summaries"),
        (name = "admin", description = "Operator mutations"),
    )
)]
pub struct ApiDoc;

/// GET /openapi.json — the generated document.
async fn serve_openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Build the OpenAPI router.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(serve_openapi))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_generates_and_covers_core_paths() {
        let spec = ApiDoc::openapi();
        let json = serde_json::to_value(&spec).unwrap();
        let paths = json["paths"].as_object().unwrap();
        for expected in [
            "/api/auth/login",
            "/api/cards",
            "/api/cards/{id}/likes",
            "/api/notifications",
            "/api/dashboard/ranking",
            "/api/admin/weekly-reset",
        ] {
            assert!(paths.contains_key(expected), "missing path {expected}");
        }
    }

    #[test]
    fn spec_declares_error_schema() {
        let spec = ApiDoc::openapi();
        let json = serde_json::to_value(&spec).unwrap();
        assert!(json["components"]["schemas"].get("ErrorBody").is_some());
    }
}
