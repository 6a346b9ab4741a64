//! # Integration Tests for kudos-api
//!
//! Drives the assembled router in memory-only mode: registration and
//! sessions, card creation and the point ledger (budget debits, the
//! 2-point like split, the 30-point per-card cap, refunds), reactions,
//! comments, notifications with server-side clear, dashboards, admin
//! moderation, and the weekly reset.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use kudos_api::state::AppState;

fn test_app() -> axum::Router {
    kudos_api::app(AppState::new())
}

async fn body_json(response: axum::http::Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
}

async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> axum::http::Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.clone().oneshot(request).await.unwrap()
}

/// Register a user, returning (token, user_id). The first registration on
/// a fresh app becomes the admin.
async fn register(app: &axum::Router, email: &str, name: &str) -> (String, String) {
    let response = send(
        app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({"email": email, "display_name": name, "password": "hunter2hunter2"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    (
        body["token"].as_str().unwrap().to_string(),
        body["user"]["id"].as_str().unwrap().to_string(),
    )
}

/// Fetch the caller's own point summary.
async fn me(app: &axum::Router, token: &str) -> Value {
    let response = send(app, "GET", "/api/auth/me", Some(token), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await
}

/// Send a card between two users, returning the card id.
async fn send_card(
    app: &axum::Router,
    token: &str,
    recipient: &str,
    points: u32,
) -> String {
    let response = send(
        app,
        "POST",
        "/api/cards",
        Some(token),
        Some(json!({
            "recipient": {"kind": "user", "id": recipient},
            "message": "thanks for the review!",
            "points": points,
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["id"].as_str().unwrap().to_string()
}

// -- Health Probes ------------------------------------------------------------

#[tokio::test]
async fn test_liveness_probe() {
    let app = test_app();
    let response = send(&app, "GET", "/health/liveness", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_readiness_probe() {
    let app = test_app();
    let response = send(&app, "GET", "/health/readiness", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_metrics_endpoint_is_unauthenticated() {
    let app = test_app();
    let response = send(&app, "GET", "/metrics", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("kudos_users_total"));
}

// -- Auth ---------------------------------------------------------------------

#[tokio::test]
async fn test_register_sets_session_cookie() {
    let app = test_app();
    let response = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({
            "email": "taro@example.com",
            "display_name": "Taro",
            "password": "hunter2hunter2"
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let cookie = response
        .headers()
        .get("set-cookie")
        .and_then(|v| v.to_str().ok())
        .unwrap();
    assert!(cookie.starts_with("kudos_session="));
    assert!(cookie.contains("HttpOnly"));

    let body = body_json(response).await;
    assert_eq!(body["user"]["weekly_points"], 140);
    // First user becomes admin.
    assert_eq!(body["user"]["is_admin"], true);
}

#[tokio::test]
async fn test_second_registration_is_not_admin() {
    let app = test_app();
    register(&app, "first@example.com", "First").await;
    let response = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({
            "email": "second@example.com",
            "display_name": "Second",
            "password": "hunter2hunter2"
        })),
    )
    .await;
    let body = body_json(response).await;
    assert_eq!(body["user"]["is_admin"], false);
}

#[tokio::test]
async fn test_duplicate_email_rejected() {
    let app = test_app();
    register(&app, "taro@example.com", "Taro").await;
    let response = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({
            "email": "TARO@example.com",
            "display_name": "Taro Again",
            "password": "hunter2hunter2"
        })),
    )
    .await;
    // Emails are normalized, so differing case is the same account.
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_short_password_rejected() {
    let app = test_app();
    let response = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({
            "email": "taro@example.com",
            "display_name": "Taro",
            "password": "short"
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_and_wrong_password() {
    let app = test_app();
    register(&app, "taro@example.com", "Taro").await;

    let ok = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"email": "taro@example.com", "password": "hunter2hunter2"})),
    )
    .await;
    assert_eq!(ok.status(), StatusCode::OK);

    let bad = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"email": "taro@example.com", "password": "wrong-password"})),
    )
    .await;
    assert_eq!(bad.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(bad).await;
    assert_eq!(body["message"], "invalid email or password");
}

#[tokio::test]
async fn test_protected_routes_require_session() {
    let app = test_app();
    let response = send(&app, "GET", "/api/cards", None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send(&app, "GET", "/api/cards", Some("bogus-token"), None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_session_cookie_authenticates() {
    let app = test_app();
    let (token, _) = register(&app, "taro@example.com", "Taro").await;

    let request = Request::builder()
        .uri("/api/auth/me")
        .header("cookie", format!("theme=dark; kudos_session={token}"))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_logout_revokes_session() {
    let app = test_app();
    let (token, _) = register(&app, "taro@example.com", "Taro").await;

    let response = send(&app, "POST", "/api/auth/logout", Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = send(&app, "GET", "/api/auth/me", Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_oauth_unconfigured_returns_503() {
    let app = test_app();
    let response = send(&app, "GET", "/api/auth/oauth/authorize-url", None, None).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_password_reset_request_never_discloses_accounts() {
    let app = test_app();
    register(&app, "taro@example.com", "Taro").await;

    let known = send(
        &app,
        "POST",
        "/api/auth/password-reset/request",
        None,
        Some(json!({"email": "taro@example.com"})),
    )
    .await;
    let unknown = send(
        &app,
        "POST",
        "/api/auth/password-reset/request",
        None,
        Some(json!({"email": "nobody@example.com"})),
    )
    .await;
    assert_eq!(known.status(), StatusCode::ACCEPTED);
    assert_eq!(unknown.status(), StatusCode::ACCEPTED);
}

#[tokio::test]
async fn test_password_reset_confirm_with_bogus_token() {
    let app = test_app();
    let response = send(
        &app,
        "POST",
        "/api/auth/password-reset/confirm",
        None,
        Some(json!({"token": "deadbeef", "new_password": "hunter2hunter2"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// -- Cards --------------------------------------------------------------------

#[tokio::test]
async fn test_card_message_over_140_chars_rejected() {
    let app = test_app();
    let (token, _) = register(&app, "a@example.com", "A").await;
    let (_, bob) = register(&app, "b@example.com", "B").await;

    let response = send(
        &app,
        "POST",
        "/api/cards",
        Some(&token),
        Some(json!({
            "recipient": {"kind": "user", "id": bob},
            "message": "x".repeat(141),
            "points": 0,
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["message"].as_str().unwrap().contains("140"));
}

#[tokio::test]
async fn test_card_points_over_140_rejected() {
    let app = test_app();
    let (token, _) = register(&app, "a@example.com", "A").await;
    let (_, bob) = register(&app, "b@example.com", "B").await;

    let response = send(
        &app,
        "POST",
        "/api/cards",
        Some(&token),
        Some(json!({
            "recipient": {"kind": "user", "id": bob},
            "message": "hi",
            "points": 141,
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_card_to_self_rejected() {
    let app = test_app();
    let (token, alice) = register(&app, "a@example.com", "A").await;

    let response = send(
        &app,
        "POST",
        "/api/cards",
        Some(&token),
        Some(json!({
            "recipient": {"kind": "user", "id": alice},
            "message": "self five",
            "points": 0,
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_card_grant_debits_sender_and_credits_recipient() {
    let app = test_app();
    let (alice_token, _) = register(&app, "a@example.com", "A").await;
    let (bob_token, bob) = register(&app, "b@example.com", "B").await;

    send_card(&app, &alice_token, &bob, 40).await;

    let alice = me(&app, &alice_token).await;
    assert_eq!(alice["weekly_points"], 100);

    let bob = me(&app, &bob_token).await;
    assert_eq!(bob["weekly_points"], 140);
    assert_eq!(bob["weekly_points_received"], 40);
    assert_eq!(bob["total_points_received"], 40);
}

#[tokio::test]
async fn test_card_over_budget_rejected() {
    let app = test_app();
    let (alice_token, _) = register(&app, "a@example.com", "A").await;
    let (_, bob) = register(&app, "b@example.com", "B").await;

    send_card(&app, &alice_token, &bob, 140).await;

    // Budget exhausted: a 1-point card must fail, a 0-point card still works.
    let response = send(
        &app,
        "POST",
        "/api/cards",
        Some(&alice_token),
        Some(json!({
            "recipient": {"kind": "user", "id": bob},
            "message": "one more point",
            "points": 1,
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["message"].as_str().unwrap().contains("insufficient"));

    let response = send(
        &app,
        "POST",
        "/api/cards",
        Some(&alice_token),
        Some(json!({
            "recipient": {"kind": "user", "id": bob},
            "message": "zero point thanks",
            "points": 0,
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_card_timeline_lists_newest_first() {
    let app = test_app();
    let (token, _) = register(&app, "a@example.com", "A").await;
    let (_, bob) = register(&app, "b@example.com", "B").await;

    let first = send_card(&app, &token, &bob, 1).await;
    let second = send_card(&app, &token, &bob, 2).await;

    let response = send(&app, "GET", "/api/cards", Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let cards = body.as_array().unwrap();
    assert_eq!(cards.len(), 2);
    let ids: Vec<&str> = cards.iter().map(|c| c["id"].as_str().unwrap()).collect();
    assert!(ids == vec![second.as_str(), first.as_str()] || cards[0]["created_at"] == cards[1]["created_at"]);
}

#[tokio::test]
async fn test_hidden_card_is_invisible_to_non_admins() {
    let app = test_app();
    let (admin_token, _) = register(&app, "admin@example.com", "Admin").await;
    let (alice_token, _) = register(&app, "a@example.com", "A").await;
    let (_, bob) = register(&app, "b@example.com", "B").await;

    let card = send_card(&app, &alice_token, &bob, 0).await;

    // Only admins may hide.
    let response = send(
        &app,
        "POST",
        &format!("/api/cards/{card}/hide"),
        Some(&alice_token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send(
        &app,
        "POST",
        &format!("/api/cards/{card}/hide"),
        Some(&admin_token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    // Hidden cards 404 for regular users, even the sender.
    let response = send(
        &app,
        "GET",
        &format!("/api/cards/{card}"),
        Some(&alice_token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Admin still sees it and can unhide.
    let response = send(
        &app,
        "GET",
        &format!("/api/cards/{card}"),
        Some(&admin_token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(
        &app,
        "POST",
        &format!("/api/cards/{card}/unhide"),
        Some(&admin_token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(
        &app,
        "GET",
        &format!("/api/cards/{card}"),
        Some(&alice_token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

// -- Likes --------------------------------------------------------------------

#[tokio::test]
async fn test_like_moves_two_points() {
    let app = test_app();
    let (alice_token, _) = register(&app, "a@example.com", "A").await;
    let (bob_token, bob) = register(&app, "b@example.com", "B").await;
    let (carol_token, _) = register(&app, "c@example.com", "C").await;

    let card = send_card(&app, &alice_token, &bob, 0).await;

    let response = send(
        &app,
        "POST",
        &format!("/api/cards/{card}/likes"),
        Some(&carol_token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let carol = me(&app, &carol_token).await;
    assert_eq!(carol["weekly_points"], 138);

    let alice = me(&app, &alice_token).await;
    assert_eq!(alice["total_points_received"], 1);

    let bob = me(&app, &bob_token).await;
    assert_eq!(bob["total_points_received"], 1);
}

#[tokio::test]
async fn test_liking_twice_deducts_four_points() {
    let app = test_app();
    let (alice_token, _) = register(&app, "a@example.com", "A").await;
    let (_, bob) = register(&app, "b@example.com", "B").await;
    let (carol_token, _) = register(&app, "c@example.com", "C").await;

    let card = send_card(&app, &alice_token, &bob, 0).await;
    for _ in 0..2 {
        let response = send(
            &app,
            "POST",
            &format!("/api/cards/{card}/likes"),
            Some(&carol_token),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let carol = me(&app, &carol_token).await;
    assert_eq!(carol["weekly_points"], 136);
}

#[tokio::test]
async fn test_sixteenth_like_rejected_at_cap() {
    let app = test_app();
    let (alice_token, _) = register(&app, "a@example.com", "A").await;
    let (_, bob) = register(&app, "b@example.com", "B").await;
    let (carol_token, _) = register(&app, "c@example.com", "C").await;

    let card = send_card(&app, &alice_token, &bob, 0).await;
    for _ in 0..15 {
        let response = send(
            &app,
            "POST",
            &format!("/api/cards/{card}/likes"),
            Some(&carol_token),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = send(
        &app,
        "POST",
        &format!("/api/cards/{card}/likes"),
        Some(&carol_token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // 15 likes × 2 points spent, not 16.
    let carol = me(&app, &carol_token).await;
    assert_eq!(carol["weekly_points"], 140 - 30);
}

#[tokio::test]
async fn test_sender_and_recipient_cannot_like() {
    let app = test_app();
    let (alice_token, _) = register(&app, "a@example.com", "A").await;
    let (bob_token, bob) = register(&app, "b@example.com", "B").await;

    let card = send_card(&app, &alice_token, &bob, 0).await;

    let self_like = send(
        &app,
        "POST",
        &format!("/api/cards/{card}/likes"),
        Some(&alice_token),
        None,
    )
    .await;
    assert_eq!(self_like.status(), StatusCode::BAD_REQUEST);

    let recipient_like = send(
        &app,
        "POST",
        &format!("/api/cards/{card}/likes"),
        Some(&bob_token),
        None,
    )
    .await;
    assert_eq!(recipient_like.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unlike_refunds_and_reverses_credits() {
    let app = test_app();
    let (alice_token, _) = register(&app, "a@example.com", "A").await;
    let (bob_token, bob) = register(&app, "b@example.com", "B").await;
    let (carol_token, _) = register(&app, "c@example.com", "C").await;

    let card = send_card(&app, &alice_token, &bob, 0).await;
    let response = send(
        &app,
        "POST",
        &format!("/api/cards/{card}/likes"),
        Some(&carol_token),
        None,
    )
    .await;
    let like = body_json(response).await["id"].as_str().unwrap().to_string();

    let response = send(
        &app,
        "DELETE",
        &format!("/api/cards/{card}/likes/{like}"),
        Some(&carol_token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    assert_eq!(me(&app, &carol_token).await["weekly_points"], 140);
    assert_eq!(me(&app, &alice_token).await["total_points_received"], 0);
    assert_eq!(me(&app, &bob_token).await["total_points_received"], 0);
}

#[tokio::test]
async fn test_unlike_by_non_owner_forbidden() {
    let app = test_app();
    let (alice_token, _) = register(&app, "a@example.com", "A").await;
    let (_, bob) = register(&app, "b@example.com", "B").await;
    let (carol_token, _) = register(&app, "c@example.com", "C").await;
    let (dave_token, _) = register(&app, "d@example.com", "D").await;

    let card = send_card(&app, &alice_token, &bob, 0).await;
    let response = send(
        &app,
        "POST",
        &format!("/api/cards/{card}/likes"),
        Some(&carol_token),
        None,
    )
    .await;
    let like = body_json(response).await["id"].as_str().unwrap().to_string();

    let response = send(
        &app,
        "DELETE",
        &format!("/api/cards/{card}/likes/{like}"),
        Some(&dave_token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// -- Reactions & Comments -----------------------------------------------------

#[tokio::test]
async fn test_reaction_is_one_per_user_and_replaceable() {
    let app = test_app();
    let (alice_token, _) = register(&app, "a@example.com", "A").await;
    let (_, bob) = register(&app, "b@example.com", "B").await;
    let (carol_token, _) = register(&app, "c@example.com", "C").await;

    let card = send_card(&app, &alice_token, &bob, 0).await;

    let first = send(
        &app,
        "PUT",
        &format!("/api/cards/{card}/reaction"),
        Some(&carol_token),
        Some(json!({"emoji": "👍"})),
    )
    .await;
    assert_eq!(first.status(), StatusCode::OK);

    let replaced = send(
        &app,
        "PUT",
        &format!("/api/cards/{card}/reaction"),
        Some(&carol_token),
        Some(json!({"emoji": "🎉"})),
    )
    .await;
    assert_eq!(replaced.status(), StatusCode::OK);
    assert_eq!(body_json(replaced).await["emoji"], "🎉");

    // Still a single reaction on the card.
    let detail = send(&app, "GET", &format!("/api/cards/{card}"), Some(&carol_token), None).await;
    let body = body_json(detail).await;
    assert_eq!(body["reactions"].as_array().unwrap().len(), 1);

    // Reactions never cost points.
    assert_eq!(me(&app, &carol_token).await["weekly_points"], 140);

    let removed = send(
        &app,
        "DELETE",
        &format!("/api/cards/{card}/reaction"),
        Some(&carol_token),
        None,
    )
    .await;
    assert_eq!(removed.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_comment_author_only_edit_and_delete() {
    let app = test_app();
    let (alice_token, _) = register(&app, "a@example.com", "A").await;
    let (bob_token, bob) = register(&app, "b@example.com", "B").await;
    let (carol_token, _) = register(&app, "c@example.com", "C").await;

    let card = send_card(&app, &alice_token, &bob, 0).await;

    let response = send(
        &app,
        "POST",
        &format!("/api/cards/{card}/comments"),
        Some(&carol_token),
        Some(json!({"body": "great work"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let comment = body_json(response).await["id"].as_str().unwrap().to_string();

    let response = send(
        &app,
        "PATCH",
        &format!("/api/comments/{comment}"),
        Some(&bob_token),
        Some(json!({"body": "hijacked"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send(
        &app,
        "PATCH",
        &format!("/api/comments/{comment}"),
        Some(&carol_token),
        Some(json!({"body": "great work — edited"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["body"], "great work — edited");

    let response = send(
        &app,
        "DELETE",
        &format!("/api/comments/{comment}"),
        Some(&carol_token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

// -- Teams --------------------------------------------------------------------

#[tokio::test]
async fn test_team_card_credits_team_and_blocks_member_likes() {
    let app = test_app();
    let (admin_token, _) = register(&app, "admin@example.com", "Admin").await;
    let (alice_token, _) = register(&app, "a@example.com", "A").await;
    let (bob_token, bob) = register(&app, "b@example.com", "B").await;
    let (carol_token, _) = register(&app, "c@example.com", "C").await;

    let response = send(
        &app,
        "POST",
        "/api/teams",
        Some(&admin_token),
        Some(json!({"name": "Platform"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let team = body_json(response).await["id"].as_str().unwrap().to_string();

    let response = send(
        &app,
        "POST",
        &format!("/api/teams/{team}/members"),
        Some(&admin_token),
        Some(json!({"user_id": bob})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    // Card from Alice to the team.
    let response = send(
        &app,
        "POST",
        "/api/cards",
        Some(&alice_token),
        Some(json!({
            "recipient": {"kind": "team", "id": team},
            "message": "great sprint everyone",
            "points": 30,
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let card = body_json(response).await["id"].as_str().unwrap().to_string();

    assert_eq!(me(&app, &alice_token).await["weekly_points"], 110);

    // The allocation lands on the team counter, not on Bob.
    let response = send(&app, "GET", &format!("/api/teams/{team}"), Some(&alice_token), None).await;
    let body = body_json(response).await;
    assert_eq!(body["total_points_received"], 30);
    assert_eq!(me(&app, &bob_token).await["total_points_received"], 0);

    // Team members count as recipients for like eligibility.
    let response = send(
        &app,
        "POST",
        &format!("/api/cards/{card}/likes"),
        Some(&bob_token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // An outsider's like credits the team one point.
    let response = send(
        &app,
        "POST",
        &format!("/api/cards/{card}/likes"),
        Some(&carol_token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let response = send(&app, "GET", &format!("/api/teams/{team}"), Some(&alice_token), None).await;
    assert_eq!(body_json(response).await["total_points_received"], 31);
}

#[tokio::test]
async fn test_team_creation_is_admin_only() {
    let app = test_app();
    register(&app, "admin@example.com", "Admin").await;
    let (alice_token, _) = register(&app, "a@example.com", "A").await;

    let response = send(
        &app,
        "POST",
        "/api/teams",
        Some(&alice_token),
        Some(json!({"name": "Rogue"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// -- Notifications ------------------------------------------------------------

#[tokio::test]
async fn test_notifications_created_and_cleared_server_side() {
    let app = test_app();
    let (alice_token, _) = register(&app, "a@example.com", "A").await;
    let (bob_token, bob) = register(&app, "b@example.com", "B").await;

    send_card(&app, &alice_token, &bob, 5).await;

    let response = send(&app, "GET", "/api/notifications", Some(&bob_token), None).await;
    let body = body_json(response).await;
    let feed = body.as_array().unwrap();
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0]["kind"], "card_received");
    assert!(feed[0]["read_at"].is_null());

    // Mark read, then unread-only filter is empty.
    let id = feed[0]["id"].as_str().unwrap();
    let response = send(
        &app,
        "POST",
        &format!("/api/notifications/{id}/read"),
        Some(&bob_token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(
        &app,
        "GET",
        "/api/notifications?unread_only=true",
        Some(&bob_token),
        None,
    )
    .await;
    assert!(body_json(response).await.as_array().unwrap().is_empty());

    // Server-side clear: the feed stays empty for any future session.
    let response = send(&app, "DELETE", "/api/notifications", Some(&bob_token), None).await;
    assert_eq!(body_json(response).await["affected"], 1);

    let response = send(&app, "GET", "/api/notifications", Some(&bob_token), None).await;
    assert!(body_json(response).await.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_like_notifies_sender_and_recipient() {
    let app = test_app();
    let (alice_token, _) = register(&app, "a@example.com", "A").await;
    let (bob_token, bob) = register(&app, "b@example.com", "B").await;
    let (carol_token, _) = register(&app, "c@example.com", "C").await;

    let card = send_card(&app, &alice_token, &bob, 0).await;
    send(
        &app,
        "POST",
        &format!("/api/cards/{card}/likes"),
        Some(&carol_token),
        None,
    )
    .await;

    let response = send(&app, "GET", "/api/notifications", Some(&alice_token), None).await;
    let body = body_json(response).await;
    let kinds: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["kind"].as_str().unwrap())
        .collect();
    assert!(kinds.contains(&"card_liked"));

    let response = send(&app, "GET", "/api/notifications", Some(&bob_token), None).await;
    let body = body_json(response).await;
    let kinds: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["kind"].as_str().unwrap())
        .collect();
    assert!(kinds.contains(&"card_liked"));
}

// -- Dashboard ----------------------------------------------------------------

#[tokio::test]
async fn test_dashboard_summary_counts() {
    let app = test_app();
    let (alice_token, _) = register(&app, "a@example.com", "A").await;
    let (bob_token, bob) = register(&app, "b@example.com", "B").await;
    let (carol_token, _) = register(&app, "c@example.com", "C").await;

    let card = send_card(&app, &alice_token, &bob, 10).await;
    send(
        &app,
        "POST",
        &format!("/api/cards/{card}/likes"),
        Some(&carol_token),
        None,
    )
    .await;

    let response = send(&app, "GET", "/api/dashboard/me", Some(&alice_token), None).await;
    let body = body_json(response).await;
    assert_eq!(body["cards_sent"], 1);
    assert_eq!(body["likes_received"], 1);
    assert_eq!(body["weekly_points"], 130);

    let response = send(&app, "GET", "/api/dashboard/me", Some(&bob_token), None).await;
    let body = body_json(response).await;
    assert_eq!(body["cards_received"], 1);
    assert_eq!(body["weekly_points_received"], 11);
}

#[tokio::test]
async fn test_ranking_returns_counterparts() {
    let app = test_app();
    let (alice_token, _) = register(&app, "a@example.com", "A").await;
    let (_, bob) = register(&app, "b@example.com", "B").await;
    let (_, carol) = register(&app, "c@example.com", "C").await;

    send_card(&app, &alice_token, &bob, 1).await;
    send_card(&app, &alice_token, &bob, 1).await;
    send_card(&app, &alice_token, &carol, 1).await;

    let response = send(&app, "GET", "/api/dashboard/ranking", Some(&alice_token), None).await;
    let body = body_json(response).await;
    let standings = body.as_array().unwrap();
    assert_eq!(standings.len(), 2);
    assert_eq!(standings[0]["user_id"], bob.as_str());
    assert_eq!(standings[0]["cards_sent"], 2);
}

#[tokio::test]
async fn test_ranking_of_other_users_is_admin_only() {
    let app = test_app();
    let (admin_token, _) = register(&app, "admin@example.com", "Admin").await;
    let (alice_token, alice) = register(&app, "a@example.com", "A").await;

    let response = send(
        &app,
        "GET",
        &format!("/api/dashboard/ranking?user_id={alice}"),
        Some(&admin_token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let admin_id = me(&app, &admin_token).await["id"].as_str().unwrap().to_string();
    let response = send(
        &app,
        "GET",
        &format!("/api/dashboard/ranking?user_id={admin_id}"),
        Some(&alice_token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_leaderboard_orders_by_received_points() {
    let app = test_app();
    let (alice_token, _) = register(&app, "a@example.com", "A").await;
    let (_, bob) = register(&app, "b@example.com", "B").await;
    let (_, carol) = register(&app, "c@example.com", "C").await;

    send_card(&app, &alice_token, &bob, 50).await;
    send_card(&app, &alice_token, &carol, 20).await;

    let response = send(&app, "GET", "/api/dashboard/leaderboard", Some(&alice_token), None).await;
    let body = body_json(response).await;
    let entries = body.as_array().unwrap();
    assert_eq!(entries[0]["user_id"], bob.as_str());
    assert_eq!(entries[0]["points"], 50);
    assert_eq!(entries[1]["user_id"], carol.as_str());
}

// -- Weekly Reset -------------------------------------------------------------

#[tokio::test]
async fn test_weekly_reset_restores_budgets() {
    let app = test_app();
    let (admin_token, _) = register(&app, "admin@example.com", "Admin").await;
    let (alice_token, _) = register(&app, "a@example.com", "A").await;
    let (bob_token, bob) = register(&app, "b@example.com", "B").await;

    send_card(&app, &alice_token, &bob, 100).await;
    assert_eq!(me(&app, &alice_token).await["weekly_points"], 40);
    assert_eq!(me(&app, &bob_token).await["weekly_points_received"], 100);

    // Non-admins cannot reset.
    let response = send(&app, "POST", "/api/admin/weekly-reset", Some(&alice_token), None).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send(&app, "POST", "/api/admin/weekly-reset", Some(&admin_token), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["users_reset"], 3);

    let alice = me(&app, &alice_token).await;
    assert_eq!(alice["weekly_points"], 140);

    // Weekly received zeroed, totals kept.
    let bob = me(&app, &bob_token).await;
    assert_eq!(bob["weekly_points_received"], 0);
    assert_eq!(bob["total_points_received"], 100);
}

// -- Users --------------------------------------------------------------------

#[tokio::test]
async fn test_admin_provisioning_and_deactivation() {
    let app = test_app();
    let (admin_token, _) = register(&app, "admin@example.com", "Admin").await;

    let response = send(
        &app,
        "POST",
        "/api/users",
        Some(&admin_token),
        Some(json!({"email": "new@example.com", "display_name": "New Hire"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let new_user = body_json(response).await["id"].as_str().unwrap().to_string();

    let response = send(
        &app,
        "DELETE",
        &format!("/api/users/{new_user}"),
        Some(&admin_token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // Soft delete: the row survives with is_active = false.
    let response = send(
        &app,
        "GET",
        &format!("/api/users/{new_user}"),
        Some(&admin_token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["is_active"], false);
}

#[tokio::test]
async fn test_profile_edit_is_self_or_admin() {
    let app = test_app();
    register(&app, "admin@example.com", "Admin").await;
    let (alice_token, alice) = register(&app, "a@example.com", "A").await;
    let (bob_token, _) = register(&app, "b@example.com", "B").await;

    let response = send(
        &app,
        "PATCH",
        &format!("/api/users/{alice}"),
        Some(&bob_token),
        Some(json!({"display_name": "Not Yours"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send(
        &app,
        "PATCH",
        &format!("/api/users/{alice}"),
        Some(&alice_token),
        Some(json!({"display_name": "Alice Prime"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["display_name"], "Alice Prime");
}

// -- OpenAPI ------------------------------------------------------------------

#[tokio::test]
async fn test_openapi_served_behind_auth() {
    let app = test_app();
    let response = send(&app, "GET", "/openapi.json", None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let (token, _) = register(&app, "a@example.com", "A").await;
    let response = send(&app, "GET", "/openapi.json", Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["paths"]["/api/cards"].is_object());
}
