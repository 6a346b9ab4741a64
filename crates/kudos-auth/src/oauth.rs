//! # OAuth 2.0 Authorization-Code Flow
//!
//! One code path for both supported issuers: Google's endpoints directly,
//! or an AWS Cognito hosted domain that federates Google behind it — the
//! difference is pure endpoint configuration.
//!
//! ## Flow
//!
//! 1. [`OAuthProvider::begin`] — builds the authorization URL with
//!    `openid email profile` scopes and a fresh PKCE challenge, returning
//!    the CSRF state and verifier for the caller to stash server-side
//!    (the API layer keeps them in its pending-authorization store with a
//!    10-minute expiry).
//! 2. [`OAuthProvider::exchange`] — exchanges the callback code plus the
//!    stashed verifier for an access token, then fetches the userinfo
//!    document and normalizes it to [`OAuthUserInfo`].
//!
//! State bookkeeping deliberately does not live here: this crate has no
//! store, so the same flow serves the in-memory and write-through modes.

use oauth2::basic::BasicClient;
use oauth2::reqwest::async_http_client;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, PkceCodeChallenge,
    PkceCodeVerifier, RedirectUrl, Scope, TokenResponse, TokenUrl,
};
use serde::Deserialize;
use url::Url;

use crate::error::AuthError;
use crate::token::SecretString;

/// Google's standard OAuth 2.0 endpoints.
const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

/// A configured OAuth issuer.
#[derive(Debug, Clone)]
pub struct OAuthProvider {
    /// Issuer label stored on the user row (`"google"` / `"cognito"`).
    label: String,
    client_id: ClientId,
    client_secret: SecretString,
    auth_url: AuthUrl,
    token_url: TokenUrl,
    userinfo_url: Url,
    redirect_url: RedirectUrl,
}

/// The server-side half of a started authorization: stash `state` →
/// `pkce_verifier`, hand `auth_url` to the client.
#[derive(Debug, Clone)]
pub struct PendingAuthorization {
    pub auth_url: String,
    pub state: String,
    pub pkce_verifier: String,
}

/// Normalized userinfo claims from either issuer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthUserInfo {
    pub provider: String,
    /// The issuer's stable subject identifier.
    pub subject: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

/// Raw userinfo document. Google uses `id`/`name`; Cognito uses
/// `sub`/`username`.
#[derive(Debug, Deserialize)]
struct UserInfoDocument {
    #[serde(alias = "sub")]
    id: Option<String>,
    email: Option<String>,
    #[serde(alias = "username")]
    name: Option<String>,
}

impl OAuthProvider {
    /// Configure the Google issuer.
    pub fn google(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_url: &str,
    ) -> Result<Self, AuthError> {
        Self::build(
            "google",
            client_id,
            client_secret,
            GOOGLE_AUTH_URL,
            GOOGLE_TOKEN_URL,
            GOOGLE_USERINFO_URL,
            redirect_url,
        )
    }

    /// Configure an AWS Cognito hosted domain (which federates Google
    /// upstream). `domain` is the bare hosted-UI domain, e.g.
    /// `auth.example.com` or `myapp.auth.ap-northeast-1.amazoncognito.com`.
    pub fn cognito(
        domain: &str,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_url: &str,
    ) -> Result<Self, AuthError> {
        let domain = domain.trim().trim_end_matches('/');
        if domain.is_empty() {
            return Err(AuthError::OAuthConfig("cognito domain is empty".to_string()));
        }
        Self::build(
            "cognito",
            client_id,
            client_secret,
            &format!("https://{domain}/oauth2/authorize"),
            &format!("https://{domain}/oauth2/token"),
            &format!("https://{domain}/oauth2/userInfo"),
            redirect_url,
        )
    }

    /// Read provider configuration from the environment.
    ///
    /// Returns `Ok(None)` when `KUDOS_OAUTH_CLIENT_ID` is unset — OAuth
    /// login is simply disabled, matching how the database is optional.
    ///
    /// Variables: `KUDOS_OAUTH_PROVIDER` (`google` default, or
    /// `cognito`), `KUDOS_OAUTH_CLIENT_ID`, `KUDOS_OAUTH_CLIENT_SECRET`,
    /// `KUDOS_OAUTH_REDIRECT_URL`, and `KUDOS_OAUTH_COGNITO_DOMAIN` when
    /// the provider is `cognito`.
    pub fn from_env() -> Result<Option<Self>, AuthError> {
        let client_id = match std::env::var("KUDOS_OAUTH_CLIENT_ID") {
            Ok(v) if !v.is_empty() => v,
            _ => return Ok(None),
        };
        let client_secret = std::env::var("KUDOS_OAUTH_CLIENT_SECRET")
            .map_err(|_| AuthError::OAuthConfig("KUDOS_OAUTH_CLIENT_SECRET is not set".to_string()))?;
        let redirect_url = std::env::var("KUDOS_OAUTH_REDIRECT_URL")
            .map_err(|_| AuthError::OAuthConfig("KUDOS_OAUTH_REDIRECT_URL is not set".to_string()))?;
        let provider =
            std::env::var("KUDOS_OAUTH_PROVIDER").unwrap_or_else(|_| "google".to_string());

        match provider.as_str() {
            "google" => Self::google(client_id, client_secret, &redirect_url).map(Some),
            "cognito" => {
                let domain = std::env::var("KUDOS_OAUTH_COGNITO_DOMAIN").map_err(|_| {
                    AuthError::OAuthConfig("KUDOS_OAUTH_COGNITO_DOMAIN is not set".to_string())
                })?;
                Self::cognito(&domain, client_id, client_secret, &redirect_url).map(Some)
            }
            other => Err(AuthError::OAuthConfig(format!(
                "unknown oauth provider: {other}"
            ))),
        }
    }

    fn build(
        label: &str,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        auth_url: &str,
        token_url: &str,
        userinfo_url: &str,
        redirect_url: &str,
    ) -> Result<Self, AuthError> {
        Ok(Self {
            label: label.to_string(),
            client_id: ClientId::new(client_id.into()),
            client_secret: SecretString::new(client_secret),
            auth_url: AuthUrl::new(auth_url.to_string())
                .map_err(|e| AuthError::OAuthConfig(format!("bad auth url: {e}")))?,
            token_url: TokenUrl::new(token_url.to_string())
                .map_err(|e| AuthError::OAuthConfig(format!("bad token url: {e}")))?,
            userinfo_url: Url::parse(userinfo_url)
                .map_err(|e| AuthError::OAuthConfig(format!("bad userinfo url: {e}")))?,
            redirect_url: RedirectUrl::new(redirect_url.to_string())
                .map_err(|e| AuthError::OAuthConfig(format!("bad redirect url: {e}")))?,
        })
    }

    /// The issuer label stored on linked user rows.
    pub fn label(&self) -> &str {
        &self.label
    }

    fn client(&self) -> BasicClient {
        BasicClient::new(
            self.client_id.clone(),
            Some(ClientSecret::new(self.client_secret.expose().to_string())),
            self.auth_url.clone(),
            Some(self.token_url.clone()),
        )
        .set_redirect_uri(self.redirect_url.clone())
    }

    /// Start an authorization: build the URL and the PKCE material.
    pub fn begin(&self) -> PendingAuthorization {
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();
        let (auth_url, csrf_state) = self
            .client()
            .authorize_url(CsrfToken::new_random)
            .add_scope(Scope::new("openid".to_string()))
            .add_scope(Scope::new("email".to_string()))
            .add_scope(Scope::new("profile".to_string()))
            .set_pkce_challenge(pkce_challenge)
            .url();

        PendingAuthorization {
            auth_url: auth_url.to_string(),
            state: csrf_state.secret().clone(),
            pkce_verifier: pkce_verifier.secret().clone(),
        }
    }

    /// Exchange a callback code (plus the stashed PKCE verifier) for the
    /// issuer's userinfo claims.
    pub async fn exchange(
        &self,
        code: &str,
        pkce_verifier: String,
    ) -> Result<OAuthUserInfo, AuthError> {
        let token = self
            .client()
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .set_pkce_verifier(PkceCodeVerifier::new(pkce_verifier))
            .request_async(async_http_client)
            .await
            .map_err(|e| AuthError::OAuthExchange(e.to_string()))?;

        let access_token = token.access_token().secret();

        let document: UserInfoDocument = reqwest::Client::new()
            .get(self.userinfo_url.clone())
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AuthError::OAuthUserInfo(e.to_string()))?
            .error_for_status()
            .map_err(|e| AuthError::OAuthUserInfo(e.to_string()))?
            .json()
            .await
            .map_err(|e| AuthError::OAuthUserInfo(e.to_string()))?;

        let subject = document
            .id
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AuthError::OAuthUserInfo("missing subject claim".to_string()))?;

        tracing::debug!(provider = %self.label, "oauth userinfo fetched");

        Ok(OAuthUserInfo {
            provider: self.label.clone(),
            subject,
            email: document.email,
            display_name: document.name,
        })
    }
}
