//! # API Client
//!
//! Shared HTTP plumbing for the subcommands: base URL and token handling,
//! JSON decoding, and error-body surfacing.

use anyhow::{bail, Context, Result};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// The server's error body shape.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Configured client for one API endpoint.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    /// Build a client. `base_url` has any trailing slash trimmed; `token`
    /// is the session token sent as a bearer header when present.
    pub fn new(base_url: &str, token: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{path}", self.base_url);
        let builder = self.http.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn handle<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        if status.is_success() {
            response.json().await.context("decoding response body")
        } else {
            let message = response
                .json::<ErrorBody>()
                .await
                .map(|body| body.message)
                .unwrap_or_else(|_| format!("HTTP {status}"));
            bail!("{status}: {message}");
        }
    }

    /// GET a JSON document.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.request(Method::GET, path).send().await?;
        Self::handle(response).await
    }

    /// POST a JSON body, decode a JSON response.
    pub async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T> {
        let response = self.request(Method::POST, path).json(body).send().await?;
        Self::handle(response).await
    }

    /// POST with no body, expect 2xx, decode a JSON response.
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.request(Method::POST, path).send().await?;
        Self::handle(response).await
    }

    /// DELETE, expecting an empty 2xx.
    pub async fn delete(&self, path: &str) -> Result<()> {
        let response = self.request(Method::DELETE, path).send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let message = response
                .json::<ErrorBody>()
                .await
                .map(|body| body.message)
                .unwrap_or_else(|_| format!("HTTP {status}"));
            bail!("{status}: {message}");
        }
    }

    /// GET returning the raw body and status (health probes are plain
    /// text, not JSON).
    pub async fn get_text(&self, path: &str) -> Result<(StatusCode, String)> {
        let response = self.request(Method::GET, path).send().await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Ok((status, body))
    }
}
