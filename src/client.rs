//! HTTPS client for the BBRF server.
//!
//! Thin wrapper around `reqwest` that adds the bearer token and knows the
//! handful of endpoints the CLI talks to. Scope lookups never fail: any
//! problem fetching a pattern list degrades to an empty list.

use crate::scope::{ScopeContext, ScopeKind};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Not logged in, run `bbrf login` first")]
    NotLoggedIn,
    #[error("Invalid API URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Login error ({status}): {body}")]
    Login { status: u16, body: String },
    #[error("Unexpected response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Status and raw body of a server response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
}

fn http_client() -> Result<Client, ClientError> {
    // The server usually runs with a self-signed certificate
    let client = Client::builder()
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .user_agent(concat!("bbrf/", env!("CARGO_PKG_VERSION")))
        .danger_accept_invalid_certs(true)
        .build()?;
    Ok(client)
}

fn build_url(api: &str, path: &str, query: &[(&str, &str)]) -> Result<Url, ClientError> {
    let mut url = Url::parse(&format!("{}{}", api.trim().trim_end_matches('/'), path))?;
    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query);
    }
    Ok(url)
}

/// Exchange credentials for a token.
pub async fn login(api: &str, username: &str, password: &str) -> Result<String, ClientError> {
    let client = http_client()?;
    let url = build_url(api, "/login", &[])?;

    log::debug!("POST {url}");
    let response = client
        .post(url)
        .json(&serde_json::json!({ "username": username, "password": password }))
        .send()
        .await?;

    let status = response.status().as_u16();
    let body = response.text().await?;
    if status != 200 {
        return Err(ClientError::Login { status, body });
    }

    let parsed: LoginResponse = serde_json::from_str(&body)?;
    Ok(parsed.token)
}

pub struct ApiClient {
    client: Client,
    api: String,
    token: String,
}

impl ApiClient {
    pub fn new(api: &str, token: &str) -> Result<Self, ClientError> {
        if api.trim().is_empty() || token.trim().is_empty() {
            return Err(ClientError::NotLoggedIn);
        }
        // Reject obviously broken URLs before the first request
        build_url(api, "/", &[])?;

        Ok(Self {
            client: http_client()?,
            api: api.trim().to_string(),
            token: token.trim().to_string(),
        })
    }

    pub fn endpoint(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, ClientError> {
        build_url(&self.api, path, query)
    }

    pub async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<ApiResponse, ClientError> {
        let url = self.endpoint(path, query)?;
        log::debug!("GET {url}");

        let response = self.client.get(url).bearer_auth(&self.token).send().await?;
        Self::into_api_response(response).await
    }

    pub async fn post(&self, path: &str, body: &serde_json::Value) -> Result<ApiResponse, ClientError> {
        let url = self.endpoint(path, &[])?;
        log::debug!("POST {url}");

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await?;
        Self::into_api_response(response).await
    }

    async fn into_api_response(response: reqwest::Response) -> Result<ApiResponse, ClientError> {
        let status = response.status().as_u16();
        let body = response.text().await?;
        if !(200..300).contains(&status) {
            log::warn!("Server answered with status {status}");
        }
        Ok(ApiResponse { status, body })
    }

    pub async fn companies(&self) -> Result<Vec<String>, ClientError> {
        let response = self.get("/api/company/list", &[]).await?;
        Ok(serde_json::from_str(&response.body)?)
    }

    /// Fetch one scope list for `company`. Errors yield an empty list.
    pub async fn fetch_scope(&self, company: &str, kind: ScopeKind) -> Vec<String> {
        let response = self
            .get(
                "/api/scope/show",
                &[("company", company), ("type", kind.as_str())],
            )
            .await;

        match response {
            Ok(response) => patterns_from_response(&response),
            Err(e) => {
                log::warn!("Could not fetch {kind}-scope for {company}, assuming none: {e}");
                Vec::new()
            }
        }
    }

    /// Fetch both scope lists and freeze them into a context for one batch.
    pub async fn load_scope_context(&self, company: &str) -> ScopeContext {
        let in_scope = self.fetch_scope(company, ScopeKind::In).await;
        let out_scope = self.fetch_scope(company, ScopeKind::Out).await;

        log::debug!(
            "Loaded scope for {company}: {} in-scope, {} out-of-scope rules",
            in_scope.len(),
            out_scope.len()
        );
        ScopeContext::from_lists(company, in_scope, out_scope)
    }
}

/// Pattern list from a scope response; non-success statuses count as empty.
pub fn patterns_from_response(response: &ApiResponse) -> Vec<String> {
    if !response.is_success() {
        log::warn!(
            "Scope lookup returned status {}, assuming no rules",
            response.status
        );
        return Vec::new();
    }
    parse_pattern_body(&response.body)
}

/// Accepts a JSON array of strings or newline separated text. Any other
/// JSON yields no rules at all.
pub fn parse_pattern_body(body: &str) -> Vec<String> {
    let body = body.trim();
    if body.is_empty() || body == "null" {
        return Vec::new();
    }

    if body.starts_with('[') || body.starts_with('{') {
        return match serde_json::from_str::<Vec<String>>(body) {
            Ok(patterns) => patterns
                .into_iter()
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect(),
            Err(e) => {
                log::warn!("Scope body is not a JSON string array, assuming no rules: {e}");
                Vec::new()
            }
        };
    }

    body.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
