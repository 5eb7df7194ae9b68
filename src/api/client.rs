//! HTTP plumbing shared by every endpoint.
//!
//! Authenticated requests go through [`ApiClient::send`]:
//!
//! 1. attach `Authorization: Bearer <access>` if a session is stored;
//! 2. on 401, if a refresh token is stored, exchange it once;
//! 3. on success, save the new pair and replay the request once. A second
//!    401 goes back to the caller as is;
//! 4. if the refresh itself fails, the stored credentials are cleared.
//!
//! Login, registration and the refresh call itself bypass this path.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use super::ApiError;
use crate::auth::{TokenPair, TokenStorage};
use crate::consts::{HTTP_TIMEOUT_SECS, USER_AGENT};

/// Longest slice of a response body quoted in error messages.
const BODY_SNIPPET: usize = 200;

pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
    tokens: Arc<TokenStorage>,
}

/// A request that can be replayed after a refresh.
pub(super) struct Call<'a> {
    pub method: Method,
    pub path: &'a str,
    pub query: &'a [(&'a str, String)],
    pub body: Option<Value>,
}

impl<'a> Call<'a> {
    pub fn get(path: &'a str, query: &'a [(&'a str, String)]) -> Self {
        Self {
            method: Method::GET,
            path,
            query,
            body: None,
        }
    }

    pub fn with_body(method: Method, path: &'a str, body: Value) -> Self {
        Self {
            method,
            path,
            query: &[],
            body: Some(body),
        }
    }

    pub fn delete(path: &'a str) -> Self {
        Self {
            method: Method::DELETE,
            path,
            query: &[],
            body: None,
        }
    }
}

impl ApiClient {
    pub fn new(base_url: &str, tokens: Arc<TokenStorage>) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            http,
            tokens,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn tokens(&self) -> &TokenStorage {
        &self.tokens
    }

    pub(super) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// A request that skips the token handling entirely.
    pub(super) fn anonymous(&self, method: Method, path: &str) -> RequestBuilder {
        self.http.request(method, self.url(path))
    }

    pub(super) async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let resp = self.send(Call::get(path, query)).await?;
        decode(resp).await
    }

    pub(super) async fn send_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let body = serde_json::to_value(body).map_err(ApiError::invalid)?;
        let resp = self.send(Call::with_body(method, path, body)).await?;
        decode(resp).await
    }

    pub(super) async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.send(Call::delete(path)).await?;
        Ok(())
    }

    /// Send with the stored token, refreshing and replaying once on 401.
    pub(super) async fn send(&self, call: Call<'_>) -> Result<Response, ApiError> {
        let session = self.tokens.get()?;
        let access = session.as_ref().map(|s| s.tokens.access_token.as_str());

        let resp = self.dispatch(&call, access).await?;
        if resp.status() != StatusCode::UNAUTHORIZED {
            return ensure_success(resp).await;
        }
        let Some(session) = session else {
            return ensure_success(resp).await;
        };
        let rejected = failure(resp).await;

        debug!(path = call.path, "access token rejected, refreshing");
        let tokens = match self.refresh(&session.tokens.refresh_token).await {
            Ok(tokens) => tokens,
            Err(e) => {
                warn!(error = %e, "token refresh failed, clearing stored credentials");
                self.tokens.clear()?;
                return Err(rejected);
            }
        };
        self.tokens.update_tokens(tokens.clone())?;

        let retried = self.dispatch(&call, Some(&tokens.access_token)).await?;
        ensure_success(retried).await
    }

    async fn dispatch(&self, call: &Call<'_>, access: Option<&str>) -> Result<Response, ApiError> {
        let mut req = self.http.request(call.method.clone(), self.url(call.path));
        if !call.query.is_empty() {
            req = req.query(call.query);
        }
        if let Some(token) = access {
            req = req.bearer_auth(token);
        }
        if let Some(body) = &call.body {
            req = req.json(body);
        }
        Ok(req.send().await?)
    }

    /// Exchange a refresh token for a new pair. Does not touch storage.
    ///
    /// The token goes both in the query string and the JSON body; backend
    /// versions have read it from either.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, ApiError> {
        let resp = self
            .anonymous(Method::POST, "/auth/refresh")
            .query(&[("refresh_token", refresh_token)])
            .json(&serde_json::json!({ "refresh_token": refresh_token }))
            .send()
            .await?;
        decode(ensure_success(resp).await?).await
    }
}

/// Pass 2xx responses through; turn anything else into an [`ApiError`].
pub(super) async fn ensure_success(resp: Response) -> Result<Response, ApiError> {
    if resp.status().is_success() {
        Ok(resp)
    } else {
        Err(failure(resp).await)
    }
}

async fn failure(resp: Response) -> ApiError {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    let detail = error_detail(&body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    });
    if status == StatusCode::UNAUTHORIZED {
        ApiError::Unauthorized(detail)
    } else {
        ApiError::Status {
            status: status.as_u16(),
            detail,
        }
    }
}

pub(super) async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, ApiError> {
    let body = resp.text().await?;
    serde_json::from_str(&body).map_err(|e| ApiError::Decode(format!("{e}: {}", snippet(&body))))
}

/// Pull a readable message out of an error body.
///
/// The backend answers `{"detail": "..."}`, or a list of field errors
/// (`{"detail": [{"loc": [...], "msg": "..."}]}`) for validation failures.
pub fn error_detail(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    let Ok(value) = serde_json::from_str::<Value>(trimmed) else {
        return Some(snippet(trimmed));
    };
    match value.get("detail") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Array(items)) => {
            let messages: Vec<String> = items
                .iter()
                .filter_map(|item| {
                    let msg = item.get("msg")?.as_str()?;
                    let field = item
                        .get("loc")
                        .and_then(Value::as_array)
                        .and_then(|loc| loc.last())
                        .and_then(Value::as_str);
                    Some(match field {
                        Some(field) => format!("{field}: {msg}"),
                        None => msg.to_string(),
                    })
                })
                .collect();
            (!messages.is_empty()).then(|| messages.join("; "))
        }
        Some(other) => Some(other.to_string()),
        None => Some(snippet(trimmed)),
    }
}

fn snippet(body: &str) -> String {
    if body.chars().count() <= BODY_SNIPPET {
        body.to_string()
    } else {
        let cut: String = body.chars().take(BODY_SNIPPET).collect();
        format!("{cut}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_string() {
        assert_eq!(
            error_detail(r#"{"detail":"Incorrect email or password"}"#).as_deref(),
            Some("Incorrect email or password")
        );
    }

    #[test]
    fn detail_validation_list() {
        let body = r#"{"detail":[
            {"loc":["query","radius_km"],"msg":"ensure this value is less than or equal to 100"},
            {"loc":["query","species_code"],"msg":"field required"}
        ]}"#;
        assert_eq!(
            error_detail(body).as_deref(),
            Some(
                "radius_km: ensure this value is less than or equal to 100; species_code: field required"
            )
        );
    }

    #[test]
    fn detail_plain_text_body() {
        assert_eq!(
            error_detail("Bad Gateway\n").as_deref(),
            Some("Bad Gateway")
        );
    }

    #[test]
    fn detail_empty_body() {
        assert_eq!(error_detail("   "), None);
    }

    #[test]
    fn detail_json_without_detail_key() {
        assert_eq!(
            error_detail(r#"{"error":"boom"}"#).as_deref(),
            Some(r#"{"error":"boom"}"#)
        );
    }

    #[test]
    fn snippet_truncates_long_bodies() {
        let long = "x".repeat(500);
        let s = snippet(&long);
        assert!(s.ends_with("..."));
        assert_eq!(s.chars().count(), BODY_SNIPPET + 3);
    }

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let storage = Arc::new(TokenStorage::in_memory().unwrap());
        let client = ApiClient::new("http://localhost:8000/", storage).unwrap();
        assert_eq!(client.base_url(), "http://localhost:8000");
        assert_eq!(client.url("/auth/me"), "http://localhost:8000/auth/me");
    }
}
