//! HTTP client for the pneumoscan services.
//!
//! Provides a minimal client with optional auth (Bearer token or X-API-Key),
//! generic JSON / multipart POST helpers, and the domain methods for the
//! classification and heat-map endpoints. Failures are never retried.

pub mod api;

use pneumoscan_core::{AppError, AuthScheme, ClientConfig};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;

pub use api::DiagnosticsApi;

/// Authentication strategy for the API.
#[derive(Clone, Debug)]
pub enum Auth {
    /// `Authorization: Bearer {token}`
    Bearer(String),
    /// `X-API-Key: {key}`
    XApiKey(String),
}

impl Auth {
    /// Auth from config; `None` when no key is configured.
    pub fn from_config(config: &ClientConfig) -> Option<Self> {
        config.api_key.clone().map(|key| match config.auth_scheme {
            AuthScheme::Bearer => Auth::Bearer(key),
            AuthScheme::XApiKey => Auth::XApiKey(key),
        })
    }
}

/// HTTP client bound to one service base URL.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    auth: Option<Auth>,
}

impl ApiClient {
    pub fn new(base_url: &str, auth: Option<Auth>, timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn apply_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth {
            Some(Auth::Bearer(token)) => {
                request.header("Authorization", format!("Bearer {}", token))
            }
            Some(Auth::XApiKey(key)) => request.header("X-API-Key", key.as_str()),
            None => request,
        }
    }

    /// POST JSON body and deserialize response.
    pub async fn post_json<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, AppError> {
        let url = self.build_url(path);
        let request = self.apply_auth(self.client.post(&url).json(body));
        self.send(&url, request).await
    }

    /// POST multipart form and deserialize response.
    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> Result<T, AppError> {
        let url = self.build_url(path);
        let request = self.apply_auth(self.client.post(&url).multipart(form));
        self.send(&url, request).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        url: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<T, AppError> {
        tracing::debug!(url = %url, "Sending request");

        let response = request
            .send()
            .await
            .map_err(|e| AppError::Transport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AppError::Transport(format!("Failed to read response body: {}", e)))?;

        if !status.is_success() {
            let message = error_message_from_body(&text);
            tracing::warn!(url = %url, status = status.as_u16(), message = %message, "API request failed");
            return Err(AppError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: T = serde_json::from_str(&text)?;
        Ok(body)
    }
}

/// Pull a human-readable message out of an error body.
///
/// Looks for `detail`, `error`, then `message` in a JSON object; non-JSON bodies
/// are returned trimmed.
pub fn error_message_from_body(body: &str) -> String {
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["detail", "error", "message"] {
            match map.get(key) {
                Some(serde_json::Value::String(s)) if !s.is_empty() => return s.clone(),
                Some(serde_json::Value::String(_)) | Some(serde_json::Value::Null) | None => {
                    continue
                }
                Some(other) => return other.to_string(),
            }
        }
    }
    body.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_prefers_detail() {
        assert_eq!(
            error_message_from_body(r#"{"detail": "Invalid image", "error": "x"}"#),
            "Invalid image"
        );
        assert_eq!(error_message_from_body(r#"{"error": "Bad id"}"#), "Bad id");
        assert_eq!(
            error_message_from_body(r#"{"success": false, "message": "No file"}"#),
            "No file"
        );
    }

    #[test]
    fn test_error_message_structured_detail() {
        let message = error_message_from_body(r#"{"detail": [{"loc": ["body", "image"]}]}"#);
        assert!(message.contains("image"));
    }

    #[test]
    fn test_error_message_plain_text() {
        assert_eq!(error_message_from_body("  Bad Gateway \n"), "Bad Gateway");
        assert_eq!(error_message_from_body(""), "");
    }

    #[test]
    fn test_build_url_trims_trailing_slash() {
        let client =
            ApiClient::new("http://localhost:8000/", None, Duration::from_secs(5)).unwrap();
        assert_eq!(client.base_url(), "http://localhost:8000");
        assert_eq!(
            client.build_url("/api/analyze"),
            "http://localhost:8000/api/analyze"
        );
    }

    #[test]
    fn test_auth_from_config() {
        let mut config = ClientConfig::default();
        assert!(Auth::from_config(&config).is_none());

        config.api_key = Some("k".to_string());
        assert!(matches!(Auth::from_config(&config), Some(Auth::XApiKey(k)) if k == "k"));

        config.auth_scheme = AuthScheme::Bearer;
        assert!(matches!(Auth::from_config(&config), Some(Auth::Bearer(k)) if k == "k"));
    }
}
