//! HTTP utilities for Azure REST API calls

use super::error::HttpError;
use super::models::{ArmErrorEnvelope, OAuthError};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Sanitize response body for logging
/// Truncates long responses and strips control characters
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let mut end = MAX_LOG_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... [truncated, {} bytes total]", &body[..end], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// Pull `code`/`message` out of an Azure error body, ARM or identity flavoured
fn parse_api_error(body: &str) -> (Option<String>, Option<String>) {
    if let Ok(ArmErrorEnvelope { error: Some(err) }) = serde_json::from_str(body) {
        return (err.code, err.message);
    }
    if let Ok(OAuthError {
        error: Some(code),
        error_description,
    }) = serde_json::from_str(body)
    {
        return (Some(code), error_description);
    }
    (None, None)
}

/// HTTP client wrapper for Azure API calls
#[derive(Clone)]
pub struct AzureHttpClient {
    client: Client,
}

impl AzureHttpClient {
    /// Create a new HTTP client; `timeout` bounds every request end to end
    pub fn new(timeout: Duration) -> Result<Self, HttpError> {
        let client = Client::builder()
            .user_agent(concat!("azure-metrics-exporter/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self { client })
    }

    /// Make an authorized GET request and decode the JSON body
    pub async fn get<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
        token: &str,
    ) -> Result<T, HttpError> {
        tracing::debug!("GET {}", url);
        let request = self.client.get(url).bearer_auth(token).query(query);
        self.send(request).await
    }

    /// POST a url-encoded form (no bearer token) and decode the JSON body
    pub async fn post_form<T: DeserializeOwned>(
        &self,
        url: &str,
        form: &[(&str, &str)],
    ) -> Result<T, HttpError> {
        tracing::debug!("POST {}", url);
        let request = self.client.post(url).form(form);
        self.send(request).await
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, HttpError> {
        let response = request.send().await?;

        let status = response.status();
        let body = response.text().await?;

        if status != StatusCode::OK {
            // Security: Only log sanitized/truncated error body to avoid leaking sensitive data
            tracing::debug!("API error: {} - {}", status, sanitize_for_log(&body));
            let (code, message) = parse_api_error(&body);
            return Err(HttpError::Status {
                status,
                code,
                message,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}
