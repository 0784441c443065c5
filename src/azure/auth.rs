//! Azure Authentication
//!
//! Obtains bearer tokens through the OAuth2 client-credentials grant and keeps
//! the current one in a lock-free cell that is swapped wholesale on refresh.

use super::error::AuthError;
use super::http::AzureHttpClient;
use super::models::TokenResponse;
use crate::config::{Credentials, Endpoints};
use arc_swap::ArcSwapOption;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Token expiry buffer - refresh tokens this much before they actually expire
/// This prevents using tokens that are about to expire during a request
pub const TOKEN_REFRESH_SKEW: Duration = Duration::minutes(10);

/// A bearer token and the instant it stops being accepted
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub bearer: String,
    pub expires_on: DateTime<Utc>,
}

impl AccessToken {
    /// Usable only while `now < expires_on - TOKEN_REFRESH_SKEW`
    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_on - TOKEN_REFRESH_SKEW
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("bearer", &"<redacted>")
            .field("expires_on", &self.expires_on)
            .finish()
    }
}

/// Lazily refreshed client-credentials token
pub struct TokenManager {
    http: AzureHttpClient,
    token_url: String,
    resource: String,
    client_id: String,
    client_secret: String,
    current: ArcSwapOption<AccessToken>,
    /// Serializes refreshes so concurrent callers share one grant
    refresh: Mutex<()>,
}

impl TokenManager {
    pub fn new(http: AzureHttpClient, credentials: &Credentials, endpoints: &Endpoints) -> Self {
        let token_url = format!(
            "{}/{}/oauth2/token",
            endpoints
                .active_directory_authority_url
                .as_str()
                .trim_end_matches('/'),
            urlencoding::encode(&credentials.tenant_id)
        );

        Self {
            http,
            token_url,
            resource: endpoints.resource_manager_url.to_string(),
            client_id: credentials.client_id.clone(),
            client_secret: credentials.client_secret.clone(),
            current: ArcSwapOption::empty(),
            refresh: Mutex::new(()),
        }
    }

    /// The stored token, whether or not it is still usable
    pub fn current(&self) -> Option<Arc<AccessToken>> {
        self.current.load_full()
    }

    fn usable_at(&self, now: DateTime<Utc>) -> Option<Arc<AccessToken>> {
        self.current
            .load_full()
            .filter(|token| token.is_usable_at(now))
    }

    /// Return a usable token, performing a client-credentials grant when none is
    /// stored or the stored one is within the refresh skew of its expiry
    pub async fn ensure_token(&self) -> Result<Arc<AccessToken>, AuthError> {
        if let Some(token) = self.usable_at(Utc::now()) {
            return Ok(token);
        }

        let _guard = self.refresh.lock().await;

        // Another caller may have refreshed while we waited
        if let Some(token) = self.usable_at(Utc::now()) {
            return Ok(token);
        }

        tracing::debug!("Access token missing or close to expiry, requesting a new one");
        let token = Arc::new(self.request_token().await?);
        self.current.store(Some(Arc::clone(&token)));
        tracing::info!("New access token acquired, expires at {}", token.expires_on);

        Ok(token)
    }

    async fn request_token(&self) -> Result<AccessToken, AuthError> {
        let form = [
            ("grant_type", "client_credentials"),
            ("resource", self.resource.as_str()),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];
        let response: TokenResponse = self.http.post_form(&self.token_url, &form).await?;
        token_from_response(response, Utc::now())
    }
}

fn token_from_response(
    response: TokenResponse,
    now: DateTime<Utc>,
) -> Result<AccessToken, AuthError> {
    let bearer = response
        .access_token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AuthError::Malformed("missing access_token".to_string()))?;

    let expires_on = match (response.expires_on, response.expires_in) {
        (Some(on), _) => Utc
            .timestamp_opt(on, 0)
            .single()
            .ok_or_else(|| AuthError::Malformed(format!("expires_on out of range: {}", on)))?,
        (None, Some(secs)) => now + Duration::seconds(secs),
        (None, None) => {
            return Err(AuthError::Malformed(
                "missing expires_on and expires_in".to_string(),
            ))
        }
    };

    Ok(AccessToken { bearer, expires_on })
}
