//! Error types for Azure API calls.
//!
//! Each failure class maps to a different blast radius during a scrape:
//! an [`AuthError`] or [`FetchError`] skips one resource, a [`ListError`]
//! skips one resource group.

use reqwest::StatusCode;

/// Failure of a single HTTP exchange with an Azure endpoint.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-2xx status. `code` and `message` come from the Azure error body when present.
    #[error("unexpected status {status}{}", describe_api_error(.code, .message))]
    Status {
        status: StatusCode,
        code: Option<String>,
        message: Option<String>,
    },

    #[error("error unmarshalling response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl HttpError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            HttpError::Status { status, .. } => Some(*status),
            HttpError::Transport(e) => e.status(),
            HttpError::Decode(_) => None,
        }
    }
}

fn describe_api_error(code: &Option<String>, message: &Option<String>) -> String {
    match (code, message) {
        (Some(code), Some(message)) => format!(" ({}: {})", code, message),
        (Some(code), None) => format!(" ({})", code),
        (None, Some(message)) => format!(" ({})", message),
        (None, None) => String::new(),
    }
}

/// The identity endpoint refused or garbled the client-credentials grant.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("error authenticating against Azure API: {0}")]
    Http(#[from] HttpError),

    #[error("malformed token response: {0}")]
    Malformed(String),
}

/// Resource group listing failed; the group is skipped for this scrape.
#[derive(Debug, thiserror::Error)]
pub enum ListError {
    #[error("error refreshing access token: {0}")]
    Auth(#[from] AuthError),

    #[error("unable to query resource group API: {0}")]
    Http(#[from] HttpError),
}

/// Metric values or definitions could not be fetched; the resource is skipped.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("error refreshing access token: {0}")]
    Auth(#[from] AuthError),

    #[error("unable to query metrics API: {0}")]
    Http(#[from] HttpError),

    #[error("query window of {0:?} cannot be represented")]
    Window(std::time::Duration),
}
