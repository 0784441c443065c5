//! Azure API interaction module
//!
//! This module provides the core functionality for talking to Azure: token
//! acquisition, an HTTP client wrapper, typed response models, and the
//! endpoints the exporter needs.
//!
//! # Module Structure
//!
//! - [`auth`] - OAuth2 client-credentials token with lazy refresh
//! - [`client`] - Main Azure client (metric values, definitions, resource listing)
//! - [`http`] - HTTP utilities for REST API calls
//! - [`models`] - Typed JSON response bodies
//! - [`error`] - Error taxonomy
//!
//! # Example
//!
//! ```ignore
//! use azure_metrics_exporter::azure::AzureClient;
//!
//! async fn example(config: &Config) -> anyhow::Result<()> {
//!     let client = AzureClient::new(&config.credentials, &config.endpoints, timeout)?;
//!     let ids = client.list_resource_group("web-rg", &types).await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod error;
pub mod http;
pub mod models;

pub use auth::{AccessToken, TokenManager};
pub use client::AzureClient;
pub use error::{AuthError, FetchError, HttpError, ListError};
