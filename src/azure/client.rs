//! Azure Client
//!
//! Main client for interacting with Azure Resource Manager and Azure Monitor,
//! combining authentication and HTTP functionality.

use super::auth::{AccessToken, TokenManager};
use super::error::{AuthError, FetchError, HttpError, ListError};
use super::http::AzureHttpClient;
use super::models::{MetricDefinitionResponse, MetricValueResponse, ResourceListResponse};
use crate::config::{Aggregation, Credentials, Endpoints};
use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use std::sync::Arc;
use std::time::Duration;

/// API version of the Azure Monitor metrics endpoints
pub const METRICS_API_VERSION: &str = "2018-01-01";

/// API version of the resource listing endpoint
pub const RESOURCES_API_VERSION: &str = "2018-02-01";

/// Upper bound on `nextLink` pages followed for a single resource group
const MAX_LIST_PAGES: usize = 100;

/// Main Azure client
pub struct AzureClient {
    subscription_id: String,
    resource_manager_url: String,
    http: AzureHttpClient,
    tokens: TokenManager,
}

impl AzureClient {
    /// Create a new Azure client. No network traffic happens until the first call.
    pub fn new(
        credentials: &Credentials,
        endpoints: &Endpoints,
        request_timeout: Duration,
    ) -> Result<Self, HttpError> {
        let http = AzureHttpClient::new(request_timeout)?;
        let tokens = TokenManager::new(http.clone(), credentials, endpoints);

        Ok(Self {
            subscription_id: credentials.subscription_id.clone(),
            resource_manager_url: endpoints
                .resource_manager_url
                .as_str()
                .trim_end_matches('/')
                .to_string(),
            http,
            tokens,
        })
    }

    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    /// Get a usable access token, refreshing it if needed
    pub async fn ensure_token(&self) -> Result<Arc<AccessToken>, AuthError> {
        self.tokens.ensure_token().await
    }

    /// `/subscriptions/{id}` - the prefix stripped from listed resource ids
    pub fn subscription_path(&self) -> String {
        format!("/subscriptions/{}", self.subscription_id)
    }

    /// Fully-qualified id of a subscription-relative resource path
    pub fn resource_id(&self, resource: &str) -> String {
        format!("{}{}", self.subscription_path(), resource)
    }

    fn resource_url(&self, resource: &str, suffix: &str) -> String {
        format!(
            "{}{}{}",
            self.resource_manager_url,
            self.resource_id(resource),
            suffix
        )
    }

    /// Fetch aggregated values of `metric_names` for one resource over the
    /// `window` ending now
    pub async fn get_metric_values(
        &self,
        resource: &str,
        metric_names: &[String],
        aggregations: &[Aggregation],
        window: Duration,
    ) -> Result<MetricValueResponse, FetchError> {
        let token = self.ensure_token().await?;
        let url = self.resource_url(resource, "/providers/microsoft.insights/metrics");

        let mut query = Vec::with_capacity(4);
        if !metric_names.is_empty() {
            query.push(("metricnames", metric_names.join(",")));
        }
        query.push(("aggregation", aggregation_param(aggregations)));
        let span = timespan(Utc::now(), window).ok_or(FetchError::Window(window))?;
        query.push(("timespan", span));
        query.push(("api-version", METRICS_API_VERSION.to_string()));

        Ok(self.http.get(&url, &query, &token.bearer).await?)
    }

    /// Fetch the metric definitions available for one resource
    pub async fn get_metric_definitions(
        &self,
        resource: &str,
    ) -> Result<MetricDefinitionResponse, FetchError> {
        let token = self.ensure_token().await?;
        let url = self.resource_url(resource, "/providers/microsoft.insights/metricDefinitions");
        let query = [("api-version", METRICS_API_VERSION.to_string())];

        Ok(self.http.get(&url, &query, &token.bearer).await?)
    }

    /// List the fully-qualified ids of all resources of `resource_types` in a
    /// resource group, following `nextLink` pagination
    pub async fn list_resource_group(
        &self,
        resource_group: &str,
        resource_types: &[String],
    ) -> Result<Vec<String>, ListError> {
        let url = format!(
            "{}{}/resourceGroups/{}/resources",
            self.resource_manager_url,
            self.subscription_path(),
            urlencoding::encode(resource_group)
        );

        let mut query = vec![("api-version", RESOURCES_API_VERSION.to_string())];
        if !resource_types.is_empty() {
            query.push(("$filter", resource_type_filter(resource_types)));
        }

        let token = self.ensure_token().await?;
        let mut page: ResourceListResponse = self.http.get(&url, &query, &token.bearer).await?;
        let mut ids: Vec<String> = page.value.drain(..).map(|r| r.id).collect();

        let mut pages = 1;
        while let Some(next) = page.next_link.take() {
            if pages >= MAX_LIST_PAGES {
                tracing::warn!(
                    "Stopped following nextLink for resource group {} after {} pages",
                    resource_group,
                    pages
                );
                break;
            }
            let token = self.ensure_token().await?;
            page = self.http.get(&next, &[], &token.bearer).await?;
            ids.extend(page.value.drain(..).map(|r| r.id));
            pages += 1;
        }

        Ok(ids)
    }
}

/// Comma-joined aggregation list; all four kinds when none are requested
pub fn aggregation_param(aggregations: &[Aggregation]) -> String {
    Aggregation::effective(aggregations)
        .iter()
        .map(|a| a.as_str())
        .collect::<Vec<_>>()
        .join(",")
}

/// OData filter OR-ing every resource type
pub fn resource_type_filter(resource_types: &[String]) -> String {
    resource_types
        .iter()
        .map(|t| format!("resourcetype eq '{}'", t))
        .collect::<Vec<_>>()
        .join(" or ")
}

/// ISO8601 interval `start/end` covering `window` up to `now`; `None` when the
/// start would fall outside the representable date range
pub fn timespan(now: DateTime<Utc>, window: Duration) -> Option<String> {
    let start = TimeDelta::from_std(window)
        .ok()
        .and_then(|window| now.checked_sub_signed(window))?;
    Some(format!(
        "{}/{}",
        start.to_rfc3339_opts(SecondsFormat::Secs, true),
        now.to_rfc3339_opts(SecondsFormat::Secs, true)
    ))
}
