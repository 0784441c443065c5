//! Resource Resolver
//!
//! Expands resource-group selectors into concrete resources: list the group's
//! members of the configured types, strip the subscription prefix, then apply
//! include/exclude patterns to each resource's leaf name.

use crate::azure::{AzureClient, ListError};
use crate::config::{Pattern, ResourceGroupSpec, ResourceSpec};

/// A concrete resource, addressed relative to its subscription
/// (`/resourceGroups/{rg}/providers/{ns}/{type}/{name}`)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedResource {
    pub path: String,
}

impl ResolvedResource {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    /// Last path segment, e.g. `web-prod`
    pub fn leaf_name(&self) -> &str {
        leaf_name(&self.path)
    }
}

impl From<&ResourceSpec> for ResolvedResource {
    fn from(spec: &ResourceSpec) -> Self {
        Self::new(spec.name.clone())
    }
}

/// Resolves resource groups through the listing API
pub struct ResourceResolver<'a> {
    client: &'a AzureClient,
}

impl<'a> ResourceResolver<'a> {
    pub fn new(client: &'a AzureClient) -> Self {
        Self { client }
    }

    /// List the group's resources and keep those passing the include/exclude filters
    pub async fn resolve_group(
        &self,
        spec: &ResourceGroupSpec,
    ) -> Result<Vec<ResolvedResource>, ListError> {
        let ids = self
            .client
            .list_resource_group(&spec.name, &spec.resource_types)
            .await?;
        let listed = ids.len();

        let subscription = self.client.subscription_path();
        let resources: Vec<ResolvedResource> = ids
            .iter()
            .map(|id| ResolvedResource::new(strip_subscription(id, &subscription)))
            .filter(|r| passes_filters(r.leaf_name(), &spec.resource_include, &spec.resource_exclude))
            .collect();

        tracing::debug!(
            "Resource group {}: {} listed, {} after filtering",
            spec.name,
            listed,
            resources.len()
        );

        Ok(resources)
    }
}

/// Last `/`-separated segment of a resource path
pub fn leaf_name(path: &str) -> &str {
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(path)
}

/// Turn `/subscriptions/{id}/resourceGroups/...` into `/resourceGroups/...`.
/// Ids from another subscription, or not rooted at one, are returned untouched.
pub fn strip_subscription<'i>(id: &'i str, subscription_path: &str) -> &'i str {
    match id.get(..subscription_path.len()) {
        Some(prefix)
            if prefix.eq_ignore_ascii_case(subscription_path)
                && id[subscription_path.len()..].starts_with('/') =>
        {
            &id[subscription_path.len()..]
        }
        _ => id,
    }
}

/// A name passes when it matches at least one include pattern (or there are
/// none) and matches no exclude pattern. Exclusion always wins.
pub fn passes_filters(name: &str, include: &[Pattern], exclude: &[Pattern]) -> bool {
    if !include.is_empty() && !include.iter().any(|p| p.is_match(name)) {
        return false;
    }
    !exclude.iter().any(|p| p.is_match(name))
}
