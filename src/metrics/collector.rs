//! Metric Collector
//!
//! Runs one scrape: resolves every configured resource, fetches the latest
//! aggregated values from Azure Monitor and reshapes them into gauge samples.
//! Failures are isolated per resource (and per group for listing failures) and
//! only logged, so a scrape always returns whatever could be collected.

use super::naming::{metric_name, resource_labels, sample_name};
use crate::azure::models::{DataPoint, MetricValueResponse};
use crate::azure::AzureClient;
use crate::config::{Aggregation, Config};
use crate::resource::{ResolvedResource, ResourceResolver};
use futures::stream::{self, StreamExt};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// One gauge value ready for exposition
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    pub name: String,
    pub labels: BTreeMap<String, String>,
    pub aggregation: Aggregation,
    pub value: f64,
}

/// A resource together with what to query for it
#[derive(Debug, Clone)]
pub struct ScrapeTarget<'a> {
    pub resource: ResolvedResource,
    pub metrics: &'a [String],
    pub aggregations: &'a [Aggregation],
}

/// Collects samples for one configuration snapshot
pub struct Collector {
    client: Arc<AzureClient>,
    config: Arc<Config>,
}

impl Collector {
    pub fn new(client: Arc<AzureClient>, config: Arc<Config>) -> Self {
        Self { client, config }
    }

    pub fn client(&self) -> &Arc<AzureClient> {
        &self.client
    }

    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    /// Explicit resources first, then the members of every group that could be
    /// listed. A group whose listing fails is logged and left out.
    pub async fn targets(&self) -> Vec<ScrapeTarget<'_>> {
        let mut targets: Vec<ScrapeTarget<'_>> = self
            .config
            .resources
            .iter()
            .map(|spec| ScrapeTarget {
                resource: ResolvedResource::from(spec),
                metrics: &spec.metrics,
                aggregations: &spec.aggregations,
            })
            .collect();

        let resolver = ResourceResolver::new(&self.client);
        for group in &self.config.resource_groups {
            match resolver.resolve_group(group).await {
                Ok(resources) => {
                    targets.extend(resources.into_iter().map(|resource| ScrapeTarget {
                        resource,
                        metrics: &group.metrics,
                        aggregations: &group.aggregations,
                    }));
                }
                Err(e) => {
                    tracing::warn!("Failed to list resource group {}: {}", group.name, e);
                }
            }
        }

        targets
    }

    /// Run a full scrape. Samples keep target order; when two targets produce
    /// the same name and label set, the first one wins.
    pub async fn collect(&self) -> Vec<MetricSample> {
        let targets = self.targets().await;
        let concurrency = self.config.scrape.concurrency.max(1);

        let pending: Vec<_> = targets
            .iter()
            .map(|t| self.collect_resource(&t.resource, t.metrics, t.aggregations))
            .collect();
        let per_target: Vec<Vec<MetricSample>> = stream::iter(pending)
            .buffered(concurrency)
            .collect()
            .await;

        let samples = dedup_samples(per_target.into_iter().flatten());
        tracing::debug!(
            "Scrape collected {} samples from {} resources",
            samples.len(),
            targets.len()
        );
        samples
    }

    /// Fetch and convert the metrics of one resource. Errors are logged and
    /// yield no samples.
    pub async fn collect_resource(
        &self,
        resource: &ResolvedResource,
        metrics: &[String],
        aggregations: &[Aggregation],
    ) -> Vec<MetricSample> {
        let response = match self
            .client
            .get_metric_values(
                &resource.path,
                metrics,
                aggregations,
                self.config.scrape.query_window(),
            )
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Failed to get metrics for target {}: {}", resource.path, e);
                return Vec::new();
            }
        };

        let fallback_id = self.client.resource_id(&resource.path);
        samples_from_response(&response, &fallback_id, aggregations).unwrap_or_else(|reason| {
            tracing::info!(
                "Skipping target {} (metrics {}): {}",
                resource.path,
                metrics.join(","),
                reason
            );
            Vec::new()
        })
    }
}

/// Why a response produced no samples at all
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyReason {
    NoValues,
    NoDataPoints,
}

impl std::fmt::Display for EmptyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmptyReason::NoValues => f.write_str("metric not found"),
            EmptyReason::NoDataPoints => f.write_str("no metric data returned"),
        }
    }
}

/// Convert a metric-values response into samples.
///
/// Only the last data point of each metric's first series is used. One sample is
/// produced per requested aggregation (all four when none are requested) that
/// the data point actually carries. `fallback_id` labels values missing an id.
pub fn samples_from_response(
    response: &MetricValueResponse,
    fallback_id: &str,
    aggregations: &[Aggregation],
) -> Result<Vec<MetricSample>, EmptyReason> {
    let values = match response.value.as_deref() {
        Some(values) if !values.is_empty() => values,
        _ => return Err(EmptyReason::NoValues),
    };
    if values[0].first_series().is_empty() {
        return Err(EmptyReason::NoDataPoints);
    }

    let wanted = Aggregation::effective(aggregations);
    let mut samples = Vec::new();

    for value in values {
        let Some(point) = value.first_series().last() else {
            tracing::debug!("No data points for metric {}", value.name.value);
            continue;
        };

        let base = metric_name(&value.name.value, value.unit.as_deref().unwrap_or(""));
        let id = if value.id.is_empty() {
            fallback_id
        } else {
            value.id.as_str()
        };
        let labels = resource_labels(id);

        for &aggregation in &wanted {
            if let Some(v) = aggregate_value(point, aggregation) {
                samples.push(MetricSample {
                    name: sample_name(&base, aggregation),
                    labels: labels.clone(),
                    aggregation,
                    value: v,
                });
            }
        }
    }

    Ok(samples)
}

fn aggregate_value(point: &DataPoint, aggregation: Aggregation) -> Option<f64> {
    match aggregation {
        Aggregation::Total => point.total,
        Aggregation::Average => point.average,
        Aggregation::Minimum => point.minimum,
        Aggregation::Maximum => point.maximum,
    }
}

/// Drop samples whose (name, labels) was already seen, keeping the first
pub fn dedup_samples(samples: impl IntoIterator<Item = MetricSample>) -> Vec<MetricSample> {
    let mut seen = HashSet::new();
    samples
        .into_iter()
        .filter(|s| {
            let fresh = seen.insert((s.name.clone(), s.labels.clone()));
            if !fresh {
                tracing::debug!("Dropping duplicate sample {} {:?}", s.name, s.labels);
            }
            fresh
        })
        .collect()
}
