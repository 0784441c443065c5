//! Prometheus text exposition of collected samples.

use super::collector::MetricSample;
use prometheus::proto::{self, LabelPair, Metric, MetricFamily, MetricType};
use prometheus::{Encoder, Gauge, GaugeVec, Opts, Registry, TextEncoder};
use std::collections::BTreeMap;
use std::time::Duration;

/// Content type of the text exposition format
pub const CONTENT_TYPE: &str = prometheus::TEXT_FORMAT;

/// Group samples into gauge families, one per sample name
pub fn sample_families(samples: &[MetricSample]) -> Vec<MetricFamily> {
    let mut by_name: BTreeMap<&str, Vec<&MetricSample>> = BTreeMap::new();
    for sample in samples {
        by_name.entry(sample.name.as_str()).or_default().push(sample);
    }

    by_name
        .into_iter()
        .map(|(name, samples)| {
            let mut family = MetricFamily::default();
            family.set_name(name.to_string());
            family.set_help(name.to_string());
            family.set_field_type(MetricType::GAUGE);
            for sample in samples {
                family.mut_metric().push(gauge_metric(sample));
            }
            family
        })
        .collect()
}

fn gauge_metric(sample: &MetricSample) -> Metric {
    let mut metric = Metric::default();
    for (name, value) in &sample.labels {
        let mut pair = LabelPair::default();
        pair.set_name(name.clone());
        pair.set_value(value.clone());
        metric.mut_label().push(pair);
    }
    let mut gauge = proto::Gauge::default();
    gauge.set_value(sample.value);
    metric.set_gauge(gauge);
    metric
}

/// The exporter's own metrics, shared across scrapes
#[derive(Clone)]
pub struct ExporterMetrics {
    registry: Registry,
    scrape_duration: Gauge,
    scrape_samples: Gauge,
}

impl ExporterMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let build_info = GaugeVec::new(
            Opts::new(
                "azure_exporter_build_info",
                "A metric with a constant '1' value labeled by the exporter version",
            ),
            &["version"],
        )?;
        registry.register(Box::new(build_info.clone()))?;
        build_info
            .with_label_values(&[env!("CARGO_PKG_VERSION")])
            .set(1.0);

        let scrape_duration = Gauge::with_opts(Opts::new(
            "azure_exporter_scrape_duration_seconds",
            "Duration of the last Azure scrape in seconds",
        ))?;
        registry.register(Box::new(scrape_duration.clone()))?;

        let scrape_samples = Gauge::with_opts(Opts::new(
            "azure_exporter_scrape_samples",
            "Number of Azure samples returned by the last scrape",
        ))?;
        registry.register(Box::new(scrape_samples.clone()))?;

        Ok(Self {
            registry,
            scrape_duration,
            scrape_samples,
        })
    }

    pub fn observe_scrape(&self, elapsed: Duration, samples: usize) {
        self.scrape_duration.set(elapsed.as_secs_f64());
        self.scrape_samples.set(samples as f64);
    }

    /// Render exporter metrics followed by the scraped samples
    pub fn encode(&self, samples: &[MetricSample]) -> Result<String, prometheus::Error> {
        let mut families = self.registry.gather();
        families.extend(sample_families(samples));

        let mut buffer = Vec::with_capacity(8192);
        TextEncoder::new().encode(&families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
