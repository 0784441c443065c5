//! Metric definition listing (`--list.definitions`).
//!
//! Prints, for every configured resource and every resolved group member, the
//! metric names Azure Monitor offers for it.

use crate::metrics::Collector;
use crate::resource::leaf_name;

/// Fetch definitions for every scrape target and render them as text.
/// Resources whose definitions cannot be fetched are logged and left out.
pub async fn render_definitions(collector: &Collector) -> String {
    let mut out = String::new();

    for target in collector.targets().await {
        let path = &target.resource.path;
        let definitions = match collector.client().get_metric_definitions(path).await {
            Ok(definitions) => definitions,
            Err(e) => {
                tracing::warn!("Failed to fetch metric definitions for {}: {}", path, e);
                continue;
            }
        };

        out.push_str(&format!("Resource: {}\n\nAvailable Metrics:\n", leaf_name(path)));
        for definition in &definitions.value {
            let mut line = format!("- {}", definition.name.value);
            if let Some(unit) = &definition.unit {
                line.push_str(&format!(" [{}]", unit));
            }
            if let Some(primary) = &definition.primary_aggregation_type {
                line.push_str(&format!(" (primary: {})", primary));
            }
            out.push_str(&line);
            out.push('\n');
        }
        out.push('\n');
    }

    out
}
