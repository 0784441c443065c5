//! Metric naming and labels.
//!
//! Azure metric names such as `Percentage CPU` with unit `Percent` become
//! `percentage_cpu_percent`; each emitted aggregation adds its own suffix
//! (`_total`, `_average`, `_min`, `_max`). Labels come from a structural parse
//! of the resource id.

use crate::config::Aggregation;
use std::collections::BTreeMap;

/// Map an Azure metric name and unit to a name in `[a-zA-Z0-9_:]`.
///
/// Spaces become `_`, the unit is appended after `_`, everything is lowercased,
/// `/` becomes `_per_`, and any remaining invalid character becomes `_`.
/// An empty unit appends nothing.
pub fn metric_name(raw_name: &str, unit: &str) -> String {
    let mut name = raw_name.replace(' ', "_");
    // An empty unit adds no separator: `Requests` -> `requests`, not `requests_`
    if !unit.is_empty() {
        name.push('_');
        name.push_str(unit);
    }

    name.to_lowercase()
        .replace('/', "_per_")
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == ':' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Full sample name for one aggregation kind, e.g. `..._average`
pub fn sample_name(base: &str, aggregation: Aggregation) -> String {
    format!("{}_{}", base, aggregation.suffix())
}

/// Decompose an Azure resource id into provenance labels.
///
/// `/subscriptions/{sub}/resourceGroups/{rg}/providers/{ns}/{type}/{name}[/{subtype}/{subname}...]`
/// yields `subscription_id`, `resource_group`, `resource_type` (`{ns}/{type}[/{subtype}...]`)
/// and `resource_name` (the innermost name). Parsing stops at a nested `providers`
/// segment, so metric ids label the resource they belong to. Ids that stop early or
/// deviate from that shape yield only the labels parsed before the deviation; anything
/// not rooted at a subscription yields no labels.
pub fn resource_labels(resource_id: &str) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    let segments: Vec<&str> = resource_id
        .trim_matches('/')
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();

    let Some(subscription) = keyed_segment(&segments, 0, "subscriptions") else {
        return labels;
    };
    labels.insert("subscription_id".to_string(), subscription.to_string());

    let Some(group) = keyed_segment(&segments, 2, "resourceGroups") else {
        return labels;
    };
    labels.insert("resource_group".to_string(), group.to_string());

    let Some(namespace) = keyed_segment(&segments, 4, "providers") else {
        return labels;
    };

    let mut resource_type = namespace.to_string();
    let mut resource_name = None;
    for pair in segments[6..].chunks(2) {
        match pair {
            [kind, ..] if kind.eq_ignore_ascii_case("providers") => break,
            [kind, name] => {
                resource_type.push('/');
                resource_type.push_str(kind);
                resource_name = Some(*name);
            }
            // A trailing type without a name only counts when nothing was named yet
            [kind] if resource_name.is_none() => {
                resource_type.push('/');
                resource_type.push_str(kind);
            }
            _ => {}
        }
    }

    if resource_type.len() == namespace.len() {
        return labels;
    }
    labels.insert("resource_type".to_string(), resource_type);
    if let Some(name) = resource_name {
        labels.insert("resource_name".to_string(), name.to_string());
    }

    labels
}

/// Value following `segments[i]` when that segment equals `key`
fn keyed_segment<'a>(segments: &[&'a str], i: usize, key: &str) -> Option<&'a str> {
    match (segments.get(i), segments.get(i + 1)) {
        (Some(k), Some(v)) if k.eq_ignore_ascii_case(key) => Some(*v),
        _ => None,
    }
}
