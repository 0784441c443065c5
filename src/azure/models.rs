//! Typed Azure REST response bodies.
//!
//! Azure omits or nulls nested fields freely, so everything below the top level
//! is optional and decoding never depends on a particular nesting being present.

use serde::{Deserialize, Deserializer};

/// `{ "value": "...", "localizedValue": "..." }`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalizableString {
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub localized_value: Option<String>,
}

/// Response of `.../providers/microsoft.insights/metrics`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetricValueResponse {
    #[serde(default)]
    pub value: Option<Vec<MetricValue>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetricValue {
    /// Fully-qualified metric id, rooted at the resource id
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: LocalizableString,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub timeseries: Option<Vec<TimeSeries>>,
}

impl MetricValue {
    /// Data points of the first series, if any
    pub fn first_series(&self) -> &[DataPoint] {
        self.timeseries
            .as_deref()
            .and_then(|series| series.first())
            .and_then(|s| s.data.as_deref())
            .unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TimeSeries {
    #[serde(default)]
    pub data: Option<Vec<DataPoint>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataPoint {
    #[serde(default)]
    pub time_stamp: Option<String>,
    #[serde(default)]
    pub total: Option<f64>,
    #[serde(default)]
    pub average: Option<f64>,
    #[serde(default)]
    pub minimum: Option<f64>,
    #[serde(default)]
    pub maximum: Option<f64>,
}

/// Response of `.../resourceGroups/{name}/resources`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceListResponse {
    #[serde(default)]
    pub value: Vec<ResourceEntry>,
    #[serde(default)]
    pub next_link: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceEntry {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub resource_type: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

/// Response of `.../providers/microsoft.insights/metricDefinitions`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetricDefinitionResponse {
    #[serde(default)]
    pub value: Vec<MetricDefinition>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricDefinition {
    #[serde(default)]
    pub name: LocalizableString,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub primary_aggregation_type: Option<String>,
    #[serde(default)]
    pub is_dimension_required: bool,
}

/// Azure ARM error envelope: `{ "error": { "code": "...", "message": "..." } }`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArmErrorEnvelope {
    pub error: Option<ArmError>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArmError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Identity endpoint error: `{ "error": "invalid_client", "error_description": "..." }`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OAuthError {
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

/// Response of the client-credentials grant
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    /// UNIX seconds; Azure sends these as strings on the v1 endpoint
    #[serde(default, deserialize_with = "lenient_seconds")]
    pub expires_on: Option<i64>,
    #[serde(default, deserialize_with = "lenient_seconds")]
    pub expires_in: Option<i64>,
}

fn lenient_seconds<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(i64),
        String(String),
    }

    match Option::<NumberOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrString::Number(n)) => Ok(Some(n)),
        Some(NumberOrString::String(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| serde::de::Error::custom(format!("invalid seconds {:?}: {}", s, e))),
    }
}
