//! Configuration Management
//!
//! Typed representation of the exporter's YAML configuration: Azure credentials,
//! explicit resources and resource-group selectors. Everything is validated at load
//! time so the rest of the exporter can trust the values it is handed.

use regex::Regex;
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Default Azure AD authority used for the client-credentials grant
pub const DEFAULT_AUTHORITY_URL: &str = "https://login.microsoftonline.com/";

/// Default Azure Resource Manager endpoint
pub const DEFAULT_RESOURCE_MANAGER_URL: &str = "https://management.azure.com/";

/// Length of the metric-values query window ending at "now"
pub const DEFAULT_QUERY_WINDOW_SECS: u64 = 60;

/// Longest accepted query window (30 days)
pub const MAX_QUERY_WINDOW_SECS: u64 = 30 * 24 * 60 * 60;

/// Timeout applied to every outbound Azure call
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("error reading config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("error parsing config file: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("error validating config file: {0}")]
    Invalid(String),
}

/// Exporter configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub credentials: Credentials,
    #[serde(default)]
    pub resources: Vec<ResourceSpec>,
    #[serde(default)]
    pub resource_groups: Vec<ResourceGroupSpec>,
    #[serde(default)]
    pub endpoints: Endpoints,
    #[serde(default)]
    pub scrape: ScrapeSettings,
}

/// Azure service principal credentials
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Credentials {
    pub subscription_id: String,
    pub client_id: String,
    pub client_secret: String,
    pub tenant_id: String,
}

// Keep the secret out of logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("subscription_id", &self.subscription_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("tenant_id", &self.tenant_id)
            .finish()
    }
}

/// An explicitly configured resource
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceSpec {
    /// Resource path relative to the subscription, e.g. `/resourceGroups/rg/providers/...`
    pub name: String,
    #[serde(default)]
    pub metrics: Vec<String>,
    #[serde(default)]
    pub aggregations: Vec<Aggregation>,
}

/// A resource group selector, expanded into resources on every scrape
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceGroupSpec {
    pub name: String,
    #[serde(default)]
    pub resource_types: Vec<String>,
    #[serde(default)]
    pub resource_include: Vec<Pattern>,
    #[serde(default)]
    pub resource_exclude: Vec<Pattern>,
    #[serde(default)]
    pub metrics: Vec<String>,
    #[serde(default)]
    pub aggregations: Vec<Aggregation>,
}

/// Azure endpoints; overridable for sovereign clouds
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Endpoints {
    #[serde(default = "default_authority_url")]
    pub active_directory_authority_url: Url,
    #[serde(default = "default_resource_manager_url")]
    pub resource_manager_url: Url,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            active_directory_authority_url: default_authority_url(),
            resource_manager_url: default_resource_manager_url(),
        }
    }
}

fn default_authority_url() -> Url {
    Url::parse(DEFAULT_AUTHORITY_URL).expect("default authority url is valid")
}

fn default_resource_manager_url() -> Url {
    Url::parse(DEFAULT_RESOURCE_MANAGER_URL).expect("default resource manager url is valid")
}

/// Per-scrape tuning
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScrapeSettings {
    #[serde(default = "default_query_window_secs")]
    pub query_window_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Number of resources queried in parallel; 1 keeps the scrape sequential
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for ScrapeSettings {
    fn default() -> Self {
        Self {
            query_window_secs: DEFAULT_QUERY_WINDOW_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            concurrency: default_concurrency(),
        }
    }
}

impl ScrapeSettings {
    pub fn query_window(&self) -> Duration {
        Duration::from_secs(self.query_window_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_query_window_secs() -> u64 {
    DEFAULT_QUERY_WINDOW_SECS
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_concurrency() -> usize {
    1
}

/// Statistical summary requested from Azure Monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
pub enum Aggregation {
    Total,
    Average,
    Minimum,
    Maximum,
}

impl Aggregation {
    /// All kinds, in the order samples are emitted
    pub const ALL: [Aggregation; 4] = [
        Aggregation::Total,
        Aggregation::Average,
        Aggregation::Minimum,
        Aggregation::Maximum,
    ];

    /// Name used in the `aggregation` query parameter
    pub fn as_str(self) -> &'static str {
        match self {
            Aggregation::Total => "Total",
            Aggregation::Average => "Average",
            Aggregation::Minimum => "Minimum",
            Aggregation::Maximum => "Maximum",
        }
    }

    /// Suffix appended to the metric name of each emitted sample
    pub fn suffix(self) -> &'static str {
        match self {
            Aggregation::Total => "total",
            Aggregation::Average => "average",
            Aggregation::Minimum => "min",
            Aggregation::Maximum => "max",
        }
    }

    /// Requested kinds, falling back to all four when none are configured
    pub fn effective(requested: &[Aggregation]) -> Vec<Aggregation> {
        if requested.is_empty() {
            return Self::ALL.to_vec();
        }
        Self::ALL
            .into_iter()
            .filter(|a| requested.contains(a))
            .collect()
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resource-name pattern, compiled when the configuration is loaded
#[derive(Debug, Clone)]
pub struct Pattern(Regex);

impl Pattern {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Regex::new(pattern).map(Self)
    }

    /// Unanchored search, so `web` matches `my-web-1`
    pub fn is_match(&self, haystack: &str) -> bool {
        self.0.is_match(haystack)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl<'de> Deserialize<'de> for Pattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Pattern::new(&raw)
            .map_err(|e| serde::de::Error::custom(format!("error in regexp '{}': {}", raw, e)))
    }
}

impl Config {
    /// Read, parse and validate a configuration file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    /// Parse and validate a configuration document
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let creds = &self.credentials;
        for (field, value) in [
            ("subscription_id", &creds.subscription_id),
            ("client_id", &creds.client_id),
            ("client_secret", &creds.client_secret),
            ("tenant_id", &creds.tenant_id),
        ] {
            if value.is_empty() {
                return invalid(format!("credentials.{} must not be empty", field));
            }
        }

        for resource in &self.resources {
            if resource.name.is_empty() {
                return invalid("name needs to be specified in each resource".into());
            }
            if !resource.name.starts_with('/') {
                return invalid(format!(
                    "resource path {:?} must start with a /",
                    resource.name
                ));
            }
            if resource.metrics.is_empty() {
                return invalid(format!(
                    "at least one metric needs to be specified in resource {}",
                    resource.name
                ));
            }
        }

        for group in &self.resource_groups {
            if group.name.is_empty() {
                return invalid("name needs to be specified in each resource group".into());
            }
            if group.resource_types.is_empty() {
                return invalid(format!(
                    "at least one resource type needs to be specified in resource group {}",
                    group.name
                ));
            }
            if group.metrics.is_empty() {
                return invalid(format!(
                    "at least one metric needs to be specified in resource group {}",
                    group.name
                ));
            }
        }

        if self.scrape.query_window_secs == 0 {
            return invalid("scrape.query_window_secs must be greater than 0".into());
        }
        if self.scrape.query_window_secs > MAX_QUERY_WINDOW_SECS {
            return invalid(format!(
                "scrape.query_window_secs must be at most {}",
                MAX_QUERY_WINDOW_SECS
            ));
        }
        if self.scrape.request_timeout_secs == 0 {
            return invalid("scrape.request_timeout_secs must be greater than 0".into());
        }
        if self.scrape.concurrency == 0 {
            return invalid("scrape.concurrency must be at least 1".into());
        }

        Ok(())
    }
}

fn invalid(message: String) -> Result<(), ConfigError> {
    Err(ConfigError::Invalid(message))
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"
credentials:
  subscription_id: sub-1
  client_id: client
  client_secret: s3cret
  tenant_id: tenant
resources:
  - name: /resourceGroups/rg/providers/Microsoft.Compute/virtualMachines/vm1
    metrics: ["Percentage CPU"]
    aggregations: [Average, Maximum]
resource_groups:
  - name: web-rg
    resource_types: ["Microsoft.Web/sites"]
    resource_include: ["^web-"]
    resource_exclude: ["-staging$"]
    metrics: ["Requests"]
"#;

    #[test]
    fn test_parse_valid_config() {
        let config = Config::from_yaml(VALID).unwrap();
        assert_eq!(config.resources.len(), 1);
        assert_eq!(
            config.resources[0].aggregations,
            vec![Aggregation::Average, Aggregation::Maximum]
        );
        let group = &config.resource_groups[0];
        assert!(group.resource_include[0].is_match("web-prod"));
        assert!(group.resource_exclude[0].is_match("web-staging"));
        assert!(group.aggregations.is_empty());
        assert_eq!(config.scrape, ScrapeSettings::default());
        assert_eq!(config.endpoints, Endpoints::default());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let yaml = VALID.replace("tenant_id: tenant", "tenant_id: tenant\n  region: westeurope");
        assert!(matches!(Config::from_yaml(&yaml), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_invalid_aggregation_rejected() {
        let yaml = VALID.replace("[Average, Maximum]", "[Average, Median]");
        assert!(matches!(Config::from_yaml(&yaml), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_invalid_regex_rejected() {
        let yaml = VALID.replace("\"^web-\"", "\"web-(\"");
        let err = Config::from_yaml(&yaml).unwrap_err();
        assert!(err.to_string().contains("error in regexp"));
    }

    #[test]
    fn test_resource_path_must_be_rooted() {
        let yaml = VALID.replace(
            "name: /resourceGroups/rg",
            "name: resourceGroups/rg",
        );
        assert!(matches!(Config::from_yaml(&yaml), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_group_requires_resource_types() {
        let yaml = VALID.replace("resource_types: [\"Microsoft.Web/sites\"]", "resource_types: []");
        let err = Config::from_yaml(&yaml).unwrap_err();
        assert!(err.to_string().contains("resource type"));
    }

    #[test]
    fn test_query_window_bounds() {
        let zero = format!("{}scrape:\n  query_window_secs: 0\n", VALID);
        assert!(matches!(Config::from_yaml(&zero), Err(ConfigError::Invalid(_))));

        let huge = format!("{}scrape:\n  query_window_secs: 10000000000000\n", VALID);
        let err = Config::from_yaml(&huge).unwrap_err();
        assert!(err.to_string().contains("query_window_secs must be at most"));

        let max = format!(
            "{}scrape:\n  query_window_secs: {}\n",
            VALID, MAX_QUERY_WINDOW_SECS
        );
        assert_eq!(
            Config::from_yaml(&max).unwrap().scrape.query_window_secs,
            MAX_QUERY_WINDOW_SECS
        );
    }

    #[test]
    fn test_credentials_debug_redacts_secret() {
        let config = Config::from_yaml(VALID).unwrap();
        let debug = format!("{:?}", config.credentials);
        assert!(!debug.contains("s3cret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_effective_aggregations() {
        assert_eq!(Aggregation::effective(&[]), Aggregation::ALL.to_vec());
        assert_eq!(
            Aggregation::effective(&[Aggregation::Maximum, Aggregation::Total]),
            vec![Aggregation::Total, Aggregation::Maximum]
        );
    }
}
