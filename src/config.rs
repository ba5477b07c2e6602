//! Configuration for request formatting and the default field mapping.
//!
//! # Example
//!
//! ```
//! use elastic_query::{ConnectionConfig, MappingOptions};
//!
//! // Minimal config (uses defaults)
//! let config = ConnectionConfig::default();
//! assert_eq!(config.endpoint, "http://localhost:9200");
//! assert!(config.timeout().is_zero());
//!
//! // Full config
//! let config = ConnectionConfig {
//!     endpoint: "http://search.internal:9200".into(),
//!     index: Some("robots".into()),
//!     timeout_ms: 1_500,
//!     ..Default::default()
//! };
//!
//! let options = MappingOptions {
//!     pluralize_type_names: false,
//!     ..Default::default()
//! };
//! ```

use serde::Deserialize;
use std::time::Duration;

/// Where and how requests are sent to the search engine.
///
/// The core never opens a connection; these values only shape the
/// formatted URI and body.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionConfig {
    /// Base endpoint (e.g., "http://localhost:9200")
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Index to search; `None` searches `_all`
    #[serde(default)]
    pub index: Option<String>,

    /// Server-side search timeout in milliseconds (0 = not sent)
    #[serde(default)]
    pub timeout_ms: u64,

    /// Render URI searches instead of POST bodies when the request allows it
    #[serde(default)]
    pub prefer_get_requests: bool,
}

fn default_endpoint() -> String { "http://localhost:9200".to_string() }

impl ConnectionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            index: None,
            timeout_ms: 0,
            prefer_get_requests: false,
        }
    }
}

/// Naming conventions for [`ElasticMapping`](crate::ElasticMapping).
#[derive(Debug, Clone, Deserialize)]
pub struct MappingOptions {
    /// `SerialNumber` becomes `serialNumber`
    #[serde(default = "default_true")]
    pub camel_case_field_names: bool,

    /// `Robot` becomes `robot`
    #[serde(default = "default_true")]
    pub camel_case_type_names: bool,

    /// `robot` becomes `robots`
    #[serde(default = "default_true")]
    pub pluralize_type_names: bool,

    /// String values are lower-cased to match analyzed fields
    #[serde(default = "default_true")]
    pub lower_case_analyzed_field_values: bool,
}

fn default_true() -> bool { true }

impl Default for MappingOptions {
    fn default() -> Self {
        Self {
            camel_case_field_names: true,
            camel_case_type_names: true,
            pluralize_type_names: true,
            lower_case_analyzed_field_values: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_defaults_from_empty_json() {
        let config: ConnectionConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.endpoint, "http://localhost:9200");
        assert_eq!(config.index, None);
        assert_eq!(config.timeout(), Duration::ZERO);
        assert!(!config.prefer_get_requests);
    }

    #[test]
    fn test_connection_partial_json() {
        let config: ConnectionConfig =
            serde_json::from_str(r#"{"index": "robots", "timeout_ms": 2500}"#).unwrap();
        assert_eq!(config.index.as_deref(), Some("robots"));
        assert_eq!(config.timeout(), Duration::from_millis(2500));
    }

    #[test]
    fn test_mapping_options_default_all_enabled() {
        let options: MappingOptions = serde_json::from_str("{}").unwrap();
        assert!(options.camel_case_field_names);
        assert!(options.camel_case_type_names);
        assert!(options.pluralize_type_names);
        assert!(options.lower_case_analyzed_field_values);
    }
}
