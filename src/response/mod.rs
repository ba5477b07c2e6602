// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Response model consumed by the materializers.
//!
//! Decoding transport bytes is the caller's job; these types are what a
//! decoded search response looks like.

mod aggregate;
mod materializer;

pub use aggregate::{AggregateRow, Statistic};
pub use materializer::{Materialized, Materializer};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub took: u64,
    #[serde(default)]
    pub timed_out: bool,
    #[serde(rename = "_shards", default, skip_serializing_if = "Option::is_none")]
    pub shards: Option<ShardStatistics>,
    #[serde(default)]
    pub hits: Hits,
    /// Facet results keyed by facet name
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub facets: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardStatistics {
    pub total: u64,
    pub successful: u64,
    pub failed: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Hits {
    /// Total matches, independent of `from`/`size`
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub max_score: Option<f64>,
    #[serde(default)]
    pub hits: Vec<Hit>,
}

/// One matched document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    #[serde(rename = "_index", default)]
    pub index: String,
    #[serde(rename = "_type", default)]
    pub doc_type: String,
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(rename = "_score", default)]
    pub score: Option<f64>,
    #[serde(rename = "_source", default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Value>,
    /// Requested fields; the engine returns each as an array
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub fields: Map<String, Value>,
}

/// Follow a dotted path through nested objects.
pub(crate) fn select_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(value);
    }
    path.split('.')
        .try_fold(value, |current, segment| current.as_object()?.get(segment))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_hits_response() {
        let response: SearchResponse = serde_json::from_value(json!({
            "took": 3,
            "timed_out": false,
            "_shards": {"total": 5, "successful": 5, "failed": 0},
            "hits": {
                "total": 2,
                "max_score": 1.0,
                "hits": [
                    {"_index": "robots", "_type": "robot", "_id": "1", "_score": 1.0,
                     "_source": {"name": "marvin"}},
                    {"_index": "robots", "_type": "robot", "_id": "2", "_score": 0.5,
                     "fields": {"name": ["kryten"]}}
                ]
            }
        }))
        .unwrap();

        assert_eq!(response.hits.total, 2);
        assert_eq!(response.hits.hits[0].id, "1");
        assert_eq!(response.hits.hits[1].fields["name"], json!(["kryten"]));
        assert_eq!(response.shards.map(|s| s.successful), Some(5));
        assert!(response.facets.is_empty());
    }

    #[test]
    fn test_decode_minimal_response() {
        let response: SearchResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(response.hits.total, 0);
        assert!(response.hits.hits.is_empty());
    }

    #[test]
    fn test_select_path() {
        let doc = json!({"stats": {"location": {"zone": 7}}});
        assert_eq!(select_path(&doc, "stats.location.zone"), Some(&json!(7)));
        assert_eq!(select_path(&doc, ""), Some(&doc));
        assert_eq!(select_path(&doc, "stats.missing"), None);
    }
}
