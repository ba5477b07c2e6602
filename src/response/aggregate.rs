// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Flattening of facet results into one row per group.
//!
//! Terms-style facets (`terms`, `terms_stats`) contribute one entry per
//! distinct key; rows are created in the order keys are first seen. For a
//! constant group key there is exactly one row holding every facet body.

use serde_json::{Map, Value};
use std::collections::HashMap;

/// Value read from a facet entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Statistic {
    Count,
    Total,
    Min,
    Max,
    Mean,
}

impl Statistic {
    pub fn key(self) -> &'static str {
        match self {
            Statistic::Count => "count",
            Statistic::Total => "total",
            Statistic::Min => "min",
            Statistic::Max => "max",
            Statistic::Mean => "mean",
        }
    }
}

/// One group: its key plus the facet entries that mention it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateRow {
    pub key: Value,
    entries: HashMap<String, Map<String, Value>>,
}

impl AggregateRow {
    pub fn new(key: Value) -> Self {
        Self {
            key,
            entries: HashMap::new(),
        }
    }

    /// Read a statistic. Counts absent from a facet are zero; anything else is null.
    pub fn statistic(&self, facet: &str, statistic: Statistic) -> Value {
        match self.entries.get(facet).and_then(|e| e.get(statistic.key())) {
            Some(value) => value.clone(),
            None if statistic == Statistic::Count => Value::from(0),
            None => Value::Null,
        }
    }

    fn insert(&mut self, facet: &str, entry: Map<String, Value>) {
        self.entries.insert(facet.to_string(), entry);
    }

    /// Flatten terms-style facets into one row per distinct term.
    pub fn from_terms(facets: &Map<String, Value>) -> Vec<AggregateRow> {
        let mut rows: Vec<AggregateRow> = Vec::new();

        for (name, body) in facets {
            let Some(terms) = body.get("terms").and_then(Value::as_array) else {
                continue;
            };
            for entry in terms.iter().filter_map(Value::as_object) {
                let Some(term) = entry.get("term") else {
                    continue;
                };
                let index = match rows.iter().position(|r| r.key == *term) {
                    Some(index) => index,
                    None => {
                        rows.push(AggregateRow::new(term.clone()));
                        rows.len() - 1
                    }
                };
                rows[index].insert(name, entry.clone());
            }
        }

        rows
    }

    /// A single row holding every facet body under a constant key.
    pub fn from_constant(key: Value, facets: &Map<String, Value>) -> AggregateRow {
        let mut row = AggregateRow::new(key);
        for (name, body) in facets {
            if let Some(object) = body.as_object() {
                row.insert(name, object.clone());
            }
        }
        row
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn facets(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn test_rows_from_terms_in_first_seen_order() {
        let facets = facets(json!({
            "GroupKey": {"_type": "terms", "terms": [
                {"term": "b", "count": 2},
                {"term": "a", "count": 5}
            ]},
            "cost": {"_type": "terms_stats", "terms": [
                {"term": "a", "count": 5, "total": 50.0, "mean": 10.0},
                {"term": "c", "count": 1, "total": 3.0, "mean": 3.0}
            ]}
        }));

        let rows = AggregateRow::from_terms(&facets);
        let keys: Vec<&Value> = rows.iter().map(|r| &r.key).collect();
        assert_eq!(keys, vec![&json!("b"), &json!("a"), &json!("c")]);

        assert_eq!(rows[1].statistic("GroupKey", Statistic::Count), json!(5));
        assert_eq!(rows[1].statistic("cost", Statistic::Total), json!(50.0));
        // "b" has no terms_stats entry
        assert_eq!(rows[0].statistic("cost", Statistic::Count), json!(0));
        assert_eq!(rows[0].statistic("cost", Statistic::Mean), Value::Null);
    }

    #[test]
    fn test_constant_row() {
        let facets = facets(json!({
            "GroupKey": {"_type": "filter", "count": 12},
            "cost": {"_type": "statistical", "count": 12, "min": 1.0, "max": 9.0}
        }));

        let row = AggregateRow::from_constant(json!(1), &facets);
        assert_eq!(row.key, json!(1));
        assert_eq!(row.statistic("GroupKey", Statistic::Count), json!(12));
        assert_eq!(row.statistic("cost", Statistic::Max), json!(9.0));
    }

    #[test]
    fn test_non_terms_facets_are_skipped() {
        let facets = facets(json!({"f": {"_type": "filter", "count": 3}}));
        assert!(AggregateRow::from_terms(&facets).is_empty());
    }
}
