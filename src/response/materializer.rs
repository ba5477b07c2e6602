// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Result materializers: search responses to output values.

use super::SearchResponse;
use crate::error::{QueryError, Result};
use crate::metrics;
use crate::translate::{FacetProjector, Projector};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

/// How a response becomes the caller's result, fixed at translation time.
#[derive(Debug, Clone, PartialEq)]
pub enum Materializer {
    /// Every hit through the projector, in engine order
    ManyHits { projector: Projector },
    /// First/Single and their `or_default` forms
    OneHit {
        projector: Projector,
        /// Fail when more than one hit came back
        strict: bool,
        /// Return null instead of failing on zero hits
        or_default: bool,
    },
    /// The engine-reported total
    Count,
    /// Aggregate rows built from the facet results
    ManyFacets { projector: FacetProjector },
}

/// A materialized result.
#[derive(Debug, Clone, PartialEq)]
pub enum Materialized {
    Many(Vec<Value>),
    One(Value),
    Count(u64),
}

impl Materialized {
    /// Decode into a caller type with serde.
    pub fn into_typed<T: DeserializeOwned>(self) -> Result<T> {
        let value = match self {
            Materialized::Many(values) => Value::Array(values),
            Materialized::One(value) => value,
            Materialized::Count(count) => Value::from(count),
        };
        Ok(serde_json::from_value(value)?)
    }
}

impl Materializer {
    /// Label used in logs and metrics
    pub fn name(&self) -> &'static str {
        match self {
            Materializer::ManyHits { .. } => "many_hits",
            Materializer::OneHit { .. } => "one_hit",
            Materializer::Count => "count",
            Materializer::ManyFacets { .. } => "many_facets",
        }
    }

    #[tracing::instrument(skip(self, response), fields(materializer = self.name()))]
    pub fn materialize(&self, response: &SearchResponse) -> Result<Materialized> {
        let result = self.apply(response);

        match &result {
            Ok(Materialized::Many(values)) => {
                metrics::record_materialized(self.name(), "success");
                metrics::record_materialized_items(values.len());
            }
            Ok(_) => metrics::record_materialized(self.name(), "success"),
            Err(e) => {
                debug!(error = %e, "Materialization failed");
                metrics::record_materialized(self.name(), e.kind());
            }
        }
        result
    }

    fn apply(&self, response: &SearchResponse) -> Result<Materialized> {
        let hits = &response.hits.hits;

        match self {
            Materializer::ManyHits { projector } => hits
                .iter()
                .map(|hit| projector.project(hit))
                .collect::<Result<Vec<_>>>()
                .map(Materialized::Many),

            Materializer::OneHit {
                projector,
                strict,
                or_default,
            } => {
                if *strict && hits.len() > 1 {
                    return Err(QueryError::MultipleResults);
                }
                match hits.first() {
                    Some(hit) => Ok(Materialized::One(projector.project(hit)?)),
                    None if *or_default => Ok(Materialized::One(Value::Null)),
                    None => Err(QueryError::NoResult),
                }
            }

            Materializer::Count => Ok(Materialized::Count(response.hits.total)),

            Materializer::ManyFacets { projector } => {
                projector.project(&response.facets).map(Materialized::Many)
            }
        }
    }
}
