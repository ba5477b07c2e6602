// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metrics instrumentation for query translation.
//!
//! Uses the `metrics` crate for backend-agnostic metrics collection.
//! The host application is responsible for choosing the exporter.
//!
//! # Metric Naming Convention
//! - `elastic_query_` prefix for all metrics
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Labels
//! - `outcome`: success or an error kind (see [`QueryError::kind`](crate::QueryError::kind))
//! - `method`: post, get
//! - `materializer`: many_hits, one_hit, count, many_facets

use metrics::{counter, histogram};
use std::time::{Duration, Instant};

/// Record the outcome of a translation
pub fn record_translation(outcome: &str) {
    counter!(
        "elastic_query_translations_total",
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record how long a stage took
pub fn record_latency(stage: &str, duration: Duration) {
    histogram!(
        "elastic_query_stage_seconds",
        "stage" => stage.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Record facets extracted from an aggregate query
pub fn record_facets(count: usize) {
    counter!("elastic_query_facets_total").increment(count as u64);
}

/// Record a formatted request
pub fn record_request_formatted(method: &str) {
    counter!(
        "elastic_query_requests_formatted_total",
        "method" => method.to_string()
    )
    .increment(1);
}

/// Record a materialization attempt
pub fn record_materialized(materializer: &str, status: &str) {
    counter!(
        "elastic_query_materialized_total",
        "materializer" => materializer.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record how many items a materializer produced
pub fn record_materialized_items(count: usize) {
    histogram!("elastic_query_materialized_items").record(count as f64);
}

/// A timing guard that records latency on drop
pub struct LatencyTimer {
    stage: &'static str,
    start: Instant,
}

impl LatencyTimer {
    /// Start a new latency timer
    pub fn new(stage: &'static str) -> Self {
        Self {
            stage,
            start: Instant::now(),
        }
    }
}

impl Drop for LatencyTimer {
    fn drop(&mut self) {
        record_latency(self.stage, self.start.elapsed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_util::debugging::DebuggingRecorder;

    #[test]
    fn test_record_without_recorder_is_noop() {
        record_translation("success");
        record_facets(3);
        record_request_formatted("post");
        record_materialized("many_hits", "success");
        record_materialized_items(10);
    }

    #[test]
    fn test_counters_reach_recorder() {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();

        metrics::with_local_recorder(&recorder, || {
            record_translation("success");
            record_request_formatted("get");
        });

        let names: Vec<String> = snapshotter
            .snapshot()
            .into_vec()
            .into_iter()
            .map(|(key, _, _, _)| key.key().name().to_string())
            .collect();
        assert!(names.contains(&"elastic_query_translations_total".to_string()));
        assert!(names.contains(&"elastic_query_requests_formatted_total".to_string()));
    }

    #[test]
    fn test_latency_timer() {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();

        metrics::with_local_recorder(&recorder, || {
            let _timer = LatencyTimer::new("translate");
        });

        let recorded = snapshotter
            .snapshot()
            .into_vec()
            .into_iter()
            .any(|(key, _, _, _)| key.key().name() == "elastic_query_stage_seconds");
        assert!(recorded);
    }
}
