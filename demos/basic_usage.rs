// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Basic elastic-query usage example.
//!
//! Demonstrates:
//! 1. Building a query expression over a document type
//! 2. Translating it to a search request
//! 3. Formatting the POST body and URI
//! 4. Materializing a canned engine response
//! 5. Displaying the metrics the library emitted
//!
//! # Run
//!
//! ```bash
//! RUST_LOG=elastic_query=debug cargo run --example basic_usage
//! ```

use elastic_query::expression::{DocumentType, Expression, Member};
use elastic_query::{format_request, translate, ConnectionConfig, ElasticMapping, SearchResponse};
use metrics_util::debugging::{DebugValue, DebuggingRecorder};
use serde::Deserialize;
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct Robot {
    id: String,
    name: String,
    cost: f64,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder.install().expect("failed to install metrics recorder");

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    // ─────────────────────────────────────────────────────────────────────────
    // 1. Build the query
    // ─────────────────────────────────────────────────────────────────────────
    let robots = DocumentType::new("Robot")
        .with_member(Member::string("Id"))
        .with_member(Member::string("Name"))
        .with_member(Member::float("Cost"));

    let r = || Expression::param("r");
    let query = Expression::source(robots)
        .where_(Expression::lambda(
            "r",
            r().member(Member::float("Cost"))
                .greater_than(100.0)
                .and_also(r().member(Member::string("Name")).contains("Droid")),
        ))
        .order_by_descending(Expression::lambda("r", r().member(Member::float("Cost"))))
        .take(10);

    // ─────────────────────────────────────────────────────────────────────────
    // 2. Translate and format
    // ─────────────────────────────────────────────────────────────────────────
    let mapping = ElasticMapping::default();
    let config = ConnectionConfig {
        index: Some("fleet".into()),
        timeout_ms: 5_000,
        ..Default::default()
    };

    let translated = translate(&mapping, "", &query)?;
    let request = format_request(&config, &mapping, &translated.search_request)?;

    println!("{:?} {}", request.method, request.uri);
    println!("{}", request.body.as_deref().unwrap_or(""));

    // ─────────────────────────────────────────────────────────────────────────
    // 3. Materialize a response
    // ─────────────────────────────────────────────────────────────────────────
    let response: SearchResponse = serde_json::from_value(json!({
        "took": 2,
        "timed_out": false,
        "hits": {
            "total": 1,
            "max_score": 1.0,
            "hits": [{
                "_index": "fleet",
                "_type": "robots",
                "_id": "ig-88",
                "_score": 1.0,
                "_source": {"id": "ig-88", "name": "IG-88 assassin droid", "cost": 180.0}
            }]
        }
    }))?;

    let robots: Vec<Robot> = translated.materializer.materialize(&response)?.into_typed()?;
    for robot in &robots {
        println!("{:?}", robot);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // 4. Metrics
    // ─────────────────────────────────────────────────────────────────────────
    for (key, _, _, value) in snapshotter.snapshot().into_vec() {
        match value {
            DebugValue::Counter(n) => println!("{} = {}", key.key().name(), n),
            DebugValue::Histogram(samples) => {
                println!("{} ({} samples)", key.key().name(), samples.len())
            }
            DebugValue::Gauge(g) => println!("{} = {}", key.key().name(), g),
        }
    }

    Ok(())
}
