//! End-to-end tests: expression -> translate -> format -> materialize.
//!
//! Every test runs the full pipeline with the default mapping and checks the
//! exact bytes a transport would send.
//!
//! Run with: `cargo test --test translation`

use serde_json::{json, Value};

use elastic_query::expression::{DocumentType, Expression, Member, ValueType};
use elastic_query::{
    format_request, translate, ConnectionConfig, ElasticMapping, Materialized, Materializer, QueryError,
    RequestMethod, SearchResponse, TranslateResult,
};

// =============================================================================
// Helpers
// =============================================================================

fn robots() -> Expression {
    Expression::source(
        DocumentType::new("Robot")
            .with_member(Member::string("Id"))
            .with_member(Member::string("Name"))
            .with_member(Member::float("Cost")),
    )
}

fn r() -> Expression {
    Expression::param("r")
}

fn field(member: Member) -> Expression {
    Expression::lambda("r", r().member(member))
}

fn run(query: &Expression) -> TranslateResult {
    translate(&ElasticMapping::default(), "", query).expect("translation")
}

fn body(query: &Expression) -> String {
    body_with(&ConnectionConfig::default(), query)
}

fn body_with(config: &ConnectionConfig, query: &Expression) -> String {
    let mapping = ElasticMapping::default();
    let translated = run(query);
    format_request(config, &mapping, &translated.search_request)
        .expect("format")
        .body
        .expect("POST body")
}

fn response(value: Value) -> SearchResponse {
    serde_json::from_value(value).expect("response")
}

fn hits(sources: &[Value]) -> SearchResponse {
    let hits: Vec<Value> = sources
        .iter()
        .enumerate()
        .map(|(i, s)| json!({"_index": "robots", "_type": "robot", "_id": i.to_string(), "_score": 1.0, "_source": s}))
        .collect();
    response(json!({
        "took": 3,
        "timed_out": false,
        "_shards": {"total": 5, "successful": 5, "failed": 0},
        "hits": {"total": hits.len(), "max_score": 1.0, "hits": hits}
    }))
}

// =============================================================================
// Request bodies
// =============================================================================

#[test]
fn filter_equality_is_a_bare_term() {
    let query = robots().where_(Expression::lambda("r", r().member(Member::string("X")).equal("v")));
    assert_eq!(body(&query), r#"{"filter":{"term":{"x":"v"}}}"#);
}

#[test]
fn plain_source_filters_on_type_existence() {
    assert_eq!(body(&robots()), r#"{"filter":{"exists":{"field":"id"}}}"#);
}

#[test]
fn order_by_then_by_keeps_order() {
    let query = robots()
        .order_by(field(Member::integer("A")))
        .then_by_descending(field(Member::integer("B")));
    assert_eq!(
        body(&query),
        r#"{"filter":{"exists":{"field":"id"}},"sort":["a",{"b":"desc"}]}"#
    );
}

#[test]
fn nullable_sort_key_ignores_unmapped() {
    let query = robots().order_by(field(Member::new("Retired", ValueType::optional(ValueType::Date))));
    assert_eq!(
        body(&query),
        r#"{"filter":{"exists":{"field":"id"}},"sort":[{"retired":{"ignore_unmapped":true}}]}"#
    );
}

#[test]
fn skip_and_take_compose() {
    let query = robots().skip(5).take(10).take(3);
    assert_eq!(
        body(&query),
        r#"{"filter":{"exists":{"field":"id"}},"from":5,"size":3}"#
    );
}

#[test]
fn substring_search_is_lower_cased_in_query_context() {
    let query = robots().where_(Expression::lambda(
        "r",
        r().member(Member::string("Name")).contains("BoT"),
    ));
    assert_eq!(body(&query), r#"{"query":{"wildcard":{"name":"*bot*"}}}"#);
}

#[test]
fn query_string_and_filter_coexist() {
    let query = robots()
        .where_(Expression::lambda("r", r().member(Member::float("Cost")).less_or_equal(9.5)))
        .query_string("marvin");
    assert_eq!(
        body(&query),
        r#"{"query":{"query_string":{"query":"marvin"}},"filter":{"range":{"cost":{"lte":9.5}}}}"#
    );
}

#[test]
fn ranges_on_one_field_merge() {
    let cost = || r().member(Member::float("Cost"));
    let query = robots().where_(Expression::lambda(
        "r",
        cost().greater_than(1.5).and_also(cost().less_than(8.5)),
    ));
    assert_eq!(body(&query), r#"{"filter":{"range":{"cost":{"gt":1.5,"lt":8.5}}}}"#);
}

#[test]
fn ranges_bounding_the_same_side_stay_separate() {
    let cost = || r().member(Member::float("Cost"));
    let query = robots().where_(Expression::lambda(
        "r",
        cost().greater_than(5).and_also(cost().greater_than(1)),
    ));
    assert_eq!(
        body(&query),
        r#"{"filter":{"and":[{"range":{"cost":{"gt":5}}},{"range":{"cost":{"gt":1}}}]}}"#
    );
}

#[test]
fn timeout_is_appended_last() {
    let config = ConnectionConfig {
        timeout_ms: 120_000,
        ..Default::default()
    };
    let query = robots().take(1);
    assert_eq!(
        body_with(&config, &query),
        r#"{"filter":{"exists":{"field":"id"}},"size":1,"timeout":"2m"}"#
    );
}

#[test]
fn field_projection_requests_fields() {
    let query = robots().select(field(Member::string("Name")));
    assert_eq!(body(&query), r#"{"fields":["name"],"filter":{"exists":{"field":"id"}}}"#);
}

#[test]
fn uri_targets_index_and_type() {
    let config = ConnectionConfig {
        endpoint: "http://search:9200".into(),
        index: Some("fleet".into()),
        ..Default::default()
    };
    let translated = run(&robots());
    let request = format_request(&config, &ElasticMapping::default(), &translated.search_request).unwrap();
    assert_eq!(request.method, RequestMethod::Post);
    assert_eq!(request.uri, "http://search:9200/fleet/robots/_search");
}

#[test]
fn get_request_renders_uri_search() {
    let config = ConnectionConfig {
        prefer_get_requests: true,
        ..Default::default()
    };
    let query = robots()
        .where_(Expression::lambda("r", r().member(Member::string("Name")).equal("marvin")))
        .take(2);
    let translated = run(&query);
    let request = format_request(&config, &ElasticMapping::default(), &translated.search_request).unwrap();

    assert_eq!(request.method, RequestMethod::Get);
    assert_eq!(request.body, None);
    assert_eq!(
        request.uri,
        "http://localhost:9200/_all/robots/_search?q=name%3Amarvin&size=2"
    );
}

// =============================================================================
// Aggregates
// =============================================================================

fn zone_counts() -> Expression {
    robots()
        .where_(Expression::lambda("r", r().member(Member::boolean("Active"))))
        .group_by(field(Member::integer("Zone")))
        .select(Expression::lambda(
            "g",
            Expression::new_object(vec![
                ("Zone", Expression::param("g").key()),
                ("Robots", Expression::param("g").count()),
            ]),
        ))
}

#[test]
fn aggregate_filter_moves_into_facets() {
    let translated = run(&zone_counts());
    let request =
        format_request(&ConnectionConfig::default(), &ElasticMapping::default(), &translated.search_request)
            .unwrap();

    assert_eq!(request.uri, "http://localhost:9200/_all/robots/_search?search_type=count");
    assert_eq!(
        request.body.as_deref(),
        Some(r#"{"facets":{"GroupKey":{"terms":{"field":"zone"},"facet_filter":{"term":{"active":true}}}}}"#)
    );
}

#[test]
fn relocated_filter_keeps_its_bounds_in_every_facet() {
    let cost = || Expression::param("x").member(Member::float("Cost"));
    let query = robots()
        .where_(Expression::lambda("r", r().member(Member::float("Cost")).greater_than(5)))
        .group_by(field(Member::integer("Zone")))
        .select(Expression::lambda(
            "g",
            Expression::new_object(vec![
                ("Cheap", Expression::param("g").count_where(Expression::lambda("x", cost().greater_than(1)))),
                ("Capped", Expression::param("g").count_where(Expression::lambda("x", cost().less_than(9)))),
            ]),
        ));

    assert_eq!(
        body(&query),
        concat!(
            r#"{"facets":{"#,
            r#""range cost gt 1":{"terms":{"field":"zone"},"#,
            r#""facet_filter":{"and":[{"range":{"cost":{"gt":5}}},{"range":{"cost":{"gt":1}}}]}},"#,
            r#""range cost lt 9":{"terms":{"field":"zone"},"#,
            r#""facet_filter":{"range":{"cost":{"gt":5,"lt":9}}}}"#,
            r#"}}"#
        )
    );
}

#[test]
fn aggregate_rows_from_facet_response() {
    let translated = run(&zone_counts());
    let response = response(json!({
        "hits": {"total": 4, "hits": []},
        "facets": {
            "GroupKey": {"_type": "terms", "terms": [{"term": 1, "count": 3}, {"term": 2, "count": 1}]}
        }
    }));

    let rows = translated.materializer.materialize(&response).unwrap();
    assert_eq!(
        rows,
        Materialized::Many(vec![
            json!({"Zone": 1, "Robots": 3}),
            json!({"Zone": 2, "Robots": 1}),
        ])
    );
}

#[test]
fn take_sizes_aggregate_facets() {
    let translated = run(&zone_counts().take(25));
    let body = format_request(&ConnectionConfig::default(), &ElasticMapping::default(), &translated.search_request)
        .unwrap()
        .body
        .unwrap();
    assert!(body.contains(r#""terms":{"field":"zone","size":"25"}"#));
}

// =============================================================================
// Materialization
// =============================================================================

#[test]
fn many_hits_in_engine_order() {
    let translated = run(&robots());
    let result = translated
        .materializer
        .materialize(&hits(&[json!({"name": "b"}), json!({"name": "a"})]))
        .unwrap();
    assert_eq!(result, Materialized::Many(vec![json!({"name": "b"}), json!({"name": "a"})]));
}

#[test]
fn single_sets_size_two_and_rejects_two_hits() {
    let translated = run(&robots().single());
    assert_eq!(translated.search_request.size, Some(2));

    let err = translated
        .materializer
        .materialize(&hits(&[json!({"name": "a"}), json!({"name": "b"})]))
        .unwrap_err();
    assert!(matches!(err, QueryError::MultipleResults));
}

#[test]
fn first_or_default_on_empty_response() {
    let translated = run(&robots().first_or_default());
    assert_eq!(translated.search_request.size, Some(1));

    let result = translated.materializer.materialize(&hits(&[])).unwrap();
    assert_eq!(result, Materialized::One(Value::Null));
}

#[test]
fn count_reports_total() {
    let translated = run(&robots().count());
    assert_eq!(translated.materializer, Materializer::Count);

    let response = response(json!({"hits": {"total": 1234, "hits": []}}));
    let count: u64 = translated
        .materializer
        .materialize(&response)
        .unwrap()
        .into_typed()
        .unwrap();
    assert_eq!(count, 1234);
}

#[test]
fn projected_field_reads_hit_fields() {
    let translated = run(&robots().select(field(Member::string("Name"))).first());
    let response = response(json!({
        "hits": {"total": 1, "hits": [{"_id": "1", "fields": {"name": ["Marvin"]}}]}
    }));
    let result = translated.materializer.materialize(&response).unwrap();
    assert_eq!(result, Materialized::One(json!("Marvin")));
}
