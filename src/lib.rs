//! # Elastic Query
//!
//! Translates composable query expressions into Elasticsearch search
//! requests and turns the engine's responses back into results.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Query Expression                        │
//! │  • source(Robot).where_(..).order_by(..).take(10)          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        translate()                          │
//! │  • Partial evaluation of constant subtrees                 │
//! │  • Facet rebinding for group_by + aggregates               │
//! │  • Criteria, sort, paging and projection extraction        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!              (SearchRequest + Materializer)
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     format_request()                        │
//! │  • POST body with stable key order                         │
//! │  • GET URI search when preferred and possible              │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                 (caller sends, decodes response)
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Materializer::materialize()                 │
//! │  • Hits, a single hit, the total, or aggregate rows        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use elastic_query::expression::{DocumentType, Expression, Member};
//! use elastic_query::{format_request, translate, ConnectionConfig, ElasticMapping};
//!
//! let robots = DocumentType::new("Robot")
//!     .with_member(Member::string("Id"))
//!     .with_member(Member::float("Cost"));
//!
//! let query = Expression::source(robots)
//!     .where_(Expression::lambda(
//!         "r",
//!         Expression::param("r").member(Member::float("Cost")).greater_than(10.5),
//!     ))
//!     .take(5);
//!
//! let mapping = ElasticMapping::default();
//! let translated = translate(&mapping, "", &query).unwrap();
//! let request = format_request(&ConnectionConfig::default(), &mapping, &translated.search_request).unwrap();
//!
//! assert_eq!(request.uri, "http://localhost:9200/_all/robots/_search");
//! assert_eq!(request.body.as_deref(), Some(r#"{"filter":{"range":{"cost":{"gt":10.5}}},"size":5}"#));
//! ```
//!
//! ## Modules
//!
//! - [`expression`]: Query AST and the partial evaluator
//! - [`criteria`]: Condition tree and its combination rules
//! - [`translate`]: Expression to [`SearchRequest`] + [`Materializer`]
//! - [`format`]: Request formatting (POST body, GET URI)
//! - [`response`]: Response model and materializers
//! - [`mapping`]: Field naming and value formatting

pub mod config;
pub mod criteria;
pub mod error;
pub mod expression;
pub mod format;
pub mod mapping;
pub mod metrics;
pub mod request;
pub mod response;
pub mod translate;

pub use config::{ConnectionConfig, MappingOptions};
pub use criteria::{Criteria, RangeComparison, RangeSpecification, TermsExecutionMode};
pub use error::{QueryError, Result};
pub use expression::{DocumentType, Expression, Member, PartialEvaluator, ValueType};
pub use format::{format_request, FormattedRequest, RequestMethod};
pub use mapping::{ElasticMapping, FieldMapping};
pub use metrics::LatencyTimer;
pub use request::{Facet, SearchRequest, SortOption};
pub use response::{Hit, Hits, Materialized, Materializer, SearchResponse};
pub use translate::{translate, FacetProjector, Projector, TranslateResult};
