// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Query Translator
//!
//! Walks a query expression from the outermost operator inward and produces
//! a [`SearchRequest`] plus the [`Materializer`] that will turn the response
//! into results.
//!
//! # Pipeline
//!
//! ```text
//! Expression -> PartialEvaluator -> facet rebind?
//!     yes: visit source below group_by, attach facets   (ManyFacets)
//!     no:  visit the operator chain                     (ManyHits/OneHit/Count)
//! ```
//!
//! # Example
//!
//! ```rust
//! use elastic_query::expression::{DocumentType, Expression, Member};
//! use elastic_query::{translate, ElasticMapping};
//!
//! let robots = DocumentType::new("Robot").with_member(Member::string("Id"));
//! let query = Expression::source(robots).where_(Expression::lambda(
//!     "r",
//!     Expression::param("r").member(Member::string("Name")).equal("marvin"),
//! ));
//!
//! let result = translate(&ElasticMapping::default(), "", &query).unwrap();
//! assert!(result.search_request.filter.is_some());
//! ```

mod facets;
mod predicate;
mod projection;

pub use facets::{FacetProjector, GROUP_KEY_FACET};
pub use projection::Projector;

use crate::criteria::Criteria;
use crate::error::{QueryError, Result};
use crate::expression::{method, DocumentType, ElasticField, Expression, Member, PartialEvaluator, UnaryOperator, ValueType};
use crate::mapping::FieldMapping;
use crate::metrics::{self, LatencyTimer};
use crate::request::{SearchRequest, SortOption};
use crate::response::Materializer;
use predicate::PredicateTranslator;
use serde_json::Value;
use tracing::{debug, warn};

/// The sole output of a translation. Immutable once returned.
#[derive(Debug, Clone)]
pub struct TranslateResult {
    pub search_request: SearchRequest,
    pub materializer: Materializer,
}

/// Translate a query expression into a search request and materializer.
///
/// `prefix` namespaces every resolved field path (empty for none).
#[tracing::instrument(skip(mapping, expression))]
pub fn translate(mapping: &dyn FieldMapping, prefix: &str, expression: &Expression) -> Result<TranslateResult> {
    let _timer = LatencyTimer::new("translate");

    let result = QueryTranslator::new(mapping, prefix).translate(expression);
    match &result {
        Ok(translated) => {
            metrics::record_translation("success");
            debug!(
                materializer = translated.materializer.name(),
                facets = translated.search_request.facets.len(),
                "Translated query"
            );
        }
        Err(e) => {
            metrics::record_translation(e.kind());
            debug!(error = %e, "Translation failed");
        }
    }
    result
}

/// Cardinality requested by the outermost terminal operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Terminal {
    OneHit { strict: bool, or_default: bool },
    Count,
}

struct QueryTranslator<'a> {
    mapping: &'a dyn FieldMapping,
    prefix: &'a str,
    request: SearchRequest,
    source_type: Option<DocumentType>,
    terminal: Option<Terminal>,
    item_projector: Option<Projector>,
    /// Where the document sits inside `_source`
    document_prefix: Option<String>,
}

impl<'a> QueryTranslator<'a> {
    fn new(mapping: &'a dyn FieldMapping, prefix: &'a str) -> Self {
        Self {
            mapping,
            prefix,
            request: SearchRequest::new(),
            source_type: None,
            terminal: None,
            item_projector: None,
            document_prefix: None,
        }
    }

    fn translate(mut self, expression: &Expression) -> Result<TranslateResult> {
        let evaluated = PartialEvaluator::evaluate(expression)?;
        // Operators are visited outermost first, before the source is reached
        self.document_prefix =
            chain_source(&evaluated).and_then(|doc| self.mapping.document_mapping_prefix(doc));

        match facets::rebind_facets(self.mapping, self.prefix, &evaluated)? {
            Some(rebound) => {
                self.visit(rebound.source)?;
                let source_type = self.source_type()?;
                self.request.document_type = self.mapping.document_type(&source_type);

                debug!(count = rebound.facets.len(), "Extracted facets from aggregate query");
                metrics::record_facets(rebound.facets.len());

                self.request.facets = rebound.facets;
                self.request.search_type = Some("count".to_string());
                Ok(TranslateResult {
                    search_request: self.request,
                    materializer: Materializer::ManyFacets {
                        projector: rebound.projector,
                    },
                })
            }
            None => {
                self.visit(&evaluated)?;
                self.complete_hit_translation()
            }
        }
    }

    fn source_type(&self) -> Result<DocumentType> {
        self.source_type
            .clone()
            .ok_or_else(|| QueryError::unsupported("query without a document source"))
    }

    fn complete_hit_translation(mut self) -> Result<TranslateResult> {
        let source_type = self.source_type()?;
        self.request.document_type = self.mapping.document_type(&source_type);

        if self.request.filter.is_none() && self.request.query.is_none() {
            self.request.filter = Some(self.mapping.type_exists_criteria(&source_type));
        }

        let projector = self
            .item_projector
            .unwrap_or_else(|| Projector::document(self.document_prefix.clone()));

        let materializer = match self.terminal {
            None => Materializer::ManyHits { projector },
            Some(Terminal::OneHit { strict, or_default }) => Materializer::OneHit {
                projector,
                strict,
                or_default,
            },
            Some(Terminal::Count) => Materializer::Count,
        };

        Ok(TranslateResult {
            search_request: self.request,
            materializer,
        })
    }

    fn visit(&mut self, expression: &Expression) -> Result<()> {
        match expression {
            Expression::Source(document_type) => {
                self.source_type = Some(document_type.clone());
                Ok(())
            }
            Expression::Unary {
                op: UnaryOperator::Convert,
                operand,
            } => self.visit(operand),
            Expression::Call { method, args } => self.visit_call(method, args),
            other => Err(QueryError::unsupported(format!("query source '{}'", other))),
        }
    }

    fn visit_call(&mut self, name: &str, args: &[Expression]) -> Result<()> {
        let (source, rest) = args
            .split_first()
            .ok_or_else(|| QueryError::unsupported(format!("method '{}' without a source", name)))?;

        match (name, rest) {
            (method::WHERE, [predicate]) => self.visit_where(predicate)?,
            (method::QUERY, [predicate]) => self.visit_query(predicate)?,
            (method::QUERY_STRING, [text]) => {
                let text = text
                    .as_constant()
                    .and_then(Value::as_str)
                    .ok_or_else(|| QueryError::unsupported(format!("query_string argument '{}'", text)))?;
                self.apply_query(Criteria::query_string(text));
            }

            (method::ORDER_BY | method::THEN_BY, [key]) => self.visit_order_by(key, true)?,
            (method::ORDER_BY_DESCENDING | method::THEN_BY_DESCENDING, [key]) => {
                self.visit_order_by(key, false)?
            }
            (method::ORDER_BY_SCORE | method::THEN_BY_SCORE, []) => {
                self.request
                    .push_primary_sort(SortOption::new(ElasticField::Score.field_name(), true));
            }
            (method::ORDER_BY_SCORE_DESCENDING | method::THEN_BY_SCORE_DESCENDING, []) => {
                self.request
                    .push_primary_sort(SortOption::new(ElasticField::Score.field_name(), false));
            }

            (method::SELECT, [selector]) => self.visit_select(selector)?,
            (method::SKIP, [count]) => self.request.from = self.count_argument(name, count)?,
            (method::TAKE, [count]) => {
                let n = self.count_argument(name, count)?;
                self.request.limit_size(n);
            }

            (method::FIRST | method::FIRST_OR_DEFAULT | method::SINGLE | method::SINGLE_OR_DEFAULT, []) => {
                self.visit_first_or_single(name);
            }
            (
                method::FIRST | method::FIRST_OR_DEFAULT | method::SINGLE | method::SINGLE_OR_DEFAULT,
                [predicate],
            ) => {
                self.visit_first_or_single(name);
                self.visit_where(predicate)?;
            }

            (method::COUNT | method::LONG_COUNT, []) => {
                self.set_terminal(name, Terminal::Count);
            }
            (method::COUNT | method::LONG_COUNT, [predicate]) => {
                self.set_terminal(name, Terminal::Count);
                self.visit_where(predicate)?;
            }

            (method::OF_TYPE | method::CAST, []) => {}

            (method::GROUP_BY, _) => {
                return Err(QueryError::unsupported(
                    "group_by must be followed by an aggregate select",
                ))
            }

            _ => {
                return Err(QueryError::unsupported(format!(
                    "method '{}' with {} argument(s)",
                    name,
                    rest.len()
                )))
            }
        }

        self.visit(source)
    }

    fn set_terminal(&mut self, name: &str, terminal: Terminal) -> bool {
        match self.terminal {
            Some(existing) => {
                warn!(method = name, ?existing, "Ignoring terminal operator; an outer one already applies");
                false
            }
            None => {
                self.terminal = Some(terminal);
                true
            }
        }
    }

    fn visit_first_or_single(&mut self, name: &str) {
        let strict = name.starts_with("single");
        let or_default = name.ends_with("or_default");

        if self.set_terminal(name, Terminal::OneHit { strict, or_default }) {
            self.request.size = Some(if strict { 2 } else { 1 });
        }
    }

    fn predicate_criteria(&mut self, predicate: &Expression) -> Result<Criteria> {
        PredicateTranslator::new(self.mapping, self.prefix, &mut self.request.query)
            .translate_lambda(predicate)
    }

    fn visit_where(&mut self, predicate: &Expression) -> Result<()> {
        let criteria = self.predicate_criteria(predicate)?;

        if criteria.is_nop() {
            return Ok(());
        }
        if criteria.is_query_context() {
            debug!(criteria = %criteria, "Where clause placed in query context");
            self.apply_query(criteria);
        } else {
            debug!(criteria = %criteria, "Where clause placed in filter context");
            self.request.filter = Some(Criteria::and_into(self.request.filter.take(), criteria));
        }
        Ok(())
    }

    fn visit_query(&mut self, predicate: &Expression) -> Result<()> {
        let criteria = self.predicate_criteria(predicate)?;
        if !criteria.is_nop() {
            self.apply_query(criteria);
        }
        Ok(())
    }

    /// Scoring criteria combine through `bool.must` so the query stays valid.
    fn apply_query(&mut self, criteria: Criteria) {
        self.request.query = Some(match self.request.query.take() {
            None => criteria,
            Some(existing) => Criteria::bool_must(Some(existing), criteria),
        });
    }

    fn visit_order_by(&mut self, key: &Expression, ascending: bool) -> Result<()> {
        let (_, body) = key
            .as_lambda()
            .ok_or_else(|| QueryError::unsupported(format!("ordering key '{}' is not a lambda", key)))?;

        let (field, member) = resolve_field(self.mapping, self.prefix, body)
            .ok_or_else(|| QueryError::unsupported(format!("ordering by '{}'", body)))?;

        self.request.push_primary_sort(
            SortOption::new(field, ascending).ignoring_unmapped(member.value_type.is_nullable()),
        );
        Ok(())
    }

    fn visit_select(&mut self, selector: &Expression) -> Result<()> {
        if self.item_projector.is_some() {
            return Err(QueryError::unsupported("more than one select projection"));
        }

        let projection = projection::rebind_projection(
            self.mapping,
            self.prefix,
            self.document_prefix.clone(),
            selector,
        )?;

        self.request.add_fields(projection.fields);
        self.item_projector = Some(projection.projector);
        Ok(())
    }

    fn count_argument(&self, name: &str, count: &Expression) -> Result<usize> {
        count
            .as_constant()
            .and_then(Value::as_u64)
            .map(|n| n as usize)
            .ok_or_else(|| QueryError::unsupported(format!("{} count '{}'", name, count)))
    }
}

/// The document source at the bottom of an operator chain.
fn chain_source(expression: &Expression) -> Option<&DocumentType> {
    match expression {
        Expression::Source(document_type) => Some(document_type),
        Expression::Call { args, .. } => chain_source(args.first()?),
        Expression::Unary { operand, .. } => chain_source(operand),
        _ => None,
    }
}

/// Resolve a member chain rooted at a lambda parameter to its wire path.
///
/// Each member is mapped in turn with the path so far as its prefix, seeded
/// with `prefix`.
pub(crate) fn member_chain(
    mapping: &dyn FieldMapping,
    prefix: &str,
    expression: &Expression,
) -> Option<(String, Member)> {
    match expression {
        Expression::Unary {
            op: UnaryOperator::Convert,
            operand,
        } => member_chain(mapping, prefix, operand),
        Expression::Member { target, member } => {
            let parent = match target.as_ref() {
                Expression::Parameter(_) => prefix.to_string(),
                other => member_chain(mapping, prefix, other)?.0,
            };
            Some((mapping.field_name(&parent, member), member.clone()))
        }
        _ => None,
    }
}

/// Resolve a member chain or hit metadata field.
pub(crate) fn resolve_field(
    mapping: &dyn FieldMapping,
    prefix: &str,
    expression: &Expression,
) -> Option<(String, Member)> {
    match expression {
        Expression::ElasticField(field) => {
            let value_type = match field {
                ElasticField::Id => ValueType::String,
                ElasticField::Score => ValueType::Float,
            };
            Some((
                field.field_name().to_string(),
                Member::new(field.field_name(), value_type),
            ))
        }
        Expression::Unary {
            op: UnaryOperator::Convert,
            operand,
        } => resolve_field(mapping, prefix, operand),
        other => member_chain(mapping, prefix, other),
    }
}
