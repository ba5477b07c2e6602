// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Facet/Aggregation Rebinder
//!
//! Recognises `[take(] select(group_by(source, key), aggregates) [, n)]` and
//! turns each aggregate into a facet:
//!
//! | Aggregate            | Field key            | Constant key      |
//! |----------------------|----------------------|-------------------|
//! | `g.sum(x => x.f)`    | terms_stats on `f`   | statistical on `f`|
//! | `g.count(pred)`      | terms + facet filter | filter            |
//! | `g.count()`          | terms `GroupKey`     | filter `GroupKey` |
//!
//! The projection is rewritten to read from flattened facet rows.

use super::member_chain;
use super::predicate::PredicateTranslator;
use super::projection::{ProjectionNode, Row};
use crate::criteria::Criteria;
use crate::error::{QueryError, Result};
use crate::expression::{method, Expression};
use crate::mapping::FieldMapping;
use crate::request::Facet;
use crate::response::{AggregateRow, Statistic};
use serde_json::{Map, Value};

/// Name of the facet that counts whole groups.
pub const GROUP_KEY_FACET: &str = "GroupKey";

#[derive(Debug, Clone, PartialEq)]
enum GroupKey {
    Field(String),
    Constant(Value),
}

/// Builds aggregate output values from facet results.
#[derive(Debug, Clone, PartialEq)]
pub struct FacetProjector {
    key: GroupKey,
    node: ProjectionNode,
}

impl FacetProjector {
    /// Flatten the facets into rows and project each one.
    pub fn project(&self, facets: &Map<String, Value>) -> Result<Vec<Value>> {
        let rows = match &self.key {
            GroupKey::Field(_) => AggregateRow::from_terms(facets),
            GroupKey::Constant(key) => vec![AggregateRow::from_constant(key.clone(), facets)],
        };
        rows.iter()
            .map(|row| self.node.evaluate(&Row::Aggregate(row)))
            .collect()
    }
}

/// Outcome of a successful facet rebind.
pub(crate) struct FacetRebind<'e> {
    /// The query below `group_by`, still to be visited for filters
    pub source: &'e Expression,
    pub facets: Vec<Facet>,
    pub projector: FacetProjector,
}

/// Returns `Ok(None)` when the expression is not an aggregate query.
pub(crate) fn rebind_facets<'e>(
    mapping: &dyn FieldMapping,
    prefix: &str,
    expression: &'e Expression,
) -> Result<Option<FacetRebind<'e>>> {
    let (inner, size) = match expression {
        Expression::Call { method: name, args } if name == method::TAKE && args.len() == 2 => {
            match (&args[0], args[1].as_constant().and_then(Value::as_u64)) {
                (inner @ Expression::Call { method: name, .. }, Some(n)) if name == method::SELECT => {
                    (inner, Some(n as usize))
                }
                _ => (expression, None),
            }
        }
        _ => (expression, None),
    };

    let (grouped, aggregate) = match inner {
        Expression::Call { method: name, args } if name == method::SELECT && args.len() == 2 => {
            (&args[0], &args[1])
        }
        _ => return Ok(None),
    };

    let (source, key_selector) = match grouped {
        Expression::Call { method: name, args } if name == method::GROUP_BY && args.len() == 2 => {
            (&args[0], &args[1])
        }
        _ => return Ok(None),
    };

    let key = group_key(mapping, prefix, key_selector)?;
    let (group_parameter, body) = aggregate
        .as_lambda()
        .ok_or_else(|| QueryError::unsupported(format!("aggregate projection '{}' is not a lambda", aggregate)))?;

    let mut collector = AggregateCollector {
        mapping,
        prefix,
        group_parameter,
        value_fields: Vec::new(),
        predicates: Vec::new(),
        plain_count: false,
    };
    let node = collector.rebind(body)?;
    let mut facets = collector.into_facets(&key);

    if let Some(n) = size {
        for facet in &mut facets {
            facet.set_size(n);
        }
    }

    Ok(Some(FacetRebind {
        source,
        facets,
        projector: FacetProjector { key, node },
    }))
}

fn group_key(mapping: &dyn FieldMapping, prefix: &str, selector: &Expression) -> Result<GroupKey> {
    let (_, body) = selector
        .as_lambda()
        .ok_or_else(|| QueryError::unsupported(format!("group key '{}' is not a lambda", selector)))?;

    if let Some(value) = body.as_constant() {
        return Ok(GroupKey::Constant(value.clone()));
    }
    member_chain(mapping, prefix, body)
        .map(|(path, _)| GroupKey::Field(path))
        .ok_or_else(|| QueryError::unsupported(format!("group key '{}'", body)))
}

struct AggregateCollector<'a> {
    mapping: &'a dyn FieldMapping,
    prefix: &'a str,
    group_parameter: &'a str,
    value_fields: Vec<String>,
    predicates: Vec<Criteria>,
    plain_count: bool,
}

impl AggregateCollector<'_> {
    fn is_group(&self, expression: &Expression) -> bool {
        matches!(expression, Expression::Parameter(name) if name == self.group_parameter)
    }

    fn rebind(&mut self, expression: &Expression) -> Result<ProjectionNode> {
        match expression {
            Expression::Constant(value) => Ok(ProjectionNode::Constant(value.clone())),

            Expression::Member { target, member } if self.is_group(target) && member.name == "Key" => {
                Ok(ProjectionNode::GroupKey)
            }

            Expression::Call { method, args }
                if args.first().map(|a| self.is_group(a)).unwrap_or(false) =>
            {
                self.rebind_aggregate(method, &args[1..])
            }

            Expression::Binary { op, left, right } => Ok(ProjectionNode::Binary {
                op: *op,
                left: Box::new(self.rebind(left)?),
                right: Box::new(self.rebind(right)?),
            }),

            Expression::Unary { op, operand } => Ok(ProjectionNode::Unary {
                op: *op,
                operand: Box::new(self.rebind(operand)?),
            }),

            Expression::Call { method, args } => Ok(ProjectionNode::Call {
                method: method.clone(),
                args: args
                    .iter()
                    .map(|a| self.rebind(a))
                    .collect::<Result<Vec<_>>>()?,
            }),

            Expression::New { members } => Ok(ProjectionNode::Object(
                members
                    .iter()
                    .map(|(name, e)| Ok((name.clone(), self.rebind(e)?)))
                    .collect::<Result<Vec<_>>>()?,
            )),

            other => Err(QueryError::unsupported(format!("aggregate projection '{}'", other))),
        }
    }

    fn rebind_aggregate(&mut self, name: &str, rest: &[Expression]) -> Result<ProjectionNode> {
        let statistic = match name {
            method::COUNT | method::LONG_COUNT => Statistic::Count,
            method::SUM => Statistic::Total,
            method::MIN => Statistic::Min,
            method::MAX => Statistic::Max,
            method::AVERAGE => Statistic::Mean,
            other => return Err(QueryError::unsupported(format!("aggregate '{}'", other))),
        };

        match (statistic, rest) {
            (Statistic::Count, []) => {
                self.plain_count = true;
                Ok(aggregate(GROUP_KEY_FACET, Statistic::Count))
            }
            (Statistic::Count, [predicate]) => {
                let mut scratch = None;
                let criteria = PredicateTranslator::new(self.mapping, self.prefix, &mut scratch)
                    .translate_lambda(predicate)?;

                if criteria.is_nop() && scratch.is_none() {
                    self.plain_count = true;
                    return Ok(aggregate(GROUP_KEY_FACET, Statistic::Count));
                }
                if criteria.is_query_context() || scratch.is_some() {
                    return Err(QueryError::unsupported(format!(
                        "query-context predicate '{}' inside an aggregate",
                        predicate
                    )));
                }

                let facet = criteria.to_string();
                if !self.predicates.contains(&criteria) {
                    self.predicates.push(criteria);
                }
                Ok(aggregate(&facet, Statistic::Count))
            }
            (statistic, [selector]) => {
                let (_, body) = selector.as_lambda().ok_or_else(|| {
                    QueryError::unsupported(format!("aggregate selector '{}' is not a lambda", selector))
                })?;
                let (path, _) = member_chain(self.mapping, self.prefix, body)
                    .ok_or_else(|| QueryError::unsupported(format!("aggregate over '{}'", body)))?;
                if !self.value_fields.contains(&path) {
                    self.value_fields.push(path.clone());
                }
                Ok(aggregate(&path, statistic))
            }
            _ => Err(QueryError::unsupported(format!(
                "aggregate '{}' with {} argument(s)",
                name,
                rest.len()
            ))),
        }
    }

    fn into_facets(self, key: &GroupKey) -> Vec<Facet> {
        let count_groups = self.plain_count || (self.value_fields.is_empty() && self.predicates.is_empty());
        let mut facets = Vec::new();

        match key {
            GroupKey::Field(key_field) => {
                if count_groups {
                    facets.push(Facet::Terms {
                        name: GROUP_KEY_FACET.to_string(),
                        fields: vec![key_field.clone()],
                        size: None,
                        filter: None,
                    });
                }
                for value_field in self.value_fields {
                    facets.push(Facet::TermsStats {
                        name: value_field.clone(),
                        key_field: key_field.clone(),
                        value_field,
                        size: None,
                        filter: None,
                    });
                }
                for criteria in self.predicates {
                    facets.push(Facet::Terms {
                        name: criteria.to_string(),
                        fields: vec![key_field.clone()],
                        size: None,
                        filter: Some(criteria),
                    });
                }
            }
            GroupKey::Constant(_) => {
                if count_groups {
                    facets.push(Facet::Filter {
                        name: GROUP_KEY_FACET.to_string(),
                        filter: Criteria::MatchAll,
                    });
                }
                for value_field in self.value_fields {
                    facets.push(Facet::Stats {
                        name: value_field.clone(),
                        fields: vec![value_field],
                        filter: None,
                    });
                }
                for criteria in self.predicates {
                    facets.push(Facet::Filter {
                        name: criteria.to_string(),
                        filter: criteria,
                    });
                }
            }
        }

        facets
    }
}

fn aggregate(facet: &str, statistic: Statistic) -> ProjectionNode {
    ProjectionNode::Aggregate {
        facet: facet.to_string(),
        statistic,
    }
}
