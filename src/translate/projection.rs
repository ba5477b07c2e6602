// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Field Projection Rebinder
//!
//! Turns the body of a `select` lambda into the list of fields to request and
//! a [`Projector`] that builds the output value from a hit.
//!
//! Two strategies, chosen by whether the body uses the whole document:
//!
//! ```text
//! r => new { r, score = _score }   entity-preserving: decode _source, fields = []
//! r => new { r.name, r.cost }      field-only: read hit fields, fields = [name, cost]
//! ```

use super::member_chain;
use crate::error::{QueryError, Result};
use crate::expression::{apply_binary, apply_call, apply_unary, BinaryOperator, ElasticField, Expression, UnaryOperator};
use crate::mapping::FieldMapping;
use crate::response::{select_path, AggregateRow, Hit, Statistic};
use serde_json::{Map, Value};

/// A value tree evaluated against one hit or one aggregate row.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ProjectionNode {
    Constant(Value),
    /// The whole document, read from `_source` at the mapping prefix
    Document { prefix: Option<String> },
    /// Member of an already projected object
    Member { target: Box<ProjectionNode>, field: String },
    /// Requested field; singleton arrays collapse when `scalar`
    Field { path: String, scalar: bool },
    Metadata(ElasticField),
    GroupKey,
    Aggregate { facet: String, statistic: Statistic },
    Binary {
        op: BinaryOperator,
        left: Box<ProjectionNode>,
        right: Box<ProjectionNode>,
    },
    Unary {
        op: UnaryOperator,
        operand: Box<ProjectionNode>,
    },
    Call { method: String, args: Vec<ProjectionNode> },
    Object(Vec<(String, ProjectionNode)>),
}

/// What a projection is evaluated against.
pub(crate) enum Row<'a> {
    Hit(&'a Hit),
    Aggregate(&'a AggregateRow),
}

impl ProjectionNode {
    pub(crate) fn evaluate(&self, row: &Row<'_>) -> Result<Value> {
        match self {
            ProjectionNode::Constant(value) => Ok(value.clone()),
            ProjectionNode::Document { prefix } => match row {
                Row::Hit(hit) => read_document(hit, prefix.as_deref()),
                Row::Aggregate(_) => Err(QueryError::Projection(
                    "document is not available in an aggregate row".into(),
                )),
            },
            ProjectionNode::Member { target, field } => {
                let target = target.evaluate(row)?;
                Ok(select_path(&target, field).cloned().unwrap_or(Value::Null))
            }
            ProjectionNode::Field { path, scalar } => match row {
                Row::Hit(hit) => Ok(read_field(hit, path, *scalar)),
                Row::Aggregate(_) => Err(QueryError::Projection(format!(
                    "field '{}' is not available in an aggregate row",
                    path
                ))),
            },
            ProjectionNode::Metadata(field) => match row {
                Row::Hit(hit) => Ok(match field {
                    ElasticField::Id => Value::String(hit.id.clone()),
                    ElasticField::Score => hit.score.map(Value::from).unwrap_or(Value::Null),
                }),
                Row::Aggregate(_) => Err(QueryError::Projection(format!(
                    "{} is not available in an aggregate row",
                    field.field_name()
                ))),
            },
            ProjectionNode::GroupKey => match row {
                Row::Aggregate(aggregate) => Ok(aggregate.key.clone()),
                Row::Hit(_) => Err(QueryError::Projection("group key outside an aggregate".into())),
            },
            ProjectionNode::Aggregate { facet, statistic } => match row {
                Row::Aggregate(aggregate) => Ok(aggregate.statistic(facet, *statistic)),
                Row::Hit(_) => Err(QueryError::Projection(format!(
                    "aggregate '{}' outside an aggregate",
                    facet
                ))),
            },
            ProjectionNode::Binary { op, left, right } => {
                apply_binary(*op, &left.evaluate(row)?, &right.evaluate(row)?)
            }
            ProjectionNode::Unary { op, operand } => apply_unary(*op, &operand.evaluate(row)?),
            ProjectionNode::Call { method, args } => {
                let values = args
                    .iter()
                    .map(|a| a.evaluate(row))
                    .collect::<Result<Vec<_>>>()?;
                let refs: Vec<&Value> = values.iter().collect();
                apply_call(method, &refs)?.ok_or_else(|| {
                    QueryError::Projection(format!("method '{}' cannot be evaluated on results", method))
                })
            }
            ProjectionNode::Object(members) => {
                let mut object = Map::new();
                for (name, node) in members {
                    object.insert(name.clone(), node.evaluate(row)?);
                }
                Ok(Value::Object(object))
            }
        }
    }
}

fn read_document(hit: &Hit, prefix: Option<&str>) -> Result<Value> {
    let source = hit
        .source
        .as_ref()
        .ok_or_else(|| QueryError::Projection(format!("hit '{}' has no _source", hit.id)))?;
    Ok(select_path(source, prefix.unwrap_or(""))
        .cloned()
        .unwrap_or(Value::Null))
}

fn read_field(hit: &Hit, path: &str, scalar: bool) -> Value {
    let raw = hit
        .fields
        .get(path)
        .or_else(|| hit.source.as_ref().and_then(|s| select_path(s, path)))
        .cloned()
        .unwrap_or(Value::Null);

    match raw {
        Value::Array(mut items) if scalar && items.len() == 1 => items.remove(0),
        other => other,
    }
}

/// Builds output values from hits.
#[derive(Debug, Clone, PartialEq)]
pub struct Projector {
    node: ProjectionNode,
}

impl Projector {
    /// Decode the whole document from `_source`.
    pub fn document(prefix: Option<String>) -> Self {
        Self {
            node: ProjectionNode::Document { prefix },
        }
    }

    pub fn project(&self, hit: &Hit) -> Result<Value> {
        self.node.evaluate(&Row::Hit(hit))
    }
}

/// Result of rebinding a `select` body.
pub(crate) struct Projection {
    /// Fields to request; empty means the whole document
    pub fields: Vec<String>,
    pub projector: Projector,
}

/// Rebind the body of a `select` lambda.
pub(crate) fn rebind_projection(
    mapping: &dyn FieldMapping,
    prefix: &str,
    document_prefix: Option<String>,
    selector: &Expression,
) -> Result<Projection> {
    let (parameter, body) = selector
        .as_lambda()
        .ok_or_else(|| QueryError::unsupported(format!("select '{}' is not a lambda", selector)))?;

    let mut rebinder = ProjectionRebinder {
        mapping,
        prefix,
        parameter,
        entity: uses_whole_document(body, parameter),
        document_prefix,
        fields: Vec::new(),
    };
    let node = rebinder.rebind(body)?;

    Ok(Projection {
        fields: rebinder.fields,
        projector: Projector { node },
    })
}

/// True when the parameter appears other than as the root of a member chain.
fn uses_whole_document(expression: &Expression, parameter: &str) -> bool {
    match expression {
        Expression::Parameter(name) => name == parameter,
        Expression::Member { target, .. } => match target.as_ref() {
            Expression::Parameter(_) => false,
            other => uses_whole_document(other, parameter),
        },
        Expression::Binary { left, right, .. } => {
            uses_whole_document(left, parameter) || uses_whole_document(right, parameter)
        }
        Expression::Unary { operand, .. } => uses_whole_document(operand, parameter),
        Expression::Call { args, .. } => args.iter().any(|a| uses_whole_document(a, parameter)),
        Expression::Lambda { body, .. } => uses_whole_document(body, parameter),
        Expression::New { members } => members.iter().any(|(_, e)| uses_whole_document(e, parameter)),
        Expression::Constant(_) | Expression::Source(_) | Expression::ElasticField(_) => false,
    }
}

struct ProjectionRebinder<'a> {
    mapping: &'a dyn FieldMapping,
    prefix: &'a str,
    parameter: &'a str,
    entity: bool,
    document_prefix: Option<String>,
    fields: Vec<String>,
}

impl ProjectionRebinder<'_> {
    fn rebind(&mut self, expression: &Expression) -> Result<ProjectionNode> {
        match expression {
            Expression::Constant(value) => Ok(ProjectionNode::Constant(value.clone())),
            Expression::ElasticField(field) => Ok(ProjectionNode::Metadata(*field)),

            Expression::Parameter(name) if name == self.parameter && self.entity => {
                Ok(ProjectionNode::Document {
                    prefix: self.document_prefix.clone(),
                })
            }

            Expression::Member { target, member } => {
                if self.entity {
                    return Ok(ProjectionNode::Member {
                        target: Box::new(self.rebind(target)?),
                        field: self.mapping.field_name("", member),
                    });
                }

                let (path, member) = member_chain(self.mapping, self.prefix, expression)
                    .ok_or_else(|| QueryError::unsupported(format!("projected member '{}'", expression)))?;
                if !self.fields.contains(&path) {
                    self.fields.push(path.clone());
                }
                Ok(ProjectionNode::Field {
                    path,
                    scalar: member.value_type.is_scalar(),
                })
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

            other => Err(QueryError::unsupported(format!("projection '{}'", other))),
        }
    }
}
