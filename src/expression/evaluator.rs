// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Partial Evaluator
//!
//! Folds every subtree that does not reference a lambda parameter into a
//! constant. `Source` and `Parameter` nodes are never evaluated, so anything
//! depending on the per-document binding survives untouched.
//!
//! ```text
//! r.cost > 10 * 2        =>  r.cost > 20
//! ids.contains(r.id)     =>  ids.contains(r.id)     (args folded individually)
//! "ab".to_upper()        =>  "AB"
//! ```

use super::{BinaryOperator, Expression, UnaryOperator};
use crate::error::{QueryError, Result};
use serde_json::{Number, Value};
use std::cmp::Ordering;

/// Constant folder for query expressions.
pub struct PartialEvaluator;

impl PartialEvaluator {
    /// Return an equivalent tree with every binding-independent subtree folded.
    ///
    /// Evaluation errors (overflow, division by zero, type mismatches) are
    /// propagated rather than leaving the subtree unfolded.
    pub fn evaluate(expression: &Expression) -> Result<Expression> {
        match expression {
            Expression::Constant(_)
            | Expression::Source(_)
            | Expression::Parameter(_)
            | Expression::ElasticField(_) => Ok(expression.clone()),

            Expression::Member { target, member } => {
                let target = Self::evaluate(target)?;
                if let Expression::Constant(value) = &target {
                    return Ok(Expression::Constant(read_member(value, &member.name)));
                }
                Ok(target.member(member.clone()))
            }

            Expression::Binary { op, left, right } => {
                let left = Self::evaluate(left)?;
                let right = Self::evaluate(right)?;
                match (&left, &right) {
                    (Expression::Constant(l), Expression::Constant(r)) => {
                        Ok(Expression::Constant(apply_binary(*op, l, r)?))
                    }
                    _ => Ok(Expression::Binary {
                        op: *op,
                        left: Box::new(left),
                        right: Box::new(right),
                    }),
                }
            }

            Expression::Unary { op, operand } => {
                let operand = Self::evaluate(operand)?;
                if let Expression::Constant(value) = &operand {
                    return Ok(Expression::Constant(apply_unary(*op, value)?));
                }
                Ok(Expression::Unary {
                    op: *op,
                    operand: Box::new(operand),
                })
            }

            Expression::Call { method, args } => {
                let args = args
                    .iter()
                    .map(Self::evaluate)
                    .collect::<Result<Vec<_>>>()?;
                let constants: Option<Vec<&Value>> =
                    args.iter().map(Expression::as_constant).collect();
                if let Some(values) = constants {
                    if let Some(folded) = apply_call(method, &values)? {
                        return Ok(Expression::Constant(folded));
                    }
                }
                Ok(Expression::Call {
                    method: method.clone(),
                    args,
                })
            }

            Expression::Lambda { parameter, body } => Ok(Expression::Lambda {
                parameter: parameter.clone(),
                body: Box::new(Self::evaluate(body)?),
            }),

            Expression::New { members } => {
                let members = members
                    .iter()
                    .map(|(name, e)| Ok((name.clone(), Self::evaluate(e)?)))
                    .collect::<Result<Vec<_>>>()?;
                if members.iter().all(|(_, e)| e.as_constant().is_some()) {
                    let object = members
                        .into_iter()
                        .filter_map(|(name, e)| match e {
                            Expression::Constant(v) => Some((name, v)),
                            _ => None,
                        })
                        .collect::<serde_json::Map<String, Value>>();
                    return Ok(Expression::Constant(Value::Object(object)));
                }
                Ok(Expression::New { members })
            }
        }
    }
}

fn read_member(value: &Value, name: &str) -> Value {
    match value {
        Value::Object(map) => map
            .get(name)
            .or_else(|| {
                map.iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case(name))
                    .map(|(_, v)| v)
            })
            .cloned()
            .unwrap_or(Value::Null),
        Value::String(s) if name.eq_ignore_ascii_case("length") => Value::from(s.chars().count()),
        Value::Array(items) if name.eq_ignore_ascii_case("length") || name.eq_ignore_ascii_case("count") => {
            Value::from(items.len())
        }
        _ => Value::Null,
    }
}

fn evaluation(message: impl Into<String>) -> QueryError {
    QueryError::Evaluation(message.into())
}

fn finite(value: f64) -> Result<Value> {
    Number::from_f64(value)
        .map(Value::Number)
        .ok_or_else(|| evaluation(format!("non-finite result {}", value)))
}

fn numbers<'a>(l: &'a Value, r: &'a Value) -> Option<(&'a Number, &'a Number)> {
    match (l, r) {
        (Value::Number(a), Value::Number(b)) => Some((a, b)),
        _ => None,
    }
}

/// Numeric comparison that treats `1` and `1.0` as equal.
fn compare(l: &Value, r: &Value) -> Option<Ordering> {
    match (l, r) {
        (Value::Number(a), Value::Number(b)) => match (a.as_i64(), b.as_i64()) {
            (Some(x), Some(y)) => Some(x.cmp(&y)),
            _ => a.as_f64()?.partial_cmp(&b.as_f64()?),
        },
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn loosely_equal(l: &Value, r: &Value) -> bool {
    match compare(l, r) {
        Some(ordering) => ordering == Ordering::Equal,
        None => l == r,
    }
}

fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn arithmetic(
    op: BinaryOperator,
    a: &Number,
    b: &Number,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Result<Value> {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return int_op(x, y)
            .map(Value::from)
            .ok_or_else(|| evaluation(format!("integer overflow or division by zero in {} {:?} {}", x, op, y)));
    }
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => finite(float_op(x, y)),
        _ => Err(evaluation(format!("cannot apply {:?} to {} and {}", op, a, b))),
    }
}

/// Evaluate a binary operator over two constants.
pub(crate) fn apply_binary(op: BinaryOperator, l: &Value, r: &Value) -> Result<Value> {
    match op {
        BinaryOperator::Equal => Ok(Value::Bool(loosely_equal(l, r))),
        BinaryOperator::NotEqual => Ok(Value::Bool(!loosely_equal(l, r))),
        BinaryOperator::LessThan
        | BinaryOperator::LessThanOrEqual
        | BinaryOperator::GreaterThan
        | BinaryOperator::GreaterThanOrEqual => {
            if l.is_null() || r.is_null() {
                return Ok(Value::Bool(false));
            }
            let ordering = compare(l, r)
                .ok_or_else(|| evaluation(format!("cannot compare {} with {}", l, r)))?;
            let result = match op {
                BinaryOperator::LessThan => ordering == Ordering::Less,
                BinaryOperator::LessThanOrEqual => ordering != Ordering::Greater,
                BinaryOperator::GreaterThan => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            };
            Ok(Value::Bool(result))
        }
        BinaryOperator::AndAlso | BinaryOperator::OrElse => match (l, r) {
            (Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(if op == BinaryOperator::AndAlso {
                *a && *b
            } else {
                *a || *b
            })),
            _ => Err(evaluation(format!("logical operator needs booleans, got {} and {}", l, r))),
        },
        BinaryOperator::Add if l.is_string() || r.is_string() => {
            Ok(Value::String(as_text(l) + &as_text(r)))
        }
        _ if l.is_null() || r.is_null() => Ok(Value::Null),
        _ => {
            let (a, b) = numbers(l, r)
                .ok_or_else(|| evaluation(format!("cannot apply {:?} to {} and {}", op, l, r)))?;
            match op {
                BinaryOperator::Add => arithmetic(op, a, b, i64::checked_add, |x, y| x + y),
                BinaryOperator::Subtract => arithmetic(op, a, b, i64::checked_sub, |x, y| x - y),
                BinaryOperator::Multiply => arithmetic(op, a, b, i64::checked_mul, |x, y| x * y),
                BinaryOperator::Divide => arithmetic(op, a, b, i64::checked_div, |x, y| x / y),
                BinaryOperator::Modulo => arithmetic(op, a, b, i64::checked_rem, |x, y| x % y),
                _ => Err(evaluation(format!("unexpected operator {:?}", op))),
            }
        }
    }
}

/// Evaluate a unary operator over a constant.
pub(crate) fn apply_unary(op: UnaryOperator, value: &Value) -> Result<Value> {
    match (op, value) {
        (UnaryOperator::Convert, v) => Ok(v.clone()),
        (UnaryOperator::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
        (UnaryOperator::Negate, Value::Null) => Ok(Value::Null),
        (UnaryOperator::Negate, Value::Number(n)) => match n.as_i64() {
            Some(i) => i
                .checked_neg()
                .map(Value::from)
                .ok_or_else(|| evaluation(format!("integer overflow negating {}", i))),
            None => finite(-n.as_f64().unwrap_or(f64::NAN)),
        },
        (op, v) => Err(evaluation(format!("cannot apply {:?} to {}", op, v))),
    }
}

/// Evaluate a pure method over constant arguments (receiver first).
///
/// Returns `Ok(None)` for methods that are not pure value functions, such as
/// query operators and search predicates.
pub(crate) fn apply_call(method: &str, args: &[&Value]) -> Result<Option<Value>> {
    let folded = match (method, args) {
        ("to_lower", [Value::String(s)]) => Value::String(s.to_lowercase()),
        ("to_upper", [Value::String(s)]) => Value::String(s.to_uppercase()),
        ("trim", [Value::String(s)]) => Value::String(s.trim().to_string()),
        ("len", [Value::String(s)]) => Value::from(s.chars().count()),
        ("len", [Value::Array(items)]) => Value::from(items.len()),
        ("concat", parts) => Value::String(parts.iter().map(|v| as_text(v)).collect()),
        ("starts_with", [Value::String(s), Value::String(p)]) => Value::Bool(s.starts_with(p.as_str())),
        ("ends_with", [Value::String(s), Value::String(p)]) => Value::Bool(s.ends_with(p.as_str())),
        ("contains", [Value::String(s), Value::String(p)]) => Value::Bool(s.contains(p.as_str())),
        ("contains", [Value::Array(items), needle]) => {
            Value::Bool(items.iter().any(|item| loosely_equal(item, needle)))
        }
        ("abs", [Value::Number(n)]) => match n.as_i64() {
            Some(i) => i
                .checked_abs()
                .map(Value::from)
                .ok_or_else(|| evaluation(format!("integer overflow in abs({})", i)))?,
            None => finite(n.as_f64().unwrap_or(f64::NAN).abs())?,
        },
        ("round", [Value::Number(n)]) => match n.as_i64() {
            Some(i) => Value::from(i),
            None => finite(n.as_f64().unwrap_or(f64::NAN).round())?,
        },
        _ => return Ok(None),
    };
    Ok(Some(folded))
}
