// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Predicate translation: lambda bodies to [`Criteria`].
//!
//! Query-context leaves found under `&&`/`||` are lifted straight into the
//! request's `query` and the remaining side is returned. When both sides
//! were lifted the result is a `Nop` which callers discard.

use super::resolve_field;
use crate::criteria::{Criteria, RangeComparison, TermsExecutionMode};
use crate::error::{QueryError, Result};
use crate::expression::{method, BinaryOperator, Expression, Member, UnaryOperator, ValueType};
use crate::mapping::FieldMapping;
use serde_json::Value;
use tracing::debug;

pub(crate) struct PredicateTranslator<'a> {
    mapping: &'a dyn FieldMapping,
    prefix: &'a str,
    query: &'a mut Option<Criteria>,
}

/// A field reference paired with the constant it is compared to.
struct FieldConstant {
    field: String,
    member: Member,
    value: Value,
    constant_on_left: bool,
}

impl<'a> PredicateTranslator<'a> {
    pub(crate) fn new(
        mapping: &'a dyn FieldMapping,
        prefix: &'a str,
        query: &'a mut Option<Criteria>,
    ) -> Self {
        Self {
            mapping,
            prefix,
            query,
        }
    }

    /// Translate the body of a predicate lambda.
    pub(crate) fn translate_lambda(&mut self, predicate: &Expression) -> Result<Criteria> {
        let (_, body) = predicate
            .as_lambda()
            .ok_or_else(|| QueryError::unsupported(format!("predicate '{}' is not a lambda", predicate)))?;
        self.translate(body)
    }

    pub(crate) fn translate(&mut self, expression: &Expression) -> Result<Criteria> {
        match expression {
            Expression::Constant(Value::Bool(true)) => Ok(Criteria::Nop(Vec::new())),
            Expression::Constant(Value::Bool(false)) => Ok(Criteria::negate(Criteria::MatchAll)),

            Expression::Binary { op, left, right } => match op {
                BinaryOperator::AndAlso | BinaryOperator::OrElse => {
                    self.translate_logical(*op, left, right)
                }
                BinaryOperator::Equal => self.translate_equals(left, right),
                BinaryOperator::NotEqual => self.translate_not_equal(left, right),
                op if op.is_relational() => self.translate_range(*op, left, right),
                op => Err(QueryError::unsupported(format!(
                    "binary operator {:?} in predicate '{}'",
                    op, expression
                ))),
            },

            Expression::Unary {
                op: UnaryOperator::Convert,
                operand,
            } => self.translate(operand),

            Expression::Unary {
                op: UnaryOperator::Not,
                operand,
            } => match self.boolean_field(operand) {
                Some((field, member)) => Ok(Criteria::term(field, member, Value::Bool(false))),
                None => self.translate_not(operand),
            },

            Expression::Member { .. } => match self.boolean_field(expression) {
                Some((field, member)) => Ok(Criteria::term(field, member, Value::Bool(true))),
                None => Err(QueryError::unsupported(format!(
                    "member '{}' is not a boolean field",
                    expression
                ))),
            },

            Expression::Call { method, args } => self.translate_call(method, args),

            other => Err(QueryError::unsupported(format!("predicate '{}'", other))),
        }
    }

    fn field(&self, expression: &Expression) -> Option<(String, Member)> {
        resolve_field(self.mapping, self.prefix, expression)
    }

    fn boolean_field(&self, expression: &Expression) -> Option<(String, Member)> {
        self.field(expression)
            .filter(|(_, member)| member.value_type.is_boolean())
    }

    fn field_constant(&self, left: &Expression, right: &Expression) -> Option<FieldConstant> {
        let pair = |field_side: &Expression, constant_side: &Expression, constant_on_left: bool| {
            let (field, member) = self.field(field_side)?;
            let value = constant_side.as_constant()?.clone();
            Some(FieldConstant {
                field,
                member,
                value,
                constant_on_left,
            })
        };
        pair(left, right, false).or_else(|| pair(right, left, true))
    }

    /// Query-context criteria are lifted out of the filter, so they cannot sit under a `Not`.
    fn translate_not(&mut self, operand: &Expression) -> Result<Criteria> {
        let before = self.query.clone();
        let inner = self.translate(operand)?;

        if inner.is_query_context() || *self.query != before {
            return Err(QueryError::unsupported(format!(
                "negated query-context predicate '{}'",
                operand
            )));
        }
        match inner {
            Criteria::Nop(_) => Ok(Criteria::negate(Criteria::MatchAll)),
            other => Ok(Criteria::negate(other)),
        }
    }

    fn translate_logical(
        &mut self,
        op: BinaryOperator,
        left: &Expression,
        right: &Expression,
    ) -> Result<Criteria> {
        let l = self.translate(left)?;
        let r = self.translate(right)?;
        let (l_query, r_query) = (l.is_query_context(), r.is_query_context());

        if l_query || r_query {
            for side in [&l, &r].into_iter().filter(|c| c.is_query_context()) {
                let current = self.query.take();
                *self.query = Some(match op {
                    BinaryOperator::AndAlso => Criteria::bool_must(current, side.clone()),
                    _ => Criteria::bool_should(current, side.clone()),
                });
            }
            debug!(operator = ?op, "Lifted query-context criteria into query");

            return Ok(match (l_query, r_query) {
                (false, _) => l,
                (_, false) => r,
                _ => Criteria::Nop(vec![l, r]),
            });
        }

        if l.is_nop() {
            return Ok(r);
        }
        if r.is_nop() {
            return Ok(l);
        }

        let combined = match op {
            BinaryOperator::AndAlso => Criteria::and_all([l, r]),
            _ => Criteria::or_all([l, r]),
        };
        combined.ok_or_else(|| QueryError::InvalidCriteria("empty logical combination".into()))
    }

    fn translate_equals(&mut self, left: &Expression, right: &Expression) -> Result<Criteria> {
        let pair = self
            .field_constant(left, right)
            .ok_or_else(|| QueryError::unsupported(format!("equality between '{}' and '{}'", left, right)))?;

        Ok(if pair.value.is_null() {
            Criteria::missing(pair.field)
        } else {
            Criteria::term(pair.field, pair.member, pair.value)
        })
    }

    fn translate_not_equal(&mut self, left: &Expression, right: &Expression) -> Result<Criteria> {
        let pair = self.field_constant(left, right).ok_or_else(|| {
            QueryError::unsupported(format!("inequality between '{}' and '{}'", left, right))
        })?;

        Ok(if pair.value.is_null() {
            Criteria::exists(pair.field)
        } else {
            Criteria::negate(Criteria::term(pair.field, pair.member, pair.value))
        })
    }

    fn translate_range(
        &mut self,
        op: BinaryOperator,
        left: &Expression,
        right: &Expression,
    ) -> Result<Criteria> {
        let pair = self
            .field_constant(left, right)
            .ok_or_else(|| QueryError::unsupported(format!("range between '{}' and '{}'", left, right)))?;

        let op = if pair.constant_on_left { op.mirrored() } else { op };
        let comparison = match op {
            BinaryOperator::GreaterThan => RangeComparison::GreaterThan,
            BinaryOperator::GreaterThanOrEqual => RangeComparison::GreaterThanOrEqual,
            BinaryOperator::LessThan => RangeComparison::LessThan,
            BinaryOperator::LessThanOrEqual => RangeComparison::LessThanOrEqual,
            other => return Err(QueryError::unsupported(format!("range operator {:?}", other))),
        };
        Ok(Criteria::range(pair.field, pair.member, comparison, pair.value))
    }

    fn translate_call(&mut self, name: &str, args: &[Expression]) -> Result<Criteria> {
        match (name, args) {
            (method::CONTAINS, [receiver, item]) => self.translate_contains(receiver, item),
            (method::EQUALS, [left, right]) => self.translate_equals(left, right),
            (method::CONTAINS_ANY, [field, values]) => {
                self.translate_terms(name, field, values, TermsExecutionMode::Bool)
            }
            (method::CONTAINS_ALL, [field, values]) => {
                self.translate_terms(name, field, values, TermsExecutionMode::And)
            }
            (method::REGEXP, [field, pattern]) => {
                let (field, pattern) = self.field_text(name, field, pattern)?;
                Ok(Criteria::Regexp { field, pattern })
            }
            (method::PREFIX, [field, prefix]) => {
                let (field, prefix) = self.field_text(name, field, prefix)?;
                Ok(Criteria::Prefix { field, prefix })
            }
            (method::ANY, [field]) => {
                let (field, _) = self
                    .field(field)
                    .ok_or_else(|| QueryError::unsupported(format!("any() on '{}'", field)))?;
                Ok(Criteria::exists(field))
            }
            (method::ANY, [field, values]) => {
                self.translate_terms(name, field, values, TermsExecutionMode::Bool)
            }
            _ => Err(QueryError::unsupported(format!(
                "method '{}' with {} argument(s) in predicate",
                name,
                args.len()
            ))),
        }
    }

    fn field_text(&self, name: &str, field: &Expression, text: &Expression) -> Result<(String, String)> {
        let pair = self.field_constant(field, text).ok_or_else(|| {
            QueryError::unsupported(format!("{} must be between a member and a constant", name))
        })?;
        match pair.value {
            Value::String(s) => Ok((pair.field, s)),
            other => Ok((pair.field, other.to_string())),
        }
    }

    fn translate_terms(
        &self,
        name: &str,
        field: &Expression,
        values: &Expression,
        execution: TermsExecutionMode,
    ) -> Result<Criteria> {
        let pair = self.field_constant(field, values).ok_or_else(|| {
            QueryError::unsupported(format!("{} must be between a member and a constant", name))
        })?;
        let values = match pair.value {
            Value::Array(items) => items,
            other => vec![other],
        };
        Ok(Criteria::terms(pair.field, pair.member, values, Some(execution)))
    }

    fn translate_contains(&mut self, receiver: &Expression, item: &Expression) -> Result<Criteria> {
        // constants.contains(r.field)
        if let (Some(Value::Array(values)), Some((field, member))) =
            (receiver.as_constant(), self.field(item))
        {
            let non_null: Vec<Value> = values.iter().filter(|v| !v.is_null()).cloned().collect();
            let has_null = non_null.len() != values.len();

            let terms = (!non_null.is_empty() || !has_null)
                .then(|| Criteria::terms(field.clone(), member, non_null, None));
            let missing = has_null.then(|| Criteria::missing(field));

            return Criteria::or_all(terms.into_iter().chain(missing))
                .ok_or_else(|| QueryError::InvalidCriteria("empty contains".into()));
        }

        let (field, member) = self
            .field(receiver)
            .ok_or_else(|| QueryError::unsupported(format!("contains() on '{}'", receiver)))?;
        let value = item
            .as_constant()
            .ok_or_else(|| QueryError::unsupported(format!("contains() argument '{}' is not a constant", item)))?;

        if member.value_type.is_sequence() {
            // r.tags.contains("x")
            return Ok(Criteria::terms(field, member, vec![value.clone()], None));
        }

        match (&member.value_type, value) {
            (ValueType::String | ValueType::Optional(_) | ValueType::Any, Value::String(search)) => {
                let pattern = if search.trim().is_empty() {
                    "*".to_string()
                } else {
                    format!("*{}*", search)
                };
                Ok(Criteria::wildcard(field, member, &pattern))
            }
            _ => Err(QueryError::unsupported(format!(
                "contains() on '{}' with '{}'",
                receiver, item
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::ElasticMapping;
    use serde_json::json;

    fn r() -> Expression {
        Expression::param("r")
    }

    fn name() -> Expression {
        r().member(Member::string("Name"))
    }

    fn cost() -> Expression {
        r().member(Member::integer("Cost"))
    }

    fn active() -> Expression {
        r().member(Member::boolean("Active"))
    }

    fn translate(body: Expression) -> (Result<Criteria>, Option<Criteria>) {
        let mapping = ElasticMapping::default();
        let mut query = None;
        let result = PredicateTranslator::new(&mapping, "", &mut query).translate(&body);
        (result, query)
    }

    fn ok(body: Expression) -> Criteria {
        let (result, query) = translate(body);
        assert!(query.is_none(), "unexpected query {:?}", query);
        result.unwrap()
    }

    #[test]
    fn test_equality_is_term() {
        assert_eq!(
            ok(name().equal("Josef")),
            Criteria::term("name", Member::string("Name"), json!("Josef"))
        );
    }

    #[test]
    fn test_constant_on_left_equality() {
        assert_eq!(
            ok(Expression::constant("Josef").equal(name())),
            Criteria::term("name", Member::string("Name"), json!("Josef"))
        );
    }

    #[test]
    fn test_null_tests() {
        assert_eq!(ok(name().equal(Expression::null())), Criteria::missing("name"));
        assert_eq!(ok(name().not_equal(Expression::null())), Criteria::exists("name"));
    }

    #[test]
    fn test_not_equal_is_negated_term() {
        assert_eq!(
            ok(cost().not_equal(5)),
            Criteria::negate(Criteria::term("cost", Member::integer("Cost"), json!(5)))
        );
    }

    #[test]
    fn test_relational_flips_when_constant_on_left() {
        let c = ok(Expression::constant(5).less_than(cost()));
        assert_eq!(
            c,
            Criteria::range("cost", Member::integer("Cost"), RangeComparison::GreaterThan, json!(5))
        );
    }

    #[test]
    fn test_boolean_member_forms() {
        assert_eq!(ok(active()), Criteria::term("active", Member::boolean("Active"), json!(true)));
        assert_eq!(ok(!active()), Criteria::term("active", Member::boolean("Active"), json!(false)));
    }

    #[test]
    fn test_not_wraps_unconditionally() {
        let c = ok(!name().equal("a"));
        assert_eq!(
            c,
            Criteria::negate(Criteria::term("name", Member::string("Name"), json!("a")))
        );
    }

    #[test]
    fn test_not_over_lifted_operand_is_rejected() {
        let (result, _) = translate(!(name().contains("a").and_also(name().contains("b"))));
        match result {
            Err(QueryError::UnsupportedExpression(message)) => assert!(message.contains("negated")),
            other => panic!("Expected UnsupportedExpression, got {:?}", other),
        }

        let (result, _) = translate(!name().contains("a"));
        assert!(matches!(result, Err(QueryError::UnsupportedExpression(_))));

        // One side lifted, the other left in the filter.
        let (result, _) = translate(!(name().contains("a").and_also(cost().greater_than(1))));
        assert!(matches!(result, Err(QueryError::UnsupportedExpression(_))));
    }

    #[test]
    fn test_not_of_constant_true_matches_nothing() {
        assert_eq!(
            ok(!Expression::constant(true)),
            Criteria::negate(Criteria::MatchAll)
        );
    }

    #[test]
    fn test_and_or_combine() {
        let c = ok(name().equal("a").and_also(cost().greater_than(1)).and_also(active()));
        assert!(matches!(c, Criteria::And(ref children) if children.len() == 3));

        let c = ok(name().equal("a").or_else(name().equal("b")));
        assert!(matches!(c, Criteria::Or(ref children) if children.len() == 2));
    }

    #[test]
    fn test_string_contains_is_lower_cased_wildcard() {
        let (result, query) = translate(name().contains("JoSeF"));
        assert!(query.is_none());
        assert_eq!(
            result.unwrap(),
            Criteria::wildcard("name", Member::string("Name"), "*josef*")
        );
    }

    #[test]
    fn test_wildcard_under_and_is_lifted_into_query() {
        let (result, query) = translate(name().contains("bot").and_also(cost().greater_than(1)));
        assert_eq!(
            result.unwrap(),
            Criteria::range("cost", Member::integer("Cost"), RangeComparison::GreaterThan, json!(1))
        );
        match query {
            Some(Criteria::Bool { must, .. }) => {
                assert_eq!(must, vec![Criteria::wildcard("name", Member::string("Name"), "*bot*")]);
            }
            other => panic!("Expected bool query, got {:?}", other),
        }
    }

    #[test]
    fn test_both_sides_query_context_yields_nop() {
        let (result, query) = translate(name().contains("a").or_else(name().contains("b")));
        assert!(result.unwrap().is_nop());
        match query {
            Some(Criteria::Bool { should, .. }) => assert_eq!(should.len(), 2),
            other => panic!("Expected bool query, got {:?}", other),
        }
    }

    #[test]
    fn test_constant_set_contains() {
        let c = ok(Expression::constant(json!(["a", "b", "a"])).contains(name()));
        assert_eq!(
            c,
            Criteria::terms("name", Member::string("Name"), vec![json!("a"), json!("b")], None)
        );
    }

    #[test]
    fn test_constant_set_with_null_adds_missing() {
        let c = ok(Expression::constant(json!(["a", null, "b"])).contains(name()));
        assert_eq!(
            c,
            Criteria::Or(vec![
                Criteria::terms("name", Member::string("Name"), vec![json!("a"), json!("b")], None),
                Criteria::missing("name"),
            ])
        );
    }

    #[test]
    fn test_sequence_member_contains() {
        let tags = r().member(Member::new("Tags", ValueType::sequence(ValueType::String)));
        assert_eq!(
            ok(tags.contains("red")),
            Criteria::term(
                "tags",
                Member::new("Tags", ValueType::sequence(ValueType::String)),
                json!("red")
            )
        );
    }

    #[test]
    fn test_contains_any_and_all() {
        let tags = || r().member(Member::new("Tags", ValueType::sequence(ValueType::String)));
        match ok(tags().contains_any(json!(["a", "b"]))) {
            Criteria::Terms { execution, .. } => assert_eq!(execution, Some(TermsExecutionMode::Bool)),
            other => panic!("Expected Terms, got {}", other),
        }
        match ok(tags().contains_all(json!(["a", "b"]))) {
            Criteria::Terms { execution, .. } => assert_eq!(execution, Some(TermsExecutionMode::And)),
            other => panic!("Expected Terms, got {}", other),
        }
    }

    #[test]
    fn test_regexp_prefix_any() {
        assert_eq!(
            ok(name().regexp("jo.*")),
            Criteria::Regexp { field: "name".into(), pattern: "jo.*".into() }
        );
        assert_eq!(
            ok(name().prefix("Jo")),
            Criteria::Prefix { field: "name".into(), prefix: "Jo".into() }
        );
        let tags = r().member(Member::new("Tags", ValueType::sequence(ValueType::String)));
        assert_eq!(ok(tags.any()), Criteria::exists("tags"));
    }

    #[test]
    fn test_constant_predicates() {
        assert!(ok(Expression::constant(true)).is_nop());
        assert_eq!(ok(Expression::constant(false)), Criteria::negate(Criteria::MatchAll));
    }

    #[test]
    fn test_unsupported_shapes_name_the_construct() {
        let (result, _) = translate(cost().add(1));
        match result {
            Err(QueryError::UnsupportedExpression(message)) => assert!(message.contains("Add")),
            other => panic!("Expected UnsupportedExpression, got {:?}", other),
        }

        let (result, _) = translate(cost().equal(name()));
        assert!(matches!(result, Err(QueryError::UnsupportedExpression(_))));
    }
}
