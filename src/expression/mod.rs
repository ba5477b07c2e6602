// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Query Expression - AST for composable queries
//!
//! The expression tree is built by a front-end (or by hand with the builder
//! helpers below) and consumed read-only by the translator. Query operators
//! are method calls whose first argument is the source they apply to, so a
//! chain reads outermost-first:
//!
//! ```text
//! take(order_by(where(source, r => r.name == "x"), r => r.id), 10)
//! ```
//!
//! # Example
//!
//! ```rust
//! use elastic_query::expression::{DocumentType, Expression, Member};
//!
//! let robots = DocumentType::new("Robot")
//!     .with_member(Member::string("id"))
//!     .with_member(Member::string("name"));
//!
//! let r = Expression::param("r");
//! let query = Expression::source(robots)
//!     .where_(Expression::lambda("r", r.clone().member(Member::string("name")).equal("Josef")))
//!     .order_by(Expression::lambda("r", r.member(Member::string("id"))))
//!     .take(10);
//! ```

mod evaluator;

pub use evaluator::PartialEvaluator;
pub(crate) use evaluator::{apply_binary, apply_call, apply_unary};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Method names understood by the translator.
pub mod method {
    pub const WHERE: &str = "where";
    pub const QUERY: &str = "query";
    pub const QUERY_STRING: &str = "query_string";
    pub const SELECT: &str = "select";
    pub const ORDER_BY: &str = "order_by";
    pub const ORDER_BY_DESCENDING: &str = "order_by_descending";
    pub const THEN_BY: &str = "then_by";
    pub const THEN_BY_DESCENDING: &str = "then_by_descending";
    pub const ORDER_BY_SCORE: &str = "order_by_score";
    pub const ORDER_BY_SCORE_DESCENDING: &str = "order_by_score_descending";
    pub const THEN_BY_SCORE: &str = "then_by_score";
    pub const THEN_BY_SCORE_DESCENDING: &str = "then_by_score_descending";
    pub const SKIP: &str = "skip";
    pub const TAKE: &str = "take";
    pub const FIRST: &str = "first";
    pub const FIRST_OR_DEFAULT: &str = "first_or_default";
    pub const SINGLE: &str = "single";
    pub const SINGLE_OR_DEFAULT: &str = "single_or_default";
    pub const COUNT: &str = "count";
    pub const LONG_COUNT: &str = "long_count";
    pub const GROUP_BY: &str = "group_by";
    pub const OF_TYPE: &str = "of_type";
    pub const CAST: &str = "cast";

    pub const CONTAINS: &str = "contains";
    pub const CONTAINS_ANY: &str = "contains_any";
    pub const CONTAINS_ALL: &str = "contains_all";
    pub const REGEXP: &str = "regexp";
    pub const PREFIX: &str = "prefix";
    pub const ANY: &str = "any";
    pub const EQUALS: &str = "equals";

    pub const SUM: &str = "sum";
    pub const MIN: &str = "min";
    pub const MAX: &str = "max";
    pub const AVERAGE: &str = "average";
}

/// Static type of a document member or projected value
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    String,
    Integer,
    Float,
    Boolean,
    Date,
    /// Nested object of the named type
    Object(String),
    /// Sequence of values
    Sequence(Box<ValueType>),
    /// Nullable wrapper; sorts on these ignore unmapped documents
    Optional(Box<ValueType>),
    Any,
}

impl ValueType {
    pub fn optional(inner: ValueType) -> Self {
        ValueType::Optional(Box::new(inner))
    }

    pub fn sequence(inner: ValueType) -> Self {
        ValueType::Sequence(Box::new(inner))
    }

    pub fn is_nullable(&self) -> bool {
        matches!(self, ValueType::Optional(_))
    }

    pub fn is_sequence(&self) -> bool {
        match self {
            ValueType::Sequence(_) => true,
            ValueType::Optional(inner) => inner.is_sequence(),
            _ => false,
        }
    }

    /// Values that a single-element array should collapse into.
    pub fn is_scalar(&self) -> bool {
        match self {
            ValueType::String
            | ValueType::Integer
            | ValueType::Float
            | ValueType::Boolean
            | ValueType::Date => true,
            ValueType::Optional(inner) => inner.is_scalar(),
            _ => false,
        }
    }

    pub fn is_boolean(&self) -> bool {
        match self {
            ValueType::Boolean => true,
            ValueType::Optional(inner) => inner.is_boolean(),
            _ => false,
        }
    }
}

/// Descriptor of a document member, used for field naming and value formatting.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Member {
    pub name: String,
    pub value_type: ValueType,
}

impl Member {
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, ValueType::String)
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, ValueType::Integer)
    }

    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, ValueType::Float)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, ValueType::Boolean)
    }

    pub fn date(name: impl Into<String>) -> Self {
        Self::new(name, ValueType::Date)
    }
}

/// The document type a query runs over.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentType {
    pub name: String,
    #[serde(default)]
    pub members: Vec<Member>,
}

impl DocumentType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
        }
    }

    pub fn with_member(mut self, member: Member) -> Self {
        self.members.push(member);
        self
    }

    /// Find a member by name, ignoring ASCII case
    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members
            .iter()
            .find(|m| m.name.eq_ignore_ascii_case(name))
    }
}

/// Hit metadata that can be referenced like a document member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElasticField {
    Id,
    Score,
}

impl ElasticField {
    /// Wire name of the metadata field
    pub fn field_name(self) -> &'static str {
        match self {
            ElasticField::Id => "_id",
            ElasticField::Score => "_score",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOperator {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    AndAlso,
    OrElse,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

impl BinaryOperator {
    pub fn is_relational(self) -> bool {
        matches!(
            self,
            BinaryOperator::LessThan
                | BinaryOperator::LessThanOrEqual
                | BinaryOperator::GreaterThan
                | BinaryOperator::GreaterThanOrEqual
        )
    }

    /// The operator that gives the same result with the operands swapped.
    pub fn mirrored(self) -> Self {
        match self {
            BinaryOperator::LessThan => BinaryOperator::GreaterThan,
            BinaryOperator::LessThanOrEqual => BinaryOperator::GreaterThanOrEqual,
            BinaryOperator::GreaterThan => BinaryOperator::LessThan,
            BinaryOperator::GreaterThanOrEqual => BinaryOperator::LessThanOrEqual,
            other => other,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::Equal => "==",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::LessThan => "<",
            BinaryOperator::LessThanOrEqual => "<=",
            BinaryOperator::GreaterThan => ">",
            BinaryOperator::GreaterThanOrEqual => ">=",
            BinaryOperator::AndAlso => "&&",
            BinaryOperator::OrElse => "||",
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOperator {
    Not,
    Negate,
    /// Type conversion; transparent to translation
    Convert,
}

/// Query AST node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    /// Literal value
    Constant(Value),
    /// Root of a query chain: all documents of a type
    Source(DocumentType),
    /// Reference to a lambda parameter (the per-document binding)
    Parameter(String),
    /// Member access: target.member
    Member {
        target: Box<Expression>,
        member: Member,
    },
    /// Hit metadata (`_id`, `_score`)
    ElasticField(ElasticField),
    Binary {
        op: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Unary {
        op: UnaryOperator,
        operand: Box<Expression>,
    },
    /// Method call; the receiver (if any) is the first argument
    Call {
        method: String,
        args: Vec<Expression>,
    },
    /// Single-parameter lambda: parameter => body
    Lambda {
        parameter: String,
        body: Box<Expression>,
    },
    /// Object construction (anonymous projection or member-init)
    New { members: Vec<(String, Expression)> },
}

impl Expression {
    pub fn constant(value: impl Into<Value>) -> Self {
        Expression::Constant(value.into())
    }

    pub fn null() -> Self {
        Expression::Constant(Value::Null)
    }

    pub fn source(document_type: DocumentType) -> Self {
        Expression::Source(document_type)
    }

    pub fn param(name: impl Into<String>) -> Self {
        Expression::Parameter(name.into())
    }

    pub fn score() -> Self {
        Expression::ElasticField(ElasticField::Score)
    }

    pub fn id() -> Self {
        Expression::ElasticField(ElasticField::Id)
    }

    pub fn lambda(parameter: impl Into<String>, body: Expression) -> Self {
        Expression::Lambda {
            parameter: parameter.into(),
            body: Box::new(body),
        }
    }

    pub fn new_object<S: Into<String>>(members: Vec<(S, Expression)>) -> Self {
        Expression::New {
            members: members.into_iter().map(|(n, e)| (n.into(), e)).collect(),
        }
    }

    pub fn call(method: impl Into<String>, args: Vec<Expression>) -> Self {
        Expression::Call {
            method: method.into(),
            args,
        }
    }

    pub fn member(self, member: Member) -> Self {
        Expression::Member {
            target: Box::new(self),
            member,
        }
    }

    fn binary(self, op: BinaryOperator, right: impl Into<Expression>) -> Self {
        Expression::Binary {
            op,
            left: Box::new(self),
            right: Box::new(right.into()),
        }
    }

    fn unary(self, op: UnaryOperator) -> Self {
        Expression::Unary {
            op,
            operand: Box::new(self),
        }
    }

    pub fn equal(self, right: impl Into<Expression>) -> Self {
        self.binary(BinaryOperator::Equal, right)
    }

    pub fn not_equal(self, right: impl Into<Expression>) -> Self {
        self.binary(BinaryOperator::NotEqual, right)
    }

    pub fn greater_than(self, right: impl Into<Expression>) -> Self {
        self.binary(BinaryOperator::GreaterThan, right)
    }

    pub fn greater_or_equal(self, right: impl Into<Expression>) -> Self {
        self.binary(BinaryOperator::GreaterThanOrEqual, right)
    }

    pub fn less_than(self, right: impl Into<Expression>) -> Self {
        self.binary(BinaryOperator::LessThan, right)
    }

    pub fn less_or_equal(self, right: impl Into<Expression>) -> Self {
        self.binary(BinaryOperator::LessThanOrEqual, right)
    }

    pub fn and_also(self, right: impl Into<Expression>) -> Self {
        self.binary(BinaryOperator::AndAlso, right)
    }

    pub fn or_else(self, right: impl Into<Expression>) -> Self {
        self.binary(BinaryOperator::OrElse, right)
    }

    pub fn add(self, right: impl Into<Expression>) -> Self {
        self.binary(BinaryOperator::Add, right)
    }

    pub fn subtract(self, right: impl Into<Expression>) -> Self {
        self.binary(BinaryOperator::Subtract, right)
    }

    pub fn multiply(self, right: impl Into<Expression>) -> Self {
        self.binary(BinaryOperator::Multiply, right)
    }

    pub fn divide(self, right: impl Into<Expression>) -> Self {
        self.binary(BinaryOperator::Divide, right)
    }

    pub fn negate(self) -> Self {
        self.unary(UnaryOperator::Negate)
    }

    pub fn convert(self) -> Self {
        self.unary(UnaryOperator::Convert)
    }

    // Predicate helpers

    /// `self.contains(value)`: substring, sequence membership or constant-set membership
    pub fn contains(self, value: impl Into<Expression>) -> Self {
        Expression::call(method::CONTAINS, vec![self, value.into()])
    }

    pub fn contains_any(self, values: impl Into<Expression>) -> Self {
        Expression::call(method::CONTAINS_ANY, vec![self, values.into()])
    }

    pub fn contains_all(self, values: impl Into<Expression>) -> Self {
        Expression::call(method::CONTAINS_ALL, vec![self, values.into()])
    }

    pub fn regexp(self, pattern: impl Into<Expression>) -> Self {
        Expression::call(method::REGEXP, vec![self, pattern.into()])
    }

    pub fn prefix(self, prefix: impl Into<Expression>) -> Self {
        Expression::call(method::PREFIX, vec![self, prefix.into()])
    }

    pub fn any(self) -> Self {
        Expression::call(method::ANY, vec![self])
    }

    // Query operators

    fn operator(self, method: &str, mut rest: Vec<Expression>) -> Self {
        let mut args = Vec::with_capacity(rest.len() + 1);
        args.push(self);
        args.append(&mut rest);
        Expression::call(method, args)
    }

    pub fn where_(self, predicate: Expression) -> Self {
        self.operator(method::WHERE, vec![predicate])
    }

    /// Predicate that always lands in query (scoring) context
    pub fn query(self, predicate: Expression) -> Self {
        self.operator(method::QUERY, vec![predicate])
    }

    pub fn query_string(self, text: impl Into<String>) -> Self {
        self.operator(method::QUERY_STRING, vec![Expression::constant(text.into())])
    }

    pub fn select(self, projection: Expression) -> Self {
        self.operator(method::SELECT, vec![projection])
    }

    pub fn order_by(self, key: Expression) -> Self {
        self.operator(method::ORDER_BY, vec![key])
    }

    pub fn order_by_descending(self, key: Expression) -> Self {
        self.operator(method::ORDER_BY_DESCENDING, vec![key])
    }

    pub fn then_by(self, key: Expression) -> Self {
        self.operator(method::THEN_BY, vec![key])
    }

    pub fn then_by_descending(self, key: Expression) -> Self {
        self.operator(method::THEN_BY_DESCENDING, vec![key])
    }

    pub fn order_by_score(self) -> Self {
        self.operator(method::ORDER_BY_SCORE, vec![])
    }

    pub fn order_by_score_descending(self) -> Self {
        self.operator(method::ORDER_BY_SCORE_DESCENDING, vec![])
    }

    pub fn then_by_score(self) -> Self {
        self.operator(method::THEN_BY_SCORE, vec![])
    }

    pub fn then_by_score_descending(self) -> Self {
        self.operator(method::THEN_BY_SCORE_DESCENDING, vec![])
    }

    pub fn skip(self, count: i64) -> Self {
        self.operator(method::SKIP, vec![Expression::constant(count)])
    }

    pub fn take(self, count: i64) -> Self {
        self.operator(method::TAKE, vec![Expression::constant(count)])
    }

    pub fn first(self) -> Self {
        self.operator(method::FIRST, vec![])
    }

    pub fn first_or_default(self) -> Self {
        self.operator(method::FIRST_OR_DEFAULT, vec![])
    }

    pub fn single(self) -> Self {
        self.operator(method::SINGLE, vec![])
    }

    pub fn single_or_default(self) -> Self {
        self.operator(method::SINGLE_OR_DEFAULT, vec![])
    }

    /// Terminal operator with a predicate, e.g. `first(r => r.id == 1)`
    pub fn terminal_where(self, method: &str, predicate: Expression) -> Self {
        self.operator(method, vec![predicate])
    }

    pub fn count(self) -> Self {
        self.operator(method::COUNT, vec![])
    }

    pub fn group_by(self, key: Expression) -> Self {
        self.operator(method::GROUP_BY, vec![key])
    }

    // Group aggregate helpers, used inside a projection over a group_by

    /// `g.Key`
    pub fn key(self) -> Self {
        self.member(Member::new("Key", ValueType::Any))
    }

    pub fn count_where(self, predicate: Expression) -> Self {
        self.operator(method::COUNT, vec![predicate])
    }

    pub fn sum(self, selector: Expression) -> Self {
        self.operator(method::SUM, vec![selector])
    }

    pub fn min(self, selector: Expression) -> Self {
        self.operator(method::MIN, vec![selector])
    }

    pub fn max(self, selector: Expression) -> Self {
        self.operator(method::MAX, vec![selector])
    }

    pub fn average(self, selector: Expression) -> Self {
        self.operator(method::AVERAGE, vec![selector])
    }

    // Inspection

    pub fn as_constant(&self) -> Option<&Value> {
        match self {
            Expression::Constant(value) => Some(value),
            _ => None,
        }
    }

    /// Split a lambda into its parameter and body
    pub fn as_lambda(&self) -> Option<(&str, &Expression)> {
        match self {
            Expression::Lambda { parameter, body } => Some((parameter.as_str(), body)),
            _ => None,
        }
    }

    /// Whether any node in this tree references a parameter.
    pub fn references_parameter(&self) -> bool {
        match self {
            Expression::Parameter(_) => true,
            Expression::Constant(_) | Expression::Source(_) | Expression::ElasticField(_) => false,
            Expression::Member { target, .. } => target.references_parameter(),
            Expression::Binary { left, right, .. } => {
                left.references_parameter() || right.references_parameter()
            }
            Expression::Unary { operand, .. } => operand.references_parameter(),
            Expression::Call { args, .. } => args.iter().any(Expression::references_parameter),
            Expression::Lambda { body, .. } => body.references_parameter(),
            Expression::New { members } => members.iter().any(|(_, e)| e.references_parameter()),
        }
    }
}

impl From<Value> for Expression {
    fn from(value: Value) -> Self {
        Expression::Constant(value)
    }
}

impl From<&str> for Expression {
    fn from(value: &str) -> Self {
        Expression::Constant(Value::String(value.to_string()))
    }
}

impl From<String> for Expression {
    fn from(value: String) -> Self {
        Expression::Constant(Value::String(value))
    }
}

impl From<i32> for Expression {
    fn from(value: i32) -> Self {
        Expression::Constant(Value::from(value))
    }
}

impl From<i64> for Expression {
    fn from(value: i64) -> Self {
        Expression::Constant(Value::from(value))
    }
}

impl From<f64> for Expression {
    fn from(value: f64) -> Self {
        Expression::Constant(Value::from(value))
    }
}

impl From<bool> for Expression {
    fn from(value: bool) -> Self {
        Expression::Constant(Value::Bool(value))
    }
}

impl std::ops::Not for Expression {
    type Output = Expression;

    fn not(self) -> Self::Output {
        self.unary(UnaryOperator::Not)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Constant(value) => write!(f, "{}", value),
            Expression::Source(doc) => write!(f, "source<{}>", doc.name),
            Expression::Parameter(name) => write!(f, "{}", name),
            Expression::Member { target, member } => write!(f, "{}.{}", target, member.name),
            Expression::ElasticField(field) => write!(f, "{}", field.field_name()),
            Expression::Binary { op, left, right } => {
                write!(f, "({} {} {})", left, op.symbol(), right)
            }
            Expression::Unary { op, operand } => match op {
                UnaryOperator::Not => write!(f, "!{}", operand),
                UnaryOperator::Negate => write!(f, "-{}", operand),
                UnaryOperator::Convert => write!(f, "{}", operand),
            },
            Expression::Call { method, args } => {
                write!(f, "{}(", method)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Expression::Lambda { parameter, body } => write!(f, "{} => {}", parameter, body),
            Expression::New { members } => {
                write!(f, "new {{ ")?;
                for (i, (name, e)) in members.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{} = {}", name, e)?;
                }
                write!(f, " }}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn robots() -> DocumentType {
        DocumentType::new("Robot")
            .with_member(Member::string("Id"))
            .with_member(Member::string("Name"))
    }

    #[test]
    fn test_operator_chain_is_outermost_first() {
        let query = Expression::source(robots()).skip(5).take(10);

        match query {
            Expression::Call { method, args } => {
                assert_eq!(method, method::TAKE);
                assert_eq!(args[1], Expression::constant(10));
                match &args[0] {
                    Expression::Call { method, .. } => assert_eq!(method, method::SKIP),
                    other => panic!("Expected skip call, got {}", other),
                }
            }
            other => panic!("Expected Call node, got {}", other),
        }
    }

    #[test]
    fn test_display_predicate() {
        let pred = Expression::param("r")
            .member(Member::string("Name"))
            .equal("Josef")
            .and_also(!Expression::param("r").member(Member::boolean("Active")));
        assert_eq!(pred.to_string(), r#"((r.Name == "Josef") && !r.Active)"#);
    }

    #[test]
    fn test_references_parameter() {
        let bound = Expression::param("r").member(Member::integer("Cost")).add(1);
        let unbound = Expression::constant(2).add(3);
        assert!(bound.references_parameter());
        assert!(!unbound.references_parameter());
        assert!(!Expression::source(robots()).references_parameter());
    }

    #[test]
    fn test_document_member_lookup_ignores_case() {
        let doc = robots();
        assert_eq!(doc.member("id").map(|m| m.name.as_str()), Some("Id"));
        assert!(doc.member("missing").is_none());
    }

    #[test]
    fn test_value_type_classification() {
        assert!(ValueType::optional(ValueType::Integer).is_nullable());
        assert!(ValueType::optional(ValueType::Integer).is_scalar());
        assert!(!ValueType::sequence(ValueType::String).is_scalar());
        assert!(ValueType::sequence(ValueType::String).is_sequence());
        assert!(ValueType::optional(ValueType::Boolean).is_boolean());
    }

    #[test]
    fn test_mirrored_comparators() {
        assert_eq!(BinaryOperator::LessThan.mirrored(), BinaryOperator::GreaterThan);
        assert_eq!(
            BinaryOperator::GreaterThanOrEqual.mirrored(),
            BinaryOperator::LessThanOrEqual
        );
        assert_eq!(BinaryOperator::Equal.mirrored(), BinaryOperator::Equal);
    }

    #[test]
    fn test_serde_roundtrip_keeps_tree() {
        let query = Expression::source(robots())
            .where_(Expression::lambda(
                "r",
                Expression::param("r").member(Member::string("Name")).equal(json!("a")),
            ));
        let text = serde_json::to_string(&query).unwrap();
        let back: Expression = serde_json::from_str(&text).unwrap();
        assert_eq!(back, query);
    }
}
