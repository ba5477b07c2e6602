// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Criteria - the boolean condition tree sent to the search engine
//!
//! Leaves carry the wire field path plus the source member so values can be
//! formatted by the field mapping at serialization time. Compound nodes may
//! hold a single child; they only collapse when formatted.
//!
//! # Query vs filter context
//!
//! `Wildcard`, `QueryString` and `Bool` affect relevance scoring and are only
//! valid in the `query` part of a request. Everything else is a filter.

mod algebra;

use crate::expression::Member;
use serde_json::Value;
use std::fmt;

/// Comparator of one side of a range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RangeComparison {
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
}

impl RangeComparison {
    /// Wire key (`gt`, `gte`, `lt`, `lte`)
    pub fn name(self) -> &'static str {
        match self {
            RangeComparison::GreaterThan => "gt",
            RangeComparison::GreaterThanOrEqual => "gte",
            RangeComparison::LessThan => "lt",
            RangeComparison::LessThanOrEqual => "lte",
        }
    }

    /// `gt` and `gte` bound from below
    pub fn is_lower_bound(self) -> bool {
        matches!(self, RangeComparison::GreaterThan | RangeComparison::GreaterThanOrEqual)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RangeSpecification {
    pub comparison: RangeComparison,
    pub value: Value,
}

/// How a `terms` filter matches multiple values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TermsExecutionMode {
    Plain,
    Fielddata,
    /// Any value matches
    Bool,
    /// All values must match
    And,
    Or,
}

impl TermsExecutionMode {
    pub fn name(self) -> &'static str {
        match self {
            TermsExecutionMode::Plain => "plain",
            TermsExecutionMode::Fielddata => "fielddata",
            TermsExecutionMode::Bool => "bool",
            TermsExecutionMode::And => "and",
            TermsExecutionMode::Or => "or",
        }
    }
}

/// A node of the condition tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Criteria {
    Term {
        field: String,
        member: Member,
        value: Value,
    },
    Terms {
        field: String,
        member: Member,
        values: Vec<Value>,
        execution: Option<TermsExecutionMode>,
    },
    Range {
        field: String,
        member: Member,
        specifications: Vec<RangeSpecification>,
    },
    Prefix {
        field: String,
        prefix: String,
    },
    Regexp {
        field: String,
        pattern: String,
    },
    /// Always holds a lower-cased pattern
    Wildcard {
        field: String,
        member: Member,
        pattern: String,
    },
    QueryString {
        query: String,
        fields: Vec<String>,
    },
    Exists {
        field: String,
    },
    Missing {
        field: String,
    },
    MatchAll,
    Not(Box<Criteria>),
    And(Vec<Criteria>),
    Or(Vec<Criteria>),
    Bool {
        must: Vec<Criteria>,
        must_not: Vec<Criteria>,
        should: Vec<Criteria>,
    },
    /// Placeholder for criteria already moved elsewhere; never formatted
    Nop(Vec<Criteria>),
}

impl Criteria {
    pub fn term(field: impl Into<String>, member: Member, value: Value) -> Self {
        Criteria::Term {
            field: field.into(),
            member,
            value,
        }
    }

    /// Membership test. Duplicates are removed and a single remaining value
    /// becomes a plain `Term`.
    pub fn terms(
        field: impl Into<String>,
        member: Member,
        values: Vec<Value>,
        execution: Option<TermsExecutionMode>,
    ) -> Self {
        let mut distinct: Vec<Value> = Vec::with_capacity(values.len());
        for value in values {
            if !distinct.contains(&value) {
                distinct.push(value);
            }
        }

        if distinct.len() == 1 {
            if let Some(value) = distinct.pop() {
                return Criteria::term(field, member, value);
            }
        }

        Criteria::Terms {
            field: field.into(),
            member,
            values: distinct,
            execution,
        }
    }

    pub fn range(
        field: impl Into<String>,
        member: Member,
        comparison: RangeComparison,
        value: Value,
    ) -> Self {
        Criteria::Range {
            field: field.into(),
            member,
            specifications: vec![RangeSpecification { comparison, value }],
        }
    }

    /// Substring match; the pattern is lower-cased for analyzed fields.
    pub fn wildcard(field: impl Into<String>, member: Member, pattern: &str) -> Self {
        Criteria::Wildcard {
            field: field.into(),
            member,
            pattern: pattern.to_lowercase(),
        }
    }

    pub fn exists(field: impl Into<String>) -> Self {
        Criteria::Exists {
            field: field.into(),
        }
    }

    pub fn missing(field: impl Into<String>) -> Self {
        Criteria::Missing {
            field: field.into(),
        }
    }

    pub fn query_string(query: impl Into<String>) -> Self {
        Criteria::QueryString {
            query: query.into(),
            fields: Vec::new(),
        }
    }

    /// Wire name of this criteria kind
    pub fn name(&self) -> &'static str {
        match self {
            Criteria::Term { .. } => "term",
            Criteria::Terms { .. } => "terms",
            Criteria::Range { .. } => "range",
            Criteria::Prefix { .. } => "prefix",
            Criteria::Regexp { .. } => "regexp",
            Criteria::Wildcard { .. } => "wildcard",
            Criteria::QueryString { .. } => "query_string",
            Criteria::Exists { .. } => "exists",
            Criteria::Missing { .. } => "missing",
            Criteria::MatchAll => "match_all",
            Criteria::Not(_) => "not",
            Criteria::And(_) => "and",
            Criteria::Or(_) => "or",
            Criteria::Bool { .. } => "bool",
            Criteria::Nop(_) => "NOP",
        }
    }

    /// Whether this criteria must be placed in the scoring `query` context.
    pub fn is_query_context(&self) -> bool {
        matches!(
            self,
            Criteria::Wildcard { .. } | Criteria::QueryString { .. } | Criteria::Bool { .. }
        )
    }

    pub fn is_nop(&self) -> bool {
        matches!(self, Criteria::Nop(_))
    }

    /// Number of non-compound leaves, looking through And/Or/Not.
    pub fn leaf_count(&self) -> usize {
        match self {
            Criteria::And(children) | Criteria::Or(children) | Criteria::Nop(children) => {
                children.iter().map(Criteria::leaf_count).sum()
            }
            Criteria::Not(inner) => inner.leaf_count(),
            Criteria::Bool {
                must,
                must_not,
                should,
            } => must
                .iter()
                .chain(must_not)
                .chain(should)
                .map(Criteria::leaf_count)
                .sum(),
            _ => 1,
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Criteria]) -> fmt::Result {
    write!(f, "(")?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    write!(f, ")")
}

impl fmt::Display for Criteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Criteria::Term { field, value, .. } => {
                write!(f, "term {} {}", field, value)
            }
            Criteria::Terms { field, values, .. } => {
                let values: Vec<String> = values.iter().map(Value::to_string).collect();
                write!(f, "terms {} [{}]", field, values.join(", "))
            }
            Criteria::Range {
                field,
                specifications,
                ..
            } => {
                write!(f, "range {}", field)?;
                for spec in specifications {
                    write!(f, " {} {}", spec.comparison.name(), spec.value)?;
                }
                Ok(())
            }
            Criteria::Prefix { field, prefix } => write!(f, "prefix {} {}", field, prefix),
            Criteria::Regexp { field, pattern } => write!(f, "regexp {} {}", field, pattern),
            Criteria::Wildcard { field, pattern, .. } => {
                write!(f, "wildcard {} {}", field, pattern)
            }
            Criteria::QueryString { query, .. } => write!(f, "query_string {}", query),
            Criteria::Exists { field } => write!(f, "exists {}", field),
            Criteria::Missing { field } => write!(f, "missing {}", field),
            Criteria::MatchAll => write!(f, "match_all"),
            Criteria::Not(inner) => write!(f, "not {}", inner),
            Criteria::And(children) | Criteria::Or(children) | Criteria::Nop(children) => {
                write!(f, "{} ", self.name())?;
                write_list(f, children)
            }
            Criteria::Bool {
                must,
                must_not,
                should,
            } => {
                write!(f, "bool must ")?;
                write_list(f, must)?;
                write!(f, " should ")?;
                write_list(f, should)?;
                write!(f, " must_not ")?;
                write_list(f, must_not)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wildcard_pattern_is_lower_cased() {
        let c = Criteria::wildcard("name", Member::string("Name"), "*JoSeF*");
        match c {
            Criteria::Wildcard { pattern, .. } => assert_eq!(pattern, "*josef*"),
            other => panic!("Expected Wildcard, got {}", other),
        }
    }

    #[test]
    fn test_terms_removes_duplicates() {
        let c = Criteria::terms(
            "id",
            Member::integer("Id"),
            vec![json!(1), json!(2), json!(1)],
            None,
        );
        match c {
            Criteria::Terms { values, .. } => assert_eq!(values, vec![json!(1), json!(2)]),
            other => panic!("Expected Terms, got {}", other),
        }
    }

    #[test]
    fn test_terms_with_one_value_becomes_term() {
        let c = Criteria::terms("tags", Member::string("Tags"), vec![json!("a")], None);
        assert_eq!(c, Criteria::term("tags", Member::string("Tags"), json!("a")));
    }

    #[test]
    fn test_query_context_classification() {
        assert!(Criteria::query_string("x").is_query_context());
        assert!(Criteria::wildcard("a", Member::string("A"), "*b*").is_query_context());
        assert!(!Criteria::exists("a").is_query_context());
        assert!(!Criteria::Not(Box::new(Criteria::query_string("x"))).is_query_context());
    }

    #[test]
    fn test_display() {
        let c = Criteria::And(vec![
            Criteria::term("name", Member::string("Name"), json!("josef")),
            Criteria::range("cost", Member::float("Cost"), RangeComparison::GreaterThan, json!(5)),
        ]);
        assert_eq!(c.to_string(), "and (term name \"josef\", range cost gt 5)");
        assert_eq!(Criteria::missing("x").to_string(), "missing x");
    }

    #[test]
    fn test_leaf_count() {
        let c = Criteria::Or(vec![
            Criteria::exists("a"),
            Criteria::And(vec![Criteria::exists("b"), Criteria::Not(Box::new(Criteria::exists("c")))]),
        ]);
        assert_eq!(c.leaf_count(), 3);
    }
}
