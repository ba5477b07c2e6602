// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! URI search formatter.
//!
//! Renders query and filter together as one Lucene `q` parameter. Values go
//! through the field mapping the same way the POST body's do.

use super::{format_timeout, search_path};
use crate::config::ConnectionConfig;
use crate::criteria::{Criteria, RangeComparison, TermsExecutionMode};
use crate::error::{QueryError, Result};
use crate::mapping::FieldMapping;
use crate::request::{SearchRequest, SortOption};
use serde_json::Value;

const LUCENE_SPECIAL: &[char] = &[
    '+', '-', '&', '|', '!', '(', ')', '{', '}', '[', ']', '^', '"', '~', '*', '?', ':', '\\', '/',
];

pub struct UriSearchFormatter<'a> {
    config: &'a ConnectionConfig,
    mapping: &'a dyn FieldMapping,
    request: &'a SearchRequest,
}

impl<'a> UriSearchFormatter<'a> {
    pub fn new(config: &'a ConnectionConfig, mapping: &'a dyn FieldMapping, request: &'a SearchRequest) -> Self {
        Self {
            config,
            mapping,
            request,
        }
    }

    /// Full URI including the encoded query string.
    pub fn uri(&self) -> Result<String> {
        let parameters = self.parameters()?;
        let path = search_path(self.config, self.request);
        if parameters.is_empty() {
            return Ok(path);
        }

        let query: Vec<String> = parameters
            .iter()
            .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
            .collect();
        Ok(format!("{}?{}", path, query.join("&")))
    }

    /// Unencoded parameters, in the order they appear in the URI.
    pub fn parameters(&self) -> Result<Vec<(&'static str, String)>> {
        let request = self.request;
        let mut parameters = Vec::new();

        let criteria: Vec<&Criteria> = request.query.iter().chain(request.filter.iter()).collect();
        match criteria.as_slice() {
            [] => {}
            [only] => parameters.push(("q", lucene(self.mapping, only)?)),
            both => {
                let rendered = both
                    .iter()
                    .map(|c| lucene(self.mapping, c))
                    .collect::<Result<Vec<_>>>()?;
                parameters.push(("q", format!("({})", rendered.join(") AND ("))));
            }
        }

        if !request.fields.is_empty() {
            parameters.push(("fields", request.fields.join(",")));
        }

        if !request.sort_options.is_empty() {
            let sort: Vec<String> = request.sort_options.iter().map(sort_parameter).collect();
            parameters.push(("sort", sort.join(",")));
        }

        if request.from > 0 {
            parameters.push(("from", request.from.to_string()));
        }

        if let Some(size) = request.size {
            parameters.push(("size", size.to_string()));
        }

        if let Some(timeout) = format_timeout(self.config.timeout()) {
            let timeout = match timeout {
                Value::String(s) => s,
                millis => format!("{}ms", millis),
            };
            parameters.push(("timeout", timeout));
        }

        if let Some(search_type) = &request.search_type {
            parameters.push(("search_type", search_type.clone()));
        }

        Ok(parameters)
    }
}

fn sort_parameter(option: &SortOption) -> String {
    if option.ascending {
        option.name.clone()
    } else {
        format!("{}:desc", option.name)
    }
}

/// Render criteria in Lucene query syntax.
pub(crate) fn lucene(mapping: &dyn FieldMapping, criteria: &Criteria) -> Result<String> {
    Ok(match criteria {
        Criteria::Term {
            field,
            member,
            value,
        } => format!("{}:{}", field, term_text(&mapping.format_value(member, value))),

        Criteria::Terms {
            field,
            member,
            values,
            execution,
        } => {
            let joiner = match execution {
                Some(TermsExecutionMode::And) => " AND ",
                _ => " OR ",
            };
            let values: Vec<String> = values
                .iter()
                .map(|v| term_text(&mapping.format_value(member, v)))
                .collect();
            format!("{}:({})", field, values.join(joiner))
        }

        Criteria::Range {
            field,
            member,
            specifications,
        } => {
            let bounds: Vec<String> = specifications
                .iter()
                .map(|spec| {
                    let v = term_text(&mapping.format_value(member, &spec.value));
                    match spec.comparison {
                        RangeComparison::GreaterThan => format!("{}:{{{} TO *}}", field, v),
                        RangeComparison::GreaterThanOrEqual => format!("{}:[{} TO *]", field, v),
                        RangeComparison::LessThan => format!("{}:{{* TO {}}}", field, v),
                        RangeComparison::LessThanOrEqual => format!("{}:[* TO {}]", field, v),
                    }
                })
                .collect();
            bounds.join(" AND ")
        }

        Criteria::Prefix { field, prefix } => format!("{}:{}*", field, escape(prefix)),
        Criteria::Regexp { field, pattern } => format!("{}:/{}/", field, pattern.replace('/', "\\/")),
        Criteria::Wildcard {
            field,
            member,
            pattern,
        } => {
            let pattern = mapping.format_value(member, &Value::from(pattern.as_str()));
            match pattern {
                Value::String(p) => format!("{}:{}", field, p),
                other => format!("{}:{}", field, other),
            }
        }
        Criteria::QueryString { query, .. } => format!("({})", query),
        Criteria::Exists { field } => format!("_exists_:{}", field),
        Criteria::Missing { field } => format!("_missing_:{}", field),
        Criteria::MatchAll => "*:*".to_string(),
        Criteria::Not(inner) => format!("NOT ({})", lucene(mapping, inner)?),

        Criteria::And(children) | Criteria::Or(children) => {
            let joiner = if matches!(criteria, Criteria::And(_)) {
                " AND "
            } else {
                " OR "
            };
            match children.as_slice() {
                [] => {
                    return Err(QueryError::InvalidCriteria(format!(
                        "'{}' with no criteria",
                        criteria.name()
                    )))
                }
                [only] => lucene(mapping, only)?,
                _ => {
                    let parts = children
                        .iter()
                        .map(|c| lucene(mapping, c))
                        .collect::<Result<Vec<_>>>()?;
                    format!("({})", parts.join(joiner))
                }
            }
        }

        Criteria::Bool {
            must,
            must_not,
            should,
        } => {
            let mut clauses = Vec::new();
            for c in must {
                clauses.push(format!("+({})", lucene(mapping, c)?));
            }
            for c in should {
                clauses.push(format!("({})", lucene(mapping, c)?));
            }
            for c in must_not {
                clauses.push(format!("-({})", lucene(mapping, c)?));
            }
            if clauses.is_empty() {
                return Err(QueryError::InvalidCriteria(
                    "bool query with no must, should or must_not clauses".into(),
                ));
            }
            format!("({})", clauses.join(" "))
        }

        Criteria::Nop(_) => {
            return Err(QueryError::FormatterInternal(format!(
                "placeholder criteria reached the formatter: {}",
                criteria
            )))
        }
    })
}

fn term_text(value: &Value) -> String {
    match value {
        Value::String(s) if s.chars().any(char::is_whitespace) => {
            format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
        }
        Value::String(s) => escape(s),
        other => other.to_string(),
    }
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if LUCENE_SPECIAL.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
