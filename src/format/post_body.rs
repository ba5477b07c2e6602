// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! POST body formatter.
//!
//! Keys are emitted only when they carry something, always in this order:
//! `fields`, `query`, `filter`, `sort`, `from`, `size`, `facets`, `timeout`.
//! When facets are present the request filter moves into each facet and the
//! top-level `filter` key is dropped.

use super::{format_timeout, search_path};
use crate::config::ConnectionConfig;
use crate::criteria::Criteria;
use crate::error::{QueryError, Result};
use crate::mapping::FieldMapping;
use crate::request::{Facet, SearchRequest, SortOption};
use serde_json::{Map, Value};

pub struct PostBodyFormatter<'a> {
    config: &'a ConnectionConfig,
    mapping: &'a dyn FieldMapping,
    request: &'a SearchRequest,
}

impl<'a> PostBodyFormatter<'a> {
    pub fn new(
        config: &'a ConnectionConfig,
        mapping: &'a dyn FieldMapping,
        request: &'a SearchRequest,
    ) -> Self {
        Self {
            config,
            mapping,
            request,
        }
    }

    /// Target URI, with `search_type` when the request sets one.
    pub fn uri(&self) -> String {
        let path = search_path(self.config, self.request);
        match &self.request.search_type {
            Some(search_type) => format!("{}?search_type={}", path, search_type),
            None => path,
        }
    }

    /// Compact JSON body.
    pub fn body(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.payload()?)?)
    }

    /// Body as a JSON value.
    pub fn payload(&self) -> Result<Value> {
        let request = self.request;
        let mut root = Map::new();

        if !request.fields.is_empty() {
            root.insert("fields".into(), Value::from(request.fields.clone()));
        }

        if let Some(query) = &request.query {
            root.insert("query".into(), self.criteria(query)?);
        }

        if request.facets.is_empty() {
            if let Some(filter) = &request.filter {
                root.insert("filter".into(), self.criteria(filter)?);
            }
        }

        if !request.sort_options.is_empty() {
            let sort = request.sort_options.iter().map(sort_entry).collect();
            root.insert("sort".into(), Value::Array(sort));
        }

        if request.from > 0 {
            root.insert("from".into(), Value::from(request.from));
        }

        if let Some(size) = request.size {
            root.insert("size".into(), Value::from(size));
        }

        if !request.facets.is_empty() {
            let mut facets = Map::new();
            for facet in &request.facets {
                facets.insert(facet.name().to_string(), self.facet(facet)?);
            }
            root.insert("facets".into(), Value::Object(facets));
        }

        if let Some(timeout) = format_timeout(self.config.timeout()) {
            root.insert("timeout".into(), timeout);
        }

        Ok(Value::Object(root))
    }

    fn facet(&self, facet: &Facet) -> Result<Value> {
        let mut specific = match facet {
            Facet::Filter { .. } => Map::new(),
            Facet::Terms { fields, .. } | Facet::Stats { fields, .. } => field_or_fields(fields),
            Facet::TermsStats {
                key_field,
                value_field,
                ..
            } => {
                let mut body = Map::new();
                body.insert("key_field".into(), Value::from(key_field.as_str()));
                body.insert("value_field".into(), Value::from(value_field.as_str()));
                body
            }
        };

        if let Some(size) = facet.size() {
            specific.insert("size".into(), Value::from(size.to_string()));
        }

        let mut named = Map::new();
        named.insert(facet.facet_type().into(), Value::Object(specific));

        let combined = Criteria::and_all(
            self.request
                .filter
                .iter()
                .cloned()
                .chain(facet.filter().cloned()),
        );
        if let Some(filter) = combined {
            let key = match facet {
                Facet::Filter { .. } => "filter",
                _ => "facet_filter",
            };
            named.insert(key.into(), self.criteria(&filter)?);
        }

        Ok(Value::Object(named))
    }

    /// Render one criteria node.
    pub fn criteria(&self, criteria: &Criteria) -> Result<Value> {
        let body = match criteria {
            Criteria::Term { field, member, value } => {
                single(field, self.mapping.format_value(member, value))
            }

            Criteria::Terms {
                field,
                member,
                values,
                execution,
            } => {
                let formatted: Vec<Value> = values
                    .iter()
                    .map(|v| self.mapping.format_value(member, v))
                    .collect();
                let mut body = Map::new();
                body.insert(field.clone(), Value::Array(formatted));
                if let Some(mode) = execution {
                    body.insert("execution".into(), Value::from(mode.name()));
                }
                Value::Object(body)
            }

            Criteria::Range {
                field,
                member,
                specifications,
            } => {
                let mut bounds = Map::new();
                for spec in specifications {
                    bounds.insert(
                        spec.comparison.name().into(),
                        self.mapping.format_value(member, &spec.value),
                    );
                }
                single(field, Value::Object(bounds))
            }

            Criteria::Prefix { field, prefix } => single(field, Value::from(prefix.as_str())),
            Criteria::Regexp { field, pattern } => single(field, Value::from(pattern.as_str())),

            Criteria::Wildcard {
                field,
                member,
                pattern,
            } => single(
                field,
                self.mapping
                    .format_value(member, &Value::from(pattern.as_str())),
            ),

            Criteria::QueryString { query, fields } => {
                let mut body = Map::new();
                body.insert("query".into(), Value::from(query.as_str()));
                if !fields.is_empty() {
                    body.insert("fields".into(), Value::from(fields.clone()));
                }
                Value::Object(body)
            }

            Criteria::Exists { field } | Criteria::Missing { field } => {
                single("field", Value::from(field.as_str()))
            }

            Criteria::MatchAll => Value::Object(Map::new()),

            Criteria::Not(inner) => self.criteria(inner)?,

            Criteria::And(children) | Criteria::Or(children) => match children.as_slice() {
                [] => {
                    return Err(QueryError::InvalidCriteria(format!(
                        "'{}' with no criteria",
                        criteria.name()
                    )))
                }
                [only] => return self.criteria(only),
                _ => Value::Array(
                    children
                        .iter()
                        .map(|c| self.criteria(c))
                        .collect::<Result<Vec<_>>>()?,
                ),
            },

            Criteria::Bool {
                must,
                must_not,
                should,
            } => {
                let mut body = Map::new();
                for (key, clauses) in [("must", must), ("should", should), ("must_not", must_not)] {
                    if !clauses.is_empty() {
                        let rendered = clauses
                            .iter()
                            .map(|c| self.criteria(c))
                            .collect::<Result<Vec<_>>>()?;
                        body.insert(key.into(), Value::Array(rendered));
                    }
                }
                if body.is_empty() {
                    return Err(QueryError::InvalidCriteria(
                        "bool query with no must, should or must_not clauses".into(),
                    ));
                }
                Value::Object(body)
            }

            Criteria::Nop(_) => {
                return Err(QueryError::FormatterInternal(format!(
                    "placeholder criteria reached the formatter: {}",
                    criteria
                )))
            }
        };

        Ok(single(criteria.name(), body))
    }
}

fn single(key: &str, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(key.to_string(), value);
    Value::Object(map)
}

fn field_or_fields(fields: &[String]) -> Map<String, Value> {
    let mut body = Map::new();
    match fields {
        [only] => body.insert("field".into(), Value::from(only.as_str())),
        _ => body.insert("fields".into(), Value::from(fields.to_vec())),
    };
    body
}

fn sort_entry(option: &SortOption) -> Value {
    if !option.ignore_unmapped {
        return if option.ascending {
            Value::from(option.name.as_str())
        } else {
            single(&option.name, Value::from("desc"))
        };
    }

    let mut settings = Map::new();
    settings.insert("ignore_unmapped".into(), Value::Bool(true));
    if !option.ascending {
        settings.insert("order".into(), Value::from("desc"));
    }
    single(&option.name, Value::Object(settings))
}
