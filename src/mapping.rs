// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Field mapping between document members and wire field names.
//!
//! [`FieldMapping`] is the seam the translator and formatters consume.
//! Implementations must be safe to call from concurrent translations;
//! [`ElasticMapping`] holds only immutable options.

use crate::config::MappingOptions;
use crate::criteria::Criteria;
use crate::expression::{DocumentType, Member, ValueType};
use serde_json::Value;

/// Naming and value conventions for a document store.
pub trait FieldMapping {
    /// Wire path of `member`, nested under `prefix` (empty for the root).
    fn field_name(&self, prefix: &str, member: &Member) -> String;

    /// Value as it should appear in a term, range or wildcard.
    fn format_value(&self, member: &Member, value: &Value) -> Value;

    /// Document type name used in the search URI.
    fn document_type(&self, document_type: &DocumentType) -> String;

    /// Criteria selecting every document of the type.
    fn type_exists_criteria(&self, document_type: &DocumentType) -> Criteria;

    /// Path inside `_source` where the document lives, if nested.
    fn document_mapping_prefix(&self, document_type: &DocumentType) -> Option<String>;
}

/// Convention-based mapping: camelCase fields, pluralised type names.
#[derive(Debug, Clone, Default)]
pub struct ElasticMapping {
    options: MappingOptions,
}

impl ElasticMapping {
    pub fn new(options: MappingOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &MappingOptions {
        &self.options
    }
}

impl FieldMapping for ElasticMapping {
    fn field_name(&self, prefix: &str, member: &Member) -> String {
        let name = if self.options.camel_case_field_names {
            camel_case(&member.name)
        } else {
            member.name.clone()
        };

        if prefix.is_empty() {
            name
        } else {
            format!("{}.{}", prefix, name)
        }
    }

    fn format_value(&self, member: &Member, value: &Value) -> Value {
        match value {
            Value::String(s) if self.options.lower_case_analyzed_field_values && is_text(&member.value_type) => {
                Value::String(s.to_lowercase())
            }
            other => other.clone(),
        }
    }

    fn document_type(&self, document_type: &DocumentType) -> String {
        let mut name = if self.options.camel_case_type_names {
            camel_case(&document_type.name)
        } else {
            document_type.name.clone()
        };

        if self.options.pluralize_type_names {
            name = pluralize(&name);
        }
        name
    }

    fn type_exists_criteria(&self, document_type: &DocumentType) -> Criteria {
        match document_type.member("id") {
            Some(id) => Criteria::exists(self.field_name("", id)),
            None => Criteria::MatchAll,
        }
    }

    fn document_mapping_prefix(&self, _document_type: &DocumentType) -> Option<String> {
        None
    }
}

fn is_text(value_type: &ValueType) -> bool {
    match value_type {
        ValueType::String | ValueType::Any => true,
        ValueType::Optional(inner) | ValueType::Sequence(inner) => is_text(inner),
        _ => false,
    }
}

/// `SerialNumber` -> `serialNumber`, `ID` -> `id`
pub(crate) fn camel_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let leading_upper = chars.iter().take_while(|c| c.is_uppercase()).count();

    // Keep the last capital of an acronym when a word follows it: `URLPath` -> `urlPath`
    let lower_until = if leading_upper > 1 && leading_upper < chars.len() {
        leading_upper - 1
    } else {
        leading_upper.max(1)
    };

    chars
        .iter()
        .enumerate()
        .flat_map(|(i, c)| {
            if i < lower_until {
                c.to_lowercase().collect::<Vec<_>>()
            } else {
                vec![*c]
            }
        })
        .collect()
}

fn pluralize(name: &str) -> String {
    let lower = name.to_lowercase();
    if lower.ends_with('y')
        && !lower.ends_with("ay")
        && !lower.ends_with("ey")
        && !lower.ends_with("oy")
        && !lower.ends_with("uy")
    {
        format!("{}ies", &name[..name.len() - 1])
    } else if lower.ends_with('s')
        || lower.ends_with('x')
        || lower.ends_with("ch")
        || lower.ends_with("sh")
    {
        format!("{}es", name)
    } else {
        format!("{}s", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn robot() -> DocumentType {
        DocumentType::new("Robot")
            .with_member(Member::string("Id"))
            .with_member(Member::string("Name"))
    }

    #[test]
    fn test_camel_case() {
        assert_eq!(camel_case("SerialNumber"), "serialNumber");
        assert_eq!(camel_case("Id"), "id");
        assert_eq!(camel_case("ID"), "id");
        assert_eq!(camel_case("URLPath"), "urlPath");
        assert_eq!(camel_case("name"), "name");
        assert_eq!(camel_case(""), "");
    }

    #[test]
    fn test_field_name_with_prefix() {
        let mapping = ElasticMapping::default();
        let member = Member::string("Zone");
        assert_eq!(mapping.field_name("", &member), "zone");
        assert_eq!(mapping.field_name("stats.location", &member), "stats.location.zone");
    }

    #[test]
    fn test_field_name_without_camel_case() {
        let mapping = ElasticMapping::new(MappingOptions {
            camel_case_field_names: false,
            ..Default::default()
        });
        assert_eq!(mapping.field_name("", &Member::string("Zone")), "Zone");
    }

    #[test]
    fn test_document_type_pluralised() {
        let mapping = ElasticMapping::default();
        assert_eq!(mapping.document_type(&robot()), "robots");
        assert_eq!(mapping.document_type(&DocumentType::new("Category")), "categories");
        assert_eq!(mapping.document_type(&DocumentType::new("Box")), "boxes");
        assert_eq!(mapping.document_type(&DocumentType::new("Day")), "days");
    }

    #[test]
    fn test_document_type_verbatim() {
        let mapping = ElasticMapping::new(MappingOptions {
            camel_case_type_names: false,
            pluralize_type_names: false,
            ..Default::default()
        });
        assert_eq!(mapping.document_type(&robot()), "Robot");
    }

    #[test]
    fn test_format_value_lower_cases_strings_only() {
        let mapping = ElasticMapping::default();
        assert_eq!(mapping.format_value(&Member::string("Name"), &json!("Josef")), json!("josef"));
        assert_eq!(mapping.format_value(&Member::integer("Cost"), &json!(5)), json!(5));

        let verbatim = ElasticMapping::new(MappingOptions {
            lower_case_analyzed_field_values: false,
            ..Default::default()
        });
        assert_eq!(verbatim.format_value(&Member::string("Name"), &json!("Josef")), json!("Josef"));
    }

    #[test]
    fn test_type_exists_criteria() {
        let mapping = ElasticMapping::default();
        assert_eq!(mapping.type_exists_criteria(&robot()), Criteria::exists("id"));
        assert_eq!(
            mapping.type_exists_criteria(&DocumentType::new("Blob")),
            Criteria::MatchAll
        );
    }
}
