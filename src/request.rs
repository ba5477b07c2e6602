// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Search request accumulator.
//!
//! A [`SearchRequest`] starts empty, is mutated while the expression tree is
//! walked, and is handed out read-only in a
//! [`TranslateResult`](crate::TranslateResult).

use crate::criteria::Criteria;

/// One sort key. The first option in a request is the primary key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortOption {
    pub name: String,
    pub ascending: bool,
    /// Set for nullable members so documents lacking the field still sort
    pub ignore_unmapped: bool,
}

impl SortOption {
    pub fn new(name: impl Into<String>, ascending: bool) -> Self {
        Self {
            name: name.into(),
            ascending,
            ignore_unmapped: false,
        }
    }

    pub fn ignoring_unmapped(mut self, ignore_unmapped: bool) -> Self {
        self.ignore_unmapped = ignore_unmapped;
        self
    }
}

/// Server-side aggregation definition.
#[derive(Debug, Clone, PartialEq)]
pub enum Facet {
    /// Count of documents matching a filter
    Filter { name: String, filter: Criteria },
    /// Document counts per distinct value
    Terms {
        name: String,
        fields: Vec<String>,
        size: Option<usize>,
        filter: Option<Criteria>,
    },
    /// Numeric statistics over the fields
    Stats {
        name: String,
        fields: Vec<String>,
        filter: Option<Criteria>,
    },
    /// Statistics of `value_field` per distinct `key_field`
    TermsStats {
        name: String,
        key_field: String,
        value_field: String,
        size: Option<usize>,
        filter: Option<Criteria>,
    },
}

impl Facet {
    pub fn name(&self) -> &str {
        match self {
            Facet::Filter { name, .. }
            | Facet::Terms { name, .. }
            | Facet::Stats { name, .. }
            | Facet::TermsStats { name, .. } => name,
        }
    }

    /// Wire type of the facet
    pub fn facet_type(&self) -> &'static str {
        match self {
            Facet::Filter { .. } => "filter",
            Facet::Terms { .. } => "terms",
            Facet::Stats { .. } => "statistical",
            Facet::TermsStats { .. } => "terms_stats",
        }
    }

    /// Facet-scoped filter, before the request filter is combined in
    pub fn filter(&self) -> Option<&Criteria> {
        match self {
            Facet::Filter { filter, .. } => Some(filter),
            Facet::Terms { filter, .. }
            | Facet::Stats { filter, .. }
            | Facet::TermsStats { filter, .. } => filter.as_ref(),
        }
    }

    /// Maximum number of entries for orderable facets
    pub fn size(&self) -> Option<usize> {
        match self {
            Facet::Terms { size, .. } | Facet::TermsStats { size, .. } => *size,
            Facet::Filter { .. } | Facet::Stats { .. } => None,
        }
    }

    pub(crate) fn set_size(&mut self, new_size: usize) {
        if let Facet::Terms { size, .. } | Facet::TermsStats { size, .. } = self {
            *size = Some(new_size);
        }
    }
}

/// Everything needed to format a search against the engine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchRequest {
    pub document_type: String,
    /// Non-scoring criteria
    pub filter: Option<Criteria>,
    /// Scoring criteria
    pub query: Option<Criteria>,
    /// Fields to return; empty means the whole source
    pub fields: Vec<String>,
    pub sort_options: Vec<SortOption>,
    pub from: usize,
    pub size: Option<usize>,
    pub facets: Vec<Facet>,
    /// `count` for aggregate-only searches
    pub search_type: Option<String>,
}

impl SearchRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// `size = min(size, n)`, or `n` when unset.
    pub fn limit_size(&mut self, n: usize) {
        self.size = Some(match self.size {
            Some(existing) => existing.min(n),
            None => n,
        });
    }

    /// Append fields not already requested, keeping first-use order.
    pub fn add_fields(&mut self, fields: impl IntoIterator<Item = String>) {
        for field in fields {
            if !self.fields.contains(&field) {
                self.fields.push(field);
            }
        }
    }

    /// Sorts are visited outermost first, so each new key becomes the primary one.
    pub fn push_primary_sort(&mut self, option: SortOption) {
        self.sort_options.insert(0, option);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_size_takes_minimum() {
        let mut request = SearchRequest::new();
        request.limit_size(10);
        assert_eq!(request.size, Some(10));
        request.limit_size(20);
        assert_eq!(request.size, Some(10));
        request.limit_size(3);
        assert_eq!(request.size, Some(3));
    }

    #[test]
    fn test_add_fields_deduplicates_in_first_use_order() {
        let mut request = SearchRequest::new();
        request.add_fields(vec!["b".to_string(), "a".to_string()]);
        request.add_fields(vec!["a".to_string(), "c".to_string()]);
        assert_eq!(request.fields, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_sort_inserted_as_primary() {
        let mut request = SearchRequest::new();
        request.push_primary_sort(SortOption::new("b", true));
        request.push_primary_sort(SortOption::new("a", false));
        assert_eq!(request.sort_options[0].name, "a");
        assert_eq!(request.sort_options[1].name, "b");
    }

    #[test]
    fn test_facet_accessors() {
        let mut facet = Facet::Terms {
            name: "GroupKey".into(),
            fields: vec!["zone".into()],
            size: None,
            filter: None,
        };
        facet.set_size(5);
        assert_eq!(facet.size(), Some(5));
        assert_eq!(facet.facet_type(), "terms");
        assert_eq!(facet.name(), "GroupKey");

        let mut filter = Facet::Filter {
            name: "f".into(),
            filter: Criteria::MatchAll,
        };
        filter.set_size(5);
        assert_eq!(filter.size(), None);
        assert_eq!(filter.filter(), Some(&Criteria::MatchAll));
    }
}
