// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use thiserror::Error;

/// Errors raised while translating, formatting or materializing a query.
#[derive(Error, Debug)]
pub enum QueryError {
    /// The expression tree contains a shape the translator does not understand.
    #[error("Unsupported expression: {0}")]
    UnsupportedExpression(String),

    /// A criteria tree that cannot be rendered (e.g. a bool with no clauses).
    #[error("Invalid criteria: {0}")]
    InvalidCriteria(String),

    /// Folding a constant subtree (or evaluating a projection) failed.
    #[error("Evaluation failed: {0}")]
    Evaluation(String),

    #[error("Sequence contains more than one element")]
    MultipleResults,

    #[error("Sequence contains no elements")]
    NoResult,

    /// A dispatch case is missing in the formatter. Always a bug.
    #[error("Formatter internal error: {0}")]
    FormatterInternal(String),

    /// A projected value could not be read from a hit.
    #[error("Projection error: {0}")]
    Projection(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for query operations
pub type Result<T> = std::result::Result<T, QueryError>;

impl QueryError {
    /// Stable lowercase label, used for metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            QueryError::UnsupportedExpression(_) => "unsupported_expression",
            QueryError::InvalidCriteria(_) => "invalid_criteria",
            QueryError::Evaluation(_) => "evaluation",
            QueryError::MultipleResults => "multiple_results",
            QueryError::NoResult => "no_result",
            QueryError::FormatterInternal(_) => "formatter_internal",
            QueryError::Projection(_) => "projection",
            QueryError::Json(_) => "json",
        }
    }

    /// Whether the failure depends on the data the engine returned rather
    /// than on the shape of the query.
    pub fn is_data_dependent(&self) -> bool {
        matches!(self, QueryError::MultipleResults | QueryError::NoResult)
    }

    pub(crate) fn unsupported(construct: impl std::fmt::Display) -> Self {
        QueryError::UnsupportedExpression(construct.to_string())
    }
}
