// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Request formatting.
//!
//! Turns a [`SearchRequest`] into what the transport sends: a target URI and,
//! for POST searches, a compact JSON body with byte-stable key order.
//!
//! ```text
//! SearchRequest ──► format_request ──┬──► POST {endpoint}/{index}/{type}/_search  + body
//!                                    └──► GET  {endpoint}/{index}/{type}/_search?q=...
//! ```
//!
//! The GET form is only chosen when the connection prefers it and the
//! request carries no facets.

mod post_body;
mod uri_search;

pub use post_body::PostBodyFormatter;
pub use uri_search::UriSearchFormatter;

use crate::config::ConnectionConfig;
use crate::error::Result;
use crate::mapping::FieldMapping;
use crate::metrics;
use crate::request::SearchRequest;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// HTTP method of a formatted request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMethod {
    Post,
    Get,
}

impl RequestMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestMethod::Post => "post",
            RequestMethod::Get => "get",
        }
    }
}

/// A request ready for the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedRequest {
    pub method: RequestMethod,
    pub uri: String,
    /// Compact JSON; `None` for URI searches
    pub body: Option<String>,
}

/// Format a translated request for the given connection.
#[tracing::instrument(skip(config, mapping, request), fields(document_type = %request.document_type))]
pub fn format_request(
    config: &ConnectionConfig,
    mapping: &dyn FieldMapping,
    request: &SearchRequest,
) -> Result<FormattedRequest> {
    let _timer = metrics::LatencyTimer::new("format");

    let formatted = if config.prefer_get_requests && request.facets.is_empty() {
        let formatter = UriSearchFormatter::new(config, mapping, request);
        FormattedRequest {
            method: RequestMethod::Get,
            uri: formatter.uri()?,
            body: None,
        }
    } else {
        let formatter = PostBodyFormatter::new(config, mapping, request);
        FormattedRequest {
            method: RequestMethod::Post,
            uri: formatter.uri(),
            body: Some(formatter.body()?),
        }
    };

    debug!(method = formatted.method.as_str(), uri = %formatted.uri, "Formatted search request");
    metrics::record_request_formatted(formatted.method.as_str());
    Ok(formatted)
}

/// `{endpoint}/{index|_all}/{type/}_search`
pub(crate) fn search_path(config: &ConnectionConfig, request: &SearchRequest) -> String {
    let mut path = format!(
        "{}/{}/",
        config.endpoint.trim_end_matches('/'),
        config.index.as_deref().unwrap_or("_all")
    );
    if !request.document_type.is_empty() {
        path.push_str(&request.document_type);
        path.push('/');
    }
    path.push_str("_search");
    path
}

/// Wire form of the server-side timeout.
///
/// A duration with a millisecond component is sent as a number of
/// milliseconds, whole seconds as `"<n>s"` and whole minutes as `"<n>m"`.
/// Durations under one millisecond are not sent.
pub fn format_timeout(timeout: Duration) -> Option<Value> {
    if timeout.as_millis() == 0 {
        return None;
    }

    let secs = timeout.as_secs();
    if timeout.subsec_millis() != 0 {
        Some(Value::from(timeout.as_millis() as u64))
    } else if secs % 60 != 0 {
        Some(Value::String(format!("{}s", secs)))
    } else {
        Some(Value::String(format!("{}m", secs / 60)))
    }
}
