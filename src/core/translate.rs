//! Response translation from bucket status to client status
//!
//! Works like a gateway's integration responses: an ordered table of
//! selection patterns (regexes over the upstream status code), each mapping
//! to a client status and a set of headers to forward. The first match
//! wins; anything unmatched becomes the fallback status.

use crate::error::{GatewayError, Result};
use http::header::{HeaderName, CONTENT_TYPE};
use http::{HeaderMap, StatusCode};
use regex::Regex;
use tracing::debug;

/// One row of the translation table
#[derive(Debug, Clone)]
pub struct IntegrationResponse {
    selection_pattern: String,
    regex: Regex,
    status: StatusCode,
    forward_headers: Vec<HeaderName>,
}

impl IntegrationResponse {
    /// Build a row; `selection_pattern` must match the whole status code
    pub fn new(selection_pattern: &str, status: u16, forward_headers: &[HeaderName]) -> Result<Self> {
        let regex = Regex::new(&format!("^(?:{})$", selection_pattern)).map_err(|e| {
            GatewayError::InvalidRoute(format!(
                "invalid selection pattern '{}': {}",
                selection_pattern, e
            ))
        })?;
        let status = StatusCode::from_u16(status)
            .map_err(|_| GatewayError::InvalidRoute(format!("invalid status {}", status)))?;

        Ok(IntegrationResponse {
            selection_pattern: selection_pattern.to_string(),
            regex,
            status,
            forward_headers: forward_headers.to_vec(),
        })
    }

    /// Regex source as configured
    pub fn selection_pattern(&self) -> &str {
        &self.selection_pattern
    }

    /// Client status for matching upstream responses
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Upstream headers copied to the client
    pub fn forward_headers(&self) -> &[HeaderName] {
        &self.forward_headers
    }

    fn selects(&self, upstream_status: u16) -> bool {
        self.regex.is_match(&upstream_status.to_string())
    }
}

/// Client-visible result of a translation
#[derive(Debug, Clone, PartialEq)]
pub struct Translation {
    pub status: StatusCode,
    pub headers: HeaderMap,
}

/// Ordered translation table with a fallback status
#[derive(Debug, Clone)]
pub struct ResponseTranslator {
    responses: Vec<IntegrationResponse>,
    fallback: StatusCode,
}

impl ResponseTranslator {
    /// Build a translator from rows and the status for unmatched codes
    pub fn new(responses: Vec<IntegrationResponse>, fallback: StatusCode) -> Self {
        ResponseTranslator {
            responses,
            fallback,
        }
    }

    /// The table used for the site
    ///
    /// - `2xx` → 200, forwarding `Content-Type`
    /// - `4xx` → 404, so a 403 from the bucket reveals nothing about what exists
    /// - anything else → 502
    pub fn single_page_app() -> Result<Self> {
        Ok(ResponseTranslator::new(
            vec![
                IntegrationResponse::new(r"2\d{2}", 200, &[CONTENT_TYPE])?,
                IntegrationResponse::new(r"4\d{2}", 404, &[])?,
            ],
            StatusCode::BAD_GATEWAY,
        ))
    }

    /// Rows in order
    pub fn responses(&self) -> &[IntegrationResponse] {
        &self.responses
    }

    /// Status used when no row matches
    pub fn fallback(&self) -> StatusCode {
        self.fallback
    }

    /// Translate an upstream status and headers
    pub fn translate(&self, upstream_status: u16, upstream_headers: &HeaderMap) -> Translation {
        let Some(row) = self.responses.iter().find(|r| r.selects(upstream_status)) else {
            debug!(upstream_status, client_status = %self.fallback, "unmapped upstream status");
            return Translation {
                status: self.fallback,
                headers: HeaderMap::new(),
            };
        };

        let mut headers = HeaderMap::new();
        for name in &row.forward_headers {
            if let Some(value) = upstream_headers.get(name) {
                headers.insert(name.clone(), value.clone());
            }
        }

        debug!(
            upstream_status,
            client_status = %row.status,
            pattern = %row.selection_pattern,
            "upstream status translated"
        );
        Translation {
            status: row.status,
            headers,
        }
    }
}
