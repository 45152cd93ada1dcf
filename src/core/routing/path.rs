//! Request path boundary
//!
//! Turns a raw URL path into decoded routing segments. Every traversal and
//! ambiguity check happens here, before the resolver sees the path:
//! - The path is split on `/` first, then each segment is percent-decoded,
//!   so `%2F` can never introduce a new segment
//! - Empty segments (`//`, trailing `/`) are rejected
//! - `.` and `..` are rejected, encoded or not
//! - Decoded `/`, `\`, control characters and invalid UTF-8 are rejected

use crate::error::{GatewayError, Result};
use percent_encoding::percent_decode_str;

/// Maximum number of segments accepted from a request path
pub const MAX_PATH_SEGMENTS: usize = 16;

/// A validated, decoded request path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestPath {
    segments: Vec<String>,
}

impl RequestPath {
    /// Parse a raw URL path (no query string)
    ///
    /// # Examples
    ///
    /// ```
    /// use spa_gateway::routing::RequestPath;
    ///
    /// assert!(RequestPath::parse("/").unwrap().segments().is_empty());
    /// assert_eq!(RequestPath::parse("/my%20file.txt").unwrap().segments(), ["my file.txt"]);
    /// assert!(RequestPath::parse("/a/../b").is_err());
    /// ```
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.is_empty() || raw == "/" {
            return Ok(RequestPath {
                segments: Vec::new(),
            });
        }

        let Some(rest) = raw.strip_prefix('/') else {
            return Err(GatewayError::InvalidPath(
                "path must start with '/'".to_string(),
            ));
        };

        let mut segments = Vec::new();
        for raw_segment in rest.split('/') {
            if segments.len() == MAX_PATH_SEGMENTS {
                return Err(GatewayError::InvalidPath(format!(
                    "more than {} segments",
                    MAX_PATH_SEGMENTS
                )));
            }
            segments.push(decode_segment(raw_segment)?);
        }

        Ok(RequestPath { segments })
    }

    /// Decoded segments in order
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Number of segments
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Consume into the decoded segments
    pub fn into_segments(self) -> Vec<String> {
        self.segments
    }
}

fn decode_segment(raw: &str) -> Result<String> {
    if raw.is_empty() {
        return Err(GatewayError::InvalidPath("empty segment".to_string()));
    }

    let decoded = percent_decode_str(raw)
        .decode_utf8()
        .map_err(|_| GatewayError::InvalidPath("segment is not valid UTF-8".to_string()))?;

    if decoded == "." || decoded == ".." {
        return Err(GatewayError::InvalidPath(
            "relative segment not allowed".to_string(),
        ));
    }
    if decoded.contains(['/', '\\']) {
        return Err(GatewayError::InvalidPath(
            "encoded separator not allowed".to_string(),
        ));
    }
    if decoded.chars().any(char::is_control) {
        return Err(GatewayError::InvalidPath(
            "control character not allowed".to_string(),
        ));
    }

    Ok(decoded.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(raw: &str) -> Vec<String> {
        RequestPath::parse(raw).unwrap().into_segments()
    }

    fn rejected(raw: &str) -> bool {
        matches!(RequestPath::parse(raw), Err(GatewayError::InvalidPath(_)))
    }

    #[test]
    fn test_root() {
        assert!(parse_ok("/").is_empty());
        assert!(parse_ok("").is_empty());
    }

    #[test]
    fn test_plain_segments() {
        assert_eq!(parse_ok("/index.html"), vec!["index.html"]);
        assert_eq!(parse_ok("/a/b/c"), vec!["a", "b", "c"]);
        assert_eq!(parse_ok("/static/js/main.1a2b.js"), vec!["static", "js", "main.1a2b.js"]);
    }

    #[test]
    fn test_percent_decoding() {
        assert_eq!(parse_ok("/hello%20world.txt"), vec!["hello world.txt"]);
        assert_eq!(parse_ok("/caf%C3%A9"), vec!["café"]);
        // Literal percent that is not an escape is kept
        assert_eq!(parse_ok("/100%"), vec!["100%"]);
    }

    #[test]
    fn test_traversal_rejected() {
        assert!(rejected("/.."));
        assert!(rejected("/a/../b"));
        assert!(rejected("/./a"));
        assert!(rejected("/%2e%2e/secret"));
        assert!(rejected("/a/%2E"));
    }

    #[test]
    fn test_encoded_separators_rejected() {
        assert!(rejected("/a%2Fb"));
        assert!(rejected("/a%2fb/c/d"));
        assert!(rejected("/a%5Cb"));
    }

    #[test]
    fn test_empty_segments_rejected() {
        assert!(rejected("//"));
        assert!(rejected("/a//b"));
        assert!(rejected("/a/"));
    }

    #[test]
    fn test_malformed_rejected() {
        assert!(rejected("relative/path"));
        assert!(rejected("/%FF"));
        assert!(rejected("/a%00b"));
        assert!(rejected("/line%0Abreak"));
    }

    #[test]
    fn test_segment_limit() {
        let ok = "/a".repeat(MAX_PATH_SEGMENTS);
        assert_eq!(RequestPath::parse(&ok).unwrap().depth(), MAX_PATH_SEGMENTS);

        let too_deep = "/a".repeat(MAX_PATH_SEGMENTS + 1);
        assert!(rejected(&too_deep));
    }
}
