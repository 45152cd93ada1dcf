//! Route patterns and object-key templates
//!
//! A pattern is a sequence of path segments, each a literal (`assets`) or a
//! named wildcard (`{patha}`). A wildcard captures exactly one decoded path
//! segment. A key template is literal text with `{name}` placeholders that
//! are filled from the captures of the matching pattern.

use crate::error::{GatewayError, Result};
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

/// Maximum number of segments a pattern may have
pub const MAX_PATTERN_SEGMENTS: usize = 8;

fn wildcard_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").expect("valid wildcard regex"))
}

/// One segment of a route pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Must equal the path segment exactly
    Literal(String),
    /// Captures any single path segment under this name
    Wildcard(String),
}

impl Segment {
    fn parse(raw: &str) -> Result<Self> {
        if let Some(inner) = raw.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            if !wildcard_name_re().is_match(inner) {
                return Err(GatewayError::InvalidRoute(format!(
                    "invalid wildcard name '{}'",
                    inner
                )));
            }
            return Ok(Segment::Wildcard(inner.to_string()));
        }

        if raw.is_empty() || raw.contains(['{', '}']) {
            return Err(GatewayError::InvalidRoute(format!(
                "invalid literal segment '{}'",
                raw
            )));
        }
        Ok(Segment::Literal(raw.to_string()))
    }

    /// Could this segment and `other` both match some path segment?
    fn overlaps(&self, other: &Segment) -> bool {
        match (self, other) {
            (Segment::Literal(a), Segment::Literal(b)) => a == b,
            _ => true,
        }
    }
}

/// A parsed route pattern such as `/{patha}/{pathb}/{pathc}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    segments: Vec<Segment>,
}

impl RoutePattern {
    /// Parse a pattern; `/` is the zero-segment root pattern
    pub fn parse(pattern: &str) -> Result<Self> {
        let trimmed = pattern.strip_prefix('/').unwrap_or(pattern);
        let segments = if trimmed.is_empty() {
            Vec::new()
        } else {
            trimmed
                .split('/')
                .map(Segment::parse)
                .collect::<Result<Vec<_>>>()?
        };

        if segments.len() > MAX_PATTERN_SEGMENTS {
            return Err(GatewayError::InvalidRoute(format!(
                "pattern '{}' has more than {} segments",
                pattern, MAX_PATTERN_SEGMENTS
            )));
        }

        let mut seen = Vec::new();
        for segment in &segments {
            if let Segment::Wildcard(name) = segment {
                if seen.contains(&name) {
                    return Err(GatewayError::InvalidRoute(format!(
                        "wildcard '{}' used twice in '{}'",
                        name, pattern
                    )));
                }
                seen.push(name);
            }
        }

        Ok(RoutePattern { segments })
    }

    /// Pattern segments in order
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Names captured by this pattern, in order
    pub fn wildcard_names(&self) -> Vec<&str> {
        self.segments
            .iter()
            .filter_map(|s| match s {
                Segment::Wildcard(name) => Some(name.as_str()),
                Segment::Literal(_) => None,
            })
            .collect()
    }

    /// Match decoded path segments, returning the captures on success
    pub fn match_segments<'a>(&self, path: &'a [String]) -> Option<HashMap<&str, &'a str>> {
        if path.len() != self.segments.len() {
            return None;
        }

        let mut captures = HashMap::new();
        for (segment, actual) in self.segments.iter().zip(path) {
            match segment {
                Segment::Literal(expected) if expected == actual => {}
                Segment::Literal(_) => return None,
                Segment::Wildcard(name) => {
                    captures.insert(name.as_str(), actual.as_str());
                }
            }
        }
        Some(captures)
    }

    /// True if some path could match both patterns
    pub fn overlaps(&self, other: &RoutePattern) -> bool {
        self.segments.len() == other.segments.len()
            && self
                .segments
                .iter()
                .zip(&other.segments)
                .all(|(a, b)| a.overlaps(b))
    }
}

impl fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return write!(f, "/");
        }
        for segment in &self.segments {
            match segment {
                Segment::Literal(s) => write!(f, "/{}", s)?,
                Segment::Wildcard(name) => write!(f, "/{{{}}}", name)?,
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TemplatePart {
    Text(String),
    Placeholder(String),
}

/// Object-key template such as `{patha}/{pathb}/{pathc}` or `index.html`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyTemplate {
    source: String,
    parts: Vec<TemplatePart>,
}

impl KeyTemplate {
    /// Parse a template
    pub fn parse(template: &str) -> Result<Self> {
        if template.is_empty() {
            return Err(GatewayError::InvalidRoute(
                "key template cannot be empty".to_string(),
            ));
        }

        let mut parts = Vec::new();
        let mut rest = template;
        while let Some(open) = rest.find('{') {
            if open > 0 {
                parts.push(TemplatePart::Text(rest[..open].to_string()));
            }
            let after = &rest[open + 1..];
            let close = after.find('}').ok_or_else(|| {
                GatewayError::InvalidRoute(format!("unclosed placeholder in '{}'", template))
            })?;
            let name = &after[..close];
            if !wildcard_name_re().is_match(name) {
                return Err(GatewayError::InvalidRoute(format!(
                    "invalid placeholder '{}' in '{}'",
                    name, template
                )));
            }
            parts.push(TemplatePart::Placeholder(name.to_string()));
            rest = &after[close + 1..];
        }
        if rest.contains('}') {
            return Err(GatewayError::InvalidRoute(format!(
                "stray '}}' in '{}'",
                template
            )));
        }
        if !rest.is_empty() {
            parts.push(TemplatePart::Text(rest.to_string()));
        }

        Ok(KeyTemplate {
            source: template.to_string(),
            parts,
        })
    }

    /// Placeholder names used by this template
    pub fn placeholders(&self) -> Vec<&str> {
        self.parts
            .iter()
            .filter_map(|p| match p {
                TemplatePart::Placeholder(name) => Some(name.as_str()),
                TemplatePart::Text(_) => None,
            })
            .collect()
    }

    /// Substitute captures into the template
    pub fn render(&self, captures: &HashMap<&str, &str>) -> Result<String> {
        let mut key = String::with_capacity(self.source.len());
        for part in &self.parts {
            match part {
                TemplatePart::Text(text) => key.push_str(text),
                TemplatePart::Placeholder(name) => {
                    let value = captures.get(name.as_str()).ok_or_else(|| {
                        GatewayError::InvalidRoute(format!("no capture for '{{{}}}'", name))
                    })?;
                    key.push_str(value);
                }
            }
        }
        Ok(key)
    }

    /// Template text as written
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segs(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_root() {
        assert!(RoutePattern::parse("/").unwrap().segments().is_empty());
        assert!(RoutePattern::parse("").unwrap().segments().is_empty());
    }

    #[test]
    fn test_parse_wildcards_and_literals() {
        let pattern = RoutePattern::parse("/assets/{name}").unwrap();
        assert_eq!(
            pattern.segments(),
            &[
                Segment::Literal("assets".to_string()),
                Segment::Wildcard("name".to_string())
            ]
        );
        assert_eq!(pattern.wildcard_names(), vec!["name"]);
        assert_eq!(pattern.to_string(), "/assets/{name}");
    }

    #[test]
    fn test_parse_rejects_bad_patterns() {
        assert!(RoutePattern::parse("/{}").is_err());
        assert!(RoutePattern::parse("/{1abc}").is_err());
        assert!(RoutePattern::parse("/a//b").is_err());
        assert!(RoutePattern::parse("/{a}/{a}").is_err());
        assert!(RoutePattern::parse("/pre{a}").is_err());
        assert!(RoutePattern::parse("/a/b/c/d/e/f/g/h/i").is_err());
    }

    #[test]
    fn test_match_segments() {
        let pattern = RoutePattern::parse("/{a}/{b}/{c}").unwrap();
        let path = segs(&["x", "y.js", "z"]);
        let captures = pattern.match_segments(&path).unwrap();
        assert_eq!(captures["a"], "x");
        assert_eq!(captures["b"], "y.js");
        assert_eq!(captures["c"], "z");

        assert!(pattern.match_segments(&segs(&["x", "y"])).is_none());

        let literal = RoutePattern::parse("/assets/{name}").unwrap();
        assert!(literal.match_segments(&segs(&["assets", "a.css"])).is_some());
        assert!(literal.match_segments(&segs(&["static", "a.css"])).is_none());
    }

    #[test]
    fn test_overlaps() {
        let one = RoutePattern::parse("/{a}").unwrap();
        let literal = RoutePattern::parse("/robots.txt").unwrap();
        let three = RoutePattern::parse("/{a}/{b}/{c}").unwrap();
        let mixed_a = RoutePattern::parse("/x/{b}").unwrap();
        let mixed_b = RoutePattern::parse("/y/{b}").unwrap();

        assert!(one.overlaps(&literal));
        assert!(!one.overlaps(&three));
        assert!(!mixed_a.overlaps(&mixed_b));
        assert!(mixed_a.overlaps(&RoutePattern::parse("/{a}/z").unwrap()));
    }

    #[test]
    fn test_key_template_render() {
        let template = KeyTemplate::parse("{patha}/{pathb}/{pathc}").unwrap();
        assert_eq!(template.placeholders(), vec!["patha", "pathb", "pathc"]);

        let captures: HashMap<&str, &str> =
            [("patha", "a"), ("pathb", "b"), ("pathc", "c")].into_iter().collect();
        assert_eq!(template.render(&captures).unwrap(), "a/b/c");

        let literal = KeyTemplate::parse("index.html").unwrap();
        assert!(literal.placeholders().is_empty());
        assert_eq!(literal.render(&HashMap::new()).unwrap(), "index.html");

        let prefixed = KeyTemplate::parse("static/{name}.html").unwrap();
        let captures: HashMap<&str, &str> = [("name", "about")].into_iter().collect();
        assert_eq!(prefixed.render(&captures).unwrap(), "static/about.html");
    }

    #[test]
    fn test_key_template_rejects_bad_templates() {
        assert!(KeyTemplate::parse("").is_err());
        assert!(KeyTemplate::parse("{open").is_err());
        assert!(KeyTemplate::parse("close}").is_err());
        assert!(KeyTemplate::parse("{bad-name}").is_err());
    }

    #[test]
    fn test_render_missing_capture() {
        let template = KeyTemplate::parse("{missing}").unwrap();
        assert!(template.render(&HashMap::new()).is_err());
    }
}
