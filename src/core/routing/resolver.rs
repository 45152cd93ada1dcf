//! Route table and resolver
//!
//! Maps decoded path segments to the object key that backs them. Routes in
//! a table never overlap, so resolution does not depend on route order and
//! a path no route covers fails closed instead of falling back.

use super::pattern::{KeyTemplate, RoutePattern};
use crate::error::{GatewayError, Result};
use tracing::debug;

/// Default document served for the site root
pub const DEFAULT_INDEX_DOCUMENT: &str = "index.html";

/// A single route: pattern plus the object key it maps to
#[derive(Debug, Clone)]
pub struct Route {
    pattern: RoutePattern,
    target: KeyTemplate,
}

impl Route {
    /// Build a route, checking every placeholder is captured by the pattern
    pub fn new(pattern: &str, target: &str) -> Result<Self> {
        let pattern = RoutePattern::parse(pattern)?;
        let target = KeyTemplate::parse(target)?;

        let names = pattern.wildcard_names();
        for placeholder in target.placeholders() {
            if !names.contains(&placeholder) {
                return Err(GatewayError::InvalidRoute(format!(
                    "template '{}' uses '{{{}}}' which '{}' does not capture",
                    target.as_str(),
                    placeholder,
                    pattern
                )));
            }
        }

        Ok(Route { pattern, target })
    }

    /// The route's path pattern
    pub fn pattern(&self) -> &RoutePattern {
        &self.pattern
    }

    /// The route's object-key template
    pub fn target(&self) -> &KeyTemplate {
        &self.target
    }
}

/// Object key chosen for a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    /// Object key to fetch from the bucket
    pub key: String,
    /// Pattern of the route that matched, e.g. `/{patha}`
    pub route: String,
}

/// Immutable set of non-overlapping routes
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    /// Build a table, rejecting routes that could match the same path
    pub fn new(routes: Vec<Route>) -> Result<Self> {
        for (i, a) in routes.iter().enumerate() {
            for b in &routes[i + 1..] {
                if a.pattern.overlaps(&b.pattern) {
                    return Err(GatewayError::InvalidRoute(format!(
                        "routes '{}' and '{}' overlap",
                        a.pattern, b.pattern
                    )));
                }
            }
        }
        Ok(RouteTable { routes })
    }

    /// The single-page-app table
    ///
    /// - `/` serves the index document
    /// - `/{patha}` serves the object of the same name
    /// - `/{patha}/{pathb}/{pathc}` mirrors the three-level path into the bucket
    ///
    /// Two-segment paths match nothing. That gap is kept on purpose until the
    /// deployed gateway gains a matching resource; adding a route here alone
    /// would make this table disagree with what is provisioned.
    pub fn single_page_app(index_document: &str) -> Result<Self> {
        RouteTable::new(vec![
            Route::new("/", index_document)?,
            Route::new("/{patha}", "{patha}")?,
            Route::new("/{patha}/{pathb}/{pathc}", "{patha}/{pathb}/{pathc}")?,
        ])
    }

    /// Routes in declaration order
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Resolve decoded path segments to an object key
    ///
    /// # Examples
    ///
    /// ```
    /// use spa_gateway::routing::RouteTable;
    ///
    /// let table = RouteTable::single_page_app("index.html").unwrap();
    /// assert_eq!(table.resolve(&[]).unwrap().key, "index.html");
    /// assert_eq!(table.resolve(&["app.js".to_string()]).unwrap().key, "app.js");
    /// assert!(table.resolve(&["a".to_string(), "b".to_string()]).is_err());
    /// ```
    pub fn resolve(&self, segments: &[String]) -> Result<ResolvedTarget> {
        for route in &self.routes {
            if let Some(captures) = route.pattern.match_segments(segments) {
                let key = route.target.render(&captures)?;
                debug!(route = %route.pattern, key = %key, "route resolved");
                return Ok(ResolvedTarget {
                    key,
                    route: route.pattern.to_string(),
                });
            }
        }

        debug!(depth = segments.len(), "no route matched");
        Err(GatewayError::NoRouteMatch(format!(
            "/{}",
            segments.join("/")
        )))
    }
}
