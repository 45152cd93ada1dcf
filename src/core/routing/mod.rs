//! Request routing: path boundary, route patterns and the resolver

mod path;
mod pattern;
mod resolver;

pub use path::{RequestPath, MAX_PATH_SEGMENTS};
pub use pattern::{KeyTemplate, RoutePattern, Segment, MAX_PATTERN_SEGMENTS};
pub use resolver::{ResolvedTarget, Route, RouteTable, DEFAULT_INDEX_DOCUMENT};
