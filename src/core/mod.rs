//! Routing and policy core
//!
//! Everything here is pure and request-scoped: tables and policies are built
//! once, then evaluated per request without shared mutable state.

pub mod iam;
pub mod routing;
pub mod translate;
