//! Identity and Access Management (IAM) for the gateway and its bucket
//!
//! Provides access control with:
//! - JSON policy documents in the IAM format
//! - Allow/Deny statements with explicit deny precedence and default deny
//! - Wildcard matching for principals, actions and resources
//! - Condition evaluation (String and IP range operations)
//! - The edge (network) and storage (identity) policy layers

mod condition;
mod engine;
mod pattern;
mod policy;
mod presets;

pub use condition::{
    keys, parse_network, Condition, ConditionBlock, ConditionOperator, ConditionValues,
};
pub use engine::{evaluate, Decision, PolicyEngine, RequestContext};
pub use pattern::PatternMatcher;
pub use policy::{actions, Effect, Policy, Statement};
pub use presets::{
    bucket_arn, edge_policy, invoke_resource, object_arn, storage_policy, EdgeEvaluator,
    StorageEvaluator, INVOKE_RESOURCE_PATTERN,
};

#[cfg(test)]
mod tests;
