//! Policy evaluation engine with deny precedence
//!
//! Evaluates IAM policies to determine if a request is allowed.
//! Key features:
//! - Explicit deny takes precedence over allow
//! - No matching statement means deny
//! - Statement order never changes the outcome
//! - Conditions are compiled once, when the engine is built

use super::condition::{keys, Condition};
use super::policy::{Effect, Policy};
use crate::error::Result;
use std::net::IpAddr;
use tracing::debug;

/// Attributes of one request, as seen by a policy evaluator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// Network origin of the caller, if known
    pub source_ip: Option<IpAddr>,
    /// Unique id of the calling identity; `None` for anonymous callers
    pub identity: Option<String>,
    /// Action being performed, e.g. `s3:GetObject`
    pub action: String,
    /// Resource being accessed, e.g. `arn:aws:s3:::site/index.html`
    pub resource: String,
}

impl RequestContext {
    /// Create an anonymous request of unknown origin
    pub fn new(action: &str, resource: &str) -> Self {
        RequestContext {
            source_ip: None,
            identity: None,
            action: action.to_string(),
            resource: resource.to_string(),
        }
    }

    /// Set the source address
    pub fn with_source_ip(mut self, ip: IpAddr) -> Self {
        self.source_ip = Some(ip);
        self
    }

    /// Set the caller identity
    pub fn with_identity(mut self, identity: &str) -> Self {
        self.identity = Some(identity.to_string());
        self
    }

    /// Look up a context key as a string. Keys are case-insensitive.
    pub fn string_value(&self, key: &str) -> Option<String> {
        if key.eq_ignore_ascii_case(keys::SOURCE_IP) {
            self.source_ip.map(|ip| ip.to_string())
        } else if key.eq_ignore_ascii_case(keys::USER_ID) {
            self.identity.clone()
        } else {
            None
        }
    }

    /// Look up a context key as an address
    pub fn ip_value(&self, key: &str) -> Option<IpAddr> {
        if key.eq_ignore_ascii_case(keys::SOURCE_IP) {
            self.source_ip
        } else {
            self.string_value(key).and_then(|v| v.parse().ok())
        }
    }
}

/// Outcome of a policy evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// At least one Allow matched and no Deny matched
    Allow,
    /// A Deny statement matched
    ExplicitDeny,
    /// Nothing matched
    ImplicitDeny,
}

impl Decision {
    /// True only for [`Decision::Allow`]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

#[derive(Debug)]
struct CompiledStatement {
    index: usize,
    conditions: Vec<Condition>,
}

/// Policy evaluation engine
///
/// Immutable once built, so a single engine can be shared across threads
/// and evaluated concurrently without locking.
#[derive(Debug)]
pub struct PolicyEngine {
    policy: Policy,
    compiled: Vec<CompiledStatement>,
}

impl PolicyEngine {
    /// Validate a policy and compile its conditions
    ///
    /// # Examples
    ///
    /// ```
    /// use spa_gateway::iam::{Effect, Policy, PolicyEngine, RequestContext, Statement};
    ///
    /// let mut policy = Policy::new();
    /// policy.add_statement(Statement::new(
    ///     Effect::Allow,
    ///     &["*"],
    ///     &["s3:GetObject"],
    ///     &["arn:aws:s3:::site/*"],
    /// ));
    /// let engine = PolicyEngine::new(policy).unwrap();
    ///
    /// let read = RequestContext::new("s3:GetObject", "arn:aws:s3:::site/index.html");
    /// assert!(engine.evaluate(&read).is_allowed());
    ///
    /// let write = RequestContext::new("s3:PutObject", "arn:aws:s3:::site/index.html");
    /// assert!(!engine.evaluate(&write).is_allowed());
    /// ```
    pub fn new(policy: Policy) -> Result<Self> {
        policy.validate()?;

        let compiled = policy
            .statement
            .iter()
            .enumerate()
            .map(|(index, stmt)| {
                let conditions = match &stmt.condition {
                    Some(block) => Condition::compile_block(block)?,
                    None => Vec::new(),
                };
                Ok(CompiledStatement { index, conditions })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(PolicyEngine { policy, compiled })
    }

    /// The policy this engine evaluates
    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Evaluate a request against every statement
    pub fn evaluate(&self, request: &RequestContext) -> Decision {
        let mut has_allow = false;
        let mut deny_sid: Option<&str> = None;
        let mut has_deny = false;

        for compiled in &self.compiled {
            let statement = &self.policy.statement[compiled.index];

            if !statement.applies_to(
                request.identity.as_deref(),
                &request.action,
                &request.resource,
            ) {
                continue;
            }

            if !compiled.conditions.iter().all(|c| c.evaluate(request)) {
                continue;
            }

            match statement.effect {
                Effect::Deny => {
                    has_deny = true;
                    deny_sid = deny_sid.or(statement.sid.as_deref());
                }
                Effect::Allow => has_allow = true,
            }
        }

        let decision = if has_deny {
            Decision::ExplicitDeny
        } else if has_allow {
            Decision::Allow
        } else {
            Decision::ImplicitDeny
        };

        debug!(
            action = %request.action,
            resource = %request.resource,
            identity = ?request.identity,
            source_ip = ?request.source_ip,
            deny_sid = ?deny_sid,
            ?decision,
            "policy evaluated"
        );

        decision
    }
}

/// One-shot evaluation of a policy against a request
pub fn evaluate(policy: &Policy, request: &RequestContext) -> Result<Decision> {
    Ok(PolicyEngine::new(policy.clone())?.evaluate(request))
}
