//! IAM Policy document structure
//!
//! Policies define which callers may perform which actions on which
//! resources. The JSON form follows IAM policy documents, so the same
//! document can be handed to the provisioning layer unchanged.

use super::condition::{ConditionBlock, ConditionOperator, ConditionValues};
use super::pattern::PatternMatcher;
use crate::error::{GatewayError, Result};
use serde::{Deserialize, Deserializer, Serialize};

/// Action names used by the gateway and the bucket
pub mod actions {
    /// Invoke a gateway method
    pub const INVOKE: &str = "execute-api:Invoke";
    /// Read an object body
    pub const GET_OBJECT: &str = "s3:GetObject";
    /// List bucket contents
    pub const LIST_BUCKET: &str = "s3:ListBucket";
}

/// Effect of a policy statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    /// Allow the action
    Allow,
    /// Deny the action (takes precedence over Allow)
    Deny,
}

/// A single policy statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Statement {
    /// Statement ID (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,

    /// Effect of this statement
    pub effect: Effect,

    /// Callers this statement applies to (`*` is everyone, anonymous included)
    #[serde(deserialize_with = "one_or_many")]
    pub principal: Vec<String>,

    /// Actions this statement applies to (case-insensitive wildcards)
    #[serde(deserialize_with = "one_or_many")]
    pub action: Vec<String>,

    /// Resources this statement applies to (supports wildcards)
    #[serde(deserialize_with = "one_or_many")]
    pub resource: Vec<String>,

    /// Optional conditions for when this statement applies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<ConditionBlock>,
}

fn one_or_many<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(ConditionValues::deserialize(deserializer)?.as_slice().to_vec())
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Statement {
    /// Create a new statement
    pub fn new(effect: Effect, principal: &[&str], action: &[&str], resource: &[&str]) -> Self {
        Statement {
            sid: None,
            effect,
            principal: owned(principal),
            action: owned(action),
            resource: owned(resource),
            condition: None,
        }
    }

    /// Set the statement ID
    pub fn with_sid(mut self, sid: &str) -> Self {
        self.sid = Some(sid.to_string());
        self
    }

    /// Add a condition on `key`; repeated calls are ANDed
    pub fn with_condition(mut self, operator: ConditionOperator, key: &str, values: &[&str]) -> Self {
        self.condition
            .get_or_insert_with(ConditionBlock::new)
            .entry(operator)
            .or_default()
            .insert(key.to_string(), ConditionValues::Many(owned(values)));
        self
    }

    /// Check principal, action and resource. Conditions are checked by the engine.
    pub fn applies_to(&self, identity: Option<&str>, action: &str, resource: &str) -> bool {
        let principal_matches = self.principal.iter().any(|p| {
            p == "*" || identity.is_some_and(|id| PatternMatcher::matches(p, id))
        });
        if !principal_matches {
            return false;
        }

        let action_matches = self
            .action
            .iter()
            .any(|a| PatternMatcher::matches_ignore_case(a, action));
        if !action_matches {
            return false;
        }

        self.resource
            .iter()
            .any(|pattern| PatternMatcher::matches(pattern, resource))
    }
}

/// Complete IAM policy document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Policy {
    /// Policy format version
    pub version: String,

    /// List of policy statements
    pub statement: Vec<Statement>,
}

impl Policy {
    /// Create a new empty policy
    pub fn new() -> Self {
        Policy {
            version: "2012-10-17".to_string(),
            statement: Vec::new(),
        }
    }

    /// Add a statement to this policy
    pub fn add_statement(&mut self, statement: Statement) {
        self.statement.push(statement);
    }

    /// Parse policy from JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize policy to JSON string
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Validate policy structure
    pub fn validate(&self) -> Result<()> {
        if self.statement.is_empty() {
            return Err(GatewayError::InvalidPolicy(
                "policy must have at least one statement".to_string(),
            ));
        }

        for (i, stmt) in self.statement.iter().enumerate() {
            let label = stmt.sid.clone().unwrap_or_else(|| i.to_string());
            if stmt.principal.is_empty() {
                return Err(GatewayError::InvalidPolicy(format!(
                    "statement {} has no principals",
                    label
                )));
            }
            if stmt.action.is_empty() {
                return Err(GatewayError::InvalidPolicy(format!(
                    "statement {} has no actions",
                    label
                )));
            }
            if stmt.resource.is_empty() {
                return Err(GatewayError::InvalidPolicy(format!(
                    "statement {} has no resources",
                    label
                )));
            }
        }

        Ok(())
    }
}

impl Default for Policy {
    fn default() -> Self {
        Self::new()
    }
}
