//! Condition evaluation for IAM policies
//!
//! Conditions restrict when a statement applies, based on request context:
//! - String operations (Equals, NotEquals, Like, NotLike)
//! - Network operations (IpAddress, NotIpAddress) over CIDR ranges
//!
//! Policy documents carry conditions in the IAM block form
//! `{ "NotIpAddress": { "aws:SourceIp": ["10.0.0.0/8"] } }`. Blocks are
//! compiled once into [`Condition`] values so CIDRs are parsed at startup,
//! not per request.

use super::engine::RequestContext;
use super::pattern::PatternMatcher;
use crate::error::{GatewayError, Result};
use ipnet::IpNet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::IpAddr;

/// Well-known request context keys
pub mod keys {
    /// Source address of the caller
    pub const SOURCE_IP: &str = "aws:SourceIp";
    /// Unique id of the calling identity
    pub const USER_ID: &str = "aws:userId";
}

/// Condition operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ConditionOperator {
    /// String equals (case-sensitive)
    StringEquals,
    /// String differs from every value
    StringNotEquals,
    /// String matches a pattern (supports `*` and `?`)
    StringLike,
    /// String matches none of the patterns
    StringNotLike,
    /// Address falls inside one of the ranges
    IpAddress,
    /// Address falls inside none of the ranges
    NotIpAddress,
}

impl ConditionOperator {
    /// Negated operators succeed when the context key is absent
    pub fn is_negated(&self) -> bool {
        matches!(
            self,
            ConditionOperator::StringNotEquals
                | ConditionOperator::StringNotLike
                | ConditionOperator::NotIpAddress
        )
    }

    fn is_network(&self) -> bool {
        matches!(
            self,
            ConditionOperator::IpAddress | ConditionOperator::NotIpAddress
        )
    }
}

/// Values listed under one condition key: a single string or a list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionValues {
    One(String),
    Many(Vec<String>),
}

impl ConditionValues {
    /// View the values as a slice regardless of form
    pub fn as_slice(&self) -> &[String] {
        match self {
            ConditionValues::One(v) => std::slice::from_ref(v),
            ConditionValues::Many(v) => v,
        }
    }
}

impl From<Vec<String>> for ConditionValues {
    fn from(values: Vec<String>) -> Self {
        ConditionValues::Many(values)
    }
}

/// Condition block as it appears in a policy statement
pub type ConditionBlock = BTreeMap<ConditionOperator, BTreeMap<String, ConditionValues>>;

#[derive(Debug, Clone)]
enum Operand {
    Strings(Vec<String>),
    Networks(Vec<IpNet>),
}

/// A single compiled condition: one operator applied to one context key
#[derive(Debug, Clone)]
pub struct Condition {
    pub operator: ConditionOperator,
    pub key: String,
    operand: Operand,
}

impl Condition {
    /// Compile a condition, parsing network ranges up front
    pub fn compile(operator: ConditionOperator, key: &str, values: &[String]) -> Result<Self> {
        if values.is_empty() {
            return Err(GatewayError::InvalidPolicy(format!(
                "condition {:?} on {} has no values",
                operator, key
            )));
        }

        let operand = if operator.is_network() {
            let nets = values
                .iter()
                .map(|v| parse_network(v))
                .collect::<Result<Vec<_>>>()?;
            Operand::Networks(nets)
        } else {
            Operand::Strings(values.to_vec())
        };

        Ok(Condition {
            operator,
            key: key.to_string(),
            operand,
        })
    }

    /// Compile every operator/key pair of a block
    pub fn compile_block(block: &ConditionBlock) -> Result<Vec<Condition>> {
        let mut conditions = Vec::new();
        for (operator, entries) in block {
            for (key, values) in entries {
                conditions.push(Condition::compile(*operator, key, values.as_slice())?);
            }
        }
        Ok(conditions)
    }

    /// Evaluate this condition against a request
    pub fn evaluate(&self, request: &RequestContext) -> bool {
        match &self.operand {
            Operand::Networks(nets) => {
                let Some(ip) = request.ip_value(&self.key) else {
                    return self.operator.is_negated();
                };
                let ip = ip.to_canonical();
                let inside = nets.iter().any(|net| net.contains(&ip));
                match self.operator {
                    ConditionOperator::IpAddress => inside,
                    _ => !inside,
                }
            }
            Operand::Strings(values) => {
                let Some(actual) = request.string_value(&self.key) else {
                    return self.operator.is_negated();
                };
                match self.operator {
                    ConditionOperator::StringEquals => values.iter().any(|v| *v == actual),
                    ConditionOperator::StringNotEquals => values.iter().all(|v| *v != actual),
                    ConditionOperator::StringLike => values
                        .iter()
                        .any(|v| PatternMatcher::matches(v, &actual)),
                    ConditionOperator::StringNotLike => values
                        .iter()
                        .all(|v| !PatternMatcher::matches(v, &actual)),
                    // Network operators always carry a network operand
                    ConditionOperator::IpAddress | ConditionOperator::NotIpAddress => false,
                }
            }
        }
    }
}

/// Parse a CIDR range, accepting a bare address as a host route
pub fn parse_network(value: &str) -> Result<IpNet> {
    let value = value.trim();
    value
        .parse::<IpNet>()
        .or_else(|_| value.parse::<IpAddr>().map(IpNet::from))
        .map_err(|_| GatewayError::InvalidPolicy(format!("invalid IP range: {}", value)))
}
