//! The two policy layers of the site
//!
//! - Edge: anyone may invoke the gateway, except callers outside the
//!   configured source ranges.
//! - Storage: the bucket is readable by the gateway's execution identity
//!   and the account owner only (the "velvet rope"), so end users can never
//!   bypass the gateway and read the bucket directly.

use super::condition::{keys, ConditionOperator};
use super::engine::{Decision, PolicyEngine, RequestContext};
use super::policy::{actions, Effect, Policy, Statement};
use crate::error::{GatewayError, PolicyLayer, Result};
use ipnet::IpNet;
use std::net::IpAddr;
use tracing::info;

/// Resource pattern covering every stage, method and path of the gateway
pub const INVOKE_RESOURCE_PATTERN: &str = "execute-api:/*/*/*";

/// ARN of a bucket
pub fn bucket_arn(bucket: &str) -> String {
    format!("arn:aws:s3:::{}", bucket)
}

/// ARN of an object in a bucket
pub fn object_arn(bucket: &str, key: &str) -> String {
    format!("arn:aws:s3:::{}/{}", bucket, key)
}

/// Invoke resource for a request: `execute-api:/{stage}/{METHOD}{path}`
pub fn invoke_resource(stage: &str, method: &str, path: &str) -> String {
    let path = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    };
    format!("execute-api:/{}/{}{}", stage, method, path)
}

/// Gateway resource policy: allow invoke, deny invoke from outside `ip_ranges`
pub fn edge_policy(ip_ranges: &[IpNet]) -> Policy {
    let ranges: Vec<String> = ip_ranges.iter().map(|n| n.to_string()).collect();
    let ranges: Vec<&str> = ranges.iter().map(String::as_str).collect();

    let mut policy = Policy::new();
    policy.add_statement(
        Statement::new(
            Effect::Allow,
            &["*"],
            &[actions::INVOKE],
            &[INVOKE_RESOURCE_PATTERN],
        )
        .with_sid("AllowInvoke"),
    );
    policy.add_statement(
        Statement::new(
            Effect::Deny,
            &["*"],
            &[actions::INVOKE],
            &[INVOKE_RESOURCE_PATTERN],
        )
        .with_sid("DenyOutsideSourceRanges")
        .with_condition(ConditionOperator::NotIpAddress, keys::SOURCE_IP, &ranges),
    );
    policy
}

/// Bucket resource policy: read grant for the gateway, owner access, velvet rope
pub fn storage_policy(bucket: &str, gateway_identity: &str, account_id: &str) -> Policy {
    let bucket_resource = bucket_arn(bucket);
    let objects_resource = object_arn(bucket, "*");
    let resources = [bucket_resource.as_str(), objects_resource.as_str()];

    let mut policy = Policy::new();
    policy.add_statement(
        Statement::new(
            Effect::Allow,
            &[gateway_identity],
            &["s3:GetObject*", "s3:GetBucket*", "s3:List*"],
            &resources,
        )
        .with_sid("GatewayRead"),
    );
    policy.add_statement(
        Statement::new(Effect::Allow, &[account_id], &["s3:*"], &resources).with_sid("AccountOwner"),
    );
    policy.add_statement(
        Statement::new(
            Effect::Deny,
            &["*"],
            &["s3:List*", actions::GET_OBJECT],
            &resources,
        )
        .with_sid("VelvetRope")
        .with_condition(
            ConditionOperator::StringNotLike,
            keys::USER_ID,
            &[gateway_identity, account_id],
        ),
    );
    policy
}

/// Network policy check at the public gateway
#[derive(Debug)]
pub struct EdgeEvaluator {
    engine: PolicyEngine,
    stage: String,
}

impl EdgeEvaluator {
    /// Build from the allowed source ranges
    pub fn new(stage: &str, ip_ranges: &[IpNet]) -> Result<Self> {
        let engine = PolicyEngine::new(edge_policy(ip_ranges))?;
        info!(stage, ranges = ip_ranges.len(), "edge policy compiled");
        Ok(EdgeEvaluator {
            engine,
            stage: stage.to_string(),
        })
    }

    /// The compiled policy document
    pub fn policy(&self) -> &Policy {
        self.engine.policy()
    }

    /// Decide whether a caller may invoke `method` on `path`
    pub fn evaluate(
        &self,
        source_ip: Option<IpAddr>,
        identity: Option<&str>,
        method: &str,
        path: &str,
    ) -> Decision {
        let mut request = RequestContext::new(
            actions::INVOKE,
            &invoke_resource(&self.stage, method, path),
        );
        request.source_ip = source_ip;
        request.identity = identity.map(str::to_string);
        self.engine.evaluate(&request)
    }

    /// Like [`EdgeEvaluator::evaluate`], mapping a deny to `AccessDenied`
    pub fn authorize(
        &self,
        source_ip: Option<IpAddr>,
        identity: Option<&str>,
        method: &str,
        path: &str,
    ) -> Result<()> {
        if self.evaluate(source_ip, identity, method, path).is_allowed() {
            Ok(())
        } else {
            Err(GatewayError::AccessDenied {
                layer: PolicyLayer::Edge,
                resource: invoke_resource(&self.stage, method, path),
            })
        }
    }
}

/// Identity policy check at the bucket
#[derive(Debug)]
pub struct StorageEvaluator {
    engine: PolicyEngine,
    bucket: String,
}

impl StorageEvaluator {
    /// Build the velvet rope for `bucket`
    pub fn new(bucket: &str, gateway_identity: &str, account_id: &str) -> Result<Self> {
        for identity in [gateway_identity, account_id] {
            if identity.is_empty() || identity.contains(['*', '?']) {
                return Err(GatewayError::InvalidPolicy(format!(
                    "identity must be a literal id: {:?}",
                    identity
                )));
            }
        }
        let engine = PolicyEngine::new(storage_policy(bucket, gateway_identity, account_id))?;
        info!(bucket, gateway_identity, "storage policy compiled");
        Ok(StorageEvaluator {
            engine,
            bucket: bucket.to_string(),
        })
    }

    /// The compiled policy document
    pub fn policy(&self) -> &Policy {
        self.engine.policy()
    }

    /// Bucket this evaluator guards
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Decide whether `identity` may read object `key`
    pub fn evaluate_read(&self, identity: Option<&str>, key: &str) -> Decision {
        self.evaluate(identity, actions::GET_OBJECT, &object_arn(&self.bucket, key))
    }

    /// Decide whether `identity` may list the bucket
    pub fn evaluate_list(&self, identity: Option<&str>) -> Decision {
        self.evaluate(identity, actions::LIST_BUCKET, &bucket_arn(&self.bucket))
    }

    fn evaluate(&self, identity: Option<&str>, action: &str, resource: &str) -> Decision {
        let mut request = RequestContext::new(action, resource);
        request.identity = identity.map(str::to_string);
        self.engine.evaluate(&request)
    }
}
