//! Integration tests for the IAM policy engine

use super::*;
use serde_json::json;

const GATEWAY: &str = "AROAGATEWAYROLE";
const ACCOUNT: &str = "123456789012";

#[test]
fn test_policy_json_document_with_evaluation() {
    let policy_json = json!({
        "Version": "2012-10-17",
        "Statement": [
            {
                "Effect": "Allow",
                "Principal": "*",
                "Action": ["execute-api:Invoke"],
                "Resource": ["execute-api:/*/*/*"]
            },
            {
                "Sid": "SourceRanges",
                "Effect": "Deny",
                "Principal": "*",
                "Action": "execute-api:Invoke",
                "Resource": "execute-api:/*/*/*",
                "Condition": {
                    "NotIpAddress": { "aws:SourceIp": ["10.0.0.0/8", "172.16.0.0/12"] }
                }
            }
        ]
    });

    let policy: Policy = serde_json::from_value(policy_json).unwrap();
    let engine = PolicyEngine::new(policy).unwrap();

    let allowed = RequestContext::new(actions::INVOKE, "execute-api:/prod/GET/")
        .with_source_ip("172.16.5.5".parse().unwrap());
    let denied = RequestContext::new(actions::INVOKE, "execute-api:/prod/GET/")
        .with_source_ip("172.32.0.1".parse().unwrap());

    assert_eq!(engine.evaluate(&allowed), Decision::Allow);
    assert_eq!(engine.evaluate(&denied), Decision::ExplicitDeny);
}

#[test]
fn test_preset_policies_match_hand_written_documents() {
    let ranges = vec!["10.0.0.0/8".parse().unwrap()];
    let edge = edge_policy(&ranges);
    let value = serde_json::to_value(&edge).unwrap();

    assert_eq!(value["Statement"][0]["Effect"], "Allow");
    assert_eq!(value["Statement"][1]["Effect"], "Deny");
    assert_eq!(
        value["Statement"][1]["Condition"]["NotIpAddress"]["aws:SourceIp"][0],
        "10.0.0.0/8"
    );

    let storage = storage_policy("site-assets", GATEWAY, ACCOUNT);
    let value = serde_json::to_value(&storage).unwrap();
    assert_eq!(
        value["Statement"][2]["Condition"]["StringNotLike"]["aws:userId"],
        json!([GATEWAY, ACCOUNT])
    );
}

#[test]
fn test_preset_policy_survives_json_roundtrip() {
    let storage = storage_policy("site-assets", GATEWAY, ACCOUNT);
    let reparsed = Policy::from_json(&storage.to_json().unwrap()).unwrap();
    let engine = PolicyEngine::new(reparsed).unwrap();

    let owner = RequestContext::new(actions::GET_OBJECT, "arn:aws:s3:::site-assets/index.html")
        .with_identity(ACCOUNT);
    let stranger =
        RequestContext::new(actions::GET_OBJECT, "arn:aws:s3:::site-assets/index.html")
            .with_identity("AIDASTRANGER");

    assert!(engine.evaluate(&owner).is_allowed());
    assert_eq!(engine.evaluate(&stranger), Decision::ExplicitDeny);
}

#[test]
fn test_storage_layer_ignores_source_ip() {
    let storage = PolicyEngine::new(storage_policy("site-assets", GATEWAY, ACCOUNT)).unwrap();

    for ip in ["10.0.0.1", "203.0.113.50", "::1"] {
        let request = RequestContext::new(actions::GET_OBJECT, "arn:aws:s3:::site-assets/a/b/c")
            .with_identity(GATEWAY)
            .with_source_ip(ip.parse().unwrap());
        assert!(storage.evaluate(&request).is_allowed(), "ip {}", ip);
    }
}

#[test]
fn test_velvet_rope_does_not_cover_other_buckets() {
    let storage = PolicyEngine::new(storage_policy("site-assets", GATEWAY, ACCOUNT)).unwrap();

    // Not named by any statement, so implicit rather than explicit deny
    let request = RequestContext::new(actions::GET_OBJECT, "arn:aws:s3:::other-bucket/x")
        .with_identity("AIDASTRANGER");
    assert_eq!(storage.evaluate(&request), Decision::ImplicitDeny);
}

#[test]
fn test_gateway_cannot_write() {
    let storage = PolicyEngine::new(storage_policy("site-assets", GATEWAY, ACCOUNT)).unwrap();

    let put = RequestContext::new("s3:PutObject", "arn:aws:s3:::site-assets/index.html")
        .with_identity(GATEWAY);
    assert_eq!(storage.evaluate(&put), Decision::ImplicitDeny);

    let owner_put = RequestContext::new("s3:PutObject", "arn:aws:s3:::site-assets/index.html")
        .with_identity(ACCOUNT);
    assert!(storage.evaluate(&owner_put).is_allowed());
}
