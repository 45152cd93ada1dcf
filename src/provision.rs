//! Deployment plan
//!
//! Describes the infrastructure that fronts the site: the encrypted bucket
//! and its velvet-rope policy, a regional REST API with one GET method per
//! route, the TLS certificate, the custom domain and its DNS record. The
//! plan is derived from the same route table, policies and translator the
//! gateway serves with, so what is provisioned and what is served cannot
//! drift apart.

use crate::config::SiteConfig;
use crate::core::iam::{bucket_arn, edge_policy, object_arn, storage_policy, Policy};
use crate::core::routing::{Route, RouteTable};
use crate::core::translate::ResponseTranslator;
use crate::error::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

/// Service principal the gateway's execution role trusts
pub const GATEWAY_SERVICE_PRINCIPAL: &str = "apigateway.amazonaws.com";

/// Actions granted to the execution role on the bucket
pub const READ_ACTIONS: &[&str] = &["s3:GetObject*", "s3:GetBucket*", "s3:List*"];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketPlan {
    pub name: String,
    pub encryption: String,
    pub resource_policy: Policy,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRolePlan {
    pub role_id: String,
    pub assumed_by: String,
    pub actions: Vec<String>,
    pub resources: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationResponsePlan {
    pub selection_pattern: String,
    pub status_code: u16,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub response_parameters: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodResponsePlan {
    pub status_code: u16,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub response_parameters: BTreeMap<String, bool>,
}

/// One GET method backed by a bucket read
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodPlan {
    pub resource_path: String,
    pub http_method: String,
    pub integration_http_method: String,
    /// `{bucket}/{key template}`
    pub integration_path: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub request_parameters: BTreeMap<String, bool>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub integration_request_parameters: BTreeMap<String, String>,
    pub integration_responses: Vec<IntegrationResponsePlan>,
    pub method_responses: Vec<MethodResponsePlan>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiPlan {
    pub endpoint_type: String,
    pub stage: String,
    pub policy: Policy,
    pub methods: Vec<MethodPlan>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificatePlan {
    pub domain_name: String,
    pub validation: String,
    /// Zone used for DNS validation records; absent means manual validation
    pub hosted_zone_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainPlan {
    pub domain_name: String,
    pub security_policy: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DnsRecordPlan {
    pub hosted_zone_id: String,
    pub zone_name: String,
    pub record_type: String,
    pub record_name: String,
    /// Target is the custom domain's regional alias, known only once created
    pub target: String,
}

/// Everything needed to stand up the site
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentPlan {
    pub bucket: BucketPlan,
    pub execution_role: ExecutionRolePlan,
    pub api: ApiPlan,
    pub certificate: CertificatePlan,
    pub domain: DomainPlan,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_record: Option<DnsRecordPlan>,
}

impl DeploymentPlan {
    /// Derive the plan for a site
    pub fn build(config: &SiteConfig) -> Result<Self> {
        config.check()?;

        let routes = RouteTable::single_page_app(&config.index_document)?;
        let translator = ResponseTranslator::single_page_app()?;
        let fqdn = config.fqdn();

        let methods = routes
            .routes()
            .iter()
            .map(|route| method_plan(&config.bucket_name, route, &translator))
            .collect();

        let dns_record = config.hosted_zone().map(|zone| DnsRecordPlan {
            hosted_zone_id: zone.to_string(),
            zone_name: config.domain_name.clone(),
            record_type: "CNAME".to_string(),
            record_name: config.subdomain.clone(),
            target: format!("regional-alias-of:{}", fqdn),
        });

        let plan = DeploymentPlan {
            bucket: BucketPlan {
                name: config.bucket_name.clone(),
                encryption: "S3_MANAGED".to_string(),
                resource_policy: storage_policy(
                    &config.bucket_name,
                    &config.gateway_identity,
                    &config.account_id,
                ),
            },
            execution_role: ExecutionRolePlan {
                role_id: config.gateway_identity.clone(),
                assumed_by: GATEWAY_SERVICE_PRINCIPAL.to_string(),
                actions: READ_ACTIONS.iter().map(|a| a.to_string()).collect(),
                resources: vec![
                    bucket_arn(&config.bucket_name),
                    object_arn(&config.bucket_name, "*"),
                ],
            },
            api: ApiPlan {
                endpoint_type: "REGIONAL".to_string(),
                stage: config.stage.clone(),
                policy: edge_policy(&config.ip_ranges()?),
                methods,
            },
            certificate: CertificatePlan {
                domain_name: fqdn.clone(),
                validation: "DNS".to_string(),
                hosted_zone_id: config.hosted_zone().map(str::to_string),
            },
            domain: DomainPlan {
                domain_name: fqdn.clone(),
                security_policy: "TLS_1_2".to_string(),
            },
            dns_record,
        };

        info!(
            fqdn = %fqdn,
            methods = plan.api.methods.len(),
            dns_record = plan.dns_record.is_some(),
            "deployment plan built"
        );
        Ok(plan)
    }

    /// Pretty JSON rendering of the plan
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn method_plan(bucket: &str, route: &Route, translator: &ResponseTranslator) -> MethodPlan {
    let names = route.pattern().wildcard_names();

    let request_parameters = names
        .iter()
        .map(|n| (format!("method.request.path.{}", n), true))
        .collect();
    let integration_request_parameters = names
        .iter()
        .map(|n| {
            (
                format!("integration.request.path.{}", n),
                format!("method.request.path.{}", n),
            )
        })
        .collect();

    let mut method_responses: BTreeMap<u16, BTreeMap<String, bool>> = BTreeMap::new();
    let integration_responses = translator
        .responses()
        .iter()
        .map(|row| {
            let response_parameters: BTreeMap<String, String> = row
                .forward_headers()
                .iter()
                .map(|h| {
                    let header = canonical_header(h.as_str());
                    (
                        format!("method.response.header.{}", header),
                        format!("integration.response.header.{}", header),
                    )
                })
                .collect();

            let declared = method_responses.entry(row.status().as_u16()).or_default();
            for name in response_parameters.keys() {
                declared.insert(name.clone(), true);
            }

            IntegrationResponsePlan {
                selection_pattern: row.selection_pattern().to_string(),
                status_code: row.status().as_u16(),
                response_parameters,
            }
        })
        .collect();

    MethodPlan {
        resource_path: route.pattern().to_string(),
        http_method: "GET".to_string(),
        integration_http_method: "GET".to_string(),
        integration_path: format!("{}/{}", bucket, route.target().as_str()),
        request_parameters,
        integration_request_parameters,
        integration_responses,
        method_responses: method_responses
            .into_iter()
            .map(|(status_code, response_parameters)| MethodResponsePlan {
                status_code,
                response_parameters,
            })
            .collect(),
    }
}

/// `content-type` → `Content-Type`
fn canonical_header(name: &str) -> String {
    name.split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(hosted_zone: Option<&str>) -> SiteConfig {
        let zone = hosted_zone
            .map(|z| format!("hostedZoneId = \"{}\"\n", z))
            .unwrap_or_default();
        SiteConfig::from_toml_str(&format!(
            r#"
            domainName = "example.com"
            subdomain = "app"
            {}
            awsIpRanges = ["10.0.0.0/8", "192.0.2.0/24"]
            bucketName = "app-example-assets"
            accountId = "123456789012"
            gatewayIdentity = "AROAGATEWAYROLE"
            "#,
            zone
        ))
        .unwrap()
    }

    #[test]
    fn test_methods_follow_route_table() {
        let plan = DeploymentPlan::build(&config(Some("Z123"))).unwrap();
        let methods = &plan.api.methods;
        assert_eq!(methods.len(), 3);

        assert_eq!(methods[0].resource_path, "/");
        assert_eq!(methods[0].integration_path, "app-example-assets/index.html");
        assert!(methods[0].request_parameters.is_empty());

        assert_eq!(methods[1].resource_path, "/{patha}");
        assert_eq!(methods[1].integration_path, "app-example-assets/{patha}");
        assert_eq!(
            methods[1].integration_request_parameters["integration.request.path.patha"],
            "method.request.path.patha"
        );

        assert_eq!(methods[2].resource_path, "/{patha}/{pathb}/{pathc}");
        assert_eq!(methods[2].request_parameters.len(), 3);
        assert!(methods.iter().all(|m| m.resource_path.matches('/').count() != 2));
    }

    #[test]
    fn test_responses_follow_translator() {
        let plan = DeploymentPlan::build(&config(None)).unwrap();
        let method = &plan.api.methods[1];

        assert_eq!(method.integration_responses.len(), 2);
        assert_eq!(method.integration_responses[0].selection_pattern, r"2\d{2}");
        assert_eq!(method.integration_responses[0].status_code, 200);
        assert_eq!(
            method.integration_responses[0].response_parameters["method.response.header.Content-Type"],
            "integration.response.header.Content-Type"
        );
        assert_eq!(method.integration_responses[1].status_code, 404);

        let statuses: Vec<u16> = method.method_responses.iter().map(|m| m.status_code).collect();
        assert_eq!(statuses, vec![200, 404]);
        assert!(method.method_responses[0].response_parameters["method.response.header.Content-Type"]);
    }

    #[test]
    fn test_dns_binding_with_zone() {
        let plan = DeploymentPlan::build(&config(Some("Z123"))).unwrap();
        assert_eq!(plan.certificate.domain_name, "app.example.com");
        assert_eq!(plan.certificate.hosted_zone_id.as_deref(), Some("Z123"));

        let record = plan.dns_record.unwrap();
        assert_eq!(record.record_type, "CNAME");
        assert_eq!(record.record_name, "app");
        assert_eq!(record.zone_name, "example.com");
    }

    #[test]
    fn test_no_dns_binding_without_zone() {
        let plan = DeploymentPlan::build(&config(None)).unwrap();
        assert!(plan.certificate.hosted_zone_id.is_none());
        assert!(plan.dns_record.is_none());

        let json = plan.to_json().unwrap();
        assert!(!json.contains("dnsRecord"));

        let plan = DeploymentPlan::build(&config(Some(""))).unwrap();
        assert!(plan.certificate.hosted_zone_id.is_none());
        assert!(plan.dns_record.is_none());
    }

    #[test]
    fn test_policies_and_settings() {
        let plan = DeploymentPlan::build(&config(None)).unwrap();
        assert_eq!(plan.bucket.encryption, "S3_MANAGED");
        assert_eq!(plan.api.endpoint_type, "REGIONAL");
        assert_eq!(plan.domain.security_policy, "TLS_1_2");
        assert_eq!(plan.api.policy.statement.len(), 2);
        assert_eq!(plan.execution_role.assumed_by, GATEWAY_SERVICE_PRINCIPAL);

        let json = plan.to_json().unwrap();
        assert!(json.contains("NotIpAddress"));
        assert!(json.contains("StringNotLike"));
        assert!(json.contains("192.0.2.0/24"));
    }

    #[test]
    fn test_canonical_header() {
        assert_eq!(canonical_header("content-type"), "Content-Type");
        assert_eq!(canonical_header("etag"), "Etag");
    }
}
