//! Site configuration
//!
//! Loaded once at startup from TOML or JSON and never mutated. Keys use the
//! camelCase names of the deployment configuration:
//!
//! ```toml
//! domainName = "example.com"
//! subdomain = "app"
//! hostedZoneId = "Z0123456789ABC"      # optional
//! awsIpRanges = ["10.0.0.0/8", "192.0.2.0/24"]
//! bucketName = "app-example-assets"
//! accountId = "123456789012"
//! gatewayIdentity = "AROAEXAMPLEROLEID"
//! stage = "prod"                       # optional, default "prod"
//! indexDocument = "index.html"         # optional, default "index.html"
//! ```

use crate::core::iam::parse_network;
use crate::core::routing::DEFAULT_INDEX_DOCUMENT;
use crate::error::{GatewayError, Result};
use ipnet::IpNet;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;
use std::sync::OnceLock;
use tracing::info;
use validator::{Validate, ValidationError};

fn hostname_label_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?$").expect("valid hostname label regex")
    })
}

fn bucket_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[a-z0-9][a-z0-9.-]{1,61}[a-z0-9]$").expect("valid bucket name regex")
    })
}

fn default_stage() -> String {
    "prod".to_string()
}

fn default_index_document() -> String {
    DEFAULT_INDEX_DOCUMENT.to_string()
}

fn validate_domain_name(domain: &str) -> std::result::Result<(), ValidationError> {
    let valid = domain.len() <= 253
        && domain.contains('.')
        && domain.split('.').all(|label| hostname_label_re().is_match(label));
    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("domain_name"))
    }
}

fn validate_subdomain(subdomain: &str) -> std::result::Result<(), ValidationError> {
    if hostname_label_re().is_match(subdomain) {
        Ok(())
    } else {
        Err(ValidationError::new("subdomain"))
    }
}

fn validate_bucket_name(name: &str) -> std::result::Result<(), ValidationError> {
    if bucket_name_re().is_match(name) && !name.contains("..") {
        Ok(())
    } else {
        Err(ValidationError::new("bucket_name"))
    }
}

fn validate_ip_ranges(ranges: &[String]) -> std::result::Result<(), ValidationError> {
    if ranges.iter().all(|r| parse_network(r).is_ok()) {
        Ok(())
    } else {
        Err(ValidationError::new("aws_ip_ranges"))
    }
}

fn validate_account_id(account_id: &str) -> std::result::Result<(), ValidationError> {
    if account_id.len() == 12 && account_id.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ValidationError::new("account_id"))
    }
}

/// The identity is matched literally by the bucket policy, so glob
/// characters and whitespace are refused
fn validate_gateway_identity(identity: &str) -> std::result::Result<(), ValidationError> {
    if identity.contains(['*', '?']) || identity.chars().any(|c| c.is_whitespace() || c.is_control()) {
        Err(ValidationError::new("gateway_identity"))
    } else {
        Ok(())
    }
}

/// An empty `hostedZoneId` is the same as leaving it out
fn empty_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|zone| !zone.trim().is_empty()))
}

fn validate_index_document(index: &str) -> std::result::Result<(), ValidationError> {
    if index.contains(['{', '}']) || index.starts_with('/') {
        Err(ValidationError::new("index_document"))
    } else {
        Ok(())
    }
}

/// Immutable site configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SiteConfig {
    /// Apex domain, e.g. `example.com`
    #[validate(custom(function = "validate_domain_name"))]
    pub domain_name: String,

    /// Single label prepended to the domain, e.g. `app`
    #[validate(custom(function = "validate_subdomain"))]
    pub subdomain: String,

    /// DNS zone for certificate validation and the CNAME record.
    /// When absent both are skipped.
    #[serde(
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    #[validate(length(max = 32))]
    pub hosted_zone_id: Option<String>,

    /// Source ranges allowed to reach the gateway
    #[validate(length(min = 1), custom(function = "validate_ip_ranges"))]
    pub aws_ip_ranges: Vec<String>,

    /// Bucket holding the site assets
    #[validate(custom(function = "validate_bucket_name"))]
    pub bucket_name: String,

    /// Account owning the bucket
    #[validate(custom(function = "validate_account_id"))]
    pub account_id: String,

    /// Unique id of the identity the gateway reads the bucket as
    #[validate(length(min = 1, max = 128), custom(function = "validate_gateway_identity"))]
    pub gateway_identity: String,

    /// Gateway deployment stage
    #[serde(default = "default_stage")]
    #[validate(length(min = 1, max = 64))]
    pub stage: String,

    /// Object served for `/`
    #[serde(default = "default_index_document")]
    #[validate(length(min = 1, max = 1024), custom(function = "validate_index_document"))]
    pub index_document: String,
}

impl SiteConfig {
    /// Parse and validate TOML
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: SiteConfig = toml::from_str(text)?;
        config.check()?;
        Ok(config)
    }

    /// Parse and validate JSON
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: SiteConfig = serde_json::from_str(text)?;
        config.check()?;
        Ok(config)
    }

    /// Load from a `.toml` or `.json` file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;

        let config = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&text)?,
            Some("toml") => Self::from_toml_str(&text)?,
            other => {
                return Err(GatewayError::InvalidConfig(format!(
                    "unsupported config format: {:?}",
                    other
                )))
            }
        };

        info!(
            path = %path.display(),
            fqdn = %config.fqdn(),
            ranges = config.aws_ip_ranges.len(),
            dns_binding = config.dns_binding_enabled(),
            "site configuration loaded"
        );
        Ok(config)
    }

    /// Run field validation
    pub fn check(&self) -> Result<()> {
        self.validate()
            .map_err(|e| GatewayError::InvalidConfig(e.to_string()))
    }

    /// Public hostname of the site: `subdomain.domainName`
    pub fn fqdn(&self) -> String {
        format!("{}.{}", self.subdomain, self.domain_name)
    }

    /// Whether certificate validation and the DNS record can be provisioned
    pub fn dns_binding_enabled(&self) -> bool {
        self.hosted_zone().is_some()
    }

    /// Configured DNS zone, ignoring a blank value
    pub fn hosted_zone(&self) -> Option<&str> {
        self.hosted_zone_id
            .as_deref()
            .filter(|zone| !zone.trim().is_empty())
    }

    /// Parsed source ranges
    pub fn ip_ranges(&self) -> Result<Vec<IpNet>> {
        self.aws_ip_ranges
            .iter()
            .map(|r| {
                parse_network(r).map_err(|_| {
                    GatewayError::InvalidConfig(format!("invalid IP range: {}", r))
                })
            })
            .collect()
    }
}
