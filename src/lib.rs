//! # SPA Gateway - Locked-down static site delivery
//!
//! `spa-gateway` serves a single-page application out of a private bucket
//! through a gateway that owns every access decision:
//!
//! - **Edge policy**: only callers from configured source ranges may invoke
//!   the gateway at all
//! - **Route resolution**: `/`, `/{patha}` and `/{patha}/{pathb}/{pathc}`
//!   map onto object keys; everything else fails closed
//! - **Velvet rope**: the bucket answers only the gateway's execution
//!   identity and the account owner
//! - **Response translation**: bucket statuses collapse to 200 / 404 / 502,
//!   so clients cannot probe which objects exist
//!
//! ## Quick Start
//!
//! ```rust
//! use spa_gateway::{Gateway, GatewayRequest, MemoryStore, Result, SiteConfig};
//!
//! # fn main() -> Result<()> {
//! let config = SiteConfig::from_toml_str(r#"
//!     domainName = "example.com"
//!     subdomain = "app"
//!     awsIpRanges = ["10.0.0.0/8"]
//!     bucketName = "app-example-assets"
//!     accountId = "123456789012"
//!     gatewayIdentity = "AROAGATEWAYROLE"
//! "#)?;
//!
//! let store = MemoryStore::new().with_object("index.html", "<h1>hello</h1>");
//! let gateway = Gateway::from_config(&config, store)?;
//!
//! let response = gateway.handle(&GatewayRequest::get("/", "10.1.2.3".parse().unwrap()));
//! assert_eq!(response.status, 200);
//! # Ok(())
//! # }
//! ```
//!
//! ## Deployment plan
//!
//! ```rust
//! use spa_gateway::{DeploymentPlan, Result, SiteConfig};
//!
//! # fn main() -> Result<()> {
//! # let config = SiteConfig::from_toml_str(r#"
//! #     domainName = "example.com"
//! #     subdomain = "app"
//! #     awsIpRanges = ["10.0.0.0/8"]
//! #     bucketName = "app-example-assets"
//! #     accountId = "123456789012"
//! #     gatewayIdentity = "AROAGATEWAYROLE"
//! # "#)?;
//! let plan = DeploymentPlan::build(&config)?;
//! assert!(plan.dns_record.is_none()); // no hostedZoneId configured
//! println!("{}", plan.to_json()?);
//! # Ok(())
//! # }
//! ```

// Routing and policy core
pub mod core;

pub mod config;
pub mod error;
pub mod gateway;
pub mod provision;
pub mod service;
pub mod storage;

pub use crate::core::{iam, routing, translate};

pub use crate::config::SiteConfig;
pub use crate::error::{GatewayError, PolicyLayer, Result};
pub use crate::gateway::{Gateway, GatewayRequest, GatewayResponse};
pub use crate::iam::{Decision, EdgeEvaluator, Effect, Policy, PolicyEngine, Statement, StorageEvaluator};
pub use crate::provision::DeploymentPlan;
pub use crate::routing::{RequestPath, RouteTable};
pub use crate::service::{GatewayService, ServiceOptions};
pub use crate::storage::{BucketProxy, DirectoryStore, MemoryStore, ObjectStore};
pub use crate::translate::ResponseTranslator;
