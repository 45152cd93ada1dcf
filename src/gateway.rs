//! Request pipeline
//!
//! `handle` runs a request through, in order:
//!
//! 1. edge policy on the source network
//! 2. method check (only GET is routed)
//! 3. path boundary (split, decode, reject traversal)
//! 4. route resolution to an object key
//! 5. bucket read as the gateway's execution identity
//! 6. status translation
//!
//! Every stage is synchronous and holds no mutable state, so a single
//! `Gateway` can be shared across threads behind an `Arc`.

use crate::config::SiteConfig;
use crate::core::iam::{EdgeEvaluator, StorageEvaluator};
use crate::core::routing::{RequestPath, RouteTable};
use crate::core::translate::ResponseTranslator;
use crate::error::{GatewayError, Result};
use crate::storage::{BucketProxy, ObjectStore};
use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderMap, Method, StatusCode};
use serde::Serialize;
use std::net::IpAddr;
use tracing::{debug, info, warn};

/// A request as seen by the gateway
#[derive(Debug, Clone)]
pub struct GatewayRequest {
    pub method: Method,
    /// Raw request path, still percent-encoded, without the query string
    pub path: String,
    pub source_ip: Option<IpAddr>,
    pub identity: Option<String>,
}

impl GatewayRequest {
    /// A GET for `path` from `source_ip`
    pub fn get(path: &str, source_ip: IpAddr) -> Self {
        GatewayRequest {
            method: Method::GET,
            path: path.to_string(),
            source_ip: Some(source_ip),
            identity: None,
        }
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn with_identity(mut self, identity: &str) -> Self {
        self.identity = Some(identity.to_string());
        self
    }
}

/// Response returned to the client
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    message: &'a str,
}

impl GatewayResponse {
    /// Client response for an error; the body never carries internal detail
    pub fn from_error(error: &GatewayError) -> Self {
        let status =
            StatusCode::from_u16(error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = serde_json::to_vec(&ErrorBody {
            message: error.client_message(),
        })
        .map(Bytes::from)
        .unwrap_or_default();

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));

        GatewayResponse {
            status,
            headers,
            body,
        }
    }
}

/// Static-site gateway
pub struct Gateway<S> {
    edge: EdgeEvaluator,
    routes: RouteTable,
    proxy: BucketProxy<S>,
    translator: ResponseTranslator,
    execution_identity: String,
}

impl<S: ObjectStore> Gateway<S> {
    /// Assemble a gateway from its parts
    pub fn new(
        edge: EdgeEvaluator,
        routes: RouteTable,
        proxy: BucketProxy<S>,
        translator: ResponseTranslator,
        execution_identity: &str,
    ) -> Self {
        Gateway {
            edge,
            routes,
            proxy,
            translator,
            execution_identity: execution_identity.to_string(),
        }
    }

    /// Build the gateway a site configuration describes, reading from `store`
    pub fn from_config(config: &SiteConfig, store: S) -> Result<Self> {
        config.check()?;

        let edge = EdgeEvaluator::new(&config.stage, &config.ip_ranges()?)?;
        let routes = RouteTable::single_page_app(&config.index_document)?;
        let storage = StorageEvaluator::new(
            &config.bucket_name,
            &config.gateway_identity,
            &config.account_id,
        )?;
        let translator = ResponseTranslator::single_page_app()?;

        info!(
            fqdn = %config.fqdn(),
            stage = %config.stage,
            bucket = %config.bucket_name,
            routes = routes.routes().len(),
            "gateway ready"
        );

        Ok(Gateway::new(
            edge,
            routes,
            BucketProxy::new(store, storage),
            translator,
            &config.gateway_identity,
        ))
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn edge(&self) -> &EdgeEvaluator {
        &self.edge
    }

    pub fn proxy(&self) -> &BucketProxy<S> {
        &self.proxy
    }

    pub fn translator(&self) -> &ResponseTranslator {
        &self.translator
    }

    /// Serve a request; failures become JSON error responses
    pub fn handle(&self, request: &GatewayRequest) -> GatewayResponse {
        match self.try_handle(request) {
            Ok(response) => response,
            Err(e) => {
                match &e {
                    GatewayError::UpstreamUnavailable(_) => {
                        warn!(path = %request.path, error = %e, "upstream failure")
                    }
                    _ => debug!(path = %request.path, error = %e, "request rejected"),
                }
                GatewayResponse::from_error(&e)
            }
        }
    }

    /// Serve a request, surfacing failures as errors
    pub fn try_handle(&self, request: &GatewayRequest) -> Result<GatewayResponse> {
        self.edge.authorize(
            request.source_ip,
            request.identity.as_deref(),
            request.method.as_str(),
            &request.path,
        )?;

        if request.method != Method::GET {
            return Err(GatewayError::MethodNotAllowed(request.method.to_string()));
        }

        let path = RequestPath::parse(&request.path)?;
        let target = self.routes.resolve(path.segments())?;

        let upstream = self
            .proxy
            .get_object(Some(&self.execution_identity), &target.key)?;
        let translation = self.translator.translate(upstream.status, &upstream.headers);

        debug!(
            path = %request.path,
            route = %target.route,
            key = %target.key,
            upstream_status = upstream.status,
            status = %translation.status,
            "request served"
        );

        let body = if translation.status == StatusCode::OK {
            upstream.body
        } else {
            Bytes::new()
        };

        let mut headers = translation.headers;
        headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));

        Ok(GatewayResponse {
            status: translation.status,
            headers,
            body,
        })
    }
}
