//! HTTP adapter implementing hyper's `Service` trait
//!
//! Converts hyper requests into [`GatewayRequest`]s and gateway responses
//! back into hyper responses. The gateway itself is synchronous, so each
//! request runs on tokio's blocking pool.

use crate::gateway::{Gateway, GatewayRequest, GatewayResponse};
use crate::storage::ObjectStore;
use bytes::Bytes;
use http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use http::{Request, Response, StatusCode};
use http_body_util::Full;
use hyper::service::Service;
use std::convert::Infallible;
use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use std::pin::Pin;
use std::sync::Arc;
use tracing::error;

/// Header carrying the proxy chain's client addresses
pub const FORWARDED_FOR: &str = "x-forwarded-for";

/// How caller attributes are taken from a request
#[derive(Debug, Clone, Default)]
pub struct ServiceOptions {
    /// Use the first `X-Forwarded-For` hop as the source IP. Only enable
    /// behind a proxy that overwrites the header.
    pub trust_forwarded_for: bool,
    /// Header naming the caller identity, if any
    pub identity_header: Option<HeaderName>,
}

/// Source IP for a request
pub fn source_ip<B>(request: &Request<B>, peer: SocketAddr, options: &ServiceOptions) -> IpAddr {
    if options.trust_forwarded_for {
        let forwarded = request
            .headers()
            .get(FORWARDED_FOR)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .and_then(|hop| hop.trim().parse::<IpAddr>().ok());
        if let Some(ip) = forwarded {
            return ip;
        }
    }
    peer.ip()
}

/// Build the gateway's view of a hyper request; the body is never read
pub fn to_gateway_request<B>(
    request: &Request<B>,
    peer: SocketAddr,
    options: &ServiceOptions,
) -> GatewayRequest {
    let identity = options
        .identity_header
        .as_ref()
        .and_then(|name| request.headers().get(name))
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string);

    GatewayRequest {
        method: request.method().clone(),
        path: request.uri().path().to_string(),
        source_ip: Some(source_ip(request, peer, options)),
        identity,
    }
}

/// Turn a gateway response into a hyper response
pub fn into_http_response(response: GatewayResponse) -> Response<Full<Bytes>> {
    let mut http_response = Response::new(Full::new(response.body));
    *http_response.status_mut() = response.status;
    *http_response.headers_mut() = response.headers;
    http_response
}

fn internal_error() -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from_static(
        br#"{"message":"Internal Server Error"}"#,
    )));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

/// Per-connection hyper service over a shared gateway
pub struct GatewayService<S> {
    gateway: Arc<Gateway<S>>,
    options: Arc<ServiceOptions>,
    peer: SocketAddr,
}

impl<S> GatewayService<S> {
    pub fn new(gateway: Arc<Gateway<S>>, options: Arc<ServiceOptions>, peer: SocketAddr) -> Self {
        GatewayService {
            gateway,
            options,
            peer,
        }
    }
}

impl<S> Clone for GatewayService<S> {
    fn clone(&self) -> Self {
        GatewayService {
            gateway: Arc::clone(&self.gateway),
            options: Arc::clone(&self.options),
            peer: self.peer,
        }
    }
}

impl<S, B> Service<Request<B>> for GatewayService<S>
where
    S: ObjectStore + 'static,
{
    type Response = Response<Full<Bytes>>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: Request<B>) -> Self::Future {
        let request = to_gateway_request(&req, self.peer, &self.options);
        let gateway = Arc::clone(&self.gateway);

        Box::pin(async move {
            match tokio::task::spawn_blocking(move || gateway.handle(&request)).await {
                Ok(response) => Ok(into_http_response(response)),
                Err(e) => {
                    error!(error = %e, "request handler panicked");
                    Ok(internal_error())
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use crate::storage::MemoryStore;
    use http_body_util::BodyExt;

    fn peer() -> SocketAddr {
        "10.0.0.5:40000".parse().unwrap()
    }

    fn request(path: &str) -> Request<()> {
        Request::builder()
            .uri(path)
            .header(FORWARDED_FOR, "203.0.113.9, 10.0.0.1")
            .header("x-caller-id", "AIDAUSER")
            .body(())
            .unwrap()
    }

    #[test]
    fn test_peer_ip_when_untrusted() {
        let req = to_gateway_request(&request("/x?y=1"), peer(), &ServiceOptions::default());
        assert_eq!(req.source_ip, Some("10.0.0.5".parse().unwrap()));
        assert_eq!(req.path, "/x");
        assert!(req.identity.is_none());
    }

    #[test]
    fn test_forwarded_ip_when_trusted() {
        let options = ServiceOptions {
            trust_forwarded_for: true,
            identity_header: Some(HeaderName::from_static("x-caller-id")),
        };
        let req = to_gateway_request(&request("/"), peer(), &options);
        assert_eq!(req.source_ip, Some("203.0.113.9".parse().unwrap()));
        assert_eq!(req.identity.as_deref(), Some("AIDAUSER"));
    }

    #[test]
    fn test_malformed_forwarded_falls_back_to_peer() {
        let options = ServiceOptions {
            trust_forwarded_for: true,
            identity_header: None,
        };
        let req = Request::builder()
            .uri("/")
            .header(FORWARDED_FOR, "unknown")
            .body(())
            .unwrap();
        assert_eq!(source_ip(&req, peer(), &options), peer().ip());
    }

    #[tokio::test]
    async fn test_service_round_trip() {
        let config = SiteConfig::from_toml_str(
            r#"
            domainName = "example.com"
            subdomain = "app"
            awsIpRanges = ["10.0.0.0/8"]
            bucketName = "app-example-assets"
            accountId = "123456789012"
            gatewayIdentity = "AROAGATEWAYROLE"
            "#,
        )
        .unwrap();
        let store = MemoryStore::new().with_object("index.html", "<p>home</p>");
        let gateway = Arc::new(Gateway::from_config(&config, store).unwrap());
        let service = GatewayService::new(gateway, Arc::new(ServiceOptions::default()), peer());

        let response = service.call(request("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "text/html; charset=utf-8"
        );
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body, "<p>home</p>");

        let response = service.call(request("/a/b")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
