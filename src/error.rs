//! Error types for gateway operations

use std::fmt;
use thiserror::Error;

/// Gateway operation result type
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Which policy layer produced a denial
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyLayer {
    /// Network policy attached to the public gateway
    Edge,
    /// Identity policy attached to the bucket
    Storage,
}

impl fmt::Display for PolicyLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyLayer::Edge => write!(f, "edge"),
            PolicyLayer::Storage => write!(f, "storage"),
        }
    }
}

/// Gateway errors
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Path depth not covered by any route
    #[error("No route matches path: {0}")]
    NoRouteMatch(String),

    /// A policy evaluator returned DENY
    #[error("Access denied by {layer} policy: {resource}")]
    AccessDenied { layer: PolicyLayer, resource: String },

    /// The object store failed to answer
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Malformed or traversal path rejected at the boundary
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Only GET is routed
    #[error("Method not allowed: {0}")]
    MethodNotAllowed(String),

    /// Route table could not be built
    #[error("Invalid route: {0}")]
    InvalidRoute(String),

    /// Policy document failed validation
    #[error("Invalid policy: {0}")]
    InvalidPolicy(String),

    /// Site configuration failed validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Object key rejected by the store
    #[error("Invalid object key: {0}")]
    InvalidKey(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML configuration parse error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

impl GatewayError {
    /// HTTP status reported to the client for this error.
    ///
    /// Storage-layer denials never reach the client as 403: the bucket
    /// answers 403 and the response translator collapses it to 404.
    pub fn status_code(&self) -> u16 {
        match self {
            GatewayError::NoRouteMatch(_) => 404,
            GatewayError::AccessDenied {
                layer: PolicyLayer::Edge,
                ..
            } => 403,
            GatewayError::AccessDenied {
                layer: PolicyLayer::Storage,
                ..
            } => 404,
            GatewayError::UpstreamUnavailable(_) => 502,
            GatewayError::InvalidPath(_) | GatewayError::InvalidKey(_) => 400,
            GatewayError::MethodNotAllowed(_) => 405,
            _ => 500,
        }
    }

    /// Message safe to show clients; never carries paths or policy detail.
    pub fn client_message(&self) -> &'static str {
        match self.status_code() {
            400 => "Bad Request",
            403 => "Forbidden",
            404 => "Not Found",
            405 => "Method Not Allowed",
            502 => "Bad Gateway",
            _ => "Internal Server Error",
        }
    }
}
