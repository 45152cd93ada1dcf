//! Object storage behind the gateway
//!
//! - [`ObjectStore`] is the fetch collaborator: key in, object or not-found out
//! - [`MemoryStore`] and [`DirectoryStore`] are the two backends
//! - [`BucketProxy`] puts the storage policy in front of a store and answers
//!   with upstream statuses the way a bucket would (200, 403, 404)

use crate::core::iam::StorageEvaluator;
use crate::error::{GatewayError, Result};
use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use http::HeaderMap;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

/// Maximum object key length in bytes
pub const MAX_KEY_LENGTH: usize = 1024;

/// Validate an object key
///
/// Keys can be any UTF-8 string of 1 to 1024 bytes
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(GatewayError::InvalidKey("key cannot be empty".to_string()));
    }

    if key.len() > MAX_KEY_LENGTH {
        return Err(GatewayError::InvalidKey(format!(
            "key too long: {} bytes (max {})",
            key.len(),
            MAX_KEY_LENGTH
        )));
    }

    Ok(())
}

/// Content type for a key, from its extension
pub fn content_type_for(key: &str) -> mime::Mime {
    let extension = Path::new(key)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    let essence = match extension.as_deref() {
        Some("html") | Some("htm") => return mime::TEXT_HTML_UTF_8,
        Some("css") => return mime::TEXT_CSS_UTF_8,
        Some("js") | Some("mjs") => return mime::APPLICATION_JAVASCRIPT_UTF_8,
        Some("json") | Some("map") => return mime::APPLICATION_JSON,
        Some("txt") => return mime::TEXT_PLAIN_UTF_8,
        Some("csv") => return mime::TEXT_CSV_UTF_8,
        Some("svg") => return mime::IMAGE_SVG,
        Some("png") => return mime::IMAGE_PNG,
        Some("jpg") | Some("jpeg") => return mime::IMAGE_JPEG,
        Some("gif") => return mime::IMAGE_GIF,
        Some("bmp") => return mime::IMAGE_BMP,
        Some("woff") => return mime::FONT_WOFF,
        Some("woff2") => return mime::FONT_WOFF2,
        Some("pdf") => return mime::APPLICATION_PDF,
        Some("ico") => "image/x-icon",
        Some("webp") => "image/webp",
        Some("wasm") => "application/wasm",
        Some("xml") => "application/xml",
        Some("webmanifest") => "application/manifest+json",
        _ => return mime::APPLICATION_OCTET_STREAM,
    };
    essence.parse().unwrap_or(mime::APPLICATION_OCTET_STREAM)
}

/// A stored object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub content_type: String,
    pub body: Bytes,
}

impl StoredObject {
    /// Create an object with an explicit content type
    pub fn new(content_type: &str, body: impl Into<Bytes>) -> Self {
        StoredObject {
            content_type: content_type.to_string(),
            body: body.into(),
        }
    }
}

/// Storage fetch collaborator
pub trait ObjectStore: Send + Sync {
    /// Fetch an object; `Ok(None)` means the key does not exist
    ///
    /// Errors mean the store itself failed and map to `UpstreamUnavailable`.
    fn get_object(&self, key: &str) -> Result<Option<StoredObject>>;
}

/// In-memory object store
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    objects: BTreeMap<String, StoredObject>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object, guessing its content type from the key
    pub fn with_object(mut self, key: &str, body: impl Into<Bytes>) -> Self {
        let content_type = content_type_for(key).to_string();
        self.objects
            .insert(key.to_string(), StoredObject::new(&content_type, body));
        self
    }

    /// Add an object with an explicit content type
    pub fn with_typed_object(mut self, key: &str, content_type: &str, body: impl Into<Bytes>) -> Self {
        self.objects
            .insert(key.to_string(), StoredObject::new(content_type, body));
        self
    }

    /// Number of stored objects
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl ObjectStore for MemoryStore {
    fn get_object(&self, key: &str) -> Result<Option<StoredObject>> {
        validate_key(key)?;
        Ok(self.objects.get(key).cloned())
    }
}

/// Object store backed by a local directory (e.g. a built site)
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    /// Serve objects from `root`
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(GatewayError::InvalidConfig(format!(
                "site root is not a directory: {}",
                root.display()
            )));
        }
        let root = root.canonicalize()?;
        Ok(DirectoryStore { root })
    }

    /// Canonical directory objects are read from
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a key to a file under the root, refusing anything that could escape it
    fn object_path(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        if !relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
        {
            return Err(GatewayError::InvalidKey(format!(
                "key does not name a file under the root: {}",
                key
            )));
        }
        Ok(self.root.join(relative))
    }
}

impl ObjectStore for DirectoryStore {
    fn get_object(&self, key: &str) -> Result<Option<StoredObject>> {
        validate_key(key)?;
        let path = match self.object_path(key)?.canonicalize() {
            Ok(path) => path,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(GatewayError::UpstreamUnavailable(format!(
                    "resolving {}: {}",
                    key, e
                )))
            }
        };
        // Links may point anywhere; only files that resolve under the root are objects
        if !path.starts_with(&self.root) {
            warn!(key, target = %path.display(), "object resolves outside the site root");
            return Ok(None);
        }

        match std::fs::read(&path) {
            Ok(body) => Ok(Some(StoredObject::new(
                content_type_for(key).as_ref(),
                body,
            ))),
            // A directory is not an object
            Err(e) if e.kind() == ErrorKind::NotFound || path.is_dir() => Ok(None),
            Err(e) => Err(GatewayError::UpstreamUnavailable(format!(
                "reading {}: {}",
                path.display(),
                e
            ))),
        }
    }
}

/// Response from the bucket, before translation
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl UpstreamResponse {
    fn empty(status: u16) -> Self {
        UpstreamResponse {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }
}

/// A store guarded by the bucket's identity policy
pub struct BucketProxy<S> {
    store: S,
    policy: StorageEvaluator,
}

impl<S: ObjectStore> BucketProxy<S> {
    /// Guard `store` with `policy`
    pub fn new(store: S, policy: StorageEvaluator) -> Self {
        BucketProxy { store, policy }
    }

    /// The guarded store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The bucket policy
    pub fn policy(&self) -> &StorageEvaluator {
        &self.policy
    }

    /// Read `key` as `identity`
    ///
    /// A policy denial is 403, a missing object 404. Only a failing store
    /// is an error.
    pub fn get_object(&self, identity: Option<&str>, key: &str) -> Result<UpstreamResponse> {
        let decision = self.policy.evaluate_read(identity, key);
        if !decision.is_allowed() {
            debug!(bucket = self.policy.bucket(), key, ?identity, ?decision, "bucket read denied");
            return Ok(UpstreamResponse::empty(403));
        }

        let object = match self.store.get_object(key) {
            Ok(Some(object)) => object,
            Ok(None) => {
                debug!(bucket = self.policy.bucket(), key, "no such key");
                return Ok(UpstreamResponse::empty(404));
            }
            Err(GatewayError::InvalidKey(reason)) => {
                debug!(bucket = self.policy.bucket(), key, %reason, "key rejected");
                return Ok(UpstreamResponse::empty(400));
            }
            Err(e) => {
                warn!(bucket = self.policy.bucket(), key, error = %e, "object store failed");
                return Err(match e {
                    GatewayError::UpstreamUnavailable(_) => e,
                    other => GatewayError::UpstreamUnavailable(other.to_string()),
                });
            }
        };

        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(&object.content_type) {
            headers.insert(CONTENT_TYPE, value);
        }
        headers.insert(CONTENT_LENGTH, HeaderValue::from(object.body.len()));

        Ok(UpstreamResponse {
            status: 200,
            headers,
            body: object.body,
        })
    }
}
