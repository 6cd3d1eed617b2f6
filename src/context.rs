//! Per-request context and the adapter seam.
//!
//! Framework adapters implement [`AdapterContext`] to give the engine lazy
//! access to the request body and to platform metadata. The engine combines
//! that with its own configuration and the computed fingerprint into a frozen
//! [`Context`] that every rule and collaborator receives.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::log::Logger;

/// Runtime tag recorded on every [`Context`].
pub const RUNTIME: &str = "tokio";

/// Platform hooks supplied by the HTTP-framework adapter.
///
/// Both methods have defaults so the minimal adapter is an empty struct.
#[async_trait::async_trait]
pub trait AdapterContext: Send + Sync {
    /// Lazily read the full request body as text. Returns `None` when the
    /// body is unavailable (already consumed, streaming, or absent). Called
    /// at most once per `protect` invocation.
    async fn body(&self) -> Option<String> {
        None
    }

    /// Additional platform fields (deployment metadata, scheduling hints)
    /// propagated verbatim onto [`Context::platform`].
    fn platform(&self) -> BTreeMap<String, String> {
        BTreeMap::new()
    }
}

/// An adapter with no body access and no platform metadata.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAdapter;

#[async_trait::async_trait]
impl AdapterContext for NoopAdapter {}

/// Frozen request context passed to every rule.
#[derive(Clone)]
pub struct Context {
    /// Site identifier the engine was configured with.
    pub key: String,
    /// Stable client fingerprint for this request.
    pub fingerprint: String,
    /// Characteristics the fingerprint was derived from.
    pub characteristics: Vec<String>,
    /// Runtime tag, always [`RUNTIME`] in this crate.
    pub runtime: &'static str,
    /// Logger shared with the engine.
    pub log: Arc<dyn Logger>,
    /// Adapter-provided platform fields.
    pub platform: BTreeMap<String, String>,
    adapter: Arc<dyn AdapterContext>,
    body_fallback: Option<String>,
}

impl Context {
    pub(crate) fn new(
        key: String,
        fingerprint: String,
        characteristics: Vec<String>,
        log: Arc<dyn Logger>,
        adapter: Arc<dyn AdapterContext>,
        body_fallback: Option<String>,
    ) -> Self {
        let platform = adapter.platform();
        Context {
            key,
            fingerprint,
            characteristics,
            runtime: RUNTIME,
            log,
            platform,
            adapter,
            body_fallback,
        }
    }

    /// The request body: the adapter's lazy read first, falling back to a
    /// body carried on the request itself.
    pub async fn body(&self) -> Option<String> {
        match self.adapter.body().await {
            Some(body) => Some(body),
            None => self.body_fallback.clone(),
        }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("key", &self.key)
            .field("fingerprint", &self.fingerprint)
            .field("characteristics", &self.characteristics)
            .field("runtime", &self.runtime)
            .field("platform", &self.platform)
            .finish_non_exhaustive()
    }
}
