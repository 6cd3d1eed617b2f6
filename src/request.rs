//! Request snapshots.
//!
//! Adapters hand the engine a [`ProtectRequest`]: the ten known fields typed,
//! plus an `extra` map for any platform-specific properties. The engine turns
//! it into an immutable [`RequestDetails`] snapshot before any rule sees it,
//! stringifying the unknown properties along the way.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::headers::HeaderMap;

/// Placeholder recorded for extra values that have no string rendering.
pub const UNSUPPORTED_VALUE: &str = "<unsupported value>";

/// A request as supplied by an adapter. All fields are optional; a missing
/// request is treated as empty.
#[derive(Debug, Clone, Default)]
pub struct ProtectRequest {
    pub ip: Option<String>,
    pub method: Option<String>,
    pub protocol: Option<String>,
    pub host: Option<String>,
    pub path: Option<String>,
    pub headers: HeaderMap,
    /// The request body, when the adapter can supply it up front. Adapters
    /// that can only read the body once should implement
    /// [`AdapterContext::body`](crate::context::AdapterContext::body) instead.
    pub body: Option<String>,
    pub email: Option<String>,
    pub cookies: Option<String>,
    pub query: Option<String>,
    /// Properties beyond the known set; stringified into
    /// [`RequestDetails::extra`]. User-defined characteristics are resolved
    /// from here.
    pub extra: serde_json::Map<String, Value>,
}

impl ProtectRequest {
    /// Add an extra property. Accepts any JSON value; non-scalar values are
    /// recorded as [`UNSUPPORTED_VALUE`] in the snapshot.
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// Immutable request snapshot passed to rules and collaborators. Frozen at
/// entry to `protect`; rules receive shared references and cannot mutate it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestDetails {
    pub ip: Option<String>,
    pub method: Option<String>,
    pub protocol: Option<String>,
    pub host: Option<String>,
    pub path: Option<String>,
    pub headers: HeaderMap,
    pub email: Option<String>,
    pub cookies: Option<String>,
    pub query: Option<String>,
    /// Stringified unknown properties, in deterministic key order.
    pub extra: BTreeMap<String, String>,
}

impl RequestDetails {
    /// Build the snapshot from an adapter request. `None` is an empty
    /// request.
    pub fn from_request(request: Option<&ProtectRequest>) -> Self {
        let Some(request) = request else {
            return RequestDetails::default();
        };
        let extra = request
            .extra
            .iter()
            .map(|(key, value)| (key.clone(), stringify(value)))
            .collect();
        RequestDetails {
            ip: request.ip.clone(),
            method: request.method.clone(),
            protocol: request.protocol.clone(),
            host: request.host.clone(),
            path: request.path.clone(),
            headers: request.headers.clone(),
            email: request.email.clone(),
            cookies: request.cookies.clone(),
            query: request.query.clone(),
            extra,
        }
    }
}

/// Render an extra property as a string: strings pass through, numbers become
/// decimal, booleans become `"true"`/`"false"`, anything else is
/// [`UNSUPPORTED_VALUE`].
fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => UNSUPPORTED_VALUE.to_string(),
    }
}
