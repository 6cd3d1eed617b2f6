//! Remote decision service seam.
//!
//! The engine escalates to a [`Client`] when local evaluation cannot decide,
//! and reports every outcome through it. Transport, encoding and timeouts
//! belong to the implementation; the engine only sees a [`Decision`] or an
//! error, and it fails open on the latter.

use crate::context::Context;
use crate::decision::Decision;
use crate::error::Result;
use crate::request::RequestDetails;
use crate::rules::Rule;

/// RPC surface of the remote decision service.
#[async_trait::async_trait]
pub trait Client: Send + Sync {
    /// Ask the service for an authoritative decision. A DENY with a non-zero
    /// TTL instructs the engine to cache the block for the request's
    /// fingerprint. Implementations own the timeout; an `Err` makes the
    /// engine fail open with an ERROR decision.
    async fn decide(
        &self,
        ctx: &Context,
        details: &RequestDetails,
        rules: &[Rule],
    ) -> Result<Decision>;

    /// Report a decision for offline analysis. Fire-and-forget: the engine
    /// never awaits the outcome on its decision path, and errors are only
    /// logged.
    async fn report(
        &self,
        ctx: &Context,
        details: &RequestDetails,
        decision: &Decision,
        rules: &[Rule],
    ) -> Result<()>;
}
