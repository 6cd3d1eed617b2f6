//! Analysis primitives.
//!
//! The engine consumes analysis through the [`Analyzer`] trait: fingerprint
//! generation, bot detection, email validation and sensitive-info scanning.
//! Implementations are expected to be pure and fast; the engine does not
//! retry them and converts their errors into ERROR rule results.
//!
//! [`LocalAnalyzer`] is the built-in, fully in-process implementation.
//! Deployments with a richer analysis service implement the trait over it.

mod local;

pub use local::LocalAnalyzer;

use serde::Serialize;

use crate::context::Context;
use crate::decision::{EmailType, Entity};
use crate::error::Result;
use crate::log::Logger;
use crate::request::RequestDetails;
use crate::rules::DetectFn;

/// Well-known bot identities the built-in analyzer can emit. Allow/deny
/// lists are written in terms of these names.
pub mod bots {
    pub const CURL: &str = "CURL";
    pub const WGET: &str = "WGET";
    pub const PYTHON_REQUESTS: &str = "PYTHON_REQUESTS";
    pub const GO_HTTP: &str = "GO_HTTP";
    pub const SCRAPY: &str = "SCRAPY";
    pub const GOOGLE_CRAWLER: &str = "GOOGLE_CRAWLER";
    pub const BING_CRAWLER: &str = "BING_CRAWLER";
    pub const YANDEX_CRAWLER: &str = "YANDEX_CRAWLER";
    pub const OPENAI_CRAWLER: &str = "OPENAI_CRAWLER";
    pub const ANTHROPIC_CRAWLER: &str = "ANTHROPIC_CRAWLER";
    pub const HEADLESS_CHROME: &str = "HEADLESS_CHROME";
    pub const PHANTOMJS: &str = "PHANTOMJS";
}

/// The slice of request context an analyzer sees.
pub struct AnalyzeContext<'a> {
    /// Site identifier.
    pub key: &'a str,
    /// Characteristics configured on the engine, in order.
    pub characteristics: &'a [String],
    pub log: &'a dyn Logger,
}

impl<'a> AnalyzeContext<'a> {
    pub fn new(key: &'a str, characteristics: &'a [String], log: &'a dyn Logger) -> Self {
        AnalyzeContext {
            key,
            characteristics,
            log,
        }
    }

    pub fn from_context(ctx: &'a Context) -> Self {
        AnalyzeContext {
            key: &ctx.key,
            characteristics: &ctx.characteristics,
            log: ctx.log.as_ref(),
        }
    }
}

/// Bot identities partitioned by the rule's allow/deny configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BotVerdict {
    pub allowed: Vec<String>,
    pub denied: Vec<String>,
}

/// Overall email validity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Validity {
    Valid,
    Invalid,
}

/// The outcome of validating one email address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailVerdict {
    pub validity: Validity,
    /// The disqualifiers that applied, filtered by the rule's block set.
    pub blocked: Vec<EmailType>,
}

/// The rule-side configuration for email validation.
#[derive(Debug, Clone)]
pub struct EmailValidationConfig {
    /// Disqualifiers that block. Empty blocks on every detected
    /// disqualifier.
    pub block: Vec<EmailType>,
    pub require_top_level_domain: bool,
    pub allow_domain_literal: bool,
}

/// Sensitive entities partitioned by the rule's allow/deny configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SensitiveInfoVerdict {
    pub allowed: Vec<Entity>,
    pub denied: Vec<Entity>,
}

/// Stateless analysis operations invoked by the engine and by local rules.
#[async_trait::async_trait]
pub trait Analyzer: Send + Sync {
    /// Compute a stable client fingerprint. Deterministic for the same
    /// `(key, characteristics, request)` projection.
    async fn generate_fingerprint(
        &self,
        ctx: &AnalyzeContext<'_>,
        details: &RequestDetails,
    ) -> Result<String>;

    /// Classify the request's user agent against well-known bot identities
    /// and partition the matches by the rule's allow/deny lists.
    async fn detect_bot(
        &self,
        ctx: &AnalyzeContext<'_>,
        details: &RequestDetails,
        allow: &[String],
        deny: &[String],
    ) -> Result<BotVerdict>;

    /// Validate an email address against the rule's configuration.
    async fn is_valid_email(
        &self,
        ctx: &AnalyzeContext<'_>,
        email: &str,
        config: &EmailValidationConfig,
    ) -> Result<EmailVerdict>;

    /// Scan a request body for sensitive entities, consulting the custom
    /// detector (when provided) before the built-in ones.
    #[allow(clippy::too_many_arguments)]
    async fn detect_sensitive_info(
        &self,
        ctx: &AnalyzeContext<'_>,
        body: &str,
        allow: &[Entity],
        deny: &[Entity],
        context_window_size: usize,
        detect: Option<&DetectFn>,
    ) -> Result<SensitiveInfoVerdict>;
}
