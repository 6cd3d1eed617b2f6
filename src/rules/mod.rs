//! Security rules.
//!
//! A [`Rule`] is one piece of protection policy: a [`RuleKind`] plus a fixed
//! priority and a [`Mode`]. BOT, EMAIL and SENSITIVE_INFO rules are *local*
//! (the engine evaluates them in-process through the analyzer); the three
//! rate-limit algorithms and SHIELD are evaluated only by the remote decision
//! service and yield NOT_RUN locally.
//!
//! Rules are built through the constructors in [`builders`], never by hand:
//! the constructors own the priority assignments and the allow/deny
//! exclusivity checks.

pub mod builders;
mod evaluator;

use std::fmt;
use std::sync::Arc;

use crate::decision::{EmailType, Entity};

/// Evaluation priorities, lower runs first.
pub(crate) const PRIORITY_SENSITIVE_INFO: u8 = 1;
pub(crate) const PRIORITY_SHIELD: u8 = 2;
pub(crate) const PRIORITY_RATE_LIMIT: u8 = 3;
pub(crate) const PRIORITY_BOT: u8 = 4;
pub(crate) const PRIORITY_EMAIL: u8 = 5;

/// Whether a rule can deny requests or only log what it would have done.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    /// Log-only; a DENY from this rule never blocks the request.
    #[default]
    DryRun,
    /// The rule's DENY is enforced.
    Live,
}

impl Mode {
    /// Only the exact spelling `"LIVE"` is live; every other string,
    /// including typos and lowercase spellings, is dry-run.
    pub fn from_label(label: &str) -> Mode {
        if label == "LIVE" {
            Mode::Live
        } else {
            Mode::DryRun
        }
    }
}

impl From<&str> for Mode {
    fn from(label: &str) -> Self {
        Mode::from_label(label)
    }
}

impl<'de> serde::Deserialize<'de> for Mode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let label = <String as serde::Deserialize>::deserialize(deserializer)?;
        Ok(Mode::from_label(&label))
    }
}

/// A caller-supplied sensitive-info detector. Receives a window of body
/// tokens and returns, per token in the window, the entity it identifies
/// there, if any.
#[derive(Clone)]
pub struct DetectFn(pub Arc<dyn Fn(&[&str]) -> Vec<Option<Entity>> + Send + Sync>);

impl DetectFn {
    pub fn new(f: impl Fn(&[&str]) -> Vec<Option<Entity>> + Send + Sync + 'static) -> Self {
        DetectFn(Arc::new(f))
    }
}

impl fmt::Debug for DetectFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DetectFn(..)")
    }
}

/// The rule variants, with their variant-specific configuration.
#[derive(Debug, Clone)]
pub enum RuleKind {
    /// Token-bucket rate limit, evaluated remotely.
    TokenBucket {
        matcher: Option<String>,
        characteristics: Option<Vec<String>>,
        refill_rate: u32,
        /// Seconds between refills.
        interval: u32,
        capacity: u32,
    },
    /// Fixed-window rate limit, evaluated remotely.
    FixedWindow {
        matcher: Option<String>,
        characteristics: Option<Vec<String>>,
        max: u32,
        /// Window length in seconds.
        window: u32,
    },
    /// Sliding-window rate limit, evaluated remotely.
    SlidingWindow {
        matcher: Option<String>,
        characteristics: Option<Vec<String>>,
        max: u32,
        /// Window length in seconds.
        interval: u32,
    },
    /// Bot detection against well-known bot identities. At most one of
    /// `allow`/`deny` is non-empty.
    BotDetection {
        allow: Vec<String>,
        deny: Vec<String>,
    },
    /// Email validation with configurable disqualifiers.
    EmailValidation {
        block: Vec<EmailType>,
        require_top_level_domain: bool,
        allow_domain_literal: bool,
    },
    /// Sensitive-information scanning over the request body. At most one of
    /// `allow`/`deny` is non-empty.
    SensitiveInfo {
        allow: Vec<Entity>,
        deny: Vec<Entity>,
        context_window_size: usize,
        detect: Option<DetectFn>,
    },
    /// Catch-all heuristics, evaluated remotely.
    Shield,
}

/// One piece of protection policy.
#[derive(Debug, Clone)]
pub struct Rule {
    pub kind: RuleKind,
    /// Fixed per-kind priority; lower runs first.
    pub priority: u8,
    pub mode: Mode,
}

impl Rule {
    /// Whether the engine evaluates this rule in-process. Remote-only rules
    /// stay NOT_RUN locally.
    pub fn is_local(&self) -> bool {
        matches!(
            self.kind,
            RuleKind::BotDetection { .. }
                | RuleKind::EmailValidation { .. }
                | RuleKind::SensitiveInfo { .. }
        )
    }

    /// Whether this is one of the rate-limit variants.
    pub fn is_rate_limit(&self) -> bool {
        matches!(
            self.kind,
            RuleKind::TokenBucket { .. }
                | RuleKind::FixedWindow { .. }
                | RuleKind::SlidingWindow { .. }
        )
    }

    /// Stable name for logging and wire encoding.
    pub fn type_name(&self) -> &'static str {
        match self.kind {
            RuleKind::TokenBucket { .. }
            | RuleKind::FixedWindow { .. }
            | RuleKind::SlidingWindow { .. } => "RATE_LIMIT",
            RuleKind::BotDetection { .. } => "BOT",
            RuleKind::EmailValidation { .. } => "EMAIL",
            RuleKind::SensitiveInfo { .. } => "SENSITIVE_INFO",
            RuleKind::Shield => "SHIELD",
        }
    }
}

/// Stable sort by priority; declaration order breaks ties.
pub(crate) fn sort_by_priority(rules: &mut [Rule]) {
    rules.sort_by_key(|rule| rule.priority);
}
