//! Decision and reason value objects.
//!
//! These are the types the engine hands back to callers and to the remote
//! service: the per-rule [`RuleResult`], the structured [`Reason`] evidence,
//! and the final [`Decision`]. Everything serializes to JSON so clients can
//! encode reports however they like.

use serde::Serialize;

/// The verdict of a rule or of the whole request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Conclusion {
    Allow,
    Deny,
    Challenge,
    Error,
}

/// Whether a rule actually executed for this request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleState {
    /// The rule was configured but never executed.
    NotRun,
    /// The rule executed against this request.
    Run,
    /// The outcome was served from a previous decision.
    Cached,
}

/// Ways an email address can be disqualified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EmailType {
    /// The address fails syntactic validation.
    Invalid,
    /// The domain belongs to a disposable-address provider.
    Disposable,
    /// The domain publishes no MX records.
    NoMxRecords,
    /// The address has no Gravatar profile.
    NoGravatar,
    /// The domain belongs to a free-mail provider.
    Free,
}

/// Kinds of sensitive information the scanner can identify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Entity {
    Email,
    PhoneNumber,
    IpAddress,
    CreditCardNumber,
}

/// Structured evidence for a conclusion, tagged by the rule family that
/// produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Reason {
    /// A rate limit was consulted; carries the limit state the decision
    /// service reported.
    RateLimit {
        max: u32,
        remaining: u32,
        /// Seconds until the window resets.
        reset: u32,
    },
    /// Bot detection ran; carries the identities that matched each list.
    Bot {
        allowed: Vec<String>,
        denied: Vec<String>,
    },
    /// Email validation ran; carries the disqualifiers that applied.
    Email { email_types: Vec<EmailType> },
    /// Sensitive-information scanning ran; carries the entities found.
    SensitiveInfo {
        allowed: Vec<Entity>,
        denied: Vec<Entity>,
    },
    /// The shield heuristics triggered (or not) at the decision service.
    Shield { shield_triggered: bool },
    /// Something failed; the decision is fail-open evidence, not policy.
    Error { message: String },
    /// No specific evidence, e.g. a rule that never ran.
    Generic,
}

impl Reason {
    /// Build an error reason from anything displayable.
    pub fn error(err: impl std::fmt::Display) -> Self {
        Reason::Error {
            message: err.to_string(),
        }
    }

    /// Whether this reason marks a failure rather than a policy outcome.
    pub fn is_error(&self) -> bool {
        matches!(self, Reason::Error { .. })
    }
}

/// The outcome of one rule for one `protect` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleResult {
    /// Identifier the engine assigns to every result slot; the decision
    /// service may substitute its own ids for remotely evaluated rules.
    pub rule_id: String,
    pub state: RuleState,
    pub conclusion: Conclusion,
    pub reason: Reason,
    /// Seconds the outcome may be cached for; 0 disables caching.
    pub ttl: u32,
}

impl RuleResult {
    /// The default slot value before a rule has run.
    pub fn not_run() -> Self {
        RuleResult {
            rule_id: String::new(),
            state: RuleState::NotRun,
            conclusion: Conclusion::Allow,
            reason: Reason::Generic,
            ttl: 0,
        }
    }

    pub fn is_denied(&self) -> bool {
        self.conclusion == Conclusion::Deny
    }
}

/// The engine's final verdict for a request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decision {
    pub id: String,
    pub conclusion: Conclusion,
    pub reason: Reason,
    /// Seconds this decision may be cached for its fingerprint.
    pub ttl: u32,
    /// One entry per configured rule, in evaluation order. Empty when the
    /// rule list itself was rejected.
    pub results: Vec<RuleResult>,
}

impl Decision {
    /// Generate a fresh local decision id.
    pub fn new_id() -> String {
        format!("req_{:032x}", rand::random::<u128>())
    }

    pub fn is_allowed(&self) -> bool {
        self.conclusion == Conclusion::Allow
    }

    /// Whether the request should be blocked. ERROR is deliberately not
    /// denied: callers that want stricter behavior implement their own
    /// policy on top.
    pub fn is_denied(&self) -> bool {
        self.conclusion == Conclusion::Deny
    }

    pub fn is_challenged(&self) -> bool {
        self.conclusion == Conclusion::Challenge
    }

    pub fn is_errored(&self) -> bool {
        self.conclusion == Conclusion::Error
    }
}
