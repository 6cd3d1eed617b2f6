//! Declarative rule constructors.
//!
//! Each constructor takes a slice of option structs and returns the rules
//! they describe. With no options, the rate-limit constructors return no
//! rules at all, while [`detect_bot`], [`validate_email`],
//! [`sensitive_info`] and [`shield`] emit a single rule built from defaults.
//!
//! Options deserialize from JSON-ish configuration: `mode` is a string where
//! only `"LIVE"` enforces, and durations accept either integer seconds or
//! strings like `"1h30m"`.

use serde::Deserialize;

use crate::decision::{EmailType, Entity};
use crate::duration::{self, DurationValue};
use crate::error::{ReqShieldError, Result};
use crate::rules::{
    DetectFn, Mode, Rule, RuleKind, PRIORITY_BOT, PRIORITY_EMAIL, PRIORITY_RATE_LIMIT,
    PRIORITY_SENSITIVE_INFO, PRIORITY_SHIELD,
};

/// Options for [`token_bucket`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TokenBucketOptions {
    pub mode: Mode,
    /// Optional path matcher forwarded to the decision service.
    #[serde(rename = "match")]
    pub matcher: Option<String>,
    /// Overrides the engine-level characteristics for this limit's key.
    pub characteristics: Option<Vec<String>>,
    /// Tokens added per interval.
    pub refill_rate: u32,
    pub interval: DurationValue,
    /// Maximum tokens the bucket holds.
    pub capacity: u32,
}

/// Options for [`fixed_window`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FixedWindowOptions {
    pub mode: Mode,
    #[serde(rename = "match")]
    pub matcher: Option<String>,
    pub characteristics: Option<Vec<String>>,
    /// Maximum requests per window.
    pub max: u32,
    pub window: DurationValue,
}

/// Options for [`sliding_window`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SlidingWindowOptions {
    pub mode: Mode,
    #[serde(rename = "match")]
    pub matcher: Option<String>,
    pub characteristics: Option<Vec<String>>,
    /// Maximum requests per interval.
    pub max: u32,
    pub interval: DurationValue,
}

/// Options for [`detect_bot`]. `allow` and `deny` are mutually exclusive.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BotOptions {
    pub mode: Mode,
    /// Well-known bot identities to allow; every other detected bot denies.
    pub allow: Option<Vec<String>>,
    /// Well-known bot identities to deny; every other detected bot passes.
    pub deny: Option<Vec<String>>,
}

/// Options for [`validate_email`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmailOptions {
    pub mode: Mode,
    /// Disqualifiers that block; empty means every detected disqualifier
    /// blocks.
    pub block: Option<Vec<EmailType>>,
    /// Defaults to true: `user@localhost` style addresses are invalid.
    pub require_top_level_domain: Option<bool>,
    /// Defaults to false: `user@[127.0.0.1]` style addresses are invalid.
    pub allow_domain_literal: Option<bool>,
}

/// Options for [`sensitive_info`]. `allow` and `deny` are mutually
/// exclusive.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SensitiveInfoOptions {
    pub mode: Mode,
    /// Entities to tolerate; every other detected entity denies.
    pub allow: Option<Vec<Entity>>,
    /// Entities that deny; every other detected entity passes.
    pub deny: Option<Vec<Entity>>,
    /// Tokens of surrounding context handed to a custom detector.
    pub context_window_size: Option<usize>,
    /// Custom detector consulted before the built-in ones.
    #[serde(skip)]
    pub detect: Option<DetectFn>,
}

/// Options for [`shield`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShieldOptions {
    pub mode: Mode,
}

/// Options for [`protect_signup`].
#[derive(Debug, Clone, Default)]
pub struct ProtectSignupOptions {
    pub rate_limit: Option<SlidingWindowOptions>,
    pub bots: Option<BotOptions>,
    pub email: Option<EmailOptions>,
}

/// Token-bucket rate limiting. No options, no rules.
pub fn token_bucket(options: &[TokenBucketOptions]) -> Result<Vec<Rule>> {
    options
        .iter()
        .map(|opts| {
            Ok(Rule {
                kind: RuleKind::TokenBucket {
                    matcher: opts.matcher.clone(),
                    characteristics: opts.characteristics.clone(),
                    refill_rate: opts.refill_rate,
                    interval: duration::parse(&opts.interval)?,
                    capacity: opts.capacity,
                },
                priority: PRIORITY_RATE_LIMIT,
                mode: opts.mode,
            })
        })
        .collect()
}

/// Fixed-window rate limiting. No options, no rules.
pub fn fixed_window(options: &[FixedWindowOptions]) -> Result<Vec<Rule>> {
    options
        .iter()
        .map(|opts| {
            Ok(Rule {
                kind: RuleKind::FixedWindow {
                    matcher: opts.matcher.clone(),
                    characteristics: opts.characteristics.clone(),
                    max: opts.max,
                    window: duration::parse(&opts.window)?,
                },
                priority: PRIORITY_RATE_LIMIT,
                mode: opts.mode,
            })
        })
        .collect()
}

/// Sliding-window rate limiting. No options, no rules.
pub fn sliding_window(options: &[SlidingWindowOptions]) -> Result<Vec<Rule>> {
    options
        .iter()
        .map(|opts| {
            Ok(Rule {
                kind: RuleKind::SlidingWindow {
                    matcher: opts.matcher.clone(),
                    characteristics: opts.characteristics.clone(),
                    max: opts.max,
                    interval: duration::parse(&opts.interval)?,
                },
                priority: PRIORITY_RATE_LIMIT,
                mode: opts.mode,
            })
        })
        .collect()
}

/// Bot detection. With no options, emits one default rule that denies every
/// detected bot.
pub fn detect_bot(options: &[BotOptions]) -> Result<Vec<Rule>> {
    let defaults = [BotOptions::default()];
    let options = if options.is_empty() { &defaults } else { options };
    options
        .iter()
        .map(|opts| {
            if opts.allow.is_some() && opts.deny.is_some() {
                return Err(ReqShieldError::InvalidRule(
                    "bot detection cannot have both allow and deny lists".to_string(),
                ));
            }
            Ok(Rule {
                kind: RuleKind::BotDetection {
                    allow: opts.allow.clone().unwrap_or_default(),
                    deny: opts.deny.clone().unwrap_or_default(),
                },
                priority: PRIORITY_BOT,
                mode: opts.mode,
            })
        })
        .collect()
}

/// Email validation. With no options, emits one default rule.
pub fn validate_email(options: &[EmailOptions]) -> Result<Vec<Rule>> {
    let defaults = [EmailOptions::default()];
    let options = if options.is_empty() { &defaults } else { options };
    options
        .iter()
        .map(|opts| {
            Ok(Rule {
                kind: RuleKind::EmailValidation {
                    block: opts.block.clone().unwrap_or_default(),
                    require_top_level_domain: opts.require_top_level_domain.unwrap_or(true),
                    allow_domain_literal: opts.allow_domain_literal.unwrap_or(false),
                },
                priority: PRIORITY_EMAIL,
                mode: opts.mode,
            })
        })
        .collect()
}

/// Sensitive-information scanning. With no options, emits one default rule
/// that denies every detected entity.
pub fn sensitive_info(options: &[SensitiveInfoOptions]) -> Result<Vec<Rule>> {
    let defaults = [SensitiveInfoOptions::default()];
    let options = if options.is_empty() { &defaults } else { options };
    options
        .iter()
        .map(|opts| {
            if opts.allow.is_some() && opts.deny.is_some() {
                return Err(ReqShieldError::InvalidRule(
                    "sensitive info cannot have both allow and deny lists".to_string(),
                ));
            }
            Ok(Rule {
                kind: RuleKind::SensitiveInfo {
                    allow: opts.allow.clone().unwrap_or_default(),
                    deny: opts.deny.clone().unwrap_or_default(),
                    context_window_size: opts.context_window_size.unwrap_or(1),
                    detect: opts.detect.clone(),
                },
                priority: PRIORITY_SENSITIVE_INFO,
                mode: opts.mode,
            })
        })
        .collect()
}

/// Catch-all shield heuristics. With no options, emits one default rule.
pub fn shield(options: &[ShieldOptions]) -> Result<Vec<Rule>> {
    let defaults = [ShieldOptions::default()];
    let options = if options.is_empty() { &defaults } else { options };
    Ok(options
        .iter()
        .map(|opts| Rule {
            kind: RuleKind::Shield,
            priority: PRIORITY_SHIELD,
            mode: opts.mode,
        })
        .collect())
}

/// Signup protection: the concatenation of a sliding-window rate limit, bot
/// detection and email validation built from the sub-options. Note the
/// asymmetry: an absent `rate_limit` contributes no rule, while absent
/// `bots`/`email` contribute their default rules.
pub fn protect_signup(options: &[ProtectSignupOptions]) -> Result<Vec<Rule>> {
    let defaults = [ProtectSignupOptions::default()];
    let options = if options.is_empty() { &defaults } else { options };
    let mut rules = Vec::new();
    for opts in options {
        match &opts.rate_limit {
            Some(rate_limit) => rules.extend(sliding_window(std::slice::from_ref(rate_limit))?),
            None => rules.extend(sliding_window(&[])?),
        }
        match &opts.bots {
            Some(bots) => rules.extend(detect_bot(std::slice::from_ref(bots))?),
            None => rules.extend(detect_bot(&[])?),
        }
        match &opts.email {
            Some(email) => rules.extend(validate_email(std::slice::from_ref(email))?),
            None => rules.extend(validate_email(&[])?),
        }
    }
    Ok(rules)
}
