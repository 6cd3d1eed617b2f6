//! Local rule evaluation.
//!
//! Each local rule is a `validate`/`protect` pair: `validate` rejects
//! requests that lack the inputs the rule needs, `protect` runs the analysis
//! and produces a [`RuleResult`]. Remote-only rules never reach this module;
//! the engine skips them via [`Rule::is_local`].

use crate::analyze::{AnalyzeContext, Analyzer, EmailValidationConfig, Validity};
use crate::context::Context;
use crate::decision::{Conclusion, Reason, RuleResult, RuleState};
use crate::error::{ReqShieldError, Result};
use crate::request::RequestDetails;
use crate::rules::{Rule, RuleKind};

/// Seconds a local bot DENY may be cached. Email and sensitive-info denials
/// carry no TTL and are never cached.
pub(crate) const BOT_DENY_TTL: u32 = 60;

fn run_result(conclusion: Conclusion, reason: Reason, ttl: u32) -> RuleResult {
    RuleResult {
        rule_id: String::new(),
        state: RuleState::Run,
        conclusion,
        reason,
        ttl,
    }
}

impl Rule {
    /// Check that the request carries what this rule needs. A failure here
    /// becomes an ERROR result for the rule; evaluation of other rules
    /// continues.
    pub(crate) fn validate(&self, _ctx: &Context, details: &RequestDetails) -> Result<()> {
        match &self.kind {
            RuleKind::BotDetection { .. } => {
                if details.headers.has("user-agent") {
                    Ok(())
                } else {
                    Err(ReqShieldError::RuleValidation(
                        "bot detection requires a user-agent header".to_string(),
                    ))
                }
            }
            RuleKind::EmailValidation { .. } => match details.email.as_deref() {
                Some(email) if !email.is_empty() => Ok(()),
                _ => Err(ReqShieldError::RuleValidation(
                    "email validation requires an email on the request".to_string(),
                )),
            },
            _ => Ok(()),
        }
    }

    /// Execute a local rule against the request.
    pub(crate) async fn protect(
        &self,
        analyzer: &dyn Analyzer,
        ctx: &Context,
        details: &RequestDetails,
    ) -> Result<RuleResult> {
        let actx = AnalyzeContext::from_context(ctx);
        match &self.kind {
            RuleKind::BotDetection { allow, deny } => {
                let verdict = analyzer.detect_bot(&actx, details, allow, deny).await?;
                let reason = Reason::Bot {
                    allowed: verdict.allowed,
                    denied: verdict.denied,
                };
                if matches!(&reason, Reason::Bot { denied, .. } if !denied.is_empty()) {
                    Ok(run_result(Conclusion::Deny, reason, BOT_DENY_TTL))
                } else {
                    Ok(run_result(Conclusion::Allow, reason, 0))
                }
            }
            RuleKind::EmailValidation {
                block,
                require_top_level_domain,
                allow_domain_literal,
            } => {
                // validate() guaranteed the email is present.
                let email = details.email.as_deref().unwrap_or_default();
                let config = EmailValidationConfig {
                    block: block.clone(),
                    require_top_level_domain: *require_top_level_domain,
                    allow_domain_literal: *allow_domain_literal,
                };
                let verdict = analyzer.is_valid_email(&actx, email, &config).await?;
                let reason = Reason::Email {
                    email_types: verdict.blocked,
                };
                if verdict.validity == Validity::Invalid {
                    Ok(run_result(Conclusion::Deny, reason, 0))
                } else {
                    Ok(run_result(Conclusion::Allow, reason, 0))
                }
            }
            RuleKind::SensitiveInfo {
                allow,
                deny,
                context_window_size,
                detect,
            } => {
                let body = ctx.body().await.ok_or_else(|| {
                    ReqShieldError::RuleExecution(
                        "request body is not available".to_string(),
                    )
                })?;
                let verdict = analyzer
                    .detect_sensitive_info(
                        &actx,
                        &body,
                        allow,
                        deny,
                        *context_window_size,
                        detect.as_ref(),
                    )
                    .await?;
                let reason = Reason::SensitiveInfo {
                    allowed: verdict.allowed,
                    denied: verdict.denied,
                };
                if matches!(&reason, Reason::SensitiveInfo { denied, .. } if !denied.is_empty()) {
                    Ok(run_result(Conclusion::Deny, reason, 0))
                } else {
                    Ok(run_result(Conclusion::Allow, reason, 0))
                }
            }
            // Remote-only rules are filtered out by the engine.
            _ => Ok(RuleResult::not_run()),
        }
    }
}
