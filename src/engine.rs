//! The decision engine.
//!
//! An [`Engine`] owns a configured rule set and, per request, computes the
//! client fingerprint, short-circuits on cached blocks, evaluates local
//! rules in priority order, escalates to the remote [`Client`] when local
//! evaluation cannot decide, and reports every outcome asynchronously.
//!
//! `protect` never fails: anything that goes wrong inside it is recovered
//! into an ERROR rule result or an ERROR decision, so infrastructure
//! outages degrade to the caller's fail-open policy instead of blocking
//! traffic.

use std::sync::Arc;

use crate::analyze::{AnalyzeContext, Analyzer, LocalAnalyzer};
use crate::cache::{now_epoch, BlockCache};
use crate::client::Client;
use crate::context::{AdapterContext, Context};
use crate::decision::{Conclusion, Decision, Reason, RuleResult};
use crate::error::{ReqShieldError, Result};
use crate::log::Logger;
use crate::request::{ProtectRequest, RequestDetails};
use crate::rules::{sort_by_priority, Mode, Rule, RuleKind};

/// Upper bound on the rule list; `protect` refuses anything beyond it.
pub const MAX_RULES: usize = 10;

const RULE_COUNT_MESSAGE: &str = "Only 10 rules may be specified";

/// Builds an [`Engine`], failing when a required collaborator is missing.
pub struct EngineBuilder {
    key: String,
    rules: Vec<Rule>,
    characteristics: Vec<String>,
    client: Option<Arc<dyn Client>>,
    log: Option<Arc<dyn Logger>>,
    analyzer: Option<Arc<dyn Analyzer>>,
}

impl EngineBuilder {
    /// Append rules, typically the output of one of the rule constructors.
    pub fn rules(mut self, rules: Vec<Rule>) -> Self {
        self.rules.extend(rules);
        self
    }

    /// Characteristics the fingerprint is derived from, and the default
    /// rate-limit key.
    pub fn characteristics(mut self, characteristics: Vec<String>) -> Self {
        self.characteristics = characteristics;
        self
    }

    pub fn client(mut self, client: Arc<dyn Client>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn logger(mut self, log: Arc<dyn Logger>) -> Self {
        self.log = Some(log);
        self
    }

    /// Override the built-in [`LocalAnalyzer`].
    pub fn analyzer(mut self, analyzer: Arc<dyn Analyzer>) -> Self {
        self.analyzer = Some(analyzer);
        self
    }

    pub fn build(self) -> Result<Engine> {
        let client = self.client.ok_or_else(|| {
            ReqShieldError::InvalidConfig("a client is required".to_string())
        })?;
        let log = self.log.ok_or_else(|| {
            ReqShieldError::InvalidConfig("a logger is required".to_string())
        })?;
        let analyzer = self
            .analyzer
            .unwrap_or_else(|| Arc::new(LocalAnalyzer::new()));

        let mut rules = self.rules;
        sort_by_priority(&mut rules);

        Ok(Engine {
            key: self.key,
            rules: Arc::new(rules),
            characteristics: Arc::new(self.characteristics),
            client,
            log,
            analyzer,
            cache: Arc::new(BlockCache::new()),
        })
    }
}

/// The configured decision engine. Cheap to clone; clones and
/// [`with_rule`](Engine::with_rule) views share the client, logger, analyzer
/// and block cache.
#[derive(Clone)]
pub struct Engine {
    key: String,
    rules: Arc<Vec<Rule>>,
    characteristics: Arc<Vec<String>>,
    client: Arc<dyn Client>,
    log: Arc<dyn Logger>,
    analyzer: Arc<dyn Analyzer>,
    cache: Arc<BlockCache>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("key", &self.key)
            .field("rules", &self.rules)
            .finish_non_exhaustive()
    }
}

impl Engine {
    pub fn builder(key: impl Into<String>) -> EngineBuilder {
        EngineBuilder {
            key: key.into(),
            rules: Vec::new(),
            characteristics: Vec::new(),
            client: None,
            log: None,
            analyzer: None,
        }
    }

    /// The configured rules, sorted by priority.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// A new engine view with `rule` appended and the list re-sorted. The
    /// original engine is unaffected; the block cache is shared so the view
    /// observes this engine's blocks.
    pub fn with_rule(&self, rule: Rule) -> Engine {
        let mut rules = (*self.rules).clone();
        rules.push(rule);
        sort_by_priority(&mut rules);
        Engine {
            rules: Arc::new(rules),
            ..self.clone()
        }
    }

    /// Decide whether to allow the request. Always returns a [`Decision`];
    /// see the module docs for the fail-open guarantees.
    pub async fn protect(
        &self,
        adapter: Arc<dyn AdapterContext>,
        request: Option<ProtectRequest>,
    ) -> Decision {
        let body_fallback = request.as_ref().and_then(|r| r.body.clone());
        let details = RequestDetails::from_request(request.as_ref());

        let actx = AnalyzeContext::new(&self.key, &self.characteristics, self.log.as_ref());
        let fingerprint = match self.analyzer.generate_fingerprint(&actx, &details).await {
            Ok(fingerprint) => fingerprint,
            Err(err) => {
                self.log
                    .error(&format!("failed to fingerprint request: {err}"));
                return Decision {
                    id: Decision::new_id(),
                    conclusion: Conclusion::Error,
                    reason: Reason::error(err),
                    ttl: 0,
                    results: Vec::new(),
                };
            }
        };

        let context = Context::new(
            self.key.clone(),
            fingerprint,
            (*self.characteristics).clone(),
            self.log.clone(),
            adapter,
            body_fallback,
        );

        if self.rules.len() > MAX_RULES {
            let decision = Decision {
                id: Decision::new_id(),
                conclusion: Conclusion::Error,
                reason: Reason::Error {
                    message: RULE_COUNT_MESSAGE.to_string(),
                },
                ttl: 0,
                results: Vec::new(),
            };
            self.spawn_report(&context, &details, &decision, &[]);
            return decision;
        }

        // Working copy for this request: rate-limit rules without their own
        // characteristics inherit the engine-level ones, even when that list
        // is empty, so the remote service always sees an explicit key
        // derivation. The rules go over the wire exactly as evaluated here.
        let mut rules = (*self.rules).clone();
        for rule in &mut rules {
            if let RuleKind::TokenBucket { characteristics, .. }
            | RuleKind::FixedWindow { characteristics, .. }
            | RuleKind::SlidingWindow { characteristics, .. } = &mut rule.kind
            {
                if characteristics.is_none() {
                    *characteristics = Some((*self.characteristics).clone());
                }
            }
        }

        let mut results: Vec<RuleResult> = rules
            .iter()
            .enumerate()
            .map(|(index, rule)| RuleResult {
                rule_id: rule_id(rule, index),
                ..RuleResult::not_run()
            })
            .collect();

        if rules.is_empty() {
            self.log
                .warn("no rules configured, requests will not be protected");
        } else if let Some(reason) = self.cache.get(&context.fingerprint) {
            let decision = Decision {
                id: Decision::new_id(),
                conclusion: Conclusion::Deny,
                reason,
                ttl: self.cache.ttl(&context.fingerprint),
                results,
            };
            self.spawn_report(&context, &details, &decision, &rules);
            return decision;
        }

        for index in 0..rules.len() {
            let rule = &rules[index];
            if !rule.is_local() {
                continue;
            }

            let result = match rule.validate(&context, &details) {
                Err(err) => error_result(err),
                Ok(()) => match rule
                    .protect(self.analyzer.as_ref(), &context, &details)
                    .await
                {
                    Ok(result) => result,
                    Err(err) => error_result(err),
                },
            };
            results[index] = RuleResult {
                rule_id: rule_id(rule, index),
                ..result
            };

            if results[index].is_denied() {
                let decision = Decision {
                    id: Decision::new_id(),
                    conclusion: Conclusion::Deny,
                    reason: results[index].reason.clone(),
                    ttl: results[index].ttl,
                    results: results.clone(),
                };
                self.spawn_report(&context, &details, &decision, &rules);

                if rule.mode == Mode::Live {
                    if decision.ttl > 0 {
                        self.cache.set(
                            &context.fingerprint,
                            decision.reason.clone(),
                            now_epoch() + u64::from(decision.ttl),
                        );
                    }
                    return decision;
                }
                self.log.warn(&format!(
                    "{} rule would have denied the request, but dry run mode is enabled",
                    rule.type_name()
                ));
            }
        }

        match self.client.decide(&context, &details, &rules).await {
            Ok(decision) => {
                if decision.conclusion == Conclusion::Deny && decision.ttl > 0 {
                    self.cache.set(
                        &context.fingerprint,
                        decision.reason.clone(),
                        now_epoch() + u64::from(decision.ttl),
                    );
                }
                decision
            }
            Err(err) => {
                self.log
                    .debug(&format!("remote decision unavailable: {err}"));
                let decision = Decision {
                    id: Decision::new_id(),
                    conclusion: Conclusion::Error,
                    reason: Reason::error(err),
                    ttl: 0,
                    results,
                };
                self.spawn_report(&context, &details, &decision, &rules);
                decision
            }
        }
    }

    /// Fire-and-forget reporting: errors are logged through the context's
    /// logger and never reach the decision path.
    fn spawn_report(
        &self,
        context: &Context,
        details: &RequestDetails,
        decision: &Decision,
        rules: &[Rule],
    ) {
        let client = self.client.clone();
        let context = context.clone();
        let details = details.clone();
        let decision = decision.clone();
        let rules = rules.to_vec();
        tokio::spawn(async move {
            if let Err(err) = client.report(&context, &details, &decision, &rules).await {
                context
                    .log
                    .error(&format!("failed to report decision: {err}"));
            }
        });
    }
}

/// Stable per-request identifier for a rule's result slot, derived from the
/// rule kind and its position in the sorted list.
fn rule_id(rule: &Rule, index: usize) -> String {
    format!("{}-{}", rule.type_name().to_ascii_lowercase(), index)
}

fn error_result(err: ReqShieldError) -> RuleResult {
    RuleResult {
        rule_id: String::new(),
        state: crate::decision::RuleState::Run,
        conclusion: Conclusion::Error,
        reason: Reason::error(err),
        ttl: 0,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use super::*;
    use crate::context::NoopAdapter;
    use crate::decision::RuleState;
    use crate::headers::HeaderMap;
    use crate::log::test_support::MemoryLogger;
    use crate::rules::builders::*;

    /// Records decide/report traffic and answers with a configured decision.
    struct StubClient {
        conclusion: Conclusion,
        ttl: u32,
        fail_decide: bool,
        decide_calls: Arc<Mutex<usize>>,
        reports: Arc<Mutex<Vec<(Conclusion, usize)>>>,
    }

    impl StubClient {
        fn allowing() -> Arc<Self> {
            Arc::new(StubClient {
                conclusion: Conclusion::Allow,
                ttl: 0,
                fail_decide: false,
                decide_calls: Arc::default(),
                reports: Arc::default(),
            })
        }

        fn denying(ttl: u32) -> Arc<Self> {
            Arc::new(StubClient {
                conclusion: Conclusion::Deny,
                ttl,
                fail_decide: false,
                decide_calls: Arc::default(),
                reports: Arc::default(),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(StubClient {
                conclusion: Conclusion::Allow,
                ttl: 0,
                fail_decide: true,
                decide_calls: Arc::default(),
                reports: Arc::default(),
            })
        }

        fn decide_count(&self) -> usize {
            *self.decide_calls.lock().unwrap()
        }

        async fn reports(&self) -> Vec<(Conclusion, usize)> {
            // Reports run on a spawned task; give it a beat to drain.
            tokio::time::sleep(Duration::from_millis(25)).await;
            self.reports.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl Client for StubClient {
        async fn decide(
            &self,
            _ctx: &Context,
            _details: &RequestDetails,
            rules: &[Rule],
        ) -> Result<Decision> {
            *self.decide_calls.lock().unwrap() += 1;
            if self.fail_decide {
                return Err(ReqShieldError::Remote("decide timed out".to_string()));
            }
            Ok(Decision {
                id: "remote_1".to_string(),
                conclusion: self.conclusion,
                reason: match self.conclusion {
                    Conclusion::Deny => Reason::Shield {
                        shield_triggered: true,
                    },
                    _ => Reason::Generic,
                },
                ttl: self.ttl,
                results: rules.iter().map(|_| RuleResult::not_run()).collect(),
            })
        }

        async fn report(
            &self,
            _ctx: &Context,
            _details: &RequestDetails,
            decision: &Decision,
            rules: &[Rule],
        ) -> Result<()> {
            self.reports
                .lock()
                .unwrap()
                .push((decision.conclusion, rules.len()));
            Ok(())
        }
    }

    fn engine_with(client: Arc<StubClient>, rules: Vec<Rule>) -> Engine {
        let (logger, _) = MemoryLogger::new();
        Engine::builder("site_test")
            .rules(rules)
            .client(client)
            .logger(logger)
            .build()
            .unwrap()
    }

    fn curl_request() -> Option<ProtectRequest> {
        let mut headers = HeaderMap::new();
        headers.insert("User-Agent", "curl/8.0.1");
        Some(ProtectRequest {
            ip: Some("203.0.113.7".to_string()),
            headers,
            ..Default::default()
        })
    }

    #[test]
    fn build_requires_client_and_logger() {
        let (logger, _) = MemoryLogger::new();
        let missing_client = Engine::builder("k").logger(logger).build();
        assert!(matches!(
            missing_client.unwrap_err(),
            ReqShieldError::InvalidConfig(_)
        ));

        let missing_logger = Engine::builder("k").client(StubClient::allowing()).build();
        assert!(matches!(
            missing_logger.unwrap_err(),
            ReqShieldError::InvalidConfig(_)
        ));
    }

    #[tokio::test]
    async fn live_bot_deny_short_circuits_and_caches() {
        let client = StubClient::allowing();
        let engine = engine_with(
            client.clone(),
            detect_bot(&[BotOptions {
                mode: Mode::Live,
                deny: Some(vec!["CURL".to_string()]),
                ..Default::default()
            }])
            .unwrap(),
        );

        let decision = engine.protect(Arc::new(NoopAdapter), curl_request()).await;
        assert_eq!(decision.conclusion, Conclusion::Deny);
        assert_eq!(decision.ttl, 60);
        assert_eq!(decision.results.len(), 1);
        assert_eq!(decision.results[0].state, RuleState::Run);
        assert!(decision.results[0].is_denied());
        // The remote service is never consulted after a live local DENY.
        assert_eq!(client.decide_count(), 0);
        assert_eq!(client.reports().await, vec![(Conclusion::Deny, 1)]);
    }

    #[tokio::test]
    async fn second_request_is_served_from_the_block_cache() {
        let client = StubClient::allowing();
        let engine = engine_with(
            client.clone(),
            detect_bot(&[BotOptions {
                mode: Mode::Live,
                deny: Some(vec!["CURL".to_string()]),
                ..Default::default()
            }])
            .unwrap(),
        );

        let first = engine.protect(Arc::new(NoopAdapter), curl_request()).await;
        assert_eq!(first.conclusion, Conclusion::Deny);

        let second = engine.protect(Arc::new(NoopAdapter), curl_request()).await;
        assert_eq!(second.conclusion, Conclusion::Deny);
        assert!(second.ttl > 0);
        assert!(second.ttl <= 60);
        // Served from cache: no rule ran.
        assert_eq!(second.results.len(), 1);
        assert_eq!(second.results[0].state, RuleState::NotRun);
    }

    #[tokio::test]
    async fn dry_run_deny_is_overridden_and_reported() {
        let client = StubClient::allowing();
        let (logger, lines) = MemoryLogger::new();
        let engine = Engine::builder("site_test")
            .rules(
                detect_bot(&[BotOptions {
                    deny: Some(vec!["CURL".to_string()]),
                    ..Default::default()
                }])
                .unwrap(),
            )
            .client(client.clone())
            .logger(logger)
            .build()
            .unwrap();

        let decision = engine.protect(Arc::new(NoopAdapter), curl_request()).await;
        // The client decides because the dry-run DENY does not terminate.
        assert_eq!(decision.conclusion, Conclusion::Allow);
        assert_eq!(client.decide_count(), 1);
        // The intermediate DENY was still reported.
        assert_eq!(client.reports().await, vec![(Conclusion::Deny, 1)]);
        assert!(lines
            .lock()
            .unwrap()
            .iter()
            .any(|(level, message)| level == "warn" && message.contains("dry run")));
    }

    #[tokio::test]
    async fn dry_run_deny_does_not_populate_the_cache() {
        let client = StubClient::allowing();
        let engine = engine_with(
            client.clone(),
            detect_bot(&[BotOptions {
                deny: Some(vec!["CURL".to_string()]),
                ..Default::default()
            }])
            .unwrap(),
        );

        engine.protect(Arc::new(NoopAdapter), curl_request()).await;
        let second = engine.protect(Arc::new(NoopAdapter), curl_request()).await;
        // Both requests reach the remote service.
        assert_eq!(second.conclusion, Conclusion::Allow);
        assert_eq!(client.decide_count(), 2);
    }

    #[tokio::test]
    async fn remote_failure_fails_open_with_local_results() {
        let client = StubClient::failing();
        let engine = engine_with(
            client.clone(),
            validate_email(&[EmailOptions {
                mode: Mode::Live,
                ..Default::default()
            }])
            .unwrap(),
        );

        let request = Some(ProtectRequest {
            email: Some("user@example.com".to_string()),
            ..Default::default()
        });
        let decision = engine.protect(Arc::new(NoopAdapter), request).await;
        assert_eq!(decision.conclusion, Conclusion::Error);
        assert!(decision.reason.is_error());
        // The local email result is preserved on the error decision.
        assert_eq!(decision.results.len(), 1);
        assert_eq!(decision.results[0].state, RuleState::Run);
        assert_eq!(decision.results[0].conclusion, Conclusion::Allow);
        assert_eq!(client.reports().await, vec![(Conclusion::Error, 1)]);
    }

    #[tokio::test]
    async fn rule_errors_do_not_stop_later_rules() {
        let client = StubClient::allowing();
        let mut rules = validate_email(&[EmailOptions {
            mode: Mode::Live,
            ..Default::default()
        }])
        .unwrap();
        // Bot rule runs before email; without a user-agent it errors.
        rules.extend(
            detect_bot(&[BotOptions {
                mode: Mode::Live,
                deny: Some(vec!["CURL".to_string()]),
                ..Default::default()
            }])
            .unwrap(),
        );
        let engine = engine_with(client.clone(), rules);

        let request = Some(ProtectRequest {
            email: Some("not-an-email".to_string()),
            ..Default::default()
        });
        let decision = engine.protect(Arc::new(NoopAdapter), request).await;

        // Bot validation failed but the email rule still ran and denied.
        assert_eq!(decision.conclusion, Conclusion::Deny);
        assert_eq!(decision.results.len(), 2);
        assert_eq!(decision.results[0].conclusion, Conclusion::Error);
        assert_eq!(decision.results[0].state, RuleState::Run);
        assert_eq!(decision.results[1].conclusion, Conclusion::Deny);
    }

    #[tokio::test]
    async fn empty_rule_list_goes_straight_to_the_client() {
        let client = StubClient::allowing();
        let (logger, lines) = MemoryLogger::new();
        let engine = Engine::builder("site_test")
            .client(client.clone())
            .logger(logger)
            .build()
            .unwrap();

        let decision = engine.protect(Arc::new(NoopAdapter), curl_request()).await;
        assert_eq!(decision.conclusion, Conclusion::Allow);
        assert_eq!(client.decide_count(), 1);
        assert!(lines
            .lock()
            .unwrap()
            .iter()
            .any(|(level, _)| level == "warn"));
    }

    #[tokio::test]
    async fn remote_deny_with_ttl_populates_the_cache() {
        let client = StubClient::denying(120);
        let engine = engine_with(client.clone(), shield(&[]).unwrap());

        let first = engine.protect(Arc::new(NoopAdapter), curl_request()).await;
        assert_eq!(first.conclusion, Conclusion::Deny);
        assert_eq!(client.decide_count(), 1);

        let second = engine.protect(Arc::new(NoopAdapter), curl_request()).await;
        assert_eq!(second.conclusion, Conclusion::Deny);
        // Cache hit; the client is not consulted again.
        assert_eq!(client.decide_count(), 1);
        assert!(second.ttl > 0);
        assert!(second.ttl <= 120);
    }

    #[tokio::test]
    async fn eleven_rules_is_an_error_decision_with_empty_report() {
        let client = StubClient::allowing();
        let options: Vec<ShieldOptions> = (0..11).map(|_| ShieldOptions::default()).collect();
        let engine = engine_with(client.clone(), shield(&options).unwrap());

        let decision = engine.protect(Arc::new(NoopAdapter), curl_request()).await;
        assert_eq!(decision.conclusion, Conclusion::Error);
        assert!(decision.results.is_empty());
        assert!(matches!(
            decision.reason,
            Reason::Error { ref message } if message == RULE_COUNT_MESSAGE
        ));
        assert_eq!(client.decide_count(), 0);
        assert_eq!(client.reports().await, vec![(Conclusion::Error, 0)]);
    }

    #[tokio::test]
    async fn exactly_ten_rules_evaluate_normally() {
        let client = StubClient::allowing();
        let options: Vec<ShieldOptions> = (0..10).map(|_| ShieldOptions::default()).collect();
        let engine = engine_with(client.clone(), shield(&options).unwrap());

        let decision = engine.protect(Arc::new(NoopAdapter), curl_request()).await;
        assert_eq!(decision.conclusion, Conclusion::Allow);
        assert_eq!(client.decide_count(), 1);
    }

    #[tokio::test]
    async fn with_rule_returns_a_new_sorted_view() {
        let client = StubClient::allowing();
        let engine = engine_with(client.clone(), validate_email(&[]).unwrap());
        assert_eq!(engine.rules().len(), 1);

        let extended = engine.with_rule(shield(&[]).unwrap().remove(0));
        assert_eq!(engine.rules().len(), 1);
        assert_eq!(extended.rules().len(), 2);
        // Shield (priority 2) sorts ahead of email (priority 5).
        assert_eq!(extended.rules()[0].type_name(), "SHIELD");
        assert_eq!(extended.rules()[1].type_name(), "EMAIL");
    }

    #[tokio::test]
    async fn with_rule_views_share_the_block_cache() {
        let client = StubClient::allowing();
        let engine = engine_with(
            client.clone(),
            detect_bot(&[BotOptions {
                mode: Mode::Live,
                deny: Some(vec!["CURL".to_string()]),
                ..Default::default()
            }])
            .unwrap(),
        );

        let first = engine.protect(Arc::new(NoopAdapter), curl_request()).await;
        assert_eq!(first.conclusion, Conclusion::Deny);

        let view = engine.with_rule(shield(&[]).unwrap().remove(0));
        let second = view.protect(Arc::new(NoopAdapter), curl_request()).await;
        // The view observes the parent's cached block.
        assert_eq!(second.conclusion, Conclusion::Deny);
        assert_eq!(second.results.len(), 2);
        assert!(second
            .results
            .iter()
            .all(|result| result.state == RuleState::NotRun));
    }

    /// Records the rule list handed to `decide`.
    struct CapturingClient {
        seen: Arc<Mutex<Vec<Rule>>>,
    }

    #[async_trait::async_trait]
    impl Client for CapturingClient {
        async fn decide(
            &self,
            _ctx: &Context,
            _details: &RequestDetails,
            rules: &[Rule],
        ) -> Result<Decision> {
            *self.seen.lock().unwrap() = rules.to_vec();
            Ok(Decision {
                id: "remote_1".to_string(),
                conclusion: Conclusion::Allow,
                reason: Reason::Generic,
                ttl: 0,
                results: rules.iter().map(|_| RuleResult::not_run()).collect(),
            })
        }

        async fn report(
            &self,
            _ctx: &Context,
            _details: &RequestDetails,
            _decision: &Decision,
            _rules: &[Rule],
        ) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn rate_limit_rules_inherit_engine_characteristics() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (logger, _) = MemoryLogger::new();
        let engine = Engine::builder("site_test")
            .characteristics(vec!["ip.src".to_string(), "http.host".to_string()])
            .rules(
                sliding_window(&[SlidingWindowOptions {
                    max: 10,
                    interval: 60.into(),
                    ..Default::default()
                }])
                .unwrap(),
            )
            .client(Arc::new(CapturingClient { seen: seen.clone() }))
            .logger(logger)
            .build()
            .unwrap();

        engine.protect(Arc::new(NoopAdapter), curl_request()).await;

        let rules = seen.lock().unwrap();
        match &rules[0].kind {
            RuleKind::SlidingWindow {
                characteristics, ..
            } => {
                assert_eq!(
                    characteristics.as_ref().unwrap(),
                    &vec!["ip.src".to_string(), "http.host".to_string()]
                );
            }
            other => panic!("unexpected kind: {other:?}"),
        }
        // The configured engine itself is untouched.
        match &engine.rules()[0].kind {
            RuleKind::SlidingWindow {
                characteristics, ..
            } => assert!(characteristics.is_none()),
            other => panic!("unexpected kind: {other:?}"),
        }
    }

    #[tokio::test]
    async fn rate_limit_rules_inherit_even_empty_characteristics() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (logger, _) = MemoryLogger::new();
        let engine = Engine::builder("site_test")
            .rules(
                sliding_window(&[SlidingWindowOptions {
                    max: 10,
                    interval: 60.into(),
                    ..Default::default()
                }])
                .unwrap(),
            )
            .client(Arc::new(CapturingClient { seen: seen.clone() }))
            .logger(logger)
            .build()
            .unwrap();

        engine.protect(Arc::new(NoopAdapter), curl_request()).await;

        // An engine configured with zero characteristics still stamps the
        // rule with an explicit empty list, never `None`.
        let rules = seen.lock().unwrap();
        match &rules[0].kind {
            RuleKind::SlidingWindow {
                characteristics, ..
            } => assert_eq!(characteristics.as_deref(), Some(&[][..])),
            other => panic!("unexpected kind: {other:?}"),
        }
    }

    #[tokio::test]
    async fn results_carry_engine_assigned_rule_ids() {
        let client = StubClient::allowing();
        let mut rules = shield(&[]).unwrap();
        rules.extend(
            detect_bot(&[BotOptions {
                mode: Mode::Live,
                deny: Some(vec!["CURL".to_string()]),
                ..Default::default()
            }])
            .unwrap(),
        );
        let engine = engine_with(client.clone(), rules);

        let decision = engine.protect(Arc::new(NoopAdapter), curl_request()).await;

        // Sorted order: shield (remote, NOT_RUN) then bot (ran and denied).
        assert_eq!(decision.conclusion, Conclusion::Deny);
        assert_eq!(decision.results[0].rule_id, "shield-0");
        assert_eq!(decision.results[0].state, RuleState::NotRun);
        assert_eq!(decision.results[1].rule_id, "bot-1");
        assert_eq!(decision.results[1].conclusion, Conclusion::Deny);
        assert!(decision.results.iter().all(|r| !r.rule_id.is_empty()));
    }

    #[tokio::test]
    async fn missing_user_defined_characteristic_fails_open() {
        let client = StubClient::allowing();
        let (logger, lines) = MemoryLogger::new();
        let engine = Engine::builder("site_test")
            .characteristics(vec!["userId".to_string()])
            .rules(shield(&[]).unwrap())
            .client(client.clone())
            .logger(logger)
            .build()
            .unwrap();

        let decision = engine.protect(Arc::new(NoopAdapter), None).await;
        assert_eq!(decision.conclusion, Conclusion::Error);
        assert_eq!(client.decide_count(), 0);
        assert!(lines
            .lock()
            .unwrap()
            .iter()
            .any(|(level, _)| level == "error"));
    }

    #[tokio::test]
    async fn missing_request_is_treated_as_empty() {
        let client = StubClient::allowing();
        let engine = engine_with(client.clone(), shield(&[]).unwrap());
        let decision = engine.protect(Arc::new(NoopAdapter), None).await;
        assert_eq!(decision.conclusion, Conclusion::Allow);
    }
}
