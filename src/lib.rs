//! # reqshield
//!
//! **Request-protection SDK core with a fail-open decision engine.**
//!
//! reqshield sits in the request path of a web service and, for each
//! incoming request, produces an ALLOW/DENY/CHALLENGE/ERROR decision by
//! composing security rules: rate limiting, bot detection, email
//! validation, sensitive-information scanning, and a catch-all shield.
//!
//! ## Architecture
//!
//! - **[`engine`]** — the decision engine: fingerprinting, block-cache
//!   short-circuits, priority-ordered local evaluation, remote escalation,
//!   asynchronous reporting
//! - **[`rules`]** — declarative rule constructors and local evaluation
//! - **[`analyze`]** — the [`Analyzer`] seam plus the built-in
//!   [`LocalAnalyzer`]
//! - **[`client`]** — the remote decision service seam (`decide`/`report`)
//! - **[`cache`]** — per-fingerprint block cache with lazy eviction
//! - **[`headers`]** — case-insensitive multi-value header map
//! - **[`duration`]** — `"1h30m"`-style duration parsing for rule options
//! - **[`decision`]** — decision, reason and rule-result value objects
//! - **[`error`]** — unified error types using `thiserror`
//!
//! ## Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use reqshield::{
//!     detect_bot, BotOptions, Engine, HeaderMap, NoopAdapter, ProtectRequest, TracingLogger,
//! };
//!
//! # async fn run(client: Arc<dyn reqshield::Client>) -> reqshield::Result<()> {
//! let engine = Engine::builder("site_1234")
//!     .rules(detect_bot(&[BotOptions {
//!         mode: "LIVE".into(),
//!         deny: Some(vec!["CURL".to_string()]),
//!         ..Default::default()
//!     }])?)
//!     .client(client)
//!     .logger(Arc::new(TracingLogger))
//!     .build()?;
//!
//! let mut headers = HeaderMap::new();
//! headers.insert("User-Agent", "curl/8.0.1");
//! let decision = engine
//!     .protect(
//!         Arc::new(NoopAdapter),
//!         Some(ProtectRequest {
//!             ip: Some("203.0.113.7".to_string()),
//!             headers,
//!             ..Default::default()
//!         }),
//!     )
//!     .await;
//!
//! if decision.is_denied() {
//!     // Reject the request. ERROR decisions are fail-open: treat them as
//!     // allowed unless you implement a stricter policy.
//! }
//! # Ok(())
//! # }
//! ```

pub mod analyze;
pub mod cache;
pub mod client;
pub mod context;
pub mod decision;
pub mod duration;
pub mod engine;
pub mod error;
pub mod headers;
pub mod log;
pub mod request;
pub mod rules;

pub use analyze::{
    AnalyzeContext, Analyzer, BotVerdict, EmailValidationConfig, EmailVerdict, LocalAnalyzer,
    SensitiveInfoVerdict, Validity,
};
pub use cache::BlockCache;
pub use client::Client;
pub use context::{AdapterContext, Context, NoopAdapter};
pub use decision::{Conclusion, Decision, EmailType, Entity, Reason, RuleResult, RuleState};
pub use duration::DurationValue;
pub use engine::{Engine, EngineBuilder, MAX_RULES};
pub use error::{ReqShieldError, Result};
pub use headers::HeaderMap;
pub use log::{Logger, TracingLogger};
pub use request::{ProtectRequest, RequestDetails};
pub use rules::builders::{
    detect_bot, fixed_window, protect_signup, sensitive_info, shield, sliding_window,
    token_bucket, validate_email, BotOptions, EmailOptions, FixedWindowOptions,
    ProtectSignupOptions, SensitiveInfoOptions, ShieldOptions, SlidingWindowOptions,
    TokenBucketOptions,
};
pub use rules::{DetectFn, Mode, Rule, RuleKind};
