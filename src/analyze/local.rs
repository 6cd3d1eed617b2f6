//! Built-in, fully in-process analyzer.
//!
//! Fingerprints are a SHA-256 digest over the site key and the resolved
//! characteristic values. Bot detection matches the user agent against a
//! table of well-known client signatures. Email validation is syntactic plus
//! small built-in disposable/free provider tables. Sensitive-info scanning
//! tokenizes the body and runs regex detectors per token.

use std::net::IpAddr;

use percent_encoding::percent_decode_str;
use regex::Regex;
use sha2::{Digest, Sha256};

use super::{
    bots, AnalyzeContext, Analyzer, BotVerdict, EmailValidationConfig, EmailVerdict,
    SensitiveInfoVerdict, Validity,
};
use crate::decision::{EmailType, Entity};
use crate::error::{ReqShieldError, Result};
use crate::request::RequestDetails;
use crate::rules::DetectFn;

/// User-agent fragment (lowercased) → well-known bot identity.
const BOT_SIGNATURES: &[(&str, &str)] = &[
    ("curl/", bots::CURL),
    ("wget/", bots::WGET),
    ("python-requests", bots::PYTHON_REQUESTS),
    ("go-http-client", bots::GO_HTTP),
    ("scrapy", bots::SCRAPY),
    ("googlebot", bots::GOOGLE_CRAWLER),
    ("bingbot", bots::BING_CRAWLER),
    ("yandexbot", bots::YANDEX_CRAWLER),
    ("gptbot", bots::OPENAI_CRAWLER),
    ("claudebot", bots::ANTHROPIC_CRAWLER),
    ("headlesschrome", bots::HEADLESS_CHROME),
    ("phantomjs", bots::PHANTOMJS),
];

/// Domains of disposable-address providers the local analyzer knows about.
const DISPOSABLE_DOMAINS: &[&str] = &[
    "mailinator.com",
    "guerrillamail.com",
    "10minutemail.com",
    "tempmail.com",
    "yopmail.com",
    "sharklasers.com",
    "trashmail.com",
];

/// Domains of free-mail providers the local analyzer knows about.
const FREE_DOMAINS: &[&str] = &[
    "gmail.com",
    "yahoo.com",
    "hotmail.com",
    "outlook.com",
    "aol.com",
    "icloud.com",
    "proton.me",
];

/// The batteries-included [`Analyzer`].
pub struct LocalAnalyzer {
    email_token: Regex,
    phone_token: Regex,
}

impl LocalAnalyzer {
    pub fn new() -> Self {
        LocalAnalyzer {
            email_token: Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$")
                .expect("static regex"),
            phone_token: Regex::new(r"^\+?[0-9][0-9().\-]{5,14}[0-9]$").expect("static regex"),
        }
    }

    /// Identify the sensitive entity a single body token represents, if any.
    fn builtin_entity(&self, token: &str) -> Option<Entity> {
        if self.email_token.is_match(token) {
            return Some(Entity::Email);
        }
        if token.parse::<IpAddr>().is_ok() {
            return Some(Entity::IpAddress);
        }
        if is_credit_card(token) {
            return Some(Entity::CreditCardNumber);
        }
        if self.phone_token.is_match(token) && digit_count(token) >= 7 {
            return Some(Entity::PhoneNumber);
        }
        None
    }
}

impl Default for LocalAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

fn digit_count(token: &str) -> usize {
    token.chars().filter(char::is_ascii_digit).count()
}

/// 13-19 digits (separators allowed) passing the Luhn checksum.
fn is_credit_card(token: &str) -> bool {
    let digits: Vec<u32> = token
        .chars()
        .filter(|c| !matches!(c, '-' | ' '))
        .map(|c| c.to_digit(10))
        .collect::<Option<_>>()
        .unwrap_or_default();
    if !(13..=19).contains(&digits.len()) {
        return false;
    }
    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 {
                    doubled - 9
                } else {
                    doubled
                }
            } else {
                d
            }
        })
        .sum();
    sum % 10 == 0
}

/// Pull the subscript out of names like `http.request.headers["accept"]`.
fn subscript<'a>(name: &'a str, prefix: &str) -> Option<&'a str> {
    name.strip_prefix(prefix)?
        .strip_prefix("[\"")?
        .strip_suffix("\"]")
}

/// Look up a cookie value in a `Cookie:`-style pair list.
fn cookie_value(cookies: &str, name: &str) -> Option<String> {
    cookies.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name).then(|| value.to_string())
    })
}

/// Look up a query argument, percent-decoded.
fn query_value(query: &str, name: &str) -> Option<String> {
    query
        .trim_start_matches('?')
        .split('&')
        .find_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            (key == name).then(|| percent_decode_str(value).decode_utf8_lossy().into_owned())
        })
}

/// Resolve one characteristic to its value for fingerprinting.
///
/// Well-known names resolve from the request snapshot and contribute an
/// empty string when the field is absent. User-defined names must be present
/// in `extra`; a missing key is an analysis error.
fn characteristic_value(name: &str, details: &RequestDetails) -> Result<String> {
    let value = match name {
        "ip.src" => details.ip.clone(),
        "http.host" => details.host.clone(),
        "http.method" => details.method.clone(),
        "http.request.uri.path" => details.path.clone(),
        _ => {
            if let Some(header) = subscript(name, "http.request.headers") {
                details.headers.get(header).map(str::to_string)
            } else if let Some(cookie) = subscript(name, "http.request.cookie") {
                details
                    .cookies
                    .as_deref()
                    .and_then(|cookies| cookie_value(cookies, cookie))
            } else if let Some(arg) = subscript(name, "http.request.uri.args") {
                details
                    .query
                    .as_deref()
                    .and_then(|query| query_value(query, arg))
            } else {
                return details.extra.get(name).cloned().ok_or_else(|| {
                    ReqShieldError::Analysis(format!(
                        "characteristic \"{name}\" is not present on the request"
                    ))
                });
            }
        }
    };
    Ok(value.unwrap_or_default())
}

/// Partition detected identities into allowed/denied per the rule lists.
/// With an allow list, anything outside it denies; with a deny list, only
/// its members deny; with neither, every detection denies.
fn partition<T: Clone + PartialEq>(detected: Vec<T>, allow: &[T], deny: &[T]) -> (Vec<T>, Vec<T>) {
    let mut allowed = Vec::new();
    let mut denied = Vec::new();
    for item in detected {
        let is_denied = if !allow.is_empty() {
            !allow.contains(&item)
        } else if !deny.is_empty() {
            deny.contains(&item)
        } else {
            true
        };
        let bucket = if is_denied { &mut denied } else { &mut allowed };
        if !bucket.contains(&item) {
            bucket.push(item);
        }
    }
    (allowed, denied)
}

/// Syntactic disqualifiers for one email address.
fn email_disqualifiers(email: &str, config: &EmailValidationConfig) -> Vec<EmailType> {
    let Some((local, domain)) = email.rsplit_once('@') else {
        return vec![EmailType::Invalid];
    };
    if !local_part_ok(local) || email.len() > 254 {
        return vec![EmailType::Invalid];
    }
    if domain.starts_with('[') && domain.ends_with(']') {
        let literal_ok = config.allow_domain_literal
            && domain[1..domain.len() - 1].parse::<IpAddr>().is_ok();
        return if literal_ok {
            vec![]
        } else {
            vec![EmailType::Invalid]
        };
    }
    if !domain_ok(domain, config.require_top_level_domain) {
        return vec![EmailType::Invalid];
    }

    let mut found = Vec::new();
    let domain = domain.to_ascii_lowercase();
    if DISPOSABLE_DOMAINS.contains(&domain.as_str()) {
        found.push(EmailType::Disposable);
    }
    if FREE_DOMAINS.contains(&domain.as_str()) {
        found.push(EmailType::Free);
    }
    found
}

fn local_part_ok(local: &str) -> bool {
    if local.is_empty() || local.len() > 64 {
        return false;
    }
    if local.starts_with('.') || local.ends_with('.') || local.contains("..") {
        return false;
    }
    local.chars().all(|c| {
        c.is_ascii_alphanumeric() || "!#$%&'*+/=?^_`{|}~.-".contains(c)
    })
}

fn domain_ok(domain: &str, require_top_level_domain: bool) -> bool {
    if domain.is_empty() {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    let labels_ok = labels.iter().all(|label| {
        !label.is_empty()
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    });
    if !labels_ok {
        return false;
    }
    if require_top_level_domain {
        let Some(tld) = labels.last().filter(|_| labels.len() >= 2) else {
            return false;
        };
        if tld.len() < 2 || !tld.chars().all(|c| c.is_ascii_alphabetic()) {
            return false;
        }
    }
    true
}

#[async_trait::async_trait]
impl Analyzer for LocalAnalyzer {
    async fn generate_fingerprint(
        &self,
        ctx: &AnalyzeContext<'_>,
        details: &RequestDetails,
    ) -> Result<String> {
        const DEFAULT_CHARACTERISTICS: &[&str] = &["ip.src"];

        let names: Vec<&str> = if ctx.characteristics.is_empty() {
            DEFAULT_CHARACTERISTICS.to_vec()
        } else {
            ctx.characteristics.iter().map(String::as_str).collect()
        };

        let mut hasher = Sha256::new();
        hasher.update(ctx.key.as_bytes());
        for name in names {
            let value = characteristic_value(name, details)?;
            hasher.update(b"|");
            hasher.update(name.as_bytes());
            hasher.update(b"=");
            hasher.update(value.as_bytes());
        }

        let digest = hasher.finalize();
        let mut fingerprint = String::with_capacity(digest.len() * 2);
        for byte in digest {
            fingerprint.push_str(&format!("{byte:02x}"));
        }
        Ok(fingerprint)
    }

    async fn detect_bot(
        &self,
        _ctx: &AnalyzeContext<'_>,
        details: &RequestDetails,
        allow: &[String],
        deny: &[String],
    ) -> Result<BotVerdict> {
        let user_agent = details.headers.get("user-agent").ok_or_else(|| {
            ReqShieldError::Analysis("missing user-agent header".to_string())
        })?;
        let user_agent = user_agent.to_ascii_lowercase();

        let mut detected: Vec<String> = Vec::new();
        for (fragment, identity) in BOT_SIGNATURES {
            if user_agent.contains(fragment) && !detected.iter().any(|d| d == identity) {
                detected.push((*identity).to_string());
            }
        }

        let (allowed, denied) = partition(detected, allow, deny);
        Ok(BotVerdict { allowed, denied })
    }

    async fn is_valid_email(
        &self,
        _ctx: &AnalyzeContext<'_>,
        email: &str,
        config: &EmailValidationConfig,
    ) -> Result<EmailVerdict> {
        let detected = email_disqualifiers(email, config);
        let blocked: Vec<EmailType> = if config.block.is_empty() {
            detected
        } else {
            detected
                .into_iter()
                .filter(|kind| config.block.contains(kind))
                .collect()
        };
        let validity = if blocked.is_empty() {
            Validity::Valid
        } else {
            Validity::Invalid
        };
        Ok(EmailVerdict { validity, blocked })
    }

    async fn detect_sensitive_info(
        &self,
        _ctx: &AnalyzeContext<'_>,
        body: &str,
        allow: &[Entity],
        deny: &[Entity],
        context_window_size: usize,
        detect: Option<&DetectFn>,
    ) -> Result<SensitiveInfoVerdict> {
        let tokens: Vec<&str> = body.split_whitespace().collect();
        let mut marks: Vec<Option<Entity>> = vec![None; tokens.len()];

        if let Some(DetectFn(custom)) = detect {
            let window = context_window_size.max(1).min(tokens.len().max(1));
            if !tokens.is_empty() {
                for (start, chunk) in tokens.windows(window).enumerate() {
                    for (offset, entity) in custom(chunk).into_iter().enumerate() {
                        if let Some(entity) = entity {
                            let index = start + offset;
                            if index < marks.len() && marks[index].is_none() {
                                marks[index] = Some(entity);
                            }
                        }
                    }
                }
            }
        }

        let mut detected = Vec::new();
        for (index, token) in tokens.iter().enumerate() {
            let entity = match marks[index] {
                Some(entity) => Some(entity),
                None => self.builtin_entity(token),
            };
            if let Some(entity) = entity {
                detected.push(entity);
            }
        }

        let (allowed, denied) = partition(detected, allow, deny);
        Ok(SensitiveInfoVerdict { allowed, denied })
    }
}
