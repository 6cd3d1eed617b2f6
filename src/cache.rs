//! Process-local block cache.
//!
//! Maps a client fingerprint to the [`Reason`] of a recent DENY and its
//! absolute expiry. Eviction is strictly lazy: expired entries are removed on
//! [`BlockCache::get`], never by a background task. `get` and `set` are
//! individually atomic behind a mutex; concurrent `protect` calls may race on
//! `set` and last-writer-wins is fine because both reasons are valid blocks.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::decision::Reason;

/// Seconds since the Unix epoch.
pub(crate) fn now_epoch() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Fingerprint → (deny reason, absolute expiry) with lazy eviction.
#[derive(Debug, Default)]
pub struct BlockCache {
    entries: Mutex<HashMap<String, (Reason, u64)>>,
}

impl BlockCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached reason for `fingerprint`, if its expiry is still in the
    /// future. An expired entry is removed before returning `None`.
    pub fn get(&self, fingerprint: &str) -> Option<Reason> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        match entries.get(fingerprint) {
            Some((reason, expires_at)) if *expires_at > now_epoch() => Some(reason.clone()),
            Some(_) => {
                entries.remove(fingerprint);
                None
            }
            None => None,
        }
    }

    /// Store a deny reason until `expires_at` (epoch seconds), overwriting
    /// any existing entry.
    pub fn set(&self, fingerprint: &str, reason: Reason, expires_at: u64) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(fingerprint.to_string(), (reason, expires_at));
    }

    /// Remaining lifetime in seconds, saturating at 0. Does not evict.
    pub fn ttl(&self, fingerprint: &str) -> u32 {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries
            .get(fingerprint)
            .map(|(_, expires_at)| expires_at.saturating_sub(now_epoch()))
            .map(|secs| secs.min(u32::MAX as u64) as u32)
            .unwrap_or(0)
    }
}
