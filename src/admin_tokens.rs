// src/admin_tokens.rs

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use rand::Rng;

use crate::config::{ADMIN_SWEEP_INTERVAL_SECS, ADMIN_TOKEN_TTL_SECS};

/// Character set for opaque admin tokens: a-z, A-Z, 0-9, -, _
const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789-_";

const TOKEN_LEN: usize = 32;

/// Process-local registry of admin panel tokens.
///
/// Tokens are minted after a successful admin code check and expire one hour
/// after their last successful verification (sliding window). The registry is
/// injected through `AppState` so tests can drive it directly and the sweeper
/// lifecycle stays tied to the process in `main`.
///
/// A single mutex guards the map: verification is a read-modify-write
/// (expiry slide) and must not race with the sweeper deleting entries.
#[derive(Clone, Default)]
pub struct AdminTokenRegistry {
    inner: Arc<Mutex<HashMap<String, DateTime<Utc>>>>,
}

impl AdminTokenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, DateTime<Utc>>> {
        // A poisoned lock only means a panic mid-update; the map stays usable.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Mints a new opaque token valid for one hour.
    pub fn issue(&self) -> String {
        self.issue_at(Utc::now())
    }

    /// Verifies a token and slides its expiry forward by one hour.
    ///
    /// An expired or unknown token fails verification; expired entries are
    /// removed on the spot.
    pub fn verify(&self, token: &str) -> bool {
        self.verify_at(token, Utc::now())
    }

    /// Removes every entry whose expiry has passed.
    pub fn sweep(&self) {
        self.sweep_at(Utc::now());
    }

    fn issue_at(&self, now: DateTime<Utc>) -> String {
        let mut rng = rand::thread_rng();
        let token: String = (0..TOKEN_LEN)
            .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
            .collect();

        self.lock()
            .insert(token.clone(), now + Duration::seconds(ADMIN_TOKEN_TTL_SECS));
        token
    }

    fn verify_at(&self, token: &str, now: DateTime<Utc>) -> bool {
        let mut map = self.lock();
        match map.get(token) {
            Some(expires_at) if *expires_at > now => {
                map.insert(
                    token.to_string(),
                    now + Duration::seconds(ADMIN_TOKEN_TTL_SECS),
                );
                true
            }
            Some(_) => {
                map.remove(token);
                false
            }
            None => false,
        }
    }

    fn sweep_at(&self, now: DateTime<Utc>) {
        self.lock().retain(|_, expires_at| *expires_at > now);
    }

    /// Spawns the periodic sweep task. Runs for the life of the process.
    pub fn spawn_sweeper(&self) -> tokio::task::JoinHandle<()> {
        let registry = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(std::time::Duration::from_secs(
                ADMIN_SWEEP_INTERVAL_SECS,
            ));
            // First tick fires immediately; harmless on an empty map.
            loop {
                ticker.tick().await;
                registry.sweep();
                tracing::debug!("admin token sweep completed");
            }
        })
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_returns_distinct_tokens() {
        let registry = AdminTokenRegistry::new();
        let a = registry.issue();
        let b = registry.issue();
        assert_eq!(a.len(), 32);
        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_verify_unknown_token_fails() {
        let registry = AdminTokenRegistry::new();
        assert!(!registry.verify("not-a-token"));
    }

    #[test]
    fn test_sliding_expiry_keeps_active_token_alive() {
        let registry = AdminTokenRegistry::new();
        let now = Utc::now();
        let token = registry.issue_at(now);

        // 30 minutes later: still valid, expiry slides forward.
        let later = now + Duration::minutes(30);
        assert!(registry.verify_at(&token, later));

        // Another 45 minutes (75 total): only valid because of the slide.
        let later = later + Duration::minutes(45);
        assert!(registry.verify_at(&token, later));
    }

    #[test]
    fn test_expired_token_fails_and_is_removed() {
        let registry = AdminTokenRegistry::new();
        let now = Utc::now();
        let token = registry.issue_at(now);

        let after_ttl = now + Duration::minutes(61);
        assert!(!registry.verify_at(&token, after_ttl));
        assert_eq!(registry.len(), 0);

        // A second attempt must not resurrect the entry.
        assert!(!registry.verify_at(&token, now + Duration::minutes(5)));
    }

    #[test]
    fn test_sweep_only_drops_expired_entries() {
        let registry = AdminTokenRegistry::new();
        let now = Utc::now();
        let stale = registry.issue_at(now - Duration::hours(2));
        let fresh = registry.issue_at(now);

        registry.sweep_at(now);
        assert_eq!(registry.len(), 1);
        assert!(!registry.verify_at(&stale, now));
        assert!(registry.verify_at(&fresh, now));
    }
}
