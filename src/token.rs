//! Short-lived request tokens.
//!
//! A front end hands out a token with each page of results and accepts a
//! download request only while that token is live. Tokens expire a fixed
//! TTL after they were created or last renewed.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::TokenConfig;

/// Issues and checks request tokens.
#[derive(Debug)]
pub struct TokenManager {
    /// Token -> expiry.
    tokens: DashMap<Uuid, Instant>,
    ttl: Duration,
}

impl TokenManager {
    pub fn new(ttl: Duration) -> Self {
        Self {
            tokens: DashMap::new(),
            ttl,
        }
    }

    pub fn from_config(config: &TokenConfig) -> Self {
        Self::new(config.ttl())
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a fresh token.
    pub fn create(&self) -> Uuid {
        let token = Uuid::new_v4();
        self.renew(token);
        debug!(token = %token, "Token created");
        token
    }

    /// Restart the token's lifetime. Unknown tokens are (re)admitted.
    pub fn renew(&self, token: Uuid) {
        self.tokens.insert(token, Instant::now() + self.ttl);
    }

    /// Whether `token` is live.
    pub fn check(&self, token: &Uuid) -> bool {
        self.tokens
            .get(token)
            .is_some_and(|expiry| *expiry > Instant::now())
    }

    /// Parse and check a token string.
    pub fn check_str(&self, token: &str) -> bool {
        Uuid::parse_str(token).is_ok_and(|token| self.check(&token))
    }

    /// Remove `token`, returning whether it was live.
    pub fn revoke(&self, token: &Uuid) -> bool {
        self.tokens
            .remove(token)
            .is_some_and(|(_, expiry)| expiry > Instant::now())
    }

    /// Drop every expired token. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.tokens.len();
        self.tokens.retain(|_, expiry| *expiry > now);
        before.saturating_sub(self.tokens.len())
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Purge expired tokens every `every` until `shutdown` fires.
    pub fn spawn_purge(
        self: &Arc<Self>,
        every: Duration,
        shutdown: CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = interval.tick() => {}
                }
                let removed = manager.purge_expired();
                if removed > 0 {
                    info!(removed, "Expired tokens removed");
                }
            }
        })
    }
}
