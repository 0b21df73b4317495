//! Short-window suppression of repeated mutation requests.
//!
//! Double-taps and client retries often resend the exact same request within
//! a second or two. The guard remembers `(actor, endpoint, payload hash)` for
//! a short TTL and rejects a repeat before it reaches the ledger.
//!
//! This is best-effort only. Money correctness comes from the ledger's row
//! locks and unique references; a process-local guard cannot see requests
//! served by other instances.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::time::Instant;

use crate::error::AppError;

/// SHA-256 of a request payload's canonical JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PayloadHash([u8; 32]);

impl PayloadHash {
    /// Hash any serializable payload.
    ///
    /// Struct fields serialize in declaration order and `serde_json` maps are
    /// sorted, so equal payloads always hash equally.
    pub fn of<T: Serialize + ?Sized>(payload: &T) -> Result<Self, AppError> {
        let bytes = serde_json::to_vec(payload)
            .map_err(|e| AppError::InvalidRequest(format!("Unserializable payload: {e}")))?;
        Ok(PayloadHash(Sha256::digest(&bytes).into()))
    }
}

/// Duplicate-request window, injectable so deployments with several
/// instances can back it with a shared cache.
#[async_trait]
pub trait IdempotencyGuard: Send + Sync {
    /// Returns `false` if the same key was recorded less than the TTL ago;
    /// otherwise records the key and returns `true`.
    async fn check_and_record(&self, actor: &str, endpoint: &str, payload: PayloadHash) -> bool;
}

type WindowKey = (String, String, PayloadHash);

/// Process-local guard backed by a mutex-protected map.
pub struct MemoryIdempotencyGuard {
    ttl: Duration,
    seen: Mutex<HashMap<WindowKey, Instant>>,
}

impl MemoryIdempotencyGuard {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            seen: Mutex::new(HashMap::new()),
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.seen.lock().map(|seen| seen.len()).unwrap_or(0)
    }
}

#[async_trait]
impl IdempotencyGuard for MemoryIdempotencyGuard {
    async fn check_and_record(&self, actor: &str, endpoint: &str, payload: PayloadHash) -> bool {
        let now = Instant::now();
        // A poisoned map only holds timestamps; keep using it.
        let mut seen = self.seen.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let stale_after = self.ttl * 2;
        seen.retain(|_, recorded| now.duration_since(*recorded) <= stale_after);

        let key = (actor.to_string(), endpoint.to_string(), payload);
        if let Some(recorded) = seen.get(&key) {
            if now.duration_since(*recorded) < self.ttl {
                return false;
            }
        }
        seen.insert(key, now);
        true
    }
}

/// Reject `payload` as `DuplicateRequest` if `actor` sent it to `endpoint`
/// within the window.
pub async fn guard<T: Serialize + ?Sized>(
    window: &dyn IdempotencyGuard,
    actor: impl std::fmt::Display,
    endpoint: &str,
    payload: &T,
) -> Result<(), AppError> {
    let hash = PayloadHash::of(payload)?;
    let actor = actor.to_string();
    if window.check_and_record(&actor, endpoint, hash).await {
        Ok(())
    } else {
        tracing::warn!(actor = %actor, endpoint, "duplicate request rejected");
        Err(AppError::DuplicateRequest)
    }
}
