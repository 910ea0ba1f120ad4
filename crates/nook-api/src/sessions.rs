//! Unlock sessions for the private partition.
//!
//! An unlock session records that a user recently proved knowledge of their
//! private PIN. Sessions live in process memory only: a restart re-locks
//! every user, and separate server processes do not share unlock state.
//!
//! Expiry is lazy. Every read first compares `now` with the stored expiry and
//! evicts the entry when it has passed, so an expired session is
//! indistinguishable from one that never existed. [`PrivateAccess::purge_expired`]
//! exists only to bound memory.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::error::{ApiResult, AppError};

/// Backing storage for unlock sessions, keyed by user.
pub trait UnlockStore: Send + Sync {
    /// Records (or replaces) the session for `user_id`.
    fn put(&self, user_id: Uuid, expires_at: DateTime<Utc>);

    /// The live session's expiry. An entry with `now >= expires_at` is
    /// evicted and reported as absent.
    fn get(&self, user_id: Uuid, now: DateTime<Utc>) -> Option<DateTime<Utc>>;

    fn remove(&self, user_id: Uuid);

    /// Drops every entry expired at `now`. Returns how many were dropped.
    fn purge(&self, now: DateTime<Utc>) -> usize;
}

/// In-memory store behind a single mutex. Each operation is one critical
/// section, so a concurrent lock and unlock for the same user serialize.
#[derive(Default)]
pub struct MemoryUnlockStore {
    sessions: Mutex<HashMap<Uuid, DateTime<Utc>>>,
}

impl MemoryUnlockStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<Uuid, DateTime<Utc>>> {
        // The map holds plain timestamps; a panic mid-update cannot leave it
        // half-written, so a poisoned lock is still safe to use.
        self.sessions.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn len(&self) -> usize {
        self.sessions().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions().is_empty()
    }
}

impl UnlockStore for MemoryUnlockStore {
    fn put(&self, user_id: Uuid, expires_at: DateTime<Utc>) {
        self.sessions().insert(user_id, expires_at);
    }

    fn get(&self, user_id: Uuid, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let mut sessions = self.sessions();
        match sessions.get(&user_id).copied() {
            Some(expires_at) if now < expires_at => Some(expires_at),
            Some(_) => {
                sessions.remove(&user_id);
                None
            }
            None => None,
        }
    }

    fn remove(&self, user_id: Uuid) {
        self.sessions().remove(&user_id);
    }

    fn purge(&self, now: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions();
        let before = sessions.len();
        sessions.retain(|_, expires_at| now < *expires_at);
        before - sessions.len()
    }
}

/// The Private Access Guard: grants, revokes and checks unlock sessions with
/// a fixed, non-sliding TTL.
#[derive(Clone)]
pub struct PrivateAccess {
    store: Arc<dyn UnlockStore>,
    ttl: Duration,
}

impl PrivateAccess {
    pub fn new(store: Arc<dyn UnlockStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Starts or resets the session for `user_id`. Returns its expiry.
    pub fn grant(&self, user_id: Uuid) -> DateTime<Utc> {
        let now = Utc::now();
        let expires_at = now + self.ttl;
        self.store.put(user_id, expires_at);
        let purged = self.store.purge(now);
        if purged > 0 {
            debug!(purged, "Dropped expired unlock sessions");
        }
        expires_at
    }

    pub fn revoke(&self, user_id: Uuid) {
        self.store.remove(user_id);
    }

    pub fn expires_at(&self, user_id: Uuid) -> Option<DateTime<Utc>> {
        self.store.get(user_id, Utc::now())
    }

    pub fn is_unlocked(&self, user_id: Uuid) -> bool {
        self.expires_at(user_id).is_some()
    }

    /// `Err(PrivateLocked)` unless the user holds a live session.
    pub fn ensure_unlocked(&self, user_id: Uuid) -> ApiResult<()> {
        if self.is_unlocked(user_id) {
            Ok(())
        } else {
            Err(AppError::PrivateLocked)
        }
    }

    pub fn purge_expired(&self) -> usize {
        self.store.purge(Utc::now())
    }
}
