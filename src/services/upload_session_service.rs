//! Pending admin file uploads.
//!
//! A session starts when the admin asks to push a file and ends when the
//! document arrives, the admin cancels, or the TTL runs out. At most one
//! session exists per caller; starting another replaces it.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingUpload {
    pub target: PathBuf,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadClaim {
    /// No session for this caller.
    Idle,
    /// There was a session but it timed out; it has been removed.
    Expired,
    Ready(PendingUpload),
}

#[derive(Clone)]
pub struct UploadSessions {
    ttl: Duration,
    sessions: Arc<Mutex<HashMap<String, PendingUpload>>>,
}

impl UploadSessions {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn from_secs(ttl_secs: u64) -> Self {
        let secs = i64::try_from(ttl_secs)
            .unwrap_or(i64::MAX)
            .min(i64::MAX / 1_000);
        Self::new(Duration::seconds(secs))
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn begin(&self, caller: &str, target: PathBuf, now: DateTime<Utc>) -> PendingUpload {
        let pending = PendingUpload {
            target,
            expires_at: now
                .checked_add_signed(self.ttl)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        };
        let replaced = self.lock().insert(caller.to_string(), pending.clone());
        if let Some(previous) = replaced {
            debug!(caller, previous = %previous.target.display(), "Replaced pending upload");
        }
        info!(caller, target = %pending.target.display(), expires_at = %pending.expires_at, "Awaiting file upload");
        pending
    }

    /// Looks at the caller's session without ending it. Expired sessions are
    /// dropped on the way.
    pub fn pending(&self, caller: &str, now: DateTime<Utc>) -> UploadClaim {
        let mut sessions = self.lock();
        match sessions.get(caller) {
            None => return UploadClaim::Idle,
            Some(pending) if pending.expires_at > now => return UploadClaim::Ready(pending.clone()),
            Some(_) => {}
        }
        sessions.remove(caller);
        debug!(caller, "Pending upload expired");
        UploadClaim::Expired
    }

    /// Takes the caller's session out of the table. Only one caller of
    /// `claim` can get `Ready` for a given session.
    pub fn claim(&self, caller: &str, now: DateTime<Utc>) -> UploadClaim {
        match self.lock().remove(caller) {
            None => UploadClaim::Idle,
            Some(pending) if pending.expires_at > now => UploadClaim::Ready(pending),
            Some(_) => {
                debug!(caller, "Pending upload expired");
                UploadClaim::Expired
            }
        }
    }

    /// Ends the caller's session, whatever its outcome.
    pub fn finish(&self, caller: &str) -> Option<PendingUpload> {
        self.lock().remove(caller)
    }

    pub fn cancel(&self, caller: &str) -> bool {
        let cancelled = self.finish(caller).is_some();
        if cancelled {
            info!(caller, "Pending upload cancelled");
        }
        cancelled
    }

    pub fn sweep_expired(&self, now: DateTime<Utc>) -> usize {
        let mut sessions = self.lock();
        let before = sessions.len();
        sessions.retain(|_, pending| pending.expires_at > now);
        let removed = before - sessions.len();
        if removed > 0 {
            debug!(removed, "Swept expired upload sessions");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, PendingUpload>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
