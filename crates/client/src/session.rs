//! Session activity tracking and inactivity expiry.

use chrono::{DateTime, Duration, Utc};

use mostrador_store::{LocalStore, StoreError};

/// Inactivity window after which the local session auto-expires.
const SESSION_IDLE_MINUTES: i64 = 30;

pub fn idle_limit() -> Duration {
    Duration::minutes(SESSION_IDLE_MINUTES)
}

/// Tracks the last-interaction timestamp in the store's single session row.
pub struct SessionTracker<'a> {
    store: &'a LocalStore,
}

impl<'a> SessionTracker<'a> {
    pub fn new(store: &'a LocalStore) -> Self {
        Self { store }
    }

    /// Rewrite the last-activity timestamp. Called on every tracked user
    /// interaction.
    pub async fn touch(&self, now: DateTime<Utc>) -> Result<(), StoreError> {
        self.store.record_activity(now).await
    }

    /// Whether the session has been idle past the window. A session with
    /// no recorded activity yet is not considered expired.
    pub async fn expired(&self, now: DateTime<Utc>) -> Result<bool, StoreError> {
        match self.store.read_last_activity().await? {
            Some(last) => Ok(now - last > idle_limit()),
            None => Ok(false),
        }
    }
}
