//! Token persistence.
//!
//! Stores the bearer token and its absolute expiry in the host's
//! [`KeyValueStore`] so a session survives a reload. Freshness is decided
//! here, against the injected clock, with a strict less-than comparison.

use crate::error::{AuthError, Result};
use crate::session::Session;
use bridge_traits::storage::KeyValueStore;
use bridge_traits::time::Clock;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Storage key for the bearer token.
pub const ACCESS_TOKEN_KEY: &str = "accessToken";

/// Storage key for the absolute expiry (epoch-ms, stored as a string).
pub const TOKEN_EXPIRY_KEY: &str = "tokenExpiry";

/// Expiry applied when the provider omits `expires_in`.
pub const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

/// Persists and restores the bearer token.
#[derive(Clone)]
pub struct TokenStore {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

impl TokenStore {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Persist a token, computing its absolute expiry.
    ///
    /// `expires_in_secs` defaults to [`DEFAULT_EXPIRES_IN_SECS`] when the
    /// provider omitted it. Returns the computed expiry in epoch-ms.
    pub async fn save(&self, access_token: &str, expires_in_secs: Option<i64>) -> Result<i64> {
        let expires_in = expires_in_secs.unwrap_or(DEFAULT_EXPIRES_IN_SECS);
        let expires_at_ms = self.clock.unix_timestamp_millis() + expires_in * 1000;

        self.store
            .set(ACCESS_TOKEN_KEY, access_token)
            .await
            .map_err(|e| AuthError::StorageUnavailable(e.to_string()))?;
        self.store
            .set(TOKEN_EXPIRY_KEY, &expires_at_ms.to_string())
            .await
            .map_err(|e| AuthError::StorageUnavailable(e.to_string()))?;

        info!(expires_at_ms, "token persisted");
        Ok(expires_at_ms)
    }

    /// Restore the session from persisted fields.
    ///
    /// Returns an unauthenticated session when the fields are absent,
    /// unparseable, or the token has expired (strict `now < expiry`).
    pub async fn load(&self) -> Result<Session> {
        let token = self
            .store
            .get(ACCESS_TOKEN_KEY)
            .await
            .map_err(|e| AuthError::StorageUnavailable(e.to_string()))?;
        let expiry = self
            .store
            .get(TOKEN_EXPIRY_KEY)
            .await
            .map_err(|e| AuthError::StorageUnavailable(e.to_string()))?;

        let (Some(token), Some(expiry)) = (token, expiry) else {
            debug!("no persisted token");
            return Ok(Session::signed_out());
        };

        let expires_at_ms: i64 = match expiry.parse() {
            Ok(v) => v,
            Err(_) => {
                warn!("persisted token expiry is unparseable, treating as signed out");
                return Ok(Session::signed_out());
            }
        };

        let now_ms = self.clock.unix_timestamp_millis();
        if now_ms < expires_at_ms {
            debug!(expires_at_ms, "restored persisted session");
            Ok(Session::authenticated(token, expires_at_ms))
        } else {
            debug!(expires_at_ms, now_ms, "persisted token expired");
            Ok(Session::signed_out())
        }
    }

    /// Erase persisted token fields. Idempotent.
    pub async fn clear(&self) -> Result<()> {
        self.store
            .remove(ACCESS_TOKEN_KEY)
            .await
            .map_err(|e| AuthError::StorageUnavailable(e.to_string()))?;
        self.store
            .remove(TOKEN_EXPIRY_KEY)
            .await
            .map_err(|e| AuthError::StorageUnavailable(e.to_string()))?;
        info!("persisted token cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};
    use std::collections::HashMap;
    use tokio::sync::Mutex;

    struct MemoryStore {
        values: Mutex<HashMap<String, String>>,
    }

    impl MemoryStore {
        fn new() -> Self {
            Self {
                values: Mutex::new(HashMap::new()),
            }
        }
    }

    #[async_trait]
    impl KeyValueStore for MemoryStore {
        async fn get(&self, key: &str) -> bridge_traits::error::Result<Option<String>> {
            Ok(self.values.lock().await.get(key).cloned())
        }

        async fn set(&self, key: &str, value: &str) -> bridge_traits::error::Result<()> {
            self.values
                .lock()
                .await
                .insert(key.to_string(), value.to_string());
            Ok(())
        }

        async fn remove(&self, key: &str) -> bridge_traits::error::Result<()> {
            self.values.lock().await.remove(key);
            Ok(())
        }

        async fn clear(&self) -> bridge_traits::error::Result<()> {
            self.values.lock().await.clear();
            Ok(())
        }
    }

    struct FixedClock {
        now_ms: i64,
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            Utc.timestamp_millis_opt(self.now_ms).unwrap()
        }
    }

    fn store_at(now_ms: i64) -> TokenStore {
        TokenStore::new(
            Arc::new(MemoryStore::new()),
            Arc::new(FixedClock { now_ms }),
        )
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let store = store_at(1_000_000);
        let expires_at = store.save("tok", Some(3600)).await.unwrap();
        assert_eq!(expires_at, 1_000_000 + 3_600_000);

        let session = store.load().await.unwrap();
        assert_eq!(session.access_token.as_deref(), Some("tok"));
        assert!(session.is_authenticated(1_000_000));
    }

    #[tokio::test]
    async fn missing_expires_in_defaults_to_an_hour() {
        let store = store_at(0);
        let expires_at = store.save("tok", None).await.unwrap();
        assert_eq!(expires_at, DEFAULT_EXPIRES_IN_SECS * 1000);
    }

    #[tokio::test]
    async fn load_at_exact_expiry_is_signed_out() {
        let kv = Arc::new(MemoryStore::new());
        let writer = TokenStore::new(kv.clone(), Arc::new(FixedClock { now_ms: 0 }));
        let expires_at = writer.save("tok", Some(60)).await.unwrap();

        // now == storedExpiry: expired by the strict comparison.
        let at_boundary = TokenStore::new(kv.clone(), Arc::new(FixedClock { now_ms: expires_at }));
        assert!(at_boundary.load().await.unwrap().access_token.is_none());

        // One millisecond earlier the session is still live.
        let just_before =
            TokenStore::new(kv, Arc::new(FixedClock { now_ms: expires_at - 1 }));
        assert!(just_before.load().await.unwrap().access_token.is_some());
    }

    #[tokio::test]
    async fn load_without_persisted_fields_is_signed_out() {
        let store = store_at(0);
        let session = store.load().await.unwrap();
        assert_eq!(session, Session::signed_out());
    }

    #[tokio::test]
    async fn garbage_expiry_is_signed_out() {
        let kv = Arc::new(MemoryStore::new());
        kv.set(ACCESS_TOKEN_KEY, "tok").await.unwrap();
        kv.set(TOKEN_EXPIRY_KEY, "not-a-number").await.unwrap();

        let store = TokenStore::new(kv, Arc::new(FixedClock { now_ms: 0 }));
        assert!(store.load().await.unwrap().access_token.is_none());
    }

    #[tokio::test]
    async fn clear_is_idempotent() {
        let store = store_at(0);
        store.save("tok", None).await.unwrap();

        store.clear().await.unwrap();
        store.clear().await.unwrap();

        assert!(store.load().await.unwrap().access_token.is_none());
    }
}
