//! Key-Value Storage Abstraction
//!
//! Persisted string state, modeled on browser localStorage: the access
//! token and its expiry live here between page loads, and the PKCE
//! verifier/state pair lives here for the duration of one authorization
//! round trip.

use async_trait::async_trait;

use crate::error::Result;

/// Key-value string storage trait
///
/// Hosts back this with whatever survives a restart on their platform
/// (localStorage on web, a settings file on desktop). Values are opaque
/// strings; the core owns key naming and value formats.
///
/// # Security
///
/// The access token is stored here in the clear, mirroring the original
/// client contract. Implementations must not log values.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::KeyValueStore;
///
/// async fn remember(store: &dyn KeyValueStore) -> Result<()> {
///     store.set("accessToken", "tok").await?;
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Retrieve a value, `None` if the key does not exist.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store a value, overwriting any previous one.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a key. Succeeds when the key does not exist.
    async fn remove(&self, key: &str) -> Result<()>;

    /// Check for a key without retrieving its value.
    async fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }

    /// Remove every key.
    async fn clear(&self) -> Result<()>;
}
