//! The process-wide authenticated session.
//!
//! Exactly one session exists for the lifetime of the process. Controllers
//! share it through [`SessionHandle`], which pairs the session slot with an
//! invalidation token: clearing the session cancels every poll and
//! background task that was scoped to it, then installs a fresh token for
//! the next sign-in.

use async_trait::async_trait;
use bridge_traits::player::TokenSource;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

/// Bearer token and expiry for one authenticated session.
///
/// Invariant: the session is authenticated iff a token is present and the
/// current time is strictly before `expires_at_ms`. Equal-to-expiry counts
/// as expired.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Session {
    /// The opaque bearer token, absent when signed out.
    pub access_token: Option<String>,
    /// Absolute expiry, epoch milliseconds.
    pub expires_at_ms: i64,
}

impl Session {
    /// A signed-out session.
    pub fn signed_out() -> Self {
        Self::default()
    }

    /// An authenticated session holding `access_token` until
    /// `expires_at_ms`.
    pub fn authenticated(access_token: impl Into<String>, expires_at_ms: i64) -> Self {
        Self {
            access_token: Some(access_token.into()),
            expires_at_ms,
        }
    }

    /// Whether the session is authenticated at `now_ms`.
    pub fn is_authenticated(&self, now_ms: i64) -> bool {
        self.access_token.is_some() && now_ms < self.expires_at_ms
    }
}

// The bearer token must not leak into logs.
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("expires_at_ms", &self.expires_at_ms)
            .finish()
    }
}

struct SessionInner {
    session: RwLock<Session>,
    epoch: RwLock<CancellationToken>,
}

/// Shared handle to the single session.
///
/// Cheap to clone; all clones observe the same session. Writes go through
/// [`SessionHandle::install`] and [`SessionHandle::clear`] only, so the
/// authenticated-iff-fresh invariant is re-checkable at any await point.
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<SessionInner>,
}

impl SessionHandle {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SessionInner {
                session: RwLock::new(Session::signed_out()),
                epoch: RwLock::new(CancellationToken::new()),
            }),
        }
    }

    /// Replace the session with an authenticated one.
    pub async fn install(&self, access_token: impl Into<String>, expires_at_ms: i64) {
        let mut session = self.inner.session.write().await;
        *session = Session::authenticated(access_token, expires_at_ms);
        tracing::info!(expires_at_ms, "session installed");
    }

    /// Snapshot the current session.
    pub async fn snapshot(&self) -> Session {
        self.inner.session.read().await.clone()
    }

    /// Whether the session is authenticated at `now_ms`.
    pub async fn is_authenticated(&self, now_ms: i64) -> bool {
        self.inner.session.read().await.is_authenticated(now_ms)
    }

    /// Current bearer token, if any.
    pub async fn bearer_token(&self) -> Option<String> {
        self.inner.session.read().await.access_token.clone()
    }

    /// Sign the session out and cancel everything scoped to it.
    ///
    /// A fresh invalidation token is installed so a later sign-in starts a
    /// clean epoch. Idempotent.
    pub async fn clear(&self) {
        {
            let mut session = self.inner.session.write().await;
            *session = Session::signed_out();
        }
        let mut epoch = self.inner.epoch.write().await;
        epoch.cancel();
        *epoch = CancellationToken::new();
        tracing::info!("session cleared");
    }

    /// Token that fires when the current session epoch is invalidated.
    ///
    /// Polls and background tasks select against this so logout stops them
    /// deterministically.
    pub async fn invalidation_token(&self) -> CancellationToken {
        self.inner.epoch.read().await.clone()
    }
}

impl Default for SessionHandle {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenSource for SessionHandle {
    async fn access_token(&self) -> Option<String> {
        self.bearer_token().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authenticated_iff_token_present_and_fresh() {
        let session = Session::authenticated("tok", 1_000);
        assert!(session.is_authenticated(999));
        // Equal-to-expiry counts as expired.
        assert!(!session.is_authenticated(1_000));
        assert!(!session.is_authenticated(1_001));

        assert!(!Session::signed_out().is_authenticated(0));
    }

    #[test]
    fn debug_redacts_token() {
        let session = Session::authenticated("super-secret", 1);
        let printed = format!("{:?}", session);
        assert!(printed.contains("[REDACTED]"));
        assert!(!printed.contains("super-secret"));
    }

    #[tokio::test]
    async fn clear_cancels_current_epoch_and_starts_fresh() {
        let handle = SessionHandle::new();
        handle.install("tok", i64::MAX).await;

        let old_epoch = handle.invalidation_token().await;
        assert!(!old_epoch.is_cancelled());

        handle.clear().await;
        assert!(old_epoch.is_cancelled());
        assert!(handle.bearer_token().await.is_none());

        // The next epoch is live again.
        assert!(!handle.invalidation_token().await.is_cancelled());
    }

    #[tokio::test]
    async fn clear_is_idempotent() {
        let handle = SessionHandle::new();
        handle.clear().await;
        handle.clear().await;
        assert_eq!(handle.snapshot().await, Session::signed_out());
    }

    #[tokio::test]
    async fn token_source_reflects_session() {
        let handle = SessionHandle::new();
        assert!(TokenSource::access_token(&handle).await.is_none());

        handle.install("tok", i64::MAX).await;
        assert_eq!(
            TokenSource::access_token(&handle).await,
            Some("tok".to_string())
        );
    }
}
