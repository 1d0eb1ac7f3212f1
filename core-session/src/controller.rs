//! Session orchestration.
//!
//! Wires the authorizer, token store, API client, and device controller
//! together and drives them in the required order: a token must exist and
//! be persisted before any API or player operation, and player
//! construction waits for the SDK-loaded/authenticated rendezvous.

use crate::error::Result;
use bridge_traits::http::HttpClient;
use bridge_traits::player::PlayerSdk;
use bridge_traits::storage::KeyValueStore;
use bridge_traits::time::Clock;
use core_auth::authorizer::Authorizer;
use core_auth::session::SessionHandle;
use core_auth::token_store::TokenStore;
use core_player::DeviceController;
use core_runtime::config::CoreConfig;
use core_runtime::events::{AuthEvent, CoreEvent, EventBus};
use provider_spotify::cards::{result_cards, PlaylistCard, ProfileView, ResultCard};
use provider_spotify::{ApiError, SearchType, SpotifyClient};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

struct Inner {
    config: CoreConfig,
    authorizer: Authorizer,
    token_store: TokenStore,
    session: SessionHandle,
    api: Arc<SpotifyClient>,
    device: DeviceController,
    sdk: Arc<dyn PlayerSdk>,
    events: EventBus,
    clock: Arc<dyn Clock>,
    profile: RwLock<Option<ProfileView>>,
    playlists: RwLock<Vec<PlaylistCard>>,
}

/// Top-level controller owning the session lifecycle.
///
/// Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct SessionController {
    inner: Arc<Inner>,
}

impl SessionController {
    /// Wire the core from its capability bridges and configuration.
    pub fn new(
        config: CoreConfig,
        http: Arc<dyn HttpClient>,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        sdk: Arc<dyn PlayerSdk>,
        events: EventBus,
    ) -> Self {
        let session = SessionHandle::new();
        let authorizer = Authorizer::new(config.clone(), store.clone(), http.clone());
        let token_store = TokenStore::new(store, clock.clone());
        let api = Arc::new(SpotifyClient::new(
            http,
            session.clone(),
            clock.clone(),
            config.api_base_url.clone(),
        ));
        let device = DeviceController::new(
            api.clone(),
            session.clone(),
            token_store.clone(),
            events.clone(),
            clock.clone(),
            config.clone(),
        );

        Self {
            inner: Arc::new(Inner {
                config,
                authorizer,
                token_store,
                session,
                api,
                device,
                sdk,
                events,
                clock,
                profile: RwLock::new(None),
                playlists: RwLock::new(Vec::new()),
            }),
        }
    }

    /// The shared session handle.
    pub fn session(&self) -> &SessionHandle {
        &self.inner.session
    }

    /// The playback device controller.
    pub fn device(&self) -> &DeviceController {
        &self.inner.device
    }

    /// The API client.
    pub fn api(&self) -> &Arc<SpotifyClient> {
        &self.inner.api
    }

    /// Handle page load.
    ///
    /// Completes the OAuth callback when the query carries one, otherwise
    /// restores a persisted session. When a session is live afterwards,
    /// spawns the optional enrichment fetch and the SDK/auth rendezvous.
    #[instrument(skip(self, redirect_query))]
    pub async fn start(&self, redirect_query: Option<&str>) -> Result<()> {
        let mut established = false;

        if let Some(query) = redirect_query {
            match self.inner.authorizer.complete_authorization(query).await {
                Ok(Some(grant)) => {
                    let expires_at_ms = self
                        .inner
                        .token_store
                        .save(&grant.access_token, Some(grant.expires_in))
                        .await?;
                    self.inner
                        .session
                        .install(grant.access_token, expires_at_ms)
                        .await;
                    self.emit(CoreEvent::Auth(AuthEvent::SignedIn { expires_at_ms }));
                    established = true;
                }
                Ok(None) => debug!("no callback parameters in query"),
                Err(e) => {
                    self.emit(CoreEvent::Auth(AuthEvent::AuthError {
                        message: e.to_string(),
                        recoverable: true,
                    }));
                    return Err(e.into());
                }
            }
        }

        if !established {
            let persisted = self.inner.token_store.load().await?;
            let now_ms = self.inner.clock.unix_timestamp_millis();
            if persisted.is_authenticated(now_ms) {
                let expires_at_ms = persisted.expires_at_ms;
                if let Some(token) = persisted.access_token {
                    self.inner.session.install(token, expires_at_ms).await;
                    self.emit(CoreEvent::Auth(AuthEvent::SignedIn { expires_at_ms }));
                    established = true;
                    info!("session restored from storage");
                }
            }
        }

        if established {
            self.spawn_enrichment();
            self.spawn_rendezvous().await;
        }

        Ok(())
    }

    /// Begin an authorization attempt.
    ///
    /// Returns the authorization URL the host must navigate the user agent
    /// to; the provider will redirect back to the configured URI.
    pub async fn login(&self) -> Result<String> {
        self.emit(CoreEvent::Auth(AuthEvent::SigningIn));
        Ok(self.inner.authorizer.begin_authorization().await?)
    }

    /// Tear the session down.
    ///
    /// Clears the persisted token, invalidates the session epoch (stopping
    /// every poll scoped to it), resets the device controller, and emits
    /// `SignedOut`. Idempotent; storage failures are logged, not surfaced.
    #[instrument(skip(self))]
    pub async fn logout(&self) {
        if let Err(e) = self.inner.token_store.clear().await {
            warn!(error = %e, "failed to clear persisted token during logout");
        }
        self.inner.session.clear().await;
        self.inner.device.shutdown().await;
        *self.inner.profile.write().await = None;
        self.inner.playlists.write().await.clear();
        self.emit(CoreEvent::Auth(AuthEvent::SignedOut));
        info!("logged out");
    }

    /// Search the catalog and project the results into view cards.
    ///
    /// A 401 from the API forces an implicit logout before the error is
    /// surfaced.
    pub async fn search(&self, query: &str, kind: SearchType) -> Result<Vec<ResultCard>> {
        match self.inner.api.search(query, kind).await {
            Ok(results) => Ok(result_cards(&results, kind)),
            Err(ApiError::Unauthorized) => {
                warn!("search returned 401, tearing session down");
                self.logout().await;
                Err(ApiError::Unauthorized.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Last fetched profile view, when enrichment has completed.
    pub async fn profile(&self) -> Option<ProfileView> {
        self.inner.profile.read().await.clone()
    }

    /// Last fetched playlist cards.
    pub async fn playlists(&self) -> Vec<PlaylistCard> {
        self.inner.playlists.read().await.clone()
    }

    /// Fetch profile and playlists in the background.
    ///
    /// Both are optional enrichment: failures are logged and swallowed,
    /// never surfaced to the user.
    fn spawn_enrichment(&self) {
        let this = self.clone();
        tokio::spawn(async move {
            match this.inner.api.get_profile().await {
                Ok(profile) => {
                    *this.inner.profile.write().await = Some(ProfileView::from(&profile));
                }
                Err(e) => debug!(error = %e, "profile enrichment skipped"),
            }
            match this.inner.api.get_playlists().await {
                Ok(page) => {
                    let cards: Vec<PlaylistCard> =
                        page.items.iter().map(PlaylistCard::from).collect();
                    *this.inner.playlists.write().await = cards;
                }
                Err(e) => debug!(error = %e, "playlist enrichment skipped"),
            }
        });
    }

    /// Poll until the SDK has loaded while the session stays live, then
    /// initialize the device controller.
    ///
    /// The SDK load event and authentication can arrive in either order;
    /// this poll is the rendezvous between them. It stops as soon as the
    /// condition is met or the session epoch is invalidated.
    async fn spawn_rendezvous(&self) {
        let cancel = self.inner.session.invalidation_token().await;
        let this = self.clone();
        tokio::spawn(async move {
            loop {
                if cancel.is_cancelled() {
                    break;
                }
                let now_ms = this.inner.clock.unix_timestamp_millis();
                if this.inner.sdk.is_loaded() && this.inner.session.is_authenticated(now_ms).await
                {
                    if let Err(e) = this.inner.device.initialize(this.inner.sdk.as_ref()).await {
                        warn!(error = %e, "player initialization failed");
                    }
                    break;
                }
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(this.inner.config.timing.sdk_poll_interval) => {}
                }
            }
            debug!("rendezvous poll finished");
        });
    }

    fn emit(&self, event: CoreEvent) {
        let _ = self.inner.events.emit(event);
    }
}
