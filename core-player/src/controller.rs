//! Device controller.
//!
//! Owns the SDK player instance and the device binding for the session.
//! Construction and connection run once per session; device-id discovery
//! runs as often as needed, because the SDK may deliver the id through its
//! `ready` event, through a state query, through neither, or only after
//! playback has been requested.

use crate::error::{PlayerError, Result};
use crate::projection::NowPlaying;
use crate::state::{ControllerInput, ControllerState};
use bridge_traits::player::{
    PlayerConfig, PlayerHandle, PlayerSdk, PlayerSdkEvent, SdkPlaybackState,
};
use bridge_traits::time::Clock;
use core_auth::session::SessionHandle;
use core_auth::token_store::TokenStore;
use core_runtime::config::CoreConfig;
use core_runtime::events::{AuthEvent, CoreEvent, DeviceSource, EventBus, PlayerEvent, RecvError};
use provider_spotify::{ApiError, SpotifyClient};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

struct Inner {
    state: RwLock<ControllerState>,
    device: RwLock<Option<String>>,
    player: RwLock<Option<Arc<dyn PlayerHandle>>>,
    playback: RwLock<Option<SdkPlaybackState>>,
    api: Arc<SpotifyClient>,
    session: SessionHandle,
    token_store: TokenStore,
    events: EventBus,
    clock: Arc<dyn Clock>,
    config: CoreConfig,
}

/// Controller for the external playback device.
///
/// Cheap to clone; clones share the same player and binding.
#[derive(Clone)]
pub struct DeviceController {
    inner: Arc<Inner>,
}

impl DeviceController {
    pub fn new(
        api: Arc<SpotifyClient>,
        session: SessionHandle,
        token_store: TokenStore,
        events: EventBus,
        clock: Arc<dyn Clock>,
        config: CoreConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: RwLock::new(ControllerState::Uninitialized),
                device: RwLock::new(None),
                player: RwLock::new(None),
                playback: RwLock::new(None),
                api,
                session,
                token_store,
                events,
                clock,
                config,
            }),
        }
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> ControllerState {
        self.inner.state.read().await.clone()
    }

    /// Currently bound device id, if any.
    pub async fn device_id(&self) -> Option<String> {
        self.inner.device.read().await.clone()
    }

    /// Display projection of the last observed playback state.
    pub async fn now_playing(&self) -> Option<NowPlaying> {
        self.inner
            .playback
            .read()
            .await
            .as_ref()
            .and_then(NowPlaying::project)
    }

    /// Construct and connect the SDK player.
    ///
    /// Requires an authenticated session and a loaded SDK; the session
    /// controller's rendezvous poll guarantees both before calling. Device
    /// resolution continues in the background — a missing device id after
    /// this returns is degraded, not failed.
    #[instrument(skip(self, sdk))]
    pub async fn initialize(&self, sdk: &dyn PlayerSdk) -> Result<()> {
        let now_ms = self.inner.clock.unix_timestamp_millis();
        if !self.inner.session.is_authenticated(now_ms).await {
            return Err(PlayerError::NotAuthenticated);
        }
        if !sdk.is_loaded() {
            return Err(PlayerError::SdkInitializationFailed(
                "playback SDK not loaded".to_string(),
            ));
        }
        if self.inner.player.read().await.is_some() {
            debug!("player already constructed");
            return Ok(());
        }

        let player = sdk
            .create_player(
                PlayerConfig {
                    name: self.inner.config.player_name.clone(),
                    volume: self.inner.config.initial_volume,
                },
                Arc::new(self.inner.session.clone()),
            )
            .map_err(|e| {
                let reason = e.to_string();
                self.emit(CoreEvent::Player(PlayerEvent::Failed {
                    message: reason.clone(),
                }));
                PlayerError::SdkInitializationFailed(reason)
            })?;

        *self.inner.player.write().await = Some(player.clone());
        self.transition(ControllerInput::ConnectRequested).await;
        self.emit(CoreEvent::Player(PlayerEvent::Connecting));

        let cancel = self.inner.session.invalidation_token().await;

        let events = player.subscribe();
        let this = self.clone();
        let event_cancel = cancel.clone();
        tokio::spawn(async move { this.event_loop(events, event_cancel).await });

        let this = self.clone();
        tokio::spawn(async move { this.connect_flow(player, cancel).await });

        Ok(())
    }

    /// Drive the connect call and the bounded device-resolution fallbacks.
    async fn connect_flow(self, player: Arc<dyn PlayerHandle>, cancel: CancellationToken) {
        match player.connect().await {
            Ok(true) => {
                info!("player connect resolved true");
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = tokio::time::sleep(self.inner.config.timing.state_probe_delay) => {}
                }
                if self.device_id().await.is_none() {
                    // Single bounded attempt against the SDK state.
                    match player.current_state().await {
                        Ok(Some(SdkPlaybackState {
                            device_id: Some(id),
                            ..
                        })) => {
                            self.bind_device(id, DeviceSource::StateQuery).await;
                        }
                        _ => {
                            debug!("no device id in player state, falling back to API");
                            self.resolve_from_api().await;
                        }
                    }
                }
            }
            Ok(false) => {
                warn!("player connect resolved false, falling back to API");
                self.resolve_from_api().await;
            }
            Err(e) => {
                warn!(error = %e, "player connect failed, falling back to API");
                self.resolve_from_api().await;
            }
        }

        // Second chance: the SDK sometimes withholds the id entirely while
        // the API already lists the device.
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(self.inner.config.timing.api_fallback_delay) => {}
        }
        if self.device_id().await.is_none() {
            debug!("device still unresolved after fallback delay");
            self.resolve_from_api().await;
        }
    }

    /// Consume SDK events until the session epoch is invalidated.
    async fn event_loop(
        self,
        mut events: broadcast::Receiver<PlayerSdkEvent>,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                event = events.recv() => match event {
                    Ok(event) => self.handle_sdk_event(event).await,
                    Err(RecvError::Lagged(missed)) => {
                        warn!(missed, "SDK event stream lagged");
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }
        debug!("SDK event loop stopped");
    }

    async fn handle_sdk_event(&self, event: PlayerSdkEvent) {
        match event {
            PlayerSdkEvent::InitializationError { message } => {
                warn!(message = %message, "SDK initialization error");
                self.transition(ControllerInput::SdkFailed {
                    reason: message.clone(),
                })
                .await;
                self.emit(CoreEvent::Player(PlayerEvent::Failed { message }));
            }
            PlayerSdkEvent::AuthenticationError { message } => {
                warn!(message = %message, "SDK authentication error, tearing session down");
                self.transition(ControllerInput::SdkFailed {
                    reason: message.clone(),
                })
                .await;
                self.emit(CoreEvent::Player(PlayerEvent::Failed {
                    message: message.clone(),
                }));
                self.force_logout(&format!("Player authentication failed: {}", message))
                    .await;
            }
            PlayerSdkEvent::AccountError { message } => {
                warn!(message = %message, "SDK account error");
                self.transition(ControllerInput::SdkFailed {
                    reason: message.clone(),
                })
                .await;
                self.emit(CoreEvent::Player(PlayerEvent::Failed { message }));
            }
            PlayerSdkEvent::PlaybackError { message } => {
                warn!(message = %message, "SDK playback error");
                self.emit(CoreEvent::Player(PlayerEvent::PlaybackError { message }));
            }
            PlayerSdkEvent::StateChanged(state) => {
                *self.inner.playback.write().await = Some(state);
                self.emit(CoreEvent::Player(PlayerEvent::PlaybackChanged));
            }
            PlayerSdkEvent::Ready { device_id } => {
                self.bind_device(device_id, DeviceSource::ReadyEvent).await;
            }
            PlayerSdkEvent::NotReady { device_id } => {
                warn!(device_id = %device_id, "device went offline");
            }
        }
    }

    /// Bind a resolved device id.
    ///
    /// The `ready` event is authoritative and overwrites; the state query
    /// and API fallback only fill an empty binding, so the first source to
    /// answer wins.
    async fn bind_device(&self, device_id: String, source: DeviceSource) {
        {
            let mut device = self.inner.device.write().await;
            if device.is_some() && source != DeviceSource::ReadyEvent {
                return;
            }
            *device = Some(device_id.clone());
        }
        info!(device_id = %device_id, ?source, "device bound");
        self.transition(ControllerInput::DeviceResolved {
            device_id: device_id.clone(),
        })
        .await;
        self.emit(CoreEvent::Player(PlayerEvent::DeviceResolved {
            device_id,
            source,
        }));
    }

    /// Resolve a device from the API listing: first active device wins,
    /// else the first listed.
    async fn resolve_from_api(&self) {
        match self.inner.api.list_devices().await {
            Ok(devices) if !devices.is_empty() => {
                let target = devices
                    .iter()
                    .find(|d| d.is_active)
                    .unwrap_or(&devices[0]);
                self.bind_device(target.id.clone(), DeviceSource::ApiFallback)
                    .await;
            }
            Ok(_) => {
                warn!("no devices listed by the API");
                self.emit(CoreEvent::Player(PlayerEvent::Degraded {
                    message: "No active devices found. Open the streaming app on your phone, \
                              desktop, or in another browser tab."
                        .to_string(),
                }));
            }
            Err(ApiError::Unauthorized) => {
                self.force_logout("Session expired while listing devices")
                    .await;
            }
            Err(e) => {
                warn!(error = %e, "device listing failed");
                self.emit(CoreEvent::Player(PlayerEvent::Degraded {
                    message: format!("Could not fetch available devices: {}", e),
                }));
            }
        }
    }

    /// Start playback of a track on the bound device.
    ///
    /// Re-runs device resolution when no device is bound before failing
    /// with [`PlayerError::NoDeviceAvailable`]. A 404 means the binding
    /// went stale ([`PlayerError::DeviceLost`], not retried); a 401 tears
    /// the session down.
    #[instrument(skip(self), fields(track_uri = %track_uri))]
    pub async fn play(&self, track_uri: &str) -> Result<()> {
        let player = self
            .inner
            .player
            .read()
            .await
            .clone()
            .ok_or(PlayerError::NotInitialized)?;

        if self.device_id().await.is_none() {
            debug!("no device bound, re-running resolution before play");
            if let Ok(Some(state)) = player.current_state().await {
                if let Some(id) = state.device_id {
                    self.bind_device(id, DeviceSource::StateQuery).await;
                }
            }
        }
        if self.device_id().await.is_none() {
            self.resolve_from_api().await;
        }
        let device_id = self
            .device_id()
            .await
            .ok_or(PlayerError::NoDeviceAvailable)?;

        match self.inner.api.play(&device_id, track_uri).await {
            Ok(()) => {
                info!(device_id = %device_id, "playback started");
                self.transition(ControllerInput::PlaybackStarted).await;
                Ok(())
            }
            Err(ApiError::NotFound) => {
                warn!(device_id = %device_id, "device became stale");
                Err(PlayerError::DeviceLost)
            }
            Err(ApiError::Unauthorized) => {
                self.force_logout("Session expired. Please reconnect.").await;
                Err(PlayerError::Api(ApiError::Unauthorized))
            }
            Err(e) => Err(PlayerError::Api(e)),
        }
    }

    /// Toggle play/pause on the SDK player. A warned no-op without a
    /// player.
    pub async fn toggle_play(&self) -> Result<()> {
        match self.inner.player.read().await.clone() {
            Some(player) => Ok(player.toggle_play().await?),
            None => {
                warn!("toggle ignored, player not constructed");
                Ok(())
            }
        }
    }

    /// Skip to the previous track. A warned no-op without a player.
    pub async fn previous(&self) -> Result<()> {
        match self.inner.player.read().await.clone() {
            Some(player) => Ok(player.previous_track().await?),
            None => {
                warn!("previous ignored, player not constructed");
                Ok(())
            }
        }
    }

    /// Skip to the next track. A warned no-op without a player.
    pub async fn next(&self) -> Result<()> {
        match self.inner.player.read().await.clone() {
            Some(player) => Ok(player.next_track().await?),
            None => {
                warn!("next ignored, player not constructed");
                Ok(())
            }
        }
    }

    /// Drop the player, binding, and observed state.
    pub async fn shutdown(&self) {
        *self.inner.player.write().await = None;
        *self.inner.device.write().await = None;
        *self.inner.playback.write().await = None;
        self.transition(ControllerInput::Shutdown).await;
        info!("device controller shut down");
    }

    /// Tear the whole session down because the bearer token is invalid.
    async fn force_logout(&self, reason: &str) {
        if let Err(e) = self.inner.token_store.clear().await {
            warn!(error = %e, "failed to clear persisted token during forced logout");
        }
        self.inner.session.clear().await;
        self.shutdown().await;
        self.emit(CoreEvent::Auth(AuthEvent::AuthError {
            message: reason.to_string(),
            recoverable: false,
        }));
        self.emit(CoreEvent::Auth(AuthEvent::SignedOut));
    }

    async fn transition(&self, input: ControllerInput) {
        let mut state = self.inner.state.write().await;
        let prev = state.clone();
        let next = prev.clone().apply(input);
        if next != prev {
            debug!(from = %prev, to = %next, "controller transition");
            *state = next;
        }
    }

    fn emit(&self, event: CoreEvent) {
        let _ = self.inner.events.emit(event);
    }
}
