//! Playback SDK bridge traits and supporting types.
//!
//! These abstractions wrap the vendor-provided playback SDK that actually
//! renders audio on a device. The core never decodes audio; it constructs a
//! player through [`PlayerSdk`], drives it through [`PlayerHandle`], and
//! observes it through [`PlayerSdkEvent`]s. Host applications provide the
//! concrete implementation bound to the real SDK runtime.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::error::Result;

/// Supplier of the current access token for the SDK's authentication
/// callback.
///
/// The SDK asks for a token at construction and whenever it reconnects; the
/// session owner answers with the live token, or `None` once logged out.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn access_token(&self) -> Option<String>;
}

/// Construction parameters for a player instance.
#[derive(Debug, Clone)]
pub struct PlayerConfig {
    /// Display name the device advertises to the streaming service.
    pub name: String,
    /// Initial volume, `0.0..=1.0`.
    pub volume: f32,
}

/// Track metadata as reported by the SDK's playback state.
#[derive(Debug, Clone, PartialEq)]
pub struct SdkTrack {
    pub name: String,
    pub uri: String,
    pub artists: Vec<String>,
    pub album: SdkAlbum,
    pub duration_ms: u64,
}

/// Album slice of an [`SdkTrack`].
#[derive(Debug, Clone, PartialEq)]
pub struct SdkAlbum {
    pub name: String,
    /// Artwork URLs, largest first.
    pub images: Vec<String>,
}

/// Snapshot of the SDK's playback state.
///
/// Supplied by the SDK; read-only to the core.
#[derive(Debug, Clone, PartialEq)]
pub struct SdkPlaybackState {
    pub paused: bool,
    pub position_ms: u64,
    /// Device id, when the SDK chooses to report one here.
    pub device_id: Option<String>,
    pub track: Option<SdkTrack>,
}

/// Events pushed by the SDK runtime.
///
/// Names mirror the vendor SDK's listener registry.
#[derive(Debug, Clone)]
pub enum PlayerSdkEvent {
    /// The SDK failed to initialize; the player is unusable.
    InitializationError { message: String },
    /// The SDK rejected the supplied token.
    AuthenticationError { message: String },
    /// The account cannot use playback (e.g., subscription tier).
    AccountError { message: String },
    /// A command or stream failed; the player itself survives.
    PlaybackError { message: String },
    /// Playback state changed.
    StateChanged(SdkPlaybackState),
    /// The device came online and received its id.
    Ready { device_id: String },
    /// The device went offline.
    NotReady { device_id: String },
}

/// Entry point to the vendor SDK.
///
/// The SDK is loaded asynchronously by the host; [`PlayerSdk::is_loaded`]
/// reports whether construction is possible yet.
pub trait PlayerSdk: Send + Sync {
    /// Whether the SDK runtime has finished loading.
    fn is_loaded(&self) -> bool;

    /// Construct a player instance.
    ///
    /// # Errors
    ///
    /// Fails when the SDK is not loaded or refuses construction.
    fn create_player(
        &self,
        config: PlayerConfig,
        tokens: Arc<dyn TokenSource>,
    ) -> Result<Arc<dyn PlayerHandle>>;
}

/// A constructed player instance.
#[async_trait]
pub trait PlayerHandle: Send + Sync {
    /// Connect the player to the streaming service.
    ///
    /// Resolves `true` on success. A successful connect does not guarantee a
    /// device id; that arrives through [`PlayerSdkEvent::Ready`] or a state
    /// query.
    async fn connect(&self) -> Result<bool>;

    /// Query the current playback state, `None` when the player is not the
    /// active device.
    async fn current_state(&self) -> Result<Option<SdkPlaybackState>>;

    /// Toggle between play and pause.
    async fn toggle_play(&self) -> Result<()>;

    /// Skip to the previous track.
    async fn previous_track(&self) -> Result<()>;

    /// Skip to the next track.
    async fn next_track(&self) -> Result<()>;

    /// Subscribe to SDK events.
    fn subscribe(&self) -> broadcast::Receiver<PlayerSdkEvent>;
}
