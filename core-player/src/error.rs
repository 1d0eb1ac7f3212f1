use bridge_traits::BridgeError;
use provider_spotify::ApiError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlayerError {
    #[error("Player not initialized. Wait for the SDK to load and reconnect.")]
    NotInitialized,

    #[error("No playback device available. Open the streaming app on a device or another browser tab and try again.")]
    NoDeviceAvailable,

    #[error("The playback device is no longer available.")]
    DeviceLost,

    #[error("Failed to initialize player: {0}")]
    SdkInitializationFailed(String),

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

pub type Result<T> = std::result::Result<T, PlayerError>;
