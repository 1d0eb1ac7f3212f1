//! # Event Bus System
//!
//! Provides an event-driven architecture for the streaming playback core
//! using `tokio::sync::broadcast`. Controllers publish typed events; the
//! view layer and other controllers subscribe independently.
//!
//! ## Usage
//!
//! ```
//! use core_runtime::events::{EventBus, CoreEvent, AuthEvent};
//!
//! let event_bus = EventBus::new(100);
//! let mut stream = event_bus.subscribe();
//!
//! event_bus
//!     .emit(CoreEvent::Auth(AuthEvent::SignedIn { expires_at_ms: 0 }))
//!     .ok();
//!
//! assert!(matches!(stream.try_recv(), Ok(CoreEvent::Auth(_))));
//! ```
//!
//! ## Error Handling
//!
//! Subscribers receive `RecvError::Lagged(n)` when they fall behind by more
//! than the buffer size; that is non-fatal. `RecvError::Closed` signals
//! shutdown.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// Re-export commonly used types
pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

/// Top-level event enum encompassing all event categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Authentication-related events
    Auth(AuthEvent),
    /// Playback-device-related events
    Player(PlayerEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Auth(e) => e.description(),
            CoreEvent::Player(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Auth(AuthEvent::AuthError { .. }) => EventSeverity::Error,
            CoreEvent::Player(PlayerEvent::Failed { .. }) => EventSeverity::Error,
            CoreEvent::Player(PlayerEvent::Degraded { .. }) => EventSeverity::Warning,
            CoreEvent::Player(PlayerEvent::PlaybackError { .. }) => EventSeverity::Warning,
            CoreEvent::Auth(AuthEvent::SignedIn { .. }) => EventSeverity::Info,
            CoreEvent::Player(PlayerEvent::DeviceResolved { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

/// Events related to the authentication lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum AuthEvent {
    /// Authorization redirect is about to be opened.
    SigningIn,
    /// A token was obtained or restored; the session is live.
    SignedIn {
        /// Epoch-ms timestamp when the token expires.
        expires_at_ms: i64,
    },
    /// The session was torn down, explicitly or by a 401.
    SignedOut,
    /// Authentication error occurred.
    AuthError {
        /// Human-readable error message.
        message: String,
        /// Whether the user can retry without re-configuration.
        recoverable: bool,
    },
}

impl AuthEvent {
    fn description(&self) -> &str {
        match self {
            AuthEvent::SigningIn => "Authorization in progress",
            AuthEvent::SignedIn { .. } => "User signed in",
            AuthEvent::SignedOut => "User signed out",
            AuthEvent::AuthError { .. } => "Authentication error",
        }
    }
}

/// The source that produced a device binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceSource {
    /// The SDK's asynchronous `ready` event payload.
    ReadyEvent,
    /// A state query issued shortly after connect.
    StateQuery,
    /// The Web API device listing.
    ApiFallback,
}

/// Events related to the playback device controller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PlayerEvent {
    /// The controller started connecting the SDK player.
    Connecting,
    /// A device id was bound.
    DeviceResolved {
        device_id: String,
        source: DeviceSource,
    },
    /// No device could be resolved; playback commands will re-resolve.
    Degraded { message: String },
    /// The SDK reported a non-fatal playback error.
    PlaybackError { message: String },
    /// The observed playback state changed.
    PlaybackChanged,
    /// The SDK reported a fatal error.
    Failed { message: String },
}

impl PlayerEvent {
    fn description(&self) -> &str {
        match self {
            PlayerEvent::Connecting => "Player connecting",
            PlayerEvent::DeviceResolved { .. } => "Playback device resolved",
            PlayerEvent::Degraded { .. } => "No playback device available",
            PlayerEvent::PlaybackError { .. } => "Playback error",
            PlayerEvent::PlaybackChanged => "Playback state changed",
            PlayerEvent::Failed { .. } => "Player failed",
        }
    }
}

/// Central broadcast channel for publishing events.
///
/// Cheap to clone; all clones share the same channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an
    /// error when there are none. Emitters that do not care may ignore the
    /// result.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        tracing::debug!(event = %event.description(), "emitting core event");
        self.sender.send(event)
    }

    /// Creates a new subscription to the event stream.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}
