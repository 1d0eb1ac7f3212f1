//! The controller's lifecycle state machine.
//!
//! All state changes funnel through [`ControllerState::apply`], a pure
//! transition function, so each transition is testable in isolation and the
//! controller itself only decides *which* input to feed, never how states
//! combine.

use std::fmt;

/// Lifecycle state of the playback device controller.
///
/// ```text
/// Uninitialized -> Connecting -> Ready(device) -> Active
///        ^                                          |
///        +------------------ Shutdown --------------+
/// ```
///
/// `Failed` is terminal except for `Shutdown`. A controller without a
/// device id stays `Connecting`; that is a degraded state, not a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerState {
    /// No player constructed yet.
    Uninitialized,
    /// Player constructed; connection or device resolution in progress.
    Connecting,
    /// A device id is bound and playback can be targeted at it.
    Ready { device_id: String },
    /// A play command has been issued against the bound device.
    Active { device_id: String },
    /// The SDK reported a fatal error.
    Failed { reason: String },
}

/// Inputs that drive the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerInput {
    /// Player constructed; connection starting.
    ConnectRequested,
    /// A device id was resolved from one of the discovery sources.
    DeviceResolved { device_id: String },
    /// A play command succeeded.
    PlaybackStarted,
    /// The SDK reported a fatal initialization/authentication/account
    /// error.
    SdkFailed { reason: String },
    /// Session teardown; everything resets.
    Shutdown,
}

impl ControllerState {
    /// Apply one input, producing the next state.
    pub fn apply(self, input: ControllerInput) -> ControllerState {
        use ControllerInput as In;
        use ControllerState as St;

        match (self, input) {
            (_, In::Shutdown) => St::Uninitialized,
            // Failed is terminal until shutdown.
            (St::Failed { reason }, _) => St::Failed { reason },
            (_, In::SdkFailed { reason }) => St::Failed { reason },
            (St::Uninitialized, In::ConnectRequested) => St::Connecting,
            // A repeated connect request does not regress a live state.
            (state, In::ConnectRequested) => state,
            (St::Active { .. }, In::DeviceResolved { device_id }) => St::Active { device_id },
            (_, In::DeviceResolved { device_id }) => St::Ready { device_id },
            (St::Ready { device_id }, In::PlaybackStarted) => St::Active { device_id },
            (state, In::PlaybackStarted) => state,
        }
    }

    /// The bound device id, when one exists.
    pub fn device_id(&self) -> Option<&str> {
        match self {
            ControllerState::Ready { device_id } | ControllerState::Active { device_id } => {
                Some(device_id)
            }
            _ => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ControllerState::Failed { .. })
    }
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerState::Uninitialized => write!(f, "uninitialized"),
            ControllerState::Connecting => write!(f, "connecting"),
            ControllerState::Ready { device_id } => write!(f, "ready({})", device_id),
            ControllerState::Active { device_id } => write!(f, "active({})", device_id),
            ControllerState::Failed { reason } => write!(f, "failed({})", reason),
        }
    }
}
