//! # Playback Device Controller
//!
//! Manages the lifecycle of the external playback SDK instance: player
//! construction, connection, device-id discovery across three partially
//! redundant sources, the play/skip command surface, and the projection of
//! SDK playback state into view data.
//!
//! Device-id discovery is inherently racy — the vendor SDK does not
//! reliably deliver the id through any single channel — so the controller
//! treats the ready event, a post-connect state query, and the Web API
//! device listing as a priority-ordered set of sources, and treats the
//! absence of all three as a degraded state rather than a failure.

pub mod controller;
pub mod error;
pub mod projection;
pub mod state;

pub use controller::DeviceController;
pub use error::{PlayerError, Result};
pub use projection::NowPlaying;
pub use state::{ControllerInput, ControllerState};
