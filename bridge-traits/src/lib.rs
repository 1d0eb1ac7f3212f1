//! # Host Bridge Traits
//!
//! Capability contracts that must be implemented by the host environment.
//!
//! ## Overview
//!
//! This crate defines the seam between the streaming client core and the
//! environment it runs in. Each trait represents a capability the core
//! requires but does not implement itself:
//!
//! - [`HttpClient`](http::HttpClient) - outbound HTTP to the accounts and
//!   Web API endpoints
//! - [`KeyValueStore`](storage::KeyValueStore) - persisted session state
//!   (the browser localStorage analog)
//! - [`PlayerSdk`](player::PlayerSdk) / [`PlayerHandle`](player::PlayerHandle) -
//!   the vendor playback SDK that renders audio on a device
//! - [`Clock`](time::Clock) - time source for deterministic testing
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Host
//! implementations should convert platform-specific failures into it with
//! actionable messages.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so implementations can be shared
//! across async tasks behind `Arc`.

pub mod error;
pub mod http;
pub mod player;
pub mod storage;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use player::{
    PlayerConfig, PlayerHandle, PlayerSdk, PlayerSdkEvent, SdkAlbum, SdkPlaybackState, SdkTrack,
    TokenSource,
};
pub use storage::KeyValueStore;
pub use time::{Clock, SystemClock};
