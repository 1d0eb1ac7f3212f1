//! Spotify Web API connector.
//!
//! Wraps outbound calls to the streaming API: attaches the session's bearer
//! token, classifies HTTP status codes into typed outcomes, and exposes the
//! thin endpoint wrappers the session and player controllers use. Also
//! carries the view-layer projections of API payloads (result cards,
//! profile view).

pub mod cards;
pub mod client;
pub mod error;
pub mod types;

pub use client::{SearchType, SpotifyClient};
pub use error::{ApiError, Result};
