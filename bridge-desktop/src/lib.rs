//! # Desktop Bridge Implementations
//!
//! Concrete desktop-ready implementations of the capability traits:
//! - [`ReqwestHttpClient`](http::ReqwestHttpClient) - HTTP via `reqwest`
//! - [`JsonFileStore`](storage::JsonFileStore) - key-value persistence in a
//!   flat JSON document
//!
//! The playback SDK bridge is intentionally absent here: the vendor SDK is
//! host-provided and every embedding supplies its own
//! [`PlayerSdk`](bridge_traits::player::PlayerSdk) implementation.

pub mod http;
pub mod storage;

pub use http::ReqwestHttpClient;
pub use storage::JsonFileStore;
