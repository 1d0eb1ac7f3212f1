//! # Session Controller
//!
//! Orchestrates the whole client core: reacts to page load and the OAuth
//! callback, restores or establishes the session, runs the SDK/auth
//! rendezvous that gates player construction, performs searches for the
//! view layer, and tears everything down on logout.

pub mod controller;
pub mod error;

pub use controller::SessionController;
pub use error::{Result, SessionError};
