//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the streaming playback
//! core:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus system
//!
//! ## Overview
//!
//! This crate contains the runtime utilities every other core crate depends
//! on. It establishes the logging conventions, the typed event broadcasting
//! mechanism, and the validated configuration the session and player
//! controllers are wired with.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{CoreConfig, PlayerTiming};
pub use error::{Error, Result};
