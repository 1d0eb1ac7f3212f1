//! # Core Configuration Module
//!
//! Provides configuration management for the streaming playback core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a
//! [`CoreConfig`] holding the OAuth application settings, API endpoints, and
//! player tuning. It enforces fail-fast validation so misconfiguration is
//! caught at startup rather than mid-flow.
//!
//! ## Usage
//!
//! ```
//! use core_runtime::config::CoreConfig;
//!
//! let config = CoreConfig::builder()
//!     .client_id("my-client-id")
//!     .redirect_uri("http://127.0.0.1:5501/callback")
//!     .build()
//!     .expect("Failed to build config");
//!
//! assert_eq!(config.api_base_url, "https://api.spotify.com/v1");
//! ```

use crate::error::{Error, Result};
use std::time::Duration;
use url::Url;

/// Default authorization endpoint.
pub const DEFAULT_AUTH_URL: &str = "https://accounts.spotify.com/authorize";

/// Default token endpoint.
pub const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";

/// Default Web API base URL.
pub const DEFAULT_API_BASE_URL: &str = "https://api.spotify.com/v1";

/// Scopes requested during authorization.
pub const DEFAULT_SCOPES: [&str; 5] = [
    "user-read-private",
    "user-read-email",
    "streaming",
    "user-read-playback-state",
    "user-modify-playback-state",
];

/// Timing knobs for device-id discovery and the SDK/auth rendezvous.
///
/// The delays are empirically chosen and not load-bearing; tests shrink
/// them to keep the suite fast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerTiming {
    /// Delay before the single post-connect state query for a device id.
    pub state_probe_delay: Duration,
    /// Delay before the second-chance API device-listing fallback.
    pub api_fallback_delay: Duration,
    /// Interval of the poll waiting for SDK load and authentication to
    /// rendezvous.
    pub sdk_poll_interval: Duration,
}

impl Default for PlayerTiming {
    fn default() -> Self {
        Self {
            state_probe_delay: Duration::from_millis(500),
            api_fallback_delay: Duration::from_millis(2000),
            sdk_poll_interval: Duration::from_millis(500),
        }
    }
}

/// Core configuration for the streaming playback core.
///
/// Use [`CoreConfig::builder`] to construct instances.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// OAuth client ID registered with the provider.
    pub client_id: String,
    /// Redirect URI registered for the OAuth callback.
    pub redirect_uri: String,
    /// Authorization endpoint URL.
    pub auth_url: String,
    /// Token endpoint URL.
    pub token_url: String,
    /// Web API base URL.
    pub api_base_url: String,
    /// OAuth scopes to request.
    pub scopes: Vec<String>,
    /// Display name the playback device advertises.
    pub player_name: String,
    /// Initial player volume, `0.0..=1.0`.
    pub initial_volume: f32,
    /// Device-discovery and rendezvous timing.
    pub timing: PlayerTiming,
}

impl CoreConfig {
    /// Create a new configuration builder.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }
}

/// Builder for [`CoreConfig`].
#[derive(Debug, Default)]
pub struct CoreConfigBuilder {
    client_id: Option<String>,
    redirect_uri: Option<String>,
    auth_url: Option<String>,
    token_url: Option<String>,
    api_base_url: Option<String>,
    scopes: Option<Vec<String>>,
    player_name: Option<String>,
    initial_volume: Option<f32>,
    timing: Option<PlayerTiming>,
}

impl CoreConfigBuilder {
    pub fn client_id(mut self, value: impl Into<String>) -> Self {
        self.client_id = Some(value.into());
        self
    }

    pub fn redirect_uri(mut self, value: impl Into<String>) -> Self {
        self.redirect_uri = Some(value.into());
        self
    }

    pub fn auth_url(mut self, value: impl Into<String>) -> Self {
        self.auth_url = Some(value.into());
        self
    }

    pub fn token_url(mut self, value: impl Into<String>) -> Self {
        self.token_url = Some(value.into());
        self
    }

    pub fn api_base_url(mut self, value: impl Into<String>) -> Self {
        self.api_base_url = Some(value.into());
        self
    }

    pub fn scopes(mut self, value: Vec<String>) -> Self {
        self.scopes = Some(value);
        self
    }

    pub fn player_name(mut self, value: impl Into<String>) -> Self {
        self.player_name = Some(value.into());
        self
    }

    pub fn initial_volume(mut self, value: f32) -> Self {
        self.initial_volume = Some(value);
        self
    }

    pub fn timing(mut self, value: PlayerTiming) -> Self {
        self.timing = Some(value);
        self
    }

    /// Validate and build the configuration.
    ///
    /// # Errors
    ///
    /// Fails when the client id is missing or empty, a URL does not parse,
    /// or the volume falls outside `0.0..=1.0`.
    pub fn build(self) -> Result<CoreConfig> {
        let client_id = self
            .client_id
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| Error::InvalidConfig {
                field: "client_id".to_string(),
                message: "OAuth client id is required".to_string(),
            })?;

        let redirect_uri = self.redirect_uri.ok_or_else(|| Error::InvalidConfig {
            field: "redirect_uri".to_string(),
            message: "redirect URI is required".to_string(),
        })?;

        let auth_url = self.auth_url.unwrap_or_else(|| DEFAULT_AUTH_URL.to_string());
        let token_url = self
            .token_url
            .unwrap_or_else(|| DEFAULT_TOKEN_URL.to_string());
        let api_base_url = self
            .api_base_url
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());

        for (field, value) in [
            ("redirect_uri", &redirect_uri),
            ("auth_url", &auth_url),
            ("token_url", &token_url),
            ("api_base_url", &api_base_url),
        ] {
            Url::parse(value).map_err(|e| Error::InvalidConfig {
                field: field.to_string(),
                message: format!("not a valid URL: {}", e),
            })?;
        }

        let initial_volume = self.initial_volume.unwrap_or(0.5);
        if !(0.0..=1.0).contains(&initial_volume) {
            return Err(Error::InvalidConfig {
                field: "initial_volume".to_string(),
                message: format!("must be within 0.0..=1.0, got {}", initial_volume),
            });
        }

        Ok(CoreConfig {
            client_id,
            redirect_uri,
            auth_url,
            token_url,
            api_base_url,
            scopes: self
                .scopes
                .unwrap_or_else(|| DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect()),
            player_name: self
                .player_name
                .unwrap_or_else(|| "Streaming Playback Console".to_string()),
            initial_volume,
            timing: self.timing.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> CoreConfigBuilder {
        CoreConfig::builder()
            .client_id("client")
            .redirect_uri("http://127.0.0.1:5501/callback")
    }

    #[test]
    fn build_with_defaults() {
        let config = minimal().build().unwrap();

        assert_eq!(config.auth_url, DEFAULT_AUTH_URL);
        assert_eq!(config.token_url, DEFAULT_TOKEN_URL);
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.scopes.len(), 5);
        assert_eq!(config.initial_volume, 0.5);
        assert_eq!(config.timing, PlayerTiming::default());
    }

    #[test]
    fn missing_client_id_rejected() {
        let result = CoreConfig::builder()
            .redirect_uri("http://127.0.0.1/cb")
            .build();
        assert!(matches!(result, Err(Error::InvalidConfig { .. })));
    }

    #[test]
    fn empty_client_id_rejected() {
        let result = minimal().client_id("   ").build();
        assert!(matches!(result, Err(Error::InvalidConfig { .. })));
    }

    #[test]
    fn invalid_redirect_uri_rejected() {
        let result = minimal().redirect_uri("not a url").build();
        assert!(matches!(result, Err(Error::InvalidConfig { .. })));
    }

    #[test]
    fn out_of_range_volume_rejected() {
        let result = minimal().initial_volume(1.5).build();
        assert!(matches!(result, Err(Error::InvalidConfig { .. })));
    }

    #[test]
    fn custom_timing_preserved() {
        let timing = PlayerTiming {
            state_probe_delay: Duration::from_millis(10),
            api_fallback_delay: Duration::from_millis(20),
            sdk_poll_interval: Duration::from_millis(5),
        };
        let config = minimal().timing(timing.clone()).build().unwrap();
        assert_eq!(config.timing, timing);
    }
}
