//! Web API client.
//!
//! A thin connector over the host [`HttpClient`]: it re-validates the
//! session before every call, attaches the bearer token, and classifies
//! every response status into a typed outcome. Endpoint wrappers bind
//! parameters and deserialize payloads; they add no behavior beyond that.

use crate::error::{ApiError, Result};
use crate::types::{DeviceList, Paging, Playlist, SearchResults, Track, UserProfile};
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest};
use bridge_traits::time::Clock;
use core_auth::session::SessionHandle;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// What a search query asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchType {
    Track,
    Artist,
    Album,
}

impl SearchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchType::Track => "track",
            SearchType::Artist => "artist",
            SearchType::Album => "album",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "track" => Some(SearchType::Track),
            "artist" => Some(SearchType::Artist),
            "album" => Some(SearchType::Album),
            _ => None,
        }
    }
}

impl std::fmt::Display for SearchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connector for the streaming Web API.
pub struct SpotifyClient {
    http: Arc<dyn HttpClient>,
    session: SessionHandle,
    clock: Arc<dyn Clock>,
    base_url: String,
}

impl SpotifyClient {
    pub fn new(
        http: Arc<dyn HttpClient>,
        session: SessionHandle,
        clock: Arc<dyn Clock>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            http,
            session,
            clock,
            base_url: base_url.into(),
        }
    }

    /// Current bearer token, failing when the session is absent or stale.
    ///
    /// Checked on every call because logout can happen between scheduling a
    /// call and executing it.
    async fn bearer(&self) -> Result<String> {
        let session = self.session.snapshot().await;
        if !session.is_authenticated(self.clock.unix_timestamp_millis()) {
            return Err(ApiError::NotAuthenticated);
        }
        session.access_token.ok_or(ApiError::NotAuthenticated)
    }

    /// Execute one API call and classify the response.
    ///
    /// Returns the decoded JSON body for 200/201, `None` for bodyless
    /// success (204 and other 2xx), and a typed error for everything else.
    #[instrument(skip(self, body), fields(path = %path_and_query))]
    pub async fn request(
        &self,
        method: HttpMethod,
        path_and_query: &str,
        body: Option<serde_json::Value>,
    ) -> Result<Option<serde_json::Value>> {
        let token = self.bearer().await?;

        let mut request = HttpRequest::new(method, format!("{}{}", self.base_url, path_and_query))
            .bearer_token(token)
            .header("Content-Type", "application/json");
        if let Some(body) = &body {
            request = request
                .json(body)
                .map_err(|e| ApiError::Decode(e.to_string()))?;
        }

        let response = self
            .http
            .execute(request)
            .await
            .map_err(|e| ApiError::NetworkError(e.to_string()))?;

        debug!(status = response.status, "API response received");

        match response.status {
            200 | 201 => {
                let value = serde_json::from_slice(&response.body)
                    .map_err(|e| ApiError::Decode(e.to_string()))?;
                Ok(Some(value))
            }
            status if (200..300).contains(&status) => Ok(None),
            400 => Err(ApiError::BadRequest(
                provider_message(&response.body).unwrap_or_else(|| "Bad request".to_string()),
            )),
            401 => Err(ApiError::Unauthorized),
            403 => Err(ApiError::Forbidden),
            404 => Err(ApiError::NotFound),
            429 => Err(ApiError::RateLimited),
            500 => Err(ApiError::ServerError),
            status => {
                warn!(status, "unexpected API status");
                Err(ApiError::UnexpectedStatus {
                    status,
                    status_text: response.status_text,
                })
            }
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path_and_query: &str) -> Result<T> {
        let value = self
            .request(HttpMethod::Get, path_and_query, None)
            .await?
            .ok_or_else(|| ApiError::Decode("expected a response body".to_string()))?;
        serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// Search the catalog.
    ///
    /// The query must be non-empty and at least two characters after
    /// trimming; violations fail before any network traffic.
    pub async fn search(&self, query: &str, kind: SearchType) -> Result<SearchResults> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ApiError::BadRequest(
                "Please enter a search term".to_string(),
            ));
        }
        if query.chars().count() < 2 {
            return Err(ApiError::BadRequest(
                "Search term must be at least 2 characters".to_string(),
            ));
        }

        let qs = serde_urlencoded::to_string([
            ("q", query),
            ("type", kind.as_str()),
            ("limit", "20"),
        ])
        .map_err(|e| ApiError::Decode(e.to_string()))?;

        self.get_json(&format!("/search?{}", qs)).await
    }

    /// Current user's profile.
    pub async fn get_profile(&self) -> Result<UserProfile> {
        self.get_json("/me").await
    }

    /// Current user's playlists.
    pub async fn get_playlists(&self) -> Result<Paging<Playlist>> {
        self.get_json("/me/playlists?limit=50").await
    }

    /// Artist details.
    pub async fn get_artist(&self, artist_id: &str) -> Result<crate::types::Artist> {
        self.get_json(&format!("/artists/{}", urlencoding::encode(artist_id)))
            .await
    }

    /// Track details.
    pub async fn get_track(&self, track_id: &str) -> Result<Track> {
        self.get_json(&format!("/tracks/{}", urlencoding::encode(track_id)))
            .await
    }

    /// Available playback devices.
    pub async fn list_devices(&self) -> Result<Vec<crate::types::Device>> {
        let list: DeviceList = self.get_json("/me/player/devices").await?;
        Ok(list.devices)
    }

    /// Start playback of a track on a device.
    ///
    /// Success is 204 or any 2xx; the decoded body, if any, is discarded.
    pub async fn play(&self, device_id: &str, track_uri: &str) -> Result<()> {
        self.request(
            HttpMethod::Put,
            "/me/player/play",
            Some(json!({ "device_id": device_id, "uris": [track_uri] })),
        )
        .await
        .map(|_| ())
    }
}

/// Extract the provider's error message from an error body, when present.
fn provider_message(body: &[u8]) -> Option<String> {
    #[derive(serde::Deserialize)]
    struct ErrorBody {
        error: Option<ErrorDetail>,
    }
    #[derive(serde::Deserialize)]
    struct ErrorDetail {
        message: Option<String>,
    }

    serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .and_then(|e| e.message)
}
