//! View-layer projections.
//!
//! The core never renders; it hands the view layer plain data. These
//! structs are the card and profile shapes the UI consumes, derived from
//! API payloads with all formatting (artist joins, duration labels,
//! follower counts) already applied.

use crate::client::SearchType;
use crate::types::{Album, Artist, Playlist, SearchResults, Track, UserProfile};

/// Format milliseconds as `m:ss` with zero-padded seconds.
pub fn format_duration(ms: u64) -> String {
    let total_seconds = ms / 1000;
    let minutes = total_seconds / 60;
    let seconds = total_seconds % 60;
    format!("{}:{:02}", minutes, seconds)
}

/// A playable track result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackCard {
    pub title: String,
    /// Comma-joined artist names.
    pub artists: String,
    pub album: String,
    /// `m:ss` duration label.
    pub duration: String,
    pub artwork_url: Option<String>,
    pub link: Option<String>,
    /// URI passed back to the play command.
    pub uri: String,
}

impl From<&Track> for TrackCard {
    fn from(track: &Track) -> Self {
        let artists = if track.artists.is_empty() {
            "Unknown".to_string()
        } else {
            track
                .artists
                .iter()
                .map(|a| a.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        };
        Self {
            title: track.name.clone(),
            artists,
            album: track
                .album
                .as_ref()
                .map(|a| a.name.clone())
                .unwrap_or_else(|| "Unknown".to_string()),
            duration: format_duration(track.duration_ms),
            artwork_url: track
                .album
                .as_ref()
                .and_then(|a| a.images.first())
                .map(|i| i.url.clone()),
            link: track.external_urls.spotify.clone(),
            uri: track.uri.clone(),
        }
    }
}

/// An artist result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtistCard {
    pub name: String,
    /// Up to two genres, comma-joined.
    pub genres: String,
    pub followers: u64,
    pub artwork_url: Option<String>,
    pub link: Option<String>,
}

impl From<&Artist> for ArtistCard {
    fn from(artist: &Artist) -> Self {
        let genres = if artist.genres.is_empty() {
            "No genre info".to_string()
        } else {
            artist.genres[..artist.genres.len().min(2)].join(", ")
        };
        Self {
            name: artist.name.clone(),
            genres,
            followers: artist.followers.as_ref().map(|f| f.total).unwrap_or(0),
            artwork_url: artist.images.first().map(|i| i.url.clone()),
            link: artist.external_urls.spotify.clone(),
        }
    }
}

/// An album result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumCard {
    pub title: String,
    pub artists: String,
    pub release_date: String,
    pub total_tracks: u32,
    pub artwork_url: Option<String>,
    pub link: Option<String>,
}

impl From<&Album> for AlbumCard {
    fn from(album: &Album) -> Self {
        let artists = if album.artists.is_empty() {
            "Unknown".to_string()
        } else {
            album
                .artists
                .iter()
                .map(|a| a.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        };
        Self {
            title: album.name.clone(),
            artists,
            release_date: album
                .release_date
                .clone()
                .unwrap_or_else(|| "Unknown".to_string()),
            total_tracks: album.total_tracks.unwrap_or(0),
            artwork_url: album.images.first().map(|i| i.url.clone()),
            link: album.external_urls.spotify.clone(),
        }
    }
}

/// A playlist owned by or followed by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistCard {
    pub name: String,
    pub owner: String,
    pub track_count: u64,
    pub artwork_url: Option<String>,
    pub link: Option<String>,
}

impl From<&Playlist> for PlaylistCard {
    fn from(playlist: &Playlist) -> Self {
        Self {
            name: playlist.name.clone(),
            owner: playlist
                .owner
                .as_ref()
                .and_then(|o| o.display_name.clone())
                .unwrap_or_else(|| "Unknown".to_string()),
            track_count: playlist.tracks.as_ref().map(|t| t.total).unwrap_or(0),
            artwork_url: playlist.images.first().map(|i| i.url.clone()),
            link: playlist.external_urls.spotify.clone(),
        }
    }
}

/// The signed-in user's profile, as rendered in the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileView {
    pub display_name: String,
    pub email: String,
    pub avatar_url: Option<String>,
    pub followers: u64,
    pub plan: String,
}

impl From<&UserProfile> for ProfileView {
    fn from(profile: &UserProfile) -> Self {
        Self {
            display_name: profile
                .display_name
                .clone()
                .unwrap_or_else(|| "Streaming User".to_string()),
            email: profile.email.clone().unwrap_or_else(|| "-".to_string()),
            avatar_url: profile.images.first().map(|i| i.url.clone()),
            followers: profile.followers.as_ref().map(|f| f.total).unwrap_or(0),
            plan: profile.product.clone().unwrap_or_else(|| "Free".to_string()),
        }
    }
}

/// One rendered search result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultCard {
    Track(TrackCard),
    Artist(ArtistCard),
    Album(AlbumCard),
}

/// Project search results into cards for the requested type.
///
/// Sections for other types are ignored; an empty vector means the view
/// should show its no-results state.
pub fn result_cards(results: &SearchResults, kind: SearchType) -> Vec<ResultCard> {
    match kind {
        SearchType::Track => results
            .tracks
            .as_ref()
            .map(|page| {
                page.items
                    .iter()
                    .map(|t| ResultCard::Track(TrackCard::from(t)))
                    .collect()
            })
            .unwrap_or_default(),
        SearchType::Artist => results
            .artists
            .as_ref()
            .map(|page| {
                page.items
                    .iter()
                    .map(|a| ResultCard::Artist(ArtistCard::from(a)))
                    .collect()
            })
            .unwrap_or_default(),
        SearchType::Album => results
            .albums
            .as_ref()
            .map(|page| {
                page.items
                    .iter()
                    .map(|a| ResultCard::Album(AlbumCard::from(a)))
                    .collect()
            })
            .unwrap_or_default(),
    }
}
