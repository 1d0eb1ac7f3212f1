//! Player UI projection.
//!
//! Turns the SDK's playback state into the plain display data the view
//! layer renders. All formatting happens here; the view only interpolates.

use bridge_traits::player::SdkPlaybackState;
use provider_spotify::cards::format_duration;

/// Display data for the player bar.
#[derive(Debug, Clone, PartialEq)]
pub struct NowPlaying {
    pub track_name: String,
    /// Comma-joined artist names.
    pub artists: String,
    pub artwork_url: Option<String>,
    /// `"▶"` while paused (pressing resumes), `"⏸"` while playing.
    pub glyph: &'static str,
    /// `position / duration * 100`, clamped to `0.0..=100.0`.
    pub progress_percent: f64,
    /// Elapsed time, `m:ss`.
    pub elapsed: String,
    /// Track duration, `m:ss`.
    pub total: String,
}

impl NowPlaying {
    /// Project an SDK state into display data.
    ///
    /// Returns `None` when no track is loaded; the view hides the player
    /// bar in that case.
    pub fn project(state: &SdkPlaybackState) -> Option<NowPlaying> {
        let track = state.track.as_ref()?;

        let progress_percent = if track.duration_ms == 0 {
            0.0
        } else {
            ((state.position_ms as f64 / track.duration_ms as f64) * 100.0).clamp(0.0, 100.0)
        };

        Some(NowPlaying {
            track_name: track.name.clone(),
            artists: track.artists.join(", "),
            artwork_url: track.album.images.first().cloned(),
            glyph: if state.paused { "▶" } else { "⏸" },
            progress_percent,
            elapsed: format_duration(state.position_ms),
            total: format_duration(track.duration_ms),
        })
    }
}
