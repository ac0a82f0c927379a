use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::traits::Thumbnail;

/// Track metadata reported by a media session
#[derive(Default)]
pub struct MediaProperties {
    pub title: String,
    pub artist: String,
    pub album_title: String,
    pub album_artist: String,
    /// Cover art, if the source publishes one
    pub thumbnail: Option<Box<dyn Thumbnail>>,
}

impl fmt::Debug for MediaProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaProperties")
            .field("title", &self.title)
            .field("artist", &self.artist)
            .field("album_title", &self.album_title)
            .field("album_artist", &self.album_artist)
            .field("has_thumbnail", &self.thumbnail.is_some())
            .finish()
    }
}

/// Playback state of a session
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackStatus {
    Closed,
    Opened,
    Changing,
    #[default]
    Stopped,
    Playing,
    Paused,
}

impl PlaybackStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackStatus::Closed => "Closed",
            PlaybackStatus::Opened => "Opened",
            PlaybackStatus::Changing => "Changing",
            PlaybackStatus::Stopped => "Stopped",
            PlaybackStatus::Playing => "Playing",
            PlaybackStatus::Paused => "Paused",
        }
    }

    /// Map a free-form player state ("playing", "Paused", ...) onto a status
    pub fn from_player_state(state: &str) -> Self {
        match state.trim().to_lowercase().as_str() {
            "playing" => PlaybackStatus::Playing,
            "paused" => PlaybackStatus::Paused,
            "closed" => PlaybackStatus::Closed,
            "opened" => PlaybackStatus::Opened,
            "changing" => PlaybackStatus::Changing,
            _ => PlaybackStatus::Stopped,
        }
    }
}

impl fmt::Display for PlaybackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of media a session is playing
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackType {
    Unknown,
    Music,
    Video,
    Image,
}

impl PlaybackType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackType::Unknown => "Unknown",
            PlaybackType::Music => "Music",
            PlaybackType::Video => "Video",
            PlaybackType::Image => "Image",
        }
    }
}

impl fmt::Display for PlaybackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of a session's playback state
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PlaybackInfo {
    pub status: PlaybackStatus,
    /// `None` when the source doesn't say what it is playing
    pub playback_type: Option<PlaybackType>,
}

/// Snapshot of a session's position within the current item
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TimelineInfo {
    pub position: Duration,
    pub end_time: Duration,
}

impl TimelineInfo {
    pub fn elapsed_secs(&self) -> f64 {
        self.position.as_secs_f64()
    }

    pub fn duration_secs(&self) -> f64 {
        self.end_time.as_secs_f64()
    }
}

/// Everything a query command may need, fetched fresh per command
#[derive(Debug)]
pub struct SessionSnapshot {
    pub properties: MediaProperties,
    pub playback: PlaybackInfo,
    pub timeline: TimelineInfo,
}
