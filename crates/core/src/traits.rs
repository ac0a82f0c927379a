use crate::models::{MediaProperties, PlaybackInfo, TimelineInfo};
use anyhow::Result;
use async_trait::async_trait;

/// Handle to the platform's media session manager (SMTC, MPRIS, ...)
#[async_trait]
pub trait SessionManager: Send + Sync {
    /// Session the OS considers current/foreground, if any
    async fn current_session(&self) -> Result<Option<Box<dyn MediaSession>>>;

    /// All sessions the OS knows about, in platform order
    async fn sessions(&self) -> Result<Vec<Box<dyn MediaSession>>>;
}

/// One media-producing application registered with the OS
#[async_trait]
pub trait MediaSession: Send + Sync {
    /// Identifier of the owning application (AUMID, D-Bus name, app name)
    fn source_app_id(&self) -> &str;

    /// Get current track metadata
    async fn media_properties(&self) -> Result<MediaProperties>;

    /// Get playback status and type
    async fn playback_info(&self) -> Result<PlaybackInfo>;

    /// Get position and end time of the current item
    async fn timeline(&self) -> Result<TimelineInfo>;

    /// Request the next track. Returns whether the player accepted the request.
    async fn skip_next(&self) -> Result<bool>;

    /// Request the previous track
    async fn skip_previous(&self) -> Result<bool>;

    /// Toggle between playing and paused
    async fn toggle_play_pause(&self) -> Result<bool>;

    /// Seek to an absolute position given in 100ns ticks
    async fn seek_to(&self, position_ticks: i64) -> Result<bool>;
}

/// Lazily readable cover art
#[async_trait]
pub trait Thumbnail: Send + Sync {
    /// Read the whole image into memory
    async fn read_to_end(&self) -> Result<Vec<u8>>;
}
