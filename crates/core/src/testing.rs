//! In-memory collaborators for exercising the gateway and the REPL without a
//! platform media subsystem.

use crate::models::{MediaProperties, PlaybackInfo, PlaybackStatus, PlaybackType, TimelineInfo};
use crate::traits::{MediaSession, SessionManager, Thumbnail};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Shared record of the platform calls a mock received
#[derive(Clone, Debug, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    fn record(&self, call: impl Into<String>) {
        if let Ok(mut calls) = self.0.lock() {
            calls.push(call.into());
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.0.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    pub fn contains(&self, call: &str) -> bool {
        self.calls().iter().any(|c| c == call)
    }

    pub fn is_empty(&self) -> bool {
        self.calls().is_empty()
    }
}

/// Scripted media session
#[derive(Clone, Debug)]
pub struct MockSession {
    app_id: String,
    title: String,
    artist: String,
    album_title: String,
    album_artist: String,
    thumbnail: Option<Vec<u8>>,
    playback: PlaybackInfo,
    timeline: TimelineInfo,
    failure: Option<String>,
    calls: CallLog,
}

impl MockSession {
    pub fn new(app_id: &str) -> Self {
        Self {
            app_id: app_id.to_string(),
            title: String::new(),
            artist: String::new(),
            album_title: String::new(),
            album_artist: String::new(),
            thumbnail: None,
            playback: PlaybackInfo {
                status: PlaybackStatus::Playing,
                playback_type: Some(PlaybackType::Music),
            },
            timeline: TimelineInfo::default(),
            failure: None,
            calls: CallLog::default(),
        }
    }

    pub fn with_track(mut self, title: &str, artist: &str) -> Self {
        self.title = title.to_string();
        self.artist = artist.to_string();
        self
    }

    pub fn with_album(mut self, album_title: &str, album_artist: &str) -> Self {
        self.album_title = album_title.to_string();
        self.album_artist = album_artist.to_string();
        self
    }

    pub fn with_thumbnail(mut self, bytes: &[u8]) -> Self {
        self.thumbnail = Some(bytes.to_vec());
        self
    }

    pub fn with_playback(mut self, status: PlaybackStatus, playback_type: Option<PlaybackType>) -> Self {
        self.playback = PlaybackInfo { status, playback_type };
        self
    }

    pub fn with_timeline(mut self, position: Duration, end_time: Duration) -> Self {
        self.timeline = TimelineInfo { position, end_time };
        self
    }

    /// Make every platform call on this session fail with `message`
    pub fn failing(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    /// Handle to the calls made on this session and its clones
    pub fn calls(&self) -> CallLog {
        self.calls.clone()
    }

    fn call(&self, name: impl Into<String>) -> Result<()> {
        self.calls.record(name);
        match &self.failure {
            Some(message) => Err(anyhow!("{}", message)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl MediaSession for MockSession {
    fn source_app_id(&self) -> &str {
        &self.app_id
    }

    async fn media_properties(&self) -> Result<MediaProperties> {
        self.call("media_properties")?;
        Ok(MediaProperties {
            title: self.title.clone(),
            artist: self.artist.clone(),
            album_title: self.album_title.clone(),
            album_artist: self.album_artist.clone(),
            thumbnail: self
                .thumbnail
                .clone()
                .map(|bytes| Box::new(MockThumbnail(bytes)) as Box<dyn Thumbnail>),
        })
    }

    async fn playback_info(&self) -> Result<PlaybackInfo> {
        self.call("playback_info")?;
        Ok(self.playback)
    }

    async fn timeline(&self) -> Result<TimelineInfo> {
        self.call("timeline")?;
        Ok(self.timeline)
    }

    async fn skip_next(&self) -> Result<bool> {
        self.call("skip_next")?;
        Ok(true)
    }

    async fn skip_previous(&self) -> Result<bool> {
        self.call("skip_previous")?;
        Ok(true)
    }

    async fn toggle_play_pause(&self) -> Result<bool> {
        self.call("toggle_play_pause")?;
        Ok(true)
    }

    async fn seek_to(&self, position_ticks: i64) -> Result<bool> {
        self.call(format!("seek_to({})", position_ticks))?;
        Ok(true)
    }
}

/// Cover art held in memory
#[derive(Clone, Debug)]
pub struct MockThumbnail(pub Vec<u8>);

#[async_trait]
impl Thumbnail for MockThumbnail {
    async fn read_to_end(&self) -> Result<Vec<u8>> {
        Ok(self.0.clone())
    }
}

/// Scripted session manager
#[derive(Clone, Debug, Default)]
pub struct MockManager {
    current: Option<MockSession>,
    sessions: Vec<MockSession>,
    failure: Option<String>,
    calls: CallLog,
}

impl MockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the current session. It is also enumerated, like the OS does.
    pub fn with_current(mut self, session: MockSession) -> Self {
        self.sessions.insert(0, session.clone());
        self.current = Some(session);
        self
    }

    /// Add a session that is enumerated but not current
    pub fn with_session(mut self, session: MockSession) -> Self {
        self.sessions.push(session);
        self
    }

    pub fn failing(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    pub fn calls(&self) -> CallLog {
        self.calls.clone()
    }

    fn call(&self, name: &str) -> Result<()> {
        self.calls.record(name);
        match &self.failure {
            Some(message) => Err(anyhow!("{}", message)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl SessionManager for MockManager {
    async fn current_session(&self) -> Result<Option<Box<dyn MediaSession>>> {
        self.call("current_session")?;
        Ok(self
            .current
            .clone()
            .map(|s| Box::new(s) as Box<dyn MediaSession>))
    }

    async fn sessions(&self) -> Result<Vec<Box<dyn MediaSession>>> {
        self.call("sessions")?;
        Ok(self
            .sessions
            .iter()
            .cloned()
            .map(|s| Box::new(s) as Box<dyn MediaSession>)
            .collect())
    }
}
