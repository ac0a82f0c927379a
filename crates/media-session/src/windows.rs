//! Windows media sessions via System Media Transport Controls (SMTC)
//!
//! Any application that publishes to SMTC (Spotify, browsers, the Media Player
//! app, ...) shows up as a session.
//!
//! Requires Windows 10 version 1809 or later.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use quickmedia_core::{
    BridgeError, MediaProperties, MediaSession, PlaybackInfo, PlaybackStatus, PlaybackType,
    SessionManager, Thumbnail, TimelineInfo,
};
use std::time::Duration;
use tracing::debug;
use windows::{
    Foundation::{AsyncStatus, IAsyncInfo, IAsyncOperation, TimeSpan},
    Media::Control::{
        GlobalSystemMediaTransportControlsSession,
        GlobalSystemMediaTransportControlsSessionManager,
        GlobalSystemMediaTransportControlsSessionMediaProperties,
        GlobalSystemMediaTransportControlsSessionPlaybackStatus,
    },
    Media::MediaPlaybackType,
    Storage::Streams::DataReader,
    core::{Interface, RuntimeType},
};

const POLL_INTERVAL: Duration = Duration::from_millis(10);
const THUMBNAIL_CHUNK: u32 = 128 * 1024;

fn win_err(e: windows::core::Error) -> anyhow::Error {
    anyhow!("{}", e)
}

/// Block until a WinRT async operation leaves the `Started` state.
///
/// There is no timeout: a platform call that never completes hangs the caller.
fn wait_for<T: Interface>(operation: &T) -> Result<()> {
    let info: IAsyncInfo = operation.cast().map_err(win_err)?;
    loop {
        match info.Status().map_err(win_err)? {
            AsyncStatus::Completed => return Ok(()),
            AsyncStatus::Started => std::thread::sleep(POLL_INTERVAL),
            AsyncStatus::Canceled => return Err(anyhow!("Async operation was canceled")),
            AsyncStatus::Error => {
                let code = info.ErrorCode().map_err(win_err)?;
                return Err(win_err(windows::core::Error::from(code)));
            }
            _ => return Err(anyhow!("Unknown async status")),
        }
    }
}

/// Wait for an async operation and take its result
fn complete<T: RuntimeType + 'static>(operation: IAsyncOperation<T>) -> Result<T> {
    wait_for(&operation)?;
    operation.GetResults().map_err(win_err)
}

fn to_duration(span: TimeSpan) -> Duration {
    // TimeSpan counts 100ns ticks
    Duration::from_nanos((span.Duration.max(0) as u64).saturating_mul(100))
}

/// A null object returned where a runtime class was expected surfaces as an
/// error carrying a success code. Only that case means "absent".
fn null_as_none<T>(result: windows::core::Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.code().is_ok() => Ok(None),
        Err(e) => Err(win_err(e)),
    }
}

fn map_status(status: GlobalSystemMediaTransportControlsSessionPlaybackStatus) -> PlaybackStatus {
    match status {
        GlobalSystemMediaTransportControlsSessionPlaybackStatus::Closed => PlaybackStatus::Closed,
        GlobalSystemMediaTransportControlsSessionPlaybackStatus::Opened => PlaybackStatus::Opened,
        GlobalSystemMediaTransportControlsSessionPlaybackStatus::Changing => PlaybackStatus::Changing,
        GlobalSystemMediaTransportControlsSessionPlaybackStatus::Playing => PlaybackStatus::Playing,
        GlobalSystemMediaTransportControlsSessionPlaybackStatus::Paused => PlaybackStatus::Paused,
        _ => PlaybackStatus::Stopped,
    }
}

fn map_type(playback_type: MediaPlaybackType) -> PlaybackType {
    match playback_type {
        MediaPlaybackType::Music => PlaybackType::Music,
        MediaPlaybackType::Video => PlaybackType::Video,
        MediaPlaybackType::Image => PlaybackType::Image,
        _ => PlaybackType::Unknown,
    }
}

pub struct SmtcManager {
    manager: GlobalSystemMediaTransportControlsSessionManager,
}

impl SmtcManager {
    /// Request the session manager from the OS
    pub async fn request() -> Result<Self> {
        let manager = GlobalSystemMediaTransportControlsSessionManager::RequestAsync()
            .map_err(win_err)
            .and_then(complete)
            .map_err(|e| BridgeError::ManagerUnavailable(e.to_string()))?;
        Ok(Self { manager })
    }
}

#[async_trait]
impl SessionManager for SmtcManager {
    async fn current_session(&self) -> Result<Option<Box<dyn MediaSession>>> {
        match null_as_none(self.manager.GetCurrentSession())? {
            Some(session) => Ok(Some(Box::new(SmtcSession::new(session)))),
            None => {
                debug!("No current session");
                Ok(None)
            }
        }
    }

    async fn sessions(&self) -> Result<Vec<Box<dyn MediaSession>>> {
        let sessions = self.manager.GetSessions().map_err(win_err)?;
        Ok(sessions
            .into_iter()
            .map(|s| Box::new(SmtcSession::new(s)) as Box<dyn MediaSession>)
            .collect())
    }
}

pub struct SmtcSession {
    session: GlobalSystemMediaTransportControlsSession,
    app_id: String,
}

impl SmtcSession {
    fn new(session: GlobalSystemMediaTransportControlsSession) -> Self {
        let app_id = session
            .SourceAppUserModelId()
            .map(|id| id.to_string())
            .unwrap_or_default();
        Self { session, app_id }
    }
}

#[async_trait]
impl MediaSession for SmtcSession {
    fn source_app_id(&self) -> &str {
        &self.app_id
    }

    async fn media_properties(&self) -> Result<MediaProperties> {
        let props = complete(self.session.TryGetMediaPropertiesAsync().map_err(win_err)?)?;

        let thumbnail = null_as_none(props.Thumbnail())?
            .map(|_| Box::new(SmtcThumbnail { props: props.clone() }) as Box<dyn Thumbnail>);

        Ok(MediaProperties {
            title: props.Title().map_err(win_err)?.to_string(),
            artist: props.Artist().map_err(win_err)?.to_string(),
            album_title: props.AlbumTitle().map_err(win_err)?.to_string(),
            album_artist: props.AlbumArtist().map_err(win_err)?.to_string(),
            thumbnail,
        })
    }

    async fn playback_info(&self) -> Result<PlaybackInfo> {
        let info = self.session.GetPlaybackInfo().map_err(win_err)?;
        let status = map_status(info.PlaybackStatus().map_err(win_err)?);
        let playback_type = info
            .PlaybackType()
            .ok()
            .and_then(|reference| reference.Value().ok())
            .map(map_type);

        Ok(PlaybackInfo {
            status,
            playback_type,
        })
    }

    async fn timeline(&self) -> Result<TimelineInfo> {
        let timeline = self.session.GetTimelineProperties().map_err(win_err)?;
        Ok(TimelineInfo {
            position: to_duration(timeline.Position().map_err(win_err)?),
            end_time: to_duration(timeline.EndTime().map_err(win_err)?),
        })
    }

    async fn skip_next(&self) -> Result<bool> {
        complete(self.session.TrySkipNextAsync().map_err(win_err)?)
    }

    async fn skip_previous(&self) -> Result<bool> {
        complete(self.session.TrySkipPreviousAsync().map_err(win_err)?)
    }

    async fn toggle_play_pause(&self) -> Result<bool> {
        complete(self.session.TryTogglePlayPauseAsync().map_err(win_err)?)
    }

    async fn seek_to(&self, position_ticks: i64) -> Result<bool> {
        complete(
            self.session
                .TryChangePlaybackPositionAsync(position_ticks)
                .map_err(win_err)?,
        )
    }
}

/// Thumbnail stream of a media properties snapshot, opened on read
struct SmtcThumbnail {
    props: GlobalSystemMediaTransportControlsSessionMediaProperties,
}

#[async_trait]
impl Thumbnail for SmtcThumbnail {
    async fn read_to_end(&self) -> Result<Vec<u8>> {
        let reference = self.props.Thumbnail().map_err(win_err)?;
        let stream = complete(reference.OpenReadAsync().map_err(win_err)?)?;
        let input = stream.GetInputStreamAt(0).map_err(win_err)?;
        let reader = DataReader::CreateDataReader(&input).map_err(win_err)?;

        // Some sources report Size() == 0 for readable streams, so drain
        // until a load comes back empty instead of trusting the size.
        let mut bytes = Vec::new();
        loop {
            let load = reader.LoadAsync(THUMBNAIL_CHUNK).map_err(win_err)?;
            wait_for(&load)?;
            let loaded = load.GetResults().map_err(win_err)?;
            if loaded == 0 {
                break;
            }
            let mut chunk = vec![0u8; loaded as usize];
            reader.ReadBytes(&mut chunk).map_err(win_err)?;
            bytes.extend_from_slice(&chunk);
        }

        debug!("Read {} thumbnail bytes", bytes.len());
        Ok(bytes)
    }
}
