//! macOS media sessions via AppleScript
//!
//! Music.app and Spotify are scriptable, so each one that is running counts as
//! a session. The current session is the one whose player state is `playing`.
//! Cover art is not exposed through their scripting dictionaries in a usable
//! form, so thumbnails are always absent.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use quickmedia_core::{
    BridgeError, MediaProperties, MediaSession, PlaybackInfo, PlaybackStatus, PlaybackType,
    SessionManager, TimelineInfo,
};
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

const FIELD_SEPARATOR: &str = "|||";

/// Scriptable players, in enumeration order
const PLAYERS: [Player; 2] = [Player::Spotify, Player::Music];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Player {
    Spotify,
    Music,
}

impl Player {
    fn app_name(&self) -> &'static str {
        match self {
            Player::Spotify => "Spotify",
            Player::Music => "Music",
        }
    }

    /// Spotify reports track duration in milliseconds, Music in seconds
    fn duration_from_script(&self, value: f64) -> Duration {
        let secs = match self {
            Player::Spotify => value / 1000.0,
            Player::Music => value,
        };
        Duration::from_secs_f64(secs.max(0.0))
    }
}

async fn osascript(script: &str) -> Result<String> {
    let output = Command::new("osascript").arg("-e").arg(script).output().await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow!("osascript failed: {}", stderr.trim()));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// AppleScript prints reals with the user's decimal separator
fn parse_real(value: &str) -> Option<f64> {
    value.trim().replace(',', ".").parse().ok()
}

pub struct MacOsManager;

impl MacOsManager {
    /// Make sure AppleScript can be run at all
    pub async fn request() -> Result<Self> {
        osascript("return 1")
            .await
            .map_err(|e| BridgeError::ManagerUnavailable(e.to_string()))?;
        Ok(Self)
    }

    async fn running_players(&self) -> Result<Vec<Player>> {
        let mut running = Vec::new();
        for player in PLAYERS {
            let script = format!(
                "tell application \"System Events\" to (name of processes) contains \"{}\"",
                player.app_name()
            );
            if osascript(&script).await? == "true" {
                running.push(player);
            } else {
                debug!("{} is not running", player.app_name());
            }
        }
        Ok(running)
    }
}

#[async_trait]
impl SessionManager for MacOsManager {
    async fn current_session(&self) -> Result<Option<Box<dyn MediaSession>>> {
        for player in self.running_players().await? {
            let session = AppleScriptSession::new(player);
            if session.player_state().await? == PlaybackStatus::Playing {
                return Ok(Some(Box::new(session)));
            }
        }
        Ok(None)
    }

    async fn sessions(&self) -> Result<Vec<Box<dyn MediaSession>>> {
        Ok(self
            .running_players()
            .await?
            .into_iter()
            .map(|p| Box::new(AppleScriptSession::new(p)) as Box<dyn MediaSession>)
            .collect())
    }
}

pub struct AppleScriptSession {
    player: Player,
}

impl AppleScriptSession {
    fn new(player: Player) -> Self {
        Self { player }
    }

    async fn tell(&self, body: &str) -> Result<String> {
        let script = format!(
            "tell application \"{}\"\n{}\nend tell",
            self.player.app_name(),
            body
        );
        osascript(&script).await
    }

    async fn player_state(&self) -> Result<PlaybackStatus> {
        let state = self.tell("return player state as string").await?;
        Ok(PlaybackStatus::from_player_state(&state))
    }

    async fn command(&self, command: &str) -> Result<bool> {
        self.tell(command).await?;
        Ok(true)
    }
}

#[async_trait]
impl MediaSession for AppleScriptSession {
    fn source_app_id(&self) -> &str {
        self.player.app_name()
    }

    async fn media_properties(&self) -> Result<MediaProperties> {
        let output = self
            .tell(
                r#"
                if player state is stopped then
                    return ""
                end if
                set t to current track
                return (name of t) & "|||" & (artist of t) & "|||" & (album of t) & "|||" & (album artist of t)
            "#,
            )
            .await?;

        Ok(parse_track_fields(&output))
    }

    async fn playback_info(&self) -> Result<PlaybackInfo> {
        Ok(PlaybackInfo {
            status: self.player_state().await?,
            playback_type: Some(PlaybackType::Music),
        })
    }

    async fn timeline(&self) -> Result<TimelineInfo> {
        let output = self
            .tell(
                r#"
                if player state is stopped then
                    return "0|||0"
                end if
                return (player position as string) & "|||" & (duration of current track as string)
            "#,
            )
            .await?;

        let mut parts = output.split(FIELD_SEPARATOR);
        let position = parts.next().and_then(parse_real).unwrap_or(0.0);
        let duration = parts.next().and_then(parse_real).unwrap_or(0.0);

        Ok(TimelineInfo {
            position: Duration::from_secs_f64(position.max(0.0)),
            end_time: self.player.duration_from_script(duration),
        })
    }

    async fn skip_next(&self) -> Result<bool> {
        self.command("next track").await
    }

    async fn skip_previous(&self) -> Result<bool> {
        self.command("previous track").await
    }

    async fn toggle_play_pause(&self) -> Result<bool> {
        self.command("playpause").await
    }

    async fn seek_to(&self, position_ticks: i64) -> Result<bool> {
        let seconds = position_ticks.max(0) as f64 / 10_000_000.0;
        self.command(&format!("set player position to {:.3}", seconds))
            .await
    }
}

fn parse_track_fields(output: &str) -> MediaProperties {
    let mut parts = output.split(FIELD_SEPARATOR).map(|s| s.to_string());
    MediaProperties {
        title: parts.next().unwrap_or_default(),
        artist: parts.next().unwrap_or_default(),
        album_title: parts.next().unwrap_or_default(),
        album_artist: parts.next().unwrap_or_default(),
        thumbnail: None,
    }
}
