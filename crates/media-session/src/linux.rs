//! Linux media sessions via MPRIS (Media Player Remote Interfacing Specification)
//!
//! Every MPRIS-compatible player on the session bus is a session. Queries and
//! transport controls go through `dbus-send`, and its `--print-reply` output is
//! parsed here.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use quickmedia_core::{
    BridgeError, MediaProperties, MediaSession, PlaybackInfo, PlaybackStatus, SessionManager,
    Thumbnail, TimelineInfo,
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

const MPRIS_PREFIX: &str = "org.mpris.MediaPlayer2.";
const MPRIS_PATH: &str = "/org/mpris/MediaPlayer2";
const PLAYER_INTERFACE: &str = "org.mpris.MediaPlayer2.Player";
const BROWSERS: [&str; 3] = ["firefox", "chrome", "chromium"];

/// Run `dbus-send` against the session bus and return its reply text
async fn dbus_send(args: &[&str]) -> Result<String> {
    let output = Command::new("dbus-send")
        .args(["--session", "--print-reply"])
        .args(args)
        .output()
        .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow!("dbus-send failed: {}", stderr.trim()));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

async fn list_bus_names() -> Result<String> {
    dbus_send(&[
        "--dest=org.freedesktop.DBus",
        "/org/freedesktop/DBus",
        "org.freedesktop.DBus.ListNames",
    ])
    .await
}

pub struct MprisManager;

impl MprisManager {
    /// Check that the session bus answers before handing out a manager
    pub async fn request() -> Result<Self> {
        list_bus_names()
            .await
            .map_err(|e| BridgeError::ManagerUnavailable(e.to_string()))?;
        Ok(Self)
    }

    async fn players(&self) -> Result<Vec<String>> {
        Ok(parse_player_names(&list_bus_names().await?))
    }
}

#[async_trait]
impl SessionManager for MprisManager {
    async fn current_session(&self) -> Result<Option<Box<dyn MediaSession>>> {
        for player in self.players().await? {
            let session = MprisSession::new(player);
            match session.property("PlaybackStatus").await {
                Ok(Some(status)) if status == "Playing" => {
                    debug!("Found playing player: {}", session.player);
                    return Ok(Some(Box::new(session)));
                }
                Ok(_) => {}
                Err(e) => debug!("Skipping {}: {}", session.player, e),
            }
        }
        Ok(None)
    }

    async fn sessions(&self) -> Result<Vec<Box<dyn MediaSession>>> {
        Ok(self
            .players()
            .await?
            .into_iter()
            .map(|player| Box::new(MprisSession::new(player)) as Box<dyn MediaSession>)
            .collect())
    }
}

/// One MPRIS player, addressed by its bus name.
///
/// Sessions are resolved per command, so `Metadata` is read at most once per
/// command and shared by the property and timeline queries.
pub struct MprisSession {
    player: String,
    metadata: OnceCell<HashMap<String, String>>,
}

impl MprisSession {
    pub fn new(player: String) -> Self {
        Self {
            player,
            metadata: OnceCell::new(),
        }
    }

    async fn property(&self, property: &str) -> Result<Option<String>> {
        let dest = format!("--dest={}", self.player);
        let interface = format!("string:{}", PLAYER_INTERFACE);
        let name = format!("string:{}", property);
        let reply = dbus_send(&[
            dest.as_str(),
            MPRIS_PATH,
            "org.freedesktop.DBus.Properties.Get",
            interface.as_str(),
            name.as_str(),
        ])
        .await?;
        Ok(parse_property(&reply))
    }

    async fn metadata(&self) -> Result<&HashMap<String, String>> {
        self.metadata.get_or_try_init(|| self.fetch_metadata()).await
    }

    async fn fetch_metadata(&self) -> Result<HashMap<String, String>> {
        let dest = format!("--dest={}", self.player);
        let interface = format!("string:{}", PLAYER_INTERFACE);
        let reply = dbus_send(&[
            dest.as_str(),
            MPRIS_PATH,
            "org.freedesktop.DBus.Properties.Get",
            interface.as_str(),
            "string:Metadata",
        ])
        .await?;
        let metadata = parse_metadata(&reply);
        debug!("Parsed metadata map: {:?}", metadata);
        Ok(metadata)
    }

    async fn call(&self, method: &str, args: &[&str]) -> Result<bool> {
        let dest = format!("--dest={}", self.player);
        let method = format!("{}.{}", PLAYER_INTERFACE, method);
        let mut command = vec![dest.as_str(), MPRIS_PATH, method.as_str()];
        command.extend_from_slice(args);
        dbus_send(&command).await?;
        Ok(true)
    }
}

#[async_trait]
impl MediaSession for MprisSession {
    fn source_app_id(&self) -> &str {
        &self.player
    }

    async fn media_properties(&self) -> Result<MediaProperties> {
        let metadata = self.metadata().await?;
        let take = |key: &str| metadata.get(key).cloned().unwrap_or_default();

        let title = take("xesam:title");
        let artist = take("xesam:artist");
        let album_title = take("xesam:album");
        let album_artist = take("xesam:albumArtist");
        let art_url = take("mpris:artUrl");

        let thumbnail = art_url_path(&art_url)
            .map(|path| Box::new(FileThumbnail { path }) as Box<dyn Thumbnail>);

        Ok(MediaProperties {
            title,
            artist,
            album_title,
            album_artist,
            thumbnail,
        })
    }

    async fn playback_info(&self) -> Result<PlaybackInfo> {
        let status = self
            .property("PlaybackStatus")
            .await?
            .ok_or_else(|| anyhow!("{} did not report a playback status", self.player))?;

        Ok(PlaybackInfo {
            status: PlaybackStatus::from_player_state(&status),
            // MPRIS has no notion of media type
            playback_type: None,
        })
    }

    async fn timeline(&self) -> Result<TimelineInfo> {
        let position_us = match self.property("Position").await {
            Ok(value) => value.and_then(|v| v.parse::<i64>().ok()).unwrap_or(0),
            Err(e) => {
                // Players without seek support often don't implement Position
                debug!("No position from {}: {}", self.player, e);
                0
            }
        };
        let length_us = self
            .metadata()
            .await?
            .get("mpris:length")
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(0);

        Ok(TimelineInfo {
            position: micros(position_us),
            end_time: micros(length_us),
        })
    }

    async fn skip_next(&self) -> Result<bool> {
        self.call("Next", &[]).await
    }

    async fn skip_previous(&self) -> Result<bool> {
        self.call("Previous", &[]).await
    }

    async fn toggle_play_pause(&self) -> Result<bool> {
        self.call("PlayPause", &[]).await
    }

    async fn seek_to(&self, position_ticks: i64) -> Result<bool> {
        let metadata = self.metadata().await?;
        let Some(track_id) = metadata.get("mpris:trackid") else {
            warn!("{} has no track id, cannot seek", self.player);
            return Ok(false);
        };

        let track = format!("objpath:{}", track_id);
        let position = format!("int64:{}", position_ticks / 10);
        self.call("SetPosition", &[track.as_str(), position.as_str()]).await
    }
}

/// Cover art stored on the local filesystem
struct FileThumbnail {
    path: PathBuf,
}

#[async_trait]
impl Thumbnail for FileThumbnail {
    async fn read_to_end(&self) -> Result<Vec<u8>> {
        Ok(tokio::fs::read(&self.path).await?)
    }
}

fn micros(value: i64) -> Duration {
    Duration::from_micros(value.max(0) as u64)
}

/// Local path of an `mpris:artUrl`. Remote art is not fetched.
fn art_url_path(url: &str) -> Option<PathBuf> {
    let path = url.strip_prefix("file://")?;
    if path.is_empty() {
        return None;
    }
    let decoded = urlencoding::decode_binary(path.as_bytes());
    Some(PathBuf::from(String::from_utf8_lossy(&decoded).into_owned()))
}

/// MPRIS bus names from a `ListNames` reply, dedicated players before browsers
fn parse_player_names(reply: &str) -> Vec<String> {
    let mut browser_players = Vec::new();
    let mut other_players = Vec::new();

    for line in reply.lines() {
        let Some(name) = parse_value(line) else {
            continue;
        };
        if !name.starts_with(MPRIS_PREFIX) {
            continue;
        }
        if BROWSERS.iter().any(|b| name.contains(b)) {
            browser_players.push(name);
        } else {
            other_players.push(name);
        }
    }

    other_players.extend(browser_players);
    other_players
}

/// Extract a scalar from one line of `dbus-send` output.
///
/// Handles `string "..."`, `object path "..."` and numeric/boolean types, with
/// or without a leading `variant`.
fn parse_value(line: &str) -> Option<String> {
    let line = line.trim();
    let line = line.strip_prefix("variant").unwrap_or(line).trim_start();

    for quoted in ["string ", "object path "] {
        if let Some(rest) = line.strip_prefix(quoted) {
            let start = rest.find('"')?;
            let end = rest.rfind('"')?;
            if end <= start {
                return None;
            }
            return Some(rest[start + 1..end].to_string());
        }
    }

    let mut parts = line.split_whitespace();
    let kind = parts.next()?;
    match kind {
        "int16" | "uint16" | "int32" | "uint32" | "int64" | "uint64" | "double" | "boolean"
        | "byte" => parts.next().map(|v| v.to_string()),
        _ => None,
    }
}

/// Value of a `Properties.Get` reply
fn parse_property(reply: &str) -> Option<String> {
    reply
        .lines()
        .filter(|l| l.trim_start().starts_with("variant"))
        .find_map(parse_value)
}

/// Flatten the `Metadata` dict. Array values keep their first element.
fn parse_metadata(reply: &str) -> HashMap<String, String> {
    let lines: Vec<&str> = reply.lines().map(str::trim).collect();
    let mut metadata = HashMap::new();

    let mut i = 0;
    while i < lines.len() {
        if !lines[i].starts_with("dict entry(") {
            i += 1;
            continue;
        }

        let Some(key) = lines.get(i + 1).and_then(|l| parse_value(l)) else {
            i += 1;
            continue;
        };
        let Some(variant) = lines.get(i + 2) else {
            break;
        };

        if variant.ends_with("array [") {
            let value = lines[i + 3..]
                .iter()
                .take_while(|l| !l.starts_with(']'))
                .find_map(|l| parse_value(l));
            if let Some(value) = value {
                metadata.insert(key, value);
            }
        } else if let Some(value) = parse_value(variant) {
            metadata.insert(key, value);
        }

        i += 2;
    }

    metadata
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIST_NAMES: &str = r#"method return time=1700000000.123456 sender=org.freedesktop.DBus -> destination=:1.210 serial=3 reply_serial=2
   array [
      string "org.freedesktop.DBus"
      string ":1.7"
      string "org.mpris.MediaPlayer2.firefox.instance_1_84"
      string "org.freedesktop.Notifications"
      string "org.mpris.MediaPlayer2.spotify"
      string "org.mpris.MediaPlayer2.vlc"
   ]
"#;

    const METADATA: &str = r#"method return time=1700000000.654321 sender=:1.93 -> destination=:1.211 serial=1442 reply_serial=2
   variant       array [
         dict entry(
            string "mpris:trackid"
            variant                object path "/com/spotify/track/3TO7bbrUKrOSPGRTB5MeCz"
         )
         dict entry(
            string "mpris:length"
            variant                uint64 413250000
         )
         dict entry(
            string "mpris:artUrl"
            variant                string "file:///home/me/.cache/covers/dark%20side.png"
         )
         dict entry(
            string "xesam:album"
            variant                string "The Dark Side of the Moon"
         )
         dict entry(
            string "xesam:albumArtist"
            variant                array [
                  string "Pink Floyd"
               ]
         )
         dict entry(
            string "xesam:artist"
            variant                array [
                  string "Pink Floyd"
                  string "Clare Torry"
               ]
         )
         dict entry(
            string "xesam:title"
            variant                string "The Great Gig in the Sky"
         )
      ]
"#;

    #[test]
    fn test_parse_player_names_orders_browsers_last() {
        let players = parse_player_names(LIST_NAMES);
        assert_eq!(
            players,
            vec![
                "org.mpris.MediaPlayer2.spotify",
                "org.mpris.MediaPlayer2.vlc",
                "org.mpris.MediaPlayer2.firefox.instance_1_84",
            ]
        );
    }

    #[test]
    fn test_parse_property() {
        let status = "method return time=1 sender=:1.93 -> destination=:1.2 serial=5 reply_serial=2\n   variant       string \"Paused\"\n";
        assert_eq!(parse_property(status).as_deref(), Some("Paused"));

        let position = "method return time=1 sender=:1.93 -> destination=:1.2 serial=6 reply_serial=2\n   variant       int64 90000000\n";
        assert_eq!(parse_property(position).as_deref(), Some("90000000"));

        assert_eq!(parse_property("method return time=1\n"), None);
    }

    #[test]
    fn test_parse_metadata() {
        let metadata = parse_metadata(METADATA);
        assert_eq!(metadata["xesam:title"], "The Great Gig in the Sky");
        assert_eq!(metadata["xesam:album"], "The Dark Side of the Moon");
        assert_eq!(metadata["xesam:albumArtist"], "Pink Floyd");
        assert_eq!(metadata["xesam:artist"], "Pink Floyd");
        assert_eq!(metadata["mpris:length"], "413250000");
        assert_eq!(metadata["mpris:trackid"], "/com/spotify/track/3TO7bbrUKrOSPGRTB5MeCz");
    }

    #[test]
    fn test_parse_value_variants() {
        assert_eq!(parse_value("string \"a \\\"b\\\" c\"").as_deref(), Some("a \\\"b\\\" c"));
        assert_eq!(parse_value("variant boolean true").as_deref(), Some("true"));
        assert_eq!(parse_value("variant double 0.5").as_deref(), Some("0.5"));
        assert_eq!(parse_value("dict entry("), None);
        assert_eq!(parse_value("]"), None);
    }

    #[test]
    fn test_art_url_path() {
        assert_eq!(
            art_url_path("file:///home/me/.cache/covers/dark%20side.png"),
            Some(PathBuf::from("/home/me/.cache/covers/dark side.png"))
        );
        assert_eq!(art_url_path("https://i.scdn.co/image/ab67616d0000b273"), None);
        assert_eq!(art_url_path(""), None);
        assert_eq!(art_url_path("file://"), None);
    }

    #[test]
    fn test_art_url_path_escapes() {
        assert_eq!(art_url_path("file:///tmp/%41%42.jpg"), Some(PathBuf::from("/tmp/AB.jpg")));
        assert_eq!(art_url_path("file:///tmp/100%"), Some(PathBuf::from("/tmp/100%")));
        assert_eq!(art_url_path("file:///tmp/a%zzb"), Some(PathBuf::from("/tmp/a%zzb")));
        assert_eq!(
            art_url_path("file:///tmp/caf%C3%A9.png"),
            Some(PathBuf::from("/tmp/café.png"))
        );
    }

    fn session_with_metadata(reply: &str) -> MprisSession {
        MprisSession {
            player: "org.mpris.MediaPlayer2.quickmedia_test".to_string(),
            metadata: OnceCell::new_with(Some(parse_metadata(reply))),
        }
    }

    #[tokio::test]
    async fn test_properties_and_timeline_share_metadata() {
        let session = session_with_metadata(METADATA);

        let props = session.media_properties().await.unwrap();
        assert_eq!(props.title, "The Great Gig in the Sky");
        assert_eq!(props.artist, "Pink Floyd");
        assert_eq!(props.album_artist, "Pink Floyd");
        assert!(props.thumbnail.is_some());

        // The unknown bus name makes Position fail, which reads as zero
        let timeline = session.timeline().await.unwrap();
        assert_eq!(timeline.position, Duration::ZERO);
        assert_eq!(timeline.end_time, Duration::from_millis(413_250));
    }

    #[test]
    fn test_micros_clamps_negative() {
        assert_eq!(micros(-5), Duration::ZERO);
        assert_eq!(micros(1_500_000), Duration::from_millis(1500));
    }
}
