//! Response records written to stdout, one JSON object per command.
//!
//! Each variant carries exactly the fields its command reports. The enums are
//! serialized untagged, so the JSON has no discriminator and the key names
//! below are the wire format.

use crate::command::HELP_COMMANDS;
use crate::models::SessionSnapshot;
use anyhow::Result;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;

pub const NO_ACTIVE_SESSION: &str = "No active media session";
pub const UNKNOWN_COMMAND: &str = "Unknown command";
pub const SEEK_PROMPT: &str = "Enter Time";

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Response {
    Metadata(MetadataResponse),
    Status(StatusResponse),
    Seeked(SeekResponse),
    Error(ErrorResponse),
    Count(CountResponse),
    Help(HelpResponse),
}

/// Shapes built from a [`SessionSnapshot`]
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetadataResponse {
    Full {
        #[serde(rename = "Title")]
        title: String,
        #[serde(rename = "Artist")]
        artist: String,
        #[serde(rename = "Album")]
        album: String,
        #[serde(rename = "AlbumArtist")]
        album_artist: String,
        #[serde(rename = "Status")]
        status: String,
        #[serde(rename = "PlaybackType")]
        playback_type: String,
        #[serde(rename = "Elapsed")]
        elapsed: f64,
        #[serde(rename = "Duration")]
        duration: f64,
        #[serde(rename = "ThumbnailBase64")]
        thumbnail: Option<String>,
    },
    Cover {
        #[serde(rename = "ThumbnailBase64")]
        thumbnail: Option<String>,
    },
    Title {
        #[serde(rename = "Title")]
        title: String,
    },
    Artist {
        #[serde(rename = "Artist")]
        artist: String,
    },
    Album {
        #[serde(rename = "AlbumName")]
        album_name: String,
        #[serde(rename = "AlbumArtist")]
        album_artist: String,
    },
    Timeline {
        #[serde(rename = "Elapsed")]
        elapsed: f64,
        #[serde(rename = "Duration")]
        duration: f64,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StatusResponse {
    pub status: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SeekResponse {
    pub status: String,
    pub position: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CountResponse {
    #[serde(rename = "Count")]
    pub count: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HelpResponse {
    #[serde(rename = "AvailableCommands")]
    pub available_commands: Vec<String>,
}

impl Response {
    pub fn status(status: impl Into<String>) -> Self {
        Response::Status(StatusResponse {
            status: status.into(),
        })
    }

    pub fn error(error: impl Into<String>) -> Self {
        Response::Error(ErrorResponse {
            error: error.into(),
        })
    }

    pub fn no_active_session() -> Self {
        Self::status(NO_ACTIVE_SESSION)
    }

    pub fn unknown_command() -> Self {
        Self::error(UNKNOWN_COMMAND)
    }

    pub fn seeked(position: i64) -> Self {
        Response::Seeked(SeekResponse {
            status: "Seeked".to_string(),
            position,
        })
    }

    pub fn count(count: usize) -> Self {
        Response::Count(CountResponse { count })
    }

    pub fn help() -> Self {
        Response::Help(HelpResponse {
            available_commands: HELP_COMMANDS.iter().map(|c| c.to_string()).collect(),
        })
    }

    /// Serialize to a single line of JSON
    pub fn to_json_line(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl MetadataResponse {
    /// Everything `-all` reports
    pub async fn full(snapshot: &SessionSnapshot) -> Result<Self> {
        let props = &snapshot.properties;
        Ok(MetadataResponse::Full {
            title: props.title.clone(),
            artist: props.artist.clone(),
            album: props.album_title.clone(),
            album_artist: props.album_artist.clone(),
            status: snapshot.playback.status.to_string(),
            playback_type: snapshot
                .playback
                .playback_type
                .map(|t| t.to_string())
                .unwrap_or_default(),
            elapsed: snapshot.timeline.elapsed_secs(),
            duration: snapshot.timeline.duration_secs(),
            thumbnail: thumbnail_base64(snapshot).await?,
        })
    }

    pub async fn cover(snapshot: &SessionSnapshot) -> Result<Self> {
        Ok(MetadataResponse::Cover {
            thumbnail: thumbnail_base64(snapshot).await?,
        })
    }

    pub fn title(snapshot: &SessionSnapshot) -> Self {
        MetadataResponse::Title {
            title: snapshot.properties.title.clone(),
        }
    }

    pub fn artist(snapshot: &SessionSnapshot) -> Self {
        MetadataResponse::Artist {
            artist: snapshot.properties.artist.clone(),
        }
    }

    pub fn album(snapshot: &SessionSnapshot) -> Self {
        MetadataResponse::Album {
            album_name: snapshot.properties.album_title.clone(),
            album_artist: snapshot.properties.album_artist.clone(),
        }
    }

    pub fn timeline(snapshot: &SessionSnapshot) -> Self {
        MetadataResponse::Timeline {
            elapsed: snapshot.timeline.elapsed_secs(),
            duration: snapshot.timeline.duration_secs(),
        }
    }
}

impl From<MetadataResponse> for Response {
    fn from(response: MetadataResponse) -> Self {
        Response::Metadata(response)
    }
}

/// Read the whole thumbnail and base64 it. `None` if the source has no cover.
pub async fn thumbnail_base64(snapshot: &SessionSnapshot) -> Result<Option<String>> {
    let Some(thumbnail) = &snapshot.properties.thumbnail else {
        return Ok(None);
    };
    let bytes = thumbnail.read_to_end().await?;
    Ok(Some(STANDARD.encode(bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MediaProperties, PlaybackInfo, PlaybackStatus, PlaybackType, TimelineInfo};
    use crate::testing::MockThumbnail;
    use crate::traits::Thumbnail;
    use std::time::Duration;

    fn snapshot(thumbnail: Option<&[u8]>) -> SessionSnapshot {
        SessionSnapshot {
            properties: MediaProperties {
                title: "Money".to_string(),
                artist: "Pink Floyd".to_string(),
                album_title: "The Dark Side of the Moon".to_string(),
                album_artist: "Pink Floyd".to_string(),
                thumbnail: thumbnail.map(|b| Box::new(MockThumbnail(b.to_vec())) as Box<dyn Thumbnail>),
            },
            playback: PlaybackInfo {
                status: PlaybackStatus::Paused,
                playback_type: Some(PlaybackType::Music),
            },
            timeline: TimelineInfo {
                position: Duration::from_millis(12_500),
                end_time: Duration::from_secs(382),
            },
        }
    }

    #[test]
    fn test_fixed_responses() {
        assert_eq!(
            Response::no_active_session().to_json_line().unwrap(),
            r#"{"status":"No active media session"}"#
        );
        assert_eq!(
            Response::unknown_command().to_json_line().unwrap(),
            r#"{"error":"Unknown command"}"#
        );
        assert_eq!(
            Response::seeked(49_999_995).to_json_line().unwrap(),
            r#"{"status":"Seeked","position":49999995}"#
        );
        assert_eq!(Response::count(3).to_json_line().unwrap(), r#"{"Count":3}"#);
    }

    #[test]
    fn test_help_lists_commands_in_order() {
        let json = Response::help().to_json_line().unwrap();
        assert_eq!(
            json,
            r#"{"AvailableCommands":["-all","-cover","-name","-artist","-album","-timeline","-skip","-back","-pause","-sessions","-seek","exit"]}"#
        );
    }

    #[tokio::test]
    async fn test_full_response_keys() {
        let snapshot = snapshot(Some(b"abc"));
        let response: Response = MetadataResponse::full(&snapshot).await.unwrap().into();
        let value: serde_json::Value = serde_json::from_str(&response.to_json_line().unwrap()).unwrap();

        assert_eq!(value["Title"], "Money");
        assert_eq!(value["Artist"], "Pink Floyd");
        assert_eq!(value["Album"], "The Dark Side of the Moon");
        assert_eq!(value["AlbumArtist"], "Pink Floyd");
        assert_eq!(value["Status"], "Paused");
        assert_eq!(value["PlaybackType"], "Music");
        assert_eq!(value["Elapsed"], 12.5);
        assert_eq!(value["Duration"], 382.0);
        assert_eq!(value["ThumbnailBase64"], "YWJj");
        assert_eq!(value.as_object().unwrap().len(), 9);
    }

    #[tokio::test]
    async fn test_full_response_without_playback_type() {
        let mut snapshot = snapshot(None);
        snapshot.playback.playback_type = None;
        let response = MetadataResponse::full(&snapshot).await.unwrap();
        match response {
            MetadataResponse::Full {
                playback_type,
                thumbnail,
                ..
            } => {
                assert_eq!(playback_type, "");
                assert!(thumbnail.is_none());
            }
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_cover_without_thumbnail_is_null() {
        let response: Response = MetadataResponse::cover(&snapshot(None)).await.unwrap().into();
        assert_eq!(response.to_json_line().unwrap(), r#"{"ThumbnailBase64":null}"#);
    }

    #[test]
    fn test_album_and_timeline_shapes() {
        let snapshot = snapshot(None);
        let album: Response = MetadataResponse::album(&snapshot).into();
        assert_eq!(
            album.to_json_line().unwrap(),
            r#"{"AlbumName":"The Dark Side of the Moon","AlbumArtist":"Pink Floyd"}"#
        );

        let timeline: Response = MetadataResponse::timeline(&snapshot).into();
        assert_eq!(
            timeline.to_json_line().unwrap(),
            r#"{"Elapsed":12.5,"Duration":382.0}"#
        );
    }
}
