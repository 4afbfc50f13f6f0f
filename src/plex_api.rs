//! Remote resources as the server reports them, and the operations this crate
//! needs from the server.

use crate::error::Result;
use crate::models::Song;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemoteLocation {
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemoteSection {
    pub key: String,
    #[serde(rename = "type")]
    pub section_type: String,
    pub title: String,
    #[serde(default)]
    pub agent: String,
    #[serde(default)]
    pub scanner: String,
    #[serde(default)]
    pub language: String,
    #[serde(rename = "Location", default)]
    pub locations: Vec<RemoteLocation>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemotePart {
    #[serde(default)]
    pub file: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemoteMedia {
    #[serde(rename = "Part", default)]
    pub parts: Vec<RemotePart>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemoteTrack {
    #[serde(rename = "ratingKey")]
    pub rating_key: String,
    #[serde(default)]
    pub title: String,
    /// Only set on tracks listed as playlist items.
    #[serde(rename = "playlistItemID", default)]
    pub playlist_item_id: Option<u64>,
    #[serde(rename = "Media", default)]
    pub media: Vec<RemoteMedia>,
}

impl RemoteTrack {
    pub fn file(&self) -> Option<&str> {
        self.media
            .iter()
            .flat_map(|media| media.parts.iter())
            .map(|part| part.file.as_str())
            .find(|file| !file.is_empty())
    }

    /// The song this track was indexed from, derived from its file path.
    pub fn song(&self) -> Option<Song> {
        let file = self.file()?;
        let file_name = file.rsplit(['/', '\\']).next()?;
        if file_name.is_empty() {
            return None;
        }
        Some(Song::from_file_name(file_name))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemoteMovie {
    #[serde(rename = "ratingKey")]
    pub rating_key: String,
    pub title: String,
    #[serde(default)]
    pub year: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemoteGuid {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemoteShow {
    #[serde(rename = "ratingKey")]
    pub rating_key: String,
    pub title: String,
    #[serde(default)]
    pub year: Option<u16>,
    #[serde(rename = "Guid", default)]
    pub guids: Vec<RemoteGuid>,
}

impl RemoteShow {
    /// External ids carrying `prefix` (e.g. `tvdb://`), parsed as integers.
    /// Malformed ids are skipped.
    pub fn external_ids(&self, prefix: &str) -> Vec<u64> {
        self.guids
            .iter()
            .filter_map(|guid| guid.id.strip_prefix(prefix))
            .filter_map(|id| id.parse::<u64>().ok())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemoteEpisode {
    #[serde(rename = "ratingKey")]
    pub rating_key: String,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "grandparentTitle", default)]
    pub series_title: String,
    #[serde(rename = "grandparentRatingKey", default)]
    pub series_rating_key: Option<String>,
    /// Filled from the show listing; the episode listing does not carry it.
    #[serde(skip)]
    pub series_year: Option<u16>,
    #[serde(rename = "parentIndex", default)]
    pub season: Option<u32>,
    #[serde(rename = "index", default)]
    pub episode: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemotePlaylist {
    #[serde(rename = "ratingKey")]
    pub rating_key: String,
    pub title: String,
    #[serde(rename = "playlistType", default)]
    pub playlist_type: String,
}

/// Everything the reconciler and playlist manager ask of the server. Each
/// call is attempted once; errors propagate to the caller.
pub trait PlexApi {
    fn sections(&self) -> Result<Vec<RemoteSection>>;

    /// Issues a pre-encoded section-create request (`/library/sections?...`).
    fn create_section(&self, request: &str) -> Result<()>;

    fn delete_section(&self, section_key: &str) -> Result<()>;

    fn set_section_preference(&self, section_key: &str, key: &str, value: &str) -> Result<()>;

    fn refresh_section(&self, section_key: &str) -> Result<()>;

    fn tracks(&self, section_key: &str) -> Result<Vec<RemoteTrack>>;

    fn movies(&self, section_key: &str) -> Result<Vec<RemoteMovie>>;

    fn shows(&self, section_key: &str) -> Result<Vec<RemoteShow>>;

    fn episodes(&self, section_key: &str) -> Result<Vec<RemoteEpisode>>;

    fn set_item_preference(&self, rating_key: &str, key: &str, value: &str) -> Result<()>;

    fn set_server_preference(&self, key: &str, value: &str) -> Result<()>;

    fn playlists(&self, section_key: &str) -> Result<Vec<RemotePlaylist>>;

    fn playlist_items(&self, playlist_key: &str) -> Result<Vec<RemoteTrack>>;

    fn create_playlist(
        &self,
        section_key: &str,
        title: &str,
        tracks: &[RemoteTrack],
    ) -> Result<RemotePlaylist>;

    fn delete_playlist(&self, playlist_key: &str) -> Result<()>;

    fn add_playlist_items(&self, playlist_key: &str, tracks: &[RemoteTrack]) -> Result<()>;

    /// `tracks` must come from `playlist_items` so they carry their item ids.
    fn remove_playlist_items(&self, playlist_key: &str, tracks: &[RemoteTrack]) -> Result<()>;
}
