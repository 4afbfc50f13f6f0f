use crate::config::ServerConfig;
use crate::error::{LibraryError, Result};
use crate::plex_api::{
    PlexApi, RemoteEpisode, RemoteMovie, RemotePlaylist, RemoteSection, RemoteShow, RemoteTrack,
};
use crate::query_builder::QueryBuilder;
use log::debug;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::cell::OnceCell;
use std::time::Duration;

const TRACK_TYPE: i64 = 10;
const MOVIE_TYPE: i64 = 1;
const SHOW_TYPE: i64 = 2;
const EPISODE_TYPE: i64 = 4;

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(rename = "MediaContainer")]
    container: T,
}

#[derive(Debug, Deserialize)]
struct Directories<T> {
    #[serde(rename = "Directory", default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct Metadata<T> {
    #[serde(rename = "Metadata", default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct Identity {
    #[serde(rename = "machineIdentifier")]
    machine_identifier: String,
}

/// Blocking client for the server's HTTP API, backed by `ureq`.
pub struct PlexClient {
    http_client: ureq::Agent,
    base_url: String,
    token: String,
    machine_identifier: OnceCell<String>,
}

impl PlexClient {
    pub fn new(config: &ServerConfig) -> Result<Self> {
        let http_client = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(5))
            .timeout_read(Duration::from_secs(60))
            .timeout_write(Duration::from_secs(15))
            .build();
        Ok(Self {
            http_client,
            base_url: config.base_url()?,
            token: config.token.clone(),
            machine_identifier: OnceCell::new(),
        })
    }

    fn url(&self, path_and_query: &str) -> String {
        format!("{}{}", self.base_url, path_and_query)
    }

    fn send(&self, method: &str, op: &'static str, path_and_query: &str) -> Result<ureq::Response> {
        debug!("{method} {path_and_query}");
        self.http_client
            .request(method, &self.url(path_and_query))
            .set("X-Plex-Token", &self.token)
            .set("Accept", "application/json")
            .call()
            .map_err(|err| LibraryError::remote(op, path_and_query, err))
    }

    fn get_json<T: DeserializeOwned>(&self, op: &'static str, path_and_query: &str) -> Result<T> {
        let response = self.send("GET", op, path_and_query)?;
        let parsed: Envelope<T> = response.into_json()?;
        Ok(parsed.container)
    }

    fn list<T: DeserializeOwned>(&self, op: &'static str, path_and_query: &str) -> Result<Vec<T>> {
        let container: Metadata<T> = self.get_json(op, path_and_query)?;
        Ok(container.items)
    }

    fn section_items<T: DeserializeOwned>(
        &self,
        op: &'static str,
        section_key: &str,
        item_type: i64,
    ) -> Result<Vec<T>> {
        let mut query = QueryBuilder::new(format!("/library/sections/{section_key}/all"))
            .param("type", item_type);
        if item_type == SHOW_TYPE {
            query = query.param("includeGuids", true);
        }
        self.list(op, &query.build())
    }

    fn machine_identifier(&self) -> Result<&str> {
        if let Some(id) = self.machine_identifier.get() {
            return Ok(id.as_str());
        }
        let identity: Identity = self.get_json("IDENTITY", "/identity")?;
        Ok(self
            .machine_identifier
            .get_or_init(|| identity.machine_identifier)
            .as_str())
    }

    fn items_uri(&self, tracks: &[RemoteTrack]) -> Result<String> {
        let keys = tracks
            .iter()
            .map(|track| track.rating_key.as_str())
            .collect::<Vec<_>>()
            .join(",");
        Ok(format!(
            "server://{}/com.plexapp.plugins.library/library/metadata/{}",
            self.machine_identifier()?,
            keys
        ))
    }
}

impl PlexApi for PlexClient {
    fn sections(&self) -> Result<Vec<RemoteSection>> {
        let container: Directories<RemoteSection> =
            self.get_json("LIST_SECTIONS", "/library/sections")?;
        Ok(container.items)
    }

    fn create_section(&self, request: &str) -> Result<()> {
        self.send("POST", "CREATE_SECTION", request)?;
        Ok(())
    }

    fn delete_section(&self, section_key: &str) -> Result<()> {
        self.send(
            "DELETE",
            "DELETE_SECTION",
            &format!("/library/sections/{section_key}"),
        )?;
        Ok(())
    }

    fn set_section_preference(&self, section_key: &str, key: &str, value: &str) -> Result<()> {
        let request = QueryBuilder::new(format!("/library/sections/{section_key}/prefs"))
            .param(key, value)
            .build();
        self.send("PUT", "SET_SECTION_PREFERENCE", &request)?;
        Ok(())
    }

    fn refresh_section(&self, section_key: &str) -> Result<()> {
        self.send(
            "GET",
            "REFRESH_SECTION",
            &format!("/library/sections/{section_key}/refresh"),
        )?;
        Ok(())
    }

    fn tracks(&self, section_key: &str) -> Result<Vec<RemoteTrack>> {
        self.section_items("LIST_TRACKS", section_key, TRACK_TYPE)
    }

    fn movies(&self, section_key: &str) -> Result<Vec<RemoteMovie>> {
        self.section_items("LIST_MOVIES", section_key, MOVIE_TYPE)
    }

    fn shows(&self, section_key: &str) -> Result<Vec<RemoteShow>> {
        self.section_items("LIST_SHOWS", section_key, SHOW_TYPE)
    }

    fn episodes(&self, section_key: &str) -> Result<Vec<RemoteEpisode>> {
        self.section_items("LIST_EPISODES", section_key, EPISODE_TYPE)
    }

    fn set_item_preference(&self, rating_key: &str, key: &str, value: &str) -> Result<()> {
        let request = QueryBuilder::new(format!("/library/metadata/{rating_key}/prefs"))
            .param(key, value)
            .build();
        self.send("PUT", "SET_ITEM_PREFERENCE", &request)?;
        Ok(())
    }

    fn set_server_preference(&self, key: &str, value: &str) -> Result<()> {
        let request = QueryBuilder::new("/:/prefs").param(key, value).build();
        self.send("PUT", "SET_SERVER_PREFERENCE", &request)?;
        Ok(())
    }

    fn playlists(&self, section_key: &str) -> Result<Vec<RemotePlaylist>> {
        let request = QueryBuilder::new("/playlists")
            .param("playlistType", "audio")
            .param("sectionID", section_key)
            .build();
        self.list("LIST_PLAYLISTS", &request)
    }

    fn playlist_items(&self, playlist_key: &str) -> Result<Vec<RemoteTrack>> {
        self.list("LIST_PLAYLIST_ITEMS", &format!("/playlists/{playlist_key}/items"))
    }

    fn create_playlist(
        &self,
        section_key: &str,
        title: &str,
        tracks: &[RemoteTrack],
    ) -> Result<RemotePlaylist> {
        let request = QueryBuilder::new("/playlists")
            .param("type", "audio")
            .param("title", title)
            .param("smart", false)
            .param("sectionID", section_key)
            .param("uri", self.items_uri(tracks)?)
            .build();
        let response = self.send("POST", "CREATE_PLAYLIST", &request)?;
        let parsed: Envelope<Metadata<RemotePlaylist>> = response.into_json()?;
        parsed
            .container
            .items
            .into_iter()
            .next()
            .ok_or_else(|| LibraryError::NotFound {
                op: "CREATE_PLAYLIST",
                target: title.to_string(),
            })
    }

    fn delete_playlist(&self, playlist_key: &str) -> Result<()> {
        self.send(
            "DELETE",
            "DELETE_PLAYLIST",
            &format!("/playlists/{playlist_key}"),
        )?;
        Ok(())
    }

    fn add_playlist_items(&self, playlist_key: &str, tracks: &[RemoteTrack]) -> Result<()> {
        let request = QueryBuilder::new(format!("/playlists/{playlist_key}/items"))
            .param("uri", self.items_uri(tracks)?)
            .build();
        self.send("PUT", "ADD_PLAYLIST_ITEMS", &request)?;
        Ok(())
    }

    fn remove_playlist_items(&self, playlist_key: &str, tracks: &[RemoteTrack]) -> Result<()> {
        for track in tracks {
            let Some(item_id) = track.playlist_item_id else {
                return Err(LibraryError::NotFound {
                    op: "REMOVE_PLAYLIST_ITEMS",
                    target: format!("playlist item for track {}", track.rating_key),
                });
            };
            self.send(
                "DELETE",
                "REMOVE_PLAYLIST_ITEMS",
                &format!("/playlists/{playlist_key}/items/{item_id}"),
            )?;
        }
        Ok(())
    }
}
