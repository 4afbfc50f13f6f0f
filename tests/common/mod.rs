#![allow(dead_code)]

use plexsync_lib::error::{LibraryError, Result};
use plexsync_lib::plex_api::{
    PlexApi, RemoteEpisode, RemoteGuid, RemoteMedia, RemoteMovie, RemotePart, RemotePlaylist,
    RemoteSection, RemoteShow, RemoteTrack,
};
use std::cell::{Cell, RefCell};
use std::fs;
use std::path::Path;

/// In-memory server. Listings ignore the section key; tests use one section
/// per type. Playlist item ids are `position + 100`.
#[derive(Default)]
pub struct FakePlex {
    pub sections: RefCell<Vec<RemoteSection>>,
    pub tracks: RefCell<Vec<RemoteTrack>>,
    pub movies: RefCell<Vec<RemoteMovie>>,
    pub shows: RefCell<Vec<RemoteShow>>,
    pub episodes: RefCell<Vec<RemoteEpisode>>,
    pub playlists: RefCell<Vec<(RemotePlaylist, Vec<RemoteTrack>)>>,
    /// Every mutating call, in order, e.g. `refresh 1` or `section-pref 1 a=1`.
    pub calls: RefCell<Vec<String>>,
    /// Preference keys answered with HTTP 400.
    pub rejected: RefCell<Vec<String>>,
    /// When set, listings reveal this many more items per call.
    pub reveal_step: Cell<Option<usize>>,
    revealed: Cell<usize>,
    track_listings: Cell<usize>,
    next_key: Cell<u64>,
}

impl FakePlex {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_key(&self) -> String {
        let key = self.next_key.get() + 1;
        self.next_key.set(key);
        key.to_string()
    }

    fn record(&self, call: String) {
        self.calls.borrow_mut().push(call);
    }

    pub fn called(&self, prefix: &str) -> bool {
        self.calls.borrow().iter().any(|call| call.starts_with(prefix))
    }

    pub fn track_listings(&self) -> usize {
        self.track_listings.get()
    }

    pub fn add_section(&self, section_type: &str, title: &str) -> String {
        let key = self.next_key();
        self.sections.borrow_mut().push(RemoteSection {
            key: key.clone(),
            section_type: section_type.to_string(),
            title: title.to_string(),
            agent: String::new(),
            scanner: String::new(),
            language: String::new(),
            locations: Vec::new(),
        });
        key
    }

    pub fn add_track(&self, file: &str) -> RemoteTrack {
        let track = track(&self.next_key(), file);
        self.tracks.borrow_mut().push(track.clone());
        track
    }

    pub fn add_playlist(&self, title: &str, files: &[&str]) {
        let items = files
            .iter()
            .map(|file| {
                self.tracks
                    .borrow()
                    .iter()
                    .find(|t| t.file() == Some(*file))
                    .cloned()
                    .unwrap_or_else(|| track(&self.next_key(), file))
            })
            .collect::<Vec<_>>();
        let playlist = RemotePlaylist {
            rating_key: self.next_key(),
            title: title.to_string(),
            playlist_type: "audio".to_string(),
        };
        self.playlists.borrow_mut().push((playlist, items));
    }

    pub fn playlist_titles(&self) -> Vec<String> {
        let mut titles: Vec<String> = self
            .playlists
            .borrow()
            .iter()
            .map(|(p, _)| p.title.clone())
            .collect();
        titles.sort();
        titles
    }

    pub fn playlist_files(&self, title: &str) -> Vec<String> {
        let mut files: Vec<String> = self
            .playlists
            .borrow()
            .iter()
            .filter(|(p, _)| p.title == title)
            .flat_map(|(_, items)| items.iter().filter_map(|t| t.file().map(String::from)))
            .collect();
        files.sort();
        files
    }

    fn visible<T: Clone>(&self, items: &[T]) -> Vec<T> {
        match self.reveal_step.get() {
            Some(step) => {
                let shown = (self.revealed.get() + step).min(items.len());
                self.revealed.set(shown);
                items[..shown].to_vec()
            }
            None => items.to_vec(),
        }
    }

    fn preference(&self, scope: String, key: &str, value: &str) -> Result<()> {
        if self.rejected.borrow().iter().any(|k| k == key) {
            return Err(LibraryError::Status {
                op: "SET_PREFERENCE",
                target: key.to_string(),
                status: 400,
                message: "Bad Request".to_string(),
            });
        }
        self.record(format!("{scope} {key}={value}"));
        Ok(())
    }

    fn with_playlist<T>(
        &self,
        playlist_key: &str,
        f: impl FnOnce(&mut Vec<RemoteTrack>) -> T,
    ) -> Result<T> {
        let mut playlists = self.playlists.borrow_mut();
        let (_, items) = playlists
            .iter_mut()
            .find(|(p, _)| p.rating_key == playlist_key)
            .ok_or_else(|| LibraryError::NotFound {
                op: "PLAYLIST",
                target: playlist_key.to_string(),
            })?;
        Ok(f(items))
    }
}

impl PlexApi for FakePlex {
    fn sections(&self) -> Result<Vec<RemoteSection>> {
        Ok(self.sections.borrow().clone())
    }

    fn create_section(&self, request: &str) -> Result<()> {
        let url = url::Url::parse(&format!("http://fake{request}"))
            .map_err(|e| LibraryError::Config(e.to_string()))?;
        let param = |name: &str| {
            url.query_pairs()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.into_owned())
                .unwrap_or_default()
        };
        let section_type = match param("type").as_str() {
            "music" => "artist".to_string(),
            other => other.to_string(),
        };
        self.add_section(&section_type, &param("name"));
        self.record(format!("create {request}"));
        Ok(())
    }

    fn delete_section(&self, section_key: &str) -> Result<()> {
        self.sections.borrow_mut().retain(|s| s.key != section_key);
        self.record(format!("delete {section_key}"));
        Ok(())
    }

    fn set_section_preference(&self, section_key: &str, key: &str, value: &str) -> Result<()> {
        self.preference(format!("section-pref {section_key}"), key, value)
    }

    fn refresh_section(&self, section_key: &str) -> Result<()> {
        self.record(format!("refresh {section_key}"));
        Ok(())
    }

    fn tracks(&self, _section_key: &str) -> Result<Vec<RemoteTrack>> {
        self.track_listings.set(self.track_listings.get() + 1);
        Ok(self.visible(&self.tracks.borrow()))
    }

    fn movies(&self, _section_key: &str) -> Result<Vec<RemoteMovie>> {
        Ok(self.visible(&self.movies.borrow()))
    }

    fn shows(&self, _section_key: &str) -> Result<Vec<RemoteShow>> {
        Ok(self.shows.borrow().clone())
    }

    fn episodes(&self, _section_key: &str) -> Result<Vec<RemoteEpisode>> {
        Ok(self.visible(&self.episodes.borrow()))
    }

    fn set_item_preference(&self, rating_key: &str, key: &str, value: &str) -> Result<()> {
        self.preference(format!("item-pref {rating_key}"), key, value)
    }

    fn set_server_preference(&self, key: &str, value: &str) -> Result<()> {
        self.preference("server-pref".to_string(), key, value)
    }

    fn playlists(&self, _section_key: &str) -> Result<Vec<RemotePlaylist>> {
        Ok(self
            .playlists
            .borrow()
            .iter()
            .map(|(p, _)| p.clone())
            .collect())
    }

    fn playlist_items(&self, playlist_key: &str) -> Result<Vec<RemoteTrack>> {
        self.with_playlist(playlist_key, |items| {
            items
                .iter()
                .enumerate()
                .map(|(index, item)| RemoteTrack {
                    playlist_item_id: Some(index as u64 + 100),
                    ..item.clone()
                })
                .collect()
        })
    }

    fn create_playlist(
        &self,
        _section_key: &str,
        title: &str,
        tracks: &[RemoteTrack],
    ) -> Result<RemotePlaylist> {
        let playlist = RemotePlaylist {
            rating_key: self.next_key(),
            title: title.to_string(),
            playlist_type: "audio".to_string(),
        };
        self.playlists
            .borrow_mut()
            .push((playlist.clone(), tracks.to_vec()));
        self.record(format!("create-playlist {title}"));
        Ok(playlist)
    }

    fn delete_playlist(&self, playlist_key: &str) -> Result<()> {
        self.playlists
            .borrow_mut()
            .retain(|(p, _)| p.rating_key != playlist_key);
        self.record(format!("delete-playlist {playlist_key}"));
        Ok(())
    }

    fn add_playlist_items(&self, playlist_key: &str, tracks: &[RemoteTrack]) -> Result<()> {
        self.with_playlist(playlist_key, |items| items.extend(tracks.iter().cloned()))
    }

    fn remove_playlist_items(&self, playlist_key: &str, tracks: &[RemoteTrack]) -> Result<()> {
        let item_ids: Vec<u64> = tracks.iter().filter_map(|t| t.playlist_item_id).collect();
        self.with_playlist(playlist_key, |items| {
            let mut index = 0;
            items.retain(|_| {
                let keep = !item_ids.contains(&(index + 100));
                index += 1;
                keep
            })
        })
    }
}

pub fn track(key: &str, file: &str) -> RemoteTrack {
    RemoteTrack {
        rating_key: key.to_string(),
        title: String::new(),
        playlist_item_id: None,
        media: vec![RemoteMedia {
            parts: vec![RemotePart {
                file: file.to_string(),
            }],
        }],
    }
}

pub fn show(key: &str, title: &str, year: u16, tvdb: u64) -> RemoteShow {
    RemoteShow {
        rating_key: key.to_string(),
        title: title.to_string(),
        year: Some(year),
        guids: vec![RemoteGuid {
            id: format!("tvdb://{tvdb}"),
        }],
    }
}

pub fn episode(show_key: &str, series: &str, season: u32, number: u32) -> RemoteEpisode {
    RemoteEpisode {
        rating_key: format!("{show_key}-{season}-{number}"),
        title: String::new(),
        series_title: series.to_string(),
        series_rating_key: Some(show_key.to_string()),
        series_year: None,
        season: Some(season),
        episode: Some(number),
    }
}

/// Creates an empty file, and its parent directories, under `root`.
pub fn touch(root: &Path, relative: &str) -> std::io::Result<()> {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, b"")
}
