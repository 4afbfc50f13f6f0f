use crate::db::PlaylistStore;
use crate::error::{LibraryError, Result};
use crate::library::Library;
use crate::matcher::{match_items, MediaIdentity};
use crate::models::{PlaylistDefinition, Song};
use crate::plex_api::{PlexApi, RemotePlaylist, RemoteTrack};
use log::{error, info, warn};
use std::collections::HashSet;

/// Audio playlists in the music section.
pub struct PlaylistManager<'a, A: PlexApi> {
    api: &'a A,
    library: &'a Library<'a, A>,
}

impl<'a, A: PlexApi> PlaylistManager<'a, A> {
    pub fn new(api: &'a A, library: &'a Library<'a, A>) -> Self {
        Self { api, library }
    }

    fn section_key(&self) -> Result<String> {
        Ok(self.library.remote_section()?.key)
    }

    pub fn playlists(&self) -> Result<Vec<RemotePlaylist>> {
        self.api.playlists(&self.section_key()?)
    }

    /// The remote playlist titled exactly `name`.
    pub fn find(&self, name: &str) -> Result<Option<RemotePlaylist>> {
        Ok(self.playlists()?.into_iter().find(|p| p.title == name))
    }

    pub fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.find(name)?.is_some())
    }

    fn require(&self, op: &'static str, name: &str) -> Result<RemotePlaylist> {
        self.find(name)?.ok_or_else(|| LibraryError::NotFound {
            op,
            target: format!("playlist '{name}'"),
        })
    }

    /// Creates each playlist from its songs matched against the library.
    /// Playlists already on the server are left alone; unmatched songs are
    /// reported and left out.
    pub fn create(&self, definitions: &[PlaylistDefinition]) -> Result<()> {
        let section_key = self.section_key()?;
        let tracks = self.library.tracks()?;
        let existing = self.playlists()?;

        for definition in definitions {
            if existing.iter().any(|p| p.title == definition.name) {
                info!("Playlist '{}' already exists, skipping", definition.name);
                continue;
            }
            let songs: Vec<Song> = definition.songs.iter().cloned().collect();
            let result = match_items(&tracks, &songs);
            if !result.unmatched.is_empty() {
                warn!(
                    "Playlist '{}': {} songs not in library: {}",
                    definition.name,
                    result.unmatched.len(),
                    join_songs(&result.unmatched)
                );
            }
            let matched = result.matched_remote();
            if matched.is_empty() {
                warn!("Playlist '{}' has no songs in library, not created", definition.name);
                continue;
            }
            self.api.create_playlist(&section_key, &definition.name, &matched)?;
            info!("Created playlist '{}' with {} songs", definition.name, matched.len());
        }
        Ok(())
    }

    /// Deletes every playlist with a listed name. Missing names are skipped.
    pub fn delete(&self, names: &[&str]) -> Result<()> {
        for playlist in self.playlists()? {
            if names.contains(&playlist.title.as_str()) {
                self.api.delete_playlist(&playlist.rating_key)?;
                info!("Deleted playlist '{}'", playlist.title);
            }
        }
        Ok(())
    }

    pub fn add_songs(&self, name: &str, songs: &[Song]) -> Result<()> {
        let playlist = self.require("ADD_SONGS", name)?;
        let tracks = self.library.tracks()?;
        let result = match_items(&tracks, songs);
        if !result.unmatched.is_empty() {
            warn!(
                "Cannot add {} songs to '{name}', not in library: {}",
                result.unmatched.len(),
                join_songs(&result.unmatched)
            );
        }
        let matched = result.matched_remote();
        if matched.is_empty() {
            return Ok(());
        }
        self.api.add_playlist_items(&playlist.rating_key, &matched)?;
        info!("Added {} songs to '{name}'", matched.len());
        Ok(())
    }

    pub fn delete_songs(&self, name: &str, songs: &[Song]) -> Result<()> {
        let playlist = self.require("DELETE_SONGS", name)?;
        let items = self.api.playlist_items(&playlist.rating_key)?;
        let result = match_items(&items, songs);
        if !result.unmatched.is_empty() {
            warn!(
                "Cannot remove {} songs from '{name}', not in playlist: {}",
                result.unmatched.len(),
                join_songs(&result.unmatched)
            );
        }
        // A song can sit in a playlist more than once; every copy goes.
        let wanted: HashSet<_> = result
            .matched_local()
            .into_iter()
            .filter_map(|song| song.identity())
            .collect();
        let doomed: Vec<RemoteTrack> = items
            .into_iter()
            .filter(|item| item.identity().is_some_and(|key| wanted.contains(&key)))
            .collect();
        if doomed.is_empty() {
            return Ok(());
        }
        self.api.remove_playlist_items(&playlist.rating_key, &doomed)?;
        info!("Removed {} items from '{name}'", doomed.len());
        Ok(())
    }

    /// The songs a remote playlist currently holds.
    pub fn definition(&self, playlist: &RemotePlaylist) -> Result<PlaylistDefinition> {
        let items: Vec<RemoteTrack> = self.api.playlist_items(&playlist.rating_key)?;
        let mut definition = PlaylistDefinition::new(playlist.title.clone());
        let mut unresolved = Vec::new();
        for item in &items {
            match item.song() {
                Some(song) => {
                    definition.songs.insert(song);
                }
                None => unresolved.push(item.rating_key.as_str()),
            }
        }
        if !unresolved.is_empty() {
            warn!(
                "Playlist '{}': {} items have no file and were left out: {}",
                playlist.title,
                unresolved.len(),
                unresolved.join(", ")
            );
        }
        Ok(definition)
    }

    /// Writes every remote playlist to `store`, replacing what it held.
    pub fn export(&self, store: &PlaylistStore) -> Result<Vec<PlaylistDefinition>> {
        let definitions = self
            .playlists()?
            .iter()
            .map(|playlist| self.definition(playlist))
            .collect::<Result<Vec<_>>>()?;
        store.replace_all(&definitions)?;
        info!("Exported {} playlists to {:?}", definitions.len(), store.path());
        Ok(definitions)
    }

    /// Recreates stored playlists (all of them when `names` is empty). A
    /// playlist with any song missing from the library is not created; once
    /// every playlist is processed those songs are reported as an error.
    pub fn import(&self, store: &PlaylistStore, names: &[&str]) -> Result<()> {
        let definitions = if names.is_empty() {
            store.get_all()?
        } else {
            store.get(names)?
        };
        let section_key = self.section_key()?;
        let tracks = self.library.tracks()?;
        let existing = self.playlists()?;

        let mut missing = Vec::new();
        for definition in &definitions {
            if existing.iter().any(|p| p.title == definition.name) {
                info!("Playlist '{}' already exists, skipping", definition.name);
                continue;
            }
            let songs: Vec<Song> = definition.songs.iter().cloned().collect();
            let result = match_items(&tracks, &songs);
            if !result.unmatched.is_empty() {
                error!(
                    "Playlist '{}' not restored, {} songs not in library",
                    definition.name,
                    result.unmatched.len()
                );
                missing.extend(
                    result
                        .unmatched
                        .iter()
                        .map(|song| format!("{}: {song}", definition.name)),
                );
                continue;
            }
            let matched = result.matched_remote();
            if matched.is_empty() {
                warn!("Playlist '{}' is empty, not created", definition.name);
                continue;
            }
            self.api.create_playlist(&section_key, &definition.name, &matched)?;
            info!("Imported playlist '{}' with {} songs", definition.name, matched.len());
        }

        if !missing.is_empty() {
            return Err(LibraryError::IllegalState {
                description: "stored playlists reference songs missing from the library"
                    .to_string(),
                items: missing,
            });
        }
        Ok(())
    }
}

fn join_songs(songs: &[Song]) -> String {
    songs
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
