use crate::config::PollSettings;
use crate::error::{LibraryError, Result};
use crate::library_parser::{scan_movies, scan_songs, scan_tv};
use crate::matcher::{match_items, MediaIdentity};
use crate::models::{
    LibrarySection, LibraryType, Movie, PreferenceSet, PreferenceValue, Song, TvEpisode,
    TvLanguageManifest,
};
use crate::plex_api::{PlexApi, RemoteEpisode, RemoteMovie, RemoteSection, RemoteShow, RemoteTrack};
use crate::query_builder::{self, QueryBuilder};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::fmt::Display;
use std::time::Duration;

const TVDB_PREFIX: &str = "tvdb://";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LibraryState {
    Absent,
    Creating,
    Converging,
    Ready,
    Deleting,
}

/// What the local filesystem holds for a library.
#[derive(Debug, Clone, PartialEq)]
pub enum LocalInventory {
    Songs(Vec<Song>),
    Movies(Vec<Movie>),
    Episodes(Vec<TvEpisode>),
}

impl LocalInventory {
    pub fn len(&self) -> usize {
        match self {
            LocalInventory::Songs(items) => items.len(),
            LocalInventory::Movies(items) => items.len(),
            LocalInventory::Episodes(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// What the server has indexed for a library. TV counts episodes.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteInventory {
    Tracks(Vec<RemoteTrack>),
    Movies(Vec<RemoteMovie>),
    Episodes(Vec<RemoteEpisode>),
}

impl RemoteInventory {
    pub fn len(&self) -> usize {
        match self {
            RemoteInventory::Tracks(items) => items.len(),
            RemoteInventory::Movies(items) => items.len(),
            RemoteInventory::Episodes(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibrarySummary {
    pub title: String,
    pub library_type: LibraryType,
    pub item_count: usize,
}

/// Blocks until `count` reports `expected`, checking at most `attempts` times
/// and sleeping `interval` between checks.
pub fn poll_until<F>(attempts: u32, expected: usize, interval: Duration, mut count: F) -> Result<()>
where
    F: FnMut() -> Result<usize>,
{
    let mut last_count = 0;
    for attempt in 1..=attempts {
        last_count = count()?;
        debug!("Poll {attempt}/{attempts}: server reports {last_count}, expecting {expected}");
        if last_count == expected {
            info!("Server reached expected count {expected} after {attempt} attempts");
            return Ok(());
        }
        if attempt < attempts {
            std::thread::sleep(interval);
        }
    }
    Err(LibraryError::PollTimeout {
        attempts,
        expected,
        last_count,
    })
}

/// Applies each preference separately. A key the server rejects is logged and
/// skipped; auth and transport failures still propagate.
fn apply_each<F>(scope: &str, preferences: &PreferenceSet, mut set: F) -> Result<usize>
where
    F: FnMut(&str, &str) -> Result<()>,
{
    let params: Vec<(String, PreferenceValue)> = preferences
        .iter()
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    let mut applied = 0;
    for (key, value) in query_builder::flatten(&params) {
        match set(&key, &value) {
            Ok(()) => applied += 1,
            Err(err) if err.is_rejection() => {
                warn!("{scope}: server rejected preference {key}={value}, skipping: {err}");
            }
            Err(err) => return Err(err),
        }
    }
    Ok(applied)
}

/// Server-wide settings, applied key by key.
pub fn apply_server_settings<A: PlexApi>(api: &A, settings: &PreferenceSet) -> Result<usize> {
    let applied = apply_each("server settings", settings, |key, value| {
        api.set_server_preference(key, value)
    })?;
    info!("Applied {applied} of {} server settings", settings.len());
    Ok(applied)
}

fn unmatched_names<L, R>(remote: &[R], local: &[L]) -> Vec<String>
where
    L: MediaIdentity + Clone + Display,
    R: MediaIdentity<Key = L::Key> + Clone,
{
    match_items(remote, local)
        .unmatched
        .iter()
        .map(ToString::to_string)
        .collect()
}

/// One library section on the server, reconciled against local locations.
pub struct Library<'a, A: PlexApi> {
    api: &'a A,
    section: LibrarySection,
    poll: PollSettings,
}

impl<'a, A: PlexApi> Library<'a, A> {
    pub fn new(api: &'a A, section: LibrarySection, poll: PollSettings) -> Self {
        Self { api, section, poll }
    }

    pub fn section(&self) -> &LibrarySection {
        &self.section
    }

    fn transition(&self, from: LibraryState, to: LibraryState) {
        debug!(
            "{} library '{}': {:?} -> {:?}",
            self.section.library_type, self.section.name, from, to
        );
    }

    /// The remote section with this library's (type, name), if any.
    pub fn find_section(&self) -> Result<Option<RemoteSection>> {
        let section_type = self.section.library_type.section_type();
        Ok(self
            .api
            .sections()?
            .into_iter()
            .find(|s| s.section_type == section_type && s.title == self.section.name))
    }

    pub fn remote_section(&self) -> Result<RemoteSection> {
        self.find_section()?.ok_or_else(|| LibraryError::NotFound {
            op: "GET_SECTION",
            target: format!("{} library '{}'", self.section.library_type, self.section.name),
        })
    }

    pub fn exists(&self) -> Result<bool> {
        let exists = self.find_section()?.is_some();
        debug!(
            "{} library '{}' exists: {exists}",
            self.section.library_type, self.section.name
        );
        Ok(exists)
    }

    fn create_request(&self) -> String {
        let section = &self.section;
        let mut request = QueryBuilder::new("/library/sections")
            .param("name", section.name.as_str())
            .param("the_type", section.library_type.create_type())
            .param("agent", section.agent.as_str())
            .param("scanner", section.scanner.as_str())
            .param("language", section.language.as_str());
        if section.library_type == LibraryType::Music {
            request = request
                .param("importFromiTunes", "")
                .param("enableAutoPhotoTags", "");
        }
        for location in &section.locations {
            request = request.param("location", location.as_path());
        }
        if section.library_type == LibraryType::Music && !section.preferences.is_empty() {
            request = request.param("prefs", section.preferences.clone());
        }
        request.build()
    }

    /// Creates the section, applies preferences, then waits until the server
    /// has indexed every local item.
    pub fn create(&self) -> Result<()> {
        const OP: &str = "CREATE";
        let library_type = self.section.library_type;
        if library_type == LibraryType::Playlist {
            return Err(LibraryError::UnsupportedLibraryType {
                op: OP,
                library_type,
            });
        }
        if self.exists()? {
            return Err(LibraryError::AlreadyExists {
                op: OP,
                target: format!("{} library '{}'", library_type, self.section.name),
            });
        }

        self.transition(LibraryState::Absent, LibraryState::Creating);
        info!(
            "Creating {} library '{}' at {:?} (agent {}, scanner {}, language {})",
            library_type,
            self.section.name,
            self.section.locations,
            self.section.agent.as_str(),
            self.section.scanner.as_str(),
            self.section.language.as_str()
        );
        let request = self.create_request();
        debug!("Section request: {request}");
        self.api.create_section(&request)?;

        let remote = self.remote_section()?;
        // Music preferences travel inside the create request.
        if library_type != LibraryType::Music {
            let applied = apply_each(&self.section.name, &self.section.preferences, |key, value| {
                self.api.set_section_preference(&remote.key, key, value)
            })?;
            info!(
                "Applied {applied} of {} preferences to '{}'",
                self.section.preferences.len(),
                self.section.name
            );
        }

        self.transition(LibraryState::Creating, LibraryState::Converging);
        self.probe()?;
        self.transition(LibraryState::Converging, LibraryState::Ready);
        Ok(())
    }

    pub fn delete(&self) -> Result<()> {
        let Some(remote) = self.find_section()? else {
            return Err(LibraryError::NotFound {
                op: "DELETE",
                target: format!("{} library '{}'", self.section.library_type, self.section.name),
            });
        };
        self.transition(LibraryState::Ready, LibraryState::Deleting);
        info!("Deleting {} library '{}'", self.section.library_type, self.section.name);
        self.api.delete_section(&remote.key)?;
        self.transition(LibraryState::Deleting, LibraryState::Absent);
        Ok(())
    }

    /// Asks the server to rescan the section's locations.
    pub fn refresh(&self) -> Result<()> {
        let remote = self.remote_section()?;
        info!("Requesting scan of '{}'", remote.title);
        self.api.refresh_section(&remote.key)
    }

    pub fn tracks(&self) -> Result<Vec<RemoteTrack>> {
        let remote = self.remote_section()?;
        self.api.tracks(&remote.key)
    }

    pub fn movies(&self) -> Result<Vec<RemoteMovie>> {
        let remote = self.remote_section()?;
        self.api.movies(&remote.key)
    }

    /// Shows in the section. With `external_ids` non-empty, only shows whose
    /// TVDB ids intersect them are returned; ids with no show are logged.
    pub fn shows(&self, external_ids: &[u64]) -> Result<Vec<RemoteShow>> {
        let remote = self.remote_section()?;
        let shows = self.api.shows(&remote.key)?;
        if external_ids.is_empty() {
            return Ok(shows);
        }

        let mut found = Vec::new();
        let filtered: Vec<RemoteShow> = shows
            .into_iter()
            .filter(|show| {
                let ids = show.external_ids(TVDB_PREFIX);
                let hit = ids.iter().any(|id| external_ids.contains(id));
                if hit {
                    found.extend(ids);
                }
                hit
            })
            .collect();

        let missing: Vec<u64> = external_ids
            .iter()
            .copied()
            .filter(|id| !found.contains(id))
            .collect();
        if !missing.is_empty() {
            debug!("No show in '{}' for ids {:?}", remote.title, missing);
        }
        Ok(filtered)
    }

    /// Episodes with their series year filled in from the show listing.
    pub fn episodes(&self) -> Result<Vec<RemoteEpisode>> {
        let remote = self.remote_section()?;
        let years: HashMap<String, Option<u16>> = self
            .api
            .shows(&remote.key)?
            .into_iter()
            .map(|show| (show.rating_key, show.year))
            .collect();
        let mut episodes = self.api.episodes(&remote.key)?;
        for episode in &mut episodes {
            episode.series_year = episode
                .series_rating_key
                .as_ref()
                .and_then(|key| years.get(key).copied().flatten());
        }
        Ok(episodes)
    }

    pub fn remote_inventory(&self) -> Result<RemoteInventory> {
        match self.section.library_type {
            LibraryType::Music | LibraryType::Playlist => Ok(RemoteInventory::Tracks(self.tracks()?)),
            LibraryType::Movie => Ok(RemoteInventory::Movies(self.movies()?)),
            LibraryType::Tv => Ok(RemoteInventory::Episodes(self.episodes()?)),
        }
    }

    pub fn local_inventory(&self) -> Result<LocalInventory> {
        let locations = &self.section.locations;
        match self.section.library_type {
            LibraryType::Music | LibraryType::Playlist => {
                Ok(LocalInventory::Songs(scan_songs(locations)?))
            }
            LibraryType::Movie => Ok(LocalInventory::Movies(scan_movies(locations)?)),
            LibraryType::Tv => Ok(LocalInventory::Episodes(scan_tv(locations)?.episodes)),
        }
    }

    pub fn remote_count(&self) -> Result<usize> {
        Ok(self.remote_inventory()?.len())
    }

    /// Local items with no remote counterpart. Remote-only items are ignored.
    fn unmatched(&self, local: &LocalInventory, remote: &RemoteInventory) -> Result<Vec<String>> {
        match (local, remote) {
            (LocalInventory::Songs(local), RemoteInventory::Tracks(remote)) => {
                Ok(unmatched_names(remote, local))
            }
            (LocalInventory::Movies(local), RemoteInventory::Movies(remote)) => {
                Ok(unmatched_names(remote, local))
            }
            (LocalInventory::Episodes(local), RemoteInventory::Episodes(remote)) => {
                Ok(unmatched_names(remote, local))
            }
            _ => Err(LibraryError::UnsupportedLibraryType {
                op: "MATCH",
                library_type: self.section.library_type,
            }),
        }
    }

    pub fn poll(&self, attempts: u32, expected: usize, interval: Duration) -> Result<()> {
        info!(
            "Waiting for '{}' to reach {expected} items ({attempts} attempts, {:?} apart)",
            self.section.name, interval
        );
        poll_until(attempts, expected, interval, || self.remote_count())
    }

    /// Compares local and remote inventories. When local items are missing,
    /// requests a rescan and waits until the server holds at least as many
    /// items as exist locally, then fails if any local item is still missing.
    /// Remote-only items never block success.
    pub fn probe(&self) -> Result<()> {
        let local = self.local_inventory()?;
        let remote = self.remote_inventory()?;
        let missing = self.unmatched(&local, &remote)?;
        if missing.is_empty() {
            info!("'{}' matches {} local items", self.section.name, local.len());
            return Ok(());
        }

        info!(
            "Server is missing {} of {} local items in '{}'; requesting a scan",
            missing.len(),
            local.len(),
            self.section.name
        );
        self.refresh()?;

        let expected = local.len();
        // Extras on the server count toward the total but cannot push it past
        // the local count; matching below decides what is really there.
        poll_until(
            self.poll.attempts,
            expected,
            self.poll.interval(),
            || Ok(self.remote_count()?.min(expected)),
        )?;

        let remote = self.remote_inventory()?;
        let missing = self.unmatched(&local, &remote)?;
        if !missing.is_empty() {
            return Err(LibraryError::IllegalState {
                description: format!(
                    "server does not match local files for '{}'",
                    self.section.name
                ),
                items: missing,
            });
        }
        info!("'{}' matches {} local items", self.section.name, local.len());
        Ok(())
    }

    /// For each manifest, waits for its shows to appear and sets their
    /// language override.
    pub fn apply_language_manifests(&self, manifests: &[TvLanguageManifest]) -> Result<()> {
        if self.section.library_type != LibraryType::Tv {
            return Err(LibraryError::UnsupportedLibraryType {
                op: "LANGUAGE_OVERRIDE",
                library_type: self.section.library_type,
            });
        }
        let remote = self.remote_section()?;
        for manifest in manifests {
            let language = manifest.language.as_str();
            info!(
                "Waiting for {} shows to override to {language}",
                manifest.ids.len()
            );
            poll_until(
                self.poll.attempts,
                manifest.ids.len(),
                self.poll.interval(),
                || Ok(self.shows(&manifest.ids)?.len()),
            )?;
            for show in self.shows(&manifest.ids)? {
                self.api
                    .set_item_preference(&show.rating_key, "languageOverride", language)?;
                debug!("Language override ({language}): {}", show.title);
            }
            self.api.refresh_section(&remote.key)?;
        }
        Ok(())
    }

    pub fn summary(&self) -> Result<LibrarySummary> {
        let remote = self.remote_section()?;
        Ok(LibrarySummary {
            title: remote.title,
            library_type: self.section.library_type,
            item_count: self.remote_count()?,
        })
    }
}
