//! Structural matching between local entities and remote items. Identity is
//! exact after case folding; nothing fuzzy happens here.

use crate::models::{FileType, Movie, Song, TvEpisode};
use crate::plex_api::{RemoteEpisode, RemoteMovie, RemoteTrack};
use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// Anything that can be reduced to a comparable identity. `None` means the
/// item cannot be identified and never matches.
pub trait MediaIdentity {
    type Key: Eq + Hash;

    fn identity(&self) -> Option<Self::Key>;
}

fn fold(name: &str) -> String {
    name.trim().to_lowercase()
}

impl MediaIdentity for Song {
    type Key = (String, FileType);

    fn identity(&self) -> Option<Self::Key> {
        Some((fold(&self.name), self.extension))
    }
}

impl MediaIdentity for RemoteTrack {
    type Key = (String, FileType);

    fn identity(&self) -> Option<Self::Key> {
        self.song().and_then(|song| song.identity())
    }
}

impl MediaIdentity for Movie {
    type Key = String;

    fn identity(&self) -> Option<Self::Key> {
        Some(fold(&self.name))
    }
}

impl MediaIdentity for RemoteMovie {
    type Key = String;

    fn identity(&self) -> Option<Self::Key> {
        Some(fold(&self.title))
    }
}

impl MediaIdentity for TvEpisode {
    type Key = (String, u16, u32, u32);

    fn identity(&self) -> Option<Self::Key> {
        Some((fold(&self.series), self.year, self.season, self.episode))
    }
}

impl MediaIdentity for RemoteEpisode {
    type Key = (String, u16, u32, u32);

    fn identity(&self) -> Option<Self::Key> {
        Some((
            fold(&self.series_title),
            self.series_year?,
            self.season?,
            self.episode?,
        ))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult<L, R> {
    /// Each matched local entity with the remote item it resolved to.
    pub matched: Vec<(L, R)>,
    pub unmatched: Vec<L>,
}

impl<L, R> MatchResult<L, R> {
    pub fn matched_remote(&self) -> Vec<R>
    where
        R: Clone,
    {
        self.matched.iter().map(|(_, remote)| remote.clone()).collect()
    }

    pub fn matched_local(&self) -> Vec<&L> {
        self.matched.iter().map(|(local, _)| local).collect()
    }
}

/// Partitions `local` against `remote`. Both sides are treated as sets:
/// duplicate local entities are reported once, and remote-only items are
/// ignored.
pub fn match_items<L, R>(remote: &[R], local: &[L]) -> MatchResult<L, R>
where
    L: MediaIdentity + Clone,
    R: MediaIdentity<Key = L::Key> + Clone,
{
    let mut by_identity: HashMap<L::Key, &R> = HashMap::new();
    for item in remote {
        if let Some(key) = item.identity() {
            by_identity.entry(key).or_insert(item);
        }
    }

    let mut seen = HashSet::new();
    let mut matched = Vec::new();
    let mut unmatched = Vec::new();
    for entity in local {
        let Some(key) = entity.identity() else {
            unmatched.push(entity.clone());
            continue;
        };
        match by_identity.get(&key) {
            Some(item) => {
                if seen.insert(key) {
                    matched.push((entity.clone(), (*item).clone()));
                }
            }
            None => {
                if seen.insert(key) {
                    unmatched.push(entity.clone());
                }
            }
        }
    }

    MatchResult { matched, unmatched }
}
