use crate::error::{LibraryError, Result};
use crate::models::{FileType, Movie, Song, TvEpisode, TvSeries};
use log::{debug, warn};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use walkdir::WalkDir;

fn title_year_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(.+?)\s*\((\d{4})\)").expect("valid title pattern"))
}

fn episode_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)s(\d{2})e(\d{2})").expect("valid episode pattern"))
}

/// Every regular file below each location is a song.
pub fn scan_songs(locations: &[PathBuf]) -> Result<Vec<Song>> {
    let mut songs = Vec::new();
    for location in locations {
        for entry in WalkDir::new(location).follow_links(true) {
            let entry = entry.map_err(|e| LibraryError::Io(e.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let file_name = entry.file_name().to_string_lossy();
            songs.push(Song::from_file_name(&file_name));
        }
    }
    debug!("Scanned {} local songs in {:?}", songs.len(), locations);
    Ok(songs)
}

/// Parses `<name> (<year>)[, trailing text]`.
pub fn parse_title_and_year(candidate: &str) -> Result<(String, u16)> {
    let captures = title_year_pattern().captures(candidate).ok_or_else(|| {
        LibraryError::NamingPattern(format!(
            "expected '<name> (<year>)' but found '{candidate}'"
        ))
    })?;
    let name = captures[1].trim().to_string();
    let year = captures[2]
        .parse::<u16>()
        .map_err(|_| LibraryError::NamingPattern(format!("bad year in '{candidate}'")))?;
    Ok((name, year))
}

/// The top-level entries of each location, one per movie.
pub fn movie_entries(locations: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut entries = Vec::new();
    for location in locations {
        for entry in std::fs::read_dir(location)? {
            entries.push(entry?.path());
        }
    }
    entries.sort();
    Ok(entries)
}

/// A movie from one top-level file or directory. Directories carry no extension.
pub fn parse_movie(path: &Path) -> Result<Movie> {
    let (file_name, extension) = if path.is_dir() {
        (file_name_of(path), FileType::Unknown)
    } else {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let extension = path
            .extension()
            .map(|ext| FileType::from_extension(&ext.to_string_lossy()))
            .unwrap_or(FileType::Unknown);
        (stem, extension)
    };
    let (name, year) = parse_title_and_year(&file_name)?;
    Ok(Movie {
        name,
        year,
        extension,
    })
}

/// Fails on the first entry that does not follow the movie naming convention.
pub fn scan_movies(locations: &[PathBuf]) -> Result<Vec<Movie>> {
    let movies = movie_entries(locations)?
        .iter()
        .map(|path| parse_movie(path))
        .collect::<Result<Vec<_>>>()?;
    debug!("Scanned {} local movies in {:?}", movies.len(), locations);
    Ok(movies)
}

pub fn parse_episode(series: &str, year: u16, candidate: &str) -> Result<TvEpisode> {
    let captures = episode_pattern().captures(candidate).ok_or_else(|| {
        LibraryError::NamingPattern(format!("not an episode: '{candidate}'"))
    })?;
    // Two ASCII digits always fit.
    let season = captures[1].parse::<u32>().unwrap_or_default();
    let episode = captures[2].parse::<u32>().unwrap_or_default();
    Ok(TvEpisode {
        series: series.to_string(),
        year,
        season,
        episode,
    })
}

#[derive(Debug, Default)]
pub struct TvScan {
    pub series: Vec<TvSeries>,
    pub episodes: Vec<TvEpisode>,
    /// Files that carry no season/episode token (subtitles, artwork, extras).
    pub unknown: Vec<PathBuf>,
}

/// Walks `<series> (<year>)/**/*S##E##*` under each location.
pub fn scan_tv(locations: &[PathBuf]) -> Result<TvScan> {
    let mut scan = TvScan::default();
    for location in locations {
        let mut series_dirs = Vec::new();
        for entry in std::fs::read_dir(location)? {
            let path = entry?.path();
            if path.is_dir() {
                series_dirs.push(path);
            } else {
                scan.unknown.push(path);
            }
        }
        series_dirs.sort();

        for series_dir in series_dirs {
            let (name, year) = parse_title_and_year(&file_name_of(&series_dir))?;
            let before = scan.episodes.len();
            let unknown_before = scan.unknown.len();

            for entry in WalkDir::new(&series_dir).min_depth(1).follow_links(true) {
                let entry = entry.map_err(|e| LibraryError::Io(e.into()))?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let stem = entry
                    .path()
                    .file_stem()
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap_or_default();
                match parse_episode(&name, year, &stem) {
                    Ok(episode) => scan.episodes.push(episode),
                    Err(_) => scan.unknown.push(entry.path().to_path_buf()),
                }
            }

            let unknown = &scan.unknown[unknown_before..];
            if !unknown.is_empty() {
                warn!(
                    "{} ({}): {} files not understood as episodes: {:?}",
                    name,
                    year,
                    unknown.len(),
                    unknown
                );
            }
            debug!(
                "{} ({}): understood {} episodes",
                name,
                year,
                scan.episodes.len() - before
            );
            scan.series.push(TvSeries {
                name,
                year,
                location: series_dir,
            });
        }
    }
    Ok(scan)
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}
