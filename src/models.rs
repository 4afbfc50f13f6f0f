use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;

/// Media file extensions this tool knows about. Anything else maps to `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Mp3,
    Flac,
    M4a,
    Wav,
    Ogg,
    Aac,
    Mp4,
    Mkv,
    Avi,
    Unknown,
}

impl FileType {
    pub fn from_extension(ext: &str) -> Self {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "mp3" => FileType::Mp3,
            "flac" => FileType::Flac,
            "m4a" => FileType::M4a,
            "wav" => FileType::Wav,
            "ogg" => FileType::Ogg,
            "aac" => FileType::Aac,
            "mp4" => FileType::Mp4,
            "mkv" => FileType::Mkv,
            "avi" => FileType::Avi,
            _ => FileType::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Mp3 => "mp3",
            FileType::Flac => "flac",
            FileType::M4a => "m4a",
            FileType::Wav => "wav",
            FileType::Ogg => "ogg",
            FileType::Aac => "aac",
            FileType::Mp4 => "mp4",
            FileType::Mkv => "mkv",
            FileType::Avi => "avi",
            FileType::Unknown => "",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Song {
    pub name: String,
    pub extension: FileType,
}

impl Song {
    pub fn new(name: impl Into<String>, extension: FileType) -> Self {
        Self {
            name: name.into(),
            extension,
        }
    }

    /// Parses `name.ext`. A missing or unrecognised extension yields
    /// `FileType::Unknown` and the whole file name is kept as the name, so
    /// `cover.xyz` stays distinguishable from `cover.abc`.
    pub fn from_file_name(file_name: &str) -> Self {
        match file_name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => match FileType::from_extension(ext) {
                FileType::Unknown => Song::new(file_name, FileType::Unknown),
                known => Song::new(stem, known),
            },
            _ => Song::new(file_name, FileType::Unknown),
        }
    }
}

impl fmt::Display for Song {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.extension {
            FileType::Unknown => write!(f, "{}", self.name),
            ext => write!(f, "{}.{}", self.name, ext.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Movie {
    pub name: String,
    pub year: u16,
    pub extension: FileType,
}

impl fmt::Display for Movie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.year)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TvSeries {
    pub name: String,
    pub year: u16,
    pub location: PathBuf,
}

impl fmt::Display for TvSeries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.year)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TvEpisode {
    pub series: String,
    pub year: u16,
    pub season: u32,
    pub episode: u32,
}

impl fmt::Display for TvEpisode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}): S{:02}E{:02}",
            self.series, self.year, self.season, self.episode
        )
    }
}

/// Library kinds. Playlists are not a remote section of their own; they are
/// attached to the music section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LibraryType {
    Music,
    Movie,
    Tv,
    Playlist,
}

impl LibraryType {
    /// Remote section type string. Playlists resolve to the music section.
    pub fn section_type(&self) -> &'static str {
        match self {
            LibraryType::Music | LibraryType::Playlist => "artist",
            LibraryType::Movie => "movie",
            LibraryType::Tv => "show",
        }
    }

    /// Value sent as `type` when creating a section.
    pub fn create_type(&self) -> &'static str {
        match self {
            LibraryType::Music | LibraryType::Playlist => "music",
            LibraryType::Movie => "movie",
            LibraryType::Tv => "show",
        }
    }

    pub fn default_name(&self) -> &'static str {
        match self {
            LibraryType::Music | LibraryType::Playlist => "Music",
            LibraryType::Movie => "Movies",
            LibraryType::Tv => "TV Shows",
        }
    }
}

impl fmt::Display for LibraryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LibraryType::Music => "music",
            LibraryType::Movie => "movie",
            LibraryType::Tv => "tv",
            LibraryType::Playlist => "playlist",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Agent {
    #[serde(rename = "tv.plex.agents.music")]
    Music,
    #[serde(rename = "tv.plex.agents.movie")]
    Movie,
    #[serde(rename = "tv.plex.agents.series")]
    Tv,
    #[serde(rename = "tv.plex.agents.none")]
    None,
}

impl Agent {
    pub fn default_for(library_type: LibraryType) -> Self {
        match library_type {
            LibraryType::Music | LibraryType::Playlist => Agent::Music,
            LibraryType::Movie => Agent::Movie,
            LibraryType::Tv => Agent::Tv,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Agent::Music => "tv.plex.agents.music",
            Agent::Movie => "tv.plex.agents.movie",
            Agent::Tv => "tv.plex.agents.series",
            Agent::None => "tv.plex.agents.none",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scanner {
    #[serde(rename = "Plex Music")]
    Music,
    #[serde(rename = "Plex Movie")]
    Movie,
    #[serde(rename = "Plex TV Series")]
    Tv,
    #[serde(rename = "Plex Video Files Scanner")]
    VideoFiles,
}

impl Scanner {
    pub fn default_for(library_type: LibraryType) -> Self {
        match library_type {
            LibraryType::Music | LibraryType::Playlist => Scanner::Music,
            LibraryType::Movie => Scanner::Movie,
            LibraryType::Tv => Scanner::Tv,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Scanner::Music => "Plex Music",
            Scanner::Movie => "Plex Movie",
            Scanner::Tv => "Plex TV Series",
            Scanner::VideoFiles => "Plex Video Files Scanner",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "en")]
    English,
    #[default]
    #[serde(rename = "en-US")]
    EnglishUs,
    #[serde(rename = "es")]
    Spanish,
    #[serde(rename = "es-ES")]
    SpanishSpain,
    #[serde(rename = "fr")]
    French,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::English => "en",
            Language::EnglishUs => "en-US",
            Language::Spanish => "es",
            Language::SpanishSpain => "es-ES",
            Language::French => "fr",
        }
    }
}

/// A preference value. The server owns the keyset, so this stays free-form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PreferenceValue {
    Bool(bool),
    Int(i64),
    Text(String),
    Nested(BTreeMap<String, PreferenceValue>),
}

impl PreferenceValue {
    /// Query-string form of a scalar. `None` for nested maps.
    pub fn scalar(&self) -> Option<String> {
        match self {
            PreferenceValue::Bool(true) => Some("1".to_string()),
            PreferenceValue::Bool(false) => Some("0".to_string()),
            PreferenceValue::Int(value) => Some(value.to_string()),
            PreferenceValue::Text(value) => Some(value.clone()),
            PreferenceValue::Nested(_) => None,
        }
    }
}

impl From<bool> for PreferenceValue {
    fn from(value: bool) -> Self {
        PreferenceValue::Bool(value)
    }
}

impl From<i64> for PreferenceValue {
    fn from(value: i64) -> Self {
        PreferenceValue::Int(value)
    }
}

impl From<&str> for PreferenceValue {
    fn from(value: &str) -> Self {
        PreferenceValue::Text(value.to_string())
    }
}

impl From<String> for PreferenceValue {
    fn from(value: String) -> Self {
        PreferenceValue::Text(value)
    }
}

impl From<&std::path::Path> for PreferenceValue {
    fn from(value: &std::path::Path) -> Self {
        PreferenceValue::Text(value.to_string_lossy().to_string())
    }
}

impl From<PreferenceSet> for PreferenceValue {
    fn from(value: PreferenceSet) -> Self {
        PreferenceValue::Nested(value)
    }
}

pub type PreferenceSet = BTreeMap<String, PreferenceValue>;

/// Preference sets per library type, plus server-wide settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryPreferences {
    pub music: PreferenceSet,
    pub movie: PreferenceSet,
    pub tv: PreferenceSet,
    pub server: PreferenceSet,
}

impl LibraryPreferences {
    pub fn for_type(&self, library_type: LibraryType) -> &PreferenceSet {
        match library_type {
            LibraryType::Music | LibraryType::Playlist => &self.music,
            LibraryType::Movie => &self.movie,
            LibraryType::Tv => &self.tv,
        }
    }
}

/// Request/response shape of a remote library section. The server assigns
/// the identity; this side never holds it.
#[derive(Debug, Clone, PartialEq)]
pub struct LibrarySection {
    pub name: String,
    pub library_type: LibraryType,
    pub agent: Agent,
    pub scanner: Scanner,
    pub locations: Vec<PathBuf>,
    pub language: Language,
    pub preferences: PreferenceSet,
}

impl LibrarySection {
    /// Descriptor with the per-type default name, agent and scanner.
    pub fn with_defaults(library_type: LibraryType, locations: Vec<PathBuf>) -> Self {
        Self {
            name: library_type.default_name().to_string(),
            library_type,
            agent: Agent::default_for(library_type),
            scanner: Scanner::default_for(library_type),
            locations,
            language: Language::default(),
            preferences: PreferenceSet::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlaylistDefinition {
    pub name: String,
    pub songs: BTreeSet<Song>,
}

impl PlaylistDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            songs: BTreeSet::new(),
        }
    }
}

/// Shows (by external TVDB id) that should carry a language override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TvLanguageManifest {
    pub language: Language,
    pub ids: Vec<u64>,
}
