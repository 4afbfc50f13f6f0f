use crate::error::{LibraryError, Result};
use crate::models::{
    Agent, Language, LibraryPreferences, LibrarySection, LibraryType, Scanner, TvLanguageManifest,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_DIR: &str = "plexsync";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub token: String,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    32400
}

impl ServerConfig {
    /// `http://{host}:{port}`, without a trailing slash.
    pub fn base_url(&self) -> Result<String> {
        let raw = format!("http://{}:{}", self.host, self.port);
        let parsed = url::Url::parse(&raw)
            .map_err(|e| LibraryError::Config(format!("invalid server address {raw}: {e}")))?;
        if parsed.host_str().is_none() {
            return Err(LibraryError::Config(format!("no host in {raw}")));
        }
        Ok(raw)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PollSettings {
    pub attempts: u32,
    pub interval_secs: u64,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            attempts: 100,
            interval_secs: 10,
        }
    }
}

impl PollSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryConfig {
    #[serde(default)]
    pub name: Option<String>,
    pub library_type: LibraryType,
    pub locations: Vec<PathBuf>,
    #[serde(default)]
    pub language: Option<Language>,
    #[serde(default)]
    pub agent: Option<Agent>,
    #[serde(default)]
    pub scanner: Option<Scanner>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    #[serde(default)]
    pub libraries: Vec<LibraryConfig>,
    #[serde(default)]
    pub preferences: LibraryPreferences,
    #[serde(default)]
    pub tv_language_manifests: Vec<TvLanguageManifest>,
    #[serde(default)]
    pub playlists_db: Option<PathBuf>,
    #[serde(default)]
    pub poll: PollSettings,
}

impl AppConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: AppConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.token.trim().is_empty() {
            return Err(LibraryError::Config("server token is empty".to_string()));
        }
        for library in &self.libraries {
            if library.locations.is_empty() {
                return Err(LibraryError::Config(format!(
                    "{} library has no locations",
                    library.library_type
                )));
            }
            for location in &library.locations {
                if !location.is_dir() {
                    return Err(LibraryError::Config(format!(
                        "location is not a directory: {}",
                        location.display()
                    )));
                }
            }
        }
        Ok(())
    }

    /// The section descriptor for `library_type`, with preferences attached.
    pub fn section(&self, library_type: LibraryType) -> Option<LibrarySection> {
        let wanted = match library_type {
            LibraryType::Playlist => LibraryType::Music,
            other => other,
        };
        let library = self.libraries.iter().find(|l| l.library_type == wanted)?;
        let mut section = LibrarySection::with_defaults(wanted, library.locations.clone());
        if let Some(name) = &library.name {
            section.name = name.clone();
        }
        if let Some(language) = library.language {
            section.language = language;
        }
        if let Some(agent) = library.agent {
            section.agent = agent;
        }
        if let Some(scanner) = library.scanner {
            section.scanner = scanner;
        }
        section.preferences = self.preferences.for_type(wanted).clone();
        Some(section)
    }

    pub fn playlists_db_path(&self) -> Result<PathBuf> {
        match &self.playlists_db {
            Some(path) => Ok(path.clone()),
            None => Ok(data_dir()?.join("playlists.db")),
        }
    }
}

/// `<platform data dir>/plexsync`, created on demand.
pub fn data_dir() -> Result<PathBuf> {
    let dir = dirs::data_dir()
        .ok_or_else(|| LibraryError::Config("could not determine data directory".to_string()))?
        .join(APP_DIR);
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
