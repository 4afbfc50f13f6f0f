use crate::error::Result;
use crate::models::{FileType, PlaylistDefinition, Song};
use log::debug;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Transaction};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

const DB_SCHEMA: &str = r#"
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS songs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        extension TEXT NOT NULL,
        UNIQUE(name, extension)
    );

    CREATE TABLE IF NOT EXISTS playlists (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE
    );

    CREATE TABLE IF NOT EXISTS playlist_songs (
        playlist_id INTEGER NOT NULL,
        song_id INTEGER NOT NULL,
        FOREIGN KEY(playlist_id) REFERENCES playlists(id),
        FOREIGN KEY(song_id) REFERENCES songs(id),
        PRIMARY KEY (playlist_id, song_id)
    );
"#;

const DEFINITION_QUERY: &str = "
    SELECT p.name, s.name, s.extension
    FROM playlists p
    LEFT JOIN playlist_songs ps ON ps.playlist_id = p.id
    LEFT JOIN songs s ON s.id = ps.song_id";

/// Rows per multi-row INSERT. Keeps every statement well under SQLite's
/// bound-parameter limit.
pub const BATCH_ROWS: usize = 400;

/// Playlist definitions persisted in a single SQLite file. A connection is
/// opened for each call and closed when it returns.
#[derive(Debug, Clone)]
pub struct PlaylistStore {
    path: PathBuf,
}

impl PlaylistStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> Result<Connection> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(&self.path)?;
        conn.execute_batch(DB_SCHEMA)?;
        Ok(conn)
    }

    /// Adds playlists and their songs. Existing rows are kept; a playlist
    /// that is already stored gains any new songs.
    pub fn add_many(&self, playlists: &[PlaylistDefinition]) -> Result<()> {
        let mut conn = self.open()?;
        let tx = conn.transaction()?;
        insert_definitions(&tx, playlists)?;
        tx.commit()?;
        Ok(())
    }

    /// Replaces the entire store content with `playlists`.
    pub fn replace_all(&self, playlists: &[PlaylistDefinition]) -> Result<()> {
        let mut conn = self.open()?;
        let tx = conn.transaction()?;
        tx.execute_batch(
            "DELETE FROM playlist_songs;
             DELETE FROM playlists;
             DELETE FROM songs;",
        )?;
        insert_definitions(&tx, playlists)?;
        tx.commit()?;
        debug!("Store {:?} now holds {} playlists", self.path, playlists.len());
        Ok(())
    }

    /// Stored definitions whose names are in `names`. Unknown names are ignored.
    pub fn get(&self, names: &[&str]) -> Result<Vec<PlaylistDefinition>> {
        let conn = self.open()?;
        let mut definitions = BTreeMap::new();
        for chunk in names.chunks(BATCH_ROWS) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let sql = format!("{DEFINITION_QUERY} WHERE p.name IN ({placeholders})");
            collect_definitions(&conn, &sql, chunk, &mut definitions)?;
        }
        Ok(definitions.into_values().collect())
    }

    pub fn get_all(&self) -> Result<Vec<PlaylistDefinition>> {
        let conn = self.open()?;
        let mut definitions = BTreeMap::new();
        collect_definitions(&conn, DEFINITION_QUERY, &[], &mut definitions)?;
        Ok(definitions.into_values().collect())
    }
}

fn collect_definitions(
    conn: &Connection,
    sql: &str,
    names: &[&str],
    definitions: &mut BTreeMap<String, PlaylistDefinition>,
) -> Result<()> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params_from_iter(names.iter()), |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, Option<String>>(1)?,
            row.get::<_, Option<String>>(2)?,
        ))
    })?;

    for row in rows {
        let (playlist, song, extension) = row?;
        let definition = definitions
            .entry(playlist.clone())
            .or_insert_with(|| PlaylistDefinition::new(playlist));
        if let Some(song) = song {
            let extension = FileType::from_extension(extension.as_deref().unwrap_or_default());
            definition.songs.insert(Song::new(song, extension));
        }
    }
    Ok(())
}

/// Runs `head VALUES (...), (...)` in batches of `BATCH_ROWS` rows, where each
/// row is `width` consecutive entries of `values`.
fn insert_batched(tx: &Transaction, head: &str, width: usize, values: &[Value]) -> Result<()> {
    let row = format!("({})", vec!["?"; width].join(", "));
    for chunk in values.chunks(width * BATCH_ROWS) {
        let rows = vec![row.as_str(); chunk.len() / width].join(", ");
        tx.execute(&format!("{head} VALUES {rows}"), params_from_iter(chunk.iter()))?;
    }
    Ok(())
}

fn insert_definitions(tx: &Transaction, playlists: &[PlaylistDefinition]) -> Result<()> {
    let playlist_rows: Vec<Value> = playlists
        .iter()
        .map(|p| Value::Text(p.name.clone()))
        .collect();
    insert_batched(tx, "INSERT OR IGNORE INTO playlists (name)", 1, &playlist_rows)?;

    let song_rows: Vec<Value> = playlists
        .iter()
        .flat_map(|p| p.songs.iter())
        .flat_map(|song| {
            [
                Value::Text(song.name.clone()),
                Value::Text(song.extension.as_str().to_string()),
            ]
        })
        .collect();
    insert_batched(tx, "INSERT OR IGNORE INTO songs (name, extension)", 2, &song_rows)?;

    let playlist_ids: HashMap<String, i64> = {
        let mut stmt = tx.prepare("SELECT name, id FROM playlists")?;
        let ids = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<std::result::Result<_, rusqlite::Error>>()?;
        ids
    };
    let song_ids: HashMap<(String, String), i64> = {
        let mut stmt = tx.prepare("SELECT name, extension, id FROM songs")?;
        let ids = stmt
            .query_map([], |row| {
                Ok((
                    (row.get::<_, String>(0)?, row.get::<_, String>(1)?),
                    row.get::<_, i64>(2)?,
                ))
            })?
            .collect::<std::result::Result<_, rusqlite::Error>>()?;
        ids
    };

    let mut links = Vec::new();
    for playlist in playlists {
        let Some(&playlist_id) = playlist_ids.get(&playlist.name) else {
            continue;
        };
        for song in &playlist.songs {
            let key = (song.name.clone(), song.extension.as_str().to_string());
            if let Some(&song_id) = song_ids.get(&key) {
                links.push(Value::Integer(playlist_id));
                links.push(Value::Integer(song_id));
            }
        }
    }
    insert_batched(
        tx,
        "INSERT OR IGNORE INTO playlist_songs (playlist_id, song_id)",
        2,
        &links,
    )?;
    debug!(
        "Stored {} playlists, {} songs, {} links",
        playlists.len(),
        song_rows.len() / 2,
        links.len() / 2
    );
    Ok(())
}
