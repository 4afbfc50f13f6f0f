use anyhow::Result;
use plexsync_lib::db::{PlaylistStore, BATCH_ROWS};
use plexsync_lib::models::{FileType, PlaylistDefinition, Song};

fn playlist(name: &str, songs: impl IntoIterator<Item = Song>) -> PlaylistDefinition {
    let mut definition = PlaylistDefinition::new(name);
    definition.songs.extend(songs);
    definition
}

#[test]
fn store_is_created_on_first_use() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let store = PlaylistStore::new(dir.path().join("nested/dir/playlists.db"));

    assert!(store.get_all()?.is_empty());
    assert!(store.path().exists());
    Ok(())
}

#[test]
fn bulk_inserts_span_several_batches() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let store = PlaylistStore::new(dir.path().join("playlists.db"));
    let count = BATCH_ROWS * 2 + 17;
    let big = playlist(
        "Everything",
        (0..count).map(|i| Song::new(format!("track {i:04}"), FileType::Flac)),
    );

    store.add_many(&[big.clone()])?;

    let stored = store.get(&["Everything"])?;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].songs.len(), count);
    assert_eq!(stored[0], big);
    Ok(())
}

#[test]
fn songs_are_shared_between_playlists() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let store = PlaylistStore::new(dir.path().join("playlists.db"));
    let shared = Song::new("shared", FileType::Mp3);

    store.add_many(&[
        playlist("One", [shared.clone(), Song::new("solo", FileType::Mp3)]),
        playlist("Two", [shared.clone(), Song::new("shared", FileType::Flac)]),
    ])?;

    let all = store.get_all()?;
    assert_eq!(all.len(), 2);
    assert!(all.iter().all(|p| p.songs.contains(&shared)));
    assert!(all[1].songs.contains(&Song::new("shared", FileType::Flac)));
    Ok(())
}

#[test]
fn adding_an_existing_playlist_merges_songs() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let store = PlaylistStore::new(dir.path().join("playlists.db"));

    store.add_many(&[playlist("Mix", [Song::new("a", FileType::Mp3)])])?;
    store.add_many(&[playlist(
        "Mix",
        [Song::new("a", FileType::Mp3), Song::new("b", FileType::Ogg)],
    )])?;

    let stored = store.get(&["Mix"])?;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].songs.len(), 2);
    Ok(())
}

#[test]
fn lookups_filter_by_name_and_keep_empty_playlists() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let store = PlaylistStore::new(dir.path().join("playlists.db"));

    store.add_many(&[
        playlist("Empty", []),
        playlist("Full", [Song::new("a", FileType::Mp3)]),
        playlist("Other", [Song::new("b", FileType::Mp3)]),
    ])?;

    let found = store.get(&["Empty", "Full", "Missing"])?;
    let names: Vec<&str> = found.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Empty", "Full"]);
    assert!(found[0].songs.is_empty());
    Ok(())
}

#[test]
fn replace_all_discards_previous_content() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let store = PlaylistStore::new(dir.path().join("playlists.db"));

    store.add_many(&[playlist("Old", [Song::new("x", FileType::Wav)])])?;
    store.replace_all(&[playlist("New", [Song::new("y", FileType::Mp3)])])?;

    let all = store.get_all()?;
    assert_eq!(all, vec![playlist("New", [Song::new("y", FileType::Mp3)])]);
    Ok(())
}
