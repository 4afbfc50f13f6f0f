use anyhow::{bail, Context, Result};
use plexsync_lib::config::AppConfig;
use plexsync_lib::db::PlaylistStore;
use plexsync_lib::library::{apply_server_settings, Library};
use plexsync_lib::logging::{self, LogOptions};
use plexsync_lib::models::LibraryType;
use plexsync_lib::playlist::PlaylistManager;
use plexsync_lib::plex_client::PlexClient;
use std::env;

const USAGE: &str = "Usage: plexsync [--debug] <config.json> <target> <action> [names...]

targets and actions:
  music | movie | tv   create, delete, exists, probe, refresh, summary
  tv                   languages
  playlist             exists <name>, delete <names...>, export, import [names...]
  server               settings";

fn library_type(target: &str) -> Result<LibraryType> {
    Ok(match target {
        "music" => LibraryType::Music,
        "movie" => LibraryType::Movie,
        "tv" => LibraryType::Tv,
        "playlist" => LibraryType::Playlist,
        other => bail!("unknown target '{other}'\n\n{USAGE}"),
    })
}

fn main() -> Result<()> {
    let mut args: Vec<String> = env::args().skip(1).collect();
    let debug = args.iter().any(|arg| arg == "--debug");
    args.retain(|arg| arg != "--debug");
    if args.len() < 3 {
        println!("{USAGE}");
        return Ok(());
    }

    let config_path = &args[0];
    let target = args[1].as_str();
    let action = args[2].as_str();
    let names: Vec<&str> = args[3..].iter().map(String::as_str).collect();

    let config = AppConfig::load(config_path)
        .with_context(|| format!("failed to load config from {config_path}"))?;
    logging::init(LogOptions {
        log_dir: None,
        debug,
        secrets: vec![config.server.token.clone()],
    })
    .context("failed to initialise logging")?;

    let client = PlexClient::new(&config.server).context("failed to build server client")?;

    if target == "server" {
        match action {
            "settings" => {
                let applied = apply_server_settings(&client, &config.preferences.server)?;
                println!("Applied {applied} server settings");
            }
            other => bail!("unknown server action '{other}'\n\n{USAGE}"),
        }
        return Ok(());
    }

    let library_type = library_type(target)?;
    let section = config
        .section(library_type)
        .with_context(|| format!("no {target} library configured"))?;
    let library = Library::new(&client, section, config.poll);

    if library_type == LibraryType::Playlist {
        let manager = PlaylistManager::new(&client, &library);
        let store = PlaylistStore::new(config.playlists_db_path()?);
        match action {
            "exists" => {
                let Some(name) = names.first() else {
                    bail!("playlist exists needs a name");
                };
                println!("{}", manager.exists(name)?);
            }
            "delete" => manager.delete(&names)?,
            "export" => {
                let exported = manager.export(&store)?;
                println!("Exported {} playlists to {}", exported.len(), store.path().display());
            }
            "import" => manager
                .import(&store, &names)
                .with_context(|| format!("import from {} failed", store.path().display()))?,
            other => bail!("unknown playlist action '{other}'\n\n{USAGE}"),
        }
        return Ok(());
    }

    match action {
        "create" => {
            library.create()?;
            if library_type == LibraryType::Tv && !config.tv_language_manifests.is_empty() {
                library.apply_language_manifests(&config.tv_language_manifests)?;
            }
        }
        "delete" => library.delete()?,
        "exists" => println!("{}", library.exists()?),
        "probe" => library.probe()?,
        "refresh" => library.refresh()?,
        "summary" => {
            let summary = library.summary()?;
            println!(
                "{} ({}): {} items",
                summary.title, summary.library_type, summary.item_count
            );
        }
        "languages" => library.apply_language_manifests(&config.tv_language_manifests)?,
        other => bail!("unknown {target} action '{other}'\n\n{USAGE}"),
    }
    Ok(())
}
