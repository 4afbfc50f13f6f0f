pub mod config;
pub mod db;
pub mod error;
pub mod library;
pub mod library_parser;
pub mod logging;
pub mod matcher;
pub mod models;
pub mod playlist;
pub mod plex_api;
pub mod plex_client;
pub mod query_builder;

pub use error::{LibraryError, Result};
