//! This module provides functionality for loading and handling the application's configuration.
//!
//! It defines the `NewsroomConfig` struct, which holds the configuration parameters,
//! a `load_config` function to load the configuration from a YAML file, and the
//! SQLite connection helpers shared by the rest of the crate.
//!
//! # Examples
//!
//! Loading the configuration from a file:
//!
//! ```no_run
//! use newsroom::config::{NewsroomConfig, load_config};
//!
//! let config_file_path = "/path/to/config.yaml";
//! let config: NewsroomConfig = load_config(config_file_path).unwrap();
//! println!("{:?}", config);
//! ```

use diesel::connection::SimpleConnection;
use diesel::prelude::*;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use std::{error::Error, fs};

use tracing::*;

/// Schema applied by [`initialize_schema`]. Every statement is idempotent.
const SCHEMA_SQL: &str = include_str!("schema.sql");

/// Represents the application's configuration.
///
/// Only `database_url` and `articles_dir` are required in the YAML file; every other
/// field falls back to its default.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct NewsroomConfig {
    /// SQLite database path (or `:memory:`).
    pub database_url: String,

    /// Root of the flat-file article store (`articles/` and `summaries/` live below it).
    pub articles_dir: PathBuf,

    /// Hugging Face model id of the sentence-embedding model.
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    // Model revision (branch, tag or commit).
    #[serde(default = "default_embedding_revision")]
    pub embedding_revision: String,

    // Expected embedding length.
    #[serde(default = "default_embedding_dimension")]
    pub embedding_dimension: usize,

    // Sentences kept by the extractive summarizer.
    #[serde(default = "default_summary_sentences")]
    pub summary_sentences: usize,

    // Upper bound on summary length, in characters.
    #[serde(default = "default_summary_max_chars")]
    pub summary_max_chars: usize,

    /// Delete the article's text file when the article is deleted.
    #[serde(default)]
    pub remove_file_on_delete: bool,

    // Attempts made to open the database at start-up.
    #[serde(default = "default_connection_retries")]
    pub connection_retries: u32,

    // Pause between connection attempts.
    #[serde(default = "default_retry_delay_seconds")]
    pub retry_delay_seconds: f64,
}

fn default_embedding_model() -> String {
    "sentence-transformers/all-MiniLM-L6-v2".to_string()
}

fn default_embedding_revision() -> String {
    "main".to_string()
}

fn default_embedding_dimension() -> usize {
    crate::vector_store::MINI_LM_DIMENSION
}

fn default_summary_sentences() -> usize {
    12
}

fn default_summary_max_chars() -> usize {
    2048
}

fn default_connection_retries() -> u32 {
    4
}

fn default_retry_delay_seconds() -> f64 {
    5.0
}

impl NewsroomConfig {
    /// A configuration with every optional field at its default.
    pub fn new(database_url: impl Into<String>, articles_dir: impl Into<PathBuf>) -> Self {
        Self {
            database_url: database_url.into(),
            articles_dir: articles_dir.into(),
            embedding_model: default_embedding_model(),
            embedding_revision: default_embedding_revision(),
            embedding_dimension: default_embedding_dimension(),
            summary_sentences: default_summary_sentences(),
            summary_max_chars: default_summary_max_chars(),
            remove_file_on_delete: false,
            connection_retries: default_connection_retries(),
            retry_delay_seconds: default_retry_delay_seconds(),
        }
    }

    /// Default configuration rooted in `dir`: `dir/newsroom.sqlite3` and `dir/store`.
    pub fn in_dir(dir: &std::path::Path) -> Self {
        Self::new(
            dir.join("newsroom.sqlite3").to_string_lossy().into_owned(),
            dir.join("store"),
        )
    }

    /// Open the configured database, retrying as configured, and apply the schema.
    pub fn connect(&self) -> Result<SqliteConnection, crate::error::NewsroomError> {
        let mut connection = establish_connection(
            &self.database_url,
            self.connection_retries,
            Duration::from_secs_f64(self.retry_delay_seconds.max(0.0)),
        )?;
        initialize_schema(&mut connection)?;
        Ok(connection)
    }
}

/// Loads the application's configuration from a YAML file.
///
/// # Parameters
///
/// - `file`: The path to the YAML configuration file.
///
/// # Returns
///
/// - `Ok(NewsroomConfig)`: The loaded configuration.
/// - `Err(Box<dyn Error>)`: An error occurred while reading the file or parsing the YAML.
pub fn load_config(file: &str) -> Result<NewsroomConfig, Box<dyn Error>> {
    debug!("Loading config: {:?}", file);
    let content = fs::read_to_string(file)?;
    let config: NewsroomConfig = serde_yaml::from_str(&content)?;
    Ok(config)
}

/// Open a SQLite connection, trying up to `attempts` times.
///
/// Each failure is logged; between attempts the thread sleeps for `delay`. The last
/// connection error is returned if every attempt fails.
pub fn establish_connection(
    db_url: &str,
    attempts: u32,
    delay: Duration,
) -> Result<SqliteConnection, ConnectionError> {
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match SqliteConnection::establish(db_url) {
            Ok(connection) => return Ok(connection),
            Err(e) if attempt < attempts => {
                warn!(
                    "Database connection failed (attempt {}/{}): {}. Retrying in {:?}.",
                    attempt, attempts, e, delay
                );
                std::thread::sleep(delay);
                attempt += 1;
            }
            Err(e) => {
                error!("Could not connect to database {}: {}", db_url, e);
                return Err(e);
            }
        }
    }
}

/// Create the newsroom tables if they do not exist yet.
pub fn initialize_schema(connection: &mut SqliteConnection) -> QueryResult<()> {
    connection.batch_execute("PRAGMA foreign_keys = ON;")?;
    connection.batch_execute(SCHEMA_SQL)
}
