//! # Newsroom (library root)
//!
//! Core plumbing for a small news-article service:
//! - Session tokens: an in-memory, thread-safe token <-> user registry (`session`).
//! - "Read next" recommendations over article embeddings (`recommender`, `vector_store`).
//! - Persistence: SQLite via Diesel (`catalog`, `models`, `schema`) and a flat-file
//!   article store (`article_store`).
//! - Summaries (`summarizer`), configuration (`config`) and the application facade that
//!   ties it together (`newsroom`).
//! - CLI parsing (`commands`) and bulk JSON import (`import`).
//!
//! ## Request flow
//! Every authenticated call resolves its token through
//! [`session::SessionRegistry::validate`]; asking for the next article additionally
//! runs [`recommender::Recommender::best`] against the catalog's stored vectors and the
//! user's read history.
//!
//! ```no_run
//! use newsroom::config::NewsroomConfig;
//! use newsroom::newsroom::Newsroom;
//! use newsroom::vector_store::ArticleVectorizer;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = NewsroomConfig::in_dir(std::path::Path::new("/srv/newsroom"));
//! let vectorizer = ArticleVectorizer::load(&config.embedding_model, &config.embedding_revision)?;
//! let newsroom = Newsroom::open(config, Box::new(vectorizer))?;
//!
//! let session = newsroom.log_in("reader_1", "deadbeef")?;
//! let next = newsroom.recommend_next(&session.token, 12)?;
//! println!("read article {} next", next.article_id);
//! # Ok(()) }
//! ```
//!
//! ## Modules
//! - [`article_store`], [`catalog`], [`commands`], [`config`], [`error`], [`import`], [`models`],
//!   [`newsroom`], [`recommender`], [`schema`], [`session`], [`summarizer`],
//!   [`vector_store`]

use directories::ProjectDirs;
use std::error::Error;

pub mod article_store;
pub mod catalog;
pub mod commands;
pub mod config;
pub mod error;
pub mod import;
pub mod models;
pub mod newsroom;
pub mod recommender;
pub mod schema;
pub mod session;
pub mod summarizer;
pub mod vector_store;

/// Identifier of a user account (`users.id`). Valid ids are non-negative.
pub type UserId = i64;

/// Identifier of an article (`articles.id`).
pub type ArticleId = i64;

/// A unit-length article embedding.
pub type Embedding = Vec<f32>;

/// Return the per-platform configuration directory used by Newsroom.
///
/// This uses [`directories::ProjectDirs`] with the application triple
/// `("com", "newsroom", "newsroom")`. The directory is **not** created by this
/// function; callers that need it should create it with `fs::create_dir_all`.
///
/// # Errors
/// Returns an error if the platform configuration directory cannot be determined.
pub fn config_dir() -> Result<std::path::PathBuf, Box<dyn Error>> {
    let proj_dirs = ProjectDirs::from("com", "newsroom", "newsroom")
        .ok_or("Unable to determine config directory")?;
    Ok(proj_dirs.config_dir().to_path_buf())
}

/// Per-platform data directory, default home of the database and article store.
pub fn data_dir() -> Result<std::path::PathBuf, Box<dyn Error>> {
    let proj_dirs = ProjectDirs::from("com", "newsroom", "newsroom")
        .ok_or("Unable to determine data directory")?;
    Ok(proj_dirs.data_dir().to_path_buf())
}
