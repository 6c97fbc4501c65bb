//! This module defines the command-line interface for the application using `clap`.
//!
//! It provides a `Cli` struct that represents the parsed command-line arguments,
//! and a `Commands` enum that represents the available subcommands and their
//! options.
//!
//! # Examples
//!
//! ```no_run
//! use clap::Parser;
//! use newsroom::commands::{Cli, Commands};
//!
//! let cli = Cli::parse();
//! match cli.command {
//!     Commands::Recent { limit } => println!("showing {limit} articles"),
//!     _ => {}
//! }
//! ```

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::ArticleId;

/// Represents the parsed command-line arguments.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, propagate_version = true, color = clap::ColorChoice::Always)]
pub struct Cli {
    /// Path to the YAML configuration file.
    #[arg(long, short = 'c', global = true, env = "NEWSROOM_CONFIG")]
    pub config: Option<PathBuf>,

    /// The parsed subcommand and its options.
    #[command(subcommand)]
    pub command: Commands,
}

/// Username and passkey of the account a command acts as.
#[derive(Args, Debug, Clone)]
pub struct Credentials {
    #[arg(long, short = 'u')]
    pub username: String,

    #[arg(long, short = 'p', env = "NEWSROOM_PASSKEY", hide_env_values = true)]
    pub passkey: String,
}

/// Represents the available subcommands and their options.
#[derive(Subcommand, Debug)]
#[command(about, long_about = None, color = clap::ColorChoice::Always)]
pub enum Commands {
    /// Write a default configuration and create the database and article store.
    Init,

    /// Register a new account.
    #[clap(name = "create-user", alias = "cu")]
    CreateUser {
        #[command(flatten)]
        credentials: Credentials,
    },

    /// Submit an article from a text file.
    #[clap(name = "submit", alias = "s")]
    Submit {
        #[command(flatten)]
        credentials: Credentials,

        #[arg(long, short = 't')]
        title: String,

        #[arg(long, short = 'a', default_value = "")]
        authors: String,

        /// Publication date, `YYYY-MM-DD`.
        #[arg(long, short = 'd')]
        date: chrono::NaiveDate,

        /// File holding the article text.
        file: PathBuf,
    },

    /// Import a JSON array of `{title, authors, content, url, publish_date}` records.
    #[clap(name = "import")]
    Import {
        #[command(flatten)]
        credentials: Credentials,

        json: PathBuf,
    },

    /// Print an article's text.
    #[clap(name = "read", alias = "r")]
    Read {
        #[command(flatten)]
        credentials: Credentials,

        article: ArticleId,
    },

    /// Print an article's summary, generating it on first request.
    #[clap(name = "summary")]
    Summary {
        #[command(flatten)]
        credentials: Credentials,

        article: ArticleId,
    },

    /// Recommend the next article to read after `article`.
    #[clap(name = "next", alias = "n")]
    Next {
        #[command(flatten)]
        credentials: Credentials,

        article: ArticleId,
    },

    /// Search active article titles.
    #[clap(name = "search")]
    Search {
        fragment: String,

        #[arg(long, short = 'l', default_value_t = 5)]
        limit: usize,
    },

    /// List the newest articles.
    #[clap(name = "recent")]
    Recent {
        #[arg(long, short = 'l', default_value_t = 5)]
        limit: usize,
    },

    /// Delete one of your articles.
    #[clap(name = "delete")]
    Delete {
        #[command(flatten)]
        credentials: Credentials,

        article: ArticleId,
    },

    /// Deactivate your account.
    #[clap(name = "deactivate")]
    Deactivate {
        #[command(flatten)]
        credentials: Credentials,
    },

    /// Recompute the embeddings of all active articles.
    #[clap(name = "reindex")]
    Reindex,
}

impl Commands {
    /// Whether the command embeds text and so needs the sentence model loaded.
    pub fn needs_vectorizer(&self) -> bool {
        matches!(
            self,
            Commands::Submit { .. } | Commands::Import { .. } | Commands::Reindex
        )
    }
}
