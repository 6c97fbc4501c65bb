//! Main module for the newsroom CLI.
//!
//! Parses the command line, loads the configuration and runs the requested command
//! against a [`Newsroom`]. Commands that act as a user log in with the supplied
//! credentials, do their work and log out again before exiting.
//!
//! # Examples
//!
//! ```sh
//! newsroom init
//! newsroom create-user -u reader_1 -p deadbeef
//! newsroom submit -u reader_1 -p deadbeef -t "Storm warning" -d 2024-05-01 story.txt
//! newsroom next -u reader_1 -p deadbeef 1
//! ```

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use newsroom::commands::{Cli, Commands, Credentials};
use newsroom::config::{self, NewsroomConfig};
use newsroom::error::NewsroomError;
use newsroom::import;
use newsroom::newsroom::{NewArticle, Newsroom};
use newsroom::vector_store::LazyVectorizer;
use newsroom::{config_dir, data_dir};
use once_cell::sync::OnceCell;
use std::path::Path;
use std::{error::Error, fs};
use tracing::{debug, info, warn};

static TRACING: OnceCell<()> = OnceCell::new();

fn main() -> Result<(), Box<dyn Error>> {
    TRACING.get_or_init(|| {
        tracing_subscriber::fmt::init();
    });
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run())
}

/// Parse arguments, load the configuration and dispatch the command.
///
/// The model load and all database work run on tokio's blocking pool.
async fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let config_path = match cli.config {
        Some(path) => path,
        None => config_dir()?.join("config.yaml"),
    };

    if let Commands::Init = cli.command {
        debug!("Initializing configuration");
        return init(&config_path);
    }

    debug!("Loading config from: {}", config_path.display());
    let config = config::load_config(
        config_path
            .to_str()
            .ok_or("config path is not valid UTF-8")?,
    )?;
    debug!("Config loaded: {:?}", config);

    let command = cli.command;
    tokio::task::spawn_blocking(move || -> Result<(), NewsroomError> {
        let vectorizer = LazyVectorizer::new(
            &config.embedding_model,
            &config.embedding_revision,
            config.embedding_dimension,
        );
        if command.needs_vectorizer() {
            vectorizer.get()?;
        }
        let newsroom = Newsroom::open(config, Box::new(vectorizer))?;
        execute(&newsroom, command)
    })
    .await??;

    Ok(())
}

fn execute(newsroom: &Newsroom, command: Commands) -> Result<(), NewsroomError> {
    match command {
        Commands::Init => unreachable!("init runs before the newsroom is opened"),
        Commands::CreateUser { credentials } => {
            let user_id = newsroom.create_user(&credentials.username, &credentials.passkey)?;
            println!("created user {} ({})", credentials.username, user_id);
        }
        Commands::Submit {
            credentials,
            title,
            authors,
            date,
            file,
        } => {
            let article = NewArticle {
                title,
                authors,
                publish_date: date,
                text: fs::read_to_string(&file)?,
            };
            let id = with_session(newsroom, &credentials, |token| {
                newsroom.create_article(token, &article)
            })?;
            println!("created article {id}");
        }
        Commands::Import { credentials, json } => {
            let records = import::load_records(&json)?;
            let (created, failed) = with_session(newsroom, &credentials, |token| {
                Ok(import_records(newsroom, token, &records))
            })?;
            println!("{}/{} articles created", created, created + failed);
        }
        Commands::Read {
            credentials,
            article,
        } => {
            let text = with_session(newsroom, &credentials, |token| {
                newsroom.read_article(token, article)
            })?;
            println!("{text}");
        }
        Commands::Summary {
            credentials,
            article,
        } => {
            let summary = with_session(newsroom, &credentials, |token| {
                newsroom.article_summary(token, article)
            })?;
            println!("{summary}");
        }
        Commands::Next {
            credentials,
            article,
        } => {
            let next = with_session(newsroom, &credentials, |token| {
                newsroom.recommend_next(token, article)
            })?;
            let title = newsroom
                .catalog()
                .active_article(next.article_id)?
                .map(|a| a.title)
                .unwrap_or_default();
            println!("{}\t{:.3}\t{}", next.article_id, next.score, title);
        }
        Commands::Search { fragment, limit } => {
            for headline in newsroom.search_titles(&fragment, limit)? {
                println!("{}\t{}", headline.id, headline.title);
            }
        }
        Commands::Recent { limit } => {
            for headline in newsroom.recent_articles(limit)? {
                println!("{}\t{}", headline.id, headline.title);
            }
        }
        Commands::Delete {
            credentials,
            article,
        } => {
            with_session(newsroom, &credentials, |token| {
                newsroom.delete_article(token, article)
            })?;
            println!("deleted article {article}");
        }
        Commands::Deactivate { credentials } => {
            with_session(newsroom, &credentials, |token| {
                newsroom.deactivate_user(token, &credentials.passkey)
            })?;
            println!("deactivated {}", credentials.username);
        }
        Commands::Reindex => {
            let ids = newsroom.catalog().active_article_ids()?;
            let bar = progress_bar(ids.len());
            let mut failed = 0;
            for id in ids {
                if let Err(e) = newsroom.reindex_article(id) {
                    warn!(article_id = id, "reindex failed: {}", e);
                    failed += 1;
                }
                bar.inc(1);
            }
            bar.finish_with_message(format!("{failed} failed"));
        }
    }
    Ok(())
}

/// Log in as `credentials`, run `action` with the session token and log out.
fn with_session<T>(
    newsroom: &Newsroom,
    credentials: &Credentials,
    action: impl FnOnce(&str) -> Result<T, NewsroomError>,
) -> Result<T, NewsroomError> {
    let session = newsroom.log_in(&credentials.username, &credentials.passkey)?;
    let result = action(&session.token);
    // deactivation already ended the session
    if let Err(e) = newsroom.log_out(&session.token) {
        debug!("session already closed: {}", e);
    }
    result
}

fn import_records(
    newsroom: &Newsroom,
    token: &str,
    records: &[import::ImportRecord],
) -> (usize, usize) {
    let bar = progress_bar(records.len());
    let mut created = 0;
    for record in records {
        bar.set_message(record.title.chars().take(40).collect::<String>());
        match record
            .to_article()
            .and_then(|article| newsroom.create_article(token, &article))
        {
            Ok(id) => {
                debug!(article_id = id, "imported {}", record.title);
                created += 1;
            }
            Err(e) => bar.println(format!("failed: {}: {}", record.title, e)),
        }
        bar.inc(1);
    }
    bar.finish_with_message("done");
    (created, records.len() - created)
}

fn progress_bar(len: usize) -> ProgressBar {
    let bar = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}") {
        bar.set_style(style);
    }
    bar
}

/// Write a default configuration to `config_path` and create the database and
/// article store it points at.
///
/// An existing configuration file is left untouched.
fn init(config_path: &Path) -> Result<(), Box<dyn Error>> {
    if let Some(parent) = config_path.parent() {
        info!("Creating config directory: {}", parent.display());
        fs::create_dir_all(parent)?;
    }

    let config = if config_path.exists() {
        info!("Keeping existing config file: {}", config_path.display());
        config::load_config(
            config_path
                .to_str()
                .ok_or("config path is not valid UTF-8")?,
        )?
    } else {
        let data_dir = data_dir()?;
        fs::create_dir_all(&data_dir)?;
        let config = NewsroomConfig::in_dir(&data_dir);
        info!("Creating config file: {}", config_path.display());
        fs::write(config_path, serde_yaml::to_string(&config)?)?;
        config
    };

    config.connect()?;
    newsroom::article_store::ArticleStore::open(&config.articles_dir)?;
    println!("database: {}", config.database_url);
    println!("articles: {}", config.articles_dir.display());
    Ok(())
}
