//! # Newsroom facade
//!
//! [`Newsroom`] is what a front end (HTTP handlers, the CLI) talks to. It owns the
//! single [`SessionRegistry`] of the process together with the catalog, the article
//! store, the vectorizer and the summarizer, and implements the user and article
//! workflows on top of them.
//!
//! Every method that takes a `token` resolves it first and fails with
//! [`NewsroomError::InvalidSession`] when it is not live. Share one `Newsroom` across
//! request handlers with an `Arc`; all methods take `&self`.

use chrono::{NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::article_store::ArticleStore;
use crate::catalog::Catalog;
use crate::config::NewsroomConfig;
use crate::error::{EmbeddingError, NewsroomError};
use crate::models::{Article, ArticleAction, Headline, User, UserAction};
use crate::recommender::{Recommendation, Recommender};
use crate::session::{Session, SessionRegistry};
use crate::summarizer::{LeadSummarizer, Summarizer};
use crate::vector_store::Vectorizer;
use crate::{ArticleId, Embedding, UserId};

static USERNAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_]{4,16}$").expect("username pattern is valid"));
static PASSKEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9A-Fa-f]{8,32}$").expect("passkey pattern is valid"));

/// An article as submitted by a user.
#[derive(Debug, Clone, PartialEq)]
pub struct NewArticle {
    pub title: String,
    pub authors: String,
    pub publish_date: NaiveDate,
    pub text: String,
}

pub struct Newsroom {
    config: NewsroomConfig,
    sessions: SessionRegistry,
    catalog: Catalog,
    store: ArticleStore,
    vectorizer: Box<dyn Vectorizer>,
    summarizer: Box<dyn Summarizer>,
}

impl Newsroom {
    /// Assemble a newsroom from already-opened parts.
    pub fn new(
        config: NewsroomConfig,
        catalog: Catalog,
        store: ArticleStore,
        vectorizer: Box<dyn Vectorizer>,
        summarizer: Box<dyn Summarizer>,
    ) -> Self {
        Self {
            config,
            sessions: SessionRegistry::new(),
            catalog,
            store,
            vectorizer,
            summarizer,
        }
    }

    /// Connect to the configured database, open the article store and use the
    /// configured [`LeadSummarizer`].
    pub fn open(
        config: NewsroomConfig,
        vectorizer: Box<dyn Vectorizer>,
    ) -> Result<Self, NewsroomError> {
        let catalog = Catalog::new(config.connect()?);
        let store = ArticleStore::open(&config.articles_dir)?;
        let summarizer = LeadSummarizer::new(config.summary_sentences, config.summary_max_chars);
        Ok(Self::new(
            config,
            catalog,
            store,
            vectorizer,
            Box::new(summarizer),
        ))
    }

    pub fn config(&self) -> &NewsroomConfig {
        &self.config
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn store(&self) -> &ArticleStore {
        &self.store
    }

    // USERS

    /// Resolve `token` to its user.
    pub fn authenticate(&self, token: &str) -> Result<UserId, NewsroomError> {
        self.sessions
            .validate(token)
            .ok_or(NewsroomError::InvalidSession)
    }

    /// Register a new account.
    ///
    /// # Errors
    /// - [`NewsroomError::InvalidUsername`]: not 4-16 letters, digits or `_`.
    /// - [`NewsroomError::InvalidPasskey`]: not 8-32 hex digits.
    /// - [`NewsroomError::UsernameTaken`]: an active account already uses the name.
    pub fn create_user(&self, username: &str, passkey: &str) -> Result<UserId, NewsroomError> {
        if !USERNAME.is_match(username) {
            return Err(NewsroomError::InvalidUsername);
        }
        if !PASSKEY.is_match(passkey) {
            return Err(NewsroomError::InvalidPasskey);
        }
        let user_id = self
            .catalog
            .insert_user_if_available(&User::new(username, passkey))?
            .ok_or(NewsroomError::UsernameTaken)?;
        info!(user_id, username, "created user");
        Ok(user_id)
    }

    /// Check credentials and start a session. A previous session of the same user ends.
    ///
    /// The login is logged before the session is installed, so a failed log leaves any
    /// previous session untouched.
    pub fn log_in(&self, username: &str, passkey: &str) -> Result<Session, NewsroomError> {
        let user_id = self
            .catalog
            .find_active_user(username, passkey)?
            .ok_or(NewsroomError::InvalidCredentials)?;
        self.catalog.log_user_action(user_id, UserAction::Login)?;
        let session = self.sessions.register(user_id)?;
        info!(user_id, "user logged in");
        Ok(session)
    }

    /// End the session of `token`.
    pub fn log_out(&self, token: &str) -> Result<(), NewsroomError> {
        let user_id = self.authenticate(token)?;
        if !self.sessions.invalidate_by_token(token) {
            return Err(NewsroomError::InvalidSession);
        }
        self.catalog.log_user_action(user_id, UserAction::Logout)?;
        info!(user_id, "user logged out");
        Ok(())
    }

    /// Deactivate the account behind `token` after re-checking its passkey.
    pub fn deactivate_user(&self, token: &str, passkey: &str) -> Result<(), NewsroomError> {
        let user_id = self.authenticate(token)?;
        if !self.catalog.passkey_matches(user_id, passkey)? {
            return Err(NewsroomError::InvalidCredentials);
        }
        self.catalog.deactivate_user(user_id)?;
        self.sessions.invalidate_by_user(user_id);
        self.catalog
            .log_user_action(user_id, UserAction::Deactivate)?;
        info!(user_id, "user deactivated");
        Ok(())
    }

    // ARTICLES

    /// Store a new article: metadata and embedding in the catalog, text on disk.
    ///
    /// The text is embedded before anything is written, so a vectorizer failure
    /// leaves no trace. If the text cannot be written the article row is
    /// soft-deleted again.
    pub fn create_article(
        &self,
        token: &str,
        article: &NewArticle,
    ) -> Result<ArticleId, NewsroomError> {
        let user_id = self.authenticate(token)?;
        if article.title.trim().is_empty() {
            return Err(NewsroomError::InvalidArticle("title is empty".into()));
        }
        if article.text.trim().is_empty() {
            return Err(NewsroomError::InvalidArticle("text is empty".into()));
        }

        let vector = self.embed(&article.text)?;
        let row = Article {
            id: None,
            title: article.title.trim().to_string(),
            authors: article.authors.trim().to_string(),
            publish_date: article.publish_date.format("%Y-%m-%d").to_string(),
            submitter_id: user_id,
            submitted_at: Utc::now().timestamp(),
            active: true,
        };
        let article_id = self.catalog.insert_article(&row, &vector)?;

        if let Err(e) = self.store.write_article(article_id, &article.text) {
            warn!(article_id, "could not write article text: {}", e);
            self.catalog.deactivate_article(article_id)?;
            return Err(e.into());
        }

        self.catalog
            .log_article_action(article_id, user_id, ArticleAction::Create)?;
        info!(article_id, user_id, "created article");
        Ok(article_id)
    }

    /// Soft-delete an article. Only its submitter may delete it.
    pub fn delete_article(&self, token: &str, article_id: ArticleId) -> Result<(), NewsroomError> {
        let user_id = self.authenticate(token)?;
        let article = self
            .catalog
            .active_article(article_id)?
            .ok_or(NewsroomError::ArticleNotFound(article_id))?;
        if article.submitter_id != user_id {
            return Err(NewsroomError::NotArticleOwner(article_id));
        }

        self.catalog.deactivate_article(article_id)?;
        if self.config.remove_file_on_delete {
            self.store.remove_article(article_id)?;
        }
        self.catalog
            .log_article_action(article_id, user_id, ArticleAction::Delete)?;
        info!(article_id, user_id, "deleted article");
        Ok(())
    }

    /// The text of an article. Records the read for future recommendations.
    pub fn read_article(
        &self,
        token: &str,
        article_id: ArticleId,
    ) -> Result<String, NewsroomError> {
        let user_id = self.authenticate(token)?;
        let text = self.active_text(article_id)?;
        self.catalog.record_read(user_id, article_id)?;
        self.catalog
            .log_article_action(article_id, user_id, ArticleAction::Read)?;
        Ok(text)
    }

    /// The summary of an article, generated and cached on first request.
    pub fn article_summary(
        &self,
        token: &str,
        article_id: ArticleId,
    ) -> Result<String, NewsroomError> {
        let user_id = self.authenticate(token)?;
        if self.catalog.active_article(article_id)?.is_none() {
            return Err(NewsroomError::ArticleNotFound(article_id));
        }
        if let Some(summary) = self.store.read_summary(article_id)? {
            debug!(article_id, "serving cached summary");
            return Ok(summary);
        }

        let text = self.active_text(article_id)?;
        let summary = self.summarizer.summarize(&text)?;
        let (summary, created) = self.store.write_summary(article_id, &summary)?;
        if created {
            self.catalog
                .log_article_action(article_id, user_id, ArticleAction::GenerateSummary)?;
            info!(article_id, "generated summary");
        }
        Ok(summary)
    }

    /// The most similar active article the user has not read yet.
    pub fn recommend_next(
        &self,
        token: &str,
        article_id: ArticleId,
    ) -> Result<Recommendation, NewsroomError> {
        let user_id = self.authenticate(token)?;
        let recommendation =
            Recommender::new(&self.catalog, &self.catalog).best(article_id, user_id)?;
        debug!(
            article_id,
            user_id,
            recommended = recommendation.article_id,
            score = recommendation.score,
            "recommended next article"
        );
        Ok(recommendation)
    }

    /// Recompute and store the embedding of an active article from its text.
    pub fn reindex_article(&self, article_id: ArticleId) -> Result<(), NewsroomError> {
        let text = self.active_text(article_id)?;
        let vector = self.embed(&text)?;
        self.catalog.upsert_vector(article_id, &vector)?;
        debug!(article_id, "reindexed article");
        Ok(())
    }

    /// Active articles whose title contains `fragment`, newest first.
    pub fn search_titles(
        &self,
        fragment: &str,
        limit: usize,
    ) -> Result<Vec<Headline>, NewsroomError> {
        Ok(self.catalog.search_titles(fragment, clamp_limit(limit))?)
    }

    /// The newest active articles.
    pub fn recent_articles(&self, limit: usize) -> Result<Vec<Headline>, NewsroomError> {
        Ok(self.catalog.recent_articles(clamp_limit(limit))?)
    }

    fn active_text(&self, article_id: ArticleId) -> Result<String, NewsroomError> {
        if self.catalog.active_article(article_id)?.is_none() {
            return Err(NewsroomError::ArticleNotFound(article_id));
        }
        self.store
            .read_article(article_id)?
            .ok_or(NewsroomError::ArticleNotFound(article_id))
    }

    fn embed(&self, text: &str) -> Result<Embedding, NewsroomError> {
        let vector = self.vectorizer.encode(text)?;
        if vector.len() != self.config.embedding_dimension {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.config.embedding_dimension,
                actual: vector.len(),
            }
            .into());
        }
        Ok(vector)
    }
}

fn clamp_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{RecommendError, SummaryError};
    use crate::recommender::dot;
    use crate::vector_store::normalize;
    use std::sync::Arc;
    use tempfile::TempDir;

    /// Bag-of-keywords vectorizer: one axis per topic word.
    struct KeywordVectorizer;

    const TOPICS: [&str; 4] = ["rust", "election", "football", "weather"];

    impl Vectorizer for KeywordVectorizer {
        fn encode(&self, text: &str) -> Result<Embedding, EmbeddingError> {
            let lower = text.to_lowercase();
            let mut v: Embedding = TOPICS
                .iter()
                .map(|t| lower.matches(t).count() as f32)
                .collect();
            normalize(&mut v);
            Ok(v)
        }

        fn dimension(&self) -> usize {
            TOPICS.len()
        }
    }

    fn newsroom() -> (TempDir, Newsroom) {
        let dir = tempfile::tempdir().unwrap();
        let mut config = NewsroomConfig::in_dir(dir.path());
        config.embedding_dimension = TOPICS.len();
        config.connection_retries = 1;
        config.summary_sentences = 2;
        config.remove_file_on_delete = true;
        let newsroom = Newsroom::open(config, Box::new(KeywordVectorizer)).unwrap();
        (dir, newsroom)
    }

    fn article(title: &str, text: &str) -> NewArticle {
        NewArticle {
            title: title.to_string(),
            authors: "Staff Writer".to_string(),
            publish_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            text: text.to_string(),
        }
    }

    fn logged_in(newsroom: &Newsroom, username: &str) -> Session {
        newsroom.create_user(username, "deadbeef").unwrap();
        newsroom.log_in(username, "deadbeef").unwrap()
    }

    #[test]
    fn test_create_user_validation() {
        let (_dir, newsroom) = newsroom();
        assert!(matches!(
            newsroom.create_user("abc", "deadbeef"),
            Err(NewsroomError::InvalidUsername)
        ));
        assert!(matches!(
            newsroom.create_user("bad-name", "deadbeef"),
            Err(NewsroomError::InvalidUsername)
        ));
        assert!(matches!(
            newsroom.create_user("reader", "not-hex!"),
            Err(NewsroomError::InvalidPasskey)
        ));
        assert!(matches!(
            newsroom.create_user("reader", "abc"),
            Err(NewsroomError::InvalidPasskey)
        ));

        let id = newsroom.create_user("reader", "deadbeef").unwrap();
        assert!(id >= 0);
        assert!(matches!(
            newsroom.create_user("reader", "cafebabe"),
            Err(NewsroomError::UsernameTaken)
        ));
    }

    #[test]
    fn test_login_logout_cycle() {
        let (_dir, newsroom) = newsroom();
        let user_id = newsroom.create_user("reader", "deadbeef").unwrap();
        assert!(matches!(
            newsroom.log_in("reader", "00000000"),
            Err(NewsroomError::InvalidCredentials)
        ));

        let session = newsroom.log_in("reader", "deadbeef").unwrap();
        assert_eq!(session.user_id, user_id);
        assert_eq!(newsroom.authenticate(&session.token).unwrap(), user_id);

        newsroom.log_out(&session.token).unwrap();
        assert!(matches!(
            newsroom.authenticate(&session.token),
            Err(NewsroomError::InvalidSession)
        ));
        assert!(matches!(
            newsroom.log_out(&session.token),
            Err(NewsroomError::InvalidSession)
        ));

        let actions = newsroom.catalog().user_actions(user_id).unwrap();
        assert_eq!(
            actions,
            vec![
                UserAction::Create as i32,
                UserAction::Login as i32,
                UserAction::Logout as i32
            ]
        );
    }

    #[test]
    fn test_second_login_ends_first_session() {
        let (_dir, newsroom) = newsroom();
        let first = logged_in(&newsroom, "reader");
        let second = newsroom.log_in("reader", "deadbeef").unwrap();
        assert!(newsroom.authenticate(&first.token).is_err());
        assert_eq!(newsroom.authenticate(&second.token).unwrap(), second.user_id);
        assert_eq!(newsroom.sessions().len(), 1);
    }

    #[test]
    fn test_deactivate_user() {
        let (_dir, newsroom) = newsroom();
        let session = logged_in(&newsroom, "reader");
        assert!(matches!(
            newsroom.deactivate_user(&session.token, "00000000"),
            Err(NewsroomError::InvalidCredentials)
        ));

        newsroom.deactivate_user(&session.token, "deadbeef").unwrap();
        assert!(newsroom.authenticate(&session.token).is_err());
        assert!(matches!(
            newsroom.log_in("reader", "deadbeef"),
            Err(NewsroomError::InvalidCredentials)
        ));
        // the name is free again
        newsroom.create_user("reader", "cafebabe").unwrap();
    }

    #[test]
    fn test_article_lifecycle() {
        let (_dir, newsroom) = newsroom();
        let writer = logged_in(&newsroom, "writer");
        let id = newsroom
            .create_article(
                &writer.token,
                &article("Rust 2024", "Rust ships a new edition. Rust users cheer."),
            )
            .unwrap();

        assert_eq!(
            newsroom.read_article(&writer.token, id).unwrap(),
            "Rust ships a new edition. Rust users cheer."
        );
        assert_eq!(newsroom.recent_articles(5).unwrap()[0].title, "Rust 2024");
        assert_eq!(newsroom.search_titles("2024", 5).unwrap().len(), 1);

        let reader = logged_in(&newsroom, "reader");
        assert!(matches!(
            newsroom.delete_article(&reader.token, id),
            Err(NewsroomError::NotArticleOwner(_))
        ));

        newsroom.delete_article(&writer.token, id).unwrap();
        assert!(matches!(
            newsroom.read_article(&writer.token, id),
            Err(NewsroomError::ArticleNotFound(_))
        ));
        assert_eq!(newsroom.store().read_article(id).unwrap(), None);
        assert!(newsroom.recent_articles(5).unwrap().is_empty());

        let actions = newsroom.catalog().article_actions(id).unwrap();
        assert_eq!(
            actions,
            vec![
                ArticleAction::Create as i32,
                ArticleAction::Read as i32,
                ArticleAction::Delete as i32
            ]
        );
    }

    #[test]
    fn test_article_validation() {
        let (_dir, newsroom) = newsroom();
        let writer = logged_in(&newsroom, "writer");
        assert!(matches!(
            newsroom.create_article(&writer.token, &article("  ", "Rust text.")),
            Err(NewsroomError::InvalidArticle(_))
        ));
        assert!(matches!(
            newsroom.create_article(&writer.token, &article("Title", "")),
            Err(NewsroomError::InvalidArticle(_))
        ));
        assert!(matches!(
            newsroom.create_article("bogus", &article("Title", "Rust text.")),
            Err(NewsroomError::InvalidSession)
        ));
        assert!(newsroom.recent_articles(5).unwrap().is_empty());
    }

    #[test]
    fn test_summary_is_generated_once() {
        let (_dir, newsroom) = newsroom();
        let writer = logged_in(&newsroom, "writer");
        let id = newsroom
            .create_article(
                &writer.token,
                &article(
                    "Storm",
                    "the weather turns. heavy rain is expected. roads may flood.",
                ),
            )
            .unwrap();

        let summary = newsroom.article_summary(&writer.token, id).unwrap();
        assert_eq!(summary, "The weather turns. Heavy rain is expected.");
        assert_eq!(newsroom.article_summary(&writer.token, id).unwrap(), summary);

        let generated = newsroom
            .catalog()
            .article_actions(id)
            .unwrap()
            .into_iter()
            .filter(|a| *a == ArticleAction::GenerateSummary as i32)
            .count();
        assert_eq!(generated, 1);
    }

    /// Writes a competing summary to the store before returning its own, as a
    /// concurrent request finishing first would.
    struct RacedSummarizer {
        store: ArticleStore,
        article_id: ArticleId,
    }

    impl Summarizer for RacedSummarizer {
        fn summarize(&self, _text: &str) -> Result<String, SummaryError> {
            self.store
                .write_summary(self.article_id, "Summary from the other request.")
                .unwrap();
            Ok("Summary from this request.".to_string())
        }
    }

    #[test]
    fn test_summary_lost_race_is_not_logged() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = NewsroomConfig::in_dir(dir.path());
        config.embedding_dimension = TOPICS.len();
        config.connection_retries = 1;
        let store = ArticleStore::open(&config.articles_dir).unwrap();
        let summarizer = RacedSummarizer {
            store: store.clone(),
            article_id: 1,
        };
        let newsroom = Newsroom::new(
            config.clone(),
            Catalog::new(config.connect().unwrap()),
            store,
            Box::new(KeywordVectorizer),
            Box::new(summarizer),
        );

        let writer = logged_in(&newsroom, "writer");
        let id = newsroom
            .create_article(&writer.token, &article("Storm", "The weather turns."))
            .unwrap();
        assert_eq!(id, 1);

        assert_eq!(
            newsroom.article_summary(&writer.token, id).unwrap(),
            "Summary from the other request."
        );
        assert!(
            !newsroom
                .catalog()
                .article_actions(id)
                .unwrap()
                .contains(&(ArticleAction::GenerateSummary as i32))
        );
    }

    #[test]
    fn test_failed_login_log_keeps_previous_session() {
        let (_dir, newsroom) = newsroom();
        let first = logged_in(&newsroom, "reader");

        newsroom.catalog().execute_sql("DROP TABLE user_logs").unwrap();
        assert!(matches!(
            newsroom.log_in("reader", "deadbeef"),
            Err(NewsroomError::Database(_))
        ));
        assert_eq!(newsroom.authenticate(&first.token).unwrap(), first.user_id);
        assert_eq!(newsroom.sessions().len(), 1);
    }

    #[test]
    fn test_failed_create_log_leaves_name_free() {
        let (_dir, newsroom) = newsroom();
        newsroom.catalog().execute_sql("DROP TABLE user_logs").unwrap();
        assert!(matches!(
            newsroom.create_user("reader", "deadbeef"),
            Err(NewsroomError::Database(_))
        ));
        assert_eq!(
            newsroom.catalog().find_active_user("reader", "deadbeef").unwrap(),
            None
        );
    }

    #[test]
    fn test_summary_failure_is_reported() {
        let (_dir, newsroom) = newsroom();
        let writer = logged_in(&newsroom, "writer");
        let id = newsroom
            .create_article(&writer.token, &article("Brief", "Rust."))
            .unwrap();
        assert!(matches!(
            newsroom.article_summary(&writer.token, id),
            Err(NewsroomError::Summary(SummaryError::TooShort(_)))
        ));
    }

    #[test]
    fn test_recommend_next_follows_reads() {
        let (_dir, newsroom) = newsroom();
        let writer = logged_in(&newsroom, "writer");
        let rust_a = newsroom
            .create_article(&writer.token, &article("Rust A", "Rust rust compiler news."))
            .unwrap();
        let rust_b = newsroom
            .create_article(&writer.token, &article("Rust B", "More rust for rust fans."))
            .unwrap();
        let vote = newsroom
            .create_article(&writer.token, &article("Vote", "The election is close."))
            .unwrap();

        let reader = logged_in(&newsroom, "reader");
        newsroom.read_article(&reader.token, rust_a).unwrap();
        let next = newsroom.recommend_next(&reader.token, rust_a).unwrap();
        assert_eq!(next.article_id, rust_b);
        assert!((next.score - 1.0).abs() < 1e-6);

        newsroom.read_article(&reader.token, rust_b).unwrap();
        let next = newsroom.recommend_next(&reader.token, rust_a).unwrap();
        assert_eq!(next.article_id, vote);

        newsroom.read_article(&reader.token, vote).unwrap();
        assert!(matches!(
            newsroom.recommend_next(&reader.token, rust_a),
            Err(NewsroomError::Recommend(RecommendError::NoCandidate))
        ));
        assert!(matches!(
            newsroom.recommend_next(&reader.token, 999),
            Err(NewsroomError::Recommend(RecommendError::NoVector(999)))
        ));
        assert!(matches!(
            newsroom.recommend_next("bogus", rust_a),
            Err(NewsroomError::InvalidSession)
        ));
    }

    #[test]
    fn test_reindex_article() {
        let (_dir, newsroom) = newsroom();
        let writer = logged_in(&newsroom, "writer");
        let id = newsroom
            .create_article(&writer.token, &article("Match", "Football tonight."))
            .unwrap();
        newsroom.catalog().upsert_vector(id, &[1.0, 0.0, 0.0, 0.0]).unwrap();
        newsroom.reindex_article(id).unwrap();

        use crate::recommender::VectorSource;
        let v = newsroom.catalog().vector(id).unwrap().unwrap();
        assert!((dot(&v, &[0.0, 0.0, 1.0, 0.0]) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_wrong_dimension_vectorizer_is_rejected() {
        let (_dir, newsroom) = newsroom();
        let mut config = newsroom.config().clone();
        config.embedding_dimension = 3;
        let dir = tempfile::tempdir().unwrap();
        config.database_url = dir.path().join("db.sqlite3").to_string_lossy().into_owned();
        config.articles_dir = dir.path().join("store");
        let newsroom = Newsroom::open(config, Box::new(KeywordVectorizer)).unwrap();
        let writer = logged_in(&newsroom, "writer");
        assert!(matches!(
            newsroom.create_article(&writer.token, &article("Rust", "Rust.")),
            Err(NewsroomError::Embedding(EmbeddingError::DimensionMismatch {
                expected: 3,
                actual: 4
            }))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_shared_across_tasks() {
        let (_dir, newsroom) = newsroom();
        let newsroom = Arc::new(newsroom);
        let session = logged_in(&newsroom, "reader");

        let mut handles = Vec::new();
        for _ in 0..32 {
            let newsroom = Arc::clone(&newsroom);
            let token = session.token.clone();
            handles.push(tokio::task::spawn_blocking(move || {
                newsroom.authenticate(&token).unwrap()
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap(), session.user_id);
        }
    }
}
