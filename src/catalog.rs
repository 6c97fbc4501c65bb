//! # Catalog
//!
//! SQLite persistence for users, article metadata, embeddings, reads and the audit
//! logs, via Diesel.
//!
//! A [`Catalog`] owns one `SqliteConnection` behind a mutex, so it can be shared
//! between request handlers. Multi-statement operations (name check, user row and its
//! CREATE log; article row plus vector blob) run inside a transaction.
//!
//! The catalog is also the production [`VectorSource`] and [`ReadLog`] for the
//! recommender: only vectors of **active** articles are offered as candidates.

use chrono::Utc;
use diesel::prelude::*;
use parking_lot::Mutex;
use std::collections::BTreeSet;
use tracing::debug;

use crate::error::StoreError;
use crate::models::{
    Article, ArticleAction, ArticleLog, ArticleVector, Headline, User, UserAction, UserLog,
    UserRead,
};
use crate::recommender::{ReadLog, VectorSource};
use crate::schema::{article_logs, article_vectors, articles, user_logs, user_reads, users};
use crate::vector_store::{decode_vector, encode_vector};
use crate::{ArticleId, Embedding, UserId};

pub struct Catalog {
    connection: Mutex<SqliteConnection>,
}

impl Catalog {
    /// Wrap an open connection. The schema must already be applied
    /// (see [`crate::config::initialize_schema`]).
    pub fn new(connection: SqliteConnection) -> Self {
        Self {
            connection: Mutex::new(connection),
        }
    }

    // USERS

    /// Insert `user` unless an active user already has the name, logging
    /// [`UserAction::Create`] in the same transaction.
    ///
    /// Returns the new user id, or `None` if the name is taken.
    pub fn insert_user_if_available(&self, user: &User) -> QueryResult<Option<UserId>> {
        let mut conn = self.connection.lock();
        conn.transaction(|conn| {
            let taken: i64 = users::table
                .filter(users::username.eq(&user.username))
                .filter(users::active.eq(true))
                .count()
                .get_result(conn)?;
            if taken > 0 {
                return Ok(None);
            }
            let user_id: UserId = diesel::insert_into(users::table)
                .values(user)
                .returning(users::id)
                .get_result(conn)?;
            diesel::insert_into(user_logs::table)
                .values(&UserLog {
                    user_id,
                    action: UserAction::Create as i32,
                    logged_at: Utc::now().timestamp(),
                })
                .execute(conn)?;
            Ok(Some(user_id))
        })
    }

    /// Id of the active user with this name and passkey.
    pub fn find_active_user(&self, username: &str, passkey: &str) -> QueryResult<Option<UserId>> {
        let mut conn = self.connection.lock();
        users::table
            .filter(users::username.eq(username))
            .filter(users::passkey.eq(passkey))
            .filter(users::active.eq(true))
            .select(users::id)
            .first(&mut *conn)
            .optional()
    }

    pub fn user(&self, user_id: UserId) -> QueryResult<Option<User>> {
        let mut conn = self.connection.lock();
        users::table
            .find(user_id)
            .select(User::as_select())
            .first(&mut *conn)
            .optional()
    }

    /// Whether `user_id` is active and `passkey` is theirs.
    pub fn passkey_matches(&self, user_id: UserId, passkey: &str) -> QueryResult<bool> {
        let mut conn = self.connection.lock();
        let matches: i64 = users::table
            .filter(users::id.eq(user_id))
            .filter(users::passkey.eq(passkey))
            .filter(users::active.eq(true))
            .count()
            .get_result(&mut *conn)?;
        Ok(matches > 0)
    }

    /// Mark `user_id` inactive. Returns `false` if it was not active.
    pub fn deactivate_user(&self, user_id: UserId) -> QueryResult<bool> {
        let mut conn = self.connection.lock();
        let updated = diesel::update(users::table.filter(users::id.eq(user_id)))
            .filter(users::active.eq(true))
            .set(users::active.eq(false))
            .execute(&mut *conn)?;
        Ok(updated > 0)
    }

    // ARTICLES

    /// Insert article metadata together with its embedding, in one transaction.
    pub fn insert_article(
        &self,
        article: &Article,
        vector: &[f32],
    ) -> Result<ArticleId, StoreError> {
        let blob = encode_vector(vector)?;
        let mut conn = self.connection.lock();
        let article_id = conn.transaction(|conn| {
            let article_id: ArticleId = diesel::insert_into(articles::table)
                .values(article)
                .returning(articles::id)
                .get_result(conn)?;
            diesel::insert_into(article_vectors::table)
                .values(&ArticleVector {
                    article_id,
                    vector: blob,
                })
                .execute(conn)?;
            QueryResult::Ok(article_id)
        })?;
        debug!(article_id, "stored article metadata and vector");
        Ok(article_id)
    }

    /// Store or replace the embedding of `article_id`.
    pub fn upsert_vector(&self, article_id: ArticleId, vector: &[f32]) -> Result<(), StoreError> {
        let blob = encode_vector(vector)?;
        let mut conn = self.connection.lock();
        diesel::insert_into(article_vectors::table)
            .values(&ArticleVector {
                article_id,
                vector: blob.clone(),
            })
            .on_conflict(article_vectors::article_id)
            .do_update()
            .set(article_vectors::vector.eq(blob))
            .execute(&mut *conn)?;
        Ok(())
    }

    /// The article if it exists and has not been deleted.
    pub fn active_article(&self, article_id: ArticleId) -> QueryResult<Option<Article>> {
        let mut conn = self.connection.lock();
        articles::table
            .find(article_id)
            .filter(articles::active.eq(true))
            .select(Article::as_select())
            .first(&mut *conn)
            .optional()
    }

    /// Soft-delete `article_id`. Returns `false` if it was not active.
    pub fn deactivate_article(&self, article_id: ArticleId) -> QueryResult<bool> {
        let mut conn = self.connection.lock();
        let updated = diesel::update(articles::table.filter(articles::id.eq(article_id)))
            .filter(articles::active.eq(true))
            .set(articles::active.eq(false))
            .execute(&mut *conn)?;
        Ok(updated > 0)
    }

    /// Ids of all active articles, ascending.
    pub fn active_article_ids(&self) -> QueryResult<Vec<ArticleId>> {
        let mut conn = self.connection.lock();
        articles::table
            .filter(articles::active.eq(true))
            .order(articles::id.asc())
            .select(articles::id)
            .load(&mut *conn)
    }

    /// Active articles whose title contains `fragment`, newest first.
    pub fn search_titles(&self, fragment: &str, limit: i64) -> QueryResult<Vec<Headline>> {
        let pattern = format!("%{}%", escape_like(fragment));
        let mut conn = self.connection.lock();
        articles::table
            .filter(articles::title.like(pattern).escape('\\'))
            .filter(articles::active.eq(true))
            .order((articles::submitted_at.desc(), articles::id.desc()))
            .limit(limit)
            .select(Headline::as_select())
            .load(&mut *conn)
    }

    /// The most recently submitted active articles.
    pub fn recent_articles(&self, limit: i64) -> QueryResult<Vec<Headline>> {
        let mut conn = self.connection.lock();
        articles::table
            .filter(articles::active.eq(true))
            .order((articles::submitted_at.desc(), articles::id.desc()))
            .limit(limit)
            .select(Headline::as_select())
            .load(&mut *conn)
    }

    // READS AND LOGS

    pub fn record_read(&self, user_id: UserId, article_id: ArticleId) -> QueryResult<()> {
        let mut conn = self.connection.lock();
        diesel::insert_into(user_reads::table)
            .values(&UserRead {
                user_id,
                article_id,
                read_at: Utc::now().timestamp(),
            })
            .execute(&mut *conn)?;
        Ok(())
    }

    pub fn log_user_action(&self, user_id: UserId, action: UserAction) -> QueryResult<()> {
        let mut conn = self.connection.lock();
        diesel::insert_into(user_logs::table)
            .values(&UserLog {
                user_id,
                action: action as i32,
                logged_at: Utc::now().timestamp(),
            })
            .execute(&mut *conn)?;
        Ok(())
    }

    pub fn log_article_action(
        &self,
        article_id: ArticleId,
        user_id: UserId,
        action: ArticleAction,
    ) -> QueryResult<()> {
        let mut conn = self.connection.lock();
        diesel::insert_into(article_logs::table)
            .values(&ArticleLog {
                article_id,
                user_id,
                action: action as i32,
                logged_at: Utc::now().timestamp(),
            })
            .execute(&mut *conn)?;
        Ok(())
    }

    /// Logged actions of `user_id`, oldest first, as raw action codes.
    pub fn user_actions(&self, user_id: UserId) -> QueryResult<Vec<i32>> {
        let mut conn = self.connection.lock();
        user_logs::table
            .filter(user_logs::user_id.eq(user_id))
            .order(user_logs::id.asc())
            .select(user_logs::action)
            .load(&mut *conn)
    }

    /// Logged actions on `article_id`, oldest first, as raw action codes.
    pub fn article_actions(&self, article_id: ArticleId) -> QueryResult<Vec<i32>> {
        let mut conn = self.connection.lock();
        article_logs::table
            .filter(article_logs::article_id.eq(article_id))
            .order(article_logs::id.asc())
            .select(article_logs::action)
            .load(&mut *conn)
    }
}

#[cfg(test)]
impl Catalog {
    /// Run raw SQL against the underlying connection.
    pub(crate) fn execute_sql(&self, sql: &str) -> QueryResult<()> {
        use diesel::connection::SimpleConnection;
        self.connection.lock().batch_execute(sql)
    }
}

impl VectorSource for Catalog {
    fn vector(&self, article_id: ArticleId) -> Result<Option<Embedding>, StoreError> {
        let mut conn = self.connection.lock();
        let blob: Option<Vec<u8>> = article_vectors::table
            .find(article_id)
            .select(article_vectors::vector)
            .first(&mut *conn)
            .optional()?;
        drop(conn);
        blob.filter(|b| !b.is_empty())
            .map(|b| decode_vector(&b))
            .transpose()
    }

    fn vectors_excluding(
        &self,
        excluded: &BTreeSet<ArticleId>,
    ) -> Result<Vec<(ArticleId, Embedding)>, StoreError> {
        // Exclusions are applied here rather than bound into the query: a read set
        // can exceed SQLite's host parameter limit.
        let mut conn = self.connection.lock();
        let rows: Vec<ArticleVector> = article_vectors::table
            .inner_join(articles::table)
            .filter(articles::active.eq(true))
            .order(article_vectors::article_id.asc())
            .select(ArticleVector::as_select())
            .load(&mut *conn)?;
        drop(conn);

        rows.into_iter()
            .filter(|row| !excluded.contains(&row.article_id) && !row.vector.is_empty())
            .map(|row| Ok((row.article_id, decode_vector(&row.vector)?)))
            .collect()
    }
}

impl ReadLog for Catalog {
    fn read_articles(&self, user_id: UserId) -> Result<BTreeSet<ArticleId>, StoreError> {
        let mut conn = self.connection.lock();
        let ids: Vec<ArticleId> = user_reads::table
            .filter(user_reads::user_id.eq(user_id))
            .select(user_reads::article_id)
            .load(&mut *conn)?;
        Ok(ids.into_iter().collect())
    }
}

/// Escape `LIKE` wildcards so `fragment` matches literally (escape char `\`).
fn escape_like(fragment: &str) -> String {
    let mut escaped = String::with_capacity(fragment.len());
    for c in fragment.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
