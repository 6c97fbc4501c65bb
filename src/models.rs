//! # Database models
//!
//! Data structures that map to the newsroom's SQLite schema via **Diesel**.
//!
//! - [`User`]: an account; `active = false` once deactivated.
//! - [`Article`]: article metadata. The text itself lives in the
//!   [`ArticleStore`](crate::article_store::ArticleStore).
//! - [`ArticleVector`]: one embedding blob per article.
//! - [`UserRead`]: one row per article view, feeding the recommender's exclusion set.
//! - [`UserLog`] / [`ArticleLog`]: audit trail of account and article actions.
//!
//! ## Diesel expectations
//!
//! The tables are created by [`crate::config::initialize_schema`] from the embedded
//! `schema.sql`; `crate::schema` mirrors them for Diesel.
//!
//! Structs that are both inserted and queried follow one pattern: `id` is an
//! `Option` so inserts can leave it to SQLite, and `deserialize_as = i64` reads the
//! assigned key back.
//!
//! ```no_run
//! use diesel::prelude::*;
//! use newsroom::models::User;
//! use newsroom::schema::users;
//!
//! # fn demo(conn: &mut SqliteConnection) -> Result<(), Box<dyn std::error::Error>> {
//! let user: User = diesel::insert_into(users::table)
//!     .values(&User::new("reader_1", "deadbeef"))
//!     .returning(User::as_returning())
//!     .get_result(conn)?;
//! assert!(user.id.is_some());
//! # Ok(()) }
//! ```
use diesel::prelude::*;
use serde::Serialize;

use crate::{ArticleId, UserId};

/// A registered account.
#[derive(Queryable, Insertable, Selectable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::users)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct User {
    /// Auto-increment primary key (set by the DB on insert).
    #[diesel(deserialize_as = i64)]
    pub id: Option<i64>,
    pub username: String,
    /// Client-side hashed passkey (hex); compared verbatim.
    pub passkey: String,
    pub active: bool,
}

impl User {
    pub fn new(username: &str, passkey: &str) -> Self {
        Self {
            id: None,
            username: username.to_string(),
            passkey: passkey.to_string(),
            active: true,
        }
    }
}

/// Metadata of a submitted article.
///
/// ### Notes
/// - `publish_date` is an ISO `YYYY-MM-DD` string.
/// - `submitted_at` is seconds since the Unix epoch.
/// - Deleting an article clears `active`; the row stays for the audit trail.
#[derive(Queryable, Insertable, Selectable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::articles)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Article {
    #[diesel(deserialize_as = i64)]
    pub id: Option<i64>,
    pub title: String,
    pub authors: String,
    pub publish_date: String,
    pub submitter_id: i64,
    pub submitted_at: i64,
    pub active: bool,
}

/// Stored embedding of one article, as a bincode blob.
#[derive(Queryable, Insertable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::article_vectors)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ArticleVector {
    pub article_id: i64,
    pub vector: Vec<u8>,
}

/// One article view.
#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::user_reads)]
pub struct UserRead {
    pub user_id: UserId,
    pub article_id: ArticleId,
    pub read_at: i64,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::user_logs)]
pub struct UserLog {
    pub user_id: UserId,
    pub action: i32,
    pub logged_at: i64,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::article_logs)]
pub struct ArticleLog {
    pub article_id: ArticleId,
    pub user_id: UserId,
    pub action: i32,
    pub logged_at: i64,
}

/// Account actions recorded in `user_logs.action`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum UserAction {
    Create = 1,
    Deactivate = 2,
    Login = 3,
    Logout = 4,
}

/// Article actions recorded in `article_logs.action`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ArticleAction {
    Create = 1,
    Delete = 2,
    GenerateSummary = 3,
    Read = 4,
}

/// Id and title of an article, as listed by searches.
#[derive(Queryable, Selectable, Serialize, PartialEq, Eq, Debug, Clone)]
#[diesel(table_name = crate::schema::articles)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Headline {
    pub id: i64,
    pub title: String,
}
