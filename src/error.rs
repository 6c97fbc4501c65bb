//! Error types for the newsroom core.
//!
//! Every failure is a value. Session and recommendation errors are small enums
//! a web layer can match on (redirect to login on [`NewsroomError::InvalidSession`],
//! show "nothing left to read" on [`RecommendError::NoCandidate`], and so on).

use thiserror::Error;

use crate::{ArticleId, UserId};

/// Errors raised by [`crate::session::SessionRegistry`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// User ids are non-negative.
    #[error("invalid user id {0}: user ids must be non-negative")]
    InvalidUserId(UserId),

    /// A session key was built from both a user id and a token, or from neither.
    #[error("exactly one of user id or token must be supplied")]
    AmbiguousKey,
}

/// Failures of the collaborators that back the recommender.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    /// Stored vector blob could not be encoded or decoded
    #[error("vector codec error: {0}")]
    Codec(String),
}

impl From<bincode::error::EncodeError> for StoreError {
    fn from(e: bincode::error::EncodeError) -> Self {
        StoreError::Codec(e.to_string())
    }
}

impl From<bincode::error::DecodeError> for StoreError {
    fn from(e: bincode::error::DecodeError) -> Self {
        StoreError::Codec(e.to_string())
    }
}

/// Errors returned by [`crate::recommender::Recommender`].
#[derive(Debug, Error)]
pub enum RecommendError {
    /// The source article has no stored embedding.
    #[error("no vector stored for article {0}")]
    NoVector(ArticleId),

    /// Every candidate was excluded or unusable.
    #[error("no unread similar article found")]
    NoCandidate,

    /// The vector store or read log failed.
    #[error("recommendation store failure: {0}")]
    Store(#[from] StoreError),
}

/// Embedding errors.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// Candle model error
    #[error("Candle error: {0}")]
    Candle(#[from] candle_core::Error),

    /// Tokenizer error
    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    /// Download error
    #[error("Failed to download model: {0}")]
    Download(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Model config could not be parsed
    #[error("Model config error: {0}")]
    Config(#[from] serde_json::Error),

    /// Dimension mismatch
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Summarizer errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SummaryError {
    #[error("article has no text to summarize")]
    Empty,

    #[error("no summary available (generated text shorter than {0} characters)")]
    TooShort(usize),
}

/// Errors surfaced by [`crate::newsroom::Newsroom`].
#[derive(Debug, Error)]
pub enum NewsroomError {
    #[error("invalid session")]
    InvalidSession,

    #[error("username must be 4-16 characters of letters, digits or '_'")]
    InvalidUsername,

    #[error("passkey must be 8-32 hexadecimal characters")]
    InvalidPasskey,

    #[error("username already exists")]
    UsernameTaken,

    #[error("username or passkey error")]
    InvalidCredentials,

    #[error("article {0} not found")]
    ArticleNotFound(ArticleId),

    #[error("article {0} is not owned by this user")]
    NotArticleOwner(ArticleId),

    #[error("invalid article: {0}")]
    InvalidArticle(String),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Recommend(#[from] RecommendError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Summary(#[from] SummaryError),

    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("database connection error: {0}")]
    Connection(#[from] diesel::ConnectionError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
