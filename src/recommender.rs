//! # Read-next recommendations
//!
//! Brute-force nearest-neighbour search over unit-normalized article embeddings.
//!
//! Given the article a user just read, [`Recommender::best`] scores every other
//! article with a stored vector by dot product (cosine similarity, since vectors are
//! unit length) and returns the highest-scoring one the user has not read yet.
//!
//! The scan is `O(N * D)` with no index, which is fine at the scale of a single
//! newsroom. Scoring runs on rayon's pool; the reduction picks the highest score and
//! breaks ties by the **lowest article id**, so results do not depend on storage or
//! thread scheduling order.
//!
//! ```rust
//! use newsroom::recommender::{MemoryReadLog, Recommender};
//! use newsroom::vector_store::MemoryVectorStore;
//!
//! let vectors = MemoryVectorStore::new(2);
//! vectors.insert(1, vec![1.0, 0.0]).unwrap();
//! vectors.insert(2, vec![1.0, 0.0]).unwrap();
//! vectors.insert(3, vec![0.0, 1.0]).unwrap();
//! let reads = MemoryReadLog::new();
//!
//! let next = Recommender::new(&vectors, &reads).best(1, 10).unwrap();
//! assert_eq!(next.article_id, 2);
//! ```

use parking_lot::RwLock;
use rayon::prelude::*;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, warn};

use crate::error::{RecommendError, StoreError};
use crate::{ArticleId, Embedding, UserId};

/// Source of stored article embeddings.
pub trait VectorSource {
    /// The embedding of `article_id`, or `None` if none is stored.
    fn vector(&self, article_id: ArticleId) -> Result<Option<Embedding>, StoreError>;

    /// Every stored `(id, embedding)` whose id is not in `excluded`, ascending by id.
    fn vectors_excluding(
        &self,
        excluded: &BTreeSet<ArticleId>,
    ) -> Result<Vec<(ArticleId, Embedding)>, StoreError>;
}

/// Source of each user's already-read articles.
pub trait ReadLog {
    fn read_articles(&self, user_id: UserId) -> Result<BTreeSet<ArticleId>, StoreError>;
}

/// The chosen article and its similarity to the source article.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Recommendation {
    pub article_id: ArticleId,
    pub score: f32,
}

/// Selects the most similar unread article.
pub struct Recommender<'a, V: ?Sized, R: ?Sized> {
    vectors: &'a V,
    reads: &'a R,
}

impl<'a, V, R> Recommender<'a, V, R>
where
    V: VectorSource + ?Sized,
    R: ReadLog + ?Sized,
{
    pub fn new(vectors: &'a V, reads: &'a R) -> Self {
        Self { vectors, reads }
    }

    /// Recommend the article most similar to `article_id` that `user_id` has not read.
    ///
    /// # Errors
    /// - [`RecommendError::NoVector`] if `article_id` has no (non-empty) embedding.
    /// - [`RecommendError::NoCandidate`] if every other article is read or unusable.
    /// - [`RecommendError::Store`] if the vector store or read log fails.
    pub fn best(
        &self,
        article_id: ArticleId,
        user_id: UserId,
    ) -> Result<Recommendation, RecommendError> {
        let read = self.reads.read_articles(user_id)?;
        debug!(article_id, user_id, read = read.len(), "recommending next article");
        self.best_excluding(article_id, &read)
    }

    /// Like [`Recommender::best`], with the caller supplying the read set.
    ///
    /// `article_id` itself is always excluded.
    pub fn best_excluding(
        &self,
        article_id: ArticleId,
        read: &BTreeSet<ArticleId>,
    ) -> Result<Recommendation, RecommendError> {
        let source = self
            .vectors
            .vector(article_id)?
            .filter(|v| !v.is_empty())
            .ok_or(RecommendError::NoVector(article_id))?;

        let mut excluded = read.clone();
        excluded.insert(article_id);

        let candidates = self.vectors.vectors_excluding(&excluded)?;
        best_candidate(&source, &candidates, &excluded).ok_or(RecommendError::NoCandidate)
    }
}

/// Score `candidates` against `source` and pick the winner.
///
/// Skips excluded ids, empty vectors, vectors of a different dimension, and
/// non-finite scores. Equal scores go to the lower id.
pub fn best_candidate(
    source: &[f32],
    candidates: &[(ArticleId, Embedding)],
    excluded: &BTreeSet<ArticleId>,
) -> Option<Recommendation> {
    candidates
        .par_iter()
        .filter(|(id, _)| !excluded.contains(id))
        .filter_map(|(id, vector)| {
            if vector.is_empty() {
                return None;
            }
            if vector.len() != source.len() {
                warn!(
                    article_id = *id,
                    expected = source.len(),
                    actual = vector.len(),
                    "skipping vector with mismatched dimension"
                );
                return None;
            }
            let score = dot(source, vector);
            score.is_finite().then_some(Recommendation {
                article_id: *id,
                score,
            })
        })
        .reduce_with(prefer)
}

fn prefer(a: Recommendation, b: Recommendation) -> Recommendation {
    if b.score > a.score || (b.score == a.score && b.article_id < a.article_id) {
        b
    } else {
        a
    }
}

/// Dot product of two equal-length vectors.
///
/// For unit vectors this is the cosine similarity, in `[-1, 1]`.
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// In-memory [`ReadLog`], handy for tests and for callers that track reads themselves.
#[derive(Debug, Default)]
pub struct MemoryReadLog {
    reads: RwLock<HashMap<UserId, BTreeSet<ArticleId>>>,
}

impl MemoryReadLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `user_id` read `article_id`.
    pub fn record(&self, user_id: UserId, article_id: ArticleId) {
        self.reads
            .write()
            .entry(user_id)
            .or_default()
            .insert(article_id);
    }
}

impl ReadLog for MemoryReadLog {
    fn read_articles(&self, user_id: UserId) -> Result<BTreeSet<ArticleId>, StoreError> {
        Ok(self.reads.read().get(&user_id).cloned().unwrap_or_default())
    }
}
