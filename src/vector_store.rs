//! # Article vectors
//!
//! Embedding side of the newsroom: turning article text into unit-length vectors and
//! keeping vectors keyed by article id.
//!
//! ## Responsibilities
//! - **Embedding**: [`ArticleVectorizer`] runs all-MiniLM-L6-v2 through Candle
//!   (pure Rust) to produce 384-d, L2-normalized vectors. [`LazyVectorizer`] defers
//!   the model download until the first text is embedded.
//! - **Storage**: [`MemoryVectorStore`] holds `article id -> vector` in memory and
//!   serves the recommender through [`VectorSource`]. The SQLite-backed store lives in
//!   [`crate::catalog`].
//! - **Blob layout**: [`encode_vector`] / [`decode_vector`] convert vectors to the
//!   bincode blobs persisted in the `article_vectors` table.
//!
//! ## Quick Example
//! ```no_run
//! use newsroom::vector_store::{ArticleVectorizer, MemoryVectorStore, Vectorizer};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let vectorizer = ArticleVectorizer::load("sentence-transformers/all-MiniLM-L6-v2", "main")?;
//! let store = MemoryVectorStore::new(vectorizer.dimension());
//! store.insert(1, vectorizer.encode("Rust 2024 edition released")?)?;
//! # Ok(()) }
//! ```

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config, DTYPE};
use hf_hub::{Repo, RepoType, api::sync::Api};
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};
use tokenizers::{Tokenizer, TruncationParams};
use tracing::info;

use crate::error::{EmbeddingError, StoreError};
use crate::recommender::VectorSource;
use crate::{ArticleId, Embedding};

/// Output dimension of all-MiniLM-L6-v2.
pub const MINI_LM_DIMENSION: usize = 384;

/// Longest token sequence fed to the model; longer articles are truncated.
pub const MAX_SEQUENCE_TOKENS: usize = 256;

/// Turns article text into a fixed-length, unit-norm embedding.
pub trait Vectorizer: Send + Sync {
    fn encode(&self, text: &str) -> Result<Embedding, EmbeddingError>;

    /// Length of every vector this vectorizer produces.
    fn dimension(&self) -> usize;
}

/// Sentence embeddings model using Candle (pure Rust)
pub struct ArticleVectorizer {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    dimension: usize,
}

impl ArticleVectorizer {
    /// Load the model from Hugging Face Hub (cached after the first download).
    pub fn load(model_id: &str, revision: &str) -> Result<Self, EmbeddingError> {
        let device = Device::Cpu;

        let repo = Repo::with_revision(model_id.to_string(), RepoType::Model, revision.to_string());
        let api = Api::new().map_err(|e| EmbeddingError::Download(e.to_string()))?;
        let api_repo = api.repo(repo);

        let fetch = |name: &str| {
            api_repo
                .get(name)
                .map_err(|e| EmbeddingError::Download(format!("{name}: {e}")))
        };
        let config_filename = fetch("config.json")?;
        let tokenizer_filename = fetch("tokenizer.json")?;
        let weights_filename = fetch("model.safetensors")?;

        let config = std::fs::read_to_string(config_filename)?;
        let raw: serde_json::Value = serde_json::from_str(&config)?;
        let dimension = raw["hidden_size"]
            .as_u64()
            .map_or(MINI_LM_DIMENSION, |d| d as usize);
        let config: Config = serde_json::from_value(raw)?;

        let mut tokenizer = Tokenizer::from_file(tokenizer_filename)
            .map_err(|e| EmbeddingError::Tokenizer(e.to_string()))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: MAX_SEQUENCE_TOKENS,
                ..Default::default()
            }))
            .map_err(|e| EmbeddingError::Tokenizer(e.to_string()))?;

        // SAFETY: the safetensors file lives in the hf-hub cache and is not modified
        // while mapped.
        let vb =
            unsafe { VarBuilder::from_mmaped_safetensors(&[weights_filename], DTYPE, &device)? };
        let model = BertModel::load(vb, &config)?;

        info!(model_id, revision, dimension, "loaded embedding model");

        Ok(Self {
            model,
            tokenizer,
            device,
            dimension,
        })
    }

    /// Mean pooling over token embeddings, considering attention mask
    fn mean_pooling(
        &self,
        embeddings: &Tensor,
        attention_mask: &[u32],
    ) -> Result<Tensor, EmbeddingError> {
        // embeddings: [1, seq_len, hidden]; mask reshaped to [1, seq_len, 1]
        let mask = Tensor::new(attention_mask, &self.device)?
            .to_dtype(DType::F32)?
            .unsqueeze(0)?
            .unsqueeze(2)?;

        let sum = embeddings.broadcast_mul(&mask)?.sum(1)?;
        let count = mask.sum(1)?.clamp(1f32, f32::INFINITY)?;

        Ok(sum.broadcast_div(&count)?.squeeze(0)?)
    }

    /// L2 normalize the embedding vector
    fn normalize(&self, tensor: &Tensor) -> Result<Tensor, EmbeddingError> {
        let norm = tensor.sqr()?.sum_all()?.sqrt()?.clamp(1e-12f32, f32::INFINITY)?;
        Ok(tensor.broadcast_div(&norm)?)
    }
}

impl Vectorizer for ArticleVectorizer {
    fn encode(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        let tokens = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| EmbeddingError::Tokenizer(e.to_string()))?;

        let token_ids = Tensor::new(tokens.get_ids(), &self.device)?.unsqueeze(0)?;
        let token_type_ids = Tensor::new(tokens.get_type_ids(), &self.device)?.unsqueeze(0)?;

        let output = self.model.forward(&token_ids, &token_type_ids, None)?;
        let embedding = self.mean_pooling(&output, tokens.get_attention_mask())?;
        let embedding = self.normalize(&embedding)?;

        Ok(embedding.to_vec1::<f32>()?)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// [`ArticleVectorizer`] loaded on first use.
///
/// Commands that never embed text (reading, searching) skip the model download.
pub struct LazyVectorizer {
    model_id: String,
    revision: String,
    dimension: usize,
    inner: OnceCell<ArticleVectorizer>,
}

impl LazyVectorizer {
    pub fn new(model_id: impl Into<String>, revision: impl Into<String>, dimension: usize) -> Self {
        Self {
            model_id: model_id.into(),
            revision: revision.into(),
            dimension,
            inner: OnceCell::new(),
        }
    }

    /// Load the model now if it is not loaded yet.
    pub fn get(&self) -> Result<&ArticleVectorizer, EmbeddingError> {
        self.inner
            .get_or_try_init(|| ArticleVectorizer::load(&self.model_id, &self.revision))
    }

    pub fn is_loaded(&self) -> bool {
        self.inner.get().is_some()
    }
}

impl Vectorizer for LazyVectorizer {
    fn encode(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        self.get()?.encode(text)
    }

    fn dimension(&self) -> usize {
        self.inner.get().map_or(self.dimension, |v| v.dimension())
    }
}

/// In-memory vector store keyed by article id.
///
/// Iteration is in ascending id order. Inserts take a write lock, so vectors can be
/// added while recommendations are being computed.
#[derive(Debug)]
pub struct MemoryVectorStore {
    dimension: usize,
    vectors: RwLock<BTreeMap<ArticleId, Embedding>>,
}

impl MemoryVectorStore {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            vectors: RwLock::new(BTreeMap::new()),
        }
    }

    /// Insert or replace the vector of `article_id`.
    ///
    /// # Errors
    /// [`EmbeddingError::DimensionMismatch`] if `vector.len() != self.dimension()`.
    pub fn insert(&self, article_id: ArticleId, vector: Embedding) -> Result<(), EmbeddingError> {
        if vector.len() != self.dimension {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        self.vectors.write().insert(article_id, vector);
        Ok(())
    }

    pub fn remove(&self, article_id: ArticleId) -> Option<Embedding> {
        self.vectors.write().remove(&article_id)
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.vectors.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.read().is_empty()
    }
}

impl VectorSource for MemoryVectorStore {
    fn vector(&self, article_id: ArticleId) -> Result<Option<Embedding>, StoreError> {
        Ok(self.vectors.read().get(&article_id).cloned())
    }

    fn vectors_excluding(
        &self,
        excluded: &BTreeSet<ArticleId>,
    ) -> Result<Vec<(ArticleId, Embedding)>, StoreError> {
        Ok(self
            .vectors
            .read()
            .iter()
            .filter(|(id, _)| !excluded.contains(id))
            .map(|(id, v)| (*id, v.clone()))
            .collect())
    }
}

/// Encode a vector as the blob stored in `article_vectors.vector`.
pub fn encode_vector(vector: &[f32]) -> Result<Vec<u8>, StoreError> {
    Ok(bincode::serde::encode_to_vec(vector, bincode::config::standard())?)
}

/// Decode a blob written by [`encode_vector`].
pub fn decode_vector(blob: &[u8]) -> Result<Embedding, StoreError> {
    let (vector, _) = bincode::serde::decode_from_slice(blob, bincode::config::standard())?;
    Ok(vector)
}

/// Scale `vector` to unit length in place. Zero vectors are left untouched.
pub fn normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        vector.iter_mut().for_each(|x| *x /= norm);
    }
}
