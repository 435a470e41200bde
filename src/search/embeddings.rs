//! Embedding providers
//!
//! The engine consumes vectors through the [`Embedder`] trait and never
//! cares how they are produced. [`HashEmbedder`] is a deterministic
//! FNV-1a hash embedder with no model dependencies; remote providers live
//! in `embeddings_api`.

use std::sync::Arc;

use crate::config::EmbeddingConfig;
use crate::error::{Result, SearchError};
use crate::search::embeddings_api::ApiEmbedder;
use crate::search::types::tokenize;

/// Pluggable embedding backend.
pub trait Embedder: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|text| self.embed(text)).collect()
    }

    fn dims(&self) -> usize;

    /// Stable backend identifier, stored next to persisted vectors.
    fn name(&self) -> &str;
}

/// Build the configured embedder. `backend = "none"` yields `None`.
pub fn build_embedder(config: &EmbeddingConfig) -> Result<Option<Arc<dyn Embedder>>> {
    if config.dims == 0 {
        return Err(SearchError::Config(
            "embedding.dims must be greater than 0".to_string(),
        ));
    }

    match config.backend.trim().to_lowercase().as_str() {
        "" | "hash" => Ok(Some(Arc::new(HashEmbedder::new(config.dims)))),
        "api" => Ok(Some(Arc::new(ApiEmbedder::from_config(config)?))),
        "none" => Ok(None),
        other => Err(SearchError::Config(format!(
            "unknown embedding backend: {other}"
        ))),
    }
}

/// Hash embedder using FNV-1a over unigrams and bigrams.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dim: usize,
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self { dim: 384 }
    }
}

impl HashEmbedder {
    #[must_use]
    pub const fn new(dim: usize) -> Self {
        Self { dim }
    }

    /// Embed text into an L2-normalized vector. Text without tokens maps
    /// to the zero vector.
    #[must_use]
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0; self.dim];
        if self.dim == 0 {
            return embedding;
        }

        let tokens = tokenize(text);
        if tokens.is_empty() {
            return embedding;
        }

        for token in &tokens {
            accumulate(&mut embedding, token, 1.0);
        }
        for window in tokens.windows(2) {
            accumulate(&mut embedding, &format!("{} {}", window[0], window[1]), 0.5);
        }

        l2_normalize(&mut embedding);
        embedding
    }
}

impl Embedder for HashEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_text(text))
    }

    fn dims(&self) -> usize {
        self.dim
    }

    fn name(&self) -> &str {
        "hash"
    }
}

/// Cosine similarity. Mismatched lengths and zero-magnitude vectors score 0.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[allow(clippy::cast_possible_truncation)]
fn accumulate(embedding: &mut [f32], token: &str, weight: f32) {
    let token_hash = fnv1a_hash(token.as_bytes());
    let len = embedding.len();

    for i in 0..len {
        let dim_hash = fnv1a_hash_with_salt(token_hash, i as u64);
        let sign = if dim_hash & 1 == 0 { weight } else { -weight };
        let dim = ((dim_hash >> 1) as usize) % len;
        embedding[dim] += sign;
    }
}

fn fnv1a_hash_with_salt(seed: u64, salt: u64) -> u64 {
    let mut bytes = [0u8; 16];
    bytes[..8].copy_from_slice(&seed.to_le_bytes());
    bytes[8..].copy_from_slice(&salt.to_le_bytes());
    fnv1a_hash(&bytes)
}

fn fnv1a_hash(data: &[u8]) -> u64 {
    const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x0100_0000_01b3;

    data.iter().fold(FNV_OFFSET, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(FNV_PRIME)
    })
}

fn l2_normalize(vec: &mut [f32]) {
    let norm = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in vec.iter_mut() {
            *value /= norm;
        }
    }
}
