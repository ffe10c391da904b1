//! Text embedding
//!
//! Wraps an opaque text-to-vector model and normalizes its output to unit
//! length so that inner product equals cosine similarity downstream.
//! The model is loaded lazily, at most once per `Embedder`.

pub mod client;
pub mod hashing;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::config::{EmbeddingConfig, EmbeddingProvider};

pub use client::RemoteModel;
pub use hashing::HashingModel;

/// Embed errors
#[derive(Error, Debug)]
pub enum EmbedError {
    /// The model could not be loaded. The embedder stays uninitialized.
    #[error("Model initialization failed: {0}")]
    Init(String),

    /// API error from the embedding provider
    #[error("Embedding API error: {0}")]
    Api(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network error
    #[error("Network error: {0}")]
    Network(String),

    /// Serialization/Deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The model returned a vector of the wrong length
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// The model returned NaN or infinity at `index`
    #[error("Non-finite value at index {index} in model output")]
    NonFinite { index: usize },
}

pub type EmbedResult<T> = Result<T, EmbedError>;

/// A loaded embedding model.
///
/// Implementations return raw (unnormalized) vectors; [`Embedder`] handles
/// normalization and length checks.
#[async_trait]
pub trait EmbeddingModel: Send + Sync {
    /// Output dimension D, fixed for the lifetime of the model
    fn dimension(&self) -> usize;

    /// Encode text into a raw vector of length `dimension()`
    async fn encode(&self, text: &str) -> EmbedResult<Vec<f32>>;
}

/// Deferred model construction, run on first use.
#[async_trait]
pub trait ModelLoader: Send + Sync {
    async fn load(&self) -> EmbedResult<Arc<dyn EmbeddingModel>>;
}

/// Builds the model described by an [`EmbeddingConfig`].
pub struct ConfigLoader {
    config: EmbeddingConfig,
}

impl ConfigLoader {
    pub fn new(config: EmbeddingConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ModelLoader for ConfigLoader {
    async fn load(&self) -> EmbedResult<Arc<dyn EmbeddingModel>> {
        match self.config.provider {
            EmbeddingProvider::Hashing => {
                let model = HashingModel::new(self.config.hashing_dimension())?;
                Ok(Arc::new(model))
            }
            EmbeddingProvider::Ollama | EmbeddingProvider::OpenAI => {
                let model = RemoteModel::connect(&self.config).await?;
                Ok(Arc::new(model))
            }
        }
    }
}

/// Lazily-initialized, normalizing embedder.
///
/// Safe to share across tasks: the first caller runs the loader while the
/// others wait on the same initialization. A failed load leaves the
/// embedder uninitialized so a later call can retry.
pub struct Embedder {
    loader: Box<dyn ModelLoader>,
    model: OnceCell<Arc<dyn EmbeddingModel>>,
}

impl std::fmt::Debug for Embedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Embedder")
            .field("initialized", &self.model.initialized())
            .field("dimension", &self.dimension())
            .finish()
    }
}

impl Embedder {
    /// Create an embedder that will load its model on first use
    pub fn new(loader: impl ModelLoader + 'static) -> Self {
        Self {
            loader: Box::new(loader),
            model: OnceCell::new(),
        }
    }

    /// Create an embedder for the configured provider
    pub fn from_config(config: EmbeddingConfig) -> Self {
        Self::new(ConfigLoader::new(config))
    }

    /// Whether the model has been loaded
    pub fn is_initialized(&self) -> bool {
        self.model.initialized()
    }

    /// Model dimension, known only once the model is loaded
    pub fn dimension(&self) -> Option<usize> {
        self.model.get().map(|m| m.dimension())
    }

    /// Load the model if needed and return it
    pub async fn model(&self) -> EmbedResult<&Arc<dyn EmbeddingModel>> {
        self.model
            .get_or_try_init(|| async {
                info!("Loading embedding model");
                let model = self.loader.load().await?;
                info!("Embedding model ready (dimension {})", model.dimension());
                Ok::<_, EmbedError>(model)
            })
            .await
    }

    /// Embed text into a unit-length vector of dimension D.
    ///
    /// A zero raw vector is returned unchanged.
    pub async fn embed(&self, text: &str) -> EmbedResult<Vec<f32>> {
        let model = self.model().await?;
        let mut vector = model.encode(text).await?;

        if vector.len() != model.dimension() {
            return Err(EmbedError::DimensionMismatch {
                expected: model.dimension(),
                got: vector.len(),
            });
        }
        if let Some(index) = vector.iter().position(|x| !x.is_finite()) {
            return Err(EmbedError::NonFinite { index });
        }

        normalize(&mut vector);
        debug!("Embedded {} bytes of text", text.len());
        Ok(vector)
    }
}

/// Scale `vector` to unit Euclidean norm in place.
///
/// Leaves a zero vector untouched instead of producing NaN.
pub fn normalize(vector: &mut [f32]) {
    let norm = l2_norm(vector);
    if norm > 0.0 {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
}

/// Euclidean norm
pub fn l2_norm(vector: &[f32]) -> f32 {
    vector.iter().map(|x| x * x).sum::<f32>().sqrt()
}
