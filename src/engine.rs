//! Document ingestion and similarity search pipeline
//!
//! Each search takes a fresh snapshot of the document store, builds a
//! transient index from it and discards the index afterwards. No index
//! state is shared between requests.

use crate::config::{DocsimConfig, SearchConfig};
use crate::embed::{EmbedError, Embedder};
use crate::rank::{rank, RankedResult};
use crate::store::{collect, DocumentId, DocumentRecord, DocumentStore, StoreError};
use crate::vector::{self, FlatIndex, IndexError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Engine errors
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Embed(#[from] EmbedError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type EngineResult<T> = Result<T, EngineError>;

/// A ranked result with the document's display name attached
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: DocumentId,
    pub name: String,
    pub score: f32,
}

/// Ties an embedder to a document store
#[derive(Debug)]
pub struct SearchEngine {
    embedder: Arc<Embedder>,
    store: Arc<DocumentStore>,
    defaults: SearchConfig,
}

impl SearchEngine {
    pub fn new(embedder: Arc<Embedder>, store: Arc<DocumentStore>, defaults: SearchConfig) -> Self {
        Self {
            embedder,
            store,
            defaults,
        }
    }

    /// Engine with a config-driven embedder (loaded lazily) over `store`
    pub fn from_config(config: &DocsimConfig, store: Arc<DocumentStore>) -> Self {
        let embedder = Arc::new(Embedder::from_config(config.embedding.clone()));
        Self::new(embedder, store, config.search)
    }

    pub fn store(&self) -> &Arc<DocumentStore> {
        &self.store
    }

    pub fn defaults(&self) -> SearchConfig {
        self.defaults
    }

    /// Store a document and embed it.
    ///
    /// The record is stored before embedding; if embedding fails it stays
    /// in the store without a vector and the error is returned.
    pub async fn ingest(&self, name: &str, text: &str) -> EngineResult<DocumentId> {
        let id = self.store.insert(name, text)?;
        let vector = self.embedder.embed(text).await?;
        self.store.set_vector(id, &vector)?;
        info!("Ingested document {} ({})", id, name);
        Ok(id)
    }

    /// Embed every stored document that has no vector yet.
    ///
    /// Returns how many documents were embedded. Documents removed while
    /// this runs are skipped.
    pub async fn embed_pending(&self) -> EngineResult<usize> {
        let pending = self.store.pending()?;
        let mut embedded = 0;

        for id in pending {
            let Some(record) = self.store.get(id)? else {
                continue;
            };
            let vector = self.embedder.embed(&record.text).await?;
            match self.store.set_vector(id, &vector) {
                Ok(()) => embedded += 1,
                Err(StoreError::NotFound(_)) => warn!("Document {} removed before its vector was stored", id),
                Err(e) => return Err(e.into()),
            }
        }

        info!("Embedded {} pending documents", embedded);
        Ok(embedded)
    }

    /// Search with the configured `top_k` and threshold
    pub async fn search_default(&self, query: &str) -> EngineResult<Vec<SearchHit>> {
        self.search(query, self.defaults.top_k, self.defaults.score_threshold).await
    }

    /// Rank stored documents against `query`.
    ///
    /// A blank query returns no hits without loading the model.
    pub async fn search(&self, query: &str, top_k: usize, score_threshold: f32) -> EngineResult<Vec<SearchHit>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }
        if top_k == 0 {
            return Err(IndexError::InvalidTopK.into());
        }

        let query_vector = self.embedder.embed(query).await?;
        let dimension = query_vector.len();

        let records = self.store.snapshot()?;
        let corpus = collect(&records, dimension);
        let index = FlatIndex::build(corpus)?;

        let neighbors = vector::search(index.as_ref(), &query_vector, top_k)?;
        let ranked = match &index {
            Some(index) => rank(&neighbors, index.ids(), score_threshold),
            None => Vec::new(),
        };
        debug!(
            "Query matched {} of {} candidates above {}",
            ranked.len(),
            neighbors.len(),
            score_threshold
        );

        Ok(attach_names(ranked, &records))
    }
}

fn attach_names(ranked: Vec<RankedResult>, records: &[DocumentRecord]) -> Vec<SearchHit> {
    ranked
        .into_iter()
        .filter_map(|result| {
            records.iter().find(|r| r.id == result.id).map(|record| SearchHit {
                id: result.id,
                name: record.name.clone(),
                score: result.score,
            })
        })
        .collect()
}
