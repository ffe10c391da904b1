//! Docsim document similarity search
//!
//! Ingests documents, embeds their text into unit-length vectors and ranks
//! stored documents against a query by cosine similarity.
//!
//! # Architecture
//!
//! - `embed`: lazily-loaded embedding model, output normalized to unit length
//! - `store`: document records, vector encoding and corpus snapshots
//! - `vector`: exact flat inner-product index, rebuilt per search
//! - `rank`: threshold filtering and identifier mapping
//! - `engine`: the ingest and search pipeline over all of the above
//!
//! ## Example Usage
//!
//! ```rust
//! use docsim::store::{collect, DocumentId, DocumentRecord};
//! use docsim::vector::{search, FlatIndex};
//! use docsim::rank::rank;
//!
//! let records = vec![
//!     DocumentRecord::new(DocumentId::new(1), "a.txt", "").with_vector(&[1.0, 0.0]),
//!     DocumentRecord::new(DocumentId::new(2), "b.txt", ""),
//!     DocumentRecord::new(DocumentId::new(3), "c.txt", "").with_vector(&[0.0, 1.0]),
//! ];
//!
//! let corpus = collect(&records, 2);
//! let index = FlatIndex::build(corpus).unwrap();
//! let neighbors = search(index.as_ref(), &[0.0, 1.0], 5).unwrap();
//! let ranked = rank(&neighbors, index.as_ref().unwrap().ids(), 0.2);
//!
//! assert_eq!(ranked.len(), 1);
//! assert_eq!(ranked[0].id, DocumentId::new(3));
//! ```

#![warn(clippy::all)]

pub mod config;
pub mod embed;
pub mod engine;
pub mod rank;
pub mod store;
pub mod vector;

// Re-export main types for convenience
pub use config::{ConfigError, DocsimConfig, EmbeddingConfig, EmbeddingProvider, SearchConfig};

pub use embed::{EmbedError, EmbedResult, Embedder, EmbeddingModel, HashingModel, ModelLoader, RemoteModel};

pub use engine::{EngineError, EngineResult, SearchEngine, SearchHit};

pub use rank::{rank, RankedResult};

pub use store::{
    collect, decode_vector, encode_vector, DocumentId, DocumentRecord, DocumentStore, StoreError,
    StoreResult, VectorCorpus,
};

pub use vector::{FlatIndex, IndexError, IndexResult, Neighbor};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}
