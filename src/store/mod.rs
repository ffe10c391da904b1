//! Document records and vector corpus snapshots
//!
//! Records carry their embedding as raw little-endian f32 bytes. [`collect`]
//! turns a point-in-time list of records into a [`VectorCorpus`], keeping
//! identifiers and vectors in fixed correspondence.

pub mod documents;

use bytes::{Buf, BufMut};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};

pub use documents::DocumentStore;

/// Size of one encoded vector component
pub const ELEMENT_SIZE: usize = std::mem::size_of::<f32>();

/// Store errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// Stored vector bytes are not a whole number of f32 components
    #[error("Malformed vector: {len} bytes is not a multiple of 4")]
    MalformedVector { len: usize },

    /// Stored vector decodes to NaN or infinity
    #[error("Non-finite vector component at index {index}")]
    NonFiniteVector { index: usize },

    /// Document not found
    #[error("Document not found: {0}")]
    NotFound(DocumentId),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// A writer panicked while holding the store lock
    #[error("Document store lock poisoned")]
    LockPoisoned,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Stable, unique document identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct DocumentId(pub u64);

impl DocumentId {
    pub fn new(id: u64) -> Self {
        DocumentId(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for DocumentId {
    fn from(id: u64) -> Self {
        DocumentId(id)
    }
}

/// A stored document and its (optional) embedding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: DocumentId,
    /// Display name, usually the source file name
    pub name: String,
    /// Extracted text
    pub text: String,
    /// Encoded embedding; `None` until embedding succeeds
    pub vector: Option<Vec<u8>>,
    /// Unix timestamp (seconds)
    pub uploaded_at: i64,
}

impl DocumentRecord {
    pub fn new(id: DocumentId, name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            text: text.into(),
            vector: None,
            uploaded_at: chrono::Utc::now().timestamp(),
        }
    }

    /// Builder-style helper that stores `vector` encoded
    pub fn with_vector(mut self, vector: &[f32]) -> Self {
        self.vector = Some(encode_vector(vector));
        self
    }

    /// Whether an embedding is stored. Empty bytes count as absent.
    pub fn has_vector(&self) -> bool {
        self.vector.as_ref().is_some_and(|bytes| !bytes.is_empty())
    }

    /// Decode the stored embedding, if any
    pub fn embedding(&self) -> Option<StoreResult<Vec<f32>>> {
        match &self.vector {
            Some(bytes) if !bytes.is_empty() => Some(decode_vector(bytes)),
            _ => None,
        }
    }
}

/// Encode a vector as little-endian f32 bytes
pub fn encode_vector(vector: &[f32]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(vector.len() * ELEMENT_SIZE);
    for &x in vector {
        buf.put_f32_le(x);
    }
    buf
}

/// Decode little-endian f32 bytes. Bit patterns are preserved exactly.
pub fn decode_vector(mut bytes: &[u8]) -> StoreResult<Vec<f32>> {
    if bytes.len() % ELEMENT_SIZE != 0 {
        return Err(StoreError::MalformedVector { len: bytes.len() });
    }
    let mut vector = Vec::with_capacity(bytes.len() / ELEMENT_SIZE);
    while bytes.has_remaining() {
        vector.push(bytes.get_f32_le());
    }
    Ok(vector)
}

/// Point-in-time snapshot of (identifier, vector) pairs.
///
/// Position `i` of `ids()` always corresponds to row `i` of `rows()`.
/// Rows are not checked against `dimension` here; the index builder does
/// that.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorCorpus {
    dimension: usize,
    ids: Vec<DocumentId>,
    rows: Vec<Vec<f32>>,
}

impl VectorCorpus {
    /// Empty corpus of the given dimension
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            ids: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, id: DocumentId, vector: Vec<f32>) {
        self.ids.push(id);
        self.rows.push(vector);
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Identifier order; position `i` names row `i`
    pub fn ids(&self) -> &[DocumentId] {
        &self.ids
    }

    pub fn rows(&self) -> &[Vec<f32>] {
        &self.rows
    }

    /// Split into identifier order and rows
    pub fn into_parts(self) -> (Vec<DocumentId>, Vec<Vec<f32>>) {
        (self.ids, self.rows)
    }
}

/// Build a corpus from the records that carry a vector.
///
/// Records without a vector are skipped, as are records whose bytes fail
/// to decode or decode to NaN or infinity, so one corrupt record cannot
/// take down every search. Input order is preserved among the kept records.
pub fn collect<'a, I>(records: I, dimension: usize) -> VectorCorpus
where
    I: IntoIterator<Item = &'a DocumentRecord>,
{
    let mut corpus = VectorCorpus::new(dimension);
    let mut skipped = 0usize;

    for record in records {
        match record.embedding().map(|decoded| decoded.and_then(check_finite)) {
            Some(Ok(vector)) => corpus.push(record.id, vector),
            Some(Err(e)) => {
                warn!("Skipping document {}: {}", record.id, e);
                skipped += 1;
            }
            None => {}
        }
    }

    debug!(
        "Collected corpus of {} vectors (dimension {}, {} malformed)",
        corpus.len(),
        dimension,
        skipped
    );
    corpus
}

fn check_finite(vector: Vec<f32>) -> StoreResult<Vec<f32>> {
    match vector.iter().position(|x| !x.is_finite()) {
        Some(index) => Err(StoreError::NonFiniteVector { index }),
        None => Ok(vector),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: u64, vector: Option<&[f32]>) -> DocumentRecord {
        let r = DocumentRecord::new(DocumentId::new(id), format!("doc{}", id), "");
        match vector {
            Some(v) => r.with_vector(v),
            None => r,
        }
    }

    #[test]
    fn test_vector_bytes_are_exact() {
        let v = vec![0.1f32, -3.5e-12, f32::MAX, f32::MIN_POSITIVE, -0.0, 1.0 / 3.0];
        let bytes = encode_vector(&v);
        assert_eq!(bytes.len(), v.len() * 4);
        assert_eq!(&bytes[..4], &0.1f32.to_le_bytes());

        let decoded = decode_vector(&bytes).unwrap();
        let bits = |xs: &[f32]| xs.iter().map(|x| x.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&decoded), bits(&v));
    }

    #[test]
    fn test_malformed_bytes() {
        let err = decode_vector(&[0u8, 0, 128, 63, 1]).unwrap_err();
        assert!(matches!(err, StoreError::MalformedVector { len: 5 }));
    }

    #[test]
    fn test_collect_empty() {
        let corpus = collect(&Vec::<DocumentRecord>::new(), 384);
        assert!(corpus.is_empty());
        assert_eq!(corpus.len(), 0);
        assert_eq!(corpus.dimension(), 384);
        assert!(corpus.ids().is_empty());
    }

    #[test]
    fn test_collect_preserves_order() {
        let v1 = [1.0f32, 0.0];
        let v2 = [0.0f32, 1.0];
        let records = vec![record(1, None), record(2, Some(&v1)), record(3, Some(&v2))];

        let corpus = collect(&records, 2);
        assert_eq!(corpus.ids(), &[DocumentId::new(2), DocumentId::new(3)]);
        assert_eq!(corpus.rows(), &[v1.to_vec(), v2.to_vec()]);
    }

    #[test]
    fn test_collect_skips_malformed_and_empty() {
        let mut bad = record(2, None);
        bad.vector = Some(vec![1, 2, 3]);
        let mut empty = record(3, None);
        empty.vector = Some(Vec::new());
        let records = vec![record(1, Some(&[1.0, 0.0])), bad, empty, record(4, Some(&[0.0, 1.0]))];

        let corpus = collect(&records, 2);
        assert_eq!(corpus.ids(), &[DocumentId::new(1), DocumentId::new(4)]);
    }

    #[test]
    fn test_collect_skips_non_finite() {
        let records = vec![
            record(1, Some(&[f32::NAN, 0.0])),
            record(2, Some(&[1.0, 0.0])),
            record(3, Some(&[0.0, f32::INFINITY])),
        ];

        let corpus = collect(&records, 2);
        assert_eq!(corpus.ids(), &[DocumentId::new(2)]);
        assert_eq!(corpus.rows(), &[vec![1.0, 0.0]]);

        // Decoding alone stays lossless; only collection rejects the row.
        assert!(decode_vector(records[0].vector.as_ref().unwrap()).unwrap()[0].is_nan());
    }

    #[test]
    fn test_zero_vector_is_kept() {
        let records = vec![record(1, Some(&[0.0, 0.0]))];
        assert!(records[0].has_vector());

        let corpus = collect(&records, 2);
        assert_eq!(corpus.len(), 1);
        assert_eq!(corpus.rows()[0], vec![0.0, 0.0]);
    }
}
