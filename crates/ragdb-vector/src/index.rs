use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ragdb_core::types::{Chunk, Document, IndexHandle, SparseVector, TenantId};
use ragdb_text::Vocabulary;

/// Everything persisted for one tenant.
///
/// `vectors[i]` is the TF-IDF vector of `chunks[i]`; every column it refers to
/// exists in `vocabulary`. `documents` is kept for auditing only and plays no
/// part in scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenantIndex {
    pub tenant_id: TenantId,
    pub built_at: DateTime<Utc>,
    pub vocabulary: Vocabulary,
    pub vectors: Vec<SparseVector>,
    pub chunks: Vec<Chunk>,
    pub documents: Vec<Document>,
}

impl TenantIndex {
    pub fn new(
        tenant_id: TenantId,
        vocabulary: Vocabulary,
        vectors: Vec<SparseVector>,
        chunks: Vec<Chunk>,
        documents: Vec<Document>,
    ) -> Self {
        let index = Self { tenant_id, built_at: Utc::now(), vocabulary, vectors, chunks, documents };
        debug_assert!(index.validate().is_ok(), "{:?}", index.validate());
        index
    }

    /// Check the structural invariants, reporting the first violation.
    pub fn validate(&self) -> Result<(), String> {
        if self.vectors.len() != self.chunks.len() {
            return Err(format!("{} vectors for {} chunks", self.vectors.len(), self.chunks.len()));
        }
        let dim = self.vocabulary.len();
        if let Some(pos) = self.vectors.iter().position(|v| !v.is_well_formed(dim)) {
            return Err(format!("vector {pos} is malformed for a vocabulary of {dim} terms"));
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn handle(&self) -> IndexHandle {
        IndexHandle {
            tenant_id: self.tenant_id.clone(),
            documents: self.documents.len(),
            chunks: self.chunks.len(),
            vocabulary_size: self.vocabulary.len(),
            built_at: self.built_at,
        }
    }
}
