//! Per-tenant index building and retrieval, plus the question answering
//! wrapper that feeds retrieved snippets to a [`Generator`].
//!
//! [`Generator`]: ragdb_core::traits::Generator

mod assistant;

pub use assistant::Assistant;

use tracing::{debug, info};

use ragdb_core::data_processor::{ChunkingConfig, DataProcessor};
use ragdb_core::traits::Retriever;
use ragdb_core::types::{Document, IndexHandle, Snippet, TenantId};
use ragdb_core::Result;
use ragdb_text::TfidfVectorizer;
use ragdb_vector::{rank, IndexStore, TenantIndex};

pub struct IndexManager<S> where S: IndexStore {
    store: S,
    processor: DataProcessor,
    vectorizer: TfidfVectorizer,
}

impl<S> IndexManager<S> where S: IndexStore {
    pub fn new(store: S, chunking: ChunkingConfig) -> Self {
        Self { store, processor: DataProcessor::new(chunking), vectorizer: TfidfVectorizer::default() }
    }

    pub fn store(&self) -> &S { &self.store }

    /// Chunk, fit and persist a fresh index for `tenant`, replacing any previous one.
    ///
    /// The vocabulary is rebuilt from scratch on every call, so the same input
    /// always yields the same terms, vectors and rankings.
    pub fn build_index(&self, tenant: &TenantId, documents: Vec<Document>) -> Result<IndexHandle> {
        let chunks = self.processor.chunk_documents(&documents);
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let (vocabulary, vectors) = self.vectorizer.fit(&texts);

        let index = TenantIndex::new(tenant.clone(), vocabulary, vectors, chunks, documents);
        self.store.save(&index)?;
        let handle = index.handle();
        info!(
            tenant = %tenant,
            documents = handle.documents,
            chunks = handle.chunks,
            vocabulary = handle.vocabulary_size,
            "built index"
        );
        Ok(handle)
    }

    /// Top `k` chunks for `question`, best first. Scores are cosine similarities
    /// in `[0, 1]`; a question sharing no terms with the corpus scores zero everywhere.
    pub fn search(&self, tenant: &TenantId, question: &str, k: usize) -> Result<Vec<Snippet>> {
        let index = self.store.load(tenant)?;
        let query = self.vectorizer.transform(&index.vocabulary, question);
        let ranked = rank(&query, &index.vectors, k);
        debug!(
            tenant = %tenant,
            query_terms = query.nnz(),
            candidates = index.chunks.len(),
            best = ?ranked.first().map(|r| r.score),
            "ranked chunks"
        );
        Ok(ranked
            .into_iter()
            .map(|r| {
                let chunk = &index.chunks[r.chunk_index];
                Snippet { id: chunk.id.clone(), text: chunk.text.clone(), score: r.score }
            })
            .collect())
    }

    pub fn status(&self, tenant: &TenantId) -> Result<IndexHandle> {
        Ok(self.store.load(tenant)?.handle())
    }
}

impl<S> Retriever for IndexManager<S> where S: IndexStore {
    fn search(&self, tenant: &TenantId, query: &str, k: usize) -> Result<Vec<Snippet>> { Self::search(self, tenant, query, k) }
}
