use crate::error::Result;
use crate::types::{Snippet, TenantId};

/// Produces an answer for a question from retrieved context.
///
/// Implementations are built once at process start and passed by reference,
/// so retrieval never depends on which backend is active.
pub trait Generator: Send + Sync {
    fn name(&self) -> &str;
    fn generate(&self, question: &str, context: &str) -> Result<String>;
}

/// Ranked snippet lookup over a tenant's index.
pub trait Retriever: Send + Sync {
    fn search(&self, tenant: &TenantId, query: &str, k: usize) -> Result<Vec<Snippet>>;
}
