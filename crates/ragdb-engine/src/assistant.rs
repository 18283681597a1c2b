use tracing::debug;

use ragdb_core::traits::{Generator, Retriever};
use ragdb_core::types::{Answer, TenantId};
use ragdb_core::Result;

/// Retrieval followed by generation over the retrieved context.
pub struct Assistant<'a> {
    retriever: &'a dyn Retriever,
    generator: &'a dyn Generator,
}

impl<'a> Assistant<'a> {
    pub fn new(retriever: &'a dyn Retriever, generator: &'a dyn Generator) -> Self { Self { retriever, generator } }

    /// Snippet texts are joined with newlines, best first, to form the context.
    /// Errors from retrieval (including a missing index) are returned untouched.
    pub fn ask(&self, tenant: &TenantId, question: &str, k: usize) -> Result<Answer> {
        let citations = self.retriever.search(tenant, question, k)?;
        let context = citations.iter().map(|s| s.text.as_str()).collect::<Vec<_>>().join("\n");
        debug!(tenant = %tenant, generator = self.generator.name(), snippets = citations.len(), "generating answer");
        let answer = self.generator.generate(question, &context)?;
        Ok(Answer { answer, citations })
    }
}
