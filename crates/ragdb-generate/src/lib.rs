//! Answer generators: a deterministic echo of the retrieved context and a
//! local seq2seq model.

use std::path::Path;

use tracing::info;

use ragdb_core::config::Settings;
use ragdb_core::traits::Generator;
use ragdb_core::Result;

pub mod device;
pub mod model;
pub mod tokenize;

pub use model::ModelGenerator;

pub fn build_prompt(question: &str, context: &str) -> String {
    format!(
        "Answer the question using only the provided context.\nContext:\n{context}\n\n{}",
        question_tail(question)
    )
}

pub(crate) fn question_tail(question: &str) -> String {
    format!("Question: {question}")
}

/// Returns the trimmed context prefixed with `"Answer: "`; never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeterministicGenerator;

impl Generator for DeterministicGenerator {
    fn name(&self) -> &str {
        "deterministic"
    }

    fn generate(&self, _question: &str, context: &str) -> Result<String> {
        Ok(format!("Answer: {}", context.trim()))
    }
}

/// The model generator when `generation.model_dir` is set, otherwise the
/// deterministic one. Relative model paths resolve against `base`.
pub fn generator_from_settings(settings: &Settings, base: &Path) -> Result<Box<dyn Generator>> {
    match settings.model_dir(base) {
        Some(dir) => Ok(Box::new(ModelGenerator::load(&dir, settings.generation.max_new_tokens)?)),
        None => {
            info!("no model configured; using deterministic generator");
            Ok(Box::new(DeterministicGenerator))
        }
    }
}
