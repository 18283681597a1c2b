//! TF-IDF vocabulary fitting and vectorization.
//!
//! Weights are `tf(t, d) * idf(t)` with raw counts for `tf` and the smoothed
//! `idf(t) = ln((1 + n) / (1 + df(t))) + 1`. Every vector is L2-normalized, so
//! cosine similarity reduces to a dot product.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use ragdb_core::types::SparseVector;

use crate::tantivy_utils::TermTokenizer;

/// Term dictionary with one IDF weight per column.
///
/// Columns are the dense range `0..len()`, assigned in lexicographic term order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "VocabularyParts", into = "VocabularyParts")]
pub struct Vocabulary {
    terms: Vec<String>,
    idf: Vec<f32>,
    columns: HashMap<String, u32>,
}

#[derive(Serialize, Deserialize)]
struct VocabularyParts {
    terms: Vec<String>,
    idf: Vec<f32>,
}

impl TryFrom<VocabularyParts> for Vocabulary {
    type Error = String;

    fn try_from(parts: VocabularyParts) -> Result<Self, String> {
        Vocabulary::from_parts(parts.terms, parts.idf)
    }
}

impl From<Vocabulary> for VocabularyParts {
    fn from(vocab: Vocabulary) -> Self {
        Self { terms: vocab.terms, idf: vocab.idf }
    }
}

impl Vocabulary {
    /// Rebuild from stored columns, rejecting duplicate terms, mismatched
    /// lengths and non-finite or negative weights.
    pub fn from_parts(terms: Vec<String>, idf: Vec<f32>) -> Result<Self, String> {
        if terms.len() != idf.len() {
            return Err(format!("{} terms but {} idf weights", terms.len(), idf.len()));
        }
        if terms.len() > u32::MAX as usize {
            return Err("vocabulary exceeds u32 columns".to_string());
        }
        if let Some(bad) = idf.iter().find(|w| !w.is_finite() || **w < 0.0) {
            return Err(format!("invalid idf weight {bad}"));
        }
        let mut columns = HashMap::with_capacity(terms.len());
        for (column, term) in terms.iter().enumerate() {
            if columns.insert(term.clone(), column as u32).is_some() {
                return Err(format!("duplicate term {term:?}"));
            }
        }
        Ok(Self { terms, idf, columns })
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn column(&self, term: &str) -> Option<u32> {
        self.columns.get(term).copied()
    }

    pub fn idf(&self, column: u32) -> Option<f32> {
        self.idf.get(column as usize).copied()
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }
}

/// Fits a [`Vocabulary`] over a corpus and turns text into TF-IDF vectors.
#[derive(Debug, Clone, Default)]
pub struct TfidfVectorizer {
    tokenizer: TermTokenizer,
}

impl TfidfVectorizer {
    /// Build the vocabulary from `corpus` and vectorize every entry, in order.
    ///
    /// An empty corpus yields an empty vocabulary and no vectors.
    pub fn fit<S: AsRef<str>>(&self, corpus: &[S]) -> (Vocabulary, Vec<SparseVector>) {
        let tokenized: Vec<Vec<String>> =
            corpus.iter().map(|text| self.tokenizer.tokenize(text.as_ref())).collect();

        let mut document_frequency: BTreeMap<&str, u32> = BTreeMap::new();
        for tokens in &tokenized {
            let mut distinct: Vec<&str> = tokens.iter().map(String::as_str).collect();
            distinct.sort_unstable();
            distinct.dedup();
            for term in distinct {
                *document_frequency.entry(term).or_insert(0) += 1;
            }
        }

        let n = corpus.len() as f64;
        let (terms, idf): (Vec<String>, Vec<f32>) = document_frequency
            .iter()
            .map(|(term, &df)| ((*term).to_string(), smoothed_idf(n, f64::from(df))))
            .unzip();
        let mut columns = HashMap::with_capacity(terms.len());
        for (column, term) in terms.iter().enumerate() {
            columns.insert(term.clone(), column as u32);
        }
        let vocabulary = Vocabulary { terms, idf, columns };

        let vectors = tokenized
            .iter()
            .map(|tokens| weigh(&vocabulary, tokens.iter().map(String::as_str)))
            .collect();
        debug!(documents = corpus.len(), terms = vocabulary.len(), "fitted tf-idf vocabulary");
        (vocabulary, vectors)
    }

    /// Vectorize `text` against an existing vocabulary. Out-of-vocabulary
    /// terms are dropped; the vocabulary never grows.
    pub fn transform(&self, vocabulary: &Vocabulary, text: &str) -> SparseVector {
        let tokens = self.tokenizer.tokenize(text);
        weigh(vocabulary, tokens.iter().map(String::as_str))
    }
}

fn smoothed_idf(n: f64, df: f64) -> f32 {
    (((1.0 + n) / (1.0 + df)).ln() + 1.0) as f32
}

fn weigh<'a>(vocabulary: &Vocabulary, tokens: impl Iterator<Item = &'a str>) -> SparseVector {
    let mut counts: HashMap<u32, u32> = HashMap::new();
    for column in tokens.filter_map(|t| vocabulary.column(t)) {
        *counts.entry(column).or_insert(0) += 1;
    }
    let pairs = counts
        .into_iter()
        .map(|(column, tf)| (column, tf as f32 * vocabulary.idf[column as usize]))
        .collect();
    let mut vector = SparseVector::from_pairs(pairs);
    vector.l2_normalize();
    vector
}
