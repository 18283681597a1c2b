//! Domain types shared by the text, vector and engine crates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::error::{Error, Result};

pub type ChunkId = String;

/// Client identifier scoping an independent index.
///
/// Tenant ids address storage locations, so only ASCII alphanumerics and
/// `-`, `_`, `.` are accepted (`.` and `..` on their own are rejected).
/// Ids are folded to lowercase: `Tenant1` and `tenant1` are the same tenant
/// on every filesystem.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TenantId(String);

impl TenantId {
    pub const MAX_LEN: usize = 128;

    pub fn new(raw: impl Into<String>) -> Result<Self> {
        let mut raw = raw.into();
        let allowed = raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if raw.is_empty() || raw.len() > Self::MAX_LEN || !allowed || raw == "." || raw == ".." {
            return Err(Error::InvalidTenant(raw));
        }
        raw.make_ascii_lowercase();
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TenantId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<TenantId> for String {
    fn from(value: TenantId) -> Self {
        value.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A validated source document handed over by the ingestion layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub text: String,
}

impl Document {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self { id: id.into(), text: text.into() }
    }
}

/// Document shape as it arrives on the wire, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawDocument {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

impl RawDocument {
    pub fn validate(self, index: usize) -> Result<Document> {
        let id = self.id.ok_or_else(|| Error::MalformedDocument {
            index,
            reason: "missing field `id`".to_string(),
        })?;
        if id.trim().is_empty() {
            return Err(Error::MalformedDocument { index, reason: "blank `id`".to_string() });
        }
        let text = self.text.ok_or_else(|| Error::MalformedDocument {
            index,
            reason: format!("document {id:?} is missing field `text`"),
        })?;
        Ok(Document { id, text })
    }
}

/// Validate a whole ingest batch. The first malformed entry fails the batch.
pub fn validate_batch(raw: Vec<RawDocument>) -> Result<Vec<Document>> {
    raw.into_iter().enumerate().map(|(i, doc)| doc.validate(i)).collect()
}

/// Parse and validate a JSON array of `{id, text}` objects.
pub fn parse_batch(json: &str) -> Result<Vec<Document>> {
    let raw: Vec<RawDocument> = serde_json::from_str(json)
        .map_err(|e| Error::MalformedBatch(format!("expected a JSON array of {{id, text}} objects: {e}")))?;
    validate_batch(raw)
}

/// A bounded window of a document, the unit of retrieval.
///
/// `id` is `"{document_id}_{sequence_index}"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub document_id: String,
    pub text: String,
}

/// Sparse term-weight vector with strictly increasing column indices.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
    pub indices: Vec<u32>,
    pub values: Vec<f32>,
}

impl SparseVector {
    /// Build from `(column, weight)` pairs; pairs are sorted and zero weights dropped.
    pub fn from_pairs(mut pairs: Vec<(u32, f32)>) -> Self {
        pairs.sort_by_key(|&(column, _)| column);
        pairs.dedup_by(|next, kept| {
            if next.0 == kept.0 {
                kept.1 += next.1;
                true
            } else {
                false
            }
        });
        let (indices, values): (Vec<u32>, Vec<f32>) = pairs.into_iter().filter(|&(_, w)| w != 0.0).unzip();
        Self { indices, values }
    }

    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    pub fn is_zero(&self) -> bool {
        self.values.iter().all(|&v| v == 0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, f32)> + '_ {
        self.indices.iter().copied().zip(self.values.iter().copied())
    }

    pub fn norm(&self) -> f32 {
        self.values.iter().map(|v| v * v).sum::<f32>().sqrt()
    }

    /// Scale to unit Euclidean length. A zero vector stays zero.
    pub fn l2_normalize(&mut self) {
        let norm = self.norm();
        if norm > 0.0 {
            for v in &mut self.values {
                *v /= norm;
            }
        }
    }

    /// Dot product over the intersection of the two index lists.
    pub fn dot(&self, other: &SparseVector) -> f32 {
        let (mut i, mut j) = (0, 0);
        let mut sum = 0.0;
        while i < self.indices.len() && j < other.indices.len() {
            match self.indices[i].cmp(&other.indices[j]) {
                Ordering::Less => i += 1,
                Ordering::Greater => j += 1,
                Ordering::Equal => {
                    sum += self.values[i] * other.values[j];
                    i += 1;
                    j += 1;
                }
            }
        }
        sum
    }

    /// True when indices are strictly increasing and below `dim`, and every
    /// weight is finite and non-negative.
    pub fn is_well_formed(&self, dim: usize) -> bool {
        self.indices.len() == self.values.len()
            && self.indices.windows(2).all(|w| w[0] < w[1])
            && self.indices.last().map_or(true, |&last| (last as usize) < dim)
            && self.values.iter().all(|v| v.is_finite() && *v >= 0.0)
    }
}

/// A ranked retrieval result. Higher `score` is better.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snippet {
    pub id: ChunkId,
    pub text: String,
    pub score: f32,
}

/// Summary of a tenant's current index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexHandle {
    pub tenant_id: TenantId,
    pub documents: usize,
    pub chunks: usize,
    pub vocabulary_size: usize,
    pub built_at: DateTime<Utc>,
}

/// Generated answer plus the snippets it was grounded on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub answer: String,
    pub citations: Vec<Snippet>,
}
