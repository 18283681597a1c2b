//! Cosine ranking of a query vector against a tenant's chunk vectors.

use std::cmp::Ordering;

use ragdb_core::types::SparseVector;

/// Position of a chunk in the index together with its similarity score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedChunk {
	pub chunk_index: usize,
	pub score: f32,
}

fn by_rank(a: &RankedChunk, b: &RankedChunk) -> Ordering {
	b.score.total_cmp(&a.score).then_with(|| a.chunk_index.cmp(&b.chunk_index))
}

/// Score every chunk and return the best `k`, highest score first.
///
/// Vectors are L2-normalized, so the dot product is the cosine similarity.
/// Equal scores keep ascending chunk order. `k == 0` yields nothing and a `k`
/// past the chunk count returns every chunk.
pub fn rank(query: &SparseVector, chunk_vectors: &[SparseVector], k: usize) -> Vec<RankedChunk> {
	if k == 0 || chunk_vectors.is_empty() {
		return Vec::new();
	}
	let mut scored: Vec<RankedChunk> = chunk_vectors
		.iter()
		.enumerate()
		.map(|(chunk_index, vector)| RankedChunk { chunk_index, score: query.dot(vector) })
		.collect();
	if k < scored.len() {
		scored.select_nth_unstable_by(k - 1, by_rank);
		scored.truncate(k);
	}
	scored.sort_by(by_rank);
	scored
}

#[cfg(test)]
mod tests {
	use super::*;

	fn unit(pairs: &[(u32, f32)]) -> SparseVector {
		let mut v = SparseVector::from_pairs(pairs.to_vec());
		v.l2_normalize();
		v
	}

	#[test]
	fn ties_keep_ascending_chunk_order() {
		let chunks = vec![unit(&[(1, 1.0)]), unit(&[(0, 1.0)]), unit(&[(0, 1.0)]), unit(&[(0, 1.0)])];
		let query = unit(&[(0, 1.0)]);
		let ranked = rank(&query, &chunks, 2);
		let order: Vec<usize> = ranked.iter().map(|r| r.chunk_index).collect();
		assert_eq!(order, vec![1, 2]);
	}

	#[test]
	fn zero_query_scores_everything_zero() {
		let chunks = vec![unit(&[(0, 1.0)]), unit(&[(1, 2.0)])];
		let ranked = rank(&SparseVector::default(), &chunks, 10);
		assert_eq!(ranked.len(), 2);
		assert!(ranked.iter().all(|r| r.score == 0.0));
		assert_eq!(ranked[0].chunk_index, 0);
	}

	#[test]
	fn k_bounds() {
		let chunks = vec![unit(&[(0, 1.0)]), unit(&[(1, 1.0)])];
		let query = unit(&[(1, 1.0)]);
		assert!(rank(&query, &chunks, 0).is_empty());
		assert_eq!(rank(&query, &chunks, 1000).len(), 2);
		assert_eq!(rank(&query, &chunks, 1000)[0].chunk_index, 1);
		assert!(rank(&query, &[], 3).is_empty());
	}
}
