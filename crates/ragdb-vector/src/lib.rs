//! Sparse-vector ranking and durable per-tenant index storage.

pub mod index;
pub mod schema;
pub mod search;
pub mod store;

pub use index::TenantIndex;
pub use search::{rank, RankedChunk};
pub use store::{FsIndexStore, IndexStore, MemoryIndexStore};
