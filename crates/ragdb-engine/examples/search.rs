use std::env;
use std::path::PathBuf;

use ragdb_core::data_processor::{ChunkingConfig, DataProcessor};
use ragdb_core::types::TenantId;
use ragdb_engine::IndexManager;
use ragdb_vector::MemoryIndexStore;

// Index a directory of .txt/.md files in memory and print the best chunks.
// Usage:
//   cargo run -p ragdb-engine --example search -- <dir> "your query" [--limit 3]

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    if args.len() < 2 {
        eprintln!("Usage: cargo run -p ragdb-engine --example search -- <dir> <query> [--limit N]");
        std::process::exit(1);
    }
    let dir = PathBuf::from(&args[0]);
    let query = &args[1];
    let limit = match args.get(2).map(String::as_str) {
        Some("--limit") => args.get(3).and_then(|n| n.parse().ok()).unwrap_or(3),
        _ => 3,
    };

    let chunking = ChunkingConfig::default();
    let documents = DataProcessor::new(chunking).load_documents(&[dir])?;
    let manager = IndexManager::new(MemoryIndexStore::new(), chunking);
    let tenant = TenantId::new("example")?;
    let handle = manager.build_index(&tenant, documents)?;
    println!("{} documents, {} chunks, {} terms", handle.documents, handle.chunks, handle.vocabulary_size);

    for (rank, hit) in manager.search(&tenant, query, limit)?.iter().enumerate() {
        let preview: String = hit.text.chars().take(120).collect();
        println!("{:>2}. [{:.4}] {}  {}", rank + 1, hit.score, hit.id, preview.replace('\n', " "));
    }
    Ok(())
}
