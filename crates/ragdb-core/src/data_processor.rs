use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::types::{Chunk, Document};

/// Window size and overlap for [`chunk_text`], both counted in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub size: usize,
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { size: 500, overlap: 50 }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.size == 0 {
            return Err(Error::InvalidConfig("chunking.size must be positive".into()));
        }
        Ok(())
    }

    /// Distance between successive window starts; never below 1.
    pub fn step(&self) -> usize {
        self.size.saturating_sub(self.overlap).max(1)
    }
}

/// Split `text` into windows of at most `size` characters whose starts are
/// `size - overlap` characters apart (at least 1, so `overlap >= size` still
/// terminates). Empty input yields no chunks.
pub fn chunk_text(text: &str, size: usize, overlap: usize) -> Vec<&str> {
    let config = ChunkingConfig { size: size.max(1), overlap };
    let step = config.step();
    // byte offset of every char start, plus the end of the string
    let bounds: Vec<usize> = text
        .char_indices()
        .map(|(offset, _)| offset)
        .chain(std::iter::once(text.len()))
        .collect();
    let char_len = bounds.len() - 1;

    let mut chunks = Vec::with_capacity(char_len.div_ceil(step));
    let mut start = 0;
    while start < char_len {
        let end = start.saturating_add(config.size).min(char_len);
        chunks.push(&text[bounds[start]..bounds[end]]);
        start += step;
    }
    chunks
}

/// Only plain text and markdown files are ingested.
pub fn is_text_file(path: &Path) -> bool {
    matches!(path.extension().and_then(|s| s.to_str()), Some("txt" | "md"))
}

/// Turns documents into chunks, and files on disk into documents.
#[derive(Debug, Clone, Default)]
pub struct DataProcessor {
    chunking_config: ChunkingConfig,
}

impl DataProcessor {
    pub fn new(chunking_config: ChunkingConfig) -> Self {
        Self { chunking_config }
    }

    /// Chunk every document in order. Chunk ids are `"{doc_id}_{i}"`.
    pub fn chunk_documents(&self, documents: &[Document]) -> Vec<Chunk> {
        let ChunkingConfig { size, overlap } = self.chunking_config;
        let mut seen = HashSet::new();
        let mut all_chunks = Vec::new();
        for doc in documents {
            if !seen.insert(doc.id.as_str()) {
                warn!(doc_id = %doc.id, "duplicate document id; chunk ids will collide");
            }
            let before = all_chunks.len();
            all_chunks.extend(chunk_text(&doc.text, size, overlap).into_iter().enumerate().map(
                |(i, text)| Chunk {
                    id: format!("{}_{}", doc.id, i),
                    document_id: doc.id.clone(),
                    text: text.to_string(),
                },
            ));
            debug!(doc_id = %doc.id, chunks = all_chunks.len() - before, "chunked document");
        }
        all_chunks
    }

    /// Expand `paths` into a sorted file list. Directories are walked for
    /// `.txt` and `.md` files; explicit file paths are kept as given.
    pub fn collect_files(&self, paths: &[PathBuf]) -> Vec<PathBuf> {
        let mut files = Vec::new();
        for path in paths {
            if path.is_dir() {
                files.extend(self.list_text_files(path));
            } else {
                files.push(path.clone());
            }
        }
        files
    }

    /// Read one file as a document with `id = file stem`. Files other than
    /// `.txt` and `.md` (PDFs included) are rejected.
    pub fn read_document(&self, file_path: &Path) -> Result<Document> {
        if !is_text_file(file_path) {
            return Err(Error::MalformedDocument {
                index: 0,
                reason: format!("{}: unsupported file type, expected .txt or .md", file_path.display()),
            });
        }
        let id = file_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .filter(|stem| !stem.trim().is_empty())
            .ok_or_else(|| Error::MalformedDocument {
                index: 0,
                reason: format!("{} has no usable file name", file_path.display()),
            })?;
        let text = self.read_file_content(file_path)?;
        Ok(Document { id, text })
    }

    pub fn load_documents(&self, paths: &[PathBuf]) -> Result<Vec<Document>> {
        let files = self.collect_files(paths);
        files
            .iter()
            .enumerate()
            .map(|(index, file)| {
                self.read_document(file).map_err(|err| match err {
                    Error::MalformedDocument { reason, .. } => Error::MalformedDocument { index, reason },
                    other => other,
                })
            })
            .collect()
    }

    fn read_file_content(&self, file_path: &Path) -> Result<String> {
        let read_err = |source: std::io::Error| Error::Read { path: file_path.to_path_buf(), source };
        match fs::read_to_string(file_path) {
            Ok(content) => Ok(content),
            Err(err) if err.kind() == std::io::ErrorKind::InvalidData => {
                Ok(String::from_utf8_lossy(&fs::read(file_path).map_err(read_err)?).to_string())
            }
            Err(err) => Err(read_err(err)),
        }
    }

    fn list_text_files(&self, root: &Path) -> Vec<PathBuf> {
        let mut text_files = Vec::new();
        for entry in walkdir::WalkDir::new(root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            if is_text_file(entry.path()) {
                text_files.push(entry.path().to_path_buf());
            }
        }
        text_files.sort();
        text_files
    }
}
