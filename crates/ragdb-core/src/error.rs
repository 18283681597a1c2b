use std::path::PathBuf;
use thiserror::Error;

/// Failures of the durable index backend.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt index artifact {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("Failed to encode index: {0}")]
    Encode(#[from] serde_json::Error),
}

impl StorageError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    pub fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Corrupt { path: path.into(), reason: reason.into() }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("No index found for tenant {tenant}")]
    IndexNotFound { tenant: String },

    #[error("Malformed document at position {index}: {reason}")]
    MalformedDocument { index: usize, reason: String },

    #[error("Malformed document batch: {0}")]
    MalformedBatch(String),

    #[error("Invalid tenant id: {0:?}")]
    InvalidTenant(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to read document {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Generation failed: {0}")]
    Generation(String),
}

impl Error {
    pub fn not_found(tenant: impl Into<String>) -> Self {
        Self::IndexNotFound { tenant: tenant.into() }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::IndexNotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
