//! On-disk artifact format for a tenant index.
//!
//! One header line `ragdb-index v<version> <blake3-hex>` followed by the JSON
//! body of a [`TenantIndex`]. The checksum covers the body bytes only.

use std::path::Path;

use ragdb_core::StorageError;

use crate::index::TenantIndex;

pub const FORMAT_MAGIC: &str = "ragdb-index";
pub const FORMAT_VERSION: u32 = 1;

pub fn encode(index: &TenantIndex) -> Result<Vec<u8>, StorageError> {
	let body = serde_json::to_vec(index)?;
	let header = format!("{} v{} {}\n", FORMAT_MAGIC, FORMAT_VERSION, blake3::hash(&body).to_hex());
	let mut bytes = Vec::with_capacity(header.len() + body.len());
	bytes.extend_from_slice(header.as_bytes());
	bytes.extend_from_slice(&body);
	Ok(bytes)
}

/// Parse and verify an artifact. `path` is only used for error reporting.
pub fn decode(bytes: &[u8], path: &Path) -> Result<TenantIndex, StorageError> {
	let corrupt = |reason: String| StorageError::corrupt(path, reason);

	let newline = bytes
		.iter()
		.position(|&b| b == b'\n')
		.ok_or_else(|| corrupt("missing header line".to_string()))?;
	let header = std::str::from_utf8(&bytes[..newline]).map_err(|_| corrupt("header is not UTF-8".to_string()))?;
	let body = &bytes[newline + 1..];

	let mut fields = header.split_whitespace();
	let (magic, version, checksum) = match (fields.next(), fields.next(), fields.next(), fields.next()) {
		(Some(m), Some(v), Some(c), None) => (m, v, c),
		_ => return Err(corrupt(format!("unrecognised header {header:?}"))),
	};
	if magic != FORMAT_MAGIC {
		return Err(corrupt(format!("unexpected magic {magic:?}")));
	}
	if version != format!("v{FORMAT_VERSION}") {
		return Err(corrupt(format!("unsupported format version {version}")));
	}
	let actual = blake3::hash(body).to_hex();
	if actual.as_str() != checksum {
		return Err(corrupt(format!("checksum mismatch (header {checksum}, body {actual})")));
	}

	let index: TenantIndex = serde_json::from_slice(body).map_err(|e| corrupt(format!("invalid body: {e}")))?;
	index.validate().map_err(corrupt)?;
	Ok(index)
}
