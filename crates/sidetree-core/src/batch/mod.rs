//! Writing batches of queued operations to CAS.
//!
//! A batch is written as up to three files, each canonically serialized,
//! compressed and content addressed:
//!
//! ```text
//! anchor file ──mapFileUri──▶ map file ──chunkFileUri──▶ chunk file
//! ```
//!
//! Every file embeds the address of the one it depends on, so they are
//! written leaf first. The anchor string that is returned points at the
//! anchor file.

mod anchor;
pub mod models;

use std::{collections::HashSet, fmt, sync::Arc};

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

pub use self::anchor::{AnchorData, AnchorDataError};
use self::models::{AnchorFile, ChunkFile, MapFile};
use crate::{
	canonical,
	cas::{CasClient, CasError},
	compression::{CompressionError, Compressor},
	operation::{Operation, OperationError, OperationParser, OperationType, QueuedOperation},
	protocol::Protocol,
};

/// The files a batch can consist of.
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
pub enum FileKind {
	Chunk,
	Map,
	Anchor,
}

impl fmt::Display for FileKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Self::Chunk => "chunk",
			Self::Map => "map",
			Self::Anchor => "anchor",
		})
	}
}

/// Creates batch files from queued operations.
#[derive(Debug, Clone)]
pub struct OperationHandler {
	protocol: Protocol,
	parser: OperationParser,
	cas: Arc<dyn CasClient>,
	compressor: Arc<dyn Compressor>,
}

impl OperationHandler {
	pub fn new(
		protocol: Protocol,
		cas: Arc<dyn CasClient>,
		compressor: Arc<dyn Compressor>,
	) -> Self {
		let parser = OperationParser::new(protocol.clone());
		Self {
			protocol,
			parser,
			cas,
			compressor,
		}
	}

	/// Writes `ops` to CAS as a batch, returning the anchor string.
	///
	/// Only the first operation for any given DID is kept. Any failure aborts
	/// the whole batch, and nothing references files written before it.
	#[instrument(skip_all, name = "prepare batch", fields(queued = ops.len()))]
	pub fn prepare_batch(&self, ops: &[QueuedOperation]) -> Result<String, BatchError> {
		let parsed = self.parse_operations(ops)?;

		// A batch of only deactivates has no deltas to store.
		let all_deactivates = parsed
			.iter()
			.all(|op| op.operation_type() == OperationType::Deactivate);
		let map_file_uri = if all_deactivates {
			None
		} else {
			let chunk_file_uri =
				self.write_file(&ChunkFile::new(&parsed), FileKind::Chunk)?;
			let map = MapFile::new([chunk_file_uri], &parsed);
			Some(self.write_file(&map, FileKind::Map)?)
		};

		let anchor_file = AnchorFile::new(map_file_uri, &parsed);
		let anchor_address = self.write_file(&anchor_file, FileKind::Anchor)?;

		let anchor = AnchorData {
			number_of_operations: parsed.len(),
			anchor_address,
		};
		info!(%anchor, "prepared batch");
		Ok(anchor.to_string())
	}

	fn parse_operations(&self, ops: &[QueuedOperation]) -> Result<Vec<Operation>, BatchError> {
		if ops.is_empty() {
			return Err(BatchError::EmptyBatch);
		}
		let mut suffixes = HashSet::new();
		let mut parsed = Vec::with_capacity(ops.len());
		for queued in ops {
			let op = self.parser.parse(&queued.namespace, &queued.operation_buffer)?;
			if !suffixes.insert(op.unique_suffix.clone()) {
				warn!(
					namespace = %queued.namespace,
					suffix = %op.unique_suffix,
					ty = %op.operation_type(),
					"duplicate suffix found in batch operations, discarding operation"
				);
				continue;
			}
			parsed.push(op);
		}
		if parsed.len() > self.protocol.max_operation_count {
			return Err(BatchError::TooManyOperations {
				count: parsed.len(),
				max: self.protocol.max_operation_count,
			});
		}
		Ok(parsed)
	}

	fn write_file<T: Serialize>(&self, model: &T, file: FileKind) -> Result<String, BatchError> {
		let bytes = canonical::to_canonical_vec(model)
			.map_err(|source| BatchError::Serialization { file, source })?;
		debug!(%file, content = %String::from_utf8_lossy(&bytes), "serialized file");

		let compressed = self
			.compressor
			.compress(&self.protocol.compression_algorithm, &bytes)?;
		let max = self.max_file_size(file);
		if compressed.len() > max {
			return Err(BatchError::FileTooLarge {
				file,
				size: compressed.len(),
				max,
			});
		}

		self.cas
			.write(&compressed)
			.map_err(|source| BatchError::CasWrite { file, source })
	}

	fn max_file_size(&self, file: FileKind) -> usize {
		match file {
			FileKind::Chunk => self.protocol.max_chunk_file_size,
			FileKind::Map => self.protocol.max_map_file_size,
			FileKind::Anchor => self.protocol.max_anchor_file_size,
		}
	}
}

#[derive(thiserror::Error, Debug)]
pub enum BatchError {
	#[error("prepare batch called without operations")]
	EmptyBatch,
	#[error("batch holds {count} operations, but at most {max} are allowed")]
	TooManyOperations { count: usize, max: usize },
	#[error(transparent)]
	Operation(#[from] OperationError),
	#[error("failed to marshal {file} file")]
	Serialization {
		file: FileKind,
		#[source]
		source: serde_json::Error,
	},
	#[error(transparent)]
	Compression(#[from] CompressionError),
	#[error("compressed {file} file is {size} bytes, but at most {max} are allowed")]
	FileTooLarge { file: FileKind, size: usize, max: usize },
	#[error("failed to store {file} file")]
	CasWrite {
		file: FileKind,
		#[source]
		source: CasError,
	},
}
