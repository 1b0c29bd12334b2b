//! Compression of batch files.

use crate::protocol::GZIP;

/// Compresses and decompresses with named algorithms.
pub trait Compressor: std::fmt::Debug + Send + Sync {
	/// Output must be deterministic, because compressed files are content
	/// addressed.
	fn compress(&self, algorithm: &str, data: &[u8]) -> Result<Vec<u8>, CompressionError>;
	fn decompress(&self, algorithm: &str, data: &[u8]) -> Result<Vec<u8>, CompressionError>;
}

/// The built in [`Compressor`]. Supports `GZIP` when the `gzip` feature is
/// enabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct CompressionProvider;

impl CompressionProvider {
	pub fn new() -> Self {
		Self
	}

	pub fn supports(&self, algorithm: &str) -> bool {
		cfg!(feature = "gzip") && algorithm == GZIP
	}
}

impl Compressor for CompressionProvider {
	fn compress(&self, algorithm: &str, data: &[u8]) -> Result<Vec<u8>, CompressionError> {
		match algorithm {
			#[cfg(feature = "gzip")]
			GZIP => gzip::compress(data),
			other => Err(CompressionError::UnsupportedAlgorithm(other.to_owned())),
		}
	}

	fn decompress(&self, algorithm: &str, data: &[u8]) -> Result<Vec<u8>, CompressionError> {
		match algorithm {
			#[cfg(feature = "gzip")]
			GZIP => gzip::decompress(data),
			other => Err(CompressionError::UnsupportedAlgorithm(other.to_owned())),
		}
	}
}

#[cfg(feature = "gzip")]
mod gzip {
	use std::io::{Read as _, Write as _};

	use flate2::{read::GzDecoder, write::GzEncoder, Compression, GzBuilder};

	use super::CompressionError;

	/// The gzip header has no mtime or file name, so equal input always gives
	/// equal output.
	pub(super) fn compress(data: &[u8]) -> Result<Vec<u8>, CompressionError> {
		let mut encoder: GzEncoder<Vec<u8>> =
			GzBuilder::new().mtime(0).write(Vec::new(), Compression::default());
		encoder.write_all(data)?;
		Ok(encoder.finish()?)
	}

	pub(super) fn decompress(data: &[u8]) -> Result<Vec<u8>, CompressionError> {
		let mut out = Vec::new();
		GzDecoder::new(data).read_to_end(&mut out)?;
		Ok(out)
	}
}

#[derive(thiserror::Error, Debug)]
pub enum CompressionError {
	#[error("compression algorithm {0:?} not supported")]
	UnsupportedAlgorithm(String),
	#[error(transparent)]
	Io(#[from] std::io::Error),
}
