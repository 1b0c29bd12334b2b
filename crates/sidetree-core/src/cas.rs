//! Content addressable storage.

use std::{
	collections::HashMap,
	sync::{Arc, RwLock},
};

use crate::multihash::{self, MultihashAlgorithm};

/// Stores blobs under an address derived from their content.
pub trait CasClient: std::fmt::Debug + Send + Sync {
	/// Stores `content`, returning its address. Writing the same content twice
	/// returns the same address.
	fn write(&self, content: &[u8]) -> Result<String, CasError>;
	fn read(&self, address: &str) -> Result<Vec<u8>, CasError>;
}

/// The address [`MemoryCas`] stores `content` under: the base64url encoded
/// sha2-256 multihash of it.
pub fn content_address(content: &[u8]) -> String {
	multihash::compute_encoded(MultihashAlgorithm::Sha2_256, content)
}

/// An in memory [`CasClient`].
#[derive(Debug, Default, Clone)]
pub struct MemoryCas {
	blobs: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryCas {
	pub fn new() -> Self {
		Self::default()
	}

	/// The number of distinct blobs stored.
	pub fn len(&self) -> usize {
		self.blobs.read().map(|b| b.len()).unwrap_or_default()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

impl CasClient for MemoryCas {
	fn write(&self, content: &[u8]) -> Result<String, CasError> {
		let address = content_address(content);
		self.blobs
			.write()
			.map_err(|_| CasError::Poisoned)?
			.insert(address.clone(), content.to_vec());
		Ok(address)
	}

	fn read(&self, address: &str) -> Result<Vec<u8>, CasError> {
		self.blobs
			.read()
			.map_err(|_| CasError::Poisoned)?
			.get(address)
			.cloned()
			.ok_or_else(|| CasError::NotFound(address.to_owned()))
	}
}

#[derive(thiserror::Error, Debug)]
pub enum CasError {
	#[error("content not found for address {0}")]
	NotFound(String),
	#[error("cas lock was poisoned")]
	Poisoned,
	#[error(transparent)]
	Io(#[from] std::io::Error),
	#[error("cas error: {0}")]
	Other(String),
}
