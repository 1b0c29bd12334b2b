//! Protocol parameters. These are fixed for a given protocol version, and are
//! supplied by the caller rather than selected here.

use serde::{Deserialize, Serialize};

use crate::{
	jwk,
	jws,
	multihash::{HashAlgorithm, MultihashAlgorithm},
};

/// The name of the only compression algorithm that is built in.
pub const GZIP: &str = "GZIP";

/// Every standard patch action.
pub const STANDARD_PATCHES: [&str; 6] = [
	"add-public-keys",
	"remove-public-keys",
	"add-services",
	"remove-services",
	"replace",
	"ietf-json-patch",
];

/// The immutable parameter set that every component is configured with.
///
/// Deserializes from camelCase JSON. Missing fields take the values from
/// [`Protocol::default`].
#[derive(Debug, Eq, PartialEq, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Protocol {
	/// The ledger time from which this parameter set applies. Defaults to `0`.
	pub genesis_time: u64,
	/// Used for delta hashes, unique suffixes and the outer layer of commitments.
	/// Defaults to sha2-256.
	pub multihash_algorithm: MultihashAlgorithm,
	/// Applied to the canonical public key before it is multihashed into a
	/// commitment. Defaults to SHA256.
	pub hash_algorithm: HashAlgorithm,
	/// Maximum number of operations in a single batch. Defaults to 10 000.
	pub max_operation_count: usize,
	/// Maximum size in bytes of a single raw operation. Defaults to 2 048.
	pub max_operation_size: usize,
	/// Compression applied to every batch file. Defaults to `GZIP`.
	pub compression_algorithm: String,
	/// Maximum compressed chunk file size in bytes. Defaults to 10 MB.
	pub max_chunk_file_size: usize,
	/// Maximum compressed map file size in bytes. Defaults to 1 MB.
	pub max_map_file_size: usize,
	/// Maximum compressed anchor file size in bytes. Defaults to 1 MB.
	pub max_anchor_file_size: usize,
	/// Allowed JWS `alg` values. Defaults to `["EdDSA"]`.
	pub signature_algorithms: Vec<String>,
	/// Allowed key algorithms of revealed keys. Defaults to `["Ed25519"]`.
	pub key_algorithms: Vec<String>,
	/// Allowed patch actions. Defaults to [`STANDARD_PATCHES`].
	pub patches: Vec<String>,
}

impl Protocol {
	pub fn allows_signature_algorithm(&self, alg: &str) -> bool {
		self.signature_algorithms.iter().any(|a| a == alg)
	}

	pub fn allows_key_algorithm(&self, alg: &str) -> bool {
		self.key_algorithms.iter().any(|a| a == alg)
	}

	pub fn allows_patch(&self, action: &str) -> bool {
		self.patches.iter().any(|p| p == action)
	}
}

impl Default for Protocol {
	fn default() -> Self {
		Self {
			genesis_time: 0,
			multihash_algorithm: MultihashAlgorithm::Sha2_256,
			hash_algorithm: HashAlgorithm::Sha256,
			max_operation_count: 10_000,
			max_operation_size: 2_048,
			compression_algorithm: GZIP.to_owned(),
			max_chunk_file_size: 10_000_000,
			max_map_file_size: 1_000_000,
			max_anchor_file_size: 1_000_000,
			signature_algorithms: vec![jws::EDDSA.to_owned()],
			key_algorithms: vec![jwk::ED25519.to_owned()],
			patches: STANDARD_PATCHES.iter().map(|p| (*p).to_owned()).collect(),
		}
	}
}
