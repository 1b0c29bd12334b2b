//! Canonical JSON, per the [JSON Canonicalization Scheme][jcs] (RFC 8785).
//!
//! Independent nodes must derive byte identical files and hashes from the same
//! logical content, so everything that is hashed, signed or written to CAS goes
//! through here first.
//!
//! [jcs]: https://www.rfc-editor.org/rfc/rfc8785

use serde::Serialize;

use crate::multihash::{self, MultihashAlgorithm, MultihashError};

/// Serializes `value` into its canonical JSON bytes.
pub fn to_canonical_vec<T: Serialize>(
	value: &T,
) -> Result<Vec<u8>, serde_json::Error> {
	serde_jcs::to_vec(value)
}

/// Hashes the canonical encoding of `value`, returning the base64url multihash.
pub fn hash_model<T: Serialize>(
	value: &T,
	alg: MultihashAlgorithm,
) -> Result<String, CanonicalError> {
	let bytes = to_canonical_vec(value)?;
	Ok(multihash::compute_encoded(alg, &bytes))
}

/// Checks that `expected` is the multihash of the canonical encoding of `value`.
///
/// The algorithm is taken from the prefix of `expected`, and must be one that is
/// `allowed`.
pub fn verify_model_hash<T: Serialize>(
	value: &T,
	expected: &str,
	allowed: MultihashAlgorithm,
) -> Result<(), CanonicalError> {
	let decoded = multihash::decode_encoded(expected)?;
	if decoded.algorithm != allowed {
		return Err(CanonicalError::AlgorithmNotAllowed(decoded.algorithm));
	}
	let actual = hash_model(value, decoded.algorithm)?;
	if actual != expected {
		return Err(CanonicalError::HashMismatch);
	}
	Ok(())
}

#[derive(thiserror::Error, Debug)]
pub enum CanonicalError {
	#[error("failed to canonicalize json")]
	Json(#[from] serde_json::Error),
	#[error(transparent)]
	Multihash(#[from] MultihashError),
	#[error("multihash algorithm {0} is not allowed by the protocol")]
	AlgorithmNotAllowed(MultihashAlgorithm),
	#[error("supplied hash doesn't match original content")]
	HashMismatch,
}
