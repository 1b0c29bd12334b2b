//! The commitment / reveal scheme.
//!
//! A commitment is published one operation ahead of the key it commits to. The
//! key is only revealed when it is spent, and the operation that spends it must
//! publish the next commitment. A revealed key therefore satisfies exactly one
//! stored commitment, which is what stops signed operations from being replayed.

use jose_jwk::Jwk;

use crate::{
	canonical,
	multihash::{self, HashAlgorithm, MultihashAlgorithm},
};

/// Computes the commitment for `key`.
///
/// The canonical JWK is hashed with `hash_alg`, and that digest is then
/// multihashed with `multihash_alg` and base64url encoded.
pub fn calculate(
	key: &Jwk,
	multihash_alg: MultihashAlgorithm,
	hash_alg: HashAlgorithm,
) -> Result<String, CommitmentError> {
	let canonical_key = canonical::to_canonical_vec(key)?;
	let reveal_value = hash_alg.digest(&canonical_key);
	Ok(multihash::compute_encoded(multihash_alg, &reveal_value))
}

/// Checks that `revealed` is the key that `stored` committed to.
pub fn verify_reveal(
	revealed: &Jwk,
	stored: Option<&str>,
	multihash_alg: MultihashAlgorithm,
	hash_alg: HashAlgorithm,
) -> Result<(), CommitmentError> {
	let Some(stored) = stored else {
		return Err(CommitmentError::Mismatch);
	};
	let computed = calculate(revealed, multihash_alg, hash_alg)?;
	if computed.as_bytes() != stored.as_bytes() {
		return Err(CommitmentError::Mismatch);
	}
	Ok(())
}

#[derive(thiserror::Error, Debug)]
pub enum CommitmentError {
	#[error("failed to canonicalize the public key")]
	Canonicalize(#[from] serde_json::Error),
	#[error("commitment generated from public key doesn't match the stored commitment")]
	Mismatch,
}

#[cfg(test)]
mod test {
	use ed25519_dalek::SigningKey;

	use super::*;
	use crate::jwk::ed25519_pub_jwk;

	fn key(seed: u8) -> Jwk {
		ed25519_pub_jwk(&SigningKey::from_bytes(&[seed; 32]).verifying_key())
	}

	const SHA256: (MultihashAlgorithm, HashAlgorithm) =
		(MultihashAlgorithm::Sha2_256, HashAlgorithm::Sha256);

	#[test]
	fn test_deterministic() {
		let a = calculate(&key(1), SHA256.0, SHA256.1).unwrap();
		let b = calculate(&key(1), SHA256.0, SHA256.1).unwrap();
		assert_eq!(a, b);
		assert!(multihash::decode_encoded(&a).is_ok());
	}

	#[test]
	fn test_every_input_changes_the_output() {
		let base = calculate(&key(1), SHA256.0, SHA256.1).unwrap();
		let other_key = calculate(&key(2), SHA256.0, SHA256.1).unwrap();
		let other_mh =
			calculate(&key(1), MultihashAlgorithm::Sha2_512, SHA256.1).unwrap();
		let other_hash = calculate(&key(1), SHA256.0, HashAlgorithm::Sha512).unwrap();
		for other in [&other_key, &other_mh, &other_hash] {
			assert_ne!(&base, other);
		}
		assert_ne!(other_mh, other_hash);
	}

	#[test]
	fn test_is_a_double_hash() {
		let canonical_key = canonical::to_canonical_vec(&key(1)).unwrap();
		let single = multihash::compute_encoded(SHA256.0, &canonical_key);
		let commitment = calculate(&key(1), SHA256.0, SHA256.1).unwrap();
		assert_ne!(single, commitment, "the reveal value must be hashed again");
	}

	#[test]
	fn test_verify_reveal() {
		let commitment = calculate(&key(1), SHA256.0, SHA256.1).unwrap();
		verify_reveal(&key(1), Some(&commitment), SHA256.0, SHA256.1).unwrap();
		assert!(matches!(
			verify_reveal(&key(2), Some(&commitment), SHA256.0, SHA256.1),
			Err(CommitmentError::Mismatch)
		));
		assert!(matches!(
			verify_reveal(&key(1), None, SHA256.0, SHA256.1),
			Err(CommitmentError::Mismatch)
		));
		assert!(matches!(
			verify_reveal(&key(1), Some(""), SHA256.0, SHA256.1),
			Err(CommitmentError::Mismatch)
		));
	}
}
