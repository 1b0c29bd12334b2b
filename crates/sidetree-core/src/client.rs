//! Builders for operation requests.
//!
//! These produce the wire form that [`OperationParser::parse`] accepts, taking
//! care of delta hashes and signed data.
//!
//! [`OperationParser::parse`]: crate::operation::OperationParser::parse

use serde_json::Value;

use crate::{
	canonical::{self, CanonicalError},
	commitment::{self, CommitmentError},
	jws::{self, JwsError, Signer},
	operation::{
		DeactivateSignedDataModel, DeltaModel, OperationRequest, RecoverSignedDataModel,
		SuffixDataModel, UpdateSignedDataModel,
	},
	protocol::Protocol,
};

/// Builds a create request.
///
/// `recovery_commitment` and `update_commitment` commit to the keys that the
/// first recover and update operations will reveal, see
/// [`commitment::calculate`].
pub fn create_request(
	protocol: &Protocol,
	patches: Vec<Value>,
	recovery_commitment: &str,
	update_commitment: &str,
) -> Result<OperationRequest, ClientError> {
	let delta = delta(patches, update_commitment)?;
	let suffix_data = SuffixDataModel {
		delta_hash: canonical::hash_model(&delta, protocol.multihash_algorithm)?,
		recovery_commitment: recovery_commitment.to_owned(),
	};
	Ok(OperationRequest::Create { suffix_data, delta })
}

/// The unique suffix of the DID that a create request creates.
pub fn unique_suffix(
	protocol: &Protocol,
	request: &OperationRequest,
) -> Result<String, ClientError> {
	match request {
		OperationRequest::Create { suffix_data, .. } => {
			Ok(canonical::hash_model(suffix_data, protocol.multihash_algorithm)?)
		}
		_ => Err(ClientError::NotCreate),
	}
}

/// Builds an update request, signed by the key that the current update
/// commitment commits to.
pub fn update_request(
	protocol: &Protocol,
	did_suffix: &str,
	patches: Vec<Value>,
	signer: &dyn Signer,
	next_update_commitment: &str,
) -> Result<OperationRequest, ClientError> {
	let update_key = signer.public_jwk();
	check_not_reused(protocol, signer, next_update_commitment)?;
	let delta = delta(patches, next_update_commitment)?;
	let signed = UpdateSignedDataModel {
		update_key,
		delta_hash: canonical::hash_model(&delta, protocol.multihash_algorithm)?,
	};
	Ok(OperationRequest::Update {
		did_suffix: did_suffix.to_owned(),
		signed_data: jws::sign_model(&signed, signer)?,
		delta,
	})
}

/// Builds a recover request, signed by the key that the current recovery
/// commitment commits to.
pub fn recover_request(
	protocol: &Protocol,
	did_suffix: &str,
	patches: Vec<Value>,
	signer: &dyn Signer,
	next_recovery_commitment: &str,
	next_update_commitment: &str,
) -> Result<OperationRequest, ClientError> {
	check_not_reused(protocol, signer, next_recovery_commitment)?;
	let delta = delta(patches, next_update_commitment)?;
	let signed = RecoverSignedDataModel {
		recovery_key: signer.public_jwk(),
		recovery_commitment: next_recovery_commitment.to_owned(),
		delta_hash: canonical::hash_model(&delta, protocol.multihash_algorithm)?,
	};
	Ok(OperationRequest::Recover {
		did_suffix: did_suffix.to_owned(),
		signed_data: jws::sign_model(&signed, signer)?,
		delta,
	})
}

/// Builds a deactivate request, signed by the current recovery key.
pub fn deactivate_request(
	did_suffix: &str,
	signer: &dyn Signer,
) -> Result<OperationRequest, ClientError> {
	let signed = DeactivateSignedDataModel {
		did_suffix: did_suffix.to_owned(),
		recovery_key: signer.public_jwk(),
	};
	Ok(OperationRequest::Deactivate {
		did_suffix: did_suffix.to_owned(),
		signed_data: jws::sign_model(&signed, signer)?,
	})
}

fn delta(patches: Vec<Value>, update_commitment: &str) -> Result<DeltaModel, ClientError> {
	if patches.is_empty() {
		return Err(ClientError::MissingPatches);
	}
	Ok(DeltaModel {
		patches,
		update_commitment: update_commitment.to_owned(),
	})
}

/// A key that is revealed now must not be committed to again.
fn check_not_reused(
	protocol: &Protocol,
	signer: &dyn Signer,
	next_commitment: &str,
) -> Result<(), ClientError> {
	let current = commitment::calculate(
		&signer.public_jwk(),
		protocol.multihash_algorithm,
		protocol.hash_algorithm,
	)?;
	if current == next_commitment {
		return Err(ClientError::ReusedCommitment);
	}
	Ok(())
}

#[derive(thiserror::Error, Debug)]
pub enum ClientError {
	#[error("an operation needs at least one patch")]
	MissingPatches,
	#[error("the next commitment must not commit to the key being revealed")]
	ReusedCommitment,
	#[error("only create requests have a unique suffix")]
	NotCreate,
	#[error(transparent)]
	Canonical(#[from] CanonicalError),
	#[error(transparent)]
	Commitment(#[from] CommitmentError),
	#[error(transparent)]
	Jws(#[from] JwsError),
}

#[cfg(test)]
mod test {
	use ed25519_dalek::SigningKey;
	use serde_json::json;

	use super::*;
	use crate::{
		jws::Ed25519Signer,
		operation::{OperationParser, OperationType},
	};

	fn signer(seed: u8) -> Ed25519Signer {
		Ed25519Signer::new(SigningKey::from_bytes(&[seed; 32]), Some("key-1".into()))
	}

	fn commit(seed: u8) -> String {
		let p = Protocol::default();
		commitment::calculate(&signer(seed).public_jwk(), p.multihash_algorithm, p.hash_algorithm)
			.unwrap()
	}

	fn patches() -> Vec<Value> {
		vec![json!({"action": "add-services", "services": [{"id": "svc", "type": "T"}]})]
	}

	#[test]
	fn test_requests_parse() -> eyre::Result<()> {
		let p = Protocol::default();
		let parser = OperationParser::new(p.clone());

		let create = create_request(&p, patches(), &commit(1), &commit(2))?;
		let suffix = unique_suffix(&p, &create)?;
		let op = parser.parse("did:sidetree", &create.to_bytes()?)?;
		assert_eq!(op.unique_suffix, suffix);

		let update = update_request(&p, &suffix, patches(), &signer(2), &commit(3))?;
		let recover = recover_request(&p, &suffix, patches(), &signer(1), &commit(4), &commit(5))?;
		let deactivate = deactivate_request(&suffix, &signer(4))?;
		for (request, ty) in [
			(update, OperationType::Update),
			(recover, OperationType::Recover),
			(deactivate, OperationType::Deactivate),
		] {
			let op = parser.parse("did:sidetree", &request.to_bytes()?)?;
			assert_eq!(op.operation_type(), ty);
			assert_eq!(op.unique_suffix, suffix);
		}
		assert!(matches!(
			unique_suffix(&p, &deactivate_request(&suffix, &signer(4))?),
			Err(ClientError::NotCreate)
		));
		Ok(())
	}

	#[test]
	fn test_invalid_requests() {
		let p = Protocol::default();
		assert!(matches!(
			create_request(&p, vec![], &commit(1), &commit(2)),
			Err(ClientError::MissingPatches)
		));
		assert!(matches!(
			update_request(&p, "suffix", patches(), &signer(2), &commit(2)),
			Err(ClientError::ReusedCommitment)
		));
		assert!(matches!(
			recover_request(&p, "suffix", patches(), &signer(1), &commit(1), &commit(2)),
			Err(ClientError::ReusedCommitment)
		));
	}
}
