//! The state machine that folds anchored operations into a [`ResolutionModel`].
//!
//! The applier is stateless. Each call to [`Applier::apply`] takes the state
//! produced by the previous call and returns the next one, leaving its input
//! untouched. An error means "skip this operation": the caller keeps the
//! previous state and moves on to the next anchored operation.
//!
//! Once signature and commitment checks have passed, the operation is
//! accepted, even if its delta turns out to be bad. In that case the revealed
//! key is still spent, but the document is reset to empty instead of being
//! patched.

use std::sync::Arc;

use jose_jwk::Jwk;
use tracing::{debug, instrument, warn};

use crate::{
	canonical, commitment,
	composer::DocumentComposer,
	document::{Document, ResolutionModel},
	jwk,
	jws::{CompactJws, JwsError},
	operation::{
		AnchoredOperation, DeactivateSignedDataModel, DeltaModel, OperationError,
		OperationKind, OperationParser, RecoverSignedDataModel, SignedDataModel,
		SuffixDataModel, UpdateSignedDataModel,
	},
	protocol::Protocol,
};

/// Applies anchored operations to resolution state.
#[derive(Debug, Clone)]
pub struct Applier {
	protocol: Protocol,
	parser: OperationParser,
	composer: Arc<dyn DocumentComposer>,
}

impl Applier {
	pub fn new(protocol: Protocol, composer: Arc<dyn DocumentComposer>) -> Self {
		let parser = OperationParser::new(protocol.clone());
		Self {
			protocol,
			parser,
			composer,
		}
	}

	/// Applies `op` on top of `rm`, returning the new state.
	#[instrument(skip_all, name = "apply", fields(suffix = %op.unique_suffix, ty = %op.operation_type))]
	pub fn apply(
		&self,
		op: &AnchoredOperation,
		rm: &ResolutionModel,
	) -> Result<ResolutionModel, OperationError> {
		// Anchored operations are not namespaced, only their suffix matters.
		let parsed = self.parser.parse_anchored("", &op.operation_buffer)?;
		if parsed.operation_type() != op.operation_type {
			return Err(OperationError::MalformedOperation(format!(
				"anchored operation type {} doesn't match the {} in its buffer",
				op.operation_type,
				parsed.operation_type()
			)));
		}
		if parsed.unique_suffix != op.unique_suffix {
			return Err(OperationError::MalformedOperation(
				"anchored unique suffix doesn't match the one in its buffer".to_owned(),
			));
		}

		if rm.deactivated {
			return Err(OperationError::InvalidStateTransition(
				"document is deactivated",
			));
		}
		let next = match parsed.kind {
			OperationKind::Create { suffix_data, delta } => {
				if !rm.is_empty() {
					return Err(OperationError::InvalidStateTransition(
						"create must be the first operation",
					));
				}
				self.apply_create(suffix_data, delta)
			}
			_ if rm.is_empty() => {
				return Err(OperationError::InvalidStateTransition(
					"update/recover/deactivate cannot be applied before create",
				));
			}
			OperationKind::Update { signed_data, delta } => {
				self.apply_update(&signed_data, delta, rm)?
			}
			OperationKind::Recover { signed_data, delta } => {
				self.apply_recover(&signed_data, delta, rm)?
			}
			OperationKind::Deactivate { signed_data } => {
				self.apply_deactivate(&signed_data, &op.unique_suffix, rm)?
			}
		};

		debug!("operation applied");
		Ok(ResolutionModel {
			last_operation_transaction_time: op.transaction_time,
			last_operation_transaction_number: op.transaction_number,
			..next
		})
	}

	fn apply_create(
		&self,
		suffix_data: SuffixDataModel,
		delta: Option<DeltaModel>,
	) -> ResolutionModel {
		let mut next = ResolutionModel {
			recovery_commitment: Some(suffix_data.recovery_commitment),
			..Default::default()
		};
		if let Some(delta) = self.bound_delta(delta, &suffix_data.delta_hash) {
			next.document = self.compose(&Document::new(), &delta);
			next.update_commitment = Some(delta.update_commitment);
		}
		next
	}

	fn apply_update(
		&self,
		signed_data: &str,
		delta: Option<DeltaModel>,
		rm: &ResolutionModel,
	) -> Result<ResolutionModel, OperationError> {
		let signed: UpdateSignedDataModel = self.verify_signed_data(signed_data)?;
		self.verify_reveal(&signed.update_key, rm.update_commitment.as_deref())?;

		let mut next = ResolutionModel {
			recovery_commitment: rm.recovery_commitment.clone(),
			..Default::default()
		};
		if let Some(delta) = self.bound_delta(delta, &signed.delta_hash) {
			next.document = self.compose(&rm.document, &delta);
			next.update_commitment = Some(delta.update_commitment);
		}
		Ok(next)
	}

	fn apply_recover(
		&self,
		signed_data: &str,
		delta: Option<DeltaModel>,
		rm: &ResolutionModel,
	) -> Result<ResolutionModel, OperationError> {
		let signed: RecoverSignedDataModel = self.verify_signed_data(signed_data)?;
		self.verify_reveal(&signed.recovery_key, rm.recovery_commitment.as_deref())?;

		let mut next = ResolutionModel {
			recovery_commitment: Some(signed.recovery_commitment),
			..Default::default()
		};
		if let Some(delta) = self.bound_delta(delta, &signed.delta_hash) {
			next.document = self.compose(&Document::new(), &delta);
			next.update_commitment = Some(delta.update_commitment);
		}
		Ok(next)
	}

	fn apply_deactivate(
		&self,
		signed_data: &str,
		unique_suffix: &str,
		rm: &ResolutionModel,
	) -> Result<ResolutionModel, OperationError> {
		let signed: DeactivateSignedDataModel = self.verify_signed_data(signed_data)?;
		self.verify_reveal(&signed.recovery_key, rm.recovery_commitment.as_deref())?;
		if signed.did_suffix != unique_suffix {
			return Err(OperationError::SuffixMismatch);
		}
		Ok(ResolutionModel {
			deactivated: true,
			..Default::default()
		})
	}

	/// Decodes signed data and checks its signature against the key revealed
	/// inside of it.
	fn verify_signed_data<T: SignedDataModel>(
		&self,
		signed_data: &str,
	) -> Result<T, OperationError> {
		let jws = CompactJws::parse(signed_data)
			.map_err(|e| OperationError::MalformedSignedData(e.to_string()))?;
		if !self.protocol.allows_signature_algorithm(&jws.header.alg) {
			return Err(OperationError::MalformedSignedData(format!(
				"algorithm {:?} is not allowed",
				jws.header.alg
			)));
		}
		let model: T = jws
			.payload_model()
			.map_err(|e| OperationError::MalformedSignedData(e.to_string()))?;
		let key = model.revealed_key();
		let key_alg = jwk::key_algorithm(key)
			.map_err(|e| OperationError::MalformedSignedData(e.to_string()))?;
		if !self.protocol.allows_key_algorithm(key_alg) {
			return Err(OperationError::MalformedSignedData(format!(
				"key algorithm {key_alg:?} is not allowed"
			)));
		}
		match jws.verify(key) {
			Ok(()) => Ok(model),
			Err(JwsError::InvalidSignature) => Err(OperationError::InvalidSignature),
			Err(e) => Err(OperationError::MalformedSignedData(e.to_string())),
		}
	}

	fn verify_reveal(&self, key: &Jwk, stored: Option<&str>) -> Result<(), OperationError> {
		commitment::verify_reveal(
			key,
			stored,
			self.protocol.multihash_algorithm,
			self.protocol.hash_algorithm,
		)
		.map_err(|e| match e {
			commitment::CommitmentError::Mismatch => OperationError::CommitmentMismatch,
			other => OperationError::MalformedSignedData(other.to_string()),
		})
	}

	/// The delta, if it is present and matches the hash it was bound to.
	fn bound_delta(&self, delta: Option<DeltaModel>, delta_hash: &str) -> Option<DeltaModel> {
		let Some(delta) = delta else {
			warn!("operation has no usable delta, resetting the document");
			return None;
		};
		match canonical::verify_model_hash(&delta, delta_hash, self.protocol.multihash_algorithm)
		{
			Ok(()) => Some(delta),
			Err(e) => {
				warn!(error = %e, "delta doesn't match delta hash, resetting the document");
				None
			}
		}
	}

	/// Patches `doc`, falling back to an empty document if that fails.
	fn compose(&self, doc: &Document, delta: &DeltaModel) -> Document {
		match self.composer.apply_patches(doc, &delta.patches) {
			Ok(doc) => doc,
			Err(e) => {
				warn!(error = %e, "failed to apply patches, resetting the document");
				Document::new()
			}
		}
	}
}
