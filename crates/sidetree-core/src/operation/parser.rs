use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;
use tracing::debug;

use super::{
	DeactivateSignedDataModel, DeltaModel, Operation, OperationError, OperationKind,
	OperationType, RecoverSignedDataModel, SuffixDataModel, UpdateSignedDataModel,
};
use crate::{canonical, composer::Patch, jws::CompactJws, protocol::Protocol};

/// The fields any request may carry. Which of them are required depends on
/// the `type` tag.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRequest {
	#[serde(rename = "type")]
	operation_type: String,
	did_suffix: Option<String>,
	suffix_data: Option<Value>,
	signed_data: Option<Value>,
	delta: Option<Value>,
}

/// Whether to validate a request fully or only its envelope.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum Mode {
	Request,
	Anchored,
}

/// Turns raw operation bytes into [`Operation`]s.
#[derive(Debug, Clone)]
pub struct OperationParser {
	protocol: Protocol,
}

impl OperationParser {
	pub fn new(protocol: Protocol) -> Self {
		Self { protocol }
	}

	/// Parses a request that is about to be batched.
	///
	/// Everything that can be checked without knowing the current state of the
	/// DID is checked: the delta must be present, well formed and match the hash
	/// it is bound to, and signed data must decode.
	pub fn parse(&self, namespace: &str, buf: &[u8]) -> Result<Operation, OperationError> {
		self.parse_with(namespace, buf, Mode::Request)
	}

	/// Parses an operation that was already anchored.
	///
	/// Anchored operations cannot be refused outright, because a valid signature
	/// over a bad delta still spends the signing key. So only the envelope is
	/// validated here, and a missing or undecodable delta becomes `None`.
	pub fn parse_anchored(
		&self,
		namespace: &str,
		buf: &[u8],
	) -> Result<Operation, OperationError> {
		self.parse_with(namespace, buf, Mode::Anchored)
	}

	fn parse_with(
		&self,
		namespace: &str,
		buf: &[u8],
		mode: Mode,
	) -> Result<Operation, OperationError> {
		if buf.len() > self.protocol.max_operation_size {
			return Err(OperationError::MalformedOperation(format!(
				"operation size {} exceeds maximum operation size {}",
				buf.len(),
				self.protocol.max_operation_size
			)));
		}
		let raw: RawRequest = serde_json::from_slice(buf)
			.map_err(|e| OperationError::MalformedOperation(e.to_string()))?;
		let operation_type: OperationType = raw.operation_type.parse()?;

		let (unique_suffix, kind) = match operation_type {
			OperationType::Create => {
				let suffix_data: SuffixDataModel = decode_field(raw.suffix_data, "suffix data")?;
				non_empty(&suffix_data.delta_hash, "delta hash")?;
				non_empty(&suffix_data.recovery_commitment, "recovery commitment")?;
				let unique_suffix =
					canonical::hash_model(&suffix_data, self.protocol.multihash_algorithm)
						.map_err(|e| OperationError::MalformedOperation(e.to_string()))?;
				let delta = self.delta(raw.delta, mode)?;
				if let (Mode::Request, Some(delta)) = (mode, &delta) {
					self.check_delta_hash(delta, &suffix_data.delta_hash)?;
				}
				(unique_suffix, OperationKind::Create { suffix_data, delta })
			}
			OperationType::Update => {
				let did_suffix = did_suffix(raw.did_suffix)?;
				let signed_data = signed_data(raw.signed_data)?;
				let delta = self.delta(raw.delta, mode)?;
				if let (Mode::Request, Some(delta)) = (mode, &delta) {
					let signed: UpdateSignedDataModel = decode_signed(&signed_data)?;
					self.check_delta_hash(delta, &signed.delta_hash)?;
				}
				(did_suffix, OperationKind::Update { signed_data, delta })
			}
			OperationType::Recover => {
				let did_suffix = did_suffix(raw.did_suffix)?;
				let signed_data = signed_data(raw.signed_data)?;
				let delta = self.delta(raw.delta, mode)?;
				if let (Mode::Request, Some(delta)) = (mode, &delta) {
					let signed: RecoverSignedDataModel = decode_signed(&signed_data)?;
					non_empty(&signed.recovery_commitment, "recovery commitment")?;
					self.check_delta_hash(delta, &signed.delta_hash)?;
				}
				(did_suffix, OperationKind::Recover { signed_data, delta })
			}
			OperationType::Deactivate => {
				let did_suffix = did_suffix(raw.did_suffix)?;
				let signed_data = signed_data(raw.signed_data)?;
				if mode == Mode::Request {
					let signed: DeactivateSignedDataModel = decode_signed(&signed_data)?;
					if signed.did_suffix != did_suffix {
						return Err(OperationError::SuffixMismatch);
					}
				}
				(did_suffix, OperationKind::Deactivate { signed_data })
			}
		};

		debug!(%operation_type, %unique_suffix, "parsed operation");
		Ok(Operation {
			namespace: namespace.to_owned(),
			unique_suffix,
			kind,
			operation_buffer: buf.to_vec(),
		})
	}

	/// In request mode every problem with the delta is an error. In anchored
	/// mode the same problems just drop the delta.
	fn delta(
		&self,
		raw: Option<Value>,
		mode: Mode,
	) -> Result<Option<DeltaModel>, OperationError> {
		let result = self.validate_delta(raw);
		match (mode, result) {
			(_, Ok(delta)) => Ok(Some(delta)),
			(Mode::Request, Err(e)) => Err(e),
			(Mode::Anchored, Err(e)) => {
				debug!(error = %e, "anchored operation has an unusable delta");
				Ok(None)
			}
		}
	}

	/// Parses and validates a raw delta.
	pub fn validate_delta(&self, raw: Option<Value>) -> Result<DeltaModel, OperationError> {
		let delta: DeltaModel = decode_field(raw, "delta")?;
		non_empty(&delta.update_commitment, "update commitment")?;
		if delta.patches.is_empty() {
			return Err(OperationError::MalformedOperation(
				"missing patches".to_owned(),
			));
		}
		for patch in &delta.patches {
			let Some(action) = Patch::action_of(patch) else {
				return Err(OperationError::MalformedOperation(
					"patch is missing an action".to_owned(),
				));
			};
			if !self.protocol.allows_patch(action) {
				return Err(OperationError::MalformedOperation(format!(
					"patch action {action:?} is not allowed"
				)));
			}
		}
		Ok(delta)
	}

	fn check_delta_hash(
		&self,
		delta: &DeltaModel,
		delta_hash: &str,
	) -> Result<(), OperationError> {
		canonical::verify_model_hash(delta, delta_hash, self.protocol.multihash_algorithm)
			.map_err(|e| {
				OperationError::MalformedOperation(format!("delta doesn't match delta hash: {e}"))
			})
	}
}

fn decode_field<T: DeserializeOwned>(
	raw: Option<Value>,
	name: &str,
) -> Result<T, OperationError> {
	let value = raw
		.ok_or_else(|| OperationError::MalformedOperation(format!("missing {name}")))?;
	serde_json::from_value(value)
		.map_err(|e| OperationError::MalformedOperation(format!("invalid {name}: {e}")))
}

fn non_empty(value: &str, name: &str) -> Result<(), OperationError> {
	if value.is_empty() {
		return Err(OperationError::MalformedOperation(format!("missing {name}")));
	}
	Ok(())
}

fn did_suffix(raw: Option<String>) -> Result<String, OperationError> {
	match raw {
		Some(s) if !s.is_empty() => Ok(s),
		_ => Err(OperationError::MalformedOperation(
			"missing did suffix".to_owned(),
		)),
	}
}

fn signed_data(raw: Option<Value>) -> Result<String, OperationError> {
	match raw {
		None | Some(Value::Null) => Err(OperationError::MissingSignedData),
		Some(Value::String(s)) if s.is_empty() => Err(OperationError::MissingSignedData),
		Some(Value::String(s)) => Ok(s),
		Some(_) => Err(OperationError::MalformedSignedData(
			"signed data must be a compact jws string".to_owned(),
		)),
	}
}

/// Decodes the payload of a compact JWS, without verifying it.
pub(crate) fn decode_signed<T: DeserializeOwned>(
	signed_data: &str,
) -> Result<T, OperationError> {
	let jws = CompactJws::parse(signed_data)
		.map_err(|e| OperationError::MalformedSignedData(e.to_string()))?;
	jws.payload_model()
		.map_err(|e| OperationError::MalformedSignedData(e.to_string()))
}
