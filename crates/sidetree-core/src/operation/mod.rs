//! Operation models, and parsing them out of raw requests.

mod parser;

use std::{fmt, str::FromStr};

use jose_jwk::Jwk;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use self::parser::OperationParser;

/// The kind of an operation, as carried by the `type` tag of a request.
#[derive(Debug, Eq, PartialEq, Hash, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
	Create,
	Update,
	Recover,
	Deactivate,
}

impl OperationType {
	pub const fn as_str(&self) -> &'static str {
		match self {
			Self::Create => "create",
			Self::Update => "update",
			Self::Recover => "recover",
			Self::Deactivate => "deactivate",
		}
	}
}

impl fmt::Display for OperationType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for OperationType {
	type Err = OperationError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(match s {
			"create" => Self::Create,
			"update" => Self::Update,
			"recover" => Self::Recover,
			"deactivate" => Self::Deactivate,
			other => return Err(OperationError::UnsupportedOperationType(other.to_owned())),
		})
	}
}

/// Data that is hashed into the unique suffix of a DID.
#[derive(Debug, Eq, PartialEq, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuffixDataModel {
	pub delta_hash: String,
	pub recovery_commitment: String,
}

/// The unsigned part of an operation.
#[derive(Debug, Eq, PartialEq, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeltaModel {
	/// Opaque to everything but the [`DocumentComposer`](crate::composer::DocumentComposer).
	pub patches: Vec<Value>,
	pub update_commitment: String,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSignedDataModel {
	pub update_key: Jwk,
	pub delta_hash: String,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoverSignedDataModel {
	pub recovery_key: Jwk,
	pub recovery_commitment: String,
	pub delta_hash: String,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeactivateSignedDataModel {
	pub did_suffix: String,
	pub recovery_key: Jwk,
}

/// Signed data that reveals the public key its signature verifies with.
pub trait SignedDataModel: serde::de::DeserializeOwned {
	fn revealed_key(&self) -> &Jwk;
}

impl SignedDataModel for UpdateSignedDataModel {
	fn revealed_key(&self) -> &Jwk {
		&self.update_key
	}
}

impl SignedDataModel for RecoverSignedDataModel {
	fn revealed_key(&self) -> &Jwk {
		&self.recovery_key
	}
}

impl SignedDataModel for DeactivateSignedDataModel {
	fn revealed_key(&self) -> &Jwk {
		&self.recovery_key
	}
}

/// The wire form of an operation request.
#[derive(Debug, Eq, PartialEq, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OperationRequest {
	Create {
		#[serde(rename = "suffixData")]
		suffix_data: SuffixDataModel,
		delta: DeltaModel,
	},
	Update {
		#[serde(rename = "didSuffix")]
		did_suffix: String,
		#[serde(rename = "signedData")]
		signed_data: String,
		delta: DeltaModel,
	},
	Recover {
		#[serde(rename = "didSuffix")]
		did_suffix: String,
		#[serde(rename = "signedData")]
		signed_data: String,
		delta: DeltaModel,
	},
	Deactivate {
		#[serde(rename = "didSuffix")]
		did_suffix: String,
		#[serde(rename = "signedData")]
		signed_data: String,
	},
}

impl OperationRequest {
	/// The JSON bytes that get queued or anchored.
	pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
		crate::canonical::to_canonical_vec(self)
	}
}

/// The kind specific content of a parsed [`Operation`].
///
/// A `delta` of `None` means the request carried no delta, or one that could
/// not be decoded. This only happens for operations parsed from anchored data,
/// see [`OperationParser::parse_anchored`].
#[derive(Debug, Eq, PartialEq, Clone)]
pub enum OperationKind {
	Create {
		suffix_data: SuffixDataModel,
		delta: Option<DeltaModel>,
	},
	Update {
		/// Compact JWS over an [`UpdateSignedDataModel`].
		signed_data: String,
		delta: Option<DeltaModel>,
	},
	Recover {
		/// Compact JWS over a [`RecoverSignedDataModel`].
		signed_data: String,
		delta: Option<DeltaModel>,
	},
	Deactivate {
		/// Compact JWS over a [`DeactivateSignedDataModel`].
		signed_data: String,
	},
}

/// A parsed operation.
#[derive(Debug, Eq, PartialEq, Clone)]
pub struct Operation {
	pub namespace: String,
	pub unique_suffix: String,
	pub kind: OperationKind,
	/// The raw request this was parsed from.
	pub operation_buffer: Vec<u8>,
}

impl Operation {
	/// The fully qualified DID this operation targets.
	pub fn id(&self) -> String {
		format!("{}:{}", self.namespace, self.unique_suffix)
	}

	pub fn operation_type(&self) -> OperationType {
		match self.kind {
			OperationKind::Create { .. } => OperationType::Create,
			OperationKind::Update { .. } => OperationType::Update,
			OperationKind::Recover { .. } => OperationType::Recover,
			OperationKind::Deactivate { .. } => OperationType::Deactivate,
		}
	}

	pub fn signed_data(&self) -> Option<&str> {
		match &self.kind {
			OperationKind::Create { .. } => None,
			OperationKind::Update { signed_data, .. }
			| OperationKind::Recover { signed_data, .. }
			| OperationKind::Deactivate { signed_data } => Some(signed_data),
		}
	}

	pub fn delta(&self) -> Option<&DeltaModel> {
		match &self.kind {
			OperationKind::Create { delta, .. }
			| OperationKind::Update { delta, .. }
			| OperationKind::Recover { delta, .. } => delta.as_ref(),
			OperationKind::Deactivate { .. } => None,
		}
	}
}

/// An operation as it was found on the ledger, with the metadata that the
/// resolution loop orders operations by.
#[derive(Debug, Eq, PartialEq, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchoredOperation {
	#[serde(rename = "type")]
	pub operation_type: OperationType,
	pub unique_suffix: String,
	#[serde(with = "buffer")]
	pub operation_buffer: Vec<u8>,
	pub transaction_time: u64,
	pub transaction_number: u64,
}

impl AnchoredOperation {
	pub fn from_operation(
		op: &Operation,
		transaction_time: u64,
		transaction_number: u64,
	) -> Self {
		Self {
			operation_type: op.operation_type(),
			unique_suffix: op.unique_suffix.clone(),
			operation_buffer: op.operation_buffer.clone(),
			transaction_time,
			transaction_number,
		}
	}
}

/// A raw request waiting to be batched.
#[derive(Debug, Eq, PartialEq, Clone)]
pub struct QueuedOperation {
	pub namespace: String,
	pub operation_buffer: Vec<u8>,
}

/// Operation buffers hold JSON, so they are embedded as base64url strings.
mod buffer {
	use base64::{prelude::BASE64_URL_SAFE_NO_PAD, Engine as _};
	use serde::{Deserialize, Deserializer, Serializer};

	pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
		s.serialize_str(&BASE64_URL_SAFE_NO_PAD.encode(bytes))
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
		let s = String::deserialize(d)?;
		BASE64_URL_SAFE_NO_PAD
			.decode(s)
			.map_err(serde::de::Error::custom)
	}
}

#[derive(thiserror::Error, Debug)]
pub enum OperationError {
	#[error("malformed operation: {0}")]
	MalformedOperation(String),
	#[error("operation type {0:?} is not supported")]
	UnsupportedOperationType(String),
	#[error("missing signed data")]
	MissingSignedData,
	#[error("malformed signed data: {0}")]
	MalformedSignedData(String),
	#[error("failed to verify signature")]
	InvalidSignature,
	#[error("commitment generated from public key doesn't match the stored commitment")]
	CommitmentMismatch,
	#[error("did suffix doesn't match signed value")]
	SuffixMismatch,
	#[error("invalid state transition: {0}")]
	InvalidStateTransition(&'static str),
}
