//! Compact JWS ([RFC 7515][rfc]) signing and verification.
//!
//! Sidetree signed data is a compact JWS whose payload is the canonical JSON of
//! a signed data model. The key that verifies the signature is carried inside
//! the payload itself, so parsing and verification are separate steps: decode
//! the payload, pull the revealed key out of it, then verify against that key.
//!
//! [rfc]: https://datatracker.ietf.org/doc/html/rfc7515

use std::str::FromStr;

use base64::{prelude::BASE64_URL_SAFE_NO_PAD, Engine as _};
use ed25519_dalek::{Signature, SigningKey};
use jose_jwk::Jwk;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{
	canonical,
	jwk::{self, JwkError},
};

/// The JWS `alg` for Ed25519 signatures.
pub const EDDSA: &str = "EdDSA";

/// Produces signatures for compact JWS.
pub trait Signer: std::fmt::Debug + Send + Sync {
	/// The JWS `alg` header value.
	fn algorithm(&self) -> &str;
	/// The optional JWS `kid` header value.
	fn key_id(&self) -> Option<&str>;
	/// The public key that verifies this signer's signatures. Operations
	/// reveal it in their signed data.
	fn public_jwk(&self) -> Jwk;
	fn sign(&self, signing_input: &[u8]) -> Result<Vec<u8>, SignError>;
}

#[derive(thiserror::Error, Debug)]
#[error("failed to sign: {0}")]
pub struct SignError(pub String);

/// Signs with an in memory ed25519 key.
#[derive(Debug, Clone)]
pub struct Ed25519Signer {
	key: SigningKey,
	kid: Option<String>,
}

impl Ed25519Signer {
	pub fn new(key: SigningKey, kid: Option<String>) -> Self {
		Self { key, kid }
	}
}

impl Signer for Ed25519Signer {
	fn algorithm(&self) -> &str {
		EDDSA
	}

	fn key_id(&self) -> Option<&str> {
		self.kid.as_deref()
	}

	fn public_jwk(&self) -> Jwk {
		jwk::ed25519_pub_jwk(&self.key.verifying_key())
	}

	fn sign(&self, signing_input: &[u8]) -> Result<Vec<u8>, SignError> {
		use ed25519_dalek::Signer as _;
		Ok(self.key.sign(signing_input).to_bytes().to_vec())
	}
}

/// The protected header of a compact JWS.
#[derive(Debug, Eq, PartialEq, Clone, Serialize, Deserialize)]
pub struct JwsHeader {
	pub alg: String,
	#[serde(skip_serializing_if = "Option::is_none", default)]
	pub kid: Option<String>,
}

/// Signs the canonical encoding of `model`, returning a compact JWS.
pub fn sign_model<T: Serialize>(
	model: &T,
	signer: &dyn Signer,
) -> Result<String, JwsError> {
	let payload = canonical::to_canonical_vec(model)?;
	sign_payload(&payload, signer)
}

/// Signs arbitrary payload bytes, returning a compact JWS.
pub fn sign_payload(payload: &[u8], signer: &dyn Signer) -> Result<String, JwsError> {
	let header = JwsHeader {
		alg: signer.algorithm().to_owned(),
		kid: signer.key_id().map(ToOwned::to_owned),
	};
	let header = canonical::to_canonical_vec(&header)?;
	let signing_input = format!(
		"{}.{}",
		BASE64_URL_SAFE_NO_PAD.encode(header),
		BASE64_URL_SAFE_NO_PAD.encode(payload)
	);
	let signature = signer.sign(signing_input.as_bytes())?;
	Ok(format!(
		"{signing_input}.{}",
		BASE64_URL_SAFE_NO_PAD.encode(signature)
	))
}

/// A decoded, but not yet verified, compact JWS.
#[derive(Debug, Eq, PartialEq, Clone)]
pub struct CompactJws {
	pub header: JwsHeader,
	pub payload: Vec<u8>,
	signing_input: String,
	signature: Vec<u8>,
}

impl CompactJws {
	pub fn parse(s: &str) -> Result<Self, JwsError> {
		let mut parts = s.split('.');
		let (Some(header_b64), Some(payload_b64), Some(signature_b64), None) =
			(parts.next(), parts.next(), parts.next(), parts.next())
		else {
			return Err(JwsError::WrongPartCount);
		};
		let header_bytes = BASE64_URL_SAFE_NO_PAD.decode(header_b64)?;
		let header: JwsHeader =
			serde_json::from_slice(&header_bytes).map_err(JwsError::Header)?;
		let payload = BASE64_URL_SAFE_NO_PAD.decode(payload_b64)?;
		let signature = BASE64_URL_SAFE_NO_PAD.decode(signature_b64)?;
		Ok(Self {
			header,
			payload,
			signing_input: format!("{header_b64}.{payload_b64}"),
			signature,
		})
	}

	/// Deserializes the payload as JSON.
	pub fn payload_model<T: DeserializeOwned>(&self) -> Result<T, JwsError> {
		serde_json::from_slice(&self.payload).map_err(JwsError::Payload)
	}

	/// Checks the signature against `key`.
	pub fn verify(&self, key: &Jwk) -> Result<(), JwsError> {
		match self.header.alg.as_str() {
			EDDSA => {
				let verifying_key = jwk::ed25519_verifying_key(key)?;
				let signature = Signature::from_slice(&self.signature)
					.map_err(|_| JwsError::InvalidSignature)?;
				verifying_key
					.verify_strict(self.signing_input.as_bytes(), &signature)
					.map_err(|_| JwsError::InvalidSignature)
			}
			other => Err(JwsError::UnsupportedAlgorithm(other.to_owned())),
		}
	}
}

impl FromStr for CompactJws {
	type Err = JwsError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::parse(s)
	}
}

#[derive(thiserror::Error, Debug)]
pub enum JwsError {
	#[error("compact jws must have exactly three parts")]
	WrongPartCount,
	#[error("jws part is not valid base64url")]
	Base64(#[from] base64::DecodeError),
	#[error("failed to decode jws header")]
	Header(#[source] serde_json::Error),
	#[error("failed to decode jws payload")]
	Payload(#[source] serde_json::Error),
	#[error("failed to canonicalize jws content")]
	Canonicalize(#[from] serde_json::Error),
	#[error("jws algorithm {0:?} is not supported")]
	UnsupportedAlgorithm(String),
	#[error(transparent)]
	Key(#[from] JwkError),
	#[error("invalid signature")]
	InvalidSignature,
	#[error(transparent)]
	Sign(#[from] SignError),
}
