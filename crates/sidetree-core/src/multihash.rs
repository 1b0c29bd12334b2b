//! Self describing hashes, see <https://multiformats.io/multihash/>.
//!
//! Every hash that ends up in an operation (delta hashes, commitments, unique
//! suffixes) is a multihash encoded as unpadded base64url, so that the algorithm
//! can be recovered from the value itself.

use std::fmt::Display;

use base64::{prelude::BASE64_URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256, Sha512};

use crate::varint::{decode_varint, encode_varint, DecodeError};

/// A hash function that has a multicodec assignment.
#[derive(Debug, Eq, PartialEq, Hash, Clone, Copy, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub enum MultihashAlgorithm {
	Sha2_256,
	Sha2_512,
}

impl MultihashAlgorithm {
	pub const fn code(&self) -> u64 {
		match self {
			Self::Sha2_256 => 0x12,
			Self::Sha2_512 => 0x13,
		}
	}

	pub const fn digest_len(&self) -> usize {
		match self {
			Self::Sha2_256 => 32,
			Self::Sha2_512 => 64,
		}
	}

	pub fn from_code(code: u64) -> Result<Self, MultihashError> {
		Ok(match code {
			0x12 => Self::Sha2_256,
			0x13 => Self::Sha2_512,
			_ => return Err(MultihashError::UnsupportedCode(code)),
		})
	}

	/// Hashes `data` without any multihash prefix.
	pub fn digest(&self, data: &[u8]) -> Vec<u8> {
		match self {
			Self::Sha2_256 => Sha256::digest(data).to_vec(),
			Self::Sha2_512 => Sha512::digest(data).to_vec(),
		}
	}
}

impl TryFrom<u64> for MultihashAlgorithm {
	type Error = MultihashError;

	fn try_from(value: u64) -> Result<Self, Self::Error> {
		Self::from_code(value)
	}
}

impl From<MultihashAlgorithm> for u64 {
	fn from(value: MultihashAlgorithm) -> Self {
		value.code()
	}
}

impl Display for MultihashAlgorithm {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Sha2_256 => f.write_str("sha2-256"),
			Self::Sha2_512 => f.write_str("sha2-512"),
		}
	}
}

/// The plain hash function applied to a public key before it is wrapped into a
/// commitment multihash.
#[derive(Debug, Eq, PartialEq, Hash, Clone, Copy, Serialize, Deserialize)]
pub enum HashAlgorithm {
	#[serde(rename = "SHA256")]
	Sha256,
	#[serde(rename = "SHA512")]
	Sha512,
}

impl HashAlgorithm {
	pub fn digest(&self, data: &[u8]) -> Vec<u8> {
		match self {
			Self::Sha256 => Sha256::digest(data).to_vec(),
			Self::Sha512 => Sha512::digest(data).to_vec(),
		}
	}
}

/// Hashes `data` with `alg` and prepends the multihash prefix.
pub fn compute(alg: MultihashAlgorithm, data: &[u8]) -> Vec<u8> {
	let digest = alg.digest(data);
	let mut out = Vec::with_capacity(digest.len() + 2);
	encode_varint(alg.code(), &mut out);
	encode_varint(digest.len() as u64, &mut out);
	out.extend_from_slice(&digest);
	out
}

/// Same as [`compute`], but encoded as unpadded base64url.
pub fn compute_encoded(alg: MultihashAlgorithm, data: &[u8]) -> String {
	encode(&compute(alg, data))
}

/// A multihash whose prefix has been checked.
#[derive(Debug, Eq, PartialEq, Clone)]
pub struct Multihash {
	pub algorithm: MultihashAlgorithm,
	pub digest: Vec<u8>,
}

/// Parses raw multihash bytes.
pub fn decode(bytes: &[u8]) -> Result<Multihash, MultihashError> {
	let (code, code_len) = decode_varint(bytes)?;
	let algorithm = MultihashAlgorithm::from_code(code)?;
	let (len, len_len) = decode_varint(&bytes[code_len..])?;
	let digest = &bytes[code_len + len_len..];
	if len != digest.len() as u64 || digest.len() != algorithm.digest_len() {
		return Err(MultihashError::WrongLength {
			expected: algorithm.digest_len(),
			declared: len,
			actual: digest.len(),
		});
	}
	Ok(Multihash {
		algorithm,
		digest: digest.to_vec(),
	})
}

/// Parses a base64url encoded multihash.
pub fn decode_encoded(encoded: &str) -> Result<Multihash, MultihashError> {
	let bytes = BASE64_URL_SAFE_NO_PAD.decode(encoded)?;
	decode(&bytes)
}

/// Unpadded base64url, the data encoding scheme for every binary value on the wire.
pub fn encode(bytes: &[u8]) -> String {
	BASE64_URL_SAFE_NO_PAD.encode(bytes)
}

#[derive(thiserror::Error, Debug, Eq, PartialEq)]
pub enum MultihashError {
	#[error("multihash code {0:#x} is not supported")]
	UnsupportedCode(u64),
	#[error(
		"multihash digest length mismatch: algorithm expects {expected}, prefix declares {declared}, got {actual}"
	)]
	WrongLength {
		expected: usize,
		declared: u64,
		actual: usize,
	},
	#[error("invalid multihash prefix")]
	Varint(#[from] DecodeError),
	#[error("multihash is not valid base64url")]
	Base64(#[from] base64::DecodeError),
}
