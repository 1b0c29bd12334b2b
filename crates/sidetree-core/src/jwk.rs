//! Conversions between [`Jwk`]s and the keys we can verify signatures with.

use ed25519_dalek::VerifyingKey;
use jose_jwk::{Jwk, Key, OkpCurves};

/// Name of the Ed25519 key algorithm, as listed in the protocol's key algorithms.
pub const ED25519: &str = "Ed25519";

/// Creates a public JWK from a ed25519 verifying key.
pub fn ed25519_pub_jwk(pub_key: &VerifyingKey) -> Jwk {
	Jwk {
		key: jose_jwk::Okp {
			crv: OkpCurves::Ed25519,
			x: pub_key.as_bytes().as_slice().to_owned().into(),
			d: None,
		}
		.into(),
		prm: Default::default(),
	}
}

/// Extracts an ed25519 verifying key from a public JWK.
///
/// Note that we will reject any keys that are too weak (aka low order), as well
/// as any JWK that carries private key material.
pub fn ed25519_verifying_key(jwk: &Jwk) -> Result<VerifyingKey, JwkError> {
	let okp = match &jwk.key {
		Key::Okp(okp) => okp,
		_ => return Err(JwkError::UnsupportedKeyType),
	};
	if okp.crv != OkpCurves::Ed25519 {
		return Err(JwkError::UnsupportedKeyType);
	}
	if okp.d.is_some() {
		return Err(JwkError::PrivateKeyMaterial);
	}
	let x: &[u8] = &okp.x;
	let bytes: &[u8; ed25519_dalek::PUBLIC_KEY_LENGTH] =
		x.try_into().map_err(|_| JwkError::WrongLength(x.len()))?;
	let key = VerifyingKey::from_bytes(bytes).map_err(|_| JwkError::NotOnCurve)?;
	if key.is_weak() {
		return Err(JwkError::WeakKey);
	}
	Ok(key)
}

/// The key algorithm of `jwk`, if it is one we know how to verify with.
pub fn key_algorithm(jwk: &Jwk) -> Result<&'static str, JwkError> {
	match &jwk.key {
		Key::Okp(okp) if okp.crv == OkpCurves::Ed25519 => Ok(ED25519),
		_ => Err(JwkError::UnsupportedKeyType),
	}
}

#[derive(thiserror::Error, Debug, Eq, PartialEq)]
pub enum JwkError {
	#[error("only OKP keys on the Ed25519 curve are supported")]
	UnsupportedKeyType,
	#[error("public JWK must not contain private key material")]
	PrivateKeyMaterial,
	#[error("expected a 32 byte public key but got {0} bytes")]
	WrongLength(usize),
	#[error(
		"the provided bytes was not the y coordinate of a valid point on the curve"
	)]
	NotOnCurve,
	#[error("public key has a low order and is too weak, which would allow the key to generate signatures that work for almost any message. To prevent this, we reject weak keys.")]
	WeakKey,
}
