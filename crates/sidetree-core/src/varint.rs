//! Unsigned varints, as used by [multiformats] for multihash prefixes.
//!
//! [multiformats]: https://github.com/multiformats/unsigned-varint

/// bitmask for 7 least significant bits
const LSB_7: u8 = u8::MAX / 2;
/// bitmask for most significant bit
const MSB: u8 = !LSB_7;

/// Multiformats caps varints at 9 bytes, which covers 63 bits of payload.
pub(crate) const MAX_LEN: usize = 9;

#[inline]
const fn msb_is_1(val: u8) -> bool {
	val & MSB == MSB
}

/// Appends `value` to `out` as a varint.
pub(crate) fn encode_varint(mut value: u64, out: &mut Vec<u8>) {
	loop {
		let chunk = (value & LSB_7 as u64) as u8;
		value >>= 7;
		if value == 0 {
			out.push(chunk);
			return;
		}
		out.push(chunk | MSB);
	}
}

/// Decodes a varint from the front of `encoded`, returning the value and the
/// number of bytes that were consumed.
pub(crate) fn decode_varint(encoded: &[u8]) -> Result<(u64, usize), DecodeError> {
	let mut result: u64 = 0;
	for (idx, &byte) in encoded.iter().enumerate() {
		if idx >= MAX_LEN {
			return Err(DecodeError::WouldOverflow);
		}
		result |= ((byte & LSB_7) as u64) << (idx * 7);
		if !msb_is_1(byte) {
			// Minimal encoding only, otherwise the same value has many prefixes.
			if byte == 0 && idx > 0 {
				return Err(DecodeError::NotMinimal);
			}
			return Ok((result, idx + 1));
		}
	}
	Err(DecodeError::MissingBytes)
}

#[derive(thiserror::Error, Debug, Eq, PartialEq)]
pub enum DecodeError {
	#[error("expected more bytes than what were provided")]
	MissingBytes,
	#[error(
		"the decoded number is too large to fit into the type without overflowing"
	)]
	WouldOverflow,
	#[error("varint was not minimally encoded")]
	NotMinimal,
}
