use std::{fmt, num::ParseIntError, str::FromStr};

/// What gets anchored on the ledger for a batch: how many operations it holds,
/// and where its anchor file is.
///
/// The textual form is `"<count>.<address>"`.
#[derive(Debug, Eq, PartialEq, Clone)]
pub struct AnchorData {
	pub number_of_operations: usize,
	pub anchor_address: String,
}

const SEPARATOR: char = '.';

impl fmt::Display for AnchorData {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}{SEPARATOR}{}", self.number_of_operations, self.anchor_address)
	}
}

impl FromStr for AnchorData {
	type Err = AnchorDataError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let (count, address) = s
			.split_once(SEPARATOR)
			.ok_or(AnchorDataError::MissingSeparator)?;
		if address.is_empty() || address.contains(SEPARATOR) {
			return Err(AnchorDataError::InvalidAddress);
		}
		let number_of_operations = count.parse()?;
		if number_of_operations == 0 {
			return Err(AnchorDataError::NoOperations);
		}
		Ok(Self {
			number_of_operations,
			anchor_address: address.to_owned(),
		})
	}
}

#[derive(thiserror::Error, Debug, Eq, PartialEq)]
pub enum AnchorDataError {
	#[error("anchor string must be of the form <count>.<address>")]
	MissingSeparator,
	#[error("anchor string has an invalid address")]
	InvalidAddress,
	#[error("anchor string has an invalid operation count")]
	InvalidCount(#[from] ParseIntError),
	#[error("anchor string must reference at least one operation")]
	NoOperations,
}
