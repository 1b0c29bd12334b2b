use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Property holding the public keys of a document.
pub const PUBLIC_KEY_PROPERTY: &str = "publicKey";
/// Property holding the services of a document.
pub const SERVICE_PROPERTY: &str = "service";

/// A generic, key ordered JSON document.
#[derive(Debug, Eq, PartialEq, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(Map<String, Value>);

impl Document {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn from_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
		serde_json::from_slice(bytes)
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn get(&self, key: &str) -> Option<&Value> {
		self.0.get(key)
	}

	/// Canonical JSON bytes of the document.
	pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
		crate::canonical::to_canonical_vec(self)
	}

	pub fn as_map(&self) -> &Map<String, Value> {
		&self.0
	}
}

impl From<Map<String, Value>> for Document {
	fn from(value: Map<String, Value>) -> Self {
		Self(value)
	}
}

impl From<Document> for Value {
	fn from(value: Document) -> Self {
		Value::Object(value.0)
	}
}

/// The folded state of a DID at some point in its operation history.
///
/// Instances start out as [`ResolutionModel::default`] and are replaced, never
/// mutated, by every operation that the [`Applier`](crate::Applier) accepts.
#[derive(Debug, Eq, PartialEq, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionModel {
	pub document: Document,
	/// Commits to the next recovery key. `None` before create and after
	/// deactivate.
	pub recovery_commitment: Option<String>,
	/// Commits to the next update key. `None` before create, after deactivate,
	/// or once a delta without a valid next commitment spent the previous one.
	pub update_commitment: Option<String>,
	pub deactivated: bool,
	pub last_operation_transaction_time: u64,
	pub last_operation_transaction_number: u64,
}

impl ResolutionModel {
	/// True until a create operation has been applied.
	pub fn is_empty(&self) -> bool {
		self.document.is_empty()
			&& self.recovery_commitment.is_none()
			&& self.update_commitment.is_none()
			&& !self.deactivated
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn test_emptiness() {
		let mut rm = ResolutionModel::default();
		assert!(rm.is_empty());

		rm.recovery_commitment = Some("commitment".into());
		assert!(!rm.is_empty(), "a blanked document with commitments exists");

		let deactivated = ResolutionModel {
			deactivated: true,
			..Default::default()
		};
		assert!(!deactivated.is_empty());
	}

	#[test]
	fn test_document_bytes_are_canonical() {
		let doc = Document::from_json(br#"{"z": 1, "publicKey": []}"#).unwrap();
		assert_eq!(doc.to_bytes().unwrap(), br#"{"publicKey":[],"z":1}"#);
		assert_eq!(doc.get("z"), Some(&Value::from(1)));
	}
}
