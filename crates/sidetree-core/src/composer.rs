//! Applying delta patches to documents.
//!
//! The [`Applier`](crate::Applier) treats patches as opaque JSON and hands them
//! to a [`DocumentComposer`]. [`PatchComposer`] implements the standard patch
//! actions.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::document::{Document, PUBLIC_KEY_PROPERTY, SERVICE_PROPERTY};

/// Applies a sequence of patches to a document.
pub trait DocumentComposer: std::fmt::Debug + Send + Sync {
	/// Returns the patched document. `document` itself is never modified, so on
	/// error the caller still holds the unpatched value.
	fn apply_patches(
		&self,
		document: &Document,
		patches: &[Value],
	) -> Result<Document, ComposeError>;
}

/// A public key or service entry. Both are keyed by `id` and otherwise carry an
/// open set of properties.
#[derive(Debug, Eq, PartialEq, Clone, Serialize, Deserialize)]
pub struct Entry {
	pub id: String,
	#[serde(flatten)]
	pub properties: Map<String, Value>,
}

/// The state that the `replace` action resets a document to.
#[derive(Debug, Eq, PartialEq, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceDocument {
	#[serde(skip_serializing_if = "Option::is_none", default)]
	pub public_keys: Option<Vec<Entry>>,
	#[serde(skip_serializing_if = "Option::is_none", default)]
	pub services: Option<Vec<Entry>>,
}

/// A standard patch action.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum Patch {
	AddPublicKeys {
		#[serde(rename = "publicKeys")]
		public_keys: Vec<Entry>,
	},
	RemovePublicKeys {
		ids: Vec<String>,
	},
	AddServices {
		services: Vec<Entry>,
	},
	RemoveServices {
		ids: Vec<String>,
	},
	Replace {
		document: ReplaceDocument,
	},
	IetfJsonPatch {
		patches: json_patch::Patch,
	},
}

impl Patch {
	/// The `action` tag of a raw patch, if it has one.
	pub fn action_of(raw: &Value) -> Option<&str> {
		raw.get("action").and_then(Value::as_str)
	}
}

/// Implements the standard patch actions.
#[derive(Debug, Default, Clone, Copy)]
pub struct PatchComposer;

impl DocumentComposer for PatchComposer {
	fn apply_patches(
		&self,
		document: &Document,
		patches: &[Value],
	) -> Result<Document, ComposeError> {
		let mut doc = document.as_map().clone();
		for (idx, raw) in patches.iter().enumerate() {
			let patch: Patch = serde_json::from_value(raw.clone())
				.map_err(|source| ComposeError::InvalidPatch { idx, source })?;
			apply_patch(&mut doc, patch)?;
		}
		Ok(Document::from(doc))
	}
}

fn apply_patch(doc: &mut Map<String, Value>, patch: Patch) -> Result<(), ComposeError> {
	match patch {
		Patch::AddPublicKeys { public_keys } => {
			add_entries(doc, PUBLIC_KEY_PROPERTY, public_keys)
		}
		Patch::RemovePublicKeys { ids } => remove_entries(doc, PUBLIC_KEY_PROPERTY, &ids),
		Patch::AddServices { services } => add_entries(doc, SERVICE_PROPERTY, services),
		Patch::RemoveServices { ids } => remove_entries(doc, SERVICE_PROPERTY, &ids),
		Patch::Replace { document } => {
			doc.clear();
			if let Some(keys) = document.public_keys {
				add_entries(doc, PUBLIC_KEY_PROPERTY, keys)?;
			}
			if let Some(services) = document.services {
				add_entries(doc, SERVICE_PROPERTY, services)?;
			}
			Ok(())
		}
		Patch::IetfJsonPatch { patches } => {
			let mut value = Value::Object(std::mem::take(doc));
			json_patch::patch(&mut value, &patches.0)?;
			match value {
				Value::Object(map) => {
					*doc = map;
					Ok(())
				}
				_ => Err(ComposeError::NotAnObject),
			}
		}
	}
}

/// Adds entries to the list under `property`, replacing any with the same id.
fn add_entries(
	doc: &mut Map<String, Value>,
	property: &str,
	entries: Vec<Entry>,
) -> Result<(), ComposeError> {
	let mut existing = take_entries(doc, property)?;
	for entry in entries {
		match existing.iter_mut().find(|e| e.id == entry.id) {
			Some(slot) => *slot = entry,
			None => existing.push(entry),
		}
	}
	put_entries(doc, property, existing)
}

fn remove_entries(
	doc: &mut Map<String, Value>,
	property: &str,
	ids: &[String],
) -> Result<(), ComposeError> {
	let mut existing = take_entries(doc, property)?;
	existing.retain(|e| !ids.contains(&e.id));
	put_entries(doc, property, existing)
}

fn take_entries(
	doc: &mut Map<String, Value>,
	property: &str,
) -> Result<Vec<Entry>, ComposeError> {
	match doc.remove(property) {
		None => Ok(Vec::new()),
		Some(value) => serde_json::from_value(value).map_err(|source| {
			ComposeError::InvalidEntries {
				property: property.to_owned(),
				source,
			}
		}),
	}
}

fn put_entries(
	doc: &mut Map<String, Value>,
	property: &str,
	entries: Vec<Entry>,
) -> Result<(), ComposeError> {
	if entries.is_empty() {
		return Ok(());
	}
	let value = serde_json::to_value(entries).map_err(|source| {
		ComposeError::InvalidEntries {
			property: property.to_owned(),
			source,
		}
	})?;
	doc.insert(property.to_owned(), value);
	Ok(())
}

#[derive(thiserror::Error, Debug)]
pub enum ComposeError {
	#[error("patch {idx} is not a valid patch")]
	InvalidPatch {
		idx: usize,
		#[source]
		source: serde_json::Error,
	},
	#[error("document property {property:?} does not hold a list of entries")]
	InvalidEntries {
		property: String,
		#[source]
		source: serde_json::Error,
	},
	#[error("json patch failed")]
	JsonPatch(#[from] json_patch::PatchError),
	#[error("json patch turned the document into a non-object")]
	NotAnObject,
}

#[cfg(test)]
mod test {
	use super::*;
	use serde_json::json;

	fn apply(doc: Value, patches: Value) -> Result<Value, ComposeError> {
		let doc: Document = serde_json::from_value(doc).unwrap();
		let patches: Vec<Value> = serde_json::from_value(patches).unwrap();
		PatchComposer.apply_patches(&doc, &patches).map(Value::from)
	}

	#[test]
	fn test_add_and_remove_public_keys() {
		let doc = apply(
			json!({}),
			json!([
				{"action": "add-public-keys", "publicKeys": [
					{"id": "k1", "type": "JsonWebKey2020"},
					{"id": "k2", "type": "JsonWebKey2020"},
				]},
				{"action": "add-public-keys", "publicKeys": [
					{"id": "k1", "type": "Other"},
				]},
				{"action": "remove-public-keys", "ids": ["k2"]},
			]),
		)
		.unwrap();
		assert_eq!(doc, json!({"publicKey": [{"id": "k1", "type": "Other"}]}));

		let doc = apply(doc, json!([{"action": "remove-public-keys", "ids": ["k1"]}]))
			.unwrap();
		assert_eq!(doc, json!({}));
	}

	#[test]
	fn test_services() {
		let doc = apply(
			json!({}),
			json!([{"action": "add-services", "services": [
				{"id": "hub", "type": "IdentityHub", "serviceEndpoint": "https://example.com"}
			]}]),
		)
		.unwrap();
		assert_eq!(doc["service"][0]["serviceEndpoint"], "https://example.com");

		let doc =
			apply(doc, json!([{"action": "remove-services", "ids": ["hub"]}])).unwrap();
		assert_eq!(doc, json!({}));
	}

	#[test]
	fn test_replace() {
		let doc = apply(
			json!({"publicKey": [{"id": "old"}], "extra": true}),
			json!([{"action": "replace", "document": {
				"publicKeys": [{"id": "new"}],
				"services": [{"id": "svc", "type": "T"}],
			}}]),
		)
		.unwrap();
		assert_eq!(
			doc,
			json!({"publicKey": [{"id": "new"}], "service": [{"id": "svc", "type": "T"}]})
		);
	}

	#[test]
	fn test_ietf_json_patch() {
		let doc = apply(
			json!({"test": "special0"}),
			json!([{"action": "ietf-json-patch", "patches": [
				{"op": "replace", "path": "/test", "value": "special1"},
				{"op": "add", "path": "/other", "value": 1},
			]}]),
		)
		.unwrap();
		assert_eq!(doc, json!({"test": "special1", "other": 1}));

		let err = apply(
			json!({}),
			json!([{"action": "ietf-json-patch", "patches": [
				{"op": "remove", "path": "/missing"},
			]}]),
		)
		.unwrap_err();
		assert!(matches!(err, ComposeError::JsonPatch(_)), "{err:?}");
	}

	#[test]
	fn test_invalid_patches() {
		let err = apply(json!({}), json!([{"action": "explode"}])).unwrap_err();
		assert!(matches!(err, ComposeError::InvalidPatch { idx: 0, .. }));

		let err = apply(
			json!({"publicKey": "not a list"}),
			json!([{"action": "remove-public-keys", "ids": ["k1"]}]),
		)
		.unwrap_err();
		assert!(matches!(err, ComposeError::InvalidEntries { .. }));
	}

	#[test]
	fn test_input_is_untouched() {
		let doc: Document =
			serde_json::from_value(json!({"publicKey": [{"id": "k1"}]})).unwrap();
		let patches = vec![json!({"action": "remove-public-keys", "ids": ["k1"]})];
		let patched = PatchComposer.apply_patches(&doc, &patches).unwrap();
		assert!(patched.is_empty());
		assert_eq!(doc.get("publicKey").unwrap()[0]["id"], "k1");
	}
}
