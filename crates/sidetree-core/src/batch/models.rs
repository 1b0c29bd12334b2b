//! The chunk, map and anchor files that a batch is written as.
//!
//! Chunk files hold the deltas. Map files reference chunk files and carry the
//! signed data of updates. Anchor files reference the map file and carry
//! everything needed to validate creates, recovers and deactivates, so a node
//! can tell which DIDs a batch touches from the anchor file alone.

use serde::{Deserialize, Serialize};

use crate::operation::{DeltaModel, Operation, OperationKind, SuffixDataModel};

#[derive(Debug, Eq, PartialEq, Clone, Serialize, Deserialize)]
pub struct ChunkFile {
	pub deltas: Vec<DeltaModel>,
}

impl ChunkFile {
	/// Collects deltas in file order: creates, then recovers, then updates.
	pub fn new(ops: &[Operation]) -> Self {
		let creates = ops
			.iter()
			.filter(|op| matches!(op.kind, OperationKind::Create { .. }));
		let recovers = ops
			.iter()
			.filter(|op| matches!(op.kind, OperationKind::Recover { .. }));
		let updates = ops
			.iter()
			.filter(|op| matches!(op.kind, OperationKind::Update { .. }));
		let deltas = creates
			.chain(recovers)
			.chain(updates)
			.filter_map(Operation::delta)
			.cloned()
			.collect();
		Self { deltas }
	}
}

#[derive(Debug, Eq, PartialEq, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkReference {
	pub chunk_file_uri: String,
}

/// Points at an existing DID and carries the signed data of the operation.
#[derive(Debug, Eq, PartialEq, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedOperationReference {
	pub did_suffix: String,
	pub signed_data: String,
}

#[derive(Debug, Eq, PartialEq, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReference {
	pub suffix_data: SuffixDataModel,
}

#[derive(Debug, Eq, PartialEq, Clone, Default, Serialize, Deserialize)]
pub struct MapOperations {
	#[serde(skip_serializing_if = "Vec::is_empty", default)]
	pub update: Vec<SignedOperationReference>,
}

impl MapOperations {
	pub fn is_empty(&self) -> bool {
		self.update.is_empty()
	}
}

#[derive(Debug, Eq, PartialEq, Clone, Serialize, Deserialize)]
pub struct MapFile {
	pub chunks: Vec<ChunkReference>,
	#[serde(skip_serializing_if = "MapOperations::is_empty", default)]
	pub operations: MapOperations,
}

impl MapFile {
	pub fn new(chunk_uris: impl IntoIterator<Item = String>, ops: &[Operation]) -> Self {
		Self {
			chunks: chunk_uris
				.into_iter()
				.map(|chunk_file_uri| ChunkReference { chunk_file_uri })
				.collect(),
			operations: MapOperations {
				update: signed_references(ops, |k| matches!(k, OperationKind::Update { .. })),
			},
		}
	}
}

#[derive(Debug, Eq, PartialEq, Clone, Default, Serialize, Deserialize)]
pub struct AnchorOperations {
	#[serde(skip_serializing_if = "Vec::is_empty", default)]
	pub create: Vec<CreateReference>,
	#[serde(skip_serializing_if = "Vec::is_empty", default)]
	pub recover: Vec<SignedOperationReference>,
	#[serde(skip_serializing_if = "Vec::is_empty", default)]
	pub deactivate: Vec<SignedOperationReference>,
}

#[derive(Debug, Eq, PartialEq, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchorFile {
	/// Absent when the batch holds only deactivates.
	#[serde(skip_serializing_if = "Option::is_none", default)]
	pub map_file_uri: Option<String>,
	pub operations: AnchorOperations,
}

impl AnchorFile {
	pub fn new(map_file_uri: Option<String>, ops: &[Operation]) -> Self {
		let create = ops
			.iter()
			.filter_map(|op| match &op.kind {
				OperationKind::Create { suffix_data, .. } => Some(CreateReference {
					suffix_data: suffix_data.clone(),
				}),
				_ => None,
			})
			.collect();
		Self {
			map_file_uri,
			operations: AnchorOperations {
				create,
				recover: signed_references(ops, |k| {
					matches!(k, OperationKind::Recover { .. })
				}),
				deactivate: signed_references(ops, |k| {
					matches!(k, OperationKind::Deactivate { .. })
				}),
			},
		}
	}

	pub fn operation_count(&self) -> usize {
		let ops = &self.operations;
		ops.create.len() + ops.recover.len() + ops.deactivate.len()
	}
}

fn signed_references(
	ops: &[Operation],
	include: impl Fn(&OperationKind) -> bool,
) -> Vec<SignedOperationReference> {
	ops.iter()
		.filter(|op| include(&op.kind))
		.filter_map(|op| {
			op.signed_data().map(|signed_data| SignedOperationReference {
				did_suffix: op.unique_suffix.clone(),
				signed_data: signed_data.to_owned(),
			})
		})
		.collect()
}

#[cfg(test)]
mod test {
	use serde_json::json;

	use super::*;

	fn delta(commitment: &str) -> DeltaModel {
		DeltaModel {
			patches: vec![json!({"action": "replace", "document": {}})],
			update_commitment: commitment.into(),
		}
	}

	fn op(suffix: &str, kind: OperationKind) -> Operation {
		Operation {
			namespace: "did:sidetree".into(),
			unique_suffix: suffix.into(),
			kind,
			operation_buffer: Vec::new(),
		}
	}

	fn mixed() -> Vec<Operation> {
		vec![
			op(
				"u",
				OperationKind::Update {
					signed_data: "update.jws.sig".into(),
					delta: Some(delta("u")),
				},
			),
			op(
				"d",
				OperationKind::Deactivate {
					signed_data: "deactivate.jws.sig".into(),
				},
			),
			op(
				"r",
				OperationKind::Recover {
					signed_data: "recover.jws.sig".into(),
					delta: Some(delta("r")),
				},
			),
			op(
				"c",
				OperationKind::Create {
					suffix_data: SuffixDataModel {
						delta_hash: "hash".into(),
						recovery_commitment: "rc".into(),
					},
					delta: Some(delta("c")),
				},
			),
		]
	}

	#[test]
	fn test_chunk_file_order() {
		let chunk = ChunkFile::new(&mixed());
		let order: Vec<&str> = chunk
			.deltas
			.iter()
			.map(|d| d.update_commitment.as_str())
			.collect();
		assert_eq!(order, ["c", "r", "u"]);
	}

	#[test]
	fn test_map_file() {
		let map = MapFile::new(["chunk-uri".to_owned()], &mixed());
		assert_eq!(
			serde_json::to_value(&map).unwrap(),
			json!({
				"chunks": [{"chunkFileUri": "chunk-uri"}],
				"operations": {"update": [{"didSuffix": "u", "signedData": "update.jws.sig"}]},
			})
		);
		let map = MapFile::new(["chunk-uri".to_owned()], &[]);
		assert_eq!(
			serde_json::to_value(&map).unwrap(),
			json!({"chunks": [{"chunkFileUri": "chunk-uri"}]})
		);
	}

	#[test]
	fn test_anchor_file() {
		let anchor = AnchorFile::new(Some("map-uri".into()), &mixed());
		assert_eq!(anchor.operation_count(), 3);
		assert_eq!(
			serde_json::to_value(&anchor).unwrap(),
			json!({
				"mapFileUri": "map-uri",
				"operations": {
					"create": [{"suffixData": {"deltaHash": "hash", "recoveryCommitment": "rc"}}],
					"recover": [{"didSuffix": "r", "signedData": "recover.jws.sig"}],
					"deactivate": [{"didSuffix": "d", "signedData": "deactivate.jws.sig"}],
				},
			})
		);

		let anchor = AnchorFile::new(None, &mixed()[1..2]);
		assert_eq!(
			serde_json::to_value(&anchor).unwrap(),
			json!({"operations": {"deactivate": [{"didSuffix": "d", "signedData": "deactivate.jws.sig"}]}})
		);
	}
}
