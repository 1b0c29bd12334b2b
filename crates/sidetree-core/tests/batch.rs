use std::sync::Arc;

use ed25519_dalek::SigningKey;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use sidetree_core::{
	batch::models::{AnchorFile, ChunkFile, MapFile},
	cas::{CasClient as _, MemoryCas},
	client, commitment,
	compression::{CompressionProvider, Compressor as _},
	jws::{Ed25519Signer, Signer as _},
	operation::{OperationRequest, QueuedOperation},
	protocol::GZIP,
	AnchorData, OperationHandler, Protocol,
};

const NS: &str = "did:sidetree";

fn signer(seed: u8) -> Ed25519Signer {
	Ed25519Signer::new(SigningKey::from_bytes(&[seed; 32]), None)
}

fn commit(seed: u8) -> String {
	let p = Protocol::default();
	commitment::calculate(&signer(seed).public_jwk(), p.multihash_algorithm, p.hash_algorithm)
		.unwrap()
}

fn queued(request: &OperationRequest) -> QueuedOperation {
	QueuedOperation {
		namespace: NS.to_owned(),
		operation_buffer: request.to_bytes().unwrap(),
	}
}

fn patch(id: &str) -> Vec<Value> {
	vec![json!({"action": "add-public-keys", "publicKeys": [{"id": id, "type": "JsonWebKey2020"}]})]
}

fn read_file<T: DeserializeOwned>(cas: &MemoryCas, address: &str) -> T {
	let compressed = cas.read(address).unwrap();
	let bytes = CompressionProvider.decompress(GZIP, &compressed).unwrap();
	serde_json::from_slice(&bytes).unwrap()
}

fn setup() -> (MemoryCas, OperationHandler) {
	let cas = MemoryCas::new();
	let handler = OperationHandler::new(
		Protocol::default(),
		Arc::new(cas.clone()),
		Arc::new(CompressionProvider),
	);
	(cas, handler)
}

#[test]
fn test_mixed_batch() -> eyre::Result<()> {
	let p = Protocol::default();
	let (cas, handler) = setup();

	let create = client::create_request(&p, patch("c"), &commit(1), &commit(2))?;
	let update = client::update_request(&p, "did-u", patch("u"), &signer(3), &commit(4))?;
	let recover =
		client::recover_request(&p, "did-r", patch("r"), &signer(5), &commit(6), &commit(7))?;
	let deactivate = client::deactivate_request("did-d", &signer(8))?;
	let ops = [&update, &deactivate, &create, &recover].map(queued);

	let anchor: AnchorData = handler.prepare_batch(&ops)?.parse()?;
	assert_eq!(anchor.number_of_operations, 4);
	assert_eq!(cas.len(), 3);

	let anchor_file: AnchorFile = read_file(&cas, &anchor.anchor_address);
	assert_eq!(anchor_file.operation_count(), 3);
	assert_eq!(anchor_file.operations.deactivate[0].did_suffix, "did-d");
	assert_eq!(anchor_file.operations.recover[0].did_suffix, "did-r");

	let map_file: MapFile = read_file(&cas, anchor_file.map_file_uri.as_deref().unwrap());
	assert_eq!(map_file.chunks.len(), 1);
	assert_eq!(map_file.operations.update[0].did_suffix, "did-u");

	let chunk_file: ChunkFile = read_file(&cas, &map_file.chunks[0].chunk_file_uri);
	let order: Vec<&str> = chunk_file
		.deltas
		.iter()
		.map(|d| d.update_commitment.as_str())
		.collect();
	assert_eq!(order, [commit(2), commit(7), commit(4)]);
	Ok(())
}

#[test]
fn test_deterministic_addresses() -> eyre::Result<()> {
	let p = Protocol::default();
	let create = client::create_request(&p, patch("c"), &commit(1), &commit(2))?;
	let (_, a) = setup();
	let (_, b) = setup();
	assert_eq!(
		a.prepare_batch(&[queued(&create)])?,
		b.prepare_batch(&[queued(&create)])?
	);
	Ok(())
}

#[test]
fn test_duplicate_suffixes_are_dropped() -> eyre::Result<()> {
	let p = Protocol::default();
	let (cas, handler) = setup();

	let first = client::update_request(&p, "did-1", patch("first"), &signer(3), &commit(4))?;
	let second = client::update_request(&p, "did-1", patch("second"), &signer(3), &commit(5))?;
	let deactivate = client::deactivate_request("did-1", &signer(8))?;
	let other = client::update_request(&p, "did-2", patch("other"), &signer(3), &commit(4))?;
	let ops = [&first, &second, &deactivate, &other].map(queued);

	let anchor: AnchorData = handler.prepare_batch(&ops)?.parse()?;
	assert_eq!(anchor.number_of_operations, 2);

	let anchor_file: AnchorFile = read_file(&cas, &anchor.anchor_address);
	assert!(anchor_file.operations.deactivate.is_empty());
	let map_file: MapFile = read_file(&cas, anchor_file.map_file_uri.as_deref().unwrap());
	let suffixes: Vec<&str> = map_file
		.operations
		.update
		.iter()
		.map(|u| u.did_suffix.as_str())
		.collect();
	assert_eq!(suffixes, ["did-1", "did-2"]);

	let chunk_file: ChunkFile = read_file(&cas, &map_file.chunks[0].chunk_file_uri);
	assert_eq!(chunk_file.deltas.len(), 2);
	assert_eq!(chunk_file.deltas[0].patches, patch("first"));
	Ok(())
}

#[test]
fn test_all_deactivate_batch() -> eyre::Result<()> {
	let (cas, handler) = setup();
	let ops = ["did-1", "did-2", "did-3"]
		.map(|suffix| queued(&client::deactivate_request(suffix, &signer(8)).unwrap()));

	let anchor: AnchorData = handler.prepare_batch(&ops)?.parse()?;
	assert_eq!(anchor.number_of_operations, 3);
	assert_eq!(cas.len(), 1, "only the anchor file is written");

	let anchor_file: AnchorFile = read_file(&cas, &anchor.anchor_address);
	assert_eq!(anchor_file.map_file_uri, None);
	assert_eq!(anchor_file.operations.deactivate.len(), 3);
	Ok(())
}
