use std::sync::Arc;

use ed25519_dalek::SigningKey;
use serde_json::{json, Value};
use sidetree_core::{
	client, commitment,
	composer::PatchComposer,
	jws::{Ed25519Signer, Signer as _},
	operation::{OperationRequest, OperationType},
	AnchoredOperation, Applier, OperationError, Protocol, ResolutionModel,
};

fn signer(seed: u8) -> Ed25519Signer {
	Ed25519Signer::new(SigningKey::from_bytes(&[seed; 32]), None)
}

fn commit(seed: u8) -> String {
	let p = Protocol::default();
	commitment::calculate(&signer(seed).public_jwk(), p.multihash_algorithm, p.hash_algorithm)
		.unwrap()
}

fn anchored(
	request: &OperationRequest,
	ty: OperationType,
	suffix: &str,
	number: u64,
) -> AnchoredOperation {
	AnchoredOperation {
		operation_type: ty,
		unique_suffix: suffix.to_owned(),
		operation_buffer: request.to_bytes().unwrap(),
		transaction_time: 1_000 + number,
		transaction_number: number,
	}
}

const R0: u8 = 10;
const U0: u8 = 20;
const U1: u8 = 21;
const U2: u8 = 22;

#[test]
fn test_create_update_replay() -> eyre::Result<()> {
	let p = Protocol::default();
	let applier = Applier::new(p.clone(), Arc::new(PatchComposer));
	let k1 = json!({"id": "k1", "type": "JsonWebKey2020", "purposes": ["authentication"]});

	let create = client::create_request(
		&p,
		vec![json!({"action": "replace", "document": {"publicKeys": [k1.clone()]}})],
		&commit(R0),
		&commit(U0),
	)?;
	let suffix = client::unique_suffix(&p, &create)?;
	let rm = applier.apply(
		&anchored(&create, OperationType::Create, &suffix, 1),
		&ResolutionModel::default(),
	)?;
	assert_eq!(Value::from(rm.document.clone()), json!({"publicKey": [k1]}));
	assert_eq!(rm.update_commitment, Some(commit(U0)));
	assert_eq!(rm.recovery_commitment, Some(commit(R0)));

	let update = client::update_request(
		&p,
		&suffix,
		vec![json!({"action": "ietf-json-patch", "patches": [
			{"op": "replace", "path": "/publicKey/0/type", "value": "Ed25519VerificationKey2020"},
		]})],
		&signer(U0),
		&commit(U1),
	)?;
	let rm = applier.apply(&anchored(&update, OperationType::Update, &suffix, 2), &rm)?;
	assert_eq!(rm.document.get("publicKey").unwrap()[0]["type"], "Ed25519VerificationKey2020");
	assert_eq!(rm.update_commitment, Some(commit(U1)));
	assert_eq!(rm.last_operation_transaction_number, 2);

	let replay = client::update_request(
		&p,
		&suffix,
		vec![json!({"action": "remove-public-keys", "ids": ["k1"]})],
		&signer(U0),
		&commit(U2),
	)?;
	let err = applier
		.apply(&anchored(&replay, OperationType::Update, &suffix, 3), &rm)
		.unwrap_err();
	assert!(matches!(err, OperationError::CommitmentMismatch), "{err}");
	Ok(())
}

/// Folds operations the way a resolver would: rejected operations are skipped
/// and the previous state is kept.
fn resolve(applier: &Applier, ops: &[AnchoredOperation]) -> (ResolutionModel, usize) {
	let mut rm = ResolutionModel::default();
	let mut rejected = 0;
	for op in ops {
		match applier.apply(op, &rm) {
			Ok(next) => rm = next,
			Err(_) => rejected += 1,
		}
	}
	(rm, rejected)
}

#[test]
fn test_fold_skips_invalid_operations() -> eyre::Result<()> {
	let p = Protocol::default();
	let applier = Applier::new(p.clone(), Arc::new(PatchComposer));
	let add = |id: &str| json!({"action": "add-services", "services": [{"id": id, "type": "T"}]});

	let create = client::create_request(&p, vec![add("s0")], &commit(R0), &commit(U0))?;
	let suffix = client::unique_suffix(&p, &create)?;
	let forged = client::update_request(&p, &suffix, vec![add("evil")], &signer(99), &commit(U1))?;
	let update = client::update_request(&p, &suffix, vec![add("s1")], &signer(U0), &commit(U1))?;
	let early_update =
		client::update_request(&p, "other", vec![add("x")], &signer(U0), &commit(U1))?;
	let deactivate = client::deactivate_request(&suffix, &signer(R0))?;
	let after = client::update_request(&p, &suffix, vec![add("s2")], &signer(U1), &commit(U2))?;

	let ops = [
		anchored(&early_update, OperationType::Update, "other", 0),
		anchored(&create, OperationType::Create, &suffix, 1),
		anchored(&create, OperationType::Create, &suffix, 2),
		anchored(&forged, OperationType::Update, &suffix, 3),
		anchored(&update, OperationType::Update, &suffix, 4),
	];
	let (rm, rejected) = resolve(&applier, &ops[1..]);
	assert_eq!(rejected, 2);
	assert_eq!(rm.document.get("service").unwrap().as_array().unwrap().len(), 2);
	assert_eq!(rm.last_operation_transaction_number, 4);

	// The early update targets a DID that was never created.
	let (rm, rejected) = resolve(&applier, &ops[..1]);
	assert_eq!((rm, rejected), (ResolutionModel::default(), 1));

	let mut ops = ops.to_vec();
	ops.push(anchored(&deactivate, OperationType::Deactivate, &suffix, 5));
	ops.push(anchored(&after, OperationType::Update, &suffix, 6));
	let (rm, rejected) = resolve(&applier, &ops[1..]);
	assert_eq!(rejected, 3);
	assert!(rm.deactivated);
	assert!(rm.document.is_empty());
	assert_eq!(rm.last_operation_transaction_number, 5);
	Ok(())
}
