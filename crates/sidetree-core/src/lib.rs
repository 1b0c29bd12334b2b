//! The core of a [Sidetree][spec] style DID method.
//!
//! A Sidetree DID is not stored anywhere directly. Instead, its document is the
//! result of folding a chain of signed operations (create, update, recover and
//! deactivate) that were anchored on some external, untrusted ledger. Anyone can
//! anchor anything, so every node must independently decide which operations in
//! the chain are valid, and they must all arrive at the same answer.
//!
//! This crate provides the deterministic pieces of that process:
//!
//! - [`commitment`]: the hash commitment / reveal scheme that makes each key
//!   single use.
//! - [`operation`]: parsing raw operation requests into typed models.
//! - [`applier`]: the state machine that folds one anchored operation into a
//!   [`ResolutionModel`](document::ResolutionModel).
//! - [`batch`]: grouping queued operations into content addressed chunk, map and
//!   anchor files.
//!
//! The document composer, content addressable storage and compression are
//! consumed through the traits in [`composer`], [`cas`] and [`compression`].
//!
//! [spec]: https://identity.foundation/sidetree/spec/

#![forbid(unsafe_code)]

pub mod applier;
pub mod batch;
pub mod canonical;
pub mod cas;
pub mod client;
pub mod commitment;
pub mod composer;
pub mod compression;
pub mod document;
pub mod jwk;
pub mod jws;
pub mod multihash;
pub mod operation;
pub mod protocol;

mod varint;

// Re-exports
pub use jose_jwk;

pub use crate::{
	applier::Applier,
	batch::{AnchorData, OperationHandler},
	document::{Document, ResolutionModel},
	operation::{AnchoredOperation, Operation, OperationError, OperationParser},
	protocol::Protocol,
};
