//! Chainspan - chain-agnostic transaction composition and lifecycle engine
//!
//! This crate provides:
//! - An action codec registry translating chain-agnostic action parameters
//!   into chain-native instructions and back
//! - An ambiguity-tolerant decomposer that reports every plausible
//!   interpretation of a native instruction
//! - A transaction lifecycle state machine (compose, prepare, validate,
//!   sign, send) with multi-signature coordination
//! - A chain error normalizer mapping opaque node errors onto a finite
//!   taxonomy via ordered per-category regex tables
//!
//! Network transport, key storage and raw cryptographic primitives are
//! consumed through the narrow collaborator traits in [`chain`]
//! ([`NodeClient`], [`KeySigner`]) and are not implemented here.

pub mod action;
pub mod chain;
pub mod chains;
pub mod config;
pub mod error;
pub mod tx;

pub use action::{
    ActionCodec, ActionKind, ActionParams, CodecRegistry, Decomposed,
};
pub use chain::{
    Address, AttachedSignature, BlockRef, BlockSummary, ChainInfo, ChainSpec, KeySigner,
    NodeClient, NodeError, PrivateKey, Signature, TxResult, TxStatus,
};
pub use chain::normalizer::{ChainErrorKind, ErrorCategory, NormalizedError};
pub use config::Settings;
pub use error::{EngineError, EngineResult};
pub use tx::{ConfirmationPoller, MultisigRequirement, Transaction, TxState};
