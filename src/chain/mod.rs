//! Chain module - the seam between the engine and chain-specific code
//!
//! This module provides:
//! - The [`ChainSpec`] trait implemented once per chain family, carrying the
//!   chain-native instruction and header types plus the canonical signable
//!   encoding
//! - The narrow collaborator traits the lifecycle consumes: [`NodeClient`]
//!   for broadcast/chain-info and [`KeySigner`] for signing and signer
//!   recovery
//! - Shared value types (addresses, signatures, chain info) that are opaque
//!   to the engine outside the chain module that produced them

pub mod normalizer;

use crate::error::EngineResult;
use crate::tx::MultisigRequirement;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use std::fmt;

/// Chain account or contract identifier.
///
/// The engine treats addresses as opaque ordered strings; format validation
/// belongs to the chain module that mints them.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Opaque handle to private key material.
///
/// The engine never inspects key bytes; the [`KeySigner`] collaborator owns
/// the mapping from handle to actual key.
#[derive(Clone, PartialEq, Eq)]
pub struct PrivateKey(String);

impl PrivateKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Key handles may embed material; never log them.
        f.write_str("PrivateKey(..)")
    }
}

/// Chain-native signature value, opaque to the engine.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Signature(Vec<u8>);

impl Signature {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", hex::encode(&self.0))
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.0))
    }
}

/// A signature together with the signer it recovers to or is claimed by.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachedSignature {
    pub signer: Address,
    pub signature: Signature,
}

/// Head-of-chain material fetched from a node before signing.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChainInfo {
    pub chain_id: String,
    pub head_block_number: u64,
    pub head_block_id: String,
    pub head_block_time: DateTime<Utc>,
    /// Suggested fee per unit in the chain's smallest denomination, when the
    /// node reports one.
    pub suggested_fee: Option<u128>,
}

/// Block reference for lookups.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BlockRef {
    Number(u64),
    Id(String),
}

/// Minimal block facts the engine needs for header derivation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BlockSummary {
    pub number: u64,
    pub id: String,
    pub time: DateTime<Utc>,
}

/// Broadcast result, passed through from the node unchanged.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TxResult {
    pub transaction_id: String,
    pub block_number: Option<u64>,
    /// Raw node response payload.
    pub payload: serde_json::Value,
}

/// On-chain inclusion status of a broadcast transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TxStatus {
    Pending,
    Confirmed { block_number: u64 },
    Failed { reason: String },
    Unknown,
}

/// Error surfaced by a [`NodeClient`] collaborator.
///
/// Carries the node's error name and message verbatim so the normalizer can
/// synthesize its search string and the original payload survives into the
/// final [`EngineError`](crate::error::EngineError).
#[derive(Clone, Debug, thiserror::Error)]
#[error("{message}")]
pub struct NodeError {
    pub name: Option<String>,
    pub message: String,
}

impl NodeError {
    pub fn new(name: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            name: name.map(str::to_string),
            message: message.into(),
        }
    }

    /// Search string for the error normalizer: `name + message` when a name
    /// is present, otherwise the message alone.
    pub fn search_text(&self) -> String {
        match &self.name {
            Some(name) => format!("{} {}", name, self.message),
            None => self.message.clone(),
        }
    }
}

/// One chain family: native instruction/header types plus the canonical
/// signable encoding and semantic validation.
///
/// Implementations are stateless apart from construction-time options and
/// are shared read-only across transaction lifecycles.
pub trait ChainSpec: Send + Sync + 'static {
    /// Chain-native representation of one elementary operation.
    type Instruction: Clone + fmt::Debug + Send + Sync;
    /// Chain-specific transaction header (expiration/sequencing fields).
    type Header: Clone + fmt::Debug + Send + Sync;

    /// Chain family identifier, e.g. "eosio".
    fn id(&self) -> &'static str;

    /// Derive header material (expiration window, reference block, fees)
    /// from current chain info.
    fn make_header(&self, info: &ChainInfo) -> EngineResult<Self::Header>;

    /// Compute the canonical signable byte sequence for header + actions.
    fn encode_signable(
        &self,
        header: &Self::Header,
        actions: &[Self::Instruction],
    ) -> EngineResult<Vec<u8>>;

    /// Decode a previously encoded body back into header + actions
    /// (co-signing entry point).
    fn decode_raw(&self, raw: &[u8]) -> EngineResult<(Self::Header, Vec<Self::Instruction>)>;

    /// Chain-specific semantic checks run by
    /// [`Transaction::validate`](crate::tx::Transaction::validate).
    fn validate(
        &self,
        header: &Self::Header,
        actions: &[Self::Instruction],
        multisig: Option<&MultisigRequirement>,
    ) -> EngineResult<()>;

    /// Whether this chain rejects a redundant signature from an
    /// already-collected signer instead of treating it as a no-op.
    fn forbids_redundant_signing(&self) -> bool {
        false
    }
}

/// Broadcast/RPC collaborator.
///
/// The lifecycle calls this only from `prepare_to_be_signed` (header
/// material), `send` and confirmation polling. Transport internals are out
/// of scope for the engine.
#[async_trait]
pub trait NodeClient: Send + Sync {
    async fn chain_info(&self) -> Result<ChainInfo, NodeError>;

    async fn get_block(&self, reference: BlockRef) -> Result<BlockSummary, NodeError>;

    /// Serialize and broadcast a signed transaction, returning the node's
    /// result unchanged.
    async fn broadcast(
        &self,
        raw: &[u8],
        signatures: &[AttachedSignature],
    ) -> Result<TxResult, NodeError>;

    async fn transaction_status(&self, transaction_id: &str) -> Result<TxStatus, NodeError>;
}

/// Cryptographic signer/verifier collaborator.
#[cfg_attr(test, mockall::automock)]
pub trait KeySigner: Send + Sync {
    /// Sign the signable buffer with the given key.
    fn sign(&self, message: &[u8], key: &PrivateKey) -> EngineResult<Signature>;

    /// Address the given key signs for.
    fn address_of(&self, key: &PrivateKey) -> EngineResult<Address>;

    /// Recover the signer address from a signature over the buffer.
    fn recover(&self, signature: &Signature, message: &[u8]) -> EngineResult<Address>;
}

/// Keccak-256 digest of a signable body, hex-encoded.
///
/// Used as the engine-side identity of a prepared body for logging and
/// stale-signature detection; chain-level transaction ids come from the
/// node at broadcast time.
pub fn body_digest(raw: &[u8]) -> String {
    let mut hasher = Keccak256::new();
    hasher.update(raw);
    hex::encode(hasher.finalize())
}
