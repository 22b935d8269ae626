//! Error types for the chainspan engine

use crate::action::ActionKind;
use crate::chain::normalizer::ChainErrorKind;
use crate::chain::Address;
use crate::tx::TxState;

use thiserror::Error;

/// Main error type for the engine
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("unsupported action type {kind} on chain {chain}")]
    UnsupportedActionType {
        chain: &'static str,
        kind: ActionKind,
    },

    #[error("invalid params for {kind}: {message}")]
    InvalidParams { kind: ActionKind, message: String },

    #[error("transaction body cannot be mutated after signatures are attached")]
    MutationAfterSigning,

    #[error("transaction has no actions")]
    NoActionsPresent,

    #[error("transaction has not been validated")]
    NotValidated,

    #[error("operation {operation} is not allowed in state {state}")]
    InvalidState {
        state: TxState,
        operation: &'static str,
    },

    #[error("missing {missing} of {required} required signatures")]
    MissingSignature { missing: usize, required: usize },

    #[error("signer {0} is not in the required signer set")]
    UnknownSigner(Address),

    #[error("transaction is already fully signed")]
    AlreadyFullySigned,

    #[error("multisig requirement is malformed: {0}")]
    InvalidMultisig(String),

    #[error("malformed raw transaction body: {0}")]
    InvalidRaw(String),

    #[error("failed to derive header material: {0}")]
    HeaderDerivation(String),

    #[error("transaction validation failed: {0}")]
    Validation(String),

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("chain error ({kind}): {message}")]
    Chain {
        kind: ChainErrorKind,
        message: String,
        /// Original node payload, preserved for debugging normalization
        /// fallthrough.
        raw: String,
    },

    #[error("timeout waiting for {operation}")]
    Timeout { operation: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

impl EngineError {
    /// Check if error is retryable by the caller.
    ///
    /// The engine never retries a broadcast itself; a blind retry can
    /// double-submit a transaction.
    pub fn is_retryable(&self) -> bool {
        match self {
            EngineError::Timeout { .. } => true,
            EngineError::Chain { kind, .. } => matches!(
                kind,
                ChainErrorKind::NodeUnavailable | ChainErrorKind::RateLimited
            ),
            _ => false,
        }
    }

    /// Error kind label for logging and metrics-style aggregation.
    pub fn kind_label(&self) -> &'static str {
        match self {
            EngineError::UnsupportedActionType { .. } => "unsupported_action_type",
            EngineError::InvalidParams { .. } => "invalid_params",
            EngineError::MutationAfterSigning => "mutation_after_signing",
            EngineError::NoActionsPresent => "no_actions_present",
            EngineError::NotValidated => "not_validated",
            EngineError::InvalidState { .. } => "invalid_state",
            EngineError::MissingSignature { .. } => "missing_signature",
            EngineError::UnknownSigner(_) => "unknown_signer",
            EngineError::AlreadyFullySigned => "already_fully_signed",
            EngineError::InvalidMultisig(_) => "invalid_multisig",
            EngineError::InvalidRaw(_) => "invalid_raw",
            EngineError::HeaderDerivation(_) => "header_derivation",
            EngineError::Validation(_) => "validation",
            EngineError::Signing(_) => "signing",
            EngineError::Chain { .. } => "chain",
            EngineError::Timeout { .. } => "timeout",
            EngineError::Config(_) => "config",
            EngineError::Encoding(_) => "encoding",
        }
    }
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
