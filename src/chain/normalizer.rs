//! Chain error normalizer
//!
//! Maps opaque node error payloads onto a finite taxonomy using ordered,
//! first-match-wins regex lists. Tables are per-category because the same
//! surface substring means different things in different contexts ("not
//! found" is a missing block in the Block category and a missing account in
//! ChainState). Every list ends in a catch-all, so normalization always
//! produces a kind.

use crate::chain::NodeError;
use crate::error::EngineError;

use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;
use tracing::debug;

/// Normalized error kinds. Open-ended: chains map their own failures onto
/// this set, falling through to `UnknownError`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChainErrorKind {
    AuthInvalid,
    BlockDoesNotExist,
    TxNotFound,
    TxExceededResources,
    TxExpired,
    AccountDoesNotExist,
    ContractRejected,
    NodeUnavailable,
    RateLimited,
    UnknownError,
}

impl ChainErrorKind {
    /// Short human description of the kind.
    pub fn describe(&self) -> &'static str {
        match self {
            ChainErrorKind::AuthInvalid => "authorization is invalid or missing",
            ChainErrorKind::BlockDoesNotExist => "block does not exist",
            ChainErrorKind::TxNotFound => "transaction not found",
            ChainErrorKind::TxExceededResources => "transaction exceeded available resources",
            ChainErrorKind::TxExpired => "transaction expired",
            ChainErrorKind::AccountDoesNotExist => "account does not exist",
            ChainErrorKind::ContractRejected => "contract rejected the operation",
            ChainErrorKind::NodeUnavailable => "chain node is unavailable",
            ChainErrorKind::RateLimited => "request was rate limited",
            ChainErrorKind::UnknownError => "unrecognized chain error",
        }
    }
}

impl fmt::Display for ChainErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChainErrorKind::AuthInvalid => "AuthInvalid",
            ChainErrorKind::BlockDoesNotExist => "BlockDoesNotExist",
            ChainErrorKind::TxNotFound => "TxNotFound",
            ChainErrorKind::TxExceededResources => "TxExceededResources",
            ChainErrorKind::TxExpired => "TxExpired",
            ChainErrorKind::AccountDoesNotExist => "AccountDoesNotExist",
            ChainErrorKind::ContractRejected => "ContractRejected",
            ChainErrorKind::NodeUnavailable => "NodeUnavailable",
            ChainErrorKind::RateLimited => "RateLimited",
            ChainErrorKind::UnknownError => "UnknownError",
        };
        f.write_str(name)
    }
}

/// Failure category supplied by the caller to disambiguate reused
/// substrings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Block,
    Transaction,
    ChainState,
    Contract,
}

/// Result of normalization. The raw payload is preserved so a fallthrough
/// to `UnknownError` is still debuggable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NormalizedError {
    pub kind: ChainErrorKind,
    pub message: String,
    pub raw: String,
}

impl NormalizedError {
    pub fn into_engine(self) -> EngineError {
        EngineError::Chain {
            kind: self.kind,
            message: self.message,
            raw: self.raw,
        }
    }
}

type Rules = Vec<(ChainErrorKind, Regex)>;

fn rule(kind: ChainErrorKind, pattern: &str) -> (ChainErrorKind, Regex) {
    (kind, Regex::new(pattern).expect("static rule pattern"))
}

lazy_static! {
    static ref BLOCK_RULES: Rules = vec![
        rule(
            ChainErrorKind::BlockDoesNotExist,
            r"(?i)(block.*(not found|does not exist|unknown)|unknown block|could not find block)",
        ),
        rule(
            ChainErrorKind::NodeUnavailable,
            r"(?i)(connection|unavailable|timed? ?out|econnrefused)",
        ),
        rule(ChainErrorKind::UnknownError, r"(?s).*"),
    ];
    static ref TRANSACTION_RULES: Rules = vec![
        rule(
            ChainErrorKind::TxExceededResources,
            r"(?i)(insufficient funds|insufficient balance|exceeded|\bram\b|\bcpu\b|net usage|resource)",
        ),
        rule(ChainErrorKind::TxExpired, r"(?i)(expired|expiration|past the expiry)"),
        rule(
            ChainErrorKind::AuthInvalid,
            r"(?i)(unauthorized|missing.*(authority|signature)|invalid signature|signature.*invalid)",
        ),
        rule(
            ChainErrorKind::TxNotFound,
            r"(?i)(transaction|txn?|tx).*(not found|unknown)",
        ),
        rule(ChainErrorKind::RateLimited, r"(?i)(rate.?limit|too many requests)"),
        rule(ChainErrorKind::UnknownError, r"(?s).*"),
    ];
    static ref CHAIN_STATE_RULES: Rules = vec![
        rule(
            ChainErrorKind::AccountDoesNotExist,
            r"(?i)(account.*(not found|does not exist|unknown)|unknown account|no such account)",
        ),
        rule(
            ChainErrorKind::AuthInvalid,
            r"(?i)(unauthorized|permission|missing.*authority)",
        ),
        rule(
            ChainErrorKind::NodeUnavailable,
            r"(?i)(connection|unavailable|timed? ?out)",
        ),
        rule(ChainErrorKind::UnknownError, r"(?s).*"),
    ];
    static ref CONTRACT_RULES: Rules = vec![
        rule(
            ChainErrorKind::ContractRejected,
            r"(?i)(assert|revert|abort|eosio_assert|execution failed)",
        ),
        rule(
            ChainErrorKind::AuthInvalid,
            r"(?i)(unauthorized|missing.*authority|caller is not)",
        ),
        rule(ChainErrorKind::UnknownError, r"(?s).*"),
    ];
    static ref DEFAULT_RULES: Rules = vec![
        rule(
            ChainErrorKind::AuthInvalid,
            r"(?i)(unauthorized|invalid signature|missing.*(authority|signature))",
        ),
        rule(
            ChainErrorKind::NodeUnavailable,
            r"(?i)(connection refused|unavailable|timed? ?out|econnrefused|service down)",
        ),
        rule(ChainErrorKind::RateLimited, r"(?i)(rate.?limit|too many requests|429)"),
        rule(ChainErrorKind::TxExpired, r"(?i)(expired|expiration)"),
        rule(ChainErrorKind::UnknownError, r"(?s).*"),
    ];
}

fn rules_for(category: Option<ErrorCategory>) -> &'static Rules {
    match category {
        Some(ErrorCategory::Block) => &BLOCK_RULES,
        Some(ErrorCategory::Transaction) => &TRANSACTION_RULES,
        Some(ErrorCategory::ChainState) => &CHAIN_STATE_RULES,
        Some(ErrorCategory::Contract) => &CONTRACT_RULES,
        None => &DEFAULT_RULES,
    }
}

/// Normalize a raw error string against the category's ordered rule list.
///
/// First match wins; the trailing catch-all guarantees a result.
pub fn normalize(raw: &str, category: Option<ErrorCategory>) -> NormalizedError {
    let rules = rules_for(category);
    for (kind, pattern) in rules.iter() {
        if pattern.is_match(raw) {
            if *kind == ChainErrorKind::UnknownError {
                debug!(raw, ?category, "error fell through to catch-all");
            }
            return NormalizedError {
                kind: *kind,
                message: kind.describe().to_string(),
                raw: raw.to_string(),
            };
        }
    }
    // Unreachable: every table ends in a catch-all. Kept total anyway so a
    // malformed table cannot panic the caller.
    NormalizedError {
        kind: ChainErrorKind::UnknownError,
        message: ChainErrorKind::UnknownError.describe().to_string(),
        raw: raw.to_string(),
    }
}

/// Normalize a collaborator error, synthesizing the `name + message` search
/// string.
pub fn normalize_node_error(
    error: &NodeError,
    category: Option<ErrorCategory>,
) -> NormalizedError {
    normalize(&error.search_text(), category)
}
