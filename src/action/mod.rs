//! Chain-agnostic action model
//!
//! A logical action is an intent ("transfer value", "approve a token
//! spend") expressed independently of any chain. Per-chain codecs translate
//! these into native instructions and back; the parameter structs here are
//! the shared vocabulary both directions speak.

mod codec;
mod registry;

pub use codec::ActionCodec;
pub use registry::CodecRegistry;

use crate::chain::Address;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Chain-independent action identifier. Registry lookup key in the compose
/// direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ActionKind {
    ValueTransfer,
    TokenTransfer,
    TokenApprove,
    AccountCreate,
    AccountLinkAuth,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActionKind::ValueTransfer => "ValueTransfer",
            ActionKind::TokenTransfer => "TokenTransfer",
            ActionKind::TokenApprove => "TokenApprove",
            ActionKind::AccountCreate => "AccountCreate",
            ActionKind::AccountLinkAuth => "AccountLinkAuth",
        };
        f.write_str(name)
    }
}

/// Transfer of the chain's native value token.
///
/// `amount` is a decimal string; each chain documents whether it reads it
/// as whole-token decimals (EOS-style asset strings) or smallest-unit
/// integers (wei, microalgos, planck).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValueTransferParams {
    pub from: Address,
    pub to: Address,
    pub amount: String,
    pub symbol: Option<String>,
    pub memo: Option<String>,
}

/// Transfer of a contract-managed token.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TokenTransferParams {
    pub from: Address,
    pub to: Address,
    pub amount: String,
    pub symbol: Option<String>,
    /// Token contract account, mint or asset identifier; chain-specific
    /// default applies when absent.
    pub contract: Option<Address>,
    pub memo: Option<String>,
}

/// Approval for a spender to move tokens on the owner's behalf.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TokenApproveParams {
    pub from: Address,
    pub spender: Address,
    pub amount: String,
    pub symbol: Option<String>,
    pub contract: Option<Address>,
}

/// Creation of a new on-chain account, including the resource allocation
/// some chains require alongside it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AccountCreateParams {
    pub creator: Address,
    pub new_account: Address,
    pub owner_key: String,
    pub active_key: String,
    pub ram_bytes: Option<u64>,
    pub net_stake: Option<String>,
    pub cpu_stake: Option<String>,
}

/// Linking a permission to a specific contract action.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AccountLinkAuthParams {
    pub account: Address,
    pub contract: Address,
    pub action: String,
    pub permission: String,
}

/// Chain-agnostic action parameters, tagged by kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ActionParams {
    ValueTransfer(ValueTransferParams),
    TokenTransfer(TokenTransferParams),
    TokenApprove(TokenApproveParams),
    AccountCreate(AccountCreateParams),
    AccountLinkAuth(AccountLinkAuthParams),
}

impl ActionParams {
    pub fn kind(&self) -> ActionKind {
        match self {
            ActionParams::ValueTransfer(_) => ActionKind::ValueTransfer,
            ActionParams::TokenTransfer(_) => ActionKind::TokenTransfer,
            ActionParams::TokenApprove(_) => ActionKind::TokenApprove,
            ActionParams::AccountCreate(_) => ActionKind::AccountCreate,
            ActionParams::AccountLinkAuth(_) => ActionKind::AccountLinkAuth,
        }
    }
}

/// One plausible interpretation of a native instruction.
#[derive(Clone, Debug, PartialEq)]
pub struct Decomposed {
    pub kind: ActionKind,
    pub args: ActionParams,
    /// True when the instruction's shape was recognized but some semantic
    /// fields could not be recovered (e.g. the signing authority of an
    /// instruction carrying several authorization entries). A lossy
    /// decompose, not an error.
    pub partial: bool,
}
