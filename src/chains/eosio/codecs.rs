//! Action codecs for the EOS-style chain

use super::{
    format_quantity, is_valid_account_name, parse_quantity, sole_authorization, EosAction,
    EosChain, EosPermission,
};
use crate::action::{
    AccountCreateParams, AccountLinkAuthParams, ActionCodec, ActionKind, ActionParams,
    CodecRegistry, Decomposed, TokenApproveParams, TokenTransferParams, ValueTransferParams,
};
use crate::chain::Address;
use crate::error::{EngineError, EngineResult};

use lazy_static::lazy_static;
use serde_json::json;

/// System token contract.
const SYSTEM_TOKEN_ACCOUNT: &str = "eosio.token";
/// System account owning account-lifecycle actions.
const SYSTEM_ACCOUNT: &str = "eosio";
/// Native value symbol.
const SYSTEM_SYMBOL: &str = "EOS";

const DEFAULT_RAM_BYTES: u64 = 4096;
const DEFAULT_STAKE: &str = "0.1000";

lazy_static! {
    static ref REGISTRY: CodecRegistry<EosChain> = {
        let mut registry = CodecRegistry::new("eosio");
        registry.register(ValueTransferCodec);
        registry.register(TokenTransferCodec);
        registry.register(TokenApproveCodec);
        registry.register(AccountCreateCodec);
        registry.register(AccountLinkAuthCodec);
        registry
    };
}

/// Process-wide codec registry for the EOS-style chain.
pub fn registry() -> &'static CodecRegistry<EosChain> {
    &REGISTRY
}

fn invalid(kind: ActionKind, message: impl Into<String>) -> EngineError {
    EngineError::InvalidParams {
        kind,
        message: message.into(),
    }
}

fn require_account(kind: ActionKind, field: &str, value: &Address) -> EngineResult<()> {
    if !is_valid_account_name(value.as_str()) {
        return Err(invalid(kind, format!("{field} is not a valid account name: {value}")));
    }
    Ok(())
}

fn data_str<'a>(data: &'a serde_json::Value, field: &str) -> Option<&'a str> {
    data.get(field).and_then(|v| v.as_str())
}

/// Transfer of the native value token through the system token contract.
struct ValueTransferCodec;

impl ActionCodec<EosChain> for ValueTransferCodec {
    fn kind(&self) -> ActionKind {
        ActionKind::ValueTransfer
    }

    fn compose(&self, params: &ActionParams) -> EngineResult<Vec<EosAction>> {
        let ActionParams::ValueTransfer(p) = params else {
            return Err(invalid(self.kind(), "expected ValueTransfer params"));
        };
        require_account(self.kind(), "from", &p.from)?;
        require_account(self.kind(), "to", &p.to)?;
        let symbol = p.symbol.as_deref().unwrap_or(SYSTEM_SYMBOL);
        let quantity = format_quantity(&p.amount, symbol)
            .map_err(|e| invalid(self.kind(), e.to_string()))?;

        Ok(vec![EosAction {
            account: Address::new(SYSTEM_TOKEN_ACCOUNT),
            name: "transfer".to_string(),
            authorization: vec![EosPermission::active(&p.from)],
            data: json!({
                "from": p.from.as_str(),
                "to": p.to.as_str(),
                "quantity": quantity,
                "memo": p.memo.clone().unwrap_or_default(),
            }),
        }])
    }

    fn decompose(&self, instruction: &EosAction) -> Option<Decomposed> {
        if instruction.account.as_str() != SYSTEM_TOKEN_ACCOUNT
            || instruction.name != "transfer"
        {
            return None;
        }
        let from = data_str(&instruction.data, "from")?;
        let to = data_str(&instruction.data, "to")?;
        let (amount, symbol) = parse_quantity(data_str(&instruction.data, "quantity")?)?;
        let memo = data_str(&instruction.data, "memo")
            .filter(|m| !m.is_empty())
            .map(str::to_string);

        Some(Decomposed {
            kind: self.kind(),
            args: ActionParams::ValueTransfer(ValueTransferParams {
                from: Address::new(from),
                to: Address::new(to),
                amount,
                symbol: Some(symbol),
                memo,
            }),
            partial: sole_authorization(&instruction.authorization).is_none(),
        })
    }
}

/// Transfer on an arbitrary token contract. A system-token transfer also
/// satisfies this decomposer - the ambiguity is deliberate, and callers
/// disambiguate by contract.
struct TokenTransferCodec;

impl ActionCodec<EosChain> for TokenTransferCodec {
    fn kind(&self) -> ActionKind {
        ActionKind::TokenTransfer
    }

    fn compose(&self, params: &ActionParams) -> EngineResult<Vec<EosAction>> {
        let ActionParams::TokenTransfer(p) = params else {
            return Err(invalid(self.kind(), "expected TokenTransfer params"));
        };
        require_account(self.kind(), "from", &p.from)?;
        require_account(self.kind(), "to", &p.to)?;
        let contract = p
            .contract
            .clone()
            .unwrap_or_else(|| Address::new(SYSTEM_TOKEN_ACCOUNT));
        require_account(self.kind(), "contract", &contract)?;
        let symbol = p.symbol.as_deref().unwrap_or(SYSTEM_SYMBOL);
        let quantity = format_quantity(&p.amount, symbol)
            .map_err(|e| invalid(self.kind(), e.to_string()))?;

        Ok(vec![EosAction {
            account: contract,
            name: "transfer".to_string(),
            authorization: vec![EosPermission::active(&p.from)],
            data: json!({
                "from": p.from.as_str(),
                "to": p.to.as_str(),
                "quantity": quantity,
                "memo": p.memo.clone().unwrap_or_default(),
            }),
        }])
    }

    fn decompose(&self, instruction: &EosAction) -> Option<Decomposed> {
        if instruction.name != "transfer" {
            return None;
        }
        let from = data_str(&instruction.data, "from")?;
        let to = data_str(&instruction.data, "to")?;
        let (amount, symbol) = parse_quantity(data_str(&instruction.data, "quantity")?)?;
        let memo = data_str(&instruction.data, "memo")
            .filter(|m| !m.is_empty())
            .map(str::to_string);

        Some(Decomposed {
            kind: self.kind(),
            args: ActionParams::TokenTransfer(TokenTransferParams {
                from: Address::new(from),
                to: Address::new(to),
                amount,
                symbol: Some(symbol),
                contract: Some(instruction.account.clone()),
                memo,
            }),
            partial: sole_authorization(&instruction.authorization).is_none(),
        })
    }
}

/// Approval for a spender on a token contract.
struct TokenApproveCodec;

impl ActionCodec<EosChain> for TokenApproveCodec {
    fn kind(&self) -> ActionKind {
        ActionKind::TokenApprove
    }

    fn compose(&self, params: &ActionParams) -> EngineResult<Vec<EosAction>> {
        let ActionParams::TokenApprove(p) = params else {
            return Err(invalid(self.kind(), "expected TokenApprove params"));
        };
        require_account(self.kind(), "from", &p.from)?;
        require_account(self.kind(), "spender", &p.spender)?;
        let contract = p
            .contract
            .clone()
            .ok_or_else(|| invalid(self.kind(), "token contract is required"))?;
        require_account(self.kind(), "contract", &contract)?;
        let symbol = p.symbol.as_deref().unwrap_or(SYSTEM_SYMBOL);
        let quantity = format_quantity(&p.amount, symbol)
            .map_err(|e| invalid(self.kind(), e.to_string()))?;

        Ok(vec![EosAction {
            account: contract,
            name: "approve".to_string(),
            authorization: vec![EosPermission::active(&p.from)],
            data: json!({
                "owner": p.from.as_str(),
                "spender": p.spender.as_str(),
                "quantity": quantity,
            }),
        }])
    }

    fn decompose(&self, instruction: &EosAction) -> Option<Decomposed> {
        if instruction.name != "approve" {
            return None;
        }
        let owner = data_str(&instruction.data, "owner")?;
        let spender = data_str(&instruction.data, "spender")?;
        let (amount, symbol) = parse_quantity(data_str(&instruction.data, "quantity")?)?;

        Some(Decomposed {
            kind: self.kind(),
            args: ActionParams::TokenApprove(TokenApproveParams {
                from: Address::new(owner),
                spender: Address::new(spender),
                amount,
                symbol: Some(symbol),
                contract: Some(instruction.account.clone()),
            }),
            partial: sole_authorization(&instruction.authorization).is_none(),
        })
    }
}

/// Account creation. Composes to three instructions: the account itself
/// plus the RAM purchase and bandwidth stake a usable account requires.
struct AccountCreateCodec;

impl ActionCodec<EosChain> for AccountCreateCodec {
    fn kind(&self) -> ActionKind {
        ActionKind::AccountCreate
    }

    fn compose(&self, params: &ActionParams) -> EngineResult<Vec<EosAction>> {
        let ActionParams::AccountCreate(p) = params else {
            return Err(invalid(self.kind(), "expected AccountCreate params"));
        };
        require_account(self.kind(), "creator", &p.creator)?;
        require_account(self.kind(), "new_account", &p.new_account)?;
        if p.owner_key.is_empty() || p.active_key.is_empty() {
            return Err(invalid(self.kind(), "owner and active keys are required"));
        }

        let authority = |key: &str| {
            json!({
                "threshold": 1,
                "keys": [{ "key": key, "weight": 1 }],
                "accounts": [],
                "waits": [],
            })
        };
        let auth = vec![EosPermission::active(&p.creator)];

        let net = format_quantity(p.net_stake.as_deref().unwrap_or(DEFAULT_STAKE), SYSTEM_SYMBOL)
            .map_err(|e| invalid(self.kind(), e.to_string()))?;
        let cpu = format_quantity(p.cpu_stake.as_deref().unwrap_or(DEFAULT_STAKE), SYSTEM_SYMBOL)
            .map_err(|e| invalid(self.kind(), e.to_string()))?;

        Ok(vec![
            EosAction {
                account: Address::new(SYSTEM_ACCOUNT),
                name: "newaccount".to_string(),
                authorization: auth.clone(),
                data: json!({
                    "creator": p.creator.as_str(),
                    "name": p.new_account.as_str(),
                    "owner": authority(&p.owner_key),
                    "active": authority(&p.active_key),
                }),
            },
            EosAction {
                account: Address::new(SYSTEM_ACCOUNT),
                name: "buyrambytes".to_string(),
                authorization: auth.clone(),
                data: json!({
                    "payer": p.creator.as_str(),
                    "receiver": p.new_account.as_str(),
                    "bytes": p.ram_bytes.unwrap_or(DEFAULT_RAM_BYTES),
                }),
            },
            EosAction {
                account: Address::new(SYSTEM_ACCOUNT),
                name: "delegatebw".to_string(),
                authorization: auth,
                data: json!({
                    "from": p.creator.as_str(),
                    "receiver": p.new_account.as_str(),
                    "stake_net_quantity": net,
                    "stake_cpu_quantity": cpu,
                    "transfer": false,
                }),
            },
        ])
    }

    fn decompose(&self, instruction: &EosAction) -> Option<Decomposed> {
        if instruction.account.as_str() != SYSTEM_ACCOUNT || instruction.name != "newaccount" {
            return None;
        }
        let creator = data_str(&instruction.data, "creator")?;
        let name = data_str(&instruction.data, "name")?;
        let key_of = |field: &str| -> Option<String> {
            instruction
                .data
                .get(field)?
                .get("keys")?
                .get(0)?
                .get("key")?
                .as_str()
                .map(str::to_string)
        };

        Some(Decomposed {
            kind: self.kind(),
            args: ActionParams::AccountCreate(AccountCreateParams {
                creator: Address::new(creator),
                new_account: Address::new(name),
                owner_key: key_of("owner").unwrap_or_default(),
                active_key: key_of("active").unwrap_or_default(),
                ram_bytes: None,
                net_stake: None,
                cpu_stake: None,
            }),
            // RAM and bandwidth figures live in the companion
            // instructions, not recoverable from this one.
            partial: true,
        })
    }
}

/// Linking a permission to a contract action.
struct AccountLinkAuthCodec;

impl ActionCodec<EosChain> for AccountLinkAuthCodec {
    fn kind(&self) -> ActionKind {
        ActionKind::AccountLinkAuth
    }

    fn compose(&self, params: &ActionParams) -> EngineResult<Vec<EosAction>> {
        let ActionParams::AccountLinkAuth(p) = params else {
            return Err(invalid(self.kind(), "expected AccountLinkAuth params"));
        };
        require_account(self.kind(), "account", &p.account)?;
        require_account(self.kind(), "contract", &p.contract)?;
        if p.action.is_empty() || p.permission.is_empty() {
            return Err(invalid(self.kind(), "action and permission are required"));
        }

        Ok(vec![EosAction {
            account: Address::new(SYSTEM_ACCOUNT),
            name: "linkauth".to_string(),
            authorization: vec![EosPermission::active(&p.account)],
            data: json!({
                "account": p.account.as_str(),
                "code": p.contract.as_str(),
                "type": p.action,
                "requirement": p.permission,
            }),
        }])
    }

    fn decompose(&self, instruction: &EosAction) -> Option<Decomposed> {
        if instruction.account.as_str() != SYSTEM_ACCOUNT || instruction.name != "linkauth" {
            return None;
        }
        Some(Decomposed {
            kind: self.kind(),
            args: ActionParams::AccountLinkAuth(AccountLinkAuthParams {
                account: Address::new(data_str(&instruction.data, "account")?),
                contract: Address::new(data_str(&instruction.data, "code")?),
                action: data_str(&instruction.data, "type")?.to_string(),
                permission: data_str(&instruction.data, "requirement")?.to_string(),
            }),
            partial: sole_authorization(&instruction.authorization).is_none(),
        })
    }
}
