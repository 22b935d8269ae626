//! Action codecs for the Ethereum-style chain
//!
//! Token operations are ABI-encoded ERC-20 calls recognized by selector.
//! Decompositions are always partial: the sender is implied by the
//! signature and never present in the call body.

use super::{address_bytes, is_valid_eth_address, EthCall, EthChain};
use crate::action::{
    ActionCodec, ActionKind, ActionParams, CodecRegistry, Decomposed, TokenApproveParams,
    TokenTransferParams, ValueTransferParams,
};
use crate::chain::Address;
use crate::error::{EngineError, EngineResult};

use lazy_static::lazy_static;

/// keccak256("transfer(address,uint256)")[..4]
const TRANSFER_SELECTOR: [u8; 4] = [0xa9, 0x05, 0x9c, 0xbb];
/// keccak256("approve(address,uint256)")[..4]
const APPROVE_SELECTOR: [u8; 4] = [0x09, 0x5e, 0xa7, 0xb3];

lazy_static! {
    static ref REGISTRY: CodecRegistry<EthChain> = {
        let mut registry = CodecRegistry::new("ethereum");
        registry.register(ValueTransferCodec);
        registry.register(TokenTransferCodec);
        registry.register(TokenApproveCodec);
        registry
    };
}

/// Process-wide codec registry for the Ethereum-style chain.
pub fn registry() -> &'static CodecRegistry<EthChain> {
    &REGISTRY
}

fn invalid(kind: ActionKind, message: impl Into<String>) -> EngineError {
    EngineError::InvalidParams {
        kind,
        message: message.into(),
    }
}

fn parse_wei(kind: ActionKind, amount: &str) -> EngineResult<u128> {
    amount
        .parse::<u128>()
        .map_err(|_| invalid(kind, format!("amount is not an integer base-unit value: {amount}")))
}

fn require_address(kind: ActionKind, field: &str, value: &Address) -> EngineResult<()> {
    if !is_valid_eth_address(value.as_str()) {
        return Err(invalid(kind, format!("{field} is not a valid address: {value}")));
    }
    Ok(())
}

/// ABI-pack `selector(address,uint256)` calldata.
fn encode_address_amount(selector: [u8; 4], address: &Address, amount: u128) -> Vec<u8> {
    let mut data = Vec::with_capacity(68);
    data.extend_from_slice(&selector);
    data.extend_from_slice(&[0u8; 12]);
    data.extend_from_slice(&address_bytes(address).expect("address validated by composer"));
    data.extend_from_slice(&[0u8; 16]);
    data.extend_from_slice(&amount.to_be_bytes());
    data
}

/// Inverse of [`encode_address_amount`]; `None` when the calldata does not
/// have the selector's shape or the amount exceeds `u128`.
fn decode_address_amount(selector: [u8; 4], data: &[u8]) -> Option<(Address, u128)> {
    if data.len() != 68 || data[..4] != selector {
        return None;
    }
    if data[4..16].iter().any(|b| *b != 0) || data[36..52].iter().any(|b| *b != 0) {
        return None;
    }
    let address = Address::new(format!("0x{}", hex::encode(&data[16..36])));
    let mut amount_bytes = [0u8; 16];
    amount_bytes.copy_from_slice(&data[52..68]);
    Some((address, u128::from_be_bytes(amount_bytes)))
}

/// Native value transfer: a plain call with empty calldata.
struct ValueTransferCodec;

impl ActionCodec<EthChain> for ValueTransferCodec {
    fn kind(&self) -> ActionKind {
        ActionKind::ValueTransfer
    }

    fn compose(&self, params: &ActionParams) -> EngineResult<Vec<EthCall>> {
        let ActionParams::ValueTransfer(p) = params else {
            return Err(invalid(self.kind(), "expected ValueTransfer params"));
        };
        require_address(self.kind(), "from", &p.from)?;
        require_address(self.kind(), "to", &p.to)?;
        let value = parse_wei(self.kind(), &p.amount)?;

        Ok(vec![EthCall {
            to: Some(p.to.clone()),
            value,
            data: Vec::new(),
        }])
    }

    fn decompose(&self, instruction: &EthCall) -> Option<Decomposed> {
        if !instruction.data.is_empty() {
            return None;
        }
        let to = instruction.to.clone()?;

        Some(Decomposed {
            kind: self.kind(),
            args: ActionParams::ValueTransfer(ValueTransferParams {
                // sender is carried by the signature, not the call body
                from: Address::new(""),
                to,
                amount: instruction.value.to_string(),
                symbol: None,
                memo: None,
            }),
            partial: true,
        })
    }
}

/// ERC-20 `transfer(address,uint256)` on the token contract.
struct TokenTransferCodec;

impl ActionCodec<EthChain> for TokenTransferCodec {
    fn kind(&self) -> ActionKind {
        ActionKind::TokenTransfer
    }

    fn compose(&self, params: &ActionParams) -> EngineResult<Vec<EthCall>> {
        let ActionParams::TokenTransfer(p) = params else {
            return Err(invalid(self.kind(), "expected TokenTransfer params"));
        };
        require_address(self.kind(), "from", &p.from)?;
        require_address(self.kind(), "to", &p.to)?;
        let contract = p
            .contract
            .clone()
            .ok_or_else(|| invalid(self.kind(), "token contract is required"))?;
        require_address(self.kind(), "contract", &contract)?;
        let amount = parse_wei(self.kind(), &p.amount)?;

        Ok(vec![EthCall {
            to: Some(contract),
            value: 0,
            data: encode_address_amount(TRANSFER_SELECTOR, &p.to, amount),
        }])
    }

    fn decompose(&self, instruction: &EthCall) -> Option<Decomposed> {
        let contract = instruction.to.clone()?;
        let (to, amount) = decode_address_amount(TRANSFER_SELECTOR, &instruction.data)?;

        Some(Decomposed {
            kind: self.kind(),
            args: ActionParams::TokenTransfer(TokenTransferParams {
                from: Address::new(""),
                to,
                amount: amount.to_string(),
                symbol: None,
                contract: Some(contract),
                memo: None,
            }),
            partial: true,
        })
    }
}

/// ERC-20 `approve(address,uint256)` on the token contract.
struct TokenApproveCodec;

impl ActionCodec<EthChain> for TokenApproveCodec {
    fn kind(&self) -> ActionKind {
        ActionKind::TokenApprove
    }

    fn compose(&self, params: &ActionParams) -> EngineResult<Vec<EthCall>> {
        let ActionParams::TokenApprove(p) = params else {
            return Err(invalid(self.kind(), "expected TokenApprove params"));
        };
        require_address(self.kind(), "from", &p.from)?;
        require_address(self.kind(), "spender", &p.spender)?;
        let contract = p
            .contract
            .clone()
            .ok_or_else(|| invalid(self.kind(), "token contract is required"))?;
        require_address(self.kind(), "contract", &contract)?;
        let amount = parse_wei(self.kind(), &p.amount)?;

        Ok(vec![EthCall {
            to: Some(contract),
            value: 0,
            data: encode_address_amount(APPROVE_SELECTOR, &p.spender, amount),
        }])
    }

    fn decompose(&self, instruction: &EthCall) -> Option<Decomposed> {
        let contract = instruction.to.clone()?;
        let (spender, amount) = decode_address_amount(APPROVE_SELECTOR, &instruction.data)?;

        Some(Decomposed {
            kind: self.kind(),
            args: ActionParams::TokenApprove(TokenApproveParams {
                from: Address::new(""),
                spender,
                amount: amount.to_string(),
                symbol: None,
                contract: Some(contract),
            }),
            partial: true,
        })
    }
}
