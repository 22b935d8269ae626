//! Action codecs for the Algorand-style chain

use super::{is_valid_algo_address, AlgoChain, AlgoTxn, AlgoTxnType};
use crate::action::{
    ActionCodec, ActionKind, ActionParams, CodecRegistry, Decomposed, TokenTransferParams,
    ValueTransferParams,
};
use crate::chain::Address;
use crate::error::{EngineError, EngineResult};

use lazy_static::lazy_static;

lazy_static! {
    static ref REGISTRY: CodecRegistry<AlgoChain> = {
        let mut registry = CodecRegistry::new("algorand");
        registry.register(ValueTransferCodec);
        registry.register(TokenTransferCodec);
        registry
    };
}

/// Process-wide codec registry for the Algorand-style chain.
pub fn registry() -> &'static CodecRegistry<AlgoChain> {
    &REGISTRY
}

fn invalid(kind: ActionKind, message: impl Into<String>) -> EngineError {
    EngineError::InvalidParams {
        kind,
        message: message.into(),
    }
}

fn require_address(kind: ActionKind, field: &str, value: &Address) -> EngineResult<()> {
    if !is_valid_algo_address(value.as_str()) {
        return Err(invalid(kind, format!("{field} is not a valid address: {value}")));
    }
    Ok(())
}

fn parse_base_units(kind: ActionKind, amount: &str) -> EngineResult<u64> {
    amount
        .parse::<u64>()
        .map_err(|_| invalid(kind, format!("amount is not an integer base-unit value: {amount}")))
}

/// Native value transfer: a `pay` transaction in microalgos.
struct ValueTransferCodec;

impl ActionCodec<AlgoChain> for ValueTransferCodec {
    fn kind(&self) -> ActionKind {
        ActionKind::ValueTransfer
    }

    fn compose(&self, params: &ActionParams) -> EngineResult<Vec<AlgoTxn>> {
        let ActionParams::ValueTransfer(p) = params else {
            return Err(invalid(self.kind(), "expected ValueTransfer params"));
        };
        require_address(self.kind(), "from", &p.from)?;
        require_address(self.kind(), "to", &p.to)?;
        let amount = parse_base_units(self.kind(), &p.amount)?;

        Ok(vec![AlgoTxn {
            txn_type: AlgoTxnType::Pay,
            sender: p.from.clone(),
            receiver: p.to.clone(),
            amount,
            asset_id: None,
            note: p.memo.clone(),
        }])
    }

    fn decompose(&self, instruction: &AlgoTxn) -> Option<Decomposed> {
        if instruction.txn_type != AlgoTxnType::Pay {
            return None;
        }
        Some(Decomposed {
            kind: self.kind(),
            args: ActionParams::ValueTransfer(ValueTransferParams {
                from: instruction.sender.clone(),
                to: instruction.receiver.clone(),
                amount: instruction.amount.to_string(),
                symbol: None,
                memo: instruction.note.clone(),
            }),
            partial: false,
        })
    }
}

/// Asset transfer: an `axfer` transaction. The chain-agnostic `contract`
/// field carries the numeric asset index.
struct TokenTransferCodec;

impl ActionCodec<AlgoChain> for TokenTransferCodec {
    fn kind(&self) -> ActionKind {
        ActionKind::TokenTransfer
    }

    fn compose(&self, params: &ActionParams) -> EngineResult<Vec<AlgoTxn>> {
        let ActionParams::TokenTransfer(p) = params else {
            return Err(invalid(self.kind(), "expected TokenTransfer params"));
        };
        require_address(self.kind(), "from", &p.from)?;
        require_address(self.kind(), "to", &p.to)?;
        let asset_id = p
            .contract
            .as_ref()
            .ok_or_else(|| invalid(self.kind(), "asset index is required in `contract`"))?
            .as_str()
            .parse::<u64>()
            .map_err(|_| invalid(self.kind(), "asset index must be a decimal integer"))?;
        let amount = parse_base_units(self.kind(), &p.amount)?;

        Ok(vec![AlgoTxn {
            txn_type: AlgoTxnType::Axfer,
            sender: p.from.clone(),
            receiver: p.to.clone(),
            amount,
            asset_id: Some(asset_id),
            note: p.memo.clone(),
        }])
    }

    fn decompose(&self, instruction: &AlgoTxn) -> Option<Decomposed> {
        if instruction.txn_type != AlgoTxnType::Axfer {
            return None;
        }
        let asset_id = instruction.asset_id?;

        Some(Decomposed {
            kind: self.kind(),
            args: ActionParams::TokenTransfer(TokenTransferParams {
                from: instruction.sender.clone(),
                to: instruction.receiver.clone(),
                amount: instruction.amount.to_string(),
                symbol: None,
                contract: Some(Address::new(asset_id.to_string())),
                memo: instruction.note.clone(),
            }),
            partial: false,
        })
    }
}
