//! Action codecs for the Polkadot-style chain

use super::{is_valid_ss58_address, DotCall, DotChain};
use crate::action::{
    ActionCodec, ActionKind, ActionParams, CodecRegistry, Decomposed, TokenTransferParams,
    ValueTransferParams,
};
use crate::chain::Address;
use crate::error::{EngineError, EngineResult};

use lazy_static::lazy_static;
use serde_json::json;

lazy_static! {
    static ref REGISTRY: CodecRegistry<DotChain> = {
        let mut registry = CodecRegistry::new("polkadot");
        registry.register(ValueTransferCodec);
        registry.register(TokenTransferCodec);
        registry
    };
}

/// Process-wide codec registry for the Polkadot-style chain.
pub fn registry() -> &'static CodecRegistry<DotChain> {
    &REGISTRY
}

fn invalid(kind: ActionKind, message: impl Into<String>) -> EngineError {
    EngineError::InvalidParams {
        kind,
        message: message.into(),
    }
}

fn require_address(kind: ActionKind, field: &str, value: &Address) -> EngineResult<()> {
    if !is_valid_ss58_address(value.as_str()) {
        return Err(invalid(kind, format!("{field} is not a valid address: {value}")));
    }
    Ok(())
}

fn parse_planck(kind: ActionKind, amount: &str) -> EngineResult<u128> {
    amount
        .parse::<u128>()
        .map_err(|_| invalid(kind, format!("amount is not an integer base-unit value: {amount}")))
}

fn arg_str<'a>(args: &'a serde_json::Value, field: &str) -> Option<&'a str> {
    args.get(field).and_then(|v| v.as_str())
}

/// Native balance transfer via the balances pallet. Recognizes both the
/// keep-alive and plain transfer calls.
struct ValueTransferCodec;

impl ActionCodec<DotChain> for ValueTransferCodec {
    fn kind(&self) -> ActionKind {
        ActionKind::ValueTransfer
    }

    fn compose(&self, params: &ActionParams) -> EngineResult<Vec<DotCall>> {
        let ActionParams::ValueTransfer(p) = params else {
            return Err(invalid(self.kind(), "expected ValueTransfer params"));
        };
        require_address(self.kind(), "from", &p.from)?;
        require_address(self.kind(), "to", &p.to)?;
        let value = parse_planck(self.kind(), &p.amount)?;

        Ok(vec![DotCall {
            pallet: "balances".to_string(),
            call: "transfer_keep_alive".to_string(),
            args: json!({
                "dest": p.to.as_str(),
                "value": value.to_string(),
            }),
        }])
    }

    fn decompose(&self, instruction: &DotCall) -> Option<Decomposed> {
        if instruction.pallet != "balances"
            || !matches!(
                instruction.call.as_str(),
                "transfer_keep_alive" | "transfer" | "transfer_allow_death"
            )
        {
            return None;
        }
        let dest = arg_str(&instruction.args, "dest")?;
        let value = arg_str(&instruction.args, "value")?;

        Some(Decomposed {
            kind: self.kind(),
            args: ActionParams::ValueTransfer(ValueTransferParams {
                // origin is carried by the extrinsic signature, not the call
                from: Address::new(""),
                to: Address::new(dest),
                amount: value.to_string(),
                symbol: None,
                memo: None,
            }),
            partial: true,
        })
    }
}

/// Asset transfer via the assets pallet. The chain-agnostic `contract`
/// field carries the numeric asset id.
struct TokenTransferCodec;

impl ActionCodec<DotChain> for TokenTransferCodec {
    fn kind(&self) -> ActionKind {
        ActionKind::TokenTransfer
    }

    fn compose(&self, params: &ActionParams) -> EngineResult<Vec<DotCall>> {
        let ActionParams::TokenTransfer(p) = params else {
            return Err(invalid(self.kind(), "expected TokenTransfer params"));
        };
        require_address(self.kind(), "from", &p.from)?;
        require_address(self.kind(), "to", &p.to)?;
        let asset_id = p
            .contract
            .as_ref()
            .ok_or_else(|| invalid(self.kind(), "asset id is required in `contract`"))?
            .as_str()
            .parse::<u64>()
            .map_err(|_| invalid(self.kind(), "asset id must be a decimal integer"))?;
        let amount = parse_planck(self.kind(), &p.amount)?;

        Ok(vec![DotCall {
            pallet: "assets".to_string(),
            call: "transfer".to_string(),
            args: json!({
                "id": asset_id,
                "target": p.to.as_str(),
                "amount": amount.to_string(),
            }),
        }])
    }

    fn decompose(&self, instruction: &DotCall) -> Option<Decomposed> {
        if instruction.pallet != "assets" || instruction.call != "transfer" {
            return None;
        }
        let id = instruction.args.get("id")?.as_u64()?;
        let target = arg_str(&instruction.args, "target")?;
        let amount = arg_str(&instruction.args, "amount")?;

        Some(Decomposed {
            kind: self.kind(),
            args: ActionParams::TokenTransfer(TokenTransferParams {
                from: Address::new(""),
                to: Address::new(target),
                amount: amount.to_string(),
                symbol: None,
                contract: Some(Address::new(id.to_string())),
                memo: None,
            }),
            partial: true,
        })
    }
}
