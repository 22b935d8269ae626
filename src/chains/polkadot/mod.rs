//! Polkadot-style pallet chain
//!
//! Instructions are pallet calls: a pallet name, a call name and a JSON
//! argument object. Headers carry the mortality era (birth block plus
//! period), an account nonce and an optional tip.

mod codecs;

pub use codecs::registry;

use crate::chain::{ChainInfo, ChainSpec};
use crate::error::{EngineError, EngineResult};
use crate::tx::MultisigRequirement;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Default era period in blocks.
const DEFAULT_ERA_PERIOD: u64 = 64;

/// Chain-native instruction: one pallet call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DotCall {
    pub pallet: String,
    pub call: String,
    pub args: serde_json::Value,
}

/// Mortality, sequencing and tip material.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DotHeader {
    pub genesis_hash: String,
    pub spec_version: u32,
    /// Account nonce. Derived as 0 at prepare time; callers that manage
    /// nonces override it via `set_header` before preparing.
    pub nonce: u32,
    pub era_birth_block: u64,
    pub era_period: u64,
    pub tip: u128,
}

#[derive(Serialize, Deserialize)]
struct SignableBody {
    genesis_hash: String,
    header: DotHeader,
    calls: Vec<DotCall>,
}

/// Polkadot-style chain family.
pub struct DotChain {
    genesis_hash: String,
    spec_version: u32,
    era_period: u64,
}

impl DotChain {
    pub fn new(genesis_hash: impl Into<String>, spec_version: u32) -> Self {
        Self {
            genesis_hash: genesis_hash.into(),
            spec_version,
            era_period: DEFAULT_ERA_PERIOD,
        }
    }

    pub fn with_era_period(mut self, blocks: u64) -> Self {
        self.era_period = blocks;
        self
    }
}

impl ChainSpec for DotChain {
    type Instruction = DotCall;
    type Header = DotHeader;

    fn id(&self) -> &'static str {
        "polkadot"
    }

    fn make_header(&self, info: &ChainInfo) -> EngineResult<DotHeader> {
        Ok(DotHeader {
            genesis_hash: self.genesis_hash.clone(),
            spec_version: self.spec_version,
            nonce: 0,
            era_birth_block: info.head_block_number,
            era_period: self.era_period,
            tip: 0,
        })
    }

    fn encode_signable(
        &self,
        header: &DotHeader,
        actions: &[DotCall],
    ) -> EngineResult<Vec<u8>> {
        Ok(serde_json::to_vec(&SignableBody {
            genesis_hash: self.genesis_hash.clone(),
            header: header.clone(),
            calls: actions.to_vec(),
        })?)
    }

    fn decode_raw(&self, raw: &[u8]) -> EngineResult<(DotHeader, Vec<DotCall>)> {
        let body: SignableBody = serde_json::from_slice(raw)
            .map_err(|e| EngineError::InvalidRaw(e.to_string()))?;
        if body.genesis_hash != self.genesis_hash {
            return Err(EngineError::InvalidRaw(format!(
                "body is bound to genesis {}, expected {}",
                body.genesis_hash, self.genesis_hash
            )));
        }
        Ok((body.header, body.calls))
    }

    fn validate(
        &self,
        header: &DotHeader,
        actions: &[DotCall],
        _multisig: Option<&MultisigRequirement>,
    ) -> EngineResult<()> {
        if header.era_period == 0 {
            return Err(EngineError::Validation("era period is zero".to_string()));
        }
        for call in actions {
            if !is_valid_call_ident(&call.pallet) || !is_valid_call_ident(&call.call) {
                return Err(EngineError::Validation(format!(
                    "malformed call identifier: {}::{}",
                    call.pallet, call.call
                )));
            }
        }
        Ok(())
    }
}

lazy_static! {
    static ref CALL_IDENT: Regex = Regex::new(r"^[a-z][a-z0-9_]*$").unwrap();
    static ref SS58_ADDRESS: Regex = Regex::new(r"^[1-9A-HJ-NP-Za-km-z]{46,48}$").unwrap();
}

/// Pallet and call names: snake_case identifiers.
pub fn is_valid_call_ident(ident: &str) -> bool {
    CALL_IDENT.is_match(ident)
}

/// SS58 address shape check (base58 alphabet, typical length band).
pub fn is_valid_ss58_address(address: &str) -> bool {
    SS58_ADDRESS.is_match(address)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn info() -> ChainInfo {
        ChainInfo {
            chain_id: "polkadot".to_string(),
            head_block_number: 20_000_000,
            head_block_id: "0xfeed".to_string(),
            head_block_time: Utc::now(),
            suggested_fee: None,
        }
    }

    #[test]
    fn test_make_header_era() {
        let header = DotChain::new("0x91b1", 1002000)
            .with_era_period(128)
            .make_header(&info())
            .unwrap();
        assert_eq!(header.era_birth_block, 20_000_000);
        assert_eq!(header.era_period, 128);
        assert_eq!(header.spec_version, 1002000);
        assert_eq!(header.nonce, 0);
    }

    #[test]
    fn test_validate_call_idents() {
        let chain = DotChain::new("0x91b1", 1);
        let header = chain.make_header(&info()).unwrap();

        let good = DotCall {
            pallet: "balances".to_string(),
            call: "transfer_keep_alive".to_string(),
            args: serde_json::json!({}),
        };
        chain.validate(&header, &[good], None).unwrap();

        let bad = DotCall {
            pallet: "Balances".to_string(),
            call: "transfer".to_string(),
            args: serde_json::json!({}),
        };
        assert!(matches!(
            chain.validate(&header, &[bad], None),
            Err(EngineError::Validation(_))
        ));
    }

    #[test]
    fn test_ss58_shape() {
        assert!(is_valid_ss58_address(
            "15oF4uVJwmo4TdGW7VfQxNLavjCXviqxT9S1MgbjMNHr6Sp5"
        ));
        assert!(!is_valid_ss58_address("0xdeadbeef"));
        // base58 alphabet excludes '0', 'O', 'I' and 'l'
        assert!(!is_valid_ss58_address(&"0".repeat(47)));
    }

    #[test]
    fn test_raw_round_trip() {
        let chain = DotChain::new("0x91b1", 1);
        let header = chain.make_header(&info()).unwrap();
        let calls = vec![DotCall {
            pallet: "balances".to_string(),
            call: "transfer_keep_alive".to_string(),
            args: serde_json::json!({ "dest": "15oF4u", "value": "1" }),
        }];

        let raw = chain.encode_signable(&header, &calls).unwrap();
        let (decoded_header, decoded_calls) = chain.decode_raw(&raw).unwrap();
        assert_eq!(decoded_header, header);
        assert_eq!(decoded_calls, calls);

        assert!(matches!(
            DotChain::new("0xother", 1).decode_raw(&raw),
            Err(EngineError::InvalidRaw(_))
        ));
    }
}
