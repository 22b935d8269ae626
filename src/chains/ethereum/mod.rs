//! Ethereum-style contract chain
//!
//! One transaction carries exactly one call: an optional target address, a
//! native value and a calldata payload. The sender is not part of the call
//! body - it is implied by the signature - so decompositions on this chain
//! can never recover the `from` field and are marked partial.

mod codecs;

pub use codecs::registry;

use crate::chain::{Address, ChainInfo, ChainSpec};
use crate::error::{EngineError, EngineResult};
use crate::tx::MultisigRequirement;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Default priority fee when the node reports no suggestion (1 gwei).
const DEFAULT_PRIORITY_FEE: u128 = 1_000_000_000;
/// Fallback base fee (2 gwei).
const DEFAULT_BASE_FEE: u128 = 2_000_000_000;
/// Default gas limit covering a value transfer or a simple token call.
const DEFAULT_GAS_LIMIT: u64 = 120_000;

/// Chain-native instruction: one call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EthCall {
    /// Target account or contract; `None` deploys code (unsupported by the
    /// registered codecs, accepted in the data model).
    pub to: Option<Address>,
    /// Native value in wei.
    pub value: u128,
    /// Calldata payload.
    pub data: Vec<u8>,
}

/// Fee and sequencing material.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EthHeader {
    pub chain_id: u64,
    /// Account nonce. Derived as 0 at prepare time; callers that manage
    /// nonces override it via `set_header` before preparing.
    pub nonce: u64,
    pub gas_limit: u64,
    pub max_fee_per_gas: u128,
    pub max_priority_fee_per_gas: u128,
}

#[derive(Serialize, Deserialize)]
struct SignableBody {
    chain_id: u64,
    header: EthHeader,
    calls: Vec<EthCall>,
}

/// Ethereum-style chain family.
pub struct EthChain {
    chain_id: u64,
}

impl EthChain {
    pub fn new(chain_id: u64) -> Self {
        Self { chain_id }
    }
}

impl ChainSpec for EthChain {
    type Instruction = EthCall;
    type Header = EthHeader;

    fn id(&self) -> &'static str {
        "ethereum"
    }

    fn make_header(&self, info: &ChainInfo) -> EngineResult<EthHeader> {
        let base_fee = info.suggested_fee.unwrap_or(DEFAULT_BASE_FEE);
        // Max fee = 2 * base + priority, buffering block-to-block base fee
        // variability.
        let max_fee = base_fee * 2 + DEFAULT_PRIORITY_FEE;
        Ok(EthHeader {
            chain_id: self.chain_id,
            nonce: 0,
            gas_limit: DEFAULT_GAS_LIMIT,
            max_fee_per_gas: max_fee,
            max_priority_fee_per_gas: DEFAULT_PRIORITY_FEE,
        })
    }

    fn encode_signable(
        &self,
        header: &EthHeader,
        actions: &[EthCall],
    ) -> EngineResult<Vec<u8>> {
        Ok(serde_json::to_vec(&SignableBody {
            chain_id: self.chain_id,
            header: header.clone(),
            calls: actions.to_vec(),
        })?)
    }

    fn decode_raw(&self, raw: &[u8]) -> EngineResult<(EthHeader, Vec<EthCall>)> {
        let body: SignableBody = serde_json::from_slice(raw)
            .map_err(|e| EngineError::InvalidRaw(e.to_string()))?;
        if body.chain_id != self.chain_id {
            return Err(EngineError::InvalidRaw(format!(
                "body is bound to chain {}, expected {}",
                body.chain_id, self.chain_id
            )));
        }
        Ok((body.header, body.calls))
    }

    fn validate(
        &self,
        header: &EthHeader,
        actions: &[EthCall],
        multisig: Option<&MultisigRequirement>,
    ) -> EngineResult<()> {
        if actions.len() != 1 {
            return Err(EngineError::Validation(format!(
                "transaction carries exactly one call, got {}",
                actions.len()
            )));
        }
        let call = &actions[0];
        if let Some(to) = &call.to {
            if !is_valid_eth_address(to.as_str()) {
                return Err(EngineError::Validation(format!(
                    "invalid target address: {to}"
                )));
            }
        }
        if header.max_priority_fee_per_gas > header.max_fee_per_gas {
            return Err(EngineError::Validation(
                "priority fee exceeds max fee".to_string(),
            ));
        }
        if multisig.is_some() {
            // Externally-owned accounts have no native threshold scheme;
            // contract wallets run their own.
            return Err(EngineError::InvalidMultisig(
                "chain has no native multisig".to_string(),
            ));
        }
        Ok(())
    }
}

lazy_static! {
    static ref ETH_ADDRESS: Regex = Regex::new(r"^0x[0-9a-fA-F]{40}$").unwrap();
}

/// Hex address format check.
pub fn is_valid_eth_address(address: &str) -> bool {
    ETH_ADDRESS.is_match(address)
}

/// Decode a checked hex address into its 20 bytes.
pub(crate) fn address_bytes(address: &Address) -> Option<[u8; 20]> {
    if !is_valid_eth_address(address.as_str()) {
        return None;
    }
    let bytes = hex::decode(&address.as_str()[2..]).ok()?;
    let mut out = [0u8; 20];
    out.copy_from_slice(&bytes);
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn info(fee: Option<u128>) -> ChainInfo {
        ChainInfo {
            chain_id: "1".to_string(),
            head_block_number: 19_000_000,
            head_block_id: "0xabc".to_string(),
            head_block_time: Utc::now(),
            suggested_fee: fee,
        }
    }

    #[test]
    fn test_make_header_fee_buffering() {
        let header = EthChain::new(1).make_header(&info(Some(10))).unwrap();
        assert_eq!(header.max_fee_per_gas, 20 + DEFAULT_PRIORITY_FEE);
        assert_eq!(header.max_priority_fee_per_gas, DEFAULT_PRIORITY_FEE);
        assert_eq!(header.chain_id, 1);

        let fallback = EthChain::new(1).make_header(&info(None)).unwrap();
        assert_eq!(
            fallback.max_fee_per_gas,
            DEFAULT_BASE_FEE * 2 + DEFAULT_PRIORITY_FEE
        );
    }

    #[test]
    fn test_validate_single_call_only() {
        let chain = EthChain::new(1);
        let header = chain.make_header(&info(None)).unwrap();
        let call = EthCall {
            to: Some(Address::new("0x1111111111111111111111111111111111111111")),
            value: 5,
            data: vec![],
        };

        chain.validate(&header, &[call.clone()], None).unwrap();
        assert!(matches!(
            chain.validate(&header, &[call.clone(), call], None),
            Err(EngineError::Validation(_))
        ));
    }

    #[test]
    fn test_validate_rejects_multisig() {
        let chain = EthChain::new(1);
        let header = chain.make_header(&info(None)).unwrap();
        let call = EthCall {
            to: Some(Address::new("0x1111111111111111111111111111111111111111")),
            value: 5,
            data: vec![],
        };
        let requirement = MultisigRequirement::new(
            1,
            vec![Address::new("0x2222222222222222222222222222222222222222")],
        )
        .unwrap();

        assert!(matches!(
            chain.validate(&header, &[call], Some(&requirement)),
            Err(EngineError::InvalidMultisig(_))
        ));
    }

    #[test]
    fn test_address_validation() {
        assert!(is_valid_eth_address(
            "0x52908400098527886E0F7030069857D2E4169EE7"
        ));
        assert!(!is_valid_eth_address("0x123"));
        assert!(!is_valid_eth_address(
            "52908400098527886E0F7030069857D2E4169EE7"
        ));
        assert!(!is_valid_eth_address(
            "0xZZ908400098527886E0F7030069857D2E4169EE7"
        ));
    }

    #[test]
    fn test_raw_round_trip() {
        let chain = EthChain::new(5);
        let header = chain.make_header(&info(None)).unwrap();
        let calls = vec![EthCall {
            to: Some(Address::new("0x1111111111111111111111111111111111111111")),
            value: 42,
            data: vec![1, 2, 3],
        }];

        let raw = chain.encode_signable(&header, &calls).unwrap();
        let (decoded_header, decoded_calls) = chain.decode_raw(&raw).unwrap();
        assert_eq!(decoded_header, header);
        assert_eq!(decoded_calls, calls);

        assert!(matches!(
            EthChain::new(1).decode_raw(&raw),
            Err(EngineError::InvalidRaw(_))
        ));
    }
}
