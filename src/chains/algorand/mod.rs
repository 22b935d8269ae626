//! Algorand-style chain
//!
//! Transactions are typed payloads (`pay` for native value, `axfer` for
//! asset transfers) valid within a first/last round window. The chain
//! rejects redundant signatures outright instead of ignoring them.

mod codecs;

pub use codecs::registry;

use crate::chain::{Address, ChainInfo, ChainSpec};
use crate::error::{EngineError, EngineResult};
use crate::tx::MultisigRequirement;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Default validity window in rounds.
const DEFAULT_ROUND_WINDOW: u64 = 1000;
/// Flat minimum fee in microalgos.
const MIN_FEE: u64 = 1000;

/// Transaction payload type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlgoTxnType {
    Pay,
    Axfer,
}

/// Chain-native instruction: one typed transaction payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlgoTxn {
    pub txn_type: AlgoTxnType,
    pub sender: Address,
    pub receiver: Address,
    /// Microalgos for `pay`, asset base units for `axfer`.
    pub amount: u64,
    /// Asset index, present on `axfer` only.
    pub asset_id: Option<u64>,
    pub note: Option<String>,
}

/// Validity window and fee material.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlgoHeader {
    pub genesis_id: String,
    pub first_round: u64,
    pub last_round: u64,
    pub fee: u64,
}

#[derive(Serialize, Deserialize)]
struct SignableBody {
    genesis_id: String,
    header: AlgoHeader,
    transactions: Vec<AlgoTxn>,
}

/// Algorand-style chain family.
pub struct AlgoChain {
    genesis_id: String,
    round_window: u64,
}

impl AlgoChain {
    pub fn new(genesis_id: impl Into<String>) -> Self {
        Self {
            genesis_id: genesis_id.into(),
            round_window: DEFAULT_ROUND_WINDOW,
        }
    }

    pub fn with_round_window(mut self, rounds: u64) -> Self {
        self.round_window = rounds;
        self
    }
}

impl ChainSpec for AlgoChain {
    type Instruction = AlgoTxn;
    type Header = AlgoHeader;

    fn id(&self) -> &'static str {
        "algorand"
    }

    fn make_header(&self, info: &ChainInfo) -> EngineResult<AlgoHeader> {
        Ok(AlgoHeader {
            genesis_id: self.genesis_id.clone(),
            first_round: info.head_block_number,
            last_round: info.head_block_number + self.round_window,
            fee: info
                .suggested_fee
                .map(|fee| (fee as u64).max(MIN_FEE))
                .unwrap_or(MIN_FEE),
        })
    }

    fn encode_signable(
        &self,
        header: &AlgoHeader,
        actions: &[AlgoTxn],
    ) -> EngineResult<Vec<u8>> {
        Ok(serde_json::to_vec(&SignableBody {
            genesis_id: self.genesis_id.clone(),
            header: header.clone(),
            transactions: actions.to_vec(),
        })?)
    }

    fn decode_raw(&self, raw: &[u8]) -> EngineResult<(AlgoHeader, Vec<AlgoTxn>)> {
        let body: SignableBody = serde_json::from_slice(raw)
            .map_err(|e| EngineError::InvalidRaw(e.to_string()))?;
        if body.genesis_id != self.genesis_id {
            return Err(EngineError::InvalidRaw(format!(
                "body is bound to network {}, expected {}",
                body.genesis_id, self.genesis_id
            )));
        }
        Ok((body.header, body.transactions))
    }

    fn validate(
        &self,
        header: &AlgoHeader,
        actions: &[AlgoTxn],
        _multisig: Option<&MultisigRequirement>,
    ) -> EngineResult<()> {
        if header.last_round <= header.first_round {
            return Err(EngineError::Validation(
                "validity window is empty".to_string(),
            ));
        }
        for txn in actions {
            if !is_valid_algo_address(txn.sender.as_str()) {
                return Err(EngineError::Validation(format!(
                    "invalid sender address: {}",
                    txn.sender
                )));
            }
            if !is_valid_algo_address(txn.receiver.as_str()) {
                return Err(EngineError::Validation(format!(
                    "invalid receiver address: {}",
                    txn.receiver
                )));
            }
            match txn.txn_type {
                AlgoTxnType::Pay if txn.asset_id.is_some() => {
                    return Err(EngineError::Validation(
                        "pay transaction carries an asset id".to_string(),
                    ));
                }
                AlgoTxnType::Axfer if txn.asset_id.is_none() => {
                    return Err(EngineError::Validation(
                        "asset transfer is missing its asset id".to_string(),
                    ));
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// A repeat signature replaces nothing here; the chain treats it as an
    /// error rather than a no-op.
    fn forbids_redundant_signing(&self) -> bool {
        true
    }
}

lazy_static! {
    static ref ALGO_ADDRESS: Regex = Regex::new(r"^[A-Z2-7]{58}$").unwrap();
}

/// Base32 address shape check.
pub fn is_valid_algo_address(address: &str) -> bool {
    ALGO_ADDRESS.is_match(address)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn addr(seed: char) -> Address {
        Address::new(seed.to_string().repeat(58))
    }

    fn info() -> ChainInfo {
        ChainInfo {
            chain_id: "mainnet-v1.0".to_string(),
            head_block_number: 30_000_000,
            head_block_id: "deadbeef".to_string(),
            head_block_time: Utc::now(),
            suggested_fee: Some(500),
        }
    }

    #[test]
    fn test_make_header_round_window_and_fee_floor() {
        let header = AlgoChain::new("mainnet-v1.0")
            .with_round_window(500)
            .make_header(&info())
            .unwrap();
        assert_eq!(header.first_round, 30_000_000);
        assert_eq!(header.last_round, 30_000_500);
        // suggested fee below the protocol minimum is floored
        assert_eq!(header.fee, MIN_FEE);
    }

    #[test]
    fn test_validate_type_and_asset_consistency() {
        let chain = AlgoChain::new("mainnet-v1.0");
        let header = chain.make_header(&info()).unwrap();

        let pay_with_asset = AlgoTxn {
            txn_type: AlgoTxnType::Pay,
            sender: addr('A'),
            receiver: addr('B'),
            amount: 1,
            asset_id: Some(31566704),
            note: None,
        };
        assert!(matches!(
            chain.validate(&header, &[pay_with_asset], None),
            Err(EngineError::Validation(_))
        ));

        let axfer_without_asset = AlgoTxn {
            txn_type: AlgoTxnType::Axfer,
            sender: addr('A'),
            receiver: addr('B'),
            amount: 1,
            asset_id: None,
            note: None,
        };
        assert!(matches!(
            chain.validate(&header, &[axfer_without_asset], None),
            Err(EngineError::Validation(_))
        ));
    }

    #[test]
    fn test_address_validation() {
        assert!(is_valid_algo_address(&"A".repeat(58)));
        assert!(!is_valid_algo_address(&"a".repeat(58)));
        assert!(!is_valid_algo_address(&"A".repeat(57)));
        assert!(!is_valid_algo_address(&"1".repeat(58)));
    }

    #[test]
    fn test_forbids_redundant_signing() {
        assert!(AlgoChain::new("mainnet-v1.0").forbids_redundant_signing());
    }

    #[test]
    fn test_raw_round_trip() {
        let chain = AlgoChain::new("testnet-v1.0");
        let header = chain.make_header(&info()).unwrap();
        let txns = vec![AlgoTxn {
            txn_type: AlgoTxnType::Pay,
            sender: addr('A'),
            receiver: addr('B'),
            amount: 7,
            asset_id: None,
            note: Some("hi".to_string()),
        }];

        let raw = chain.encode_signable(&header, &txns).unwrap();
        let (decoded_header, decoded_txns) = chain.decode_raw(&raw).unwrap();
        assert_eq!(decoded_header, header);
        assert_eq!(decoded_txns, txns);

        assert!(matches!(
            AlgoChain::new("mainnet-v1.0").decode_raw(&raw),
            Err(EngineError::InvalidRaw(_))
        ));
    }
}
