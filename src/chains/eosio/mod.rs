//! EOS-style account chain
//!
//! Actions name a contract account, an action on it, an authorization list
//! and a JSON-shaped data payload. Headers carry an expiration time plus a
//! reference block (number tail and id-derived prefix) for TaPoS.

mod codecs;

pub use codecs::registry;

use crate::chain::{Address, ChainInfo, ChainSpec};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::tx::MultisigRequirement;

use chrono::{DateTime, Duration, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// One authorization entry: actor plus permission level.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EosPermission {
    pub actor: Address,
    pub permission: String,
}

impl EosPermission {
    pub fn active(actor: &Address) -> Self {
        Self {
            actor: actor.clone(),
            permission: "active".to_string(),
        }
    }
}

/// Chain-native instruction: one contract action.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EosAction {
    /// Contract account the action targets.
    pub account: Address,
    /// Action name on that contract.
    pub name: String,
    pub authorization: Vec<EosPermission>,
    /// Action arguments, ABI-shaped JSON.
    pub data: serde_json::Value,
}

/// Transaction header: expiration and TaPoS reference block fields.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EosHeader {
    pub expiration: DateTime<Utc>,
    pub ref_block_num: u16,
    pub ref_block_prefix: u32,
    pub max_net_usage_words: u32,
    pub max_cpu_usage_ms: u8,
    pub delay_sec: u32,
}

#[derive(Serialize, Deserialize)]
struct SignableBody {
    chain_id: String,
    header: EosHeader,
    actions: Vec<EosAction>,
}

/// EOS-style chain family.
pub struct EosChain {
    chain_id: String,
    expire_secs: u32,
}

impl EosChain {
    pub fn new(chain_id: impl Into<String>, expire_secs: u32) -> Self {
        Self {
            chain_id: chain_id.into(),
            expire_secs,
        }
    }

    pub fn from_config(chain_id: impl Into<String>, config: &EngineConfig) -> Self {
        Self::new(chain_id, config.expire_secs)
    }
}

impl ChainSpec for EosChain {
    type Instruction = EosAction;
    type Header = EosHeader;

    fn id(&self) -> &'static str {
        "eosio"
    }

    fn make_header(&self, info: &ChainInfo) -> EngineResult<EosHeader> {
        Ok(EosHeader {
            expiration: info.head_block_time + Duration::seconds(self.expire_secs as i64),
            ref_block_num: (info.head_block_number & 0xffff) as u16,
            ref_block_prefix: ref_block_prefix(&info.head_block_id)?,
            max_net_usage_words: 0,
            max_cpu_usage_ms: 0,
            delay_sec: 0,
        })
    }

    fn encode_signable(
        &self,
        header: &EosHeader,
        actions: &[EosAction],
    ) -> EngineResult<Vec<u8>> {
        Ok(serde_json::to_vec(&SignableBody {
            chain_id: self.chain_id.clone(),
            header: header.clone(),
            actions: actions.to_vec(),
        })?)
    }

    fn decode_raw(&self, raw: &[u8]) -> EngineResult<(EosHeader, Vec<EosAction>)> {
        let body: SignableBody = serde_json::from_slice(raw)
            .map_err(|e| EngineError::InvalidRaw(e.to_string()))?;
        if body.chain_id != self.chain_id {
            return Err(EngineError::InvalidRaw(format!(
                "body is bound to chain {}, expected {}",
                body.chain_id, self.chain_id
            )));
        }
        Ok((body.header, body.actions))
    }

    fn validate(
        &self,
        _header: &EosHeader,
        actions: &[EosAction],
        multisig: Option<&MultisigRequirement>,
    ) -> EngineResult<()> {
        for action in actions {
            if action.authorization.is_empty() {
                return Err(EngineError::Validation(format!(
                    "action {}::{} has no authorization",
                    action.account, action.name
                )));
            }
            if !is_valid_account_name(action.account.as_str()) {
                return Err(EngineError::Validation(format!(
                    "invalid contract account name: {}",
                    action.account
                )));
            }
            for auth in &action.authorization {
                if !is_valid_account_name(auth.actor.as_str()) {
                    return Err(EngineError::Validation(format!(
                        "invalid authorization actor: {}",
                        auth.actor
                    )));
                }
            }
        }
        if let Some(requirement) = multisig {
            for signer in requirement.signers() {
                if !is_valid_account_name(signer.as_str()) {
                    return Err(EngineError::Validation(format!(
                        "multisig signer is not a valid account name: {signer}"
                    )));
                }
            }
        }
        Ok(())
    }
}

lazy_static! {
    static ref ACCOUNT_NAME: Regex = Regex::new(r"^[a-z1-5.]{1,12}$").unwrap();
    static ref DECIMAL_AMOUNT: Regex = Regex::new(r"^\d+(\.\d+)?$").unwrap();
    static ref QUANTITY: Regex = Regex::new(r"^(\d+\.\d+) ([A-Z]{1,7})$").unwrap();
}

/// Account names: 1-12 chars of a-z, 1-5 and dots, no trailing dot.
pub fn is_valid_account_name(name: &str) -> bool {
    ACCOUNT_NAME.is_match(name) && !name.ends_with('.')
}

/// Render a decimal amount as an asset quantity string with the chain's
/// fixed 4-digit precision, e.g. `("5", "EOS") -> "5.0000 EOS"`.
pub fn format_quantity(amount: &str, symbol: &str) -> EngineResult<String> {
    if !DECIMAL_AMOUNT.is_match(amount) {
        return Err(EngineError::Validation(format!(
            "amount is not a decimal number: {amount}"
        )));
    }
    let (whole, frac) = match amount.split_once('.') {
        Some((w, f)) => (w, f),
        None => (amount, ""),
    };
    let mut frac = frac.to_string();
    if frac.len() > 4 {
        return Err(EngineError::Validation(format!(
            "amount {amount} exceeds 4-digit precision"
        )));
    }
    while frac.len() < 4 {
        frac.push('0');
    }
    Ok(format!("{whole}.{frac} {symbol}"))
}

/// Split an asset quantity string back into `(amount, symbol)`.
pub fn parse_quantity(quantity: &str) -> Option<(String, String)> {
    let caps = QUANTITY.captures(quantity)?;
    Some((caps[1].to_string(), caps[2].to_string()))
}

/// The sole authorization entry, when exactly one exists.
///
/// With several entries the signing authority cannot be disambiguated;
/// decomposers treat that as a partial recovery, not an error.
pub(crate) fn sole_authorization(authorization: &[EosPermission]) -> Option<&EosPermission> {
    match authorization {
        [single] => Some(single),
        _ => None,
    }
}

/// TaPoS prefix: bytes 8..12 of the 32-byte block id, little-endian.
fn ref_block_prefix(block_id: &str) -> EngineResult<u32> {
    let bytes = hex::decode(block_id)
        .map_err(|e| EngineError::HeaderDerivation(format!("malformed block id: {e}")))?;
    if bytes.len() < 12 {
        return Err(EngineError::HeaderDerivation(format!(
            "block id too short: {} bytes",
            bytes.len()
        )));
    }
    Ok(u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn info() -> ChainInfo {
        ChainInfo {
            chain_id: "cf057bbfb726".to_string(),
            head_block_number: 0x0001_0002_0003_1234,
            head_block_id: "00000001aabbccdd0011223344556677".to_string(),
            head_block_time: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            suggested_fee: None,
        }
    }

    fn chain() -> EosChain {
        EosChain::new("cf057bbfb726", 300)
    }

    #[test]
    fn test_make_header_tapos_fields() {
        let header = chain().make_header(&info()).unwrap();
        assert_eq!(header.ref_block_num, 0x1234);
        // bytes 8..12 of the id: 00 11 22 33, little-endian
        assert_eq!(header.ref_block_prefix, 0x3322_1100);
        assert_eq!(
            header.expiration,
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 5, 0).unwrap()
        );
    }

    #[test]
    fn test_make_header_rejects_malformed_block_id() {
        let mut bad = info();
        bad.head_block_id = "zzzz".to_string();
        assert!(matches!(
            chain().make_header(&bad),
            Err(EngineError::HeaderDerivation(_))
        ));
    }

    #[test]
    fn test_raw_round_trip_and_chain_binding() {
        let c = chain();
        let header = c.make_header(&info()).unwrap();
        let actions = vec![EosAction {
            account: Address::new("eosio.token"),
            name: "transfer".to_string(),
            authorization: vec![EosPermission::active(&Address::new("alice"))],
            data: serde_json::json!({ "from": "alice", "to": "bob" }),
        }];

        let raw = c.encode_signable(&header, &actions).unwrap();
        let (decoded_header, decoded_actions) = c.decode_raw(&raw).unwrap();
        assert_eq!(decoded_header, header);
        assert_eq!(decoded_actions, actions);

        // a body encoded for a different chain id must not decode
        let other = EosChain::new("another-chain", 300);
        assert!(matches!(
            other.decode_raw(&raw),
            Err(EngineError::InvalidRaw(_))
        ));
    }

    #[test]
    fn test_account_name_validation() {
        assert!(is_valid_account_name("alice"));
        assert!(is_valid_account_name("eosio.token"));
        assert!(is_valid_account_name("a1b2c3d4e5"));
        assert!(!is_valid_account_name("Alice"));
        assert!(!is_valid_account_name("toolongaccountname"));
        assert!(!is_valid_account_name("trailing."));
        assert!(!is_valid_account_name(""));
        assert!(!is_valid_account_name("has_underscore"));
    }

    #[test]
    fn test_quantity_formatting() {
        assert_eq!(format_quantity("5", "EOS").unwrap(), "5.0000 EOS");
        assert_eq!(format_quantity("5.12", "EOS").unwrap(), "5.1200 EOS");
        assert_eq!(format_quantity("0.0001", "SYS").unwrap(), "0.0001 SYS");
        assert!(format_quantity("5.00001", "EOS").is_err());
        assert!(format_quantity("-3", "EOS").is_err());
        assert!(format_quantity("abc", "EOS").is_err());

        assert_eq!(
            parse_quantity("5.0000 EOS").unwrap(),
            ("5.0000".to_string(), "EOS".to_string())
        );
        assert!(parse_quantity("5 EOS").is_none());
        assert!(parse_quantity("garbage").is_none());
    }

    #[test]
    fn test_sole_authorization_contract() {
        let alice = EosPermission::active(&Address::new("alice"));
        let bob = EosPermission::active(&Address::new("bob"));

        assert_eq!(sole_authorization(&[alice.clone()]), Some(&alice));
        assert_eq!(sole_authorization(&[]), None);
        assert_eq!(sole_authorization(&[alice, bob]), None);
    }

    #[test]
    fn test_validate_requires_authorization() {
        let c = chain();
        let header = c.make_header(&info()).unwrap();
        let action = EosAction {
            account: Address::new("eosio.token"),
            name: "transfer".to_string(),
            authorization: vec![],
            data: serde_json::json!({}),
        };
        assert!(matches!(
            c.validate(&header, &[action], None),
            Err(EngineError::Validation(_))
        ));
    }
}
