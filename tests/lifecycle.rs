//! End-to-end lifecycle scenarios against stub collaborators

use chainspan::chains::eosio::{self, EosChain};
use chainspan::{
    ActionKind, ActionParams, Address, AttachedSignature, BlockRef, BlockSummary, ChainInfo,
    ConfirmationPoller, EngineError, EngineResult, KeySigner, MultisigRequirement, NodeClient,
    NodeError, PrivateKey, Signature, Transaction, TxResult, TxState, TxStatus,
};

use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

const CHAIN_ID: &str = "cf057bbfb726ca578023e305eee34cf06158a5b3e279625c0b44af3b8b1480ba";

/// Node stub: serves chain info, accepts broadcasts, reports inclusion
/// after one pending poll.
struct FakeNode {
    broadcasts: AtomicU32,
}

impl FakeNode {
    fn new() -> Self {
        Self {
            broadcasts: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl NodeClient for FakeNode {
    async fn chain_info(&self) -> Result<ChainInfo, NodeError> {
        Ok(ChainInfo {
            chain_id: CHAIN_ID.to_string(),
            head_block_number: 0x0000_0000_abcd_1234,
            head_block_id: "000000001111222233445566778899aabbccddeeff00112233445566778899aa"
                .to_string(),
            head_block_time: Utc::now(),
            suggested_fee: None,
        })
    }

    async fn get_block(&self, reference: BlockRef) -> Result<BlockSummary, NodeError> {
        let number = match reference {
            BlockRef::Number(n) => n,
            BlockRef::Id(_) => 0,
        };
        Ok(BlockSummary {
            number,
            id: format!("{number:064x}"),
            time: Utc::now(),
        })
    }

    async fn broadcast(
        &self,
        raw: &[u8],
        signatures: &[AttachedSignature],
    ) -> Result<TxResult, NodeError> {
        if signatures.is_empty() {
            return Err(NodeError::new(
                Some("unsatisfied_authorization"),
                "transaction declares no signatures",
            ));
        }
        self.broadcasts.fetch_add(1, Ordering::SeqCst);
        Ok(TxResult {
            transaction_id: chainspan::chain::body_digest(raw),
            block_number: None,
            payload: serde_json::json!({ "processed": { "receipt": { "status": "executed" } } }),
        })
    }

    async fn transaction_status(&self, _transaction_id: &str) -> Result<TxStatus, NodeError> {
        if self.broadcasts.load(Ordering::SeqCst) == 0 {
            Ok(TxStatus::Unknown)
        } else {
            Ok(TxStatus::Confirmed {
                block_number: 0xabcd_1235,
            })
        }
    }
}

/// Signer stub: key handle "k:<account>" signs for account "<account>".
struct FakeSigner;

impl FakeSigner {
    fn owner(key: &PrivateKey) -> EngineResult<String> {
        key.as_str()
            .strip_prefix("k:")
            .map(str::to_string)
            .ok_or_else(|| EngineError::Signing("unknown key handle".to_string()))
    }
}

impl KeySigner for FakeSigner {
    fn sign(&self, message: &[u8], key: &PrivateKey) -> EngineResult<Signature> {
        let owner = Self::owner(key)?;
        let mut bytes = owner.clone().into_bytes();
        bytes.push(0);
        bytes.extend_from_slice(&message[..message.len().min(8)]);
        Ok(Signature::new(bytes))
    }

    fn address_of(&self, key: &PrivateKey) -> EngineResult<Address> {
        Ok(Address::new(Self::owner(key)?))
    }

    fn recover(&self, signature: &Signature, _message: &[u8]) -> EngineResult<Address> {
        let bytes = signature.as_bytes();
        let split = bytes
            .iter()
            .position(|b| *b == 0)
            .ok_or_else(|| EngineError::Signing("unrecoverable signature".to_string()))?;
        Ok(Address::new(
            String::from_utf8(bytes[..split].to_vec())
                .map_err(|e| EngineError::Signing(e.to_string()))?,
        ))
    }
}

fn key(name: &str) -> PrivateKey {
    PrivateKey::new(format!("k:{name}"))
}

/// Route engine logs through the test harness when RUST_LOG is set.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn value_transfer(amount: &str) -> ActionParams {
    ActionParams::ValueTransfer(chainspan::action::ValueTransferParams {
        from: Address::new("alice"),
        to: Address::new("bob"),
        amount: amount.to_string(),
        symbol: None,
        memo: None,
    })
}

#[tokio::test]
async fn end_to_end_value_transfer() {
    init_tracing();
    let node = FakeNode::new();
    let chain = Arc::new(EosChain::new(CHAIN_ID, 300));

    let actions = eosio::registry()
        .compose(ActionKind::ValueTransfer, &value_transfer("5"))
        .unwrap();

    let mut tx = Transaction::new(chain);
    tx.set_actions(actions).unwrap();
    tx.prepare_to_be_signed(&node).await.unwrap();
    tx.validate().unwrap();
    tx.sign(&[key("alice")], &FakeSigner).unwrap();
    assert!(tx.missing_signatures().is_none());

    let result = tx.send(&node).await.unwrap();
    assert_eq!(tx.state(), TxState::Sent);
    assert!(!result.transaction_id.is_empty());

    // and the broadcast is observable as included
    let block = ConfirmationPoller::new(5, Duration::from_millis(1))
        .wait_for_inclusion(&node, &result.transaction_id)
        .await
        .unwrap();
    assert_eq!(block, 0xabcd_1235);
}

#[tokio::test]
async fn multisig_collects_until_threshold() {
    let node = FakeNode::new();
    let chain = Arc::new(EosChain::new(CHAIN_ID, 300));
    let requirement = MultisigRequirement::new(
        2,
        vec![
            Address::new("alice"),
            Address::new("bob"),
            Address::new("carol"),
        ],
    )
    .unwrap();

    let actions = eosio::registry()
        .compose(ActionKind::ValueTransfer, &value_transfer("12.3"))
        .unwrap();

    let mut tx = Transaction::new_multisig(chain, requirement);
    tx.set_actions(actions).unwrap();
    tx.prepare_to_be_signed(&node).await.unwrap();
    tx.validate().unwrap();

    tx.sign(&[key("alice")], &FakeSigner).unwrap();
    assert_eq!(
        tx.missing_signatures().unwrap(),
        vec![Address::new("bob"), Address::new("carol")]
    );
    assert!(matches!(
        tx.send(&node).await.unwrap_err(),
        EngineError::MissingSignature { .. }
    ));

    tx.sign(&[key("bob")], &FakeSigner).unwrap();
    assert!(tx.missing_signatures().is_none());
    tx.send(&node).await.unwrap();
    assert_eq!(tx.state(), TxState::Sent);
}

#[tokio::test]
async fn cosigner_signs_identical_body_from_raw() {
    let node = FakeNode::new();
    let chain = Arc::new(EosChain::new(CHAIN_ID, 300));

    let actions = eosio::registry()
        .compose(ActionKind::ValueTransfer, &value_transfer("1"))
        .unwrap();

    let mut original = Transaction::new(chain.clone());
    original.set_actions(actions).unwrap();
    original.prepare_to_be_signed(&node).await.unwrap();
    let exported = original.raw().unwrap().to_vec();
    let original_digest = original.body_digest().unwrap();

    // the co-signer rebuilds the transaction from the exported body alone
    let mut cosigned = Transaction::new(chain);
    cosigned.set_from_raw(&exported).unwrap();
    assert_eq!(cosigned.body_digest().unwrap(), original_digest);
    assert_eq!(cosigned.state(), TxState::PreparedToBeSigned);

    cosigned.validate().unwrap();
    cosigned.sign(&[key("alice")], &FakeSigner).unwrap();
    let result = cosigned.send(&node).await.unwrap();
    assert_eq!(result.transaction_id, original_digest);
}

#[tokio::test]
async fn decompose_reports_every_interpretation() {
    let actions = eosio::registry()
        .compose(ActionKind::ValueTransfer, &value_transfer("5"))
        .unwrap();

    let matches = eosio::registry().decompose_all(&actions[0]).unwrap();
    assert_eq!(matches.len(), 2);

    // the caller disambiguates by kind
    let token_view = matches
        .iter()
        .find(|m| m.kind == ActionKind::TokenTransfer)
        .unwrap();
    let ActionParams::TokenTransfer(args) = &token_view.args else {
        panic!("wrong params variant");
    };
    assert_eq!(args.contract.as_ref().unwrap().as_str(), "eosio.token");
}

#[tokio::test]
async fn signature_identity_survives_recovery() {
    let node = FakeNode::new();
    let chain = Arc::new(EosChain::new(CHAIN_ID, 300));

    let actions = eosio::registry()
        .compose(ActionKind::ValueTransfer, &value_transfer("2"))
        .unwrap();

    let mut tx = Transaction::new(chain);
    tx.set_actions(actions).unwrap();
    tx.prepare_to_be_signed(&node).await.unwrap();
    tx.validate().unwrap();
    tx.sign(&[key("alice")], &FakeSigner).unwrap();

    let attached = &tx.signatures()[0];
    let recovered = FakeSigner
        .recover(&attached.signature, tx.raw().unwrap())
        .unwrap();
    assert_eq!(recovered, attached.signer);
}
