//! Transaction lifecycle state machine
//!
//! A transaction moves through `Empty -> ActionsSet -> PreparedToBeSigned
//! -> Validated -> Signed -> Sent` with a single centralized state check
//! per operation. Attaching a signature freezes the body: any mutation
//! afterwards is an error, never a silent re-encode, so a signer can never
//! be made to have signed stale data.

use super::multisig::MultisigRequirement;
use super::state::TxState;
use crate::chain::normalizer::{normalize_node_error, ErrorCategory};
use crate::chain::{
    body_digest, Address, AttachedSignature, ChainSpec, KeySigner, NodeClient, PrivateKey,
    Signature, TxResult,
};
use crate::error::{EngineError, EngineResult};

use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// A transaction for one chain family, owned exclusively by its creator.
///
/// Independent transactions may be in flight concurrently; no state is
/// shared between instances. Instances are discarded after send or
/// failure, never pooled.
pub struct Transaction<C: ChainSpec> {
    chain: Arc<C>,
    state: TxState,
    header: Option<C::Header>,
    actions: Vec<C::Instruction>,
    raw: Option<Vec<u8>>,
    signatures: Vec<AttachedSignature>,
    multisig: Option<MultisigRequirement>,
}

impl<C: ChainSpec> Transaction<C> {
    /// Create an empty single-signer transaction.
    pub fn new(chain: Arc<C>) -> Self {
        Self {
            chain,
            state: TxState::Empty,
            header: None,
            actions: Vec::new(),
            raw: None,
            signatures: Vec::new(),
            multisig: None,
        }
    }

    /// Create an empty transaction carrying a multi-signature requirement.
    pub fn new_multisig(chain: Arc<C>, requirement: MultisigRequirement) -> Self {
        let mut tx = Self::new(chain);
        tx.multisig = Some(requirement);
        tx
    }

    pub fn state(&self) -> TxState {
        self.state
    }

    pub fn actions(&self) -> &[C::Instruction] {
        &self.actions
    }

    pub fn header(&self) -> Option<&C::Header> {
        self.header.as_ref()
    }

    /// Canonical signable body, present once prepared.
    pub fn raw(&self) -> Option<&[u8]> {
        self.raw.as_deref()
    }

    pub fn has_raw(&self) -> bool {
        self.raw.is_some()
    }

    /// Engine-side identity of the prepared body.
    pub fn body_digest(&self) -> Option<String> {
        self.raw.as_deref().map(body_digest)
    }

    pub fn signatures(&self) -> &[AttachedSignature] {
        &self.signatures
    }

    pub fn multisig(&self) -> Option<&MultisigRequirement> {
        self.multisig.as_ref()
    }

    /// Attach the ordered action list. Caller-supplied order is preserved
    /// through to broadcast.
    pub fn set_actions(&mut self, actions: Vec<C::Instruction>) -> EngineResult<()> {
        self.assert_mutable("set_actions")?;
        self.actions = actions;
        self.raw = None;
        self.state = TxState::ActionsSet;
        debug!(
            chain = self.chain.id(),
            count = self.actions.len(),
            "actions attached"
        );
        Ok(())
    }

    /// Replace the header (e.g. a caller-managed nonce). Clears any
    /// prepared body; the transaction must be re-prepared and re-validated.
    pub fn set_header(&mut self, header: C::Header) -> EngineResult<()> {
        self.assert_mutable("set_header")?;
        self.header = Some(header);
        self.raw = None;
        if !matches!(self.state, TxState::Empty) {
            self.state = TxState::ActionsSet;
        }
        Ok(())
    }

    /// Alternative entry point for co-signing: decode a previously encoded
    /// body directly, bypassing composition.
    ///
    /// Lands holding the decoded raw bytes so every co-signer validates
    /// and signs the identical byte sequence; re-preparing would re-derive
    /// header material and change the signable body.
    pub fn set_from_raw(&mut self, raw: &[u8]) -> EngineResult<()> {
        if !matches!(self.state, TxState::Empty) {
            return Err(EngineError::InvalidState {
                state: self.state,
                operation: "set_from_raw",
            });
        }
        let (header, actions) = self.chain.decode_raw(raw)?;
        self.header = Some(header);
        self.actions = actions;
        self.raw = Some(raw.to_vec());
        self.state = TxState::PreparedToBeSigned;
        debug!(
            chain = self.chain.id(),
            digest = %body_digest(raw),
            "transaction restored from raw body"
        );
        Ok(())
    }

    /// Compute the canonical signable body, fetching header material from
    /// the node if none was set. Freezes header and actions for signing.
    pub async fn prepare_to_be_signed(&mut self, node: &dyn NodeClient) -> EngineResult<()> {
        self.assert_mutable("prepare_to_be_signed")?;
        if self.actions.is_empty() {
            return Err(EngineError::NoActionsPresent);
        }

        if self.header.is_none() {
            let info = node
                .chain_info()
                .await
                .map_err(|e| normalize_node_error(&e, Some(ErrorCategory::ChainState)).into_engine())?;
            self.header = Some(self.chain.make_header(&info)?);
        }

        let header = self.header.as_ref().ok_or(EngineError::HeaderDerivation(
            "header unavailable after derivation".to_string(),
        ))?;
        let raw = self.chain.encode_signable(header, &self.actions)?;
        debug!(
            chain = self.chain.id(),
            digest = %body_digest(&raw),
            "transaction prepared to be signed"
        );
        self.raw = Some(raw);
        self.state = TxState::PreparedToBeSigned;
        Ok(())
    }

    /// Run chain-specific semantic checks over the prepared body.
    ///
    /// Must be re-run whenever the body is regenerated; `sign` refuses to
    /// run before it.
    pub fn validate(&mut self) -> EngineResult<()> {
        if !matches!(
            self.state,
            TxState::PreparedToBeSigned | TxState::Validated
        ) {
            return Err(EngineError::InvalidState {
                state: self.state,
                operation: "validate",
            });
        }
        if let Some(requirement) = &self.multisig {
            requirement.validate()?;
        }
        let header = self.header.as_ref().ok_or(EngineError::InvalidState {
            state: self.state,
            operation: "validate",
        })?;
        self.chain
            .validate(header, &self.actions, self.multisig.as_ref())?;
        self.state = TxState::Validated;
        Ok(())
    }

    /// Append signatures from the given keys.
    ///
    /// Single-signer transactions accept exactly one key per call; a
    /// multisig transaction may be signed incrementally with any subset of
    /// the required keys. A repeat signature from an already-collected
    /// signer is a no-op unless the chain forbids redundant signing.
    pub fn sign(&mut self, keys: &[PrivateKey], signer: &dyn KeySigner) -> EngineResult<()> {
        if !matches!(self.state, TxState::Validated | TxState::Signed) {
            return Err(EngineError::NotValidated);
        }
        if self.multisig.is_none() && keys.len() != 1 {
            return Err(EngineError::Signing(format!(
                "single-signer transaction takes exactly one key per call, got {}",
                keys.len()
            )));
        }
        let raw = self.raw.clone().ok_or(EngineError::InvalidState {
            state: self.state,
            operation: "sign",
        })?;

        for key in keys {
            let address = signer.address_of(key)?;
            if !self.admit_signer(&address)? {
                continue;
            }

            let signature = signer.sign(&raw, key)?;
            self.signatures.push(AttachedSignature {
                signer: address.clone(),
                signature,
            });
            info!(
                chain = self.chain.id(),
                %address,
                collected = self.signatures.len(),
                "signature attached"
            );
        }

        self.state = TxState::Signed;
        Ok(())
    }

    /// Attach an externally produced signature, resolving its signer by
    /// recovery against the signable body.
    ///
    /// This is the co-signing path: only the signature value travels
    /// between participants, and the engine determines who it belongs to.
    pub fn add_signature(
        &mut self,
        signature: Signature,
        signer: &dyn KeySigner,
    ) -> EngineResult<()> {
        if !matches!(self.state, TxState::Validated | TxState::Signed) {
            return Err(EngineError::NotValidated);
        }
        let raw = self.raw.clone().ok_or(EngineError::InvalidState {
            state: self.state,
            operation: "add_signature",
        })?;

        let address = signer.recover(&signature, &raw)?;
        if self.admit_signer(&address)? {
            self.signatures.push(AttachedSignature {
                signer: address.clone(),
                signature,
            });
            info!(
                chain = self.chain.id(),
                %address,
                collected = self.signatures.len(),
                "external signature attached"
            );
        }
        self.state = TxState::Signed;
        Ok(())
    }

    /// Admit `address` into the collected signer set.
    ///
    /// `Ok(false)` means the signature is a redundant no-op to skip;
    /// `UnknownSigner` when a multisig requirement does not list the
    /// address, `AlreadyFullySigned` when the chain forbids redundancy.
    fn admit_signer(&mut self, address: &Address) -> EngineResult<bool> {
        let forbids_redundant = self.chain.forbids_redundant_signing();
        match self.multisig.as_mut() {
            Some(requirement) => {
                if forbids_redundant && requirement.has_all_required_signatures() {
                    return Err(EngineError::AlreadyFullySigned);
                }
                if !requirement.record(address)? {
                    if forbids_redundant {
                        return Err(EngineError::AlreadyFullySigned);
                    }
                    return Ok(false);
                }
            }
            None => {
                if self.signatures.iter().any(|s| s.signer == *address) {
                    if forbids_redundant {
                        return Err(EngineError::AlreadyFullySigned);
                    }
                    debug!(%address, "duplicate signature ignored");
                    return Ok(false);
                }
                if forbids_redundant && !self.signatures.is_empty() {
                    return Err(EngineError::AlreadyFullySigned);
                }
            }
        }
        Ok(true)
    }

    /// Whether the signature requirement is satisfied: threshold for
    /// multisig, at least one signature otherwise.
    pub fn has_all_required_signatures(&self) -> bool {
        match &self.multisig {
            Some(requirement) => requirement.has_all_required_signatures(),
            None => !self.signatures.is_empty(),
        }
    }

    /// Outstanding signer addresses, or `None` once fully satisfied.
    ///
    /// Without a multisig requirement the designated signer set is not
    /// known to the engine; the list is empty until the first signature
    /// flips the result to `None`.
    pub fn missing_signatures(&self) -> Option<Vec<Address>> {
        match &self.multisig {
            Some(requirement) => requirement.missing_signatures(),
            None => {
                if self.signatures.is_empty() {
                    Some(Vec::new())
                } else {
                    None
                }
            }
        }
    }

    /// Broadcast through the node collaborator.
    ///
    /// Signatures are sorted by signer address here, once - broadcast
    /// payload decoding on some chains requires it, and collection order
    /// must not matter. On node failure the normalized error is returned
    /// and the transaction remains `Signed`; retry is caller-driven, since
    /// a blind retry can double-submit.
    pub async fn send(&mut self, node: &dyn NodeClient) -> EngineResult<TxResult> {
        if !matches!(self.state, TxState::Signed) {
            return Err(EngineError::InvalidState {
                state: self.state,
                operation: "send",
            });
        }
        if !self.has_all_required_signatures() {
            let (missing, required) = match &self.multisig {
                Some(req) => (
                    req.threshold().saturating_sub(req.collected_count()),
                    req.threshold(),
                ),
                None => (1, 1),
            };
            return Err(EngineError::MissingSignature { missing, required });
        }
        let raw = self.raw.clone().ok_or(EngineError::InvalidState {
            state: self.state,
            operation: "send",
        })?;

        let mut signatures = self.signatures.clone();
        signatures.sort_by(|a, b| a.signer.cmp(&b.signer));

        match node.broadcast(&raw, &signatures).await {
            Ok(result) => {
                self.state = TxState::Sent;
                info!(
                    chain = self.chain.id(),
                    transaction_id = %result.transaction_id,
                    "transaction sent"
                );
                Ok(result)
            }
            Err(node_error) => {
                let normalized =
                    normalize_node_error(&node_error, Some(ErrorCategory::Transaction));
                warn!(
                    chain = self.chain.id(),
                    kind = %normalized.kind,
                    raw = %normalized.raw,
                    "broadcast rejected; transaction remains signed"
                );
                Err(normalized.into_engine())
            }
        }
    }

    /// [`send`](Self::send) bounded by a wall-clock budget.
    ///
    /// On timeout the broadcast may still land on-chain; the transaction
    /// stays `Signed` and the caller decides whether to re-send.
    pub async fn send_with_timeout(
        &mut self,
        node: &dyn NodeClient,
        budget: Duration,
    ) -> EngineResult<TxResult> {
        match timeout(budget, self.send(node)).await {
            Ok(result) => result,
            Err(_) => Err(EngineError::Timeout {
                operation: "send transaction".to_string(),
            }),
        }
    }

    /// Body mutations are allowed only before any signature is attached
    /// and before the transaction is sent.
    fn assert_mutable(&self, operation: &'static str) -> EngineResult<()> {
        if !self.signatures.is_empty() {
            return Err(EngineError::MutationAfterSigning);
        }
        if matches!(self.state, TxState::Sent) {
            return Err(EngineError::InvalidState {
                state: self.state,
                operation,
            });
        }
        Ok(())
    }
}
