//! Multi-signature coordination
//!
//! Threshold schemes require "enough, not all": consumers poll readiness
//! without assuming every designated signer participates, and must be able
//! to tell "nobody signed yet" apart from "fully satisfied".

use crate::chain::Address;
use crate::error::{EngineError, EngineResult};

use std::collections::HashSet;
use tracing::debug;

/// A required-signer set with a threshold, tracking collected signatures.
///
/// Attached at transaction creation and read-mostly afterwards; only the
/// collected set grows. Owned exclusively by one transaction, so no
/// interior locking.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MultisigRequirement {
    threshold: usize,
    /// Canonical signer order: construction order, duplicates removed.
    signers: Vec<Address>,
    collected: HashSet<Address>,
}

impl MultisigRequirement {
    /// Create a requirement. Duplicate addresses are dropped, keeping the
    /// first occurrence; `threshold` must be at least 1 and at most the
    /// resulting signer count.
    pub fn new(threshold: usize, signers: Vec<Address>) -> EngineResult<Self> {
        let mut seen = HashSet::new();
        let signers: Vec<Address> = signers
            .into_iter()
            .filter(|addr| seen.insert(addr.clone()))
            .collect();

        let requirement = Self {
            threshold,
            signers,
            collected: HashSet::new(),
        };
        requirement.validate()?;
        Ok(requirement)
    }

    /// Check structural invariants: `1 <= threshold <= signers.len()`.
    /// Collected-set membership is maintained by construction and
    /// [`record`](Self::record).
    pub fn validate(&self) -> EngineResult<()> {
        if self.signers.is_empty() {
            return Err(EngineError::InvalidMultisig(
                "signer set is empty".to_string(),
            ));
        }
        if self.threshold == 0 {
            return Err(EngineError::InvalidMultisig(
                "threshold must be at least 1".to_string(),
            ));
        }
        if self.threshold > self.signers.len() {
            return Err(EngineError::InvalidMultisig(format!(
                "threshold {} exceeds signer count {}",
                self.threshold,
                self.signers.len()
            )));
        }
        Ok(())
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Designated signers in canonical order.
    pub fn signers(&self) -> &[Address] {
        &self.signers
    }

    pub fn collected_count(&self) -> usize {
        self.collected.len()
    }

    pub fn has_signed(&self, signer: &Address) -> bool {
        self.collected.contains(signer)
    }

    /// Record a signature from `signer`.
    ///
    /// Returns `Ok(true)` when newly recorded, `Ok(false)` for an
    /// idempotent repeat, and `UnknownSigner` when the signer is not in
    /// the designated set.
    pub fn record(&mut self, signer: &Address) -> EngineResult<bool> {
        if !self.signers.contains(signer) {
            return Err(EngineError::UnknownSigner(signer.clone()));
        }
        let newly = self.collected.insert(signer.clone());
        if !newly {
            debug!(%signer, "duplicate signature ignored");
        }
        Ok(newly)
    }

    /// Signers that have not signed yet, in canonical order - or `None`
    /// once the threshold is met.
    ///
    /// `None` signals "fully satisfied", not "no gaps": with a threshold
    /// below the signer count, some addresses legitimately never sign.
    pub fn missing_signatures(&self) -> Option<Vec<Address>> {
        if self.has_all_required_signatures() {
            return None;
        }
        Some(
            self.signers
                .iter()
                .filter(|addr| !self.collected.contains(*addr))
                .cloned()
                .collect(),
        )
    }

    pub fn has_all_required_signatures(&self) -> bool {
        self.collected.len() >= self.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abc() -> Vec<Address> {
        vec![Address::new("a"), Address::new("b"), Address::new("c")]
    }

    #[test]
    fn test_threshold_math() {
        let mut req = MultisigRequirement::new(2, abc()).unwrap();

        assert!(!req.has_all_required_signatures());
        assert_eq!(req.missing_signatures().unwrap(), abc());

        assert!(req.record(&Address::new("a")).unwrap());
        assert_eq!(
            req.missing_signatures().unwrap(),
            vec![Address::new("b"), Address::new("c")]
        );

        assert!(req.record(&Address::new("b")).unwrap());
        assert!(req.missing_signatures().is_none());
        assert!(req.has_all_required_signatures());
    }

    #[test]
    fn test_duplicate_signature_changes_nothing() {
        let mut req = MultisigRequirement::new(2, abc()).unwrap();

        assert!(req.record(&Address::new("a")).unwrap());
        assert!(!req.record(&Address::new("a")).unwrap());

        assert_eq!(req.collected_count(), 1);
        assert_eq!(
            req.missing_signatures().unwrap(),
            vec![Address::new("b"), Address::new("c")]
        );
    }

    #[test]
    fn test_unknown_signer_rejected() {
        let mut req = MultisigRequirement::new(2, abc()).unwrap();
        let err = req.record(&Address::new("mallory")).unwrap_err();
        assert!(matches!(err, EngineError::UnknownSigner(addr) if addr.as_str() == "mallory"));
        assert_eq!(req.collected_count(), 0);
    }

    #[test]
    fn test_missing_order_is_canonical_not_signing_order() {
        let mut req = MultisigRequirement::new(3, abc()).unwrap();

        // Sign in reverse order; missing list stays in construction order.
        assert!(req.record(&Address::new("c")).unwrap());
        assert_eq!(
            req.missing_signatures().unwrap(),
            vec![Address::new("a"), Address::new("b")]
        );
        assert!(req.record(&Address::new("b")).unwrap());
        assert_eq!(req.missing_signatures().unwrap(), vec![Address::new("a")]);
    }

    #[test]
    fn test_malformed_requirements() {
        assert!(matches!(
            MultisigRequirement::new(0, abc()),
            Err(EngineError::InvalidMultisig(_))
        ));
        assert!(matches!(
            MultisigRequirement::new(4, abc()),
            Err(EngineError::InvalidMultisig(_))
        ));
        assert!(matches!(
            MultisigRequirement::new(1, vec![]),
            Err(EngineError::InvalidMultisig(_))
        ));
    }

    #[test]
    fn test_duplicate_signers_deduped_preserving_order() {
        let req = MultisigRequirement::new(
            2,
            vec![
                Address::new("a"),
                Address::new("b"),
                Address::new("a"),
                Address::new("c"),
            ],
        )
        .unwrap();
        assert_eq!(req.signers(), &abc()[..]);
    }

    #[test]
    fn test_threshold_below_signer_count_satisfied_early() {
        let mut req = MultisigRequirement::new(1, abc()).unwrap();
        assert!(req.record(&Address::new("b")).unwrap());
        // "c" and "a" never sign; requirement is still fully satisfied.
        assert!(req.missing_signatures().is_none());
    }
}
