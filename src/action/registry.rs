//! Action codec registry and ambiguity-tolerant decomposer
//!
//! A flat mapping from logical action kind to codec, not a class
//! hierarchy: each chain keeps its own composition logic colocated and
//! independently testable, and structurally unrelated native instructions
//! never share a base type.

use super::{ActionCodec, ActionKind, ActionParams, Decomposed};
use crate::chain::ChainSpec;
use crate::error::{EngineError, EngineResult};

use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Registry of action codecs for one chain family.
///
/// Built once at process init, read-only afterwards; safe to share across
/// concurrently executing transaction lifecycles.
pub struct CodecRegistry<C: ChainSpec> {
    chain: &'static str,
    codecs: Vec<Arc<dyn ActionCodec<C>>>,
    by_kind: HashMap<ActionKind, usize>,
}

impl<C: ChainSpec> CodecRegistry<C> {
    pub fn new(chain: &'static str) -> Self {
        Self {
            chain,
            codecs: Vec::new(),
            by_kind: HashMap::new(),
        }
    }

    /// Register a codec. A later registration for the same kind replaces
    /// the compose mapping; both stay in the decompose list.
    pub fn register<A: ActionCodec<C> + 'static>(&mut self, codec: A) {
        let kind = codec.kind();
        self.codecs.push(Arc::new(codec));
        self.by_kind.insert(kind, self.codecs.len() - 1);
    }

    /// Look up and run the composer for `kind`.
    pub fn compose(
        &self,
        kind: ActionKind,
        params: &ActionParams,
    ) -> EngineResult<Vec<C::Instruction>> {
        let codec = self
            .by_kind
            .get(&kind)
            .map(|idx| &self.codecs[*idx])
            .ok_or(EngineError::UnsupportedActionType {
                chain: self.chain,
                kind,
            })?;
        codec.compose(params)
    }

    /// Try every registered decomposer against the instruction and collect
    /// every match.
    ///
    /// Returns `None` (not an empty vec) when zero decomposers matched, so
    /// callers can distinguish "no match" from "empty action". No
    /// precedence is defined among matches; callers needing one
    /// interpretation filter by `kind` or inspect `args`.
    pub fn decompose_all(&self, instruction: &C::Instruction) -> Option<Vec<Decomposed>> {
        let matches: Vec<Decomposed> = self
            .codecs
            .iter()
            .filter_map(|codec| codec.decompose(instruction))
            .collect();

        if matches.is_empty() {
            debug!(chain = self.chain, "no decomposer matched instruction");
            None
        } else {
            Some(matches)
        }
    }

    pub fn supports(&self, kind: ActionKind) -> bool {
        self.by_kind.contains_key(&kind)
    }

    /// Registered kinds, sorted for deterministic display.
    pub fn kinds(&self) -> Vec<ActionKind> {
        let mut kinds: Vec<ActionKind> = self.by_kind.keys().copied().collect();
        kinds.sort_unstable();
        kinds
    }

    pub fn len(&self) -> usize {
        self.codecs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codecs.is_empty()
    }
}

impl<C: ChainSpec> std::fmt::Debug for CodecRegistry<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodecRegistry")
            .field("chain", &self.chain)
            .field("kinds", &self.kinds())
            .finish()
    }
}
