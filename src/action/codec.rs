//! Action codec trait

use super::{ActionKind, ActionParams, Decomposed};
use crate::chain::ChainSpec;
use crate::error::EngineResult;

/// A compose/decompose pair for one (chain, action) combination.
///
/// Codecs are pure and stateless; one instance is registered per action at
/// process init and shared read-only afterwards.
pub trait ActionCodec<C: ChainSpec>: Send + Sync {
    /// Logical action this codec composes.
    fn kind(&self) -> ActionKind;

    /// Translate chain-agnostic params into one or more native
    /// instructions. Always a sequence: some actions (account creation with
    /// follow-up resource allocation) compose to several instructions.
    ///
    /// Param precondition checks are the codec's responsibility and fail
    /// with [`EngineError::InvalidParams`](crate::error::EngineError).
    fn compose(&self, params: &ActionParams) -> EngineResult<Vec<C::Instruction>>;

    /// Recognize a native instruction as this codec's logical action.
    ///
    /// Non-recognition is `None`, never an error - a batch decompose must
    /// never abort because one codec did not match.
    fn decompose(&self, instruction: &C::Instruction) -> Option<Decomposed>;
}
