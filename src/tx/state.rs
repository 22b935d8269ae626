//! Transaction lifecycle states

use std::fmt;

/// Ordered lifecycle states of a transaction.
///
/// `Empty -> ActionsSet -> PreparedToBeSigned -> Validated -> Signed ->
/// Sent`, no skipping. Wrong-state calls are always fatal to the current
/// operation; silently fixing up state would mask caller bugs that could
/// lead to signing stale data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TxState {
    /// Freshly created, no body yet.
    Empty,
    /// Actions attached; body not yet encoded.
    ActionsSet,
    /// Canonical signable body computed; header and actions frozen.
    PreparedToBeSigned,
    /// Chain-specific semantic checks passed for the current body.
    Validated,
    /// At least one signature attached. Partial until the signature
    /// requirement is met, complete after.
    Signed,
    /// Broadcast accepted by the node. Terminal.
    Sent,
}

impl fmt::Display for TxState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TxState::Empty => "empty",
            TxState::ActionsSet => "actions_set",
            TxState::PreparedToBeSigned => "prepared_to_be_signed",
            TxState::Validated => "validated",
            TxState::Signed => "signed",
            TxState::Sent => "sent",
        };
        f.write_str(name)
    }
}
