//! Transaction lifecycle, multi-signature coordination and confirmation
//! polling

mod confirm;
mod multisig;
mod state;
mod transaction;

pub use confirm::ConfirmationPoller;
pub use multisig::MultisigRequirement;
pub use state::TxState;
pub use transaction::Transaction;
