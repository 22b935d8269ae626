//! Chain family plugins
//!
//! One module per family: the [`ChainSpec`](crate::chain::ChainSpec)
//! implementation with its native instruction and header types, the chain's
//! field validators, and its action codec set behind a process-wide
//! registry.

pub mod algorand;
pub mod eosio;
pub mod ethereum;
pub mod polkadot;
