//! Confirmation polling with a bounded attempt budget
//!
//! Once a transaction is broadcast, inclusion is observed by polling the
//! node. The budget is bounded: exhausting it fails with a timeout-class
//! error instead of hanging, and the broadcast itself cannot be retracted.

use crate::chain::normalizer::{normalize_node_error, ErrorCategory};
use crate::chain::{NodeClient, TxStatus};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};

use std::time::Duration;
use tracing::{debug, info, warn};

/// Polls a node for on-chain inclusion of a broadcast transaction.
#[derive(Clone, Debug)]
pub struct ConfirmationPoller {
    max_attempts: u32,
    poll_interval: Duration,
}

impl ConfirmationPoller {
    pub fn new(max_attempts: u32, poll_interval: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            poll_interval,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            config.confirm_max_attempts,
            Duration::from_millis(config.confirm_poll_interval_ms),
        )
    }

    /// Wait until the transaction is included, returning its block number.
    ///
    /// Node errors during polling are treated as transient and retried
    /// within the budget; a definitive on-chain failure aborts immediately
    /// with the normalized error.
    pub async fn wait_for_inclusion(
        &self,
        node: &dyn NodeClient,
        transaction_id: &str,
    ) -> EngineResult<u64> {
        for attempt in 1..=self.max_attempts {
            match node.transaction_status(transaction_id).await {
                Ok(TxStatus::Confirmed { block_number }) => {
                    info!(transaction_id, block_number, "transaction confirmed");
                    return Ok(block_number);
                }
                Ok(TxStatus::Failed { reason }) => {
                    let normalized = crate::chain::normalizer::normalize(
                        &reason,
                        Some(ErrorCategory::Transaction),
                    );
                    warn!(transaction_id, reason = %normalized.raw, "transaction failed on-chain");
                    return Err(normalized.into_engine());
                }
                Ok(TxStatus::Pending) | Ok(TxStatus::Unknown) => {
                    debug!(
                        transaction_id,
                        attempt,
                        max_attempts = self.max_attempts,
                        "transaction not yet included"
                    );
                }
                Err(node_error) => {
                    let normalized =
                        normalize_node_error(&node_error, Some(ErrorCategory::Transaction));
                    warn!(
                        transaction_id,
                        attempt,
                        kind = %normalized.kind,
                        "status poll failed; retrying within budget"
                    );
                }
            }

            if attempt < self.max_attempts {
                tokio::time::sleep(self.poll_interval).await;
            }
        }

        Err(EngineError::Timeout {
            operation: format!("confirmation of transaction {transaction_id}"),
        })
    }
}
