use async_trait::async_trait;
use serde::Serialize;

use crate::core::PotId;
use crate::error::DispatchError;

/// Confirmed batch payout transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PayoutReceipt {
    pub tx_hash: String,
    pub block_number: Option<u64>,
    pub gas_used: Option<u64>,
    pub pot_ids: Vec<PotId>,
}

/// Submits payout-triggering transactions
#[async_trait]
pub trait PayoutDispatcher: Send + Sync {
    /// Submit one `triggerBatchPayout` transaction carrying every id and wait until
    /// it is confirmed. A reverted receipt fails the whole batch.
    async fn dispatch_payouts(&self, pot_ids: &[PotId]) -> Result<PayoutReceipt, DispatchError>;
}
