use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::chain::PotReader;
use crate::core::{CachedPotState, Eligibility, PotId, Precheck};
use crate::error::ChainError;

/// Decides what to do with a pot this cycle.
///
/// Local state only decides whether the contract needs to be asked. The payout rule
/// itself lives in the contract, so a pot past its deadline with funds is classified by
/// dry-running `triggerPotPayout`: success means payout, a revert means termination.
pub struct EligibilityClassifier {
    reader: Arc<dyn PotReader>,
}

impl EligibilityClassifier {
    pub fn new(reader: Arc<dyn PotReader>) -> Self {
        Self { reader }
    }

    #[instrument(skip(self, state), fields(deadline = state.deadline, balance = %state.balance))]
    pub async fn classify(
        &self,
        pot_id: PotId,
        state: &CachedPotState,
        now: u64,
    ) -> Result<Eligibility, ChainError> {
        match Precheck::evaluate(state, now) {
            Precheck::NotDue => Ok(Eligibility::NotDue),
            Precheck::Ended => {
                debug!(pot_id, "Pot has no balance left, nothing to pay out");
                Ok(Eligibility::Ended)
            }
            Precheck::NeedsSimulation => match self.reader.simulate_payout(pot_id).await? {
                Ok(()) => {
                    info!(pot_id, "Pot ready for payout");
                    Ok(Eligibility::Payout)
                }
                Err(reason) => {
                    info!(pot_id, reason = %reason, "Payout simulation reverted, pot ready for termination");
                    Ok(Eligibility::Termination)
                }
            },
        }
    }
}
