use async_trait::async_trait;
use ethers::types::Address;
use std::fmt;

use crate::core::{Pot, PotId};
use crate::error::ChainError;

/// Why the contract refused a simulated call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevertReason(pub String);

impl fmt::Display for RevertReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of a dry-run: `Ok` if the call would succeed
pub type Simulation = Result<(), RevertReason>;

/// Read-only view of the pot registry
#[async_trait]
pub trait PotReader: Send + Sync {
    async fn pot_count(&self) -> Result<u64, ChainError>;

    async fn get_pot(&self, pot_id: PotId) -> Result<Pot, ChainError>;

    async fn get_participants(&self, pot_id: PotId) -> Result<Vec<Address>, ChainError>;

    /// Dry-run `triggerPotPayout` against current chain state without committing it.
    /// A revert is a successful simulation with a negative answer; only transport
    /// and decoding failures are errors.
    async fn simulate_payout(&self, pot_id: PotId) -> Result<Simulation, ChainError>;
}
