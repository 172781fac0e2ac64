//! Registry contract client over an HTTP provider with a local signer

use async_trait::async_trait;
use ethers::contract::ContractError;
use ethers::middleware::SignerMiddleware;
use ethers::providers::{Http, Middleware, Provider};
use ethers::signers::LocalWallet;
use ethers::types::{Address, TransactionReceipt, U256, U64};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::abi::{decode_pot_name, PotluckRegistry};
use super::dispatcher::{PayoutDispatcher, PayoutReceipt};
use super::reader::{PotReader, RevertReason, Simulation};
use crate::config::KeeperConfig;
use crate::core::{Pot, PotId};
use crate::error::{ChainError, DispatchError};

pub type KeeperSigner = SignerMiddleware<Provider<Http>, LocalWallet>;

pub struct ContractClient {
    contract: PotluckRegistry<KeeperSigner>,
    confirmations: usize,
}

impl ContractClient {
    pub fn new(config: &KeeperConfig, confirmations: usize) -> Result<Self, ChainError> {
        let provider = Provider::<Http>::try_from(config.rpc_url.as_str())
            .map_err(|e| ChainError::Transport(e.to_string()))?;
        let client = Arc::new(SignerMiddleware::new(provider, config.signer.clone()));

        Ok(Self {
            contract: PotluckRegistry::new(config.contract_address, client),
            confirmations,
        })
    }

    /// Check that the node serves the configured chain and the registry is deployed
    pub async fn verify_deployment(&self, expected_chain_id: u64) -> Result<(), ChainError> {
        let client = self.contract.client();

        let chain_id = client
            .get_chainid()
            .await
            .map_err(|e| ChainError::Transport(e.to_string()))?;
        if chain_id != U256::from(expected_chain_id) {
            return Err(ChainError::Decode(format!(
                "RPC node serves chain {} but {} was configured",
                chain_id, expected_chain_id
            )));
        }

        let code = client
            .get_code(self.contract.address(), None)
            .await
            .map_err(|e| ChainError::Transport(e.to_string()))?;
        if code.is_empty() {
            return Err(ChainError::Decode(format!(
                "No contract deployed at registry address {:?}",
                self.contract.address()
            )));
        }

        info!(
            chain_id = expected_chain_id,
            registry = ?self.contract.address(),
            "Registry contract reachable"
        );
        Ok(())
    }
}

fn to_u64(value: U256, field: &str) -> Result<u64, ChainError> {
    if value > U256::from(u64::MAX) {
        return Err(ChainError::Decode(format!("{} out of range: {}", field, value)));
    }
    Ok(value.as_u64())
}

fn map_call_error<M: Middleware>(e: ContractError<M>) -> ChainError {
    match e {
        ContractError::DecodingError(_) | ContractError::DetokenizationError(_) => {
            ChainError::Decode(e.to_string())
        }
        other => ChainError::Transport(other.to_string()),
    }
}

// Some nodes return "execution reverted" without revert data, which ethers
// does not classify as a revert.
fn is_revert<M: Middleware>(e: &ContractError<M>) -> bool {
    e.is_revert() || e.to_string().to_ascii_lowercase().contains("revert")
}

fn revert_reason<M: Middleware>(e: &ContractError<M>) -> RevertReason {
    RevertReason(e.decode_revert::<String>().unwrap_or_else(|| e.to_string()))
}

/// A dry-run that reverts is an answer, not a failure
fn simulation_outcome<M: Middleware>(
    call: Result<(), ContractError<M>>,
) -> Result<Simulation, ChainError> {
    match call {
        Ok(()) => Ok(Ok(())),
        Err(e) if is_revert(&e) => Ok(Err(revert_reason(&e))),
        Err(e) => Err(map_call_error(e)),
    }
}

/// Only a receipt with status 1 counts; a missing status fails the batch too
fn receipt_outcome(
    receipt: Option<TransactionReceipt>,
    tx_hash: String,
    pot_ids: &[PotId],
) -> Result<PayoutReceipt, DispatchError> {
    let Some(receipt) = receipt else {
        return Err(DispatchError::Dropped { tx_hash });
    };
    if receipt.status != Some(U64::from(1)) {
        return Err(DispatchError::Reverted { tx_hash });
    }

    Ok(PayoutReceipt {
        tx_hash,
        block_number: receipt.block_number.map(|n| n.as_u64()),
        gas_used: receipt.gas_used.and_then(|g| to_u64(g, "gasUsed").ok()),
        pot_ids: pot_ids.to_vec(),
    })
}

#[async_trait]
impl PotReader for ContractClient {
    async fn pot_count(&self) -> Result<u64, ChainError> {
        let count = self.contract.pot_count().call().await.map_err(map_call_error)?;
        to_u64(count, "potCount")
    }

    #[instrument(skip(self))]
    async fn get_pot(&self, pot_id: PotId) -> Result<Pot, ChainError> {
        let (
            id,
            creator,
            name,
            round,
            deadline,
            balance,
            token,
            entry_amount,
            period,
            total_participants,
            max_participants,
            is_public,
        ) = self
            .contract
            .pots(U256::from(pot_id))
            .call()
            .await
            .map_err(map_call_error)?;

        if creator == Address::zero() {
            return Err(ChainError::UnknownPot(pot_id));
        }

        let pot = Pot {
            id: to_u64(id, "id")?,
            creator,
            name: decode_pot_name(&name),
            round: to_u64(round, "round")?,
            deadline: to_u64(deadline, "deadline")?,
            balance,
            token,
            entry_amount,
            period: to_u64(period, "period")?,
            total_participants: to_u64(total_participants, "totalParticipants")?,
            max_participants: to_u64(max_participants, "maxParticipants")?,
            is_public,
        };
        debug!(
            pot_id,
            round = pot.round,
            deadline = pot.deadline,
            balance = %pot.balance,
            "Read pot state"
        );
        Ok(pot)
    }

    async fn get_participants(&self, pot_id: PotId) -> Result<Vec<Address>, ChainError> {
        self.contract
            .get_participants(U256::from(pot_id))
            .call()
            .await
            .map_err(map_call_error)
    }

    #[instrument(skip(self))]
    async fn simulate_payout(&self, pot_id: PotId) -> Result<Simulation, ChainError> {
        let call = self.contract.trigger_pot_payout(U256::from(pot_id)).call().await;
        let outcome = simulation_outcome(call)?;
        if let Err(reason) = &outcome {
            debug!(pot_id, reason = %reason, "Payout simulation reverted");
        }
        Ok(outcome)
    }
}

#[async_trait]
impl PayoutDispatcher for ContractClient {
    #[instrument(skip(self), fields(batch_size = pot_ids.len()))]
    async fn dispatch_payouts(&self, pot_ids: &[PotId]) -> Result<PayoutReceipt, DispatchError> {
        if pot_ids.is_empty() {
            return Err(DispatchError::EmptyBatch);
        }

        let ids: Vec<U256> = pot_ids.iter().map(|id| U256::from(*id)).collect();
        let call = self.contract.trigger_batch_payout(ids);
        let pending = call.send().await.map_err(|e| {
            if is_revert(&e) {
                DispatchError::Submission(format!("reverted during estimation: {}", revert_reason(&e)))
            } else {
                DispatchError::Submission(e.to_string())
            }
        })?;

        let tx_hash = format!("{:?}", pending.tx_hash());
        info!(tx_hash = %tx_hash, pot_ids = ?pot_ids, "⚡ Payout batch submitted, awaiting confirmation");

        let receipt = pending
            .confirmations(self.confirmations)
            .await
            .map_err(|e| DispatchError::Confirmation {
                tx_hash: tx_hash.clone(),
                reason: e.to_string(),
            })?;

        let receipt = receipt_outcome(receipt, tx_hash, pot_ids).map_err(|e| {
            warn!(error = %e, "Payout batch did not succeed");
            e
        })?;
        info!(
            tx_hash = %receipt.tx_hash,
            block_number = ?receipt.block_number,
            gas_used = ?receipt.gas_used,
            "✅ Payout batch confirmed"
        );
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::abi::Token;
    use ethers::providers::{MockProvider, ProviderError};
    use ethers::types::Bytes;

    type MockClient = Provider<MockProvider>;

    const TX: &str = "0xabc";

    fn receipt(status: Option<u64>) -> TransactionReceipt {
        TransactionReceipt {
            status: status.map(U64::from),
            block_number: Some(U64::from(42)),
            gas_used: Some(U256::from(84_000u64)),
            ..Default::default()
        }
    }

    fn revert_with_message(message: &str) -> ContractError<MockClient> {
        // Error(string) selector followed by the abi-encoded message
        let mut data = vec![0x08, 0xc3, 0x79, 0xa0];
        data.extend(ethers::abi::encode(&[Token::String(message.to_string())]));
        ContractError::Revert(Bytes::from(data))
    }

    fn provider_error(message: &str) -> ContractError<MockClient> {
        ContractError::ProviderError {
            e: ProviderError::CustomError(message.to_string()),
        }
    }

    #[test]
    fn test_successful_receipt_carries_batch() {
        let out = receipt_outcome(Some(receipt(Some(1))), TX.to_string(), &[3, 5]).unwrap();
        assert_eq!(out.tx_hash, TX);
        assert_eq!(out.block_number, Some(42));
        assert_eq!(out.gas_used, Some(84_000));
        assert_eq!(out.pot_ids, vec![3, 5]);
    }

    #[test]
    fn test_failed_status_reverts_whole_batch() {
        let err = receipt_outcome(Some(receipt(Some(0))), TX.to_string(), &[3, 5]).unwrap_err();
        assert!(matches!(err, DispatchError::Reverted { ref tx_hash } if tx_hash == TX));
    }

    #[test]
    fn test_missing_status_is_not_success() {
        let err = receipt_outcome(Some(receipt(None)), TX.to_string(), &[3]).unwrap_err();
        assert!(matches!(err, DispatchError::Reverted { .. }));
    }

    #[test]
    fn test_missing_receipt_means_dropped() {
        let err = receipt_outcome(None, TX.to_string(), &[3]).unwrap_err();
        assert!(matches!(err, DispatchError::Dropped { ref tx_hash } if tx_hash == TX));
    }

    #[test]
    fn test_simulation_success() {
        let outcome = simulation_outcome::<MockClient>(Ok(())).unwrap();
        assert_eq!(outcome, Ok(()));
    }

    #[test]
    fn test_simulation_revert_is_a_value_with_reason() {
        let outcome = simulation_outcome(Err(revert_with_message("round still open"))).unwrap();
        assert_eq!(outcome, Err(RevertReason("round still open".to_string())));
    }

    #[test]
    fn test_bare_execution_reverted_message_counts_as_revert() {
        let outcome = simulation_outcome(Err(provider_error("execution reverted"))).unwrap();
        assert!(outcome.unwrap_err().0.contains("execution reverted"));
    }

    #[test]
    fn test_transport_failure_is_an_error() {
        let err = simulation_outcome(Err(provider_error("connection refused"))).unwrap_err();
        assert!(matches!(err, ChainError::Transport(_)));
    }

    #[test]
    fn test_out_of_range_values_are_rejected() {
        assert_eq!(to_u64(U256::from(7u64), "round").unwrap(), 7);
        assert!(matches!(
            to_u64(U256::from(u64::MAX) + U256::one(), "round"),
            Err(ChainError::Decode(_))
        ));
    }
}
