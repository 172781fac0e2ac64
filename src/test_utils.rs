//! In-memory stand-ins for the chain, the dispatcher and the notification service

use async_trait::async_trait;
use ethers::types::{Address, U256};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::chain::{PayoutDispatcher, PayoutReceipt, PotReader, RevertReason, Simulation};
use crate::core::{Pot, PotId};
use crate::error::{ChainError, DispatchError, NotifyError};
use crate::notify::{Identity, NotificationMessage, Notifier};

pub fn address(n: u8) -> Address {
    Address::from_low_u64_be(0x1000 + n as u64)
}

pub fn pot(id: PotId, deadline: u64, balance: u64) -> Pot {
    Pot {
        id,
        creator: Address::repeat_byte(0xaa),
        name: String::new(),
        round: 0,
        deadline,
        balance: U256::from(balance),
        token: Address::repeat_byte(0xbb),
        entry_amount: U256::from(10u64),
        period: 7 * 24 * 3_600,
        total_participants: 0,
        max_participants: 10,
        is_public: true,
    }
}

#[derive(Default)]
pub struct FakeChain {
    pots: Mutex<HashMap<PotId, Pot>>,
    participants: Mutex<HashMap<PotId, Vec<Address>>>,
    reverts: Mutex<HashMap<PotId, String>>,
    failing_reads: Mutex<HashSet<PotId>>,
    failing_simulations: Mutex<HashSet<PotId>>,
    failing_participants: Mutex<HashSet<PotId>>,
    pot_count_fails: AtomicBool,
    reads: Mutex<Vec<PotId>>,
    simulated: Mutex<Vec<PotId>>,
}

impl FakeChain {
    pub fn new(pots: Vec<Pot>) -> Self {
        let chain = Self::default();
        for p in pots {
            chain.update_pot(p);
        }
        chain
    }

    pub fn update_pot(&self, pot: Pot) {
        self.pots.lock().unwrap().insert(pot.id, pot);
    }

    pub fn set_participants(&self, pot_id: PotId, participants: Vec<Address>) {
        self.participants.lock().unwrap().insert(pot_id, participants);
    }

    pub fn revert_simulation(&self, pot_id: PotId, reason: &str) {
        self.reverts.lock().unwrap().insert(pot_id, reason.to_string());
    }

    pub fn fail_reads(&self, pot_id: PotId) {
        self.failing_reads.lock().unwrap().insert(pot_id);
    }

    pub fn fail_simulation(&self, pot_id: PotId) {
        self.failing_simulations.lock().unwrap().insert(pot_id);
    }

    pub fn fail_participants(&self, pot_id: PotId) {
        self.failing_participants.lock().unwrap().insert(pot_id);
    }

    pub fn fail_pot_count(&self) {
        self.pot_count_fails.store(true, Ordering::SeqCst);
    }

    pub fn read_count(&self, pot_id: PotId) -> usize {
        self.reads.lock().unwrap().iter().filter(|id| **id == pot_id).count()
    }

    pub fn simulated(&self) -> Vec<PotId> {
        self.simulated.lock().unwrap().clone()
    }
}

#[async_trait]
impl PotReader for FakeChain {
    async fn pot_count(&self) -> Result<u64, ChainError> {
        if self.pot_count_fails.load(Ordering::SeqCst) {
            return Err(ChainError::Transport("connection refused".to_string()));
        }
        Ok(self
            .pots
            .lock()
            .unwrap()
            .keys()
            .max()
            .map(|id| id + 1)
            .unwrap_or(0))
    }

    async fn get_pot(&self, pot_id: PotId) -> Result<Pot, ChainError> {
        self.reads.lock().unwrap().push(pot_id);
        if self.failing_reads.lock().unwrap().contains(&pot_id) {
            return Err(ChainError::Transport("request timed out".to_string()));
        }
        self.pots
            .lock()
            .unwrap()
            .get(&pot_id)
            .cloned()
            .ok_or(ChainError::UnknownPot(pot_id))
    }

    async fn get_participants(&self, pot_id: PotId) -> Result<Vec<Address>, ChainError> {
        if self.failing_participants.lock().unwrap().contains(&pot_id) {
            return Err(ChainError::Transport("request timed out".to_string()));
        }
        Ok(self
            .participants
            .lock()
            .unwrap()
            .get(&pot_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn simulate_payout(&self, pot_id: PotId) -> Result<Simulation, ChainError> {
        self.simulated.lock().unwrap().push(pot_id);
        if self.failing_simulations.lock().unwrap().contains(&pot_id) {
            return Err(ChainError::Transport("request timed out".to_string()));
        }
        match self.reverts.lock().unwrap().get(&pot_id) {
            Some(reason) => Ok(Err(RevertReason(reason.clone()))),
            None => Ok(Ok(())),
        }
    }
}

#[derive(Default)]
pub struct FakeDispatcher {
    calls: Mutex<Vec<Vec<PotId>>>,
    revert: AtomicBool,
    delay: Mutex<Duration>,
}

impl FakeDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn revert_batches(&self) {
        self.revert.store(true, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn calls(&self) -> Vec<Vec<PotId>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PayoutDispatcher for FakeDispatcher {
    async fn dispatch_payouts(&self, pot_ids: &[PotId]) -> Result<PayoutReceipt, DispatchError> {
        if pot_ids.is_empty() {
            return Err(DispatchError::EmptyBatch);
        }
        self.calls.lock().unwrap().push(pot_ids.to_vec());

        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let tx_hash = format!("0x{:064x}", self.calls.lock().unwrap().len());
        if self.revert.load(Ordering::SeqCst) {
            return Err(DispatchError::Reverted { tx_hash });
        }
        Ok(PayoutReceipt {
            tx_hash,
            block_number: Some(1),
            gas_used: Some(21_000),
            pot_ids: pot_ids.to_vec(),
        })
    }
}

#[derive(Default)]
pub struct FakeNotifier {
    registry: Mutex<HashMap<Address, Vec<Identity>>>,
    failing_fids: Mutex<HashSet<u64>>,
    sent: Mutex<Vec<(Vec<u64>, NotificationMessage)>>,
    attempts: AtomicUsize,
}

impl FakeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, address: Address, fid: u64) {
        self.registry
            .lock()
            .unwrap()
            .entry(address)
            .or_default()
            .push(Identity { fid, username: None });
    }

    /// Any send that includes `fid` fails
    pub fn fail_sends_to(&self, fid: u64) {
        self.failing_fids.lock().unwrap().insert(fid);
    }

    pub fn sent(&self) -> Vec<(Vec<u64>, NotificationMessage)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn send_attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Notifier for FakeNotifier {
    async fn resolve_identities(
        &self,
        addresses: &[Address],
    ) -> Result<HashMap<Address, Vec<Identity>>, NotifyError> {
        let registry = self.registry.lock().unwrap();
        Ok(addresses
            .iter()
            .filter_map(|a| registry.get(a).map(|ids| (*a, ids.clone())))
            .collect())
    }

    async fn send_notification(
        &self,
        targets: &[Identity],
        message: &NotificationMessage,
    ) -> Result<(), NotifyError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let fids: Vec<u64> = targets.iter().map(|t| t.fid).collect();
        if fids
            .iter()
            .any(|fid| self.failing_fids.lock().unwrap().contains(fid))
        {
            return Err(NotifyError::Status {
                status: 503,
                body: "service unavailable".to_string(),
            });
        }
        self.sent.lock().unwrap().push((fids, message.clone()));
        Ok(())
    }
}
