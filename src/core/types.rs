use ethers::types::{Address, U256};
use serde::{Deserialize, Serialize};

/// Identifier of a pot in the registry contract
pub type PotId = u64;

/// Pot record as stored by the registry contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pot {
    pub id: PotId,
    pub creator: Address,
    pub name: String,
    pub round: u64,
    pub deadline: u64,
    pub balance: U256,
    pub token: Address,
    pub entry_amount: U256,
    pub period: u64,
    pub total_participants: u64,
    pub max_participants: u64,
    pub is_public: bool,
}

impl Pot {
    /// Narrow the pot to the fields the scan caches between invocations
    pub fn state(&self) -> CachedPotState {
        CachedPotState {
            deadline: self.deadline,
            balance: self.balance,
        }
    }
}

/// Last known deadline and balance of a pot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedPotState {
    pub deadline: u64,
    pub balance: U256,
}

impl CachedPotState {
    pub fn deadline_reached(&self, now: u64) -> bool {
        now >= self.deadline
    }
}

/// Decision that can be made from local state alone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precheck {
    /// Round still open
    NotDue,
    /// Deadline passed but nothing left to disburse
    Ended,
    /// Deadline passed with funds held; the contract has to be asked
    NeedsSimulation,
}

impl Precheck {
    pub fn evaluate(state: &CachedPotState, now: u64) -> Self {
        if !state.deadline_reached(now) {
            Precheck::NotDue
        } else if state.balance.is_zero() {
            Precheck::Ended
        } else {
            Precheck::NeedsSimulation
        }
    }
}

/// Final classification of a pot for the current scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Eligibility {
    NotDue,
    Ended,
    Payout,
    Termination,
}

/// Pot ids collected during one scan, split by eligibility class
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EligibilitySet {
    pub payout_eligible: Vec<PotId>,
    pub termination_eligible: Vec<PotId>,
}

impl EligibilitySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a classification. Returns false when the pot was not added,
    /// either because the class takes no action or the id is already present.
    pub fn insert(&mut self, pot_id: PotId, eligibility: Eligibility) -> bool {
        if self.contains(pot_id) {
            return false;
        }
        match eligibility {
            Eligibility::Payout => self.payout_eligible.push(pot_id),
            Eligibility::Termination => self.termination_eligible.push(pot_id),
            Eligibility::NotDue | Eligibility::Ended => return false,
        }
        true
    }

    pub fn contains(&self, pot_id: PotId) -> bool {
        self.payout_eligible.contains(&pot_id) || self.termination_eligible.contains(&pot_id)
    }

    pub fn is_empty(&self) -> bool {
        self.payout_eligible.is_empty() && self.termination_eligible.is_empty()
    }
}

/// Why a pot received no notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NoParticipants,
    NoResolvedTargets,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NotificationOutcome {
    Sent { recipients: usize },
    Skipped { reason: SkipReason },
    Failed { error: String },
}

/// Result of notifying the participants of a single pot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationReport {
    pub pot_id: PotId,
    pub outcome: NotificationOutcome,
}

impl NotificationReport {
    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, NotificationOutcome::Failed { .. })
    }
}

/// Outcome of one invocation of the payout job
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanResult {
    /// Pots attempted this run. Equals the pot count unless the scan budget ran out,
    /// in which case the unattempted pots are left for the next run.
    pub checked_count: u64,
    pub triggered_count: u64,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub failed_reads: u64,
    pub deferred_terminations: u64,
    pub notifications: Vec<NotificationReport>,
}

impl ScanResult {
    pub fn failed(checked_count: u64, error_message: impl Into<String>) -> Self {
        Self {
            checked_count,
            triggered_count: 0,
            success: false,
            error_message: Some(error_message.into()),
            ..Default::default()
        }
    }
}
