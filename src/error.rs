use crate::core::PotId;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Failure talking to the registry contract
#[derive(thiserror::Error, Debug)]
pub enum ChainError {
    #[error("RPC request failed: {0}")]
    Transport(String),

    #[error("Failed to decode contract response: {0}")]
    Decode(String),

    #[error("Pot {0} does not exist")]
    UnknownPot(PotId),
}

#[derive(thiserror::Error, Debug)]
pub enum DispatchError {
    #[error("Refusing to submit an empty payout batch")]
    EmptyBatch,

    #[error("Failed to submit payout batch: {0}")]
    Submission(String),

    #[error("Failed waiting for payout batch transaction {tx_hash}: {reason}")]
    Confirmation { tx_hash: String, reason: String },

    #[error("Payout batch transaction {tx_hash} reverted")]
    Reverted { tx_hash: String },

    #[error("Payout batch transaction {tx_hash} was dropped before confirmation")]
    Dropped { tx_hash: String },
}

#[derive(thiserror::Error, Debug)]
pub enum NotifyError {
    #[error("Notification request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Notification API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid notification API url: {0}")]
    Url(#[from] url::ParseError),

    #[error("Failed to read participants: {0}")]
    Chain(#[from] ChainError),
}

impl NotifyError {
    /// Whether repeating the same request may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            NotifyError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            NotifyError::Status { status, .. } => *status == 429 || *status >= 500,
            NotifyError::Url(_) | NotifyError::Chain(_) => false,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    #[error("A payout scan is already in progress")]
    AlreadyRunning,

    #[error("Failed to read pot count: {0}")]
    PotCount(#[source] ChainError),
}
