//! Tuning knobs loaded from an optional TOML file

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::core::constants::*;
use crate::error::ConfigError;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Tuning {
    pub scan: Scan,
    pub cache: Cache,
    pub dispatch: Dispatch,
    pub notify: Notify,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Scan {
    pub max_duration_secs: u64,
    pub lock_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Cache {
    pub capacity: usize,
    pub ttl_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Dispatch {
    pub confirmations: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Notify {
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub request_timeout_secs: u64,
}

impl Default for Scan {
    fn default() -> Self {
        Self {
            max_duration_secs: DEFAULT_MAX_SCAN_DURATION_SECS,
            lock_timeout_secs: DEFAULT_LOCK_TIMEOUT_SECS,
        }
    }
}

impl Default for Cache {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CACHE_CAPACITY,
            ttl_secs: DEFAULT_CACHE_TTL_SECS,
        }
    }
}

impl Default for Dispatch {
    fn default() -> Self {
        Self {
            confirmations: DEFAULT_CONFIRMATIONS,
        }
    }
}

impl Default for Notify {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_NOTIFY_MAX_RETRIES,
            retry_delay_ms: DEFAULT_NOTIFY_RETRY_DELAY_MS,
            request_timeout_secs: DEFAULT_NOTIFY_TIMEOUT_SECS,
        }
    }
}

impl Tuning {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let tuning: Tuning = toml::from_str(&content)?;
        tuning.validate()?;
        Ok(tuning)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.cache.capacity == 0 {
            return Err(ConfigError::Invalid {
                key: "cache.capacity",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.dispatch.confirmations == 0 {
            return Err(ConfigError::Invalid {
                key: "dispatch.confirmations",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    pub fn max_scan_duration(&self) -> Duration {
        Duration::from_secs(self.scan.max_duration_secs)
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_secs(self.scan.lock_timeout_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_secs)
    }
}
