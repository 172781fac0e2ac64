/// Default number of pots whose state is kept between scans
pub const DEFAULT_CACHE_CAPACITY: usize = 10_000;

/// Default lifetime of a cached pot state
pub const DEFAULT_CACHE_TTL_SECS: u64 = 3_600;

/// Default upper bound on the scanning phase of one invocation
pub const DEFAULT_MAX_SCAN_DURATION_SECS: u64 = 240;

/// How long an invocation waits for a previous one to release the job lock
pub const DEFAULT_LOCK_TIMEOUT_SECS: u64 = 5;

pub const DEFAULT_CONFIRMATIONS: usize = 1;

pub const DEFAULT_NOTIFY_MAX_RETRIES: u32 = 3;
pub const DEFAULT_NOTIFY_RETRY_DELAY_MS: u64 = 2_000;
pub const DEFAULT_NOTIFY_TIMEOUT_SECS: u64 = 15;

pub const DEFAULT_NOTIFY_BASE_URL: &str = "https://api.neynar.com";
pub const DEFAULT_APP_URL: &str = "https://potluck.app";

/// Limits enforced by the notification API on message fields
pub const MAX_NOTIFICATION_TITLE_LEN: usize = 32;
pub const MAX_NOTIFICATION_BODY_LEN: usize = 128;

/// Number of addresses resolved per identity lookup request
pub const IDENTITY_LOOKUP_CHUNK: usize = 350;
