pub mod api;
pub mod chain;
pub mod config;
pub mod core;
pub mod error;
pub mod notify;
pub mod orchestrator;
pub mod scout;

#[cfg(test)]
pub(crate) mod test_utils;

// Re-export commonly used types for convenience
pub use crate::core::*;
pub use orchestrator::ScanOrchestrator;
