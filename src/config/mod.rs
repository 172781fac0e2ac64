//! Environment settings and file-based tuning

pub mod settings;
pub mod tuning;

pub use settings::KeeperConfig;
pub use tuning::Tuning;
