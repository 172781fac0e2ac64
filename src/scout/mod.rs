pub mod cache;
pub mod classifier;

pub use cache::{CacheStatistics, PotStateCache};
pub use classifier::EligibilityClassifier;
