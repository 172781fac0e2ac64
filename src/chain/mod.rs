pub mod abi;
pub mod contract;
pub mod dispatcher;
pub mod network;
pub mod reader;

pub use contract::ContractClient;
pub use dispatcher::{PayoutDispatcher, PayoutReceipt};
pub use network::Network;
pub use reader::{PotReader, RevertReason, Simulation};
