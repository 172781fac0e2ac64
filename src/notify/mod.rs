//! Off-chain notifications for paid-out pots

pub mod client;
pub mod fanout;
pub mod message;

pub use client::NotificationClient;
pub use fanout::NotificationFanout;
pub use message::{Identity, NotificationMessage};

use async_trait::async_trait;
use ethers::types::Address;
use std::collections::HashMap;

use crate::error::NotifyError;

/// Identity resolution and message delivery
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Map participant addresses to the users that verified them. Addresses without
    /// a user are absent from the result.
    async fn resolve_identities(
        &self,
        addresses: &[Address],
    ) -> Result<HashMap<Address, Vec<Identity>>, NotifyError>;

    async fn send_notification(
        &self,
        targets: &[Identity],
        message: &NotificationMessage,
    ) -> Result<(), NotifyError>;
}
