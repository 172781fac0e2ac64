use serde::{Deserialize, Serialize};

use crate::core::constants::{MAX_NOTIFICATION_BODY_LEN, MAX_NOTIFICATION_TITLE_LEN};
use crate::core::Pot;

/// Off-chain user reachable by the notification service
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub fid: u64,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationMessage {
    pub title: String,
    pub body: String,
    pub target_url: String,
}

impl NotificationMessage {
    /// Winner announcement and next-round reminder for a pot that was just paid out.
    /// `pot.round` is the number of rounds completed before this payout.
    pub fn payout(pot: &Pot, app_url: &str) -> Self {
        let name = if pot.name.trim().is_empty() {
            "your pot"
        } else {
            pot.name.trim()
        };
        Self {
            title: truncate("Potluck payout is in! 🎉", MAX_NOTIFICATION_TITLE_LEN),
            body: truncate(
                &format!(
                    "Round {} of {} has been paid out. See who won and chip in for the next round!",
                    pot.round.saturating_add(1),
                    name
                ),
                MAX_NOTIFICATION_BODY_LEN,
            ),
            target_url: format!("{}/pot/{}", app_url.trim_end_matches('/'), pot.id),
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    out.push('…');
    out
}
