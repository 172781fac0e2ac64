use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::message::{Identity, NotificationMessage};
use super::Notifier;
use crate::chain::PotReader;
use crate::core::{NotificationOutcome, NotificationReport, Pot, SkipReason};
use crate::error::NotifyError;

/// Notifies the participants of paid-out pots.
///
/// Every pot is handled independently; a failure is recorded in that pot's report
/// and never stops the remaining pots.
pub struct NotificationFanout {
    reader: Arc<dyn PotReader>,
    notifier: Arc<dyn Notifier>,
    app_url: String,
}

impl NotificationFanout {
    pub fn new(reader: Arc<dyn PotReader>, notifier: Arc<dyn Notifier>, app_url: impl Into<String>) -> Self {
        Self {
            reader,
            notifier,
            app_url: app_url.into(),
        }
    }

    #[instrument(skip(self, pot), fields(pot_id = pot.id))]
    pub async fn notify_pot(&self, pot: &Pot) -> Result<NotificationOutcome, NotifyError> {
        let participants = self.reader.get_participants(pot.id).await?;
        if participants.is_empty() {
            debug!("Pot has no participants to notify");
            return Ok(NotificationOutcome::Skipped {
                reason: SkipReason::NoParticipants,
            });
        }

        let identities = self.notifier.resolve_identities(&participants).await?;

        // One message per user even when several of their addresses joined the pot
        let mut seen = HashSet::new();
        let targets: Vec<Identity> = participants
            .iter()
            .filter_map(|address| identities.get(address))
            .flatten()
            .filter(|identity| seen.insert(identity.fid))
            .cloned()
            .collect();

        if targets.is_empty() {
            debug!(
                participants = participants.len(),
                "No participant resolved to a notification target"
            );
            return Ok(NotificationOutcome::Skipped {
                reason: SkipReason::NoResolvedTargets,
            });
        }

        let usernames: Vec<&str> = targets
            .iter()
            .filter_map(|t| t.username.as_deref())
            .collect();
        debug!(?usernames, "Notifying participants");

        let message = NotificationMessage::payout(pot, &self.app_url);
        self.notifier.send_notification(&targets, &message).await?;

        info!(recipients = targets.len(), "📣 Payout notification sent");
        Ok(NotificationOutcome::Sent {
            recipients: targets.len(),
        })
    }

    /// Notify each pot once, in order, collecting one report per pot
    pub async fn notify_all(&self, pots: &[Pot]) -> Vec<NotificationReport> {
        let mut reports = Vec::with_capacity(pots.len());
        for pot in pots {
            let outcome = match self.notify_pot(pot).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(pot_id = pot.id, error = %e, "Failed to notify pot participants");
                    NotificationOutcome::Failed {
                        error: e.to_string(),
                    }
                }
            };
            reports.push(NotificationReport {
                pot_id: pot.id,
                outcome,
            });
        }
        reports
    }
}
