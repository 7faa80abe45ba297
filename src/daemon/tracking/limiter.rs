use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::daemon::{
    protocol::{NotificationRequest, Outbound},
    storage::{ledger::UsageLedger, store::StateStore},
};

/// Minimum interval between repeated notifications for the same domain.
pub const NOTIFICATION_COOLDOWN: Duration = Duration::minutes(5);

/// Sink for limit notifications.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send {
    async fn notify(&mut self, request: NotificationRequest) -> Result<()>;
}

/// Forwards notification requests to the outbound protocol writer.
pub struct ChannelNotifier {
    sender: mpsc::Sender<Outbound>,
}

impl ChannelNotifier {
    pub fn new(sender: mpsc::Sender<Outbound>) -> Self {
        Self { sender }
    }
}

#[async_trait]
impl Notifier for ChannelNotifier {
    async fn notify(&mut self, request: NotificationRequest) -> Result<()> {
        self.sender
            .send(Outbound::Notification(request))
            .await
            .inspect_err(|e| error!("Unexpected error during sending {e:?}"))?;
        Ok(())
    }
}

/// Compares updated totals against configured limits and emits rate-limited
/// notifications. A domain without a limit is never looked at twice.
pub struct LimitChecker<N> {
    notifier: N,
}

impl<N: Notifier> LimitChecker<N> {
    pub fn new(notifier: N) -> Self {
        Self { notifier }
    }

    pub async fn check<S: StateStore>(
        &mut self,
        ledger: &UsageLedger<S>,
        domain: &str,
        total_ms: u64,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let Some(limit_ms) = ledger.limit_for(domain).await? else {
            return Ok(());
        };
        if total_ms < limit_ms {
            return Ok(());
        }

        if let Some(last) = ledger.last_notified(domain).await? {
            if now.signed_duration_since(last) <= NOTIFICATION_COOLDOWN {
                debug!("Limit exceeded on {domain} but still in cooldown");
                return Ok(());
            }
        }

        info!("Limit reached on {domain}: {total_ms}ms of {limit_ms}ms");
        self.notifier
            .notify(NotificationRequest::limit_reached(domain, total_ms, limit_ms))
            .await?;
        ledger.mark_notified(domain, now).await?;
        Ok(())
    }
}
