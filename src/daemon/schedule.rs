use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::{
    daemon::event::SessionEvent,
    utils::{clock::Clock, time::next_day_start},
};

pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Fires [SessionEvent::MidnightReset] at every UTC midnight. Timers don't
/// survive restarts, so this is armed from scratch on every daemon start.
/// The store mutation itself happens in the tracking loop, keeping resets
/// serialized with regular attributions.
pub async fn run_reset_schedule(
    events: mpsc::Sender<SessionEvent>,
    clock: Box<dyn Clock>,
    shutdown: CancellationToken,
) -> Result<()> {
    loop {
        let now = clock.time();
        let until_midnight = (next_day_start(now) - now).to_std()?;
        debug!("Next daily reset in {until_midnight:?}");

        tokio::select! {
            _ = shutdown.cancelled() => return Ok(()),
            _ = clock.sleep(until_midnight) => {
                events
                    .send(SessionEvent::MidnightReset)
                    .await
                    .inspect_err(|e| error!("Unexpected error during sending {e:?}"))?;
            }
        }
    }
}

/// Fires [SessionEvent::IntegritySweep] every hour.
pub async fn run_sweep_schedule(
    events: mpsc::Sender<SessionEvent>,
    clock: Box<dyn Clock>,
    shutdown: CancellationToken,
) -> Result<()> {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => return Ok(()),
            _ = clock.sleep(SWEEP_INTERVAL) => {
                events
                    .send(SessionEvent::IntegritySweep)
                    .await
                    .inspect_err(|e| error!("Unexpected error during sending {e:?}"))?;
            }
        }
    }
}
