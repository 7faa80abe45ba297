use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use super::{
    state::{StoreState, DAY_CEILING_MS},
    store::StateStore,
};

/// Cooldown entries older than this are dropped by the integrity sweep to
/// bound storage growth.
const COOLDOWN_RETENTION: Duration = Duration::hours(24);

/// Read-modify-write operations over the persistent [StoreState]. Each
/// operation is one load and at most one save, there is no batching.
pub struct UsageLedger<S> {
    store: S,
}

impl<S: StateStore> UsageLedger<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    async fn update<T>(&self, apply: impl FnOnce(&mut StoreState) -> T) -> Result<T> {
        let mut state = self.store.load().await?;
        let result = apply(&mut state);
        self.store.save(&state).await?;
        Ok(result)
    }

    /// Adds `millis` to a domain's daily total and returns the stored total,
    /// or `None` when there was nothing to add. A total that would cross the
    /// 24-hour ceiling is treated as corruption and restarted from the fresh
    /// increment instead of saturating.
    pub async fn add_time(&self, domain: &str, millis: u64) -> Result<Option<u64>> {
        if millis == 0 {
            return Ok(None);
        }

        let stored = self
            .update(|state| {
                let current = state.usage.get(domain).copied().unwrap_or(0);
                let next = current.saturating_add(millis);
                let stored = if next > DAY_CEILING_MS { millis } else { next };
                state.usage.insert(domain.to_owned(), stored);
                stored
            })
            .await?;
        debug!("Attributed {millis}ms to {domain}, total {stored}ms");
        Ok(Some(stored))
    }

    pub async fn limit_for(&self, domain: &str) -> Result<Option<u64>> {
        Ok(self.store.load().await?.limits.get(domain).copied())
    }

    pub async fn set_limit(&self, domain: &str, millis: u64) -> Result<()> {
        self.update(|state| {
            state.limits.insert(domain.to_owned(), millis);
        })
        .await
    }

    pub async fn remove_limit(&self, domain: &str) -> Result<bool> {
        self.update(|state| state.limits.remove(domain).is_some())
            .await
    }

    pub async fn last_notified(&self, domain: &str) -> Result<Option<DateTime<Utc>>> {
        Ok(self.store.load().await?.cooldowns.get(domain).copied())
    }

    pub async fn mark_notified(&self, domain: &str, at: DateTime<Utc>) -> Result<()> {
        self.update(|state| {
            state.cooldowns.insert(domain.to_owned(), at);
        })
        .await
    }

    /// The daily reset: usage and cooldowns go, configured limits stay.
    /// Running it twice in a day is a no-op the second time.
    pub async fn reset_daily(&self) -> Result<()> {
        self.update(|state| {
            state.usage.clear();
            state.cooldowns.clear();
        })
        .await?;
        info!("Daily totals reset");
        Ok(())
    }

    /// Defensive cleanup: removes usage entries above the 24-hour ceiling and
    /// expires stale cooldown entries.
    pub async fn sweep(&self, now: DateTime<Utc>) -> Result<()> {
        let (bad_usage, stale_cooldowns) = self
            .update(|state| {
                let usage_before = state.usage.len();
                state.usage.retain(|_, millis| *millis <= DAY_CEILING_MS);
                let cooldowns_before = state.cooldowns.len();
                state
                    .cooldowns
                    .retain(|_, at| now.signed_duration_since(*at) <= COOLDOWN_RETENTION);
                (
                    usage_before - state.usage.len(),
                    cooldowns_before - state.cooldowns.len(),
                )
            })
            .await?;
        if bad_usage > 0 || stale_cooldowns > 0 {
            info!("Sweep removed {bad_usage} corrupted totals and {stale_cooldowns} stale cooldowns");
        }
        Ok(())
    }

    /// Full dump for reporting.
    pub async fn snapshot(&self) -> Result<StoreState> {
        self.store.load().await
    }
}
