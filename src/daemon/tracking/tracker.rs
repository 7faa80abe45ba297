use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::{debug, trace};
use url::Url;

use crate::{
    daemon::{
        event::SessionEvent,
        storage::{ledger::UsageLedger, store::StateStore},
    },
    utils::clock::Clock,
};

use super::{handler::EventHandler, limiter::LimitChecker, limiter::Notifier};

/// Upper bound on a single attribution. Bridges over suspends and clock
/// jumps: whatever happened, one transition never books more than a minute.
pub const MAX_ATTRIBUTION_MS: u64 = 60_000;

/// The one active browsing session. At most one exists per daemon.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivitySession {
    pub domain: String,
    pub started_at: DateTime<Utc>,
}

/// Maintains the current [ActivitySession] and turns tab and focus
/// transitions into per-domain time attributions.
pub struct ActivityTracker<S, N> {
    session: Option<ActivitySession>,
    ledger: UsageLedger<S>,
    limiter: LimitChecker<N>,
    clock: Box<dyn Clock>,
}

impl<S: StateStore, N: Notifier> ActivityTracker<S, N> {
    pub fn new(ledger: UsageLedger<S>, limiter: LimitChecker<N>, clock: Box<dyn Clock>) -> Self {
        Self {
            session: None,
            ledger,
            limiter,
            clock,
        }
    }

    /// Closes the current session, attributing its elapsed time, and opens a
    /// new one when a trackable domain is active.
    async fn switch_to(&mut self, domain: Option<String>) -> Result<()> {
        let Some(domain) = domain else {
            // Not a trackable page. The event is a no-op, any running
            // session keeps accruing.
            return Ok(());
        };

        let now = self.clock.time();
        self.flush(now).await?;
        debug!("Started tracking {domain}");
        self.session = Some(ActivitySession {
            domain,
            started_at: now,
        });
        Ok(())
    }

    /// Attributes the open session's elapsed time and clears it. Nothing to
    /// do on the first event after startup.
    async fn flush(&mut self, now: DateTime<Utc>) -> Result<()> {
        let Some(session) = self.session.take() else {
            return Ok(());
        };

        let elapsed = now
            .signed_duration_since(session.started_at)
            .num_milliseconds()
            .clamp(0, MAX_ATTRIBUTION_MS as i64) as u64;
        trace!("Flushing {elapsed}ms for {}", session.domain);

        if let Some(total) = self.ledger.add_time(&session.domain, elapsed).await? {
            self.limiter
                .check(&self.ledger, &session.domain, total, now)
                .await?;
        }
        Ok(())
    }
}

impl<S: StateStore, N: Notifier> EventHandler for ActivityTracker<S, N> {
    async fn handle_event(&mut self, event: SessionEvent) -> Result<()> {
        match event {
            SessionEvent::TabChanged { url } => self.switch_to(resolve_domain(&url)).await,
            SessionEvent::FocusGained { url } => {
                self.switch_to(url.as_deref().and_then(resolve_domain)).await
            }
            SessionEvent::FocusLost => {
                let now = self.clock.time();
                self.flush(now).await
            }
            SessionEvent::MidnightReset => self.ledger.reset_daily().await,
            SessionEvent::IntegritySweep => self.ledger.sweep(self.clock.time()).await,
        }
    }

    async fn finalize(&mut self) -> Result<()> {
        let now = self.clock.time();
        self.flush(now).await
    }
}

/// Extracts the trackable domain out of a tab URL. Internal browser pages
/// and anything that fails to parse resolve to nothing.
fn resolve_domain(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    match parsed.scheme() {
        "http" | "https" => parsed.host_str().map(str::to_owned),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::{Duration, TimeZone, Utc};

    use super::*;
    use crate::{
        daemon::storage::store::testing::MemoryStateStore,
        daemon::tracking::limiter::MockNotifier,
        utils::clock::testing::ManualClock,
    };

    fn tracker_at_noon() -> (
        ActivityTracker<MemoryStateStore, MockNotifier>,
        ManualClock,
    ) {
        let clock = ManualClock::starting_at(Utc.with_ymd_and_hms(2018, 7, 4, 12, 0, 0).unwrap());
        let mut notifier = MockNotifier::new();
        notifier.expect_notify().returning(|_| Ok(()));
        let tracker = ActivityTracker::new(
            UsageLedger::new(MemoryStateStore::default()),
            LimitChecker::new(notifier),
            Box::new(clock.clone()),
        );
        (tracker, clock)
    }

    #[test]
    fn domain_resolution() {
        assert_eq!(
            resolve_domain("https://www.a.com/path?q=1"),
            Some("www.a.com".into())
        );
        assert_eq!(resolve_domain("http://b.com"), Some("b.com".into()));
        assert_eq!(resolve_domain("chrome://settings"), None);
        assert_eq!(resolve_domain("about:blank"), None);
        assert_eq!(resolve_domain("file:///tmp/x.html"), None);
        assert_eq!(resolve_domain("not a url"), None);
    }

    #[tokio::test]
    async fn attributes_time_across_transitions() -> Result<()> {
        let (mut tracker, clock) = tracker_at_noon();

        tracker
            .handle_event(SessionEvent::TabChanged {
                url: "https://a.com/".into(),
            })
            .await?;
        clock.advance(Duration::seconds(70));
        tracker
            .handle_event(SessionEvent::TabChanged {
                url: "https://b.com/".into(),
            })
            .await?;
        clock.advance(Duration::seconds(30));
        tracker.handle_event(SessionEvent::FocusLost).await?;

        let usage = tracker.ledger.snapshot().await?.usage;
        // 70s on a.com gets capped to a single minute.
        assert_eq!(usage.get("a.com"), Some(&60_000));
        assert_eq!(usage.get("b.com"), Some(&30_000));
        Ok(())
    }

    #[tokio::test]
    async fn first_event_has_nothing_to_flush() -> Result<()> {
        let (mut tracker, _clock) = tracker_at_noon();

        tracker
            .handle_event(SessionEvent::TabChanged {
                url: "https://a.com/".into(),
            })
            .await?;

        assert!(tracker.ledger.snapshot().await?.usage.is_empty());
        assert_eq!(
            tracker.session.as_ref().map(|s| s.domain.as_str()),
            Some("a.com")
        );
        Ok(())
    }

    #[tokio::test]
    async fn untrackable_url_keeps_the_session_running() -> Result<()> {
        let (mut tracker, clock) = tracker_at_noon();

        tracker
            .handle_event(SessionEvent::TabChanged {
                url: "https://a.com/".into(),
            })
            .await?;
        clock.advance(Duration::seconds(10));
        tracker
            .handle_event(SessionEvent::TabChanged {
                url: "chrome://extensions".into(),
            })
            .await?;
        clock.advance(Duration::seconds(10));
        tracker.handle_event(SessionEvent::FocusLost).await?;

        // The chrome:// event was a no-op, a.com ran for the full 20s.
        let usage = tracker.ledger.snapshot().await?.usage;
        assert_eq!(usage.get("a.com"), Some(&20_000));
        Ok(())
    }

    #[tokio::test]
    async fn focus_lost_stops_accrual() -> Result<()> {
        let (mut tracker, clock) = tracker_at_noon();

        tracker
            .handle_event(SessionEvent::TabChanged {
                url: "https://a.com/".into(),
            })
            .await?;
        clock.advance(Duration::seconds(5));
        tracker.handle_event(SessionEvent::FocusLost).await?;

        // Unfocused time is not attributed to anyone.
        clock.advance(Duration::seconds(120));
        tracker
            .handle_event(SessionEvent::FocusGained {
                url: Some("https://a.com/".into()),
            })
            .await?;
        clock.advance(Duration::seconds(5));
        tracker.handle_event(SessionEvent::FocusLost).await?;

        let usage = tracker.ledger.snapshot().await?.usage;
        assert_eq!(usage.get("a.com"), Some(&10_000));
        Ok(())
    }

    #[tokio::test]
    async fn limit_breach_notifies_once_within_cooldown() -> Result<()> {
        let clock = ManualClock::starting_at(Utc.with_ymd_and_hms(2018, 7, 4, 12, 0, 0).unwrap());
        let mut notifier = MockNotifier::new();
        notifier
            .expect_notify()
            .withf(|request| request.id == "limit-a.com")
            .times(1)
            .returning(|_| Ok(()));
        let mut tracker = ActivityTracker::new(
            UsageLedger::new(MemoryStateStore::default()),
            LimitChecker::new(notifier),
            Box::new(clock.clone()),
        );
        tracker.ledger.set_limit("a.com", 60_000).await?;

        tracker
            .handle_event(SessionEvent::TabChanged {
                url: "https://a.com/".into(),
            })
            .await?;
        clock.advance(Duration::seconds(35));
        tracker
            .handle_event(SessionEvent::TabChanged {
                url: "https://a.com/page".into(),
            })
            .await?;
        clock.advance(Duration::seconds(30));
        // 65s total crosses the one minute limit, one notification.
        tracker
            .handle_event(SessionEvent::TabChanged {
                url: "https://a.com/other".into(),
            })
            .await?;
        clock.advance(Duration::seconds(1));
        // Still in cooldown, no second notification.
        tracker.handle_event(SessionEvent::FocusLost).await?;
        Ok(())
    }

    #[tokio::test]
    async fn reset_event_clears_usage_but_not_limits() -> Result<()> {
        let (mut tracker, clock) = tracker_at_noon();
        tracker.ledger.set_limit("a.com", 120_000).await?;

        tracker
            .handle_event(SessionEvent::TabChanged {
                url: "https://a.com/".into(),
            })
            .await?;
        clock.advance(Duration::seconds(30));
        tracker.handle_event(SessionEvent::FocusLost).await?;
        tracker.handle_event(SessionEvent::MidnightReset).await?;

        let state = tracker.ledger.snapshot().await?;
        assert!(state.usage.is_empty());
        assert_eq!(state.limits.get("a.com"), Some(&120_000));
        Ok(())
    }

    #[tokio::test]
    async fn finalize_flushes_the_open_session() -> Result<()> {
        let (mut tracker, clock) = tracker_at_noon();

        tracker
            .handle_event(SessionEvent::TabChanged {
                url: "https://a.com/".into(),
            })
            .await?;
        clock.advance(Duration::seconds(7));
        tracker.finalize().await?;

        let usage = tracker.ledger.snapshot().await?.usage;
        assert_eq!(usage.get("a.com"), Some(&7_000));
        assert_eq!(tracker.session, None);
        Ok(())
    }
}
