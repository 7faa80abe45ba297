use anyhow::Result;

use crate::daemon::event::SessionEvent;

/// Represents the consumer of the tracking loop. Abstracting this keeps the
/// loop itself testable separately from the real tracker.
pub trait EventHandler {
    fn handle_event(&mut self, event: SessionEvent) -> impl std::future::Future<Output = Result<()>>;

    /// Called once after the last event, before the loop returns.
    fn finalize(&mut self) -> impl std::future::Future<Output = Result<()>>;
}
