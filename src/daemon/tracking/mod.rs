use anyhow::Result;
use handler::EventHandler;
use tokio::sync::mpsc::Receiver;
use tracing::{debug, error};

use super::event::SessionEvent;

pub mod handler;
pub mod limiter;
pub mod tracker;

/// The single event loop every store mutation goes through. Receives browser
/// transitions and timer ticks and hands them to the handler one at a time.
pub struct TrackingModule<Handler> {
    receiver: Receiver<SessionEvent>,
    handler: Handler,
}

impl<H: EventHandler> TrackingModule<H> {
    pub fn new(receiver: Receiver<SessionEvent>, handler: H) -> Self {
        Self { receiver, handler }
    }

    pub async fn run(mut self) -> Result<()> {
        while let Some(event) = self.receiver.recv().await {
            debug!("Handling event {:?}", event);
            if let Err(e) = self.handler.handle_event(event.clone()).await {
                // Per-event failures are logged and swallowed so one bad
                // storage access doesn't take the daemon down.
                error!("Error handling event {:?}: {e:?}", event);
            }
        }

        let result = self.handler.finalize().await;
        self.receiver.close();
        result
    }
}
