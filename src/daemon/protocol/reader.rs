use std::io::ErrorKind;

use anyhow::Result;
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, BufReader},
    sync::mpsc,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{daemon::event::SessionEvent, utils::clock::Clock};

use super::{Inbound, Outbound};

/// Reads the browser's side of the protocol line by line and feeds the
/// tracking loop. Queries that don't touch the session are answered here
/// directly.
pub struct InboundReader<R> {
    input: R,
    events: mpsc::Sender<SessionEvent>,
    replies: mpsc::Sender<Outbound>,
    shutdown: CancellationToken,
    clock: Box<dyn Clock>,
    username: String,
}

impl<R: AsyncRead + Unpin> InboundReader<R> {
    pub fn new(
        input: R,
        events: mpsc::Sender<SessionEvent>,
        replies: mpsc::Sender<Outbound>,
        shutdown: CancellationToken,
        clock: Box<dyn Clock>,
        username: String,
    ) -> Self {
        Self {
            input,
            events,
            replies,
            shutdown,
            clock,
            username,
        }
    }

    /// Executes the reader event loop. Returns after cancellation or once the
    /// browser closes the pipe, which also cancels everything else.
    pub async fn run(self) -> Result<()> {
        let Self {
            input,
            events,
            replies,
            shutdown,
            clock,
            username,
        } = self;
        let mut lines = BufReader::new(input).lines();
        loop {
            let line = tokio::select! {
                _ = shutdown.cancelled() => return Ok(()),
                line = lines.next_line() => match line {
                    Ok(v) => v,
                    // Same policy as malformed json below. The offending
                    // bytes were consumed up to the newline, the next line
                    // is readable again.
                    Err(e) if e.kind() == ErrorKind::InvalidData => {
                        warn!("Ignoring undecodable input line: {e}");
                        continue;
                    }
                    // A real io failure means nothing more will arrive.
                    // Cancel so the rest of the daemon winds down instead of
                    // waiting on this loop forever.
                    Err(e) => {
                        shutdown.cancel();
                        return Err(e.into());
                    }
                },
            };

            let Some(line) = line else {
                info!("Input closed, shutting down");
                shutdown.cancel();
                return Ok(());
            };
            if line.trim().is_empty() {
                continue;
            }

            let message = match serde_json::from_str::<Inbound>(&line) {
                Ok(v) => v,
                Err(e) => {
                    // Skip illegal messages instead of dying on them.
                    warn!("Ignoring malformed message {line:?}: {e}");
                    continue;
                }
            };
            debug!("Received message {message:?}");

            match message {
                Inbound::TabActivated { url } | Inbound::UrlChanged { url } => {
                    forward(&events, SessionEvent::TabChanged { url }).await?;
                }
                Inbound::WindowFocusChanged { focused: false, .. } => {
                    forward(&events, SessionEvent::FocusLost).await?;
                }
                Inbound::WindowFocusChanged { focused: true, url } => {
                    forward(&events, SessionEvent::FocusGained { url }).await?;
                }
                Inbound::GetCurrentTime => {
                    let reply = Outbound::CurrentTime {
                        current_time: clock.time().timestamp_millis(),
                        username: username.clone(),
                    };
                    replies
                        .send(reply)
                        .await
                        .inspect_err(|e| error!("Unexpected error during reply {e:?}"))?;
                }
            }
        }
    }
}

async fn forward(events: &mpsc::Sender<SessionEvent>, event: SessionEvent) -> Result<()> {
    events
        .send(event)
        .await
        .inspect_err(|e| error!("Unexpected error during sending {e:?}"))?;
    Ok(())
}
