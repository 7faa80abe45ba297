use anyhow::Result;
use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    sync::mpsc,
};
use tracing::debug;

use super::Outbound;

/// Serializes outbound messages onto the browser's side of the pipe, one
/// JSON object per line. Runs until every sender hangs up.
pub struct OutboundWriter<W> {
    receiver: mpsc::Receiver<Outbound>,
    sink: W,
}

impl<W: AsyncWrite + Unpin> OutboundWriter<W> {
    pub fn new(receiver: mpsc::Receiver<Outbound>, sink: W) -> Self {
        Self { receiver, sink }
    }

    pub async fn run(mut self) -> Result<()> {
        while let Some(message) = self.receiver.recv().await {
            debug!("Writing message {message:?}");
            let mut buffer = serde_json::to_vec(&message)?;
            buffer.push(b'\n');
            self.sink.write_all(&buffer).await?;
            self.sink.flush().await?;
        }
        Ok(())
    }
}
