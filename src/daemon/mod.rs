use std::path::PathBuf;

use anyhow::Result;
use protocol::{reader::InboundReader, writer::OutboundWriter};
use storage::{ledger::UsageLedger, store::JsonStateStore, store::StateStore};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    sync::mpsc,
};
use tokio_util::sync::CancellationToken;
use tracing::error;
use tracking::{
    limiter::{ChannelNotifier, LimitChecker, Notifier},
    tracker::ActivityTracker,
    TrackingModule,
};

use crate::utils::clock::{Clock, DefaultClock};

pub mod args;
pub mod event;
pub mod protocol;
pub mod schedule;
pub mod shutdown;
pub mod storage;
pub mod tracking;

const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Represents the starting point for the daemon. Speaks the protocol over
/// stdio, the way the browser launches a messaging host.
pub async fn start_daemon(dir: PathBuf) -> Result<()> {
    run_daemon(
        dir,
        tokio::io::stdin(),
        tokio::io::stdout(),
        DefaultClock,
        resolve_username(),
    )
    .await
}

/// The full daemon assembly with pluggable endpoints, shared between
/// [start_daemon] and tests.
pub async fn run_daemon(
    dir: PathBuf,
    input: impl AsyncRead + Unpin,
    output: impl AsyncWrite + Unpin,
    clock: impl Clock + Clone,
    username: String,
) -> Result<()> {
    let (event_sender, event_receiver) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let (outbound_sender, outbound_receiver) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

    let shutdown_token = CancellationToken::new();

    let store = JsonStateStore::new(dir)?;
    let tracker = create_tracker(
        store,
        ChannelNotifier::new(outbound_sender.clone()),
        clock.clone(),
    );
    let tracking = TrackingModule::new(event_receiver, tracker);

    let reader = InboundReader::new(
        input,
        event_sender.clone(),
        outbound_sender,
        shutdown_token.clone(),
        Box::new(clock.clone()),
        username,
    );
    let writer = OutboundWriter::new(outbound_receiver, output);

    let (_, reader_result, tracking_result, writer_result, reset_result, sweep_result) = tokio::join!(
        shutdown::detect_shutdown(shutdown_token.clone()),
        reader.run(),
        tracking.run(),
        writer.run(),
        schedule::run_reset_schedule(
            event_sender.clone(),
            Box::new(clock.clone()),
            shutdown_token.clone(),
        ),
        schedule::run_sweep_schedule(event_sender, Box::new(clock), shutdown_token),
    );

    if let Err(reader_result) = reader_result {
        error!("Reader module got an error {:?}", reader_result);
    }

    if let Err(tracking_result) = tracking_result {
        error!("Tracking module got an error {:?}", tracking_result);
    }

    if let Err(writer_result) = writer_result {
        error!("Writer module got an error {:?}", writer_result);
    }

    if let Err(reset_result) = reset_result {
        error!("Reset schedule got an error {:?}", reset_result);
    }

    if let Err(sweep_result) = sweep_result {
        error!("Sweep schedule got an error {:?}", sweep_result);
    }

    Ok(())
}

fn create_tracker<S: StateStore, N: Notifier>(
    store: S,
    notifier: N,
    clock: impl Clock,
) -> ActivityTracker<S, N> {
    ActivityTracker::new(
        UsageLedger::new(store),
        LimitChecker::new(notifier),
        Box::new(clock),
    )
}

fn resolve_username() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "user".into())
}
