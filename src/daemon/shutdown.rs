use tokio::select;
use tokio_util::sync::CancellationToken;

/// Detects signals sent to the process. The token can also be cancelled from
/// elsewhere, the reader does so when the browser closes the pipe, and this
/// returns either way so the daemon can wind down.
pub async fn detect_shutdown(cancelation: CancellationToken) {
    select! {
        _ = tokio::signal::ctrl_c() => {
            cancelation.cancel();
        },
        _ = cancelation.cancelled() => {},
    };
}
