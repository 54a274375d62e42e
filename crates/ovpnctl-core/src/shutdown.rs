//! Shared shutdown flag helpers.

use tokio::sync::watch;

/// Resolve once the shutdown flag is set or its sender is gone.
pub(crate) async fn wait_for_shutdown(mut shutdown: watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stopped| *stopped).await;
}
