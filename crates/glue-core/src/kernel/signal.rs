use tokio::task::JoinHandle;

use crate::kernel::bootstrap::StopHandle;

/// Spawn the task that cancels the current execution on SIGINT or SIGTERM.
///
/// The task stops the application once and exits; the caller aborts it when
/// the execution ends without a signal.
pub(crate) fn spawn_listener(handle: StopHandle) -> JoinHandle<()> {
    tokio::spawn(async move {
        wait_for_termination().await;
        log::info!("Termination signal received, cancelling execution");
        handle.stop();
    })
}

#[cfg(unix)]
async fn wait_for_termination() {
    use tokio::signal::unix::{SignalKind, signal};

    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::warn!("Unable to listen for SIGINT: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                if stream.recv().await.is_none() {
                    std::future::pending::<()>().await;
                }
            }
            Err(e) => {
                log::warn!("Unable to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = interrupt => {}
        _ = terminate => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_termination() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::warn!("Unable to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
