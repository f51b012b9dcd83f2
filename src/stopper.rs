use tokio::{
    select,
    signal::ctrl_c,
    task::{self, JoinHandle},
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[cfg(unix)]
async fn terminated() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut stream) => {
            stream.recv().await;
        }
        Err(e) => {
            error!("Failed to install SIGTERM handler: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminated() {
    std::future::pending::<()>().await;
}

/// Cancels `cancel_token` on Ctrl+C or SIGTERM. Finishes once the token is
/// cancelled from anywhere.
pub fn run(cancel_token: CancellationToken) -> JoinHandle<()> {
    task::spawn(async move {
        select! {
            _ = cancel_token.cancelled() => warn!("Cancelled"),
            _ = ctrl_c() => warn!("Ctrl+C received"),
            _ = terminated() => warn!("SIGTERM received"),
        };
        info!("Initiating shutdown");
        cancel_token.cancel();
        info!("Stopper exited");
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stopper_exits_on_cancel() {
        let cancel_token = CancellationToken::new();
        let handle = run(cancel_token.clone());
        cancel_token.cancel();
        assert!(handle.await.is_ok());
    }
}
