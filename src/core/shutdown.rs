use tokio::signal;
use tokio::sync::watch;

/// Read side of the process-wide shutdown flag. Long-running request work
/// (bulk imports) polls it between units of work.
#[derive(Debug, Clone)]
pub(crate) struct ShutdownHandle {
    rx: watch::Receiver<bool>,
}

impl ShutdownHandle {
    pub(crate) fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }
}

pub(crate) fn channel() -> (watch::Sender<bool>, ShutdownHandle) {
    let (tx, rx) = watch::channel(false);
    (tx, ShutdownHandle { rx })
}

/// Resolves on Ctrl+C or SIGTERM, then flips the shared flag so in-flight
/// imports stop picking up new rows while the server drains.
pub(crate) async fn shutdown_signal(notify: watch::Sender<bool>) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
    if notify.send(true).is_err() {
        tracing::debug!("no shutdown listeners left");
    }
}
