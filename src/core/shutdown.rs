use tokio::signal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShutdownReason {
    Interrupt,
    Terminate,
}

impl ShutdownReason {
    fn as_str(self) -> &'static str {
        match self {
            Self::Interrupt => "SIGINT",
            Self::Terminate => "SIGTERM",
        }
    }
}

/// Resolves once the process is asked to stop. A signal whose handler cannot
/// be installed never fires.
pub(crate) async fn shutdown_signal() {
    let reason = tokio::select! {
        () = interrupt() => ShutdownReason::Interrupt,
        () = terminate() => ShutdownReason::Terminate,
    };

    tracing::info!(signal = reason.as_str(), "Shutdown requested, finishing in-flight requests");
}

async fn interrupt() {
    if let Err(err) = signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
}

#[cfg(unix)]
async fn terminate() {
    match signal::unix::signal(signal::unix::SignalKind::terminate()) {
        Ok(mut stream) => {
            stream.recv().await;
        }
        Err(err) => {
            tracing::error!(error = %err, "Failed to install SIGTERM handler");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}
