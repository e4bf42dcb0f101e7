use crate::components::PlannerHandle;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::timeout;
use tracing::{error, info, warn};

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};
#[cfg(windows)]
use tokio::signal::windows::{ctrl_break, ctrl_c};

/// How long each shutdown step waits for the planner
const PLANNER_REPLY_TIMEOUT: Duration = Duration::from_secs(2);

/// Set up signal handlers for graceful shutdown
pub async fn handle_signals(shutdown_send: oneshot::Sender<()>, planner: PlannerHandle) {
    // Wait for a termination signal
    wait_for_signal().await;

    // A wedged planner must not keep the process alive
    match timeout(PLANNER_REPLY_TIMEOUT, planner.cancel()).await {
        Ok(Ok(true)) => info!("Cancelled in-flight request"),
        Ok(Ok(false)) => {}
        Ok(Err(e)) => error!("Error cancelling request: {:?}", e),
        Err(_) => warn!("Planner did not answer the cancel request in time"),
    }

    match timeout(PLANNER_REPLY_TIMEOUT, planner.shutdown()).await {
        Ok(Ok(())) => info!("Planner shut down successfully"),
        Ok(Err(e)) => error!("Error shutting down planner: {:?}", e),
        Err(_) => warn!("Planner did not accept the shutdown in time"),
    }

    // Send shutdown signal to main task
    let _ = shutdown_send.send(());
}

/// Platform-specific signal handling implementation
#[cfg(unix)]
async fn wait_for_signal() {
    let (mut sigterm, mut sigint) =
        match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(sigterm), Ok(sigint)) => (sigterm, sigint),
            (Err(e), _) | (_, Err(e)) => {
                error!("Failed to install signal handlers: {}", e);
                return std::future::pending().await;
            }
        };

    tokio::select! {
        _ = sigterm.recv() => {
            info!("Received SIGTERM signal, initiating graceful shutdown");
        }
        _ = sigint.recv() => {
            info!("Received SIGINT signal, initiating graceful shutdown");
        }
    }
}

/// Platform-specific signal handling implementation
#[cfg(windows)]
async fn wait_for_signal() {
    let (mut ctrlc, mut ctrlbreak) = match (ctrl_c(), ctrl_break()) {
        (Ok(ctrlc), Ok(ctrlbreak)) => (ctrlc, ctrlbreak),
        (Err(e), _) | (_, Err(e)) => {
            error!("Failed to install signal handlers: {}", e);
            return std::future::pending().await;
        }
    };

    tokio::select! {
        _ = ctrlc.recv() => {
            info!("Received Ctrl+C signal, initiating graceful shutdown");
        }
        _ = ctrlbreak.recv() => {
            info!("Received Ctrl+Break signal, initiating graceful shutdown");
        }
    }
}
