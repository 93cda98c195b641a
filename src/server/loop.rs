// Server loop module
// Accepts connections until shutdown, then drains the active ones

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::watch;

use super::connection::accept_connection;
use super::signal::wait_for_shutdown;
use crate::config::AppState;
use crate::logger;

/// Poll interval while waiting for connections to finish
const DRAIN_POLL: Duration = Duration::from_millis(50);

/// Accept connections until `shutdown` fires. The listener is dropped on
/// return, so no new connections are taken after that point.
pub async fn start_server_loop(
    listener: TcpListener,
    state: Arc<AppState>,
    active_connections: Arc<AtomicUsize>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => accept_connection(
                        stream,
                        peer_addr,
                        &state,
                        &active_connections,
                        shutdown.clone(),
                    ),
                    Err(e) => logger::log_error(&format!("Failed to accept connection: {e}")),
                }
            }

            () = wait_for_shutdown(&mut shutdown) => break,
        }
    }

    drop(listener);
}

/// Wait for active connections to finish, up to `timeout`.
///
/// Returns the number of connections still open when waiting stopped.
pub async fn drain_connections(active_connections: &AtomicUsize, timeout: Duration) -> usize {
    logger::log_shutdown_started(active_connections.load(Ordering::SeqCst));

    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let remaining = active_connections.load(Ordering::SeqCst);
        if remaining == 0 || tokio::time::Instant::now() >= deadline {
            logger::log_shutdown_complete(remaining);
            return remaining;
        }
        tokio::time::sleep(DRAIN_POLL).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_drain_returns_immediately_when_idle() {
        let active = AtomicUsize::new(0);
        assert_eq!(drain_connections(&active, Duration::from_secs(5)).await, 0);
    }

    #[tokio::test]
    async fn test_drain_gives_up_after_timeout() {
        let active = AtomicUsize::new(2);
        let remaining = drain_connections(&active, Duration::from_millis(60)).await;
        assert_eq!(remaining, 2);
    }

    #[tokio::test]
    async fn test_drain_sees_connections_finish() {
        let active = Arc::new(AtomicUsize::new(1));
        let finisher = Arc::clone(&active);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            finisher.fetch_sub(1, Ordering::SeqCst);
        });
        assert_eq!(drain_connections(&active, Duration::from_secs(5)).await, 0);
    }
}
