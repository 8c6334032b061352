//! Axum server setup and router configuration.

use crate::api;
use crate::shutdown::shutdown_signal;
use crate::state::AppState;
use axum::Router;
use resinkeep_core::broker::NotificationBroker;
use std::net::SocketAddr;
use tokio::net::TcpListener;

/// Build the main application router.
pub fn build_router(state: AppState) -> Router {
    Router::new().nest("/api/v1", api::router()).with_state(state)
}

/// Run the server until SIGTERM / SIGINT.
///
/// On shutdown the broker is closed first so open WebSocket connections
/// receive a close frame and let the graceful shutdown complete.
pub async fn run_server(
    router: Router,
    addr: SocketAddr,
    broker: NotificationBroker,
) -> Result<(), std::io::Error> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            broker.shutdown();
        })
        .await
}
