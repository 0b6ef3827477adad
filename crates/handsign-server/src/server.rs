//! Axum server setup and startup

use std::net::SocketAddr;

use axum::Router;

/// Runs the HTTP server on `addr` until Ctrl+C is pressed.
pub async fn run_server(addr: SocketAddr, app: Router) -> Result<(), std::io::Error> {
    let listener = tokio::net::TcpListener::bind(addr).await?;

    log::info!("listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::error!("failed to listen for Ctrl+C: {e}");
                std::future::pending::<()>().await;
            }
            log::info!("shutting down gracefully");
        })
        .await
}
