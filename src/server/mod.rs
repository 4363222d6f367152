pub mod routes;

pub use routes::router;

use crate::state::AppState;
use std::future::Future;

/// Serves the HTTP surface and runs one retention sweeper per storage tier
/// until `shutdown` resolves.
pub async fn serve<F>(state: AppState, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let handles: Vec<_> = state
        .sweepers()
        .into_iter()
        .map(|sweeper| sweeper.start())
        .collect();

    let addr = format!("{}:{}", state.config.server.bind_addr, state.config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("HTTP server listening on http://{}", addr);

    let served = axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await;

    for handle in handles {
        handle.stop().await;
    }

    served?;
    Ok(())
}
