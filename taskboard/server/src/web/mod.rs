use axum::Router;
use axum::middleware::from_fn;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::storage::Storage;

pub mod body;
pub mod response;
pub mod routing;

use body::read_json_body;
use routing::{Dispatcher, dispatch_handler};

/// Builds the application router around an explicitly constructed store.
///
/// Every request passes through the body reader before reaching the
/// dispatcher, which is mounted as the router's fallback.
pub fn create_app(storage: Arc<Storage>) -> Router {
    let dispatcher = Arc::new(Dispatcher::new(storage));

    Router::new()
        .fallback(dispatch_handler)
        .with_state(dispatcher)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(from_fn(read_json_body)),
        )
}

/// Serves the application on an already bound listener.
pub async fn serve(listener: TcpListener, storage: Arc<Storage>) -> anyhow::Result<()> {
    axum::serve(listener, create_app(storage)).await?;
    Ok(())
}

#[tracing::instrument(skip(config))]
pub async fn start_web_server(config: Config) -> anyhow::Result<()> {
    let storage = Arc::new(Storage::load(&config.db_path).await);

    let server_address = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&server_address).await?;
    tracing::info!("Web server running on http://{}", server_address);

    serve(listener, storage).await
}
