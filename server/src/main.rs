use axum::{routing::get, Router};
use config::ServerConfig;
use events::ChannelPublisher;
use game_manager::AppState;
use ratings::InMemoryRatings;
use std::sync::Arc;
use store::InMemoryStore;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use ws::ws_handler;

mod api;
mod broadcast;
mod config;
mod error;
mod events;
mod game_manager;
mod ratings;
mod registry;
mod scheduler;
mod store;
mod ws;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::load();
    let addr = config.bind_addr;
    let (publisher, events_rx) = ChannelPublisher::new();
    let ratings = InMemoryRatings::new(config.default_rating);
    let state = Arc::new(AppState::new(
        config,
        Arc::new(InMemoryStore::new()),
        Arc::new(publisher),
        Arc::new(ratings),
    ));

    let background = state.spawn_background_tasks();
    let event_loop = tokio::spawn(Arc::clone(&state).run_event_loop(events_rx));

    let app = Router::new()
        .route("/ws", get(ws_handler))
        .merge(api::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("listening on {}", addr);

    let shutdown = state.shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            shutdown.cancel();
        })
        .await?;

    state.shutdown.cancel();
    for task in background {
        let _ = task.await;
    }
    let _ = event_loop.await;
    Ok(())
}
