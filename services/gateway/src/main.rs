mod catalog;
mod config;
mod error;
mod handlers;
mod models;
mod router;
mod state;

use std::sync::Arc;

use event_log::{LogConfig, UpdateLog};
use fanout::{
    ConnectionRegistry, DispatcherConfig, FanoutDispatcher, IngestConfig, QuizCatalog,
    ScoreIngestion, SnapshotHub,
};
use leaderboard::LeaderboardStore;
use tokio::net::TcpListener;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;

use catalog::HttpCatalog;
use config::GatewayConfig;
use router::create_router;
use state::AppState;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    tracing::info!("Starting quiz leaderboard gateway");

    let config = GatewayConfig::from_env();

    // Pipeline components
    let store = Arc::new(LeaderboardStore::new());
    let log = Arc::new(UpdateLog::new(LogConfig::default()));
    tracing::info!(stream = event_log::STREAM_NAME, "update log ready");
    let hub = Arc::new(SnapshotHub::with_defaults());
    let registry = Arc::new(ConnectionRegistry::new());

    let catalog: Option<Arc<dyn QuizCatalog>> = config
        .catalog_url
        .as_ref()
        .map(|url| Arc::new(HttpCatalog::new(url.clone())) as Arc<dyn QuizCatalog>);

    let ingestion = Arc::new(ScoreIngestion::new(
        Arc::clone(&store),
        Arc::clone(&log),
        catalog.clone(),
        IngestConfig {
            require_known_quiz: config.require_known_quiz,
        },
    ));

    // Fan-out worker: consumes the event log, publishes snapshots.
    let dispatcher = FanoutDispatcher::new(
        Arc::clone(&store),
        Arc::clone(&log),
        Arc::clone(&hub),
        DispatcherConfig::default(),
    );
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let dispatcher_task = tokio::spawn(dispatcher.run(shutdown_rx));

    // Forwarder: hub snapshots to registered realtime connections.
    let forwarder_task = tokio::spawn(forward_snapshots(
        Arc::clone(&hub),
        Arc::clone(&registry),
    ));

    let state = AppState {
        store,
        ingestion,
        hub,
        registry,
        catalog,
        config: config.clone(),
    };

    // Create router
    let app = create_router(state);

    // Bind and serve
    let listener = TcpListener::bind(config.addr).await?;

    tracing::info!("Listening on {}", config.addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Surfaces are closed; drain queued score events before exit.
    log.close().await;
    let _ = shutdown_tx.send(true);
    let _ = dispatcher_task.await;
    forwarder_task.abort();

    tracing::info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}

/// Serialize each published snapshot once and fan it out to every
/// registered connection interested in that quiz.
async fn forward_snapshots(hub: Arc<SnapshotHub>, registry: Arc<ConnectionRegistry>) {
    let mut updates = hub.subscribe();
    loop {
        match updates.recv().await {
            Ok(snapshot) => match serde_json::to_string(snapshot.as_ref()) {
                Ok(payload) => {
                    registry.broadcast(snapshot.quiz_id, Arc::from(payload));
                }
                Err(err) => {
                    tracing::error!(error = %err, "snapshot serialization failed");
                }
            },
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "forwarder lagged, continuing from newest snapshots");
            }
            Err(RecvError::Closed) => break,
        }
    }
}
