use payments_relay::config::AppConfig;
use payments_relay::gateways::http_processor::HttpProcessor;
use payments_relay::router::processor_router::ProcessorRouter;
use payments_relay::service::payment_service::PaymentService;
use payments_relay::storage::{ShardedStore, MIGRATOR};
use payments_relay::AppState;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cfg = AppConfig::from_env();

    let store = Arc::new(
        ShardedStore::open(&cfg.database, cfg.shard_count, &MIGRATOR, cfg.read_pool_size).await?,
    );

    let default = Arc::new(HttpProcessor::new(
        &cfg.processor_default_url,
        cfg.upstream_timeout_ms,
        cfg.health_timeout_ms,
    )?);
    let fallback = Arc::new(HttpProcessor::new(
        &cfg.processor_fallback_url,
        cfg.upstream_timeout_ms,
        cfg.health_timeout_ms,
    )?);
    let router = Arc::new(ProcessorRouter::new(default, fallback, cfg.router_config()));

    let shutdown = CancellationToken::new();
    let pollers = router.spawn_health_pollers(shutdown.clone());

    let state = AppState {
        payment_service: PaymentService::new(router, store.clone()),
        payment_wait_timeout: cfg.payment_wait_timeout(),
        shutdown: shutdown.clone(),
    };
    let app = payments_relay::http::app(state, cfg.internal_api_key.clone());

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    tracing::info!(
        "listening on {} (shards={}, default={}, fallback={})",
        cfg.bind_addr,
        store.shard_count(),
        cfg.processor_default_url,
        cfg.processor_fallback_url
    );
    // Cancel before draining: requests still waiting for a processor answer 503.
    let draining = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            tracing::info!("shutting down");
            draining.cancel();
        })
        .await?;

    for poller in pollers {
        let _ = poller.await;
    }
    store.close().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to listen for SIGTERM: {}", e);
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
}
