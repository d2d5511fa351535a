use expense_tracker::config::Config;
use expense_tracker::db::{SqlExecutor, database_factory};
use expense_tracker::router::{AppState, expense_router};
use expense_tracker::service::SqlExpenseStore;
use mimalloc::MiMalloc;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cfg = Config::load()?;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cfg.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        db_engine = %cfg.db_engine,
        db_name = %cfg.db_name,
        pool_min = cfg.db_pool_min,
        pool_max = cfg.db_pool_max,
        listen_addr = %cfg.listen_addr,
        loglevel = %cfg.loglevel
    );

    let settings = cfg.pool_settings()?;
    let db = database_factory(&cfg.db_engine, &cfg.db_name, &settings).await?;
    if cfg.db_init_schema {
        db.init_schema().await?;
    }

    let store = Arc::new(SqlExpenseStore::new(db).with_page_size(settings.bulk_page_size));
    let app = expense_router(AppState::from_arc(store.clone()));

    let listener = TcpListener::bind(&cfg.listen_addr).await?;
    info!("HTTP server listening on {}", cfg.listen_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    store.executor().close_all().await;
    info!("connection pool closed; bye");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
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
    info!("shutdown signal received");
}
