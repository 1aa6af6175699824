mod core;
mod features;
mod modules;
mod shared;

use crate::core::config::{Config, DatastoreBackend};
use crate::core::database;
use crate::core::server::{build_app, spawn_startup_jobs, AppState};
use crate::modules::datastore::{Datastore, Db, LeanCloudClient, MemoryStore, PgDocumentStore};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    // Build Tokio runtime with configurable worker threads
    let worker_threads = std::env::var("TOKIO_WORKER_THREADS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|p| p.get())
                .unwrap_or(4)
        });

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_threads)
        .max_blocking_threads(worker_threads * 4)
        .enable_all()
        .build()?;

    runtime.block_on(async_main(worker_threads))
}

async fn connect_datastore(config: &Config) -> anyhow::Result<Arc<dyn Datastore>> {
    let store: Arc<dyn Datastore> = match config.datastore.backend {
        DatastoreBackend::LeanCloud => {
            Arc::new(LeanCloudClient::new(&config.datastore.leancloud)?)
        }
        DatastoreBackend::Postgres => {
            let db_config = config
                .database
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL is required for postgres"))?;
            let pool = database::connect_and_migrate(db_config).await?;
            Arc::new(PgDocumentStore::new(pool))
        }
        DatastoreBackend::Memory => {
            tracing::warn!("Using the in-memory datastore; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };
    Ok(store)
}

async fn async_main(worker_threads: usize) -> anyhow::Result<()> {
    // Load .env file BEFORE initializing logger so RUST_LOG is available
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;

    // Log system info
    let available_cpus = std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(1);
    tracing::info!(
        "System info: available_cpus={}, tokio_worker_threads={}, pid={}",
        available_cpus,
        worker_threads,
        std::process::id()
    );

    tracing::info!("Configuration loaded successfully");

    let db = Db::new(connect_datastore(&config).await?);
    tracing::info!("Datastore ready (backend: {})", db.backend_name());

    let state = AppState::new(
        db,
        &config.client,
        &config.datastore.leancloud,
        &config.webhook,
    )?;
    let app = build_app(&state, &config.app, &config.swagger);

    spawn_startup_jobs(&state);

    // Start server
    let addr = config.app.server_address();
    let socket_addr: std::net::SocketAddr = addr
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid address: {}", e))?;

    // Use socket2 for TCP listener configuration
    let socket = socket2::Socket::new(
        socket2::Domain::for_address(socket_addr),
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )?;

    socket.set_reuse_address(true)?;
    #[cfg(unix)]
    socket.set_reuse_port(true)?;
    socket.set_nodelay(true)?;

    #[cfg(target_os = "linux")]
    {
        let keepalive = socket2::TcpKeepalive::new()
            .with_time(std::time::Duration::from_secs(60))
            .with_interval(std::time::Duration::from_secs(10))
            .with_retries(3);
        socket.set_tcp_keepalive(&keepalive)?;
    }
    #[cfg(not(target_os = "linux"))]
    {
        let keepalive = socket2::TcpKeepalive::new().with_time(std::time::Duration::from_secs(60));
        socket.set_tcp_keepalive(&keepalive)?;
    }

    socket.set_nonblocking(true)?;
    socket.bind(&socket_addr.into())?;
    socket.listen(1024)?;

    let listener = tokio::net::TcpListener::from_std(socket.into())?;
    tracing::info!("Server listening on {}", format!("http://{}", addr));
    tracing::info!(
        "OpenAPI document available at {}",
        format!("http://{}/api-docs/openapi.json", addr)
    );

    axum::serve(listener, app).await?;

    Ok(())
}
