//! Pasur session server.
//!
//! Serves the session API over HTTP/WebSocket, storing sessions in
//! PostgreSQL when a database URL is configured and in memory otherwise.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Error;
use log::info;
use pasur::db::{Database, InMemorySessionRepository, SessionRepository};
use pasur_server::{api, config::ServerConfig, logging, metrics};
use pico_args::Arguments;

const HELP: &str = "\
Run the Pasur session server

USAGE:
  pasur_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:6969]
  --db-url     URL         Database connection string  [default: env DATABASE_URL]

FLAGS:
  --in-memory              Keep sessions in memory even if DATABASE_URL is set
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8080)
  DATABASE_URL             PostgreSQL connection string
  METRICS_BIND             Prometheus exporter address (e.g., 0.0.0.0:9090)
  TURN_TIMEOUT_SECS        Seconds a player has to act [default: 15]
  RUST_LOG                 Log filter [default: info,sqlx=warn,hyper=warn]
  (See README.md for all configuration options)
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        return Ok(());
    }

    let in_memory = pargs.contains("--in-memory");
    let bind: Option<SocketAddr> = pargs.opt_value_from_str("--bind")?;
    let database_url: Option<String> = pargs.opt_value_from_str("--db-url")?;

    logging::init();

    let config = ServerConfig::from_env(bind, database_url, in_memory)?;
    config.validate()?;

    if let Some(addr) = config.metrics_bind {
        metrics::init_metrics(addr).map_err(|e| anyhow::anyhow!(e))?;
        info!("Prometheus metrics exported on {}", addr);
    }

    let (repository, database): (Arc<dyn SessionRepository>, Option<Database>) =
        match &config.database {
            Some(db_config) => {
                info!("Connecting to database");
                let db = Database::new(db_config)
                    .await
                    .map_err(|e| anyhow::anyhow!("Failed to connect to database: {}", e))?;
                let repository = db.session_repository();
                repository
                    .ensure_schema()
                    .await
                    .map_err(|e| anyhow::anyhow!("Failed to prepare session table: {}", e))?;
                info!("Database connected successfully");
                (Arc::new(repository), Some(db))
            }
            None => {
                info!("No database configured; sessions are kept in memory");
                (Arc::new(InMemorySessionRepository::new()), None)
            }
        };

    let state = api::AppState::new(config.session, repository, database);
    let app = api::create_router(state);

    info!("Starting HTTP/WebSocket server on {}", config.bind);
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", config.bind, e))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    info!("Shutting down server...");

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to install CTRL+C signal handler: {}", e);
        std::future::pending::<()>().await;
    }
}
