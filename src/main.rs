//! Application entry point and server initialization
//!
//! Loads configuration, sets up logging and the database, then serves the app
//! until SIGINT/SIGTERM.

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use tinyapp::config::Config;
use tinyapp::database::{init_db, AppState, Store};
use tinyapp::route::create_app;

/// Application entry point
///
/// # Environment Variables
///
/// - `HOST` / `PORT` - listen address (default: 0.0.0.0:8080)
/// - `DATABASE_URL` - redb file path; unset keeps data in memory
/// - `KEY_LENGTH` - length of generated short URLs (default: 6)
/// - `SESSION_COOKIE` - session cookie name (default: user_id)
/// - `SECURE_COOKIE` - mark the session cookie Secure (default: false)
/// - `DEBUG_ENDPOINTS` - serve the JSON dumps (default: true)
/// - `RUST_LOG` - log filter (default: tinyapp=debug,tower_http=debug)
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("tinyapp=debug,tower_http=debug"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let db = init_db(config.database_path.as_deref()).context("failed to initialize database")?;
    match &config.database_path {
        Some(path) => tracing::info!(path = %path, "using database file"),
        None => tracing::info!("using in-memory database, data is lost on restart"),
    }

    let addr = config.bind_addr();
    let store = Store::new(db, config.key_length);
    let state = AppState::new(store, config);

    let app = create_app(state).layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("TinyApp listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

/// Resolves on Ctrl+C (SIGINT) or, on Unix, SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
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

    tracing::info!("shutdown signal received, stopping server");
}
