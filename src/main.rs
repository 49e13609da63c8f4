//! Digital Menu backend
//!
//! Main application entry point

use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};

use digital_menu::{
    build_router,
    config::Settings,
    database::{create_pool, run_migrations},
    middleware::RateLimitMiddleware,
    utils::logging,
    AppState,
};

/// How often idle rate limiter entries are dropped
const LIMITER_CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Load configuration
    let settings = Settings::new().context("Failed to load configuration")?;
    settings.validate()?;

    // Initialize logging; the guard flushes the log file on exit
    let _log_guard = logging::init_logging(&settings.logging)?;

    info!("Starting {}...", digital_menu::info());

    info!("Connecting to database...");
    let pool = create_pool(&settings.database)
        .await
        .context("Failed to connect to the database")?;

    if settings.database.run_migrations {
        run_migrations(&pool).await?;
    }

    let state = AppState::new(settings.clone(), pool);

    if let Some(admin) = &settings.auth.bootstrap_admin {
        state.services.user_service.bootstrap_admin(admin).await?;
    }

    spawn_limiter_cleanup(state.login_limiter.clone());

    let app = build_router(state);

    let address = settings.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    info!("Digital Menu listening on {}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Digital Menu has been shut down.");
    Ok(())
}

fn spawn_limiter_cleanup(limiter: RateLimitMiddleware) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(LIMITER_CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            limiter.cleanup_old_entries();
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!(error = %e, "Failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!(error = %e, "Failed to install terminate handler");
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
