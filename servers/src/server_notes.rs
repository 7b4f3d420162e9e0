use anyhow::{Context, Result};
use clap::Parser;
use servers::notes_logic::{bootstrap, config, routes};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional
    let _ = dotenvy::dotenv();

    let cli = config::Config::parse();
    let settings = config::Settings::resolve(config::load_config(cli)?)?;
    let _log_guard = lib_notes::loggers::init_tracing(
        "server_notes",
        settings.log_dir.as_deref(),
        &settings.log_level,
    )?;

    info!(
        namespace = settings.store.namespace(),
        threshold = settings.store.threshold(),
        backend = ?settings.backend,
        "Starting notes server."
    );

    let app_state = bootstrap::build_state(&settings).await?;
    let store = app_state.store.clone();

    let addr = format!("0.0.0.0:{}", settings.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Listening on http://{}", addr);

    routes::serve(listener, app_state, shutdown_signal())
        .await
        .context("Server error")?;

    if settings.flush_on_shutdown {
        match store.flush_now().await {
            Ok(moved) => info!("Flushed {} buffered records on shutdown.", moved),
            Err(e) => error!("Flush on shutdown failed: {}", e),
        }
    }

    info!("Shutdown complete.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut term_signal) => {
                term_signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Ctrl-C received, initiating shutdown."),
        _ = terminate => info!("SIGTERM received, initiating shutdown."),
    }
}
