use std::sync::Arc;

use axum::{
    Router,
    routing::{get, patch, post},
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use super::services::{
    cancel_task, delete_task, get_task, health, list_tasks, reset_tasks, restart_task,
    submit_task, update_language,
};
use super::settings::{
    cookies_content, cookies_status, downloader_config_content, downloader_config_status,
    update_cookies, update_downloader_config,
};
use super::state::AppState;
use crate::config::Config;
use crate::queue::{QueueService, Scheduler};
use crate::store::TaskStore;
use crate::worker::GamdlRunner;

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Build the full application router. Separated from [`run`] so tests can
/// drive it with `tower::ServiceExt::oneshot`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/tasks", get(list_tasks).post(submit_task))
        .route("/api/tasks/reset", post(reset_tasks))
        .route("/api/tasks/{id}", get(get_task).delete(delete_task))
        .route("/api/tasks/{id}/cancel", post(cancel_task))
        .route("/api/tasks/{id}/restart", post(restart_task))
        .route("/api/tasks/{id}/language", patch(update_language))
        .route(
            "/api/settings/cookies",
            get(cookies_status).put(update_cookies),
        )
        .route("/api/settings/cookies/content", get(cookies_content))
        .route(
            "/api/settings/config",
            get(downloader_config_status).put(update_downloader_config),
        )
        .route("/api/settings/config/content", get(downloader_config_content))
        .route("/health", get(health))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Wire everything together and serve until shutdown: open the store, run
/// the crash-recovery sweep, arm the scheduler for any backlog, then bind.
pub async fn run(config: Config) -> Result<(), AnyError> {
    ensure_directories(&config)?;
    if seed_downloader_config(&config)? {
        info!(path = %config.downloader.config_path.display(), "Seeded empty downloader config");
    }

    info!(path = %config.store.path.display(), "Opening task store");
    let store = Arc::new(TaskStore::open(&config.store.path)?);

    let runner = Arc::new(GamdlRunner::new(config.downloader.clone()));
    let scheduler = Scheduler::new(store.clone(), runner);

    // Recovery must complete before the first notify, or an orphaned running
    // row could block the queue forever.
    let recovered = scheduler.recover_interrupted()?;
    info!(recovered, "Startup recovery sweep finished");

    let service = Arc::new(QueueService::new(
        store.clone(),
        scheduler.clone(),
        config.downloader.languages.clone(),
    ));

    // Drain any backlog persisted by a previous run.
    scheduler.notify();

    let address = config.server.bind_addr;
    let state = AppState::new(config, service);
    let app = router(state);

    let listener = TcpListener::bind(address).await?;
    info!(%address, "tunedl API listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped, syncing task store");
    store.persist()?;

    Ok(())
}

fn ensure_directories(config: &Config) -> std::io::Result<()> {
    std::fs::create_dir_all(&config.downloader.output_dir)?;
    std::fs::create_dir_all(&config.downloader.temp_dir)?;
    if let Some(parent) = config.downloader.cookies_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Seed an empty downloader config file on first boot so the settings
/// endpoints have something to edit. An existing file is left untouched.
fn seed_downloader_config(config: &Config) -> std::io::Result<bool> {
    let path = &config.downloader.config_path;
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, "")?;
    Ok(true)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to install signal handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
