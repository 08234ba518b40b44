use anyhow::{Context, Result};
use std::time::Duration;

use tracing::{error, info};

use crate::archive_store::ArchiveCounts;
use tower_http::services::ServeDir;

use axum::{extract::State, middleware, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;

use super::archive_routes::make_archive_routes;
use super::metrics::{init_metrics, metrics_handler, set_archive_metrics};
use super::page_routes::make_page_routes;
use super::session::Session;
use super::user_routes::{make_auth_routes, make_user_routes};
use super::{error_details, log_requests, state::*, ServerConfig};

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub version: String,
    pub session_token: Option<String>,
    pub archive: Option<ArchiveCounts>,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

async fn home(session: Option<Session>, State(state): State<ServerState>) -> impl IntoResponse {
    let archive = match state.archive_store.counts() {
        Ok(counts) => Some(counts),
        Err(err) => {
            error!("Failed to count archive rows: {}", err);
            None
        }
    };
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        version: state.version.clone(),
        session_token: session.map(|s| s.token),
        archive,
    };
    Json(stats)
}

pub fn make_app(
    config: ServerConfig,
    archive_store: GuardedArchiveStore,
    search_vault: GuardedSearchVault,
    user_manager: GuardedUserManager,
) -> Result<Router> {
    let state = ServerState::new(config.clone(), archive_store, search_vault, user_manager);

    let api_routes: Router =
        make_archive_routes(state.clone()).merge(make_user_routes(state.clone()));

    let home_router: Router = match config.frontend_dir_path {
        Some(frontend_path) => {
            let static_files_service =
                ServeDir::new(frontend_path).append_index_html_on_directories(true);
            Router::new().fallback_service(static_files_service)
        }
        None => Router::new()
            .route("/", get(home))
            .with_state(state.clone()),
    };

    let app: Router = home_router
        .nest("/v1/auth", make_auth_routes(state.clone()))
        .nest("/api", api_routes)
        .nest("/pages", make_page_routes(state.clone()))
        .layer(middleware::from_fn_with_state(state.clone(), error_details))
        .layer(middleware::from_fn_with_state(state, log_requests));

    Ok(app)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for ctrl-c: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!("Failed to listen for SIGTERM: {}", err);
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
    info!("Shutdown signal received");
}

async fn run_metrics_server(port: u16) -> Result<()> {
    let app = Router::new().route("/metrics", get(metrics_handler));
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .with_context(|| format!("Failed to bind metrics port {}", port))?;
    axum::serve(listener, app).await?;
    Ok(())
}

pub async fn run_server(
    config: ServerConfig,
    archive_store: GuardedArchiveStore,
    search_vault: GuardedSearchVault,
    user_manager: GuardedUserManager,
) -> Result<()> {
    init_metrics();
    match archive_store.counts() {
        Ok(counts) => set_archive_metrics(&counts),
        Err(err) => error!("Failed to read archive counts for metrics: {}", err),
    }

    if config.metrics_port != 0 {
        let metrics_port = config.metrics_port;
        tokio::spawn(async move {
            if let Err(err) = run_metrics_server(metrics_port).await {
                error!("Metrics server stopped: {}", err);
            }
        });
        info!("Metrics available at port {}", metrics_port);
    }

    let port = config.port;
    let app = make_app(config, archive_store, search_vault, user_manager)?;

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;
    info!("Ready to serve at port {}!", port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
