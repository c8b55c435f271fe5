use std::net::SocketAddr;
use std::time::Duration;

use axum::http::StatusCode;
use axum::middleware;
use axum::Router;
use masa_core::layers::{catch_panic_layer, default_cors, default_trace, localize_errors};
use tokio::net::TcpListener;
use tower_http::timeout::TimeoutLayer;
use tracing::{info, warn};

use crate::controllers;
use crate::state::AppState;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// The full HTTP surface: public menu, auth, dashboard, admin and health.
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(controllers::menu::routes(&state))
        .merge(controllers::auth::routes())
        .merge(controllers::admin::routes())
        .merge(controllers::catalog::routes())
        .merge(controllers::tables::routes())
        .merge(controllers::service_requests::routes())
        .merge(controllers::settings::routes())
        .with_state(state.clone())
        .merge(state.health.clone().router())
        .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, REQUEST_TIMEOUT))
        .layer(catch_panic_layer())
        .layer(middleware::from_fn(localize_errors))
        .layer(default_cors())
        .layer(default_trace())
}

/// Serve until Ctrl-C or SIGTERM, then drain in-flight requests.
pub async fn serve(router: Router, addr: &str) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "Masa listening");
    axum::serve(listener, router.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Masa stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
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

    info!("Shutdown signal received, starting graceful shutdown");
}
