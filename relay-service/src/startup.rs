//! Application startup and lifecycle management.

use crate::config::RelayConfig;
use crate::handlers::{health_check, metrics_endpoint, not_found, send_message};
use crate::services::{ChatProvider, GeoLocator, IpapiLocator, TelegramProvider};
use axum::{
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use reqwest::Client;
use service_core::error::AppError;
use service_core::middleware::{metrics_middleware, request_id_middleware, REQUEST_ID_HEADER};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<RelayConfig>,
    pub chat_provider: Arc<dyn ChatProvider>,
    pub geolocator: Arc<dyn GeoLocator>,
}

impl AppState {
    /// Wire the production Telegram and ipapi clients from `config`.
    pub fn from_config(config: RelayConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(config.outbound.timeout)
            .build()
            .map_err(|e| {
                AppError::InternalError(anyhow::anyhow!("Failed to build HTTP client: {}", e))
            })?;

        let chat_provider = Arc::new(TelegramProvider::new(
            config.telegram.api_url.clone(),
            client.clone(),
        ));
        let geolocator = Arc::new(IpapiLocator::new(
            config.geolocation.api_url.clone(),
            client,
        ));

        Ok(Self {
            config: Arc::new(config),
            chat_provider,
            geolocator,
        })
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/send", post(send_message))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_endpoint))
        .fallback(not_found)
        .with_state(state)
        .layer(from_fn(metrics_middleware))
        // Add tracing layer
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        // Add tracing middleware for request_id
        .layer(from_fn(request_id_middleware))
        // Any origin may post to the relay
        .layer(CorsLayer::permissive())
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: RelayConfig) -> Result<Self, AppError> {
        if config.destinations.is_empty() {
            tracing::warn!("No destinations configured; messages will be accepted and dropped");
        } else {
            tracing::info!(
                destinations = config.destinations.len(),
                "Telegram destinations configured"
            );
        }

        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let state = AppState::from_config(config)?;
        Self::build_with_state(addr, state).await
    }

    /// Bind `addr` and serve the given state. Port 0 picks a free port.
    pub async fn build_with_state(addr: SocketAddr, state: AppState) -> Result<Self, AppError> {
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Relay service listening on port {}", port);

        Ok(Self {
            port,
            listener,
            state,
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Run the application until a shutdown signal arrives.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let router = build_router(self.state);

        axum::serve(
            self.listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| {
            tracing::error!("HTTP server error: {}", e);
            std::io::Error::other(format!("HTTP server error: {}", e))
        })
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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

    tracing::info!("Shutdown signal received");
}
