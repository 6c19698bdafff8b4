use crate::config::WebhookSettings;
use crate::{handlers, AppState};
use anyhow::{anyhow, Result};
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
    routing::{get, post},
    Json, Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

pub struct WebhookConfig {
    pub secret_token: Option<String>,
}

pub async fn start_webhook_server(state: Arc<AppState>, settings: WebhookSettings) -> Result<()> {
    info!(webhook_url = %settings.url, "Setting webhook URL");
    if let Err(err) = state
        .telegram
        .set_webhook(&settings.url, settings.secret_token.as_deref())
        .await
    {
        error!("Failed to set webhook: {err:?}");
        return Err(anyhow!("Failed to set webhook: {}", err));
    }
    info!("Webhook set successfully");

    let webhook_config = Arc::new(WebhookConfig {
        secret_token: settings.secret_token,
    });
    let app = create_router(state.clone(), webhook_config, settings.path);
    let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
    info!(port = settings.port, "Starting webhook server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal(state));

    if let Err(err) = server.await {
        error!("Server error: {err:?}");
        return Err(anyhow!("Server error: {}", err));
    }

    Ok(())
}

pub fn create_router_for_test(
    state: Arc<AppState>,
    webhook_config: Arc<WebhookConfig>,
    webhook_path: String,
) -> Router {
    create_router(state, webhook_config, webhook_path)
}

fn create_router(
    state: Arc<AppState>,
    webhook_config: Arc<WebhookConfig>,
    webhook_path: String,
) -> Router {
    // The secret only guards the update endpoint; probes stay open.
    let webhook = Router::new()
        .route(&webhook_path, post(webhook_handler))
        .route_layer(axum::middleware::from_fn_with_state(
            webhook_config,
            verify_secret_token_middleware,
        ));

    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check).post(health_check))
        .merge(webhook)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn verify_secret_token_middleware(
    State(config): State<Arc<WebhookConfig>>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if let Some(expected_token) = &config.secret_token {
        let header_value = request
            .headers()
            .get("X-Telegram-Bot-Api-Secret-Token")
            .ok_or(StatusCode::UNAUTHORIZED)?
            .to_str()
            .map_err(|_| StatusCode::BAD_REQUEST)?;

        if header_value != expected_token {
            return Err(StatusCode::UNAUTHORIZED);
        }
    }

    Ok(next.run(request).await)
}

async fn webhook_handler(
    State(state): State<Arc<AppState>>,
    Json(update): Json<crate::models::Update>,
) -> StatusCode {
    let update_id = update.update_id;
    tokio::spawn(async move {
        if let Err(err) = handlers::process_update(state, update).await {
            error!(update_id, "Failed to process update: {err:?}");
        }
    });

    StatusCode::OK
}

async fn index(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "running",
        "bot": state.bot_username,
    }))
}

async fn health_check() -> StatusCode {
    StatusCode::OK
}

async fn shutdown_signal(state: Arc<AppState>) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {err:?}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!("Failed to install SIGTERM handler: {err:?}");
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

    info!("Shutdown signal received, deleting webhook...");
    if let Err(err) = state.telegram.delete_webhook().await {
        warn!("Failed to delete webhook during shutdown: {err:?}");
    } else {
        info!("Webhook deleted successfully");
    }
}
