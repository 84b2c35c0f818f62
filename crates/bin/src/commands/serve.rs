//! Serve command - runs the Tollgate HTTP service.
//!
//! Every operation is a `PUT /{operation}` carrying a request envelope; the
//! answer is a response envelope whose `Code` is also the HTTP status.

use std::{path::Path, sync::Arc};

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tollgate::{
    AuthService, Drivers, Operation, Store,
    envelope::{EnvelopeError, Request, Response, ResponseHead},
};

use crate::cli::ServeArgs;
use crate::config::Config;

/// Shared application state
#[derive(Clone)]
struct AppState {
    service: Arc<AuthService>,
    store: Arc<Store>,
}

/// Run the Tollgate service
pub async fn run(path: &Path, args: &ServeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load(path)?;
    let drivers = Drivers::builtin()?;
    let store = Arc::new(config.open_store(&drivers).await?);
    let service = Arc::new(AuthService::new(
        config.encryption(&drivers)?,
        config.service_options()?,
    ));
    tracing::info!(
        store = %store.name(),
        encryption = %service.crypt_name(),
        "Service configured"
    );

    let app = router(AppState {
        service,
        store: store.clone(),
    });

    let host = args.host.as_deref().unwrap_or(&config.service.host);
    let port = args.port.unwrap_or(config.service.port);
    let listener = tokio::net::TcpListener::bind((host, port)).await?;
    let local_addr = listener.local_addr()?;

    println!("Tollgate listening on http://{local_addr}");
    println!();
    println!("Available endpoints:");
    for operation in Operation::ALL {
        println!("  PUT  /{operation}");
    }
    println!("  GET  /ping");
    println!();
    println!("Press Ctrl+C to shutdown");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Err(e) = store.close().await {
        tracing::error!("Failed to close store: {e}");
    }
    println!("Server shut down");
    Ok(())
}

fn router(state: AppState) -> Router {
    let mut router = Router::new().route("/ping", get(handle_ping));
    for operation in Operation::ALL {
        router = router.route(
            &format!("/{operation}"),
            put(
                move |state: State<AppState>, payload: Result<Json<Request>, JsonRejection>| {
                    handle_operation(state, operation, payload)
                },
            ),
        );
    }
    router.with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to set up SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT, initiating graceful shutdown..."),
        _ = terminate => tracing::info!("Received SIGTERM, initiating graceful shutdown..."),
    }
}

/// Handler for PUT /{operation}
async fn handle_operation(
    State(state): State<AppState>,
    operation: Operation,
    payload: Result<Json<Request>, JsonRejection>,
) -> (StatusCode, Json<Response>) {
    let response = match payload {
        Ok(Json(request)) => state.service.dispatch(&state.store, operation, request).await,
        Err(rejection) => {
            tracing::debug!(operation = %operation, "Malformed request: {rejection}");
            malformed()
        }
    };
    let status =
        StatusCode::from_u16(response.head.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(response))
}

/// Unsigned answer for a body that is not a request envelope.
fn malformed() -> Response {
    let mut head = ResponseHead::new(0, Utc::now());
    head.code = 400;
    head.message = EnvelopeError::InvalidHeader.to_string();
    Response::new(head, "")
}

/// Body of `GET /ping`. The HTTP status says whether the store answered.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PingReport {
    /// Storage driver name
    pub store: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Handler for GET /ping
async fn handle_ping(State(state): State<AppState>) -> impl IntoResponse {
    let store = state.store.name();
    match state.store.ping().await {
        Ok(()) => (StatusCode::OK, Json(PingReport { store, error: None })),
        Err(e) => {
            tracing::warn!(store = %store, "Store ping failed: {e}");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(PingReport {
                    store,
                    error: Some(e.to_string()),
                }),
            )
        }
    }
}
