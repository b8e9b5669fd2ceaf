use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::{Query, State},
    http::{HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get},
};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use parley_api::config::Config;
use parley_api::credentials::Credentials;
use parley_api::{AppState, SharedState, auth, resources};
use parley_db::Database;
use parley_types::envelope::{ApiRequest, ApiResponse};

type Handler = fn(&AppState, &ApiRequest) -> ApiResponse;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "parley=debug,parley_api=debug,parley_db=info,tower_http=debug".into()
            }),
        )
        .init();

    // Config: refuses to start without a real signing secret
    let config = Config::from_env()?;

    let db = Database::open(&config.database_path, &config.pool)?;
    let state: SharedState = Arc::new(AppState::new(db, Credentials::new(&config.jwt_secret)));

    let app = Router::new()
        .route("/api", any(api))
        .route("/auth", any(authenticate))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr: SocketAddr = config.bind_addr().parse()?;
    info!("Parley server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn api(
    State(state): State<SharedState>,
    method: Method,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let request = to_envelope(&method, query, &headers, body);
    run_blocking(state, request, resources::handle).await
}

async fn authenticate(
    State(state): State<SharedState>,
    method: Method,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let request = to_envelope(&method, query, &headers, body);
    run_blocking(state, request, auth::handle).await
}

async fn health() -> &'static str {
    "ok"
}

/// Handlers talk to SQLite synchronously; keep them off the async workers.
async fn run_blocking(state: SharedState, request: ApiRequest, handler: Handler) -> Response {
    match tokio::task::spawn_blocking(move || handler(&state, &request)).await {
        Ok(resp) => into_http(resp),
        Err(e) => {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn to_envelope(
    method: &Method,
    query: HashMap<String, String>,
    headers: &HeaderMap,
    body: String,
) -> ApiRequest {
    let headers = headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();

    ApiRequest {
        http_method: method.as_str().to_string(),
        query_string_parameters: query,
        headers,
        body: (!body.is_empty()).then_some(body),
    }
}

fn into_http(resp: ApiResponse) -> Response {
    let status = StatusCode::from_u16(resp.status_code).unwrap_or_else(|_| {
        warn!("Handler produced invalid status {}", resp.status_code);
        StatusCode::INTERNAL_SERVER_ERROR
    });

    let mut builder = Response::builder().status(status);
    for (name, value) in &resp.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }

    builder.body(Body::from(resp.body)).unwrap_or_else(|e| {
        error!("Failed to build response: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                ctrl_c.await;
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await;
        info!("Received Ctrl+C, shutting down...");
    }
}
