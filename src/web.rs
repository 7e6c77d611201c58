// 🌐 Web Layer - routes, handlers and the realtime socket
//
// Pages, the name lookup, the card-reader event relay, static files.

use crate::config::AppConfig;
use crate::error::StorageError;
use crate::pages::{self, PageRoute};
use crate::registry::{LookupOutcome, RegistryService};
use crate::relay::{CardEvent, CardEventRequest, EventRelay};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, Request, State,
    },
    handler::HandlerWithoutStateExt,
    http::{HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinError;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::{debug, error, info, warn};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<RegistryService>,
    pub relay: EventRelay,
    pub default_lang: String,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(registry: RegistryService, config: &AppConfig) -> Self {
        AppState {
            registry: Arc::new(registry),
            relay: EventRelay::default(),
            default_lang: config.web.default_lang.clone(),
            started_at: Utc::now(),
        }
    }
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }
}

impl ApiResponse<()> {
    fn err(message: String) -> Self {
        Self {
            success: false,
            data: (),
            error: Some(message),
        }
    }
}

#[derive(Debug)]
pub enum WebError {
    Storage(StorageError),
    /// Blocking lookup task panicked or was cancelled
    Task(JoinError),
}

impl From<StorageError> for WebError {
    fn from(e: StorageError) -> Self {
        WebError::Storage(e)
    }
}

impl From<JoinError> for WebError {
    fn from(e: JoinError) -> Self {
        WebError::Task(e)
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        match self {
            WebError::Storage(e) => {
                error!(error = %e, "record file failure during lookup");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ApiResponse::err(e.to_string())),
                )
                    .into_response()
            }
            WebError::Task(e) => {
                error!(error = %e, "lookup task failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ApiResponse::err("lookup failed".to_string())),
                )
                    .into_response()
            }
        }
    }
}

#[derive(Deserialize)]
pub struct LangQuery {
    lang: Option<String>,
}

#[derive(Deserialize)]
pub struct CheckNameRequest {
    #[serde(default)]
    f_name: String,
    #[serde(default)]
    l_name: String,
}

#[derive(Serialize)]
struct HealthStatus {
    status: &'static str,
    people: usize,
    started_at: DateTime<Utc>,
}

// ============================================================================
// Handlers
// ============================================================================

fn serve_page(route: &'static PageRoute, state: &AppState, query: LangQuery) -> Html<String> {
    let lang = query.lang.unwrap_or_else(|| state.default_lang.clone());
    Html(pages::render_page(route, &lang))
}

/// POST /check-name - Look a person up and register them on first hit
async fn check_name(
    State(state): State<AppState>,
    Json(req): Json<CheckNameRequest>,
) -> Result<Json<LookupOutcome>, WebError> {
    // Lookup holds a std mutex across a file rewrite; keep it off the runtime
    let registry = Arc::clone(&state.registry);
    let outcome =
        tokio::task::spawn_blocking(move || registry.lookup(&req.f_name, &req.l_name)).await??;
    Ok(Json(outcome))
}

/// POST /card-event - Relay a card-reader status to connected browsers
async fn card_event(
    State(state): State<AppState>,
    Json(req): Json<CardEventRequest>,
) -> impl IntoResponse {
    match CardEvent::from_status(&req.status, req.data) {
        Some(event) => {
            state.relay.publish(event);
        }
        None => debug!(status = %req.status, "unknown card status ignored"),
    }

    (StatusCode::OK, "OK")
}

/// GET /socket - Subscribe to card events
async fn socket(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| relay_to_socket(socket, state.relay))
}

async fn relay_to_socket(mut socket: WebSocket, relay: EventRelay) {
    let mut subscription = relay.subscribe();
    info!(subscribers = relay.subscriber_count(), "socket connected");

    loop {
        tokio::select! {
            event = subscription.next() => {
                let Some(event) = event else { break };
                let text = match serde_json::to_string(&event) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!(error = %e, "failed to encode card event");
                        continue;
                    }
                };
                if socket.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            incoming = socket.recv() => {
                // Clients only listen; anything but a close is ignored
                match incoming {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    info!("socket disconnected");
}

/// GET /api/health - Health check
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::ok(HealthStatus {
        status: "OK",
        people: state.registry.people_count(),
        started_at: state.started_at,
    }))
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Html(pages::render_error(404, "Not Found")),
    )
}

/// Request log line: method, path, status, latency
async fn log_requests(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(req).await;

    info!(
        %method,
        path = %path,
        status = response.status().as_u16(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "request"
    );
    response
}

fn cors_layer(origin: &str) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods([Method::GET, Method::POST]);
    match origin.parse::<HeaderValue>() {
        Ok(origin) => cors.allow_origin(origin),
        Err(_) => {
            warn!(origin, "invalid CORS origin, cross-origin requests disabled");
            cors
        }
    }
}

// ============================================================================
// Router
// ============================================================================

pub fn router(state: AppState, config: &AppConfig) -> Router {
    let mut app: Router<AppState> = Router::new();
    for route in pages::ROUTES {
        app = app.route(
            route.path,
            get(move |State(state): State<AppState>, Query(query): Query<LangQuery>| async move {
                serve_page(route, &state, query)
            }),
        );
    }

    let static_files =
        ServeDir::new(&config.web.static_dir).not_found_service(not_found.into_service());

    app.route("/check-name", post(check_name))
        .route("/card-event", post(card_event))
        .route("/socket", get(socket))
        .route("/api/health", get(health_check))
        .fallback_service(static_files)
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(log_requests))
                .layer(cors_layer(&config.server.cors_origin)),
        )
        .with_state(state)
}

// ============================================================================
// Tests
// ============================================================================
