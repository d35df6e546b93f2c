//! Counters HTTP Server.
//!
//! Thin JSON transport over [`CounterService`]: parses paths and bodies,
//! gives every request a deadline, and maps domain errors to status codes.

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Path, Query, State},
    http::{header, HeaderValue, StatusCode},
    middleware,
    response::Json,
    routing::{get, put},
    Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use super::rate_limit::{build_limiter, limit_by_client_ip, run_cleanup, ClientRateLimiter};
use crate::domain::errors::DomainError;
use crate::domain::models::{CallContext, Config, Counter, CounterId, CounterReading};
use crate::domain::ports::CounterStore;
use crate::services::CounterService;

/// Configuration for the counters HTTP server.
#[derive(Debug, Clone)]
pub struct CountersHttpConfig {
    /// Host to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Whether to enable CORS.
    pub enable_cors: bool,
    /// Deadline for each request's counter operation.
    pub request_timeout: Duration,
    /// `(requests_per_second, burst_size)` per client address; `None` disables limiting.
    pub rate_limit: Option<(u32, u32)>,
}

impl Default for CountersHttpConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            enable_cors: true,
            request_timeout: Duration::from_secs(3),
            rate_limit: None,
        }
    }
}

impl From<&Config> for CountersHttpConfig {
    fn from(config: &Config) -> Self {
        Self {
            host: config.server.host.clone(),
            port: config.server.port,
            enable_cors: config.server.enable_cors,
            request_timeout: config.server.request_timeout(),
            rate_limit: config
                .rate_limit
                .enabled
                .then_some((config.rate_limit.requests_per_second, config.rate_limit.burst_size)),
        }
    }
}

/// Request to create a counter.
#[derive(Debug, Deserialize)]
pub struct CreateCounterRequest {
    pub name: String,
}

/// Query parameters for increment.
#[derive(Debug, Deserialize)]
pub struct IncrementParams {
    #[serde(default = "default_amount")]
    pub amount: i64,
}

const fn default_amount() -> i64 {
    1
}

/// Response with a counter.
#[derive(Debug, Serialize, Deserialize)]
pub struct CounterResponse {
    pub id: CounterId,
    pub name: String,
    pub value: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Counter> for CounterResponse {
    fn from(c: Counter) -> Self {
        Self {
            id: c.id,
            name: c.name,
            value: c.value,
            created_at: c.created_at.to_rfc3339(),
            updated_at: c.updated_at.to_rfc3339(),
        }
    }
}

/// Response to an increment.
#[derive(Debug, Serialize, Deserialize)]
pub struct IncrementResponse {
    pub id: CounterId,
    pub value: i64,
}

/// Generic message response.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);
type ApiResult<T> = Result<T, ApiError>;

fn api_error(status: StatusCode, code: &str, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
            code: code.to_string(),
        }),
    )
}

/// Status code for each domain failure.
pub const fn status_for(err: &DomainError) -> StatusCode {
    match err {
        DomainError::CounterNotFound(_) => StatusCode::NOT_FOUND,
        DomainError::DuplicateName(_) => StatusCode::CONFLICT,
        DomainError::ValidationFailed(_) => StatusCode::BAD_REQUEST,
        DomainError::ValueOverflow { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        DomainError::StoreUnavailable(_) | DomainError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        DomainError::SerializationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        DomainError::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
    }
}

impl From<DomainError> for (StatusCode, Json<ErrorResponse>) {
    fn from(err: DomainError) -> Self {
        let status = status_for(&err);
        if status.is_server_error() {
            tracing::warn!(error = %err, code = err.code(), "counter request failed");
        }
        api_error(status, err.code(), err.to_string())
    }
}

fn parse_id(raw: &str) -> ApiResult<CounterId> {
    raw.parse()
        .map_err(|e: String| api_error(StatusCode::BAD_REQUEST, "INVALID_ID", e))
}

/// Shared state for the counters HTTP server.
struct AppState<S: CounterStore> {
    service: Arc<CounterService<S>>,
    request_timeout: Duration,
    shutdown: CancellationToken,
}

impl<S: CounterStore> AppState<S> {
    /// Request deadline plus a child of the server's shutdown token.
    fn context(&self) -> CallContext {
        CallContext::with_timeout(self.request_timeout).with_cancellation(self.shutdown.child_token())
    }
}

/// Counters HTTP Server.
pub struct CountersHttpServer<S: CounterStore + 'static> {
    config: CountersHttpConfig,
    service: Arc<CounterService<S>>,
    limiter: Option<Arc<ClientRateLimiter>>,
    shutdown: CancellationToken,
}

impl<S: CounterStore + 'static> CountersHttpServer<S> {
    pub fn new(service: Arc<CounterService<S>>, config: CountersHttpConfig) -> Self {
        let limiter = config.rate_limit.map(|(rps, burst)| build_limiter(rps, burst));
        Self {
            config,
            service,
            limiter,
            shutdown: CancellationToken::new(),
        }
    }

    /// Cancelled when the server begins shutting down; in-flight counter
    /// operations observe it through their `CallContext`.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Build the router.
    pub fn router(&self) -> Router {
        let state = Arc::new(AppState {
            service: Arc::clone(&self.service),
            request_timeout: self.config.request_timeout,
            shutdown: self.shutdown.clone(),
        });

        let mut app = Router::new()
            .route("/api/v1/counters", get(list_counters::<S>).post(create_counter::<S>))
            .route("/api/v1/counters/{id}", get(get_counter::<S>).delete(delete_counter::<S>))
            .route("/api/v1/counters/{id}/count", get(read_count::<S>))
            .route("/api/v1/counters/{id}/increment", put(increment_counter::<S>))
            .route("/health", get(health_check))
            .route("/ready", get(readiness::<S>))
            .with_state(state);

        if let Some(ref limiter) = self.limiter {
            app = app.layer(middleware::from_fn_with_state(Arc::clone(limiter), limit_by_client_ip));
        }

        app = app
            .layer(SetResponseHeaderLayer::if_not_present(
                header::X_CONTENT_TYPE_OPTIONS,
                HeaderValue::from_static("nosniff"),
            ))
            .layer(SetResponseHeaderLayer::if_not_present(
                header::X_FRAME_OPTIONS,
                HeaderValue::from_static("DENY"),
            ))
            .layer(SetResponseHeaderLayer::if_not_present(
                header::CACHE_CONTROL,
                HeaderValue::from_static("no-store"),
            ));

        if self.config.enable_cors {
            app.layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
                .layer(TraceLayer::new_for_http())
        } else {
            app.layer(TraceLayer::new_for_http())
        }
    }

    /// Start the server with a shutdown signal.
    pub async fn serve_with_shutdown<F>(
        self,
        shutdown: F,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port).parse()?;
        let router = self.router();
        let cleanup = self.limiter.clone().map(|limiter| tokio::spawn(run_cleanup(limiter)));
        let token = self.shutdown_token();
        let signal = async move {
            shutdown.await;
            token.cancel();
        };

        tracing::info!("Counters HTTP server listening on {}", addr);

        let listener = TcpListener::bind(addr).await?;
        let served = axum::serve(listener, router.into_make_service_with_connect_info::<SocketAddr>())
            .with_graceful_shutdown(signal)
            .await;

        if let Some(cleanup) = cleanup {
            cleanup.abort();
        }
        served?;
        tracing::info!("Counters HTTP server stopped");
        Ok(())
    }
}

// Handler functions

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn readiness<S: CounterStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> ApiResult<Json<serde_json::Value>> {
    state.service.health(&state.context()).await?;
    Ok(Json(serde_json::json!({
        "status": "ready",
        "cache_backend": state.service.cache().backend(),
    })))
}

async fn list_counters<S: CounterStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> ApiResult<Json<Vec<CounterResponse>>> {
    let counters = state.service.list(&state.context()).await?;
    Ok(Json(counters.into_iter().map(CounterResponse::from).collect()))
}

async fn create_counter<S: CounterStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    body: Result<Json<CreateCounterRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<CounterResponse>)> {
    let Json(req) = body.map_err(|e| api_error(StatusCode::BAD_REQUEST, "INVALID_BODY", e.body_text()))?;
    let counter = state.service.create(&state.context(), &req.name).await?;
    Ok((StatusCode::CREATED, Json(CounterResponse::from(counter))))
}

async fn get_counter<S: CounterStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> ApiResult<Json<CounterResponse>> {
    let id = parse_id(&id)?;
    let counter = state.service.get(&state.context(), id).await?;
    Ok(Json(CounterResponse::from(counter)))
}

async fn read_count<S: CounterStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> ApiResult<Json<CounterReading>> {
    let id = parse_id(&id)?;
    let reading = state.service.read(&state.context(), id).await?;
    Ok(Json(reading))
}

async fn increment_counter<S: CounterStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    params: Result<Query<IncrementParams>, QueryRejection>,
) -> ApiResult<Json<IncrementResponse>> {
    let id = parse_id(&id)?;
    let Query(params) =
        params.map_err(|e| api_error(StatusCode::BAD_REQUEST, "INVALID_AMOUNT", e.body_text()))?;

    let counter = state.service.increment(&state.context(), id, params.amount).await?;
    Ok(Json(IncrementResponse {
        id: counter.id,
        value: counter.value,
    }))
}

async fn delete_counter<S: CounterStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let id = parse_id(&id)?;
    state.service.delete(&state.context(), id).await?;
    Ok(Json(MessageResponse {
        message: format!("Counter {id} deleted"),
    }))
}
