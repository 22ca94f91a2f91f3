//! HTTP API server for the routing node.
//!
//! Provides REST endpoints for routing, executing and inspecting payments,
//! chain administration, recommendations and stats.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chainroute_core::{
    ChainId, ChainProfile, CoreError, ExecutionResult, PaymentId, PaymentPlan, PaymentRequest,
    PrivacyLevel,
};
use chainroute_routing::RoutingError;
use chainroute_settlement::{BatchRouteSummary, EngineError, EngineStats, PaymentLookup};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;

use crate::state::AppState;
use crate::storage::StatusEntry;

// --- Request / response types ---

#[derive(Serialize, Deserialize)]
pub struct BatchRequest {
    pub payments: Vec<PaymentRequest>,
}

#[derive(Serialize, Deserialize)]
pub struct ChainsResponse {
    pub chains: Vec<ChainProfile>,
    pub count: usize,
}

#[derive(Serialize, Deserialize)]
pub struct SetEnabledRequest {
    pub enabled: bool,
}

#[derive(Deserialize)]
pub struct RecommendParams {
    pub amount: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub privacy: PrivacyLevel,
}

fn default_currency() -> String {
    "USD".into()
}

#[derive(Serialize, Deserialize)]
pub struct RecommendResponse {
    pub chain: ChainId,
}

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub payments: usize,
    pub enabled_chains: usize,
}

#[derive(Serialize, Deserialize)]
pub struct HistoryResponse {
    pub payment_id: PaymentId,
    pub history: Vec<StatusEntry>,
}

#[derive(Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, error: impl ToString) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
}

/// HTTP status for an engine error.
fn status_for(err: &EngineError) -> StatusCode {
    match err {
        EngineError::Routing(RoutingError::ChainNotFound(_)) | EngineError::PaymentNotFound(_) => {
            StatusCode::NOT_FOUND
        }
        EngineError::Routing(RoutingError::NoAvailableBackend) => StatusCode::SERVICE_UNAVAILABLE,
        EngineError::Routing(RoutingError::RateFeed(_)) => StatusCode::BAD_GATEWAY,
        EngineError::Routing(RoutingError::DuplicateChainId(_))
        | EngineError::DuplicatePayment(_)
        | EngineError::ExecutionInProgress { .. }
        | EngineError::CancellationRejected { .. }
        | EngineError::Cancelled(_)
        | EngineError::ChainInUse { .. }
        | EngineError::Core(CoreError::InvalidStateTransition { .. }) => StatusCode::CONFLICT,
        EngineError::Routing(_) | EngineError::Core(_) => StatusCode::BAD_REQUEST,
        EngineError::MixingFailure { .. } | EngineError::ExecutionFailure { .. } => {
            StatusCode::BAD_GATEWAY
        }
        EngineError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
    }
}

fn engine_error(err: EngineError) -> ApiError {
    let status = status_for(&err);
    if status.is_server_error() {
        tracing::warn!(error = %err, %status, "Request failed");
    } else {
        tracing::debug!(error = %err, %status, "Request rejected");
    }
    api_error(status, err)
}

fn parse_payment_id(raw: &str) -> Result<PaymentId, ApiError> {
    PaymentId::parse(raw).map_err(|e| api_error(StatusCode::BAD_REQUEST, e))
}

// --- Handlers ---

async fn handle_route(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PaymentRequest>,
) -> Result<(StatusCode, Json<PaymentPlan>), ApiError> {
    let plan = state.engine.route(req).await.map_err(engine_error)?;
    Ok((StatusCode::CREATED, Json(plan)))
}

async fn handle_batch(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BatchRequest>,
) -> Json<BatchRouteSummary> {
    Json(state.engine.batch_route(req.payments).await)
}

async fn handle_execute(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ExecutionResult>, ApiError> {
    let id = parse_payment_id(&id)?;
    let result = state.engine.execute(&id).await.map_err(engine_error)?;
    Ok(Json(result))
}

async fn handle_cancel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<PaymentPlan>, ApiError> {
    let id = parse_payment_id(&id)?;
    let plan = state.engine.cancel(&id).await.map_err(engine_error)?;
    Ok(Json(plan))
}

async fn handle_get_payment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<PaymentLookup>), ApiError> {
    let id = parse_payment_id(&id)?;
    let mut lookup = state.engine.get_payment_status(&id);
    // Plans from earlier runs are only on disk.
    if let (true, Some(storage)) = (lookup == PaymentLookup::NotFound, &state.storage) {
        if let Some(payment) = storage
            .get_payment(&id)
            .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e))?
        {
            lookup = PaymentLookup::Found {
                status: payment.status,
                payment,
            };
        }
    }
    let status = match lookup {
        PaymentLookup::NotFound => StatusCode::NOT_FOUND,
        PaymentLookup::Found { .. } => StatusCode::OK,
    };
    Ok((status, Json(lookup)))
}

async fn handle_history(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let payment_id = parse_payment_id(&id)?;
    let storage = state
        .storage
        .as_ref()
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "storage is disabled on this node"))?;
    let history = storage
        .status_history(&payment_id)
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e))?;
    Ok(Json(HistoryResponse {
        payment_id,
        history,
    }))
}

async fn handle_chains(State(state): State<Arc<AppState>>) -> Json<ChainsResponse> {
    let chains = state.engine.list_chains();
    let count = chains.len();
    Json(ChainsResponse { chains, count })
}

async fn handle_set_enabled(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<SetEnabledRequest>,
) -> Result<Json<ChainProfile>, ApiError> {
    let id = ChainId::new(id);
    state
        .engine
        .set_chain_enabled(&id, req.enabled)
        .map_err(engine_error)?;
    tracing::info!(chain = %id, enabled = req.enabled, "Chain availability changed");
    state
        .engine
        .registry()
        .get(&id)
        .map(Json)
        .ok_or_else(|| engine_error(EngineError::Routing(RoutingError::ChainNotFound(id))))
}

async fn handle_recommend(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RecommendParams>,
) -> Result<Json<RecommendResponse>, ApiError> {
    let chain = state
        .engine
        .get_recommended_chain(params.amount, &params.currency, params.privacy)
        .map_err(engine_error)?;
    Ok(Json(RecommendResponse { chain }))
}

async fn handle_stats(State(state): State<Arc<AppState>>) -> Json<EngineStats> {
    Json(state.engine.get_stats())
}

async fn handle_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.uptime_secs(),
        payments: state.engine.payments().len(),
        enabled_chains: state.engine.registry().enabled_ids().len(),
    })
}

// --- Server ---

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/payments", post(handle_route))
        .route("/api/v1/payments/batch", post(handle_batch))
        .route("/api/v1/payments/{id}", get(handle_get_payment))
        .route("/api/v1/payments/{id}/execute", post(handle_execute))
        .route("/api/v1/payments/{id}/cancel", post(handle_cancel))
        .route("/api/v1/payments/{id}/history", get(handle_history))
        .route("/api/v1/chains", get(handle_chains))
        .route("/api/v1/chains/{id}/enabled", post(handle_set_enabled))
        .route("/api/v1/recommend", get(handle_recommend))
        .route("/api/v1/stats", get(handle_stats))
        .route("/api/v1/health", get(handle_health))
        .with_state(state)
}

pub async fn start_api_server(listen_addr: SocketAddr, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    tracing::info!(%listen_addr, "HTTP API server started");
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainroute_core::{PaymentStatus, SpeedTier};
    use chainroute_settlement::adapters::{MockExecutor, MockMixer};
    use chainroute_settlement::RoutingEngine;
    use std::time::Duration;

    fn mock_engine() -> chainroute_settlement::EngineBuilder {
        RoutingEngine::builder(Arc::new(MockMixer::new()), Arc::new(MockExecutor::new()))
    }

    fn state_with(executor: MockExecutor) -> Arc<AppState> {
        let engine =
            RoutingEngine::builder(Arc::new(MockMixer::new()), Arc::new(executor)).build();
        Arc::new(AppState::new(Arc::new(engine), None))
    }

    fn state() -> Arc<AppState> {
        state_with(MockExecutor::new())
    }

    async fn route(state: &Arc<AppState>, amount: f64) -> PaymentPlan {
        let (status, Json(plan)) = handle_route(
            State(state.clone()),
            Json(PaymentRequest::new("alice", "bob", amount, "USD")),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        plan
    }

    #[tokio::test]
    async fn test_route_and_execute() {
        let state = state();
        let plan = route(&state, 25.0).await;

        let Json(result) = handle_execute(State(state.clone()), Path(plan.payment_id.to_string()))
            .await
            .unwrap();
        assert_eq!(result.tx_hash.len(), 64);

        let (status, Json(lookup)) =
            handle_get_payment(State(state.clone()), Path(plan.payment_id.to_string()))
                .await
                .unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(lookup.status(), Some(PaymentStatus::Confirmed));
    }

    #[tokio::test]
    async fn test_invalid_amount_is_bad_request() {
        let err = handle_route(
            State(state()),
            Json(PaymentRequest::new("alice", "bob", -1.0, "USD")),
        )
        .await
        .unwrap_err();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_payment() {
        let state = state();
        let (status, Json(lookup)) =
            handle_get_payment(State(state.clone()), Path(PaymentId::new().to_string()))
                .await
                .unwrap();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(lookup, PaymentLookup::NotFound);

        let err = handle_execute(State(state), Path(PaymentId::new().to_string()))
            .await
            .unwrap_err();
        assert_eq!(err.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_malformed_payment_id() {
        let err = handle_cancel(State(state()), Path("not-an-id".into()))
            .await
            .unwrap_err();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_executor_failure_maps_to_bad_gateway() {
        let state = state_with(MockExecutor::new().failing("node offline"));
        let plan = route(&state, 5.0).await;
        let err = handle_execute(State(state), Path(plan.payment_id.to_string()))
            .await
            .unwrap_err();
        assert_eq!(err.0, StatusCode::BAD_GATEWAY);
        assert!(err.1.error.contains("node offline"));
    }

    #[tokio::test]
    async fn test_cancel_then_execute_conflicts() {
        let state = state();
        let plan = route(&state, 5.0).await;
        let Json(cancelled) = handle_cancel(State(state.clone()), Path(plan.payment_id.to_string()))
            .await
            .unwrap();
        assert_eq!(cancelled.status, PaymentStatus::Failed);

        let err = handle_execute(State(state), Path(plan.payment_id.to_string()))
            .await
            .unwrap_err();
        assert_eq!(err.0, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_batch_route() {
        let state = state();
        let Json(summary) = handle_batch(
            State(state),
            Json(BatchRequest {
                payments: vec![
                    PaymentRequest::new("a", "b", 10.0, "USD"),
                    PaymentRequest::new("a", "b", 0.0, "USD"),
                ],
            }),
        )
        .await;
        assert_eq!(summary.total_payments, 2);
        assert_eq!(summary.successful_routes, 1);
    }

    #[tokio::test]
    async fn test_chain_toggle() {
        let state = state();
        let Json(profile) = handle_set_enabled(
            State(state.clone()),
            Path("ETH".into()),
            Json(SetEnabledRequest { enabled: false }),
        )
        .await
        .unwrap();
        assert!(!profile.enabled);

        let Json(chains) = handle_chains(State(state.clone())).await;
        assert_eq!(chains.count, 6);

        let err = handle_set_enabled(
            State(state),
            Path("NOPE".into()),
            Json(SetEnabledRequest { enabled: true }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_recommend() {
        let Json(resp) = handle_recommend(
            State(state()),
            Query(RecommendParams {
                amount: 50.0,
                currency: "USD".into(),
                privacy: PrivacyLevel::Maximum,
            }),
        )
        .await
        .unwrap();
        assert_eq!(resp.chain.as_str(), "XMR");
    }

    #[tokio::test]
    async fn test_stats_and_health() {
        let state = state();
        route(&state, 10.0).await;
        let Json(stats) = handle_stats(State(state.clone())).await;
        assert_eq!(stats.total_payments, 1);

        let Json(health) = handle_health(State(state)).await;
        assert_eq!(health.status, "ok");
        assert_eq!(health.payments, 1);
        assert_eq!(health.enabled_chains, 6);
    }

    #[tokio::test]
    async fn test_history_requires_storage() {
        let err = handle_history(State(state()), Path(PaymentId::new().to_string()))
            .await
            .unwrap_err();
        assert_eq!(err.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_execute_timeout_maps_to_gateway_timeout() {
        let engine = RoutingEngine::builder(
            Arc::new(MockMixer::new()),
            Arc::new(MockExecutor::new().with_latency(Duration::from_millis(300))),
        )
        .policy(chainroute_core::EnginePolicy {
            execute_timeout_ms: 20,
            ..Default::default()
        })
        .build();
        let state = Arc::new(AppState::new(Arc::new(engine), None));
        let (_, Json(plan)) = handle_route(
            State(state.clone()),
            Json(PaymentRequest::new("a", "b", 5.0, "USD").with_speed(SpeedTier::Instant)),
        )
        .await
        .unwrap();
        let err = handle_execute(State(state), Path(plan.payment_id.to_string()))
            .await
            .unwrap_err();
        assert_eq!(err.0, StatusCode::GATEWAY_TIMEOUT);
    }

    #[tokio::test]
    async fn test_lookup_falls_back_to_storage() {
        let dir = std::env::temp_dir().join(format!("chainroute-api-{}", uuid::Uuid::now_v7()));
        let storage = Arc::new(crate::storage::Storage::open(&dir).unwrap());
        let engine = mock_engine().durability(storage.clone()).build();
        let plan = engine
            .route(PaymentRequest::new("alice", "bob", 10.0, "USD"))
            .await
            .unwrap();

        // A fresh engine over the same storage, as after a restart.
        let state = Arc::new(AppState::new(Arc::new(mock_engine().build()), Some(storage)));
        let (status, Json(lookup)) =
            handle_get_payment(State(state.clone()), Path(plan.payment_id.to_string()))
                .await
                .unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(lookup.status(), Some(PaymentStatus::Pending));

        let Json(history) = handle_history(State(state), Path(plan.payment_id.to_string()))
            .await
            .unwrap();
        assert!(history.history.is_empty());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_lookup_after_restart_reports_final_state() {
        let dir = std::env::temp_dir().join(format!("chainroute-api-{}", uuid::Uuid::now_v7()));
        let storage = Arc::new(crate::storage::Storage::open(&dir).unwrap());
        let engine = mock_engine().durability(storage.clone()).build();
        let plan = engine
            .route(PaymentRequest::new("alice", "bob", 10.0, "USD"))
            .await
            .unwrap();
        let result = engine.execute(&plan.payment_id).await.unwrap();

        let state = Arc::new(AppState::new(Arc::new(mock_engine().build()), Some(storage)));
        let (status, Json(lookup)) =
            handle_get_payment(State(state.clone()), Path(plan.payment_id.to_string()))
                .await
                .unwrap();
        assert_eq!(status, StatusCode::OK);
        let PaymentLookup::Found { status, payment } = lookup else {
            panic!("stored payment should be found");
        };
        assert_eq!(status, PaymentStatus::Confirmed);
        assert_eq!(payment.tx_hash, Some(result.tx_hash));

        let Json(history) = handle_history(State(state), Path(plan.payment_id.to_string()))
            .await
            .unwrap();
        let last = history.history.last().map(|e| e.status);
        assert_eq!(last, Some(PaymentStatus::Confirmed));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_build_router() {
        let _router = build_router(state());
    }
}
