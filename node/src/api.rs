// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # REST + WebSocket API
//!
//! Builds the axum router that exposes the gateway's HTTP interface.
//! All endpoints share application state through axum's `State` extractor.
//! Handlers only translate between HTTP and `microcoin_protocol`; every
//! decision about accounts, hashes and signatures is made there.
//!
//! ## Endpoints
//!
//! | Method | Path                                   | Description                      |
//! |--------|----------------------------------------|----------------------------------|
//! | GET    | `/health`                              | Liveness probe                   |
//! | GET    | `/api/account/offers`                  | Accounts listed for public sale  |
//! | POST   | `/api/account/list`                    | Accounts owned by a public key   |
//! | GET    | `/api/account/:account`                | Account details                  |
//! | GET    | `/api/account/:account/pending`        | Pending operations               |
//! | GET    | `/api/account/:account/history`        | Operation history                |
//! | POST   | `/api/account/change-key/{start,commit}` | Change account owner key       |
//! | POST   | `/api/account/purchase/{start,commit}` | Buy a listed account             |
//! | POST   | `/api/account/event`                   | Relay a transaction event        |
//! | GET    | `/api/transaction/:ophash`             | Single operation                 |
//! | POST   | `/api/transaction/{start,commit}`      | Coin transfer                    |
//! | GET    | `/ws`                                  | Live transaction events          |
//!
//! ## Errors
//!
//! Every failure is an [`ApiError`] body. The status comes from the error
//! code: 404 for not found, 403 for a bad signature, 500 for internal
//! errors and 400 for everything else.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use microcoin_protocol::crypto::PublicKeyInput;
use microcoin_protocol::ledger::LedgerNode;
use microcoin_protocol::query::{self, AccountView, CommitReceipt, OperationView};
use microcoin_protocol::transaction::{
    commit, start, AccountNumber, ChangeKeyRequest, CommitOutcome, OperationRequest,
    PurchaseAccountRequest, Signed, TransferRequest,
};
use microcoin_protocol::{ApiError, ErrorCode, ProtocolError};

use crate::metrics::SharedMetrics;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
///
/// Cheap to clone; everything behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The gateway's reported version string.
    pub version: String,
    /// Network label (e.g. "mainnet", "testnet").
    pub network: String,
    /// The ledger node every request is answered from.
    pub node: Arc<dyn LedgerNode>,
    /// Broadcast channel feeding WebSocket subscribers.
    pub event_tx: broadcast::Sender<TransactionEvent>,
    /// Reference to Prometheus metrics for in-handler recording.
    pub metrics: SharedMetrics,
}

/// A confirmed operation as pushed to WebSocket subscribers.
///
/// Amounts are unsigned coin values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionEvent {
    pub from: AccountNumber,
    pub to: AccountNumber,
    pub amount: Decimal,
    pub fee: Decimal,
    pub ophash: String,
    pub balance: Decimal,
    #[serde(default)]
    pub payload: String,
}

impl TransactionEvent {
    /// Whether `account` sent or received the operation.
    pub fn involves(&self, account: AccountNumber) -> bool {
        self.from == account || self.to == account
    }
}

impl From<&OperationView> for TransactionEvent {
    fn from(op: &OperationView) -> Self {
        Self {
            from: op.sender,
            to: op.target,
            amount: op.amount.abs(),
            fee: op.fee.abs(),
            ophash: op.op_hash.clone(),
            balance: op.balance,
            payload: op.payload.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Error Responses
// ---------------------------------------------------------------------------

/// [`ApiError`] rendered as an HTTP response.
#[derive(Debug)]
pub struct HttpError(pub ApiError);

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.0)).into_response()
    }
}

impl From<ApiError> for HttpError {
    fn from(err: ApiError) -> Self {
        Self(err)
    }
}

impl From<ProtocolError> for HttpError {
    fn from(err: ProtocolError) -> Self {
        Self(ApiError::from(err))
    }
}

impl From<JsonRejection> for HttpError {
    fn from(rejection: JsonRejection) -> Self {
        invalid_data(rejection.body_text())
    }
}

impl From<QueryRejection> for HttpError {
    fn from(rejection: QueryRejection) -> Self {
        invalid_data(rejection.body_text())
    }
}

fn invalid_data(message: String) -> HttpError {
    let help = ApiError::from_code(ErrorCode::InvalidData).help;
    HttpError(ApiError::new(ErrorCode::InvalidData, message, help))
}

fn parse_account(text: &str) -> Result<AccountNumber, HttpError> {
    text.parse()
        .map_err(|e| HttpError::from(ProtocolError::InvalidAccount(e)))
}

type ApiResult<T> = Result<Json<T>, HttpError>;

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all API routes, CORS, and tracing.
pub fn create_router(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/ws", get(ws_handler))
        .route("/api/account/offers", get(offers_handler))
        .route("/api/account/list", post(accounts_by_key_handler))
        .route("/api/account/event", post(event_handler))
        .route("/api/account/change-key/start", post(change_key_start))
        .route("/api/account/change-key/commit", post(change_key_commit))
        .route("/api/account/purchase/start", post(purchase_start))
        .route("/api/account/purchase/commit", post(purchase_commit))
        .route("/api/account/:account", get(account_handler))
        .route("/api/account/:account/pending", get(pending_handler))
        .route("/api/account/:account/history", get(history_handler))
        .route("/api/transaction/start", post(transfer_start))
        .route("/api/transaction/commit", post(transfer_commit))
        .route("/api/transaction/:ophash", get(operation_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Read Handlers
// ---------------------------------------------------------------------------

/// `GET /health`: returns 200 if the gateway is alive.
///
/// Does not contact the ledger node.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": state.version,
        "network": state.network,
    }))
}

async fn account_handler(
    State(state): State<AppState>,
    Path(account): Path<String>,
) -> ApiResult<AccountView> {
    Ok(Json(query::account_details(&*state.node, &account).await?))
}

async fn offers_handler(State(state): State<AppState>) -> ApiResult<Vec<AccountView>> {
    Ok(Json(query::offers(&*state.node).await?))
}

async fn accounts_by_key_handler(
    State(state): State<AppState>,
    body: Result<Json<PublicKeyInput>, JsonRejection>,
) -> ApiResult<Vec<AccountView>> {
    let Json(key) = body?;
    Ok(Json(query::accounts_by_key(&*state.node, &key).await?))
}

async fn pending_handler(
    State(state): State<AppState>,
    Path(account): Path<String>,
) -> ApiResult<Vec<OperationView>> {
    let account = parse_account(&account)?;
    Ok(Json(query::pending(&*state.node, account).await?))
}

#[derive(Debug, Deserialize)]
struct HistoryParams {
    start: Option<u32>,
    max: Option<u32>,
}

async fn history_handler(
    State(state): State<AppState>,
    Path(account): Path<String>,
    params: Result<Query<HistoryParams>, QueryRejection>,
) -> ApiResult<Vec<OperationView>> {
    let account = parse_account(&account)?;
    let Query(params) = params?;
    Ok(Json(
        query::history(&*state.node, account, params.start, params.max).await?,
    ))
}

async fn operation_handler(
    State(state): State<AppState>,
    Path(ophash): Path<String>,
) -> ApiResult<OperationView> {
    Ok(Json(query::operation(&*state.node, &ophash).await?))
}

// ---------------------------------------------------------------------------
// Start / Commit Handlers
// ---------------------------------------------------------------------------

/// Builds the operation and echoes the request back with the hash to sign.
async fn start_operation<T>(state: &AppState, request: T) -> ApiResult<Signed<T>>
where
    T: Clone + Into<OperationRequest>,
{
    let operation: OperationRequest = request.clone().into();
    let started = start(&*state.node, &operation).await?;
    state
        .metrics
        .operations_started_total
        .with_label_values(&[&operation.op_type().to_string()])
        .inc();
    Ok(Json(Signed {
        request,
        hash: Some(started.hash),
        signature: None,
    }))
}

/// Verifies and submits a signed operation, publishing an event when the
/// node accepts it.
async fn commit_operation<T>(state: &AppState, signed: Signed<T>) -> ApiResult<CommitReceipt>
where
    T: Into<OperationRequest>,
{
    let Signed {
        request,
        hash,
        signature,
    } = signed;
    let operation: OperationRequest = request.into();
    let op_type = operation.op_type().to_string();

    let began = Instant::now();
    let outcome = commit(&*state.node, &operation, hash, signature.as_ref()).await;
    state
        .metrics
        .commit_latency_seconds
        .observe(began.elapsed().as_secs_f64());

    let err = match outcome {
        Ok(CommitOutcome::Confirmed(confirmed)) => {
            state
                .metrics
                .operations_committed_total
                .with_label_values(&[&op_type])
                .inc();
            let receipt = CommitReceipt::from(&confirmed);
            publish(state, TransactionEvent::from(&receipt.operation));
            return Ok(Json(receipt));
        }
        Ok(CommitOutcome::Rejected(err)) => err,
        Err(e) => ApiError::from(e),
    };

    state
        .metrics
        .operations_rejected_total
        .with_label_values(&[err.error_code.label()])
        .inc();
    Err(HttpError(err))
}

fn publish(state: &AppState, event: TransactionEvent) -> usize {
    match state.event_tx.send(event) {
        Ok(receivers) => receivers,
        Err(_) => {
            tracing::debug!("no event subscribers");
            0
        }
    }
}

async fn transfer_start(
    State(state): State<AppState>,
    body: Result<Json<TransferRequest>, JsonRejection>,
) -> ApiResult<Signed<TransferRequest>> {
    let Json(request) = body?;
    start_operation(&state, request).await
}

async fn transfer_commit(
    State(state): State<AppState>,
    body: Result<Json<Signed<TransferRequest>>, JsonRejection>,
) -> ApiResult<CommitReceipt> {
    let Json(signed) = body?;
    commit_operation(&state, signed).await
}

async fn change_key_start(
    State(state): State<AppState>,
    body: Result<Json<ChangeKeyRequest>, JsonRejection>,
) -> ApiResult<Signed<ChangeKeyRequest>> {
    let Json(request) = body?;
    start_operation(&state, request).await
}

async fn change_key_commit(
    State(state): State<AppState>,
    body: Result<Json<Signed<ChangeKeyRequest>>, JsonRejection>,
) -> ApiResult<CommitReceipt> {
    let Json(signed) = body?;
    commit_operation(&state, signed).await
}

async fn purchase_start(
    State(state): State<AppState>,
    body: Result<Json<PurchaseAccountRequest>, JsonRejection>,
) -> ApiResult<Signed<PurchaseAccountRequest>> {
    let Json(request) = body?;
    start_operation(&state, request).await
}

async fn purchase_commit(
    State(state): State<AppState>,
    body: Result<Json<Signed<PurchaseAccountRequest>>, JsonRejection>,
) -> ApiResult<CommitReceipt> {
    let Json(signed) = body?;
    commit_operation(&state, signed).await
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// `POST /api/account/event`: relays an event from another producer to
/// WebSocket subscribers.
async fn event_handler(
    State(state): State<AppState>,
    body: Result<Json<TransactionEvent>, JsonRejection>,
) -> Result<impl IntoResponse, HttpError> {
    let Json(event) = body?;
    let delivered = publish(&state, event);
    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "delivered": delivered })),
    ))
}

#[derive(Debug, Deserialize)]
struct EventFilter {
    account: Option<String>,
}

/// `GET /ws`: upgrades to a WebSocket streaming [`TransactionEvent`]s.
///
/// With `?account=N` only events sent from or to that account are
/// forwarded. Client messages are ignored.
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    filter: Result<Query<EventFilter>, QueryRejection>,
) -> Result<Response, HttpError> {
    let Query(filter) = filter?;
    let account = filter.account.as_deref().map(parse_account).transpose()?;
    Ok(ws
        .on_upgrade(move |socket| handle_ws_connection(socket, state, account))
        .into_response())
}

/// Drives a single WebSocket connection, forwarding broadcast events
/// until the client disconnects or the channel is closed.
async fn handle_ws_connection(
    mut socket: WebSocket,
    state: AppState,
    account: Option<AccountNumber>,
) {
    let mut rx = state.event_tx.subscribe();

    loop {
        tokio::select! {
            event = rx.recv() => {
                match event {
                    Ok(ev) => {
                        if account.is_some_and(|a| !ev.involves(a)) {
                            continue;
                        }
                        let payload = match serde_json::to_string(&ev) {
                            Ok(s) => s,
                            Err(e) => {
                                tracing::warn!("failed to serialize ws event: {}", e);
                                continue;
                            }
                        };
                        if socket.send(Message::Text(payload)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!("ws subscriber lagged by {} events", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(_)) => {}
                    _ => break,
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
