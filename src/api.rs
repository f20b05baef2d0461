//! HTTP surface over the ledger engine. This is presentation glue: every
//! handler delegates straight to `LedgerEngine` and maps its errors onto
//! status codes.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use time::Date;

use bukukas_core::{
    CatalogSide, CheckoutLine, PaymentMethod, TransactionFilter, TransactionKind,
};

use crate::auth::{auth_middleware, CallerIdentity};
use crate::config::AuthConfig;
use crate::engine::{LedgerEngine, LedgerError};

pub struct AppState {
    pub engine: LedgerEngine,
}

pub enum ApiError {
    Ledger(LedgerError),
    Forbidden,
    BadRequest(String),
}

impl From<LedgerError> for ApiError {
    fn from(e: LedgerError) -> Self {
        ApiError::Ledger(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Ledger(LedgerError::Validation(msg)) => {
                (StatusCode::UNPROCESSABLE_ENTITY, msg)
            }
            ApiError::Ledger(LedgerError::DuplicateItem(item)) => (
                StatusCode::CONFLICT,
                format!("item already registered: {}", item),
            ),
            ApiError::Ledger(LedgerError::Storage(e)) => {
                tracing::error!(error = %e, "Storage failure");
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
            ApiError::Forbidden => (
                StatusCode::FORBIDDEN,
                "editor role required".to_string(),
            ),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };
        (status, Json(json!({ "success": false, "error": message }))).into_response()
    }
}

fn require_editor(caller: &CallerIdentity) -> Result<(), ApiError> {
    if caller.can_edit() {
        Ok(())
    } else {
        tracing::warn!(caller = %caller.name, "Mutating call without editor role");
        Err(ApiError::Forbidden)
    }
}

#[derive(Debug, Deserialize)]
pub struct RecordTransactionRequest {
    pub date: Date,
    pub kind: TransactionKind,
    pub item: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub date: Date,
    pub kind: TransactionKind,
    pub lines: Vec<CheckoutLine>,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterItemRequest {
    pub item: String,
    pub standard_price: Decimal,
    pub unit: String,
    /// Defaults to the purchase catalog.
    #[serde(default)]
    pub side: Option<CatalogSide>,
}

#[derive(Debug, Deserialize)]
pub struct IncomeStatementQuery {
    pub from: Date,
    pub to: Date,
}

#[derive(Serialize)]
struct Ack {
    success: bool,
}

pub fn router(state: Arc<AppState>, auth: Arc<AuthConfig>) -> Router {
    Router::new()
        .route(
            "/transactions",
            post(record_transaction).get(list_transactions),
        )
        .route("/checkouts", post(record_checkout))
        .route("/items", post(register_item))
        .route("/reset", post(reset))
        .route("/journal", get(list_journal))
        .route("/inventory", get(list_inventory))
        .route("/catalog/:side", get(list_catalog))
        .route("/reports/trial-balance", get(trial_balance))
        .route("/reports/income-statement", get(income_statement))
        .layer(middleware::from_fn(auth_middleware))
        .layer(Extension(auth))
        // Health stays outside the auth layer.
        .route("/health", get(health))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn record_transaction(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<CallerIdentity>,
    Json(req): Json<RecordTransactionRequest>,
) -> Result<Response, ApiError> {
    require_editor(&caller)?;
    let line = CheckoutLine {
        item: req.item,
        quantity: req.quantity,
        unit_price: req.unit_price,
        payment_method: req.payment_method,
        unit: req.unit,
    };
    let txn = state
        .engine
        .record_transaction(req.date, req.kind, line, req.note)?;
    Ok((StatusCode::CREATED, Json(txn)).into_response())
}

async fn record_checkout(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<CallerIdentity>,
    Json(req): Json<CheckoutRequest>,
) -> Result<Response, ApiError> {
    require_editor(&caller)?;
    let created = state
        .engine
        .record_checkout(req.date, req.kind, req.lines, req.note)?;
    Ok((StatusCode::CREATED, Json(created)).into_response())
}

async fn register_item(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<CallerIdentity>,
    Json(req): Json<RegisterItemRequest>,
) -> Result<Response, ApiError> {
    require_editor(&caller)?;
    match req.side.unwrap_or(CatalogSide::Purchase) {
        CatalogSide::Purchase => {
            state
                .engine
                .register_purchase_item(&req.item, req.standard_price, &req.unit)?
        }
        CatalogSide::Sale => {
            state
                .engine
                .register_sale_item(&req.item, req.standard_price, &req.unit)?
        }
    }
    Ok((StatusCode::CREATED, Json(Ack { success: true })).into_response())
}

async fn reset(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<CallerIdentity>,
) -> Result<Json<Ack>, ApiError> {
    require_editor(&caller)?;
    state.engine.reset_all()?;
    Ok(Json(Ack { success: true }))
}

async fn list_transactions(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<TransactionFilter>,
) -> Result<Response, ApiError> {
    let transactions = state.engine.list_transactions(&filter)?;
    Ok(Json(transactions).into_response())
}

async fn list_journal(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let journal = state.engine.list_journal()?;
    Ok(Json(journal).into_response())
}

async fn list_inventory(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let inventory = state.engine.list_inventory()?;
    Ok(Json(inventory).into_response())
}

async fn list_catalog(
    State(state): State<Arc<AppState>>,
    Path(side): Path<String>,
) -> Result<Response, ApiError> {
    let side: CatalogSide = side.parse().map_err(ApiError::BadRequest)?;
    let catalog = state.engine.list_catalog(side)?;
    Ok(Json(catalog).into_response())
}

async fn trial_balance(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let report = state.engine.compute_trial_balance()?;
    Ok(Json(report).into_response())
}

async fn income_statement(
    State(state): State<Arc<AppState>>,
    Query(range): Query<IncomeStatementQuery>,
) -> Result<Response, ApiError> {
    let report = state.engine.compute_income_statement(range.from, range.to)?;
    Ok(Json(report).into_response())
}
