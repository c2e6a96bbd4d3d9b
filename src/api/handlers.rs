//! HTTP request handlers for the pricing API.
//!
//! Every handler tags its work with a correlation id, maps extractor
//! rejections to 400 responses and runs the engine on the blocking pool,
//! since the ledger store holds a synchronous SQLite connection.

use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::calculation::month_start;
use crate::engine::PricingEngine;
use crate::error::{EngineError, EngineResult};
use crate::models::{BomLineInput, MaterialPriceQuery, NewMaterialPrice, PriceLine, ProcessRates};

use super::request::{
    BreakdownQuery, CompareQuery, CopyFormulaRequest, ExportQuery, FormulaRequest, HistoryQuery,
    ImportRequest, PublishRequest, parse_month,
};
use super::response::{
    ApiError, ApiErrorResponse, BreakdownResponse, HealthResponse, MonthStatusResponse,
};
use super::state::AppState;

/// Header carrying the acting user.
pub const USER_HEADER: &str = "x-user-id";

type HandlerResult = Result<Response, ApiErrorResponse>;

/// Creates the API router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/prices/publish", post(publish_handler))
        .route("/pieces/:piece_id/breakdown", get(breakdown_handler))
        .route("/pieces/:piece_id/history", get(history_handler))
        .route("/pieces/:piece_id/compare", get(compare_handler))
        .route(
            "/pieces/:piece_id/formula",
            get(get_formula_handler).put(replace_formula_handler),
        )
        .route("/pieces/:piece_id/formula/lines", post(add_line_handler))
        .route(
            "/pieces/:piece_id/formula/lines/:line_id",
            delete(remove_line_handler),
        )
        .route(
            "/pieces/:piece_id/formula/validate",
            post(validate_formula_handler),
        )
        .route("/pieces/:piece_id/formula/copy", post(copy_formula_handler))
        .route(
            "/zones/:zone_id/process-parameters/:month",
            get(get_process_parameters_handler).put(set_process_parameters_handler),
        )
        .route("/zones/:zone_id/months/:month/close", post(close_month_handler))
        .route("/zones/:zone_id/months/:month/closed", get(month_status_handler))
        .route("/zones/:zone_id/closed-months", get(closed_months_handler))
        .route(
            "/zones/:zone_id/material-prices/import",
            post(import_material_prices_handler),
        )
        .route(
            "/zones/:zone_id/material-prices/export",
            get(export_material_prices_handler),
        )
        .route(
            "/material-prices",
            get(list_material_prices_handler).post(set_material_price_handler),
        )
        .route(
            "/material-prices/:id/deactivate",
            post(deactivate_material_price_handler),
        )
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Shared plumbing
// ---------------------------------------------------------------------------

async fn run<T, F>(state: &AppState, op: F) -> EngineResult<T>
where
    T: Send + 'static,
    F: FnOnce(&PricingEngine) -> EngineResult<T> + Send + 'static,
{
    let engine = state.engine_handle();
    tokio::task::spawn_blocking(move || op(&engine))
        .await
        .map_err(|e| EngineError::Persistence {
            message: format!("Engine task failed: {}", e),
        })?
}

fn engine_failure(correlation_id: Uuid, err: EngineError) -> ApiErrorResponse {
    match &err {
        EngineError::Persistence { .. }
        | EngineError::ConfigNotFound { .. }
        | EngineError::ConfigParseError { .. } => {
            error!(correlation_id = %correlation_id, error = %err, "Request failed");
        }
        _ => {
            warn!(
                correlation_id = %correlation_id,
                code = %err.code(),
                error = %err,
                "Request rejected"
            );
        }
    }
    err.into()
}

fn json_body<T>(
    correlation_id: Uuid,
    payload: Result<Json<T>, JsonRejection>,
) -> Result<T, ApiErrorResponse> {
    let rejection = match payload {
        Ok(Json(body)) => return Ok(body),
        Err(rejection) => rejection,
    };

    let error = match rejection {
        JsonRejection::JsonDataError(err) => {
            let body_text = err.body_text();
            warn!(correlation_id = %correlation_id, error = %body_text, "JSON data error");
            if body_text.contains("missing field") {
                ApiError::validation_error(body_text)
            } else {
                ApiError::malformed_json(body_text)
            }
        }
        JsonRejection::JsonSyntaxError(err) => {
            warn!(correlation_id = %correlation_id, error = %err, "JSON syntax error");
            ApiError::malformed_json(format!("Invalid JSON syntax: {}", err))
        }
        JsonRejection::MissingJsonContentType(_) => {
            ApiError::new("MISSING_CONTENT_TYPE", "Content-Type must be application/json")
        }
        _ => ApiError::malformed_json("Failed to parse request body"),
    };
    Err(ApiErrorResponse::bad_request(error))
}

fn query_params<T>(
    correlation_id: Uuid,
    query: Result<Query<T>, QueryRejection>,
) -> Result<T, ApiErrorResponse> {
    query.map(|Query(params)| params).map_err(|rejection| {
        warn!(correlation_id = %correlation_id, error = %rejection.body_text(), "Invalid query string");
        ApiErrorResponse::bad_request(ApiError::validation_error(rejection.body_text()))
    })
}

fn path_params<T>(
    correlation_id: Uuid,
    path: Result<Path<T>, PathRejection>,
) -> Result<T, ApiErrorResponse> {
    path.map(|Path(params)| params).map_err(|rejection| {
        warn!(correlation_id = %correlation_id, error = %rejection.body_text(), "Invalid path");
        ApiErrorResponse::bad_request(ApiError::validation_error(rejection.body_text()))
    })
}

fn month_param(correlation_id: Uuid, raw: &str) -> Result<NaiveDate, ApiErrorResponse> {
    parse_month(raw).ok_or_else(|| {
        warn!(correlation_id = %correlation_id, month = %raw, "Invalid month");
        ApiErrorResponse::bad_request(ApiError::new(
            "INVALID_MONTH",
            format!("'{}' is not a YYYY-MM month", raw),
        ))
    })
}

fn actor(state: &AppState, headers: &HeaderMap) -> String {
    headers
        .get(USER_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(state.default_user())
        .to_string()
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    (status, Json(body)).into_response()
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ---------------------------------------------------------------------------
// Pricing
// ---------------------------------------------------------------------------

/// Handler for GET /pieces/{piece}/breakdown.
///
/// With `publish=true` the computed total is published at `as_of` first, so
/// the returned breakdown already shows it as the published price.
async fn breakdown_handler(
    State(state): State<AppState>,
    Path(piece_id): Path<String>,
    headers: HeaderMap,
    query: Result<Query<BreakdownQuery>, QueryRejection>,
) -> HandlerResult {
    let correlation_id = Uuid::new_v4();
    let query = query_params(correlation_id, query)?;
    let as_of = query.as_of.unwrap_or_else(today);
    let actor = actor(&state, &headers);
    info!(
        correlation_id = %correlation_id,
        piece_id = %piece_id,
        zone_id = %query.zone_id,
        as_of = %as_of,
        publish = query.publish,
        "Processing breakdown request"
    );

    let response = run(&state, move |engine| {
        let published = if query.publish {
            Some(engine.publish(
                &piece_id,
                &query.zone_id,
                as_of,
                &PriceLine::Computed {
                    adjustment: Decimal::ZERO,
                },
                &actor,
            )?)
        } else {
            None
        };
        let breakdown = engine.breakdown(&piece_id, &query.zone_id, as_of)?;
        let comparison = if query.compare {
            Some(engine.compare(&piece_id, &query.zone_id, as_of)?)
        } else {
            None
        };
        Ok(BreakdownResponse {
            breakdown,
            comparison,
            published,
        })
    })
    .await
    .map_err(|e| engine_failure(correlation_id, e))?;

    info!(
        correlation_id = %correlation_id,
        total = %response.breakdown.total,
        warnings = response.breakdown.warnings.len(),
        "Breakdown completed"
    );
    Ok(json_response(StatusCode::OK, response))
}

async fn publish_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<PublishRequest>, JsonRejection>,
) -> HandlerResult {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, "Processing publish request");
    let request = json_body(correlation_id, payload)?;
    let actor = actor(&state, &headers);

    let published = run(&state, move |engine| {
        engine.publish(
            &request.piece_id,
            &request.zone_id,
            request.effective_date,
            &request.price_line(),
            &actor,
        )
    })
    .await
    .map_err(|e| engine_failure(correlation_id, e))?;

    Ok(json_response(StatusCode::CREATED, published))
}

async fn history_handler(
    State(state): State<AppState>,
    Path(piece_id): Path<String>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> HandlerResult {
    let correlation_id = Uuid::new_v4();
    let query = query_params(correlation_id, query)?;
    info!(correlation_id = %correlation_id, piece_id = %piece_id, "Processing history request");

    let history = run(&state, move |engine| {
        engine.get_history(&piece_id, query.zone_id.as_deref(), query.limit)
    })
    .await
    .map_err(|e| engine_failure(correlation_id, e))?;

    Ok(json_response(StatusCode::OK, history))
}

async fn compare_handler(
    State(state): State<AppState>,
    Path(piece_id): Path<String>,
    query: Result<Query<CompareQuery>, QueryRejection>,
) -> HandlerResult {
    let correlation_id = Uuid::new_v4();
    let query = query_params(correlation_id, query)?;
    let date = query.date.unwrap_or_else(today);

    let comparison = run(&state, move |engine| {
        engine.compare(&piece_id, &query.zone_id, date)
    })
    .await
    .map_err(|e| engine_failure(correlation_id, e))?;

    Ok(json_response(StatusCode::OK, comparison))
}

// ---------------------------------------------------------------------------
// Formula
// ---------------------------------------------------------------------------

async fn get_formula_handler(
    State(state): State<AppState>,
    Path(piece_id): Path<String>,
) -> HandlerResult {
    let correlation_id = Uuid::new_v4();
    let formula = run(&state, move |engine| engine.get_formula(&piece_id))
        .await
        .map_err(|e| engine_failure(correlation_id, e))?;
    Ok(json_response(StatusCode::OK, formula))
}

async fn replace_formula_handler(
    State(state): State<AppState>,
    Path(piece_id): Path<String>,
    headers: HeaderMap,
    payload: Result<Json<FormulaRequest>, JsonRejection>,
) -> HandlerResult {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, piece_id = %piece_id, "Processing formula replace");
    let request = json_body(correlation_id, payload)?;
    let actor = actor(&state, &headers);

    let formula = run(&state, move |engine| {
        engine.update_formula(&piece_id, &request.lines, &actor)
    })
    .await
    .map_err(|e| engine_failure(correlation_id, e))?;

    Ok(json_response(StatusCode::OK, formula))
}

async fn add_line_handler(
    State(state): State<AppState>,
    Path(piece_id): Path<String>,
    headers: HeaderMap,
    payload: Result<Json<BomLineInput>, JsonRejection>,
) -> HandlerResult {
    let correlation_id = Uuid::new_v4();
    let line = json_body(correlation_id, payload)?;
    let actor = actor(&state, &headers);

    let formula = run(&state, move |engine| engine.add_line(&piece_id, &line, &actor))
        .await
        .map_err(|e| engine_failure(correlation_id, e))?;

    Ok(json_response(StatusCode::CREATED, formula))
}

async fn remove_line_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    path: Result<Path<(String, i64)>, PathRejection>,
) -> HandlerResult {
    let correlation_id = Uuid::new_v4();
    let (piece_id, line_id) = path_params(correlation_id, path)?;
    let actor = actor(&state, &headers);

    let formula = run(&state, move |engine| {
        engine.remove_line(&piece_id, line_id, &actor)
    })
    .await
    .map_err(|e| engine_failure(correlation_id, e))?;

    Ok(json_response(StatusCode::OK, formula))
}

async fn validate_formula_handler(
    State(state): State<AppState>,
    Path(piece_id): Path<String>,
    payload: Result<Json<FormulaRequest>, JsonRejection>,
) -> HandlerResult {
    let correlation_id = Uuid::new_v4();
    let request = json_body(correlation_id, payload)?;

    let validation = run(&state, move |engine| {
        engine.validate_formula(&piece_id, &request.lines)
    })
    .await
    .map_err(|e| engine_failure(correlation_id, e))?;

    Ok(json_response(StatusCode::OK, validation))
}

async fn copy_formula_handler(
    State(state): State<AppState>,
    Path(target_id): Path<String>,
    headers: HeaderMap,
    payload: Result<Json<CopyFormulaRequest>, JsonRejection>,
) -> HandlerResult {
    let correlation_id = Uuid::new_v4();
    let request = json_body(correlation_id, payload)?;
    let actor = actor(&state, &headers);
    info!(
        correlation_id = %correlation_id,
        source = %request.source_piece_id,
        target = %target_id,
        "Processing formula copy"
    );

    let formula = run(&state, move |engine| {
        engine.copy_formula(&request.source_piece_id, &target_id, request.overwrite, &actor)
    })
    .await
    .map_err(|e| engine_failure(correlation_id, e))?;

    Ok(json_response(StatusCode::OK, formula))
}

// ---------------------------------------------------------------------------
// Periods
// ---------------------------------------------------------------------------

async fn get_process_parameters_handler(
    State(state): State<AppState>,
    Path((zone_id, month)): Path<(String, String)>,
) -> HandlerResult {
    let correlation_id = Uuid::new_v4();
    let month = month_param(correlation_id, &month)?;

    let resolved = run(&state, move |engine| {
        engine.get_process_parameters(&zone_id, month)
    })
    .await
    .map_err(|e| engine_failure(correlation_id, e))?;

    Ok(json_response(StatusCode::OK, resolved))
}

async fn set_process_parameters_handler(
    State(state): State<AppState>,
    Path((zone_id, month)): Path<(String, String)>,
    headers: HeaderMap,
    payload: Result<Json<ProcessRates>, JsonRejection>,
) -> HandlerResult {
    let correlation_id = Uuid::new_v4();
    let month = month_param(correlation_id, &month)?;
    let rates = json_body(correlation_id, payload)?;
    let actor = actor(&state, &headers);
    info!(correlation_id = %correlation_id, zone_id = %zone_id, month = %month, "Processing process parameter update");

    let stored = run(&state, move |engine| {
        engine.set_process_parameters(&zone_id, month, &rates, &actor)
    })
    .await
    .map_err(|e| engine_failure(correlation_id, e))?;

    Ok(json_response(StatusCode::OK, stored))
}

async fn close_month_handler(
    State(state): State<AppState>,
    Path((zone_id, month)): Path<(String, String)>,
    headers: HeaderMap,
) -> HandlerResult {
    let correlation_id = Uuid::new_v4();
    let month = month_param(correlation_id, &month)?;
    let actor = actor(&state, &headers);
    info!(correlation_id = %correlation_id, zone_id = %zone_id, month = %month, "Processing month close");

    let closing = run(&state, move |engine| engine.close_month(&zone_id, month, &actor))
        .await
        .map_err(|e| engine_failure(correlation_id, e))?;

    Ok(json_response(StatusCode::CREATED, closing))
}

async fn month_status_handler(
    State(state): State<AppState>,
    Path((zone_id, month)): Path<(String, String)>,
) -> HandlerResult {
    let correlation_id = Uuid::new_v4();
    let month = month_param(correlation_id, &month)?;

    let response = run(&state, move |engine| {
        let closed = engine.is_month_closed(&zone_id, month)?;
        Ok(MonthStatusResponse {
            zone_id,
            month: month_start(month),
            closed,
        })
    })
    .await
    .map_err(|e| engine_failure(correlation_id, e))?;
    Ok(json_response(StatusCode::OK, response))
}

async fn closed_months_handler(
    State(state): State<AppState>,
    Path(zone_id): Path<String>,
) -> HandlerResult {
    let correlation_id = Uuid::new_v4();
    let closings = run(&state, move |engine| engine.list_closed_months(&zone_id))
        .await
        .map_err(|e| engine_failure(correlation_id, e))?;
    Ok(json_response(StatusCode::OK, closings))
}

// ---------------------------------------------------------------------------
// Material prices
// ---------------------------------------------------------------------------

async fn import_material_prices_handler(
    State(state): State<AppState>,
    Path(zone_id): Path<String>,
    headers: HeaderMap,
    payload: Result<Json<ImportRequest>, JsonRejection>,
) -> HandlerResult {
    let correlation_id = Uuid::new_v4();
    let request = json_body(correlation_id, payload)?;
    let actor = actor(&state, &headers);
    info!(
        correlation_id = %correlation_id,
        zone_id = %zone_id,
        month = %request.month,
        bytes = request.csv.len(),
        "Processing material price import"
    );

    let summary = run(&state, move |engine| {
        engine.import_material_prices(&zone_id, request.month, &request.csv, &actor)
    })
    .await
    .map_err(|e| engine_failure(correlation_id, e))?;

    info!(
        correlation_id = %correlation_id,
        applied = summary.applied,
        failed = summary.failed,
        "Material price import completed"
    );
    Ok(json_response(StatusCode::OK, summary))
}

async fn export_material_prices_handler(
    State(state): State<AppState>,
    Path(zone_id): Path<String>,
    query: Result<Query<ExportQuery>, QueryRejection>,
) -> HandlerResult {
    let correlation_id = Uuid::new_v4();
    let query = query_params(correlation_id, query)?;
    let as_of = query.as_of.unwrap_or_else(today);

    let csv = run(&state, move |engine| {
        engine.export_material_prices(&zone_id, as_of)
    })
    .await
    .map_err(|e| engine_failure(correlation_id, e))?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/csv; charset=utf-8")],
        csv,
    )
        .into_response())
}

async fn list_material_prices_handler(
    State(state): State<AppState>,
    query: Result<Query<MaterialPriceQuery>, QueryRejection>,
) -> HandlerResult {
    let correlation_id = Uuid::new_v4();
    let query = query_params(correlation_id, query)?;

    let listings = run(&state, move |engine| engine.list_material_prices(&query))
        .await
        .map_err(|e| engine_failure(correlation_id, e))?;

    Ok(json_response(StatusCode::OK, listings))
}

async fn set_material_price_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<NewMaterialPrice>, JsonRejection>,
) -> HandlerResult {
    let correlation_id = Uuid::new_v4();
    let new = json_body(correlation_id, payload)?;
    let actor = actor(&state, &headers);

    let stored = run(&state, move |engine| engine.set_material_price(&new, &actor))
        .await
        .map_err(|e| engine_failure(correlation_id, e))?;

    Ok(json_response(StatusCode::CREATED, stored))
}

async fn deactivate_material_price_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    path: Result<Path<i64>, PathRejection>,
) -> HandlerResult {
    let correlation_id = Uuid::new_v4();
    let id = path_params(correlation_id, path)?;
    let actor = actor(&state, &headers);

    let price = run(&state, move |engine| {
        engine.deactivate_material_price(id, &actor)
    })
    .await
    .map_err(|e| engine_failure(correlation_id, e))?;

    Ok(json_response(StatusCode::OK, price))
}
