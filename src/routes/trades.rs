use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use crate::auth::AuthUser;
use crate::error::{AppError, Result};
use crate::import::{self, ImportSummary, RawRow};
use crate::ledger;
use crate::models::{CreateTradeInput, Trade, TradeFilters, UpdateTradeInput};
use crate::routes::extract::{ApiJson, ApiPath, ApiQuery};
use crate::routes::{Ack, AppState};
use crate::stats::{load_page, TradeQuery};

#[derive(Debug, Serialize)]
pub struct UpdatedTrade {
    pub success: bool,
    pub trade: Trade,
}

/// `GET /api/trades`. Ledger order, with the statistics filters and optional paging.
pub async fn list_trades_handler(
    State(state): State<AppState>,
    ApiQuery(filters): ApiQuery<TradeFilters>,
) -> Result<Json<Vec<Trade>>> {
    let query = TradeQuery::from_filters(&filters)?;
    let conn = state.db.lock()?;
    let trades = load_page(&conn, &query, filters.page, filters.limit)?;
    Ok(Json(trades))
}

/// `GET /api/trades/{id}`
pub async fn get_trade_handler(State(state): State<AppState>, ApiPath(id): ApiPath<i64>) -> Result<Json<Trade>> {
    let conn = state.db.lock()?;
    Ok(Json(ledger::get_trade(&conn, id)?))
}

/// `POST /api/trades` and `POST /api/trades/create`
pub async fn create_trade_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    ApiJson(input): ApiJson<CreateTradeInput>,
) -> Result<(StatusCode, Json<Trade>)> {
    let new_trade = input.into_new_trade()?;
    let mut conn = state.db.lock()?;
    let trade = ledger::append_trade(&mut conn, &new_trade, state.default_budget())?;
    log::info!("Created trade {} (pnl {:.2})", trade.id, trade.pnl);
    Ok((StatusCode::CREATED, Json(trade)))
}

/// `PATCH /api/trades/{id}`
pub async fn update_trade_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(input): ApiJson<UpdateTradeInput>,
) -> Result<Json<UpdatedTrade>> {
    let mut conn = state.db.lock()?;
    let trade = ledger::update_trade(&mut conn, id, input, state.default_budget())?;
    Ok(Json(UpdatedTrade { success: true, trade }))
}

/// `DELETE /api/trades/{id}`
pub async fn delete_trade_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Ack>> {
    let mut conn = state.db.lock()?;
    ledger::delete_trade(&mut conn, id, state.default_budget())?;
    Ok(Json(Ack::ok()))
}

/// `DELETE /api/trades/delete-all`, also mounted on the old `delate-all` path.
pub async fn delete_all_handler(State(state): State<AppState>, auth: AuthUser) -> Result<Json<Ack>> {
    let conn = state.db.lock()?;
    let removed = ledger::delete_all_trades(&conn)?;
    log::warn!("User {} deleted all {} trades", auth.user.id, removed);
    Ok(Json(Ack::with_count("Tutti i trade sono stati eliminati", removed)))
}

/// `POST /api/trades/renumber`
pub async fn renumber_handler(State(state): State<AppState>, _auth: AuthUser) -> Result<Json<Ack>> {
    let mut conn = state.db.lock()?;
    let count = ledger::renumber(&mut conn)?;
    Ok(Json(Ack::with_count("Rinumerazione completata", count)))
}

/// `POST /api/trades/recalculate-equity`
pub async fn recalculate_equity_handler(State(state): State<AppState>, _auth: AuthUser) -> Result<Json<Ack>> {
    let mut conn = state.db.lock()?;
    let count = ledger::recalculate_all(&mut conn, state.default_budget())?;
    Ok(Json(Ack::with_count("Equity ricalcolata", count)))
}

/// `POST /api/trades/import`. Takes the JSON array of header-keyed rows, or
/// the raw file when sent as `text/csv`. Bytes that are not UTF-8 (spreadsheet
/// exports in Windows-1252) become U+FFFD, which column detection tolerates.
pub async fn import_trades_handler(
    State(state): State<AppState>,
    auth: AuthUser,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ImportSummary>> {
    let body = String::from_utf8_lossy(&body);
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    let rows: Vec<RawRow> = if content_type.starts_with("text/csv") || content_type.starts_with("text/plain") {
        import::rows_from_csv(&body)?
    } else {
        serde_json::from_str(&body)
            .map_err(|e| AppError::Validation(format!("expected an array of rows: {}", e)))?
    };

    let mut conn = state.db.lock()?;
    let summary = import::import_rows(&mut conn, &rows, state.default_budget())?;
    log::info!(
        "User {} imported {} of {} rows ({} skipped)",
        auth.user.id,
        summary.imported,
        summary.total,
        summary.skipped
    );
    Ok(Json(summary))
}

/// `GET /api/trades/export`. Whole ledger as CSV, in ledger order.
pub async fn export_trades_handler(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let trades = {
        let conn = state.db.lock()?;
        ledger::list_trades(&conn)?
    };

    let mut writer = csv::Writer::from_writer(Vec::new());
    for trade in &trades {
        writer.serialize(trade)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::Internal(format!("CSV export failed: {}", e)))?;

    Ok((
        [
            (CONTENT_TYPE, "text/csv; charset=utf-8"),
            (CONTENT_DISPOSITION, "attachment; filename=\"trades.csv\""),
        ],
        bytes,
    ))
}
