use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::error::Result;
use crate::models::TradeFilters;
use crate::routes::extract::ApiQuery;
use crate::routes::AppState;
use crate::stats::{self, Overview, Period, PeriodBucket, SortOrder};

#[derive(Debug, Default, Deserialize)]
pub struct OrderParams {
    #[serde(default)]
    pub order: SortOrder,
}

/// `GET /api/stats/overview`
pub async fn overview_handler(
    State(state): State<AppState>,
    ApiQuery(filters): ApiQuery<TradeFilters>,
) -> Result<Json<Overview>> {
    let conn = state.db.lock()?;
    Ok(Json(stats::overview(&conn, &filters, state.default_budget())?))
}

fn buckets(state: &AppState, filters: &TradeFilters, period: Period, order: SortOrder) -> Result<Json<Vec<PeriodBucket>>> {
    let conn = state.db.lock()?;
    Ok(Json(stats::period_buckets(&conn, filters, period, order)?))
}

/// `GET /api/stats/daily`
pub async fn daily_handler(
    State(state): State<AppState>,
    ApiQuery(filters): ApiQuery<TradeFilters>,
    ApiQuery(params): ApiQuery<OrderParams>,
) -> Result<Json<Vec<PeriodBucket>>> {
    buckets(&state, &filters, Period::Day, params.order)
}

/// `GET /api/stats/weekly`
pub async fn weekly_handler(
    State(state): State<AppState>,
    ApiQuery(filters): ApiQuery<TradeFilters>,
    ApiQuery(params): ApiQuery<OrderParams>,
) -> Result<Json<Vec<PeriodBucket>>> {
    buckets(&state, &filters, Period::Week, params.order)
}

/// `GET /api/stats/monthly`
pub async fn monthly_handler(
    State(state): State<AppState>,
    ApiQuery(filters): ApiQuery<TradeFilters>,
    ApiQuery(params): ApiQuery<OrderParams>,
) -> Result<Json<Vec<PeriodBucket>>> {
    buckets(&state, &filters, Period::Month, params.order)
}
