use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::error::Result;
use crate::money::{self, calculate_stake_suggestion, MoneyManagementConfig, StakeSuggestion, StatsInput, SuggestionReport, SuggestionRequest};
use crate::routes::extract::ApiJson;
use crate::routes::AppState;

#[derive(Debug, Deserialize)]
pub struct StakeRequest {
    #[serde(default)]
    pub config: MoneyManagementConfig,
    pub stats: StatsInput,
}

/// `POST /api/money-management/suggestions`. Inputs come from the stored ledger.
pub async fn suggestions_handler(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SuggestionRequest>,
) -> Result<Json<SuggestionReport>> {
    let conn = state.db.lock()?;
    let report = money::suggestions_for_ledger(
        &conn,
        &request,
        &state.config.money_management,
        state.default_budget(),
    )?;
    Ok(Json(report))
}

/// `POST /api/money-management/stake`. Sizes one stake from caller-supplied inputs.
pub async fn stake_handler(ApiJson(request): ApiJson<StakeRequest>) -> Json<StakeSuggestion> {
    Json(calculate_stake_suggestion(&request.config, &request.stats))
}
