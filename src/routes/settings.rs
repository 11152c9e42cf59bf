use axum::extract::State;
use axum::Json;

use crate::auth::AuthUser;
use crate::error::Result;
use crate::ledger;
use crate::models::{Settings, UpdateSettingsInput};
use crate::routes::extract::ApiJson;
use crate::routes::AppState;

/// `GET /api/settings`
pub async fn get_settings_handler(State(state): State<AppState>) -> Result<Json<Settings>> {
    let conn = state.db.lock()?;
    Ok(Json(ledger::get_settings(&conn, state.default_budget())?))
}

/// `PUT /api/settings`. A new budget rebuilds every stored equity value.
pub async fn update_settings_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    ApiJson(input): ApiJson<UpdateSettingsInput>,
) -> Result<Json<Settings>> {
    let mut conn = state.db.lock()?;
    let settings = ledger::update_settings(&mut conn, input, state.default_budget())?;
    Ok(Json(settings))
}
