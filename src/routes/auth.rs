use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::auth::{self as accounts, AuthUser};
use crate::error::{AppError, Result};
use crate::models::{LoginInput, RegisterInput, SessionToken, User};
use crate::routes::extract::ApiJson;
use crate::routes::{Ack, AppState};

/// `POST /api/register`
pub async fn register_handler(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<RegisterInput>,
) -> Result<(StatusCode, Json<User>)> {
    if !state.config.auth.allow_registration {
        log::warn!("Registration attempt while registration is disabled");
        return Err(AppError::Unauthorized);
    }
    let conn = state.db.lock()?;
    let user = accounts::register(&conn, input)?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// `POST /api/login`
pub async fn login_handler(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<LoginInput>,
) -> Result<Json<SessionToken>> {
    let conn = state.db.lock()?;
    let session = accounts::login(&conn, input, state.config.auth.session_ttl_hours)?;
    Ok(Json(session))
}

/// `POST /api/logout`
pub async fn logout_handler(State(state): State<AppState>, auth: AuthUser) -> Result<Json<Ack>> {
    let conn = state.db.lock()?;
    accounts::logout(&conn, &auth.token)?;
    log::info!("User {} logged out", auth.user.id);
    Ok(Json(Ack::ok()))
}

#[cfg(test)]
mod tests {
    use crate::app_config::AppConfig;
    use crate::db::Database;
    use crate::routes::test_support::*;
    use crate::routes::AppState;
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn test_register_login_logout() {
        let state = test_state();
        let token = login(&state).await;

        let (status, _) = send(&state, "POST", "/api/logout", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);

        // the revoked token no longer works
        let (status, body) = send(&state, "POST", "/api/logout", Some(&token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Authentication required");
    }

    #[tokio::test]
    async fn test_wrong_password_is_unauthorized() {
        let state = test_state();
        login(&state).await;

        let body = json!({ "email": "trader@example.com", "password": "not the one" });
        let (status, _) = send(&state, "POST", "/api/login", None, Some(body)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_duplicate_registration_conflicts() {
        let state = test_state();
        login(&state).await;

        let body = json!({ "email": "TRADER@example.com", "password": "long enough" });
        let (status, _) = send(&state, "POST", "/api/register", None, Some(body)).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_registration_can_be_disabled() {
        let mut config = AppConfig::default();
        config.auth.allow_registration = false;
        let state = AppState::new(Database::open_in_memory().unwrap(), config);

        let body = json!({ "email": "trader@example.com", "password": "long enough" });
        let (status, _) = send(&state, "POST", "/api/register", None, Some(body)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
