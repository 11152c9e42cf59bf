use std::sync::Arc;

use axum::routing::{delete, get, post};
use axum::Router;
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};

use crate::app_config::AppConfig;
use crate::db::Database;

pub mod auth;
pub mod extract;
pub mod money;
pub mod settings;
pub mod stats;
pub mod trades;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(db: Database, config: AppConfig) -> Self {
        Self {
            db: Arc::new(db),
            config: Arc::new(config),
        }
    }

    pub fn default_budget(&self) -> f64 {
        self.config.ledger.default_initial_budget
    }
}

/// `{ "success": true, "message": ... }` acknowledgement for commands
/// without a richer payload.
#[derive(Debug, Serialize)]
pub struct Ack {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

impl Ack {
    pub fn ok() -> Self {
        Self {
            success: true,
            message: None,
            count: None,
        }
    }

    pub fn with_count(message: &str, count: usize) -> Self {
        Self {
            success: true,
            message: Some(message.to_string()),
            count: Some(count),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_router = Router::new()
        .route("/register", post(auth::register_handler))
        .route("/login", post(auth::login_handler))
        .route("/logout", post(auth::logout_handler))
        .route(
            "/settings",
            get(settings::get_settings_handler).put(settings::update_settings_handler),
        )
        .route(
            "/trades",
            get(trades::list_trades_handler).post(trades::create_trade_handler),
        )
        .route("/trades/create", post(trades::create_trade_handler))
        .route("/trades/import", post(trades::import_trades_handler))
        .route("/trades/export", get(trades::export_trades_handler))
        .route("/trades/renumber", post(trades::renumber_handler))
        .route("/trades/recalculate-equity", post(trades::recalculate_equity_handler))
        .route("/trades/delete-all", delete(trades::delete_all_handler))
        .route("/trades/delate-all", delete(trades::delete_all_handler))
        .route(
            "/trades/{id}",
            get(trades::get_trade_handler)
                .patch(trades::update_trade_handler)
                .delete(trades::delete_trade_handler),
        )
        .route("/stats/overview", get(stats::overview_handler))
        .route("/stats/daily", get(stats::daily_handler))
        .route("/stats/weekly", get(stats::weekly_handler))
        .route("/stats/monthly", get(stats::monthly_handler))
        .route("/money-management/suggestions", post(money::suggestions_handler))
        .route("/money-management/stake", post(money::stake_handler));

    Router::new()
        .route("/health", get(health_check_handler))
        .nest("/api", api_router)
        .layer(cors)
        .with_state(state)
}

async fn health_check_handler() -> &'static str {
    "OK"
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_health() {
        let state = test_state();
        let (status, body) = send(&state, "GET", "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "OK");
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let state = test_state();
        let (status, _) = send(&state, "GET", "/api/nothing", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
