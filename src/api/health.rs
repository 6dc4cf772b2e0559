use axum::{Json, extract::State, http::StatusCode};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{state::AppState, storage::ContentRepository};

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub database: &'static str,
}

/// 存活检查
///
/// 存储可用时返回 200，否则返回 503。
pub async fn health<R: ContentRepository>(
    State(state): State<AppState<R>>,
) -> (StatusCode, Json<Health>) {
    let timestamp = Utc::now();

    match state.repo().ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(Health {
                status: "ok",
                timestamp,
                database: "connected",
            }),
        ),
        Err(e) => {
            tracing::warn!(%e, "storage ping failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(Health {
                    status: "error",
                    timestamp,
                    database: "disconnected",
                }),
            )
        }
    }
}
