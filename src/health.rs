use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;
use time::OffsetDateTime;
use tracing::warn;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

#[derive(Debug, Serialize)]
struct Services {
    database: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthReport {
    status: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    timestamp: OffsetDateTime,
    uptime_seconds: u64,
    environment: String,
    services: Services,
}

async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthReport>) {
    let database_up = match sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(&state.db)
        .await
    {
        Ok(_) => true,
        Err(e) => {
            warn!(error = %e, "health probe: database unreachable");
            false
        }
    };

    let report = HealthReport {
        status: if database_up { "healthy" } else { "degraded" },
        timestamp: OffsetDateTime::now_utc(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        environment: state.config.environment.clone(),
        services: Services {
            database: if database_up { "connected" } else { "unreachable" },
        },
    };
    let code = if database_up {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(report))
}
