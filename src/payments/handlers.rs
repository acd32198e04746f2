use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};

use crate::error::ApiError;
use crate::state::AppState;
use crate::users::dto::Pagination;

use super::dto::{PaymentListResponse, PaymentQuery, PaymentResponse, PaymentUpdateResponse};
use super::repo::PaymentStatus;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/payments", get(list_payments))
        .route("/payments/:id", get(get_payment).patch(update_payment))
}

#[instrument(skip(state))]
async fn list_payments(
    State(state): State<AppState>,
    Query(query): Query<PaymentQuery>,
) -> Json<PaymentListResponse> {
    let (payments, total, statistics) = state.payments.query(&query);
    let pagination = Pagination::new(
        query.page.max(1) as i64,
        query.limit as i64,
        total as i64,
    );
    Json(PaymentListResponse {
        payments,
        pagination,
        statistics,
        filters: query,
    })
}

fn parse_id(raw: &str) -> Result<u32, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::Validation("Invalid payment ID".into()))
}

#[instrument(skip(state))]
async fn get_payment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PaymentResponse>, ApiError> {
    let id = parse_id(&id)?;
    let payment = state
        .payments
        .get(id)
        .ok_or_else(|| ApiError::NotFound("Payment not found".into()))?;
    Ok(Json(PaymentResponse { payment }))
}

#[instrument(skip(state, body))]
async fn update_payment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<PaymentUpdateResponse>, ApiError> {
    let id = parse_id(&id)?;

    let status = body
        .get("status")
        .cloned()
        .ok_or_else(|| ApiError::Validation("status is required".into()))?;
    let status: PaymentStatus = serde_json::from_value(status).map_err(|_| {
        ApiError::Validation(
            "Invalid status. Must be one of: pending, completed, failed, refunded".into(),
        )
    })?;

    let payment = state
        .payments
        .set_status(id, status)
        .ok_or_else(|| ApiError::NotFound("Payment not found".into()))?;

    info!(payment_id = id, status = ?status, "payment status updated");
    Ok(Json(PaymentUpdateResponse {
        message: "Payment updated successfully",
        payment,
    }))
}
