use axum::{extract::State, http::StatusCode, response::Json};
use chrono::Utc;

use crate::errors::Result;
use crate::handlers::AppState;
use crate::models::{
    ApplyCouponRequest, ApplyCouponResponse, CouponListResponse, CreateCouponRequest, Registration,
};

pub async fn create_coupon(
    State(state): State<AppState>,
    Json(request): Json<CreateCouponRequest>,
) -> Result<(StatusCode, Json<Registration>)> {
    let registration = state
        .directory
        .register_coupon(&request.name, &request.limits)
        .await?;

    let status = if registration.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(registration)))
}

pub async fn list_coupons(State(state): State<AppState>) -> Result<Json<CouponListResponse>> {
    let coupons = state.directory.list_coupons().await?;
    Ok(Json(CouponListResponse { coupons }))
}

pub async fn apply_coupon(
    State(state): State<AppState>,
    Json(request): Json<ApplyCouponRequest>,
) -> Result<Json<ApplyCouponResponse>> {
    // The request timestamp is read once at the boundary; every window
    // computation downstream is relative to this instant.
    let at = Utc::now();

    let outcome = state
        .redemption
        .apply(&request.coupon_name, &request.username, at)
        .await?;

    Ok(Json(ApplyCouponResponse {
        username: request.username,
        coupon_name: request.coupon_name,
        message: outcome.message().to_string(),
        redeemed: outcome.redeemed(),
    }))
}
