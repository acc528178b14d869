use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::services::{directory::Directory, redemption::RedemptionService};

pub mod coupons;
pub mod health;
pub mod users;

#[derive(Clone)]
pub struct AppState {
    pub directory: Arc<dyn Directory>,
    pub redemption: Arc<RedemptionService>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::healthcheck))
        .route("/api/users", post(users::create_user).get(users::list_users))
        .route(
            "/api/coupons",
            post(coupons::create_coupon).get(coupons::list_coupons),
        )
        .route("/api/coupons/apply", post(coupons::apply_coupon))
        .with_state(state)
}
