use axum::{routing::post, Router};

use crate::{
    handlers::{request_otp, verify_otp},
    state::AppState,
};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/otp/request", post(request_otp))
        .route("/otp/verify", post(verify_otp))
        .with_state(state)
}
