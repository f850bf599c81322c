use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{service::ServiceError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct RequestOtpBody {
    pub user: String,
}

#[derive(Debug, Serialize)]
pub struct RequestOtpResponse {
    pub message: &'static str,
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyOtpBody {
    pub user: String,
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyOtpResponse {
    pub message: &'static str,
}

pub async fn request_otp(
    State(state): State<AppState>,
    body: Result<Json<RequestOtpBody>, JsonRejection>,
) -> Result<Json<RequestOtpResponse>, ServiceError> {
    let Json(body) = body.map_err(|rejection| {
        tracing::debug!(error = %rejection, "rejected OTP request body");
        ServiceError::InvalidRequest
    })?;
    let code = state.otp.request(&body.user).await?;
    Ok(Json(RequestOtpResponse {
        message: "OTP generated successfully",
        code,
    }))
}

pub async fn verify_otp(
    State(state): State<AppState>,
    body: Result<Json<VerifyOtpBody>, JsonRejection>,
) -> Result<Json<VerifyOtpResponse>, ServiceError> {
    let Json(body) = body.map_err(|rejection| {
        tracing::debug!(error = %rejection, "rejected OTP verification body");
        ServiceError::InvalidRequest
    })?;
    state.otp.verify(&body.user, &body.code).await?;
    Ok(Json(VerifyOtpResponse {
        message: "OTP Verified Successfully!",
    }))
}
