use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::service::ServiceError;

impl ServiceError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "INVALID_REQUEST",
            Self::NotFound => "NOT_FOUND",
            Self::Expired => "EXPIRED",
            Self::InvalidCode => "INVALID_CODE",
            Self::Internal(_) => "INTERNAL",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidRequest => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Expired => StatusCode::GONE,
            Self::InvalidCode => StatusCode::UNAUTHORIZED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        if let Self::Internal(ref e) = self {
            tracing::error!(error = %e, kind = "INTERNAL", "internal error");
        }
        let body = serde_json::json!({
            "kind": self.kind(),
            "message": self.to_string(),
        });
        (self.status(), axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::{body::to_bytes, http::StatusCode, response::IntoResponse};

    use crate::service::ServiceError;

    async fn render(error: ServiceError) -> (StatusCode, serde_json::Value) {
        let resp = error.into_response();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn status_and_body_per_kind() {
        let cases = [
            (
                ServiceError::InvalidRequest,
                StatusCode::BAD_REQUEST,
                "INVALID_REQUEST",
                "invalid request",
            ),
            (
                ServiceError::NotFound,
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                "no OTP available for user",
            ),
            (
                ServiceError::Expired,
                StatusCode::GONE,
                "EXPIRED",
                "OTP expired",
            ),
            (
                ServiceError::InvalidCode,
                StatusCode::UNAUTHORIZED,
                "INVALID_CODE",
                "invalid OTP",
            ),
        ];
        for (error, status, kind, message) in cases {
            let (actual, json) = render(error).await;
            assert_eq!(actual, status);
            assert_eq!(json["kind"], kind);
            assert_eq!(json["message"], message);
        }
    }

    #[tokio::test]
    async fn internal_hides_cause() {
        let (status, json) = render(ServiceError::Internal(anyhow::anyhow!("disk on fire"))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["kind"], "INTERNAL");
        assert_eq!(json["message"], "internal error");
    }
}
