use crate::error::MarketError;
use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Market(#[from] MarketError),
    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type ApiResult<T> = Result<T, ApiError>;

// Undecodable requests are the caller's fault and use the same error body.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        MarketError::Validation(rejection.body_text()).into()
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        MarketError::Validation(rejection.body_text()).into()
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        MarketError::Validation(rejection.body_text()).into()
    }
}

pub fn status_for(err: &MarketError) -> StatusCode {
    match err {
        MarketError::NotFound(_) => StatusCode::NOT_FOUND,
        MarketError::PermissionDenied(_) => StatusCode::FORBIDDEN,
        MarketError::Unauthorized => StatusCode::UNAUTHORIZED,
        MarketError::Validation(_) => StatusCode::BAD_REQUEST,
        MarketError::Conflict(_)
        | MarketError::SelfSwapForbidden
        | MarketError::ItemNotAvailable(_)
        | MarketError::InvalidOfferedItem(_)
        | MarketError::InsufficientPoints { .. }
        | MarketError::InvalidState(_)
        | MarketError::PreconditionChanged(_)
        | MarketError::ItemLocked(_) => StatusCode::CONFLICT,
        MarketError::Storage(_) | MarketError::Encoding(_) | MarketError::Crypto(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match &self {
            ApiError::Market(err) if err.is_infrastructure() => {
                tracing::error!(error = %err, kind = err.kind(), "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    err.kind(),
                    "internal server error".to_string(),
                )
            }
            ApiError::Market(err) => {
                if matches!(err, MarketError::PermissionDenied(_)) {
                    tracing::warn!(error = %err, "permission denied");
                }
                (status_for(err), err.kind(), err.to_string())
            }
            ApiError::Task(err) => {
                tracing::error!(error = %err, "blocking task failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal",
                    "internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "success": false,
            "error": kind,
            "message": message,
        }));

        (status, body).into_response()
    }
}
