use axum::{
    async_trait,
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::auth::jwt::TokenError;

/// Request failure taxonomy. Every variant is surfaced to the caller as
/// JSON `{"message": ...}` with the mapped status code.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Input payload validation failed")]
    Validation,
    #[error("Sorry. That email already exists.")]
    EmailTaken,
    #[error("{0}")]
    NotFound(String),
    #[error("Invalid token. Please log in again.")]
    InvalidToken,
    #[error("Signature expired. Please log in again.")]
    ExpiredToken,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation | ApiError::EmailTaken => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidToken | ApiError::ExpiredToken => StatusCode::UNAUTHORIZED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            // The cause is logged, never leaked to the client.
            ApiError::Internal(e) => {
                error!(error = %e, "request failed");
                "Something went wrong.".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(json!({ "message": message }))).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        // The unique index on users.email is the authority on duplicates;
        // a violated insert or update surfaces as the conflict message.
        if let sqlx::Error::Database(db) = &e {
            if db.is_unique_violation() {
                return ApiError::EmailTaken;
            }
        }
        ApiError::Internal(e.into())
    }
}

impl From<TokenError> for ApiError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Expired => ApiError::ExpiredToken,
            TokenError::Invalid => ApiError::InvalidToken,
        }
    }
}

/// `Json<T>` that rejects malformed or undeserializable bodies with the
/// fixed validation message instead of axum's default 422.
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: serde::de::DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await.map_err(|e| {
            warn!(error = %e, "request body rejected");
            ApiError::Validation
        })?;
        Ok(Self(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_message(err: ApiError) -> (StatusCode, String) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let value: serde_json::Value = serde_json::from_slice(&bytes).expect("json body");
        (status, value["message"].as_str().unwrap_or_default().into())
    }

    #[tokio::test]
    async fn validation_maps_to_400_with_fixed_message() {
        let (status, message) = body_message(ApiError::Validation).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(message, "Input payload validation failed");
    }

    #[tokio::test]
    async fn email_taken_maps_to_400() {
        let (status, message) = body_message(ApiError::EmailTaken).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(message, "Sorry. That email already exists.");
    }

    #[tokio::test]
    async fn not_found_keeps_contextual_message() {
        let (status, message) = body_message(ApiError::NotFound("User does not exist.".into())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(message, "User does not exist.");
    }

    #[tokio::test]
    async fn token_errors_map_to_401_with_distinct_messages() {
        let (status, invalid) = body_message(ApiError::from(TokenError::Invalid)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, expired) = body_message(ApiError::from(TokenError::Expired)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(invalid, "Invalid token. Please log in again.");
        assert_eq!(expired, "Signature expired. Please log in again.");
        assert_ne!(invalid, expired);
    }

    #[tokio::test]
    async fn internal_never_leaks_the_cause() {
        let (status, message) = body_message(anyhow::anyhow!("connection reset").into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(message, "Something went wrong.");
    }
}
