use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;
use uuid::Uuid;

use crate::{auth::jwt::JwtKeys, error::ApiError, state::AppState};

/// Extracts and validates a bearer access token, returning the user ID.
/// Refresh tokens are rejected here; only the access kind authorizes API
/// calls.
#[derive(Debug)]
pub struct AuthUser(pub Uuid);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| {
                warn!("missing Authorization header");
                ApiError::InvalidToken
            })?;

        // Expect "Bearer <token>"
        let token = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .ok_or_else(|| {
                warn!("invalid auth scheme");
                ApiError::InvalidToken
            })?;

        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify_access(token)?;
        Ok(AuthUser(claims.sub))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header::AUTHORIZATION, Request, StatusCode};

    fn parts_with_header(value: Option<String>) -> Parts {
        let mut builder = Request::builder().uri("/auth/status");
        if let Some(v) = value {
            builder = builder.header(AUTHORIZATION, v);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn accepts_a_valid_access_token() {
        let state = AppState::fake();
        let keys = JwtKeys::from_ref(&state);
        let user_id = Uuid::new_v4();
        let (token, _) = keys.sign_access(user_id).expect("sign access");

        let mut parts = parts_with_header(Some(format!("Bearer {token}")));
        let AuthUser(extracted) = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .expect("extract");
        assert_eq!(extracted, user_id);
    }

    #[tokio::test]
    async fn rejects_a_refresh_token() {
        let state = AppState::fake();
        let keys = JwtKeys::from_ref(&state);
        let (token, _) = keys.sign_refresh(Uuid::new_v4()).expect("sign refresh");

        let mut parts = parts_with_header(Some(format!("Bearer {token}")));
        let err = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        assert!(matches!(err, ApiError::InvalidToken));
    }

    #[tokio::test]
    async fn rejects_a_missing_header() {
        let state = AppState::fake();
        let mut parts = parts_with_header(None);
        let err = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidToken));
    }

    #[tokio::test]
    async fn rejects_a_non_bearer_scheme() {
        let state = AppState::fake();
        let mut parts = parts_with_header(Some("Basic Zm9vOmJhcg==".into()));
        let err = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidToken));
    }

    #[tokio::test]
    async fn expired_access_token_reports_expired() {
        let mut state = AppState::fake();
        {
            let config = std::sync::Arc::get_mut(&mut state.config).expect("sole owner");
            config.auth.access_token_exp = -1;
        }
        let keys = JwtKeys::from_ref(&state);
        let (token, _) = keys.sign_access(Uuid::new_v4()).expect("sign access");

        let mut parts = parts_with_header(Some(format!("Bearer {token}")));
        let err = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::ExpiredToken));
    }
}
