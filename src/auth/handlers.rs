use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        dto::{LoginRequest, PublicUser, RefreshRequest, RegisterRequest, TokenPair},
        extractors::AuthUser,
        jwt::JwtKeys,
        password::{hash_password, verify_password},
    },
    error::{ApiError, ValidatedJson},
    state::AppState,
    users::repo::User,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/status", get(status))
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Trims and lowercases, rejecting anything that is not email-shaped.
pub(crate) fn normalized_email(raw: &str) -> Result<String, ApiError> {
    let email = raw.trim().to_lowercase();
    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(ApiError::Validation);
    }
    Ok(email)
}

/// Signs a fresh access+refresh pair and records the refresh token's jti
/// as the user's one valid refresh token, superseding any earlier one.
async fn issue_pair(state: &AppState, user_id: Uuid) -> Result<TokenPair, ApiError> {
    let keys = JwtKeys::from_ref(state);
    let (access_token, _) = keys.sign_access(user_id)?;
    let (refresh_token, refresh_claims) = keys.sign_refresh(user_id)?;
    User::set_refresh_token_id(&state.db, user_id, refresh_claims.jti).await?;
    Ok(TokenPair {
        access_token,
        refresh_token,
    })
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, Json<PublicUser>), ApiError> {
    let username = payload.username.trim();
    if username.is_empty() || payload.password.is_empty() {
        warn!("missing registration fields");
        return Err(ApiError::Validation);
    }
    let email = normalized_email(&payload.email)?;

    let hash = hash_password(&payload.password, &state.config.hash)?;
    // A duplicate email violates the unique index and surfaces as Conflict.
    let user = User::create(&state.db, username, &email, &hash).await?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(PublicUser {
            username: user.username,
            email: user.email,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> Result<Json<TokenPair>, ApiError> {
    let email = normalized_email(&payload.email)?;

    // Unknown email and wrong password answer identically, so the endpoint
    // does not reveal which addresses are registered.
    let not_found = || ApiError::NotFound("User does not exist.".into());

    let user = User::find_by_email(&state.db, &email).await?.ok_or_else(|| {
        warn!(email = %email, "login unknown email");
        not_found()
    })?;

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(not_found());
    }

    let pair = issue_pair(&state, user.id).await?;
    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(pair))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<RefreshRequest>,
) -> Result<Json<TokenPair>, ApiError> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys.verify_refresh(&payload.refresh_token)?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or(ApiError::InvalidToken)?;

    // Only the most recently issued refresh token is honored; anything
    // older was superseded by a later login or refresh.
    if user.refresh_token_id != Some(claims.jti) {
        warn!(user_id = %user.id, "superseded refresh token");
        return Err(ApiError::InvalidToken);
    }

    let pair = issue_pair(&state, user.id).await?;
    info!(user_id = %user.id, "token pair refreshed");
    Ok(Json(pair))
}

#[instrument(skip(state))]
pub async fn status(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<PublicUser>, ApiError> {
    let user = User::find_by_id(&state.db, user_id).await?.ok_or_else(|| {
        warn!(user_id = %user_id, "token subject no longer exists");
        ApiError::NotFound("User does not exist.".into())
    })?;

    Ok(Json(PublicUser {
        username: user.username,
        email: user.email,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plausible_emails() {
        assert!(is_valid_email("foo@email.com"));
        assert!(is_valid_email("a.b+c@sub.domain.org"));
    }

    #[test]
    fn rejects_malformed_emails() {
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("foo"));
        assert!(!is_valid_email("foo@"));
        assert!(!is_valid_email("foo@bar"));
        assert!(!is_valid_email("foo bar@email.com"));
    }

    #[test]
    fn normalization_trims_and_lowercases() {
        let email = normalized_email("  Foo@Email.COM ").expect("valid");
        assert_eq!(email, "foo@email.com");
    }

    #[test]
    fn normalization_rejects_garbage() {
        let err = normalized_email("not-an-email").unwrap_err();
        assert!(matches!(err, ApiError::Validation));
    }
}
