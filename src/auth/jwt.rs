use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;
use time::OffsetDateTime;
use tracing::debug;
use uuid::Uuid;

use crate::auth::claims::{Claims, TokenKind};
use crate::state::AppState;

/// Verification failure. `Expired` is only reported for tokens whose
/// signature checked out; everything else (tampering, wrong secret,
/// malformed structure, wrong token kind) is `Invalid`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("signature expired")]
    Expired,
    #[error("invalid token")]
    Invalid,
}

/// Holds JWT signing and verification keys with both lifetimes, in
/// seconds. Lifetimes are signed so tests can mint expired tokens.
#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub access_ttl: i64,
    pub refresh_ttl: i64,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        let auth = &state.config.auth;
        Self {
            encoding: EncodingKey::from_secret(auth.secret_key.as_bytes()),
            decoding: DecodingKey::from_secret(auth.secret_key.as_bytes()),
            access_ttl: auth.access_token_exp,
            refresh_ttl: auth.refresh_token_exp,
        }
    }
}

impl JwtKeys {
    /// Signs a token for `user_id` at an explicit instant, returning the
    /// token alongside the claims embedded in it (callers persisting the
    /// refresh `jti` need them). Pure function of its inputs plus the
    /// secret; no store lookups, no side effects.
    pub fn sign_with_kind_at(
        &self,
        user_id: Uuid,
        kind: TokenKind,
        now: OffsetDateTime,
    ) -> anyhow::Result<(String, Claims)> {
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let claims = Claims {
            sub: user_id,
            iat: now.unix_timestamp(),
            exp: now.unix_timestamp() + ttl,
            kind,
            jti: Uuid::new_v4(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %user_id, kind = ?kind, "jwt signed");
        Ok((token, claims))
    }

    pub fn sign_access(&self, user_id: Uuid) -> anyhow::Result<(String, Claims)> {
        self.sign_with_kind_at(user_id, TokenKind::Access, OffsetDateTime::now_utc())
    }

    pub fn sign_refresh(&self, user_id: Uuid) -> anyhow::Result<(String, Claims)> {
        self.sign_with_kind_at(user_id, TokenKind::Refresh, OffsetDateTime::now_utc())
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::default();
        // Strict `exp > now`, and it lets a -1 lifetime expire immediately.
        validation.leeway = 0;
        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            }
        })?;
        debug!(user_id = %data.claims.sub, kind = ?data.claims.kind, "jwt verified");
        Ok(data.claims)
    }

    /// Verifies and additionally requires the expected token kind, so a
    /// refresh token cannot be used where an access token belongs (or the
    /// other way round).
    pub fn verify_kind(&self, token: &str, expected: TokenKind) -> Result<Claims, TokenError> {
        let claims = self.verify(token)?;
        if claims.kind != expected {
            return Err(TokenError::Invalid);
        }
        Ok(claims)
    }

    pub fn verify_access(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_kind(token, TokenKind::Access)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_kind(token, TokenKind::Refresh)
    }
}
