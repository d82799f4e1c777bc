use serde::{Deserialize, Serialize};

/// Request body for user registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request body for token refresh.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Token pair returned by login and refresh.
#[derive(Debug, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Public part of the user echoed by register and status. The password
/// hash never appears here.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub username: String,
    pub email: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_user_never_carries_a_password() {
        let response = PublicUser {
            username: "foo".into(),
            email: "foo@email.com".into(),
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("foo@email.com"));
        assert!(!json.contains("password"));
    }

    #[test]
    fn token_pair_serializes_both_fields() {
        let pair = TokenPair {
            access_token: "a.b.c".into(),
            refresh_token: "d.e.f".into(),
        };
        let json = serde_json::to_string(&pair).unwrap();
        assert!(json.contains("access_token"));
        assert!(json.contains("refresh_token"));
    }
}
