use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 PHC string, not exposed in JSON
    pub active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_date: OffsetDateTime,
    #[serde(skip_serializing)]
    pub refresh_token_id: Option<Uuid>, // jti of the one valid refresh token
}

impl User {
    pub async fn find_by_email(db: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, active, created_date, refresh_token_id
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, active, created_date, refresh_token_id
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await
    }

    pub async fn list_all(db: &PgPool) -> Result<Vec<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, active, created_date, refresh_token_id
            FROM users
            ORDER BY created_date
            "#,
        )
        .fetch_all(db)
        .await
    }

    /// Inserts a new user. Duplicate emails fail with a unique violation
    /// from the users_email_key index; callers surface that as Conflict.
    pub async fn create(
        db: &PgPool,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, username, email, password_hash, active, created_date, refresh_token_id
            "#,
        )
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .fetch_one(db)
        .await
    }

    /// Updates username and email only. The password hash is not reachable
    /// through this statement.
    pub async fn update_profile(
        db: &PgPool,
        id: Uuid,
        username: &str,
        email: &str,
    ) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET username = $2, email = $3
            WHERE id = $1
            RETURNING id, username, email, password_hash, active, created_date, refresh_token_id
            "#,
        )
        .bind(id)
        .bind(username)
        .bind(email)
        .fetch_one(db)
        .await
    }

    pub async fn delete(db: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }

    /// Rotates the stored refresh-token id. Any previously issued refresh
    /// token stops matching and is rejected on its next use.
    pub async fn set_refresh_token_id(
        db: &PgPool,
        id: Uuid,
        jti: Uuid,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET refresh_token_id = $2 WHERE id = $1")
            .bind(id)
            .bind(jti)
            .execute(db)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialized_user_hides_credentials() {
        let user = User {
            id: Uuid::new_v4(),
            username: "foo".into(),
            email: "foo@email.com".into(),
            password_hash: "$argon2id$v=19$m=8,t=1,p=1$secret".into(),
            active: true,
            created_date: OffsetDateTime::UNIX_EPOCH,
            refresh_token_id: Some(Uuid::new_v4()),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(json.contains("foo@email.com"));
        assert!(!json.contains("password_hash"));
        assert!(!json.contains("argon2id"));
        assert!(!json.contains("refresh_token_id"));
    }
}
