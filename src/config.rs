use serde::Deserialize;

/// Token signing secret and lifetimes, in seconds.
///
/// Lifetimes are signed so a test environment can configure `-1` and mint
/// tokens that are already expired.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub secret_key: String,
    pub access_token_exp: i64,
    pub refresh_token_exp: i64,
}

/// Argon2 work factor. Lower values keep test suites fast.
#[derive(Debug, Clone, Deserialize)]
pub struct HashConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub auth: AuthConfig,
    pub hash: HashConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let auth = AuthConfig {
            secret_key: std::env::var("SECRET_KEY")?,
            access_token_exp: env_or("ACCESS_TOKEN_EXPIRATION", 900),
            refresh_token_exp: env_or("REFRESH_TOKEN_EXPIRATION", 60 * 60 * 24 * 30),
        };
        let hash = HashConfig {
            memory_kib: env_or("HASH_MEMORY_KIB", 19456),
            iterations: env_or("HASH_ITERATIONS", 2),
            parallelism: env_or("HASH_PARALLELISM", 1),
        };
        Ok(Self {
            database_url,
            auth,
            hash,
        })
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}
