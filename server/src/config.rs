use std::{env, fmt::Display, fs::read_to_string, str::FromStr};

use tracing::{info, warn};

pub struct Config {
    pub port: u16,
    pub redis_url: String,
    pub jwt_secret: String,
    pub admin_key: String,
    pub payment_key_id: String,
    pub payment_key_secret: String,
    pub allow_mock_payments: bool,
    pub token_ttl_days: i64,
}

impl Config {
    pub fn load() -> Self {
        Self {
            port: try_load("RUST_PORT", "5000"),
            redis_url: try_load("REDIS_URL", "redis://127.0.0.1:6379"),
            jwt_secret: load_secret("JWT_SECRET", "dev-jwt-secret"),
            admin_key: load_secret("ADMIN_KEY", "dev-admin-key"),
            payment_key_id: load_secret("PAYMENT_KEY_ID", "dev-key-id"),
            payment_key_secret: load_secret("PAYMENT_KEY_SECRET", "dev-key-secret"),
            allow_mock_payments: try_load("ALLOW_MOCK_PAYMENTS", "false"),
            token_ttl_days: try_load("TOKEN_TTL_DAYS", "30"),
        }
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            port: 0,
            redis_url: String::new(),
            jwt_secret: "test-jwt-secret".to_string(),
            admin_key: "test-admin-key".to_string(),
            payment_key_id: "test-key-id".to_string(),
            payment_key_secret: "test-key-secret".to_string(),
            allow_mock_payments: true,
            token_ttl_days: 30,
        }
    }
}

fn var(key: &str) -> Result<String, ()> {
    env::var(key).map_err(|_| {
        warn!("Environment variable {key} not found, using default");
    })
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| {
            warn!("Invalid {key} value: {e}");
        })
        .expect("Environment misconfigured!")
}

/// Secrets come from the environment first, then a mounted secrets file.
/// Falls back to a development value so local runs work without mounts.
fn load_secret(secret_name: &str, default: &str) -> String {
    if let Ok(value) = env::var(secret_name) {
        return value;
    }

    let path = format!("/run/secrets/{secret_name}");
    read_to_string(&path)
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|_| {
            warn!("{secret_name} not set and no secret file at {path}, using development default");
            default.to_string()
        })
}
