use anyhow::Result;
use std::env;
use std::time::Duration;

use crate::services::retry::RetryPolicy;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub max_db_connections: u32,
    pub retry_max_attempts: u32,
    pub retry_initial_backoff: Duration,
    pub retry_max_backoff: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Config {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgresql://localhost/coupon_redemption".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?,
            max_db_connections: env::var("MAX_DB_CONNECTIONS")
                .unwrap_or_else(|_| "20".to_string())
                .parse()?,
            retry_max_attempts: env::var("RETRY_MAX_ATTEMPTS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()?,
            retry_initial_backoff: Duration::from_millis(
                env::var("RETRY_INITIAL_BACKOFF_MS")
                    .unwrap_or_else(|_| "100".to_string())
                    .parse()?,
            ),
            retry_max_backoff: Duration::from_millis(
                env::var("RETRY_MAX_BACKOFF_MS")
                    .unwrap_or_else(|_| "10000".to_string())
                    .parse()?,
            ),
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry_max_attempts,
            initial_backoff: self.retry_initial_backoff,
            max_backoff: self.retry_max_backoff,
            multiplier: 2.0,
        }
    }
}
