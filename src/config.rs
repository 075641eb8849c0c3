use std::env;

use crate::services::booking::DEFAULT_FLAT_RATE;

pub const DEV_SECRET_KEY: &str = "dev-secret-key-change-later";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub secret_key: String,
    pub flat_rate: f64,
    pub admin_email: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "ev_charge.db".to_string()),
            secret_key: env::var("SECRET_KEY")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| DEV_SECRET_KEY.to_string()),
            flat_rate: env::var("FLAT_RATE")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|v: &f64| v.is_finite() && *v >= 0.0)
                .unwrap_or(DEFAULT_FLAT_RATE),
            admin_email: env::var("ADMIN_EMAIL").ok().filter(|v| !v.is_empty()),
        }
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.secret_key == DEV_SECRET_KEY
    }
}
