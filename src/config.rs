use std::env;
use std::str::FromStr;

use anyhow::{Context, anyhow};
use chrono::NaiveTime;
use dotenvy::dotenv;
use strum_macros::EnumString;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum StoreBackend {
    Mysql,
    Memory,
}

#[derive(Clone)]
pub struct Config {
    pub server_addr: String,
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub access_token_ttl: i64,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_register_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,

    // Attendance policy
    pub late_cutoff: NaiveTime,
    pub enforce_geofence: bool,
    pub invitation_ttl_days: i64,
    pub reset_token_ttl_secs: i64,
    pub stats_cache_ttl_secs: u64,

    pub app_base_url: String,
    pub mail_from: String,
    pub log_dir: String,

    // First admin, created at startup when both are set
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

fn var_or<T>(key: &str, default: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = env::var(key).unwrap_or_else(|_| default.to_string());
    raw.trim()
        .parse()
        .map_err(|e| anyhow!("{} has invalid value '{}': {}", key, raw, e))
}

pub fn parse_cutoff(raw: &str) -> anyhow::Result<NaiveTime> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw.trim(), "%H:%M:%S"))
        .with_context(|| format!("LATE_CUTOFF must be HH:MM, got '{}'", raw))
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok();

        let store_backend: StoreBackend = var_or("STORE_BACKEND", "mysql")?;
        let database_url = env::var("DATABASE_URL").ok();
        if store_backend == StoreBackend::Mysql && database_url.is_none() {
            return Err(anyhow!("DATABASE_URL must be set when STORE_BACKEND=mysql"));
        }

        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
        if jwt_secret.is_empty() {
            return Err(anyhow!("JWT_SECRET cannot be empty"));
        }

        Ok(Self {
            server_addr: env::var("SERVER_ADDR").context("SERVER_ADDR must be set")?,
            store_backend,
            database_url,
            jwt_secret,
            access_token_ttl: var_or("ACCESS_TOKEN_TTL", "900")?, // default 15 min

            rate_login_per_min: var_or("RATE_LOGIN_PER_MIN", "60")?,
            rate_register_per_min: var_or("RATE_REGISTER_PER_MIN", "30")?,
            rate_protected_per_min: var_or("RATE_PROTECTED_PER_MIN", "1000")?,

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),

            late_cutoff: parse_cutoff(&env::var("LATE_CUTOFF").unwrap_or_else(|_| "09:00".to_string()))?,
            enforce_geofence: var_or("ENFORCE_GEOFENCE", "false")?,
            invitation_ttl_days: var_or("INVITATION_TTL_DAYS", "7")?,
            reset_token_ttl_secs: var_or("RESET_TOKEN_TTL_SECS", "3600")?, // 1 hour
            stats_cache_ttl_secs: var_or("STATS_CACHE_TTL_SECS", "86400")?,

            app_base_url: env::var("APP_BASE_URL").unwrap_or_else(|_| "http://localhost:8080".to_string()),
            mail_from: env::var("MAIL_FROM").unwrap_or_else(|_| "noreply@attendancetracker.com".to_string()),
            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),

            admin_email: env::var("ADMIN_EMAIL").ok().filter(|v| !v.trim().is_empty()),
            admin_password: env::var("ADMIN_PASSWORD").ok().filter(|v| !v.is_empty()),
        })
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            server_addr: "127.0.0.1:0".into(),
            store_backend: StoreBackend::Memory,
            database_url: None,
            jwt_secret: "test-secret".into(),
            access_token_ttl: 900,
            rate_login_per_min: 1000,
            rate_register_per_min: 1000,
            rate_protected_per_min: 1000,
            api_prefix: "/api".into(),
            late_cutoff: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            enforce_geofence: false,
            invitation_ttl_days: 7,
            reset_token_ttl_secs: 3600,
            stats_cache_ttl_secs: 86400,
            app_base_url: "http://localhost:8080".into(),
            mail_from: "noreply@test.local".into(),
            log_dir: "logs".into(),
            admin_email: None,
            admin_password: None,
        }
    }
}
