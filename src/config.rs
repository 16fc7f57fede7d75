use std::env;
use std::net::SocketAddr;

use chrono::Duration;

use crate::error::AppError;

#[derive(Clone, Debug)]
pub struct BoardConfig {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    /// Zero disables the periodic refresh.
    pub refresh_interval_secs: u64,
    pub slot_width_minutes: i64,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://schoolboard.db?mode=rwc".to_string(),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            refresh_interval_secs: 60,
            slot_width_minutes: 120,
        }
    }
}

impl BoardConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let defaults = Self::default();

        let database_url = env::var("DATABASE_URL").unwrap_or(defaults.database_url);
        let bind_addr = parse_var("BIND_ADDR", defaults.bind_addr)?;
        let refresh_interval_secs = parse_var("REFRESH_INTERVAL_SECS", defaults.refresh_interval_secs)?;
        let slot_width_minutes = parse_var("SLOT_WIDTH_MINUTES", defaults.slot_width_minutes)?;

        if slot_width_minutes <= 0 || slot_width_minutes > 24 * 60 {
            return Err(AppError::Config(format!(
                "SLOT_WIDTH_MINUTES must be between 1 and 1440, got {}",
                slot_width_minutes
            )));
        }

        Ok(Self {
            database_url,
            bind_addr,
            refresh_interval_secs,
            slot_width_minutes,
        })
    }

    pub fn slot_width(&self) -> Duration {
        Duration::minutes(self.slot_width_minutes)
    }
}

fn parse_var<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AppError::Config(format!("{} is invalid: {}", key, e))),
        Err(_) => Ok(default),
    }
}
