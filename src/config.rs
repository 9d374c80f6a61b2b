use std::env;

use crate::models::{ConflictPolicy, OperatingHours};

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub hours: OperatingHours,
    pub conflict_policy: ConflictPolicy,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            database_url: "petcare.db".to_string(),
            hours: OperatingHours::default(),
            conflict_policy: ConflictPolicy::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let open = env::var("SCHEDULE_OPEN").unwrap_or_else(|_| "09:00".to_string());
        let close = env::var("SCHEDULE_CLOSE").unwrap_or_else(|_| "18:00".to_string());
        let slot_minutes = match env::var("SLOT_MINUTES") {
            Ok(v) => v
                .parse()
                .map_err(|_| anyhow::anyhow!("SLOT_MINUTES must be a whole number of minutes, got {v}"))?,
            Err(_) => defaults.hours.slot_minutes,
        };
        let conflict_policy = match env::var("CONFLICT_POLICY") {
            Ok(v) => ConflictPolicy::parse(&v)?,
            Err(_) => defaults.conflict_policy,
        };

        Ok(Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.port),
            database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            hours: OperatingHours::parse(&open, &close, slot_minutes)?,
            conflict_policy,
        })
    }
}
