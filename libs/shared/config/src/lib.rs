use std::env;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

const DEFAULT_PORT: u16 = 3000;

/// Which backend holds the per-patient appointment collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Realtime,
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreBackend::Memory => write!(f, "memory"),
            StoreBackend::Realtime => write!(f, "realtime"),
        }
    }
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "in-memory" => Ok(StoreBackend::Memory),
            "realtime" | "firebase" => Ok(StoreBackend::Realtime),
            other => Err(format!("unknown appointment store backend: {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub jwt_secret: String,
    pub database_url: String,
    pub database_secret: String,
    pub store_backend: StoreBackend,
    pub recheck_conflicts_on_edit: bool,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup. `from_env` is the production entry point.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = lookup("JWT_SECRET").unwrap_or_else(|| {
            warn!("JWT_SECRET not set, every request will be treated as unauthenticated");
            String::new()
        });

        let database_url = lookup("DATABASE_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_default();

        let database_secret = lookup("DATABASE_SECRET").unwrap_or_default();

        let mut store_backend = match lookup("APPOINTMENT_STORE") {
            Some(value) => value.parse::<StoreBackend>().unwrap_or_else(|e| {
                warn!("{}, using in-memory store", e);
                StoreBackend::Memory
            }),
            None => StoreBackend::Memory,
        };

        if store_backend == StoreBackend::Realtime && database_url.is_empty() {
            warn!("APPOINTMENT_STORE=realtime but DATABASE_URL not set, using in-memory store");
            store_backend = StoreBackend::Memory;
        }

        let recheck_conflicts_on_edit = lookup("APPOINTMENT_RECHECK_ON_EDIT")
            .map(|value| matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let port = match lookup("PORT") {
            Some(value) => value.trim().parse::<u16>().unwrap_or_else(|_| {
                warn!("PORT {:?} is not a valid port, using default", value);
                DEFAULT_PORT
            }),
            None => DEFAULT_PORT,
        };

        let config = Self {
            jwt_secret,
            database_url,
            database_secret,
            store_backend,
            recheck_conflicts_on_edit,
            port,
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.jwt_secret.is_empty()
    }

    pub fn is_database_configured(&self) -> bool {
        !self.database_url.is_empty()
    }
}
