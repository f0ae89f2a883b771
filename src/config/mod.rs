/// Application configuration module
use crate::domain::CacheTtls;
use std::env;
use std::time::Duration;

const DAY_SECONDS: u64 = 86_400;

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Postgres cache store; without it entries live in process memory
    pub database_url: Option<String>,
    pub heavens_above_url: String,
    pub fetch_timeout: Duration,
    /// Observer altitude sent to the remote pages; the request never carries one
    pub altitude_meters: u32,
    pub bind_addr: String,
    pub cache_ttls: CacheTtls,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").ok().filter(|s| !s.trim().is_empty());

        let heavens_above_url =
            env::var("HEAVENS_ABOVE_URL").unwrap_or_else(|_| "https://www.heavens-above.com".to_string());

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let altitude_meters = u32::try_from(env_u64("LOCATION_ALTITUDE_METERS", 300))?;

        let cache_ttls = CacheTtls {
            satellite: Duration::from_secs(env_u64("SATELLITE_CACHE_DAYS", 10) * DAY_SECONDS),
            planet: Duration::from_secs(env_u64("PLANET_CACHE_DAYS", 1) * DAY_SECONDS),
        };

        Ok(Self {
            database_url,
            heavens_above_url,
            fetch_timeout: Duration::from_secs(env_u64("FETCH_TIMEOUT_SECONDS", 30)),
            altitude_meters,
            bind_addr,
            cache_ttls,
        })
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
