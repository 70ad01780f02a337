//! Configuration loader for the `thermolog` service.
//!
//! This module centralizes all runtime configuration values and their defaults,
//! loading from environment variables (with optional `.env` file support
//! provided by the caller). Station identifiers, the device-access project and
//! the OAuth client credentials are read once here and handed to components at
//! construction, so nothing downstream touches `env::var`.
//!
use std::env;

use anyhow::{anyhow, bail, Result};

/// Parse an optional integer environment variable with a default value.
macro_rules! parse_env_u32 {
    ($var_name:expr, $default:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.parse::<u32>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Parse a required string environment variable.
macro_rules! require_env {
    ($var_name:expr) => {
        env::var($var_name)
            .map_err(|_| anyhow!("{} must be set in .env or environment", $var_name))?
    };
}

/// Read an optional string environment variable, treating empty as unset.
fn optional_env(var_name: &str) -> Option<String> {
    env::var(var_name).ok().filter(|v| !v.trim().is_empty())
}

/// How the service obtains SDM access tokens.
#[derive(Clone)]
pub enum TokenConfig {
    // ---
    /// Use this access token as-is.
    Static(String),
    /// Mint access tokens from a refresh token.
    Refresh(String),
}

/// Where measurement rows are written.
#[derive(Debug, Clone)]
pub enum SinkConfig {
    // ---
    Csv { path: String },
    Postgres { db_url: String, pool_max: u32 },
}

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of the application.
#[derive(Clone)]
pub struct Config {
    // ---
    /// Weather station identifiers, primary first.
    pub stations: Vec<String>,

    /// Device-access project that owns the thermostat.
    pub project_id: String,

    pub oauth_client_id: String,
    pub oauth_client_secret: String,
    pub token: TokenConfig,

    pub weather_api_url: String,
    pub sdm_api_url: String,
    pub oauth_token_url: String,

    /// The weather API rejects requests without a `User-Agent`.
    pub user_agent: String,

    pub sink: SinkConfig,

    /// Seconds between scheduled cycles; 0 disables the scheduler.
    pub measure_interval_secs: u32,

    pub listen_port: u16,
}

/// Load configuration from environment variables with defaults.
///
/// Required:
/// - `PRIMARY_WEATHER_STATION`, `SECONDARY_WEATHER_STATION` – station ids
/// - `SDM_PROJECT_ID` – device-access project id
/// - `OAUTH_CLIENT_ID`, `OAUTH_CLIENT_SECRET` – OAuth client credentials
/// - `SDM_REFRESH_TOKEN` or `SDM_ACCESS_TOKEN`
///
/// Optional:
/// - `WEATHER_API_URL`, `SDM_API_URL`, `OAUTH_TOKEN_URL` – endpoint overrides
/// - `HTTP_USER_AGENT` – identifies this client to the weather API
/// - `DATABASE_URL` – log to PostgreSQL instead of CSV
/// - `DB_POOL_MAX` – max DB connections (default: 5)
/// - `LOG_CSV_PATH` – CSV log file (default: `thermostat_logs.csv`)
/// - `MEASURE_INTERVAL_SECS` – scheduler period (default: 300)
/// - `LISTEN_PORT` – HTTP port (default: 8080)
///
/// Returns an error if any required variable is missing or invalid.
pub fn load_from_env() -> Result<Config> {
    // ---
    let primary = require_env!("PRIMARY_WEATHER_STATION");
    let secondary = require_env!("SECONDARY_WEATHER_STATION");
    let project_id = require_env!("SDM_PROJECT_ID");
    let oauth_client_id = require_env!("OAUTH_CLIENT_ID");
    let oauth_client_secret = require_env!("OAUTH_CLIENT_SECRET");

    let token = match (optional_env("SDM_REFRESH_TOKEN"), optional_env("SDM_ACCESS_TOKEN")) {
        (Some(refresh), _) => TokenConfig::Refresh(refresh),
        (None, Some(access)) => TokenConfig::Static(access),
        (None, None) => bail!("SDM_REFRESH_TOKEN or SDM_ACCESS_TOKEN must be set"),
    };

    let sink = match optional_env("DATABASE_URL") {
        Some(db_url) => SinkConfig::Postgres {
            db_url,
            pool_max: parse_env_u32!("DB_POOL_MAX", 5),
        },
        None => SinkConfig::Csv {
            path: optional_env("LOG_CSV_PATH").unwrap_or_else(|| "thermostat_logs.csv".into()),
        },
    };

    let listen_port = parse_env_u32!("LISTEN_PORT", 8080);
    let listen_port =
        u16::try_from(listen_port).map_err(|_| anyhow!("Invalid LISTEN_PORT: {}", listen_port))?;

    Ok(Config {
        stations: vec![primary, secondary],
        project_id,
        oauth_client_id,
        oauth_client_secret,
        token,
        weather_api_url: optional_env("WEATHER_API_URL")
            .unwrap_or_else(|| "https://api.weather.gov".into()),
        sdm_api_url: optional_env("SDM_API_URL")
            .unwrap_or_else(|| "https://smartdevicemanagement.googleapis.com/v1".into()),
        oauth_token_url: optional_env("OAUTH_TOKEN_URL")
            .unwrap_or_else(|| "https://oauth2.googleapis.com/token".into()),
        user_agent: optional_env("HTTP_USER_AGENT")
            .unwrap_or_else(|| concat!("thermolog/", env!("CARGO_PKG_VERSION")).into()),
        sink,
        measure_interval_secs: parse_env_u32!("MEASURE_INTERVAL_SECS", 300),
        listen_port,
    })
}

/// Mask all but the last four characters of a secret.
fn mask(secret: &str) -> String {
    // ---
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 4 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{}", tail)
}

/// Mask the password in a database URL.
fn mask_db_url(db_url: &str) -> String {
    // ---
    if let Some(at_pos) = db_url.rfind('@') {
        if let Some(colon_pos) = db_url[..at_pos].rfind(':') {
            return format!("{}:****{}", &db_url[..colon_pos], &db_url[at_pos..]);
        }
    }
    db_url.to_string()
}

impl Config {
    /// Log the loaded configuration for debugging purposes.
    ///
    /// Masks secrets (client secret, tokens, database password) while showing
    /// all other configuration values that were loaded.
    pub fn log_config(&self) {
        // ---
        let token = match &self.token {
            TokenConfig::Static(t) => format!("static {}", mask(t)),
            TokenConfig::Refresh(t) => format!("refresh {}", mask(t)),
        };
        let sink = match &self.sink {
            SinkConfig::Csv { path } => format!("csv {}", path),
            SinkConfig::Postgres { db_url, pool_max } => {
                format!("postgres {} (pool {})", mask_db_url(db_url), pool_max)
            }
        };

        tracing::info!("Configuration loaded:");
        tracing::info!("  STATIONS            : {}", self.stations.join(", "));
        tracing::info!("  SDM_PROJECT_ID      : {}", self.project_id);
        tracing::info!("  OAUTH_CLIENT_ID     : {}", self.oauth_client_id);
        tracing::info!("  OAUTH_CLIENT_SECRET : {}", mask(&self.oauth_client_secret));
        tracing::info!("  SDM token           : {}", token);
        tracing::info!("  WEATHER_API_URL     : {}", self.weather_api_url);
        tracing::info!("  SDM_API_URL         : {}", self.sdm_api_url);
        tracing::info!("  HTTP_USER_AGENT     : {}", self.user_agent);
        tracing::info!("  sink                : {}", sink);
        tracing::info!("  MEASURE_INTERVAL    : {}s", self.measure_interval_secs);
        tracing::info!("  LISTEN_PORT         : {}", self.listen_port);
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_mask_keeps_tail_only() {
        // ---
        assert_eq!(mask("abcdefgh"), "****efgh");
        assert_eq!(mask("abc"), "****");
    }

    #[test]
    fn test_mask_db_url_hides_password() {
        // ---
        assert_eq!(
            mask_db_url("postgres://user:hunter2@db:5432/logs"),
            "postgres://user:****@db:5432/logs"
        );
        assert_eq!(mask_db_url("postgres://db/logs"), "postgres://db/logs");
    }
}
