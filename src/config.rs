use anyhow::{Context, anyhow};
use chrono_tz::Tz;
use std::env;
use std::str::FromStr;

/// Report handlers read attendance and leave rows concurrently on separate connections.
const MIN_DB_CONNECTIONS: u32 = 2;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub access_token_ttl: usize,
    pub refresh_token_ttl: usize,
    pub db_max_connections: u32,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_refresh_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,

    /// Organization timezone; decides the day boundary for "Absent" vs "Not Yet".
    pub org_timezone: Tz,

    pub log_dir: String,
    pub log_level: tracing::Level,

    /// Widest date range the spreadsheet export accepts.
    pub export_max_days: i64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| lookup(key).ok_or_else(|| anyhow!("{key} must be set"));

        let timezone_name = lookup("ORG_TIMEZONE").unwrap_or_else(|| "Asia/Kolkata".to_string());
        let org_timezone: Tz = timezone_name
            .parse()
            .map_err(|_| anyhow!("Invalid ORG_TIMEZONE value: {timezone_name}"))?;

        let log_level_name = lookup("LOG_LEVEL").unwrap_or_else(|| "debug".to_string());
        let log_level = tracing::Level::from_str(&log_level_name)
            .map_err(|_| anyhow!("Invalid LOG_LEVEL value: {log_level_name}"))?;

        let db_max_connections: u32 = parse_or(&lookup, "DB_MAX_CONNECTIONS", 10)?;
        if db_max_connections < MIN_DB_CONNECTIONS {
            return Err(anyhow!(
                "DB_MAX_CONNECTIONS must be at least {MIN_DB_CONNECTIONS}, got {db_max_connections}"
            ));
        }

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            access_token_ttl: parse_or(&lookup, "ACCESS_TOKEN_TTL", 900)?, // 15 min
            refresh_token_ttl: parse_or(&lookup, "REFRESH_TOKEN_TTL", 604_800)?, // 7 days
            db_max_connections,

            rate_login_per_min: parse_or(&lookup, "RATE_LOGIN_PER_MIN", 60)?,
            rate_refresh_per_min: parse_or(&lookup, "RATE_REFRESH_PER_MIN", 30)?,
            rate_protected_per_min: parse_or(&lookup, "RATE_PROTECTED_PER_MIN", 1000)?,

            api_prefix: lookup("API_PREFIX").unwrap_or_else(|| "/api".to_string()),
            org_timezone,
            log_dir: lookup("LOG_DIR").unwrap_or_else(|| "logs".to_string()),
            log_level,
            export_max_days: parse_or(&lookup, "EXPORT_MAX_DAYS", 92)?,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid {key} value: {raw}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 3] = [
        ("SERVER_ADDR", "127.0.0.1:8080"),
        ("DATABASE_URL", "mysql://root@localhost/hrms"),
        ("JWT_SECRET", "secret"),
    ];

    #[test]
    fn defaults_apply_when_optional_values_missing() {
        let config = Config::from_lookup(lookup_from(&REQUIRED)).unwrap();
        assert_eq!(config.org_timezone, chrono_tz::Asia::Kolkata);
        assert_eq!(config.access_token_ttl, 900);
        assert_eq!(config.api_prefix, "/api");
        assert_eq!(config.export_max_days, 92);
        assert_eq!(config.log_level, tracing::Level::DEBUG);
    }

    #[test]
    fn missing_required_value_is_an_error() {
        let err = Config::from_lookup(lookup_from(&REQUIRED[..2])).unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));
    }

    #[test]
    fn timezone_is_configurable() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("ORG_TIMEZONE", "Europe/Berlin"));
        let config = Config::from_lookup(lookup_from(&pairs)).unwrap();
        assert_eq!(config.org_timezone, chrono_tz::Europe::Berlin);
    }

    #[test]
    fn invalid_values_are_reported() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("ORG_TIMEZONE", "Mars/Olympus"));
        assert!(Config::from_lookup(lookup_from(&pairs)).is_err());

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("ACCESS_TOKEN_TTL", "soon"));
        let err = Config::from_lookup(lookup_from(&pairs)).unwrap_err();
        assert!(err.to_string().contains("ACCESS_TOKEN_TTL"));
    }

    #[test]
    fn pool_too_small_for_concurrent_reads_is_rejected() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("DB_MAX_CONNECTIONS", "1"));
        let err = Config::from_lookup(lookup_from(&pairs)).unwrap_err();
        assert!(err.to_string().contains("DB_MAX_CONNECTIONS"));

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("DB_MAX_CONNECTIONS", "2"));
        let config = Config::from_lookup(lookup_from(&pairs)).unwrap();
        assert_eq!(config.db_max_connections, 2);
    }
}
