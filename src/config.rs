use std::env;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, FixedOffset, Utc};
use thiserror::Error;

use crate::view::Calendar;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_audience: Option<String>,
    pub environment: String,
    pub frontend_urls: Vec<String>,
    pub utc_offset: FixedOffset,
    pub date_format: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process
    /// environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| lookup(key).ok_or_else(|| ConfigError::MissingVariable(key.to_string()));

        let database_url = required("DATABASE_URL")?;
        let jwt_secret = required("JWT_SECRET")?;
        let jwt_audience = lookup("JWT_AUDIENCE").filter(|aud| !aud.trim().is_empty());

        let environment = lookup("ENVIRONMENT").unwrap_or_else(|| "development".to_string());

        let port = lookup("SERVER_PORT")
            .unwrap_or_else(|| "8080".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidFormat("SERVER_PORT must be a valid port number".to_string()))?;

        // Parse allowed origins
        let frontend_urls = lookup("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|| "http://localhost:3000".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let offset_minutes = lookup("UTC_OFFSET_MINUTES")
            .unwrap_or_else(|| "0".to_string())
            .trim()
            .parse::<i32>()
            .map_err(|_| ConfigError::InvalidFormat("UTC_OFFSET_MINUTES must be a whole number".to_string()))?;
        let utc_offset = offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| ConfigError::InvalidFormat("UTC_OFFSET_MINUTES must lie within ±24 hours".to_string()))?;

        let date_format = lookup("DATE_LABEL_FORMAT").unwrap_or_else(|| "%d.%m.%Y".to_string());
        if StrftimeItems::new(&date_format).any(|item| item == Item::Error) {
            return Err(ConfigError::InvalidFormat(format!(
                "DATE_LABEL_FORMAT '{}' is not a valid date format",
                date_format
            )));
        }

        Ok(AppConfig {
            database_url,
            jwt_secret,
            jwt_audience,
            environment,
            port,
            frontend_urls,
            utc_offset,
            date_format,
        })
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Calendar for a derivation pass happening at `now`.
    pub fn calendar(&self, now: DateTime<Utc>) -> Calendar {
        Calendar::at(now, self.utc_offset, self.date_format.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    const BASE: [(&str, &str); 2] = [("DATABASE_URL", "postgres://localhost/todo"), ("JWT_SECRET", "secret")];

    #[test]
    fn defaults_apply_when_optional_variables_are_unset() {
        let cfg = config(&BASE).unwrap();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.environment, "development");
        assert!(cfg.is_development());
        assert_eq!(cfg.frontend_urls, vec!["http://localhost:3000"]);
        assert_eq!(cfg.jwt_audience, None);
        assert_eq!(cfg.utc_offset.local_minus_utc(), 0);
        assert_eq!(cfg.date_format, "%d.%m.%Y");
    }

    #[test]
    fn missing_secret_is_reported_by_name() {
        let err = config(&[("DATABASE_URL", "postgres://localhost/todo")]).unwrap_err();
        assert_eq!(err, ConfigError::MissingVariable("JWT_SECRET".to_string()));
    }

    #[test]
    fn origins_are_split_and_trimmed() {
        let mut vars = BASE.to_vec();
        vars.push(("CORS_ALLOWED_ORIGINS", "https://a.example, https://b.example,"));
        let cfg = config(&vars).unwrap();
        assert_eq!(cfg.frontend_urls, vec!["https://a.example", "https://b.example"]);
    }

    #[test]
    fn invalid_values_are_rejected() {
        for (key, value) in [
            ("SERVER_PORT", "eighty"),
            ("UTC_OFFSET_MINUTES", "90000"),
            ("UTC_OFFSET_MINUTES", "+2h"),
            ("DATE_LABEL_FORMAT", "%Q"),
        ] {
            let mut vars = BASE.to_vec();
            vars.push((key, value));
            assert!(
                matches!(config(&vars), Err(ConfigError::InvalidFormat(_))),
                "{}={} should be rejected",
                key,
                value
            );
        }
    }

    #[test]
    fn calendar_uses_the_configured_offset() {
        let mut vars = BASE.to_vec();
        vars.push(("UTC_OFFSET_MINUTES", "120"));
        let cfg = config(&vars).unwrap();

        // 23:30 UTC is already the next day two hours east.
        let now = Utc.with_ymd_and_hms(2026, 10, 17, 23, 30, 0).unwrap();
        let calendar = cfg.calendar(now);
        assert_eq!(calendar.today(), NaiveDate::from_ymd_opt(2026, 10, 18).unwrap());
        assert_eq!(calendar.format_day(calendar.today()), "18.10.2026");
    }
}
