//! Configuration loading and representation.

use std::time::Duration;

use chrono::Duration as ChronoDuration;
use thiserror::Error;

use guardian_auth::SessionLifetimes;
use guardian_core::DomainError;

pub const SESSION_TTL_VAR: &str = "GUARDIAN_SESSION_TTL_MINUTES";
pub const EMERGENCY_TTL_VAR: &str = "GUARDIAN_EMERGENCY_TTL_MINUTES";
pub const REFRESH_INTERVAL_VAR: &str = "GUARDIAN_REFRESH_INTERVAL_SECS";
pub const SESSION_DB_URL_VAR: &str = "GUARDIAN_SESSION_DB_URL";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be a positive integer, got '{value}'")]
    InvalidNumber { var: &'static str, value: String },

    #[error("invalid session lifetimes: {0}")]
    Lifetimes(#[from] DomainError),
}

/// Guardian session service configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardianConfig {
    pub lifetimes: SessionLifetimes,
    /// How often the background worker refreshes the current session.
    pub refresh_interval: Duration,
    /// SQLite URL of the persistent session slot. `None` keeps the session in
    /// memory only.
    pub session_db_url: Option<String>,
}

impl Default for GuardianConfig {
    fn default() -> Self {
        Self {
            lifetimes: SessionLifetimes::default(),
            refresh_interval: Duration::from_secs(15 * 60),
            session_db_url: None,
        }
    }
}

impl GuardianConfig {
    pub fn with_lifetimes(mut self, lifetimes: SessionLifetimes) -> Self {
        self.lifetimes = lifetimes;
        self
    }

    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    pub fn with_session_db_url(mut self, url: impl Into<String>) -> Self {
        self.session_db_url = Some(url.into());
        self
    }

    /// Load from `GUARDIAN_*` environment variables, falling back to defaults
    /// for unset ones.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let standard = match positive(&lookup, SESSION_TTL_VAR)? {
            Some(minutes) => ChronoDuration::minutes(minutes as i64),
            None => defaults.lifetimes.standard(),
        };
        let emergency = match positive(&lookup, EMERGENCY_TTL_VAR)? {
            Some(minutes) => ChronoDuration::minutes(minutes as i64),
            None => defaults.lifetimes.emergency(),
        };
        let refresh_interval = match positive(&lookup, REFRESH_INTERVAL_VAR)? {
            Some(secs) => Duration::from_secs(secs),
            None => defaults.refresh_interval,
        };
        let session_db_url = lookup(SESSION_DB_URL_VAR).filter(|url| !url.trim().is_empty());

        Ok(Self {
            lifetimes: SessionLifetimes::new(standard, emergency)?,
            refresh_interval,
            session_db_url,
        })
    }
}

fn positive<F>(lookup: &F, var: &'static str) -> Result<Option<u64>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(var) else {
        return Ok(None);
    };
    match raw.trim().parse::<u32>() {
        Ok(value) if value > 0 => Ok(Some(u64::from(value))),
        _ => Err(ConfigError::InvalidNumber { var, value: raw }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| vars.get(var).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = GuardianConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, GuardianConfig::default());
        assert_eq!(config.refresh_interval, Duration::from_secs(900));
        assert_eq!(config.lifetimes.standard(), ChronoDuration::hours(8));
        assert_eq!(config.lifetimes.emergency(), ChronoDuration::hours(2));
    }

    #[test]
    fn overrides_are_applied() {
        let config = GuardianConfig::from_lookup(lookup(&[
            (SESSION_TTL_VAR, "240"),
            (EMERGENCY_TTL_VAR, "60"),
            (REFRESH_INTERVAL_VAR, "30"),
            (SESSION_DB_URL_VAR, "sqlite://guardian.db"),
        ]))
        .unwrap();

        assert_eq!(config.lifetimes.standard(), ChronoDuration::hours(4));
        assert_eq!(config.lifetimes.emergency(), ChronoDuration::hours(1));
        assert_eq!(config.refresh_interval, Duration::from_secs(30));
        assert_eq!(config.session_db_url.as_deref(), Some("sqlite://guardian.db"));
    }

    #[test]
    fn rejects_garbage_and_zero() {
        let err =
            GuardianConfig::from_lookup(lookup(&[(REFRESH_INTERVAL_VAR, "soon")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidNumber { var: REFRESH_INTERVAL_VAR, .. }));

        let err = GuardianConfig::from_lookup(lookup(&[(SESSION_TTL_VAR, "0")])).unwrap_err();
        assert!(err.to_string().contains(SESSION_TTL_VAR));
    }

    #[test]
    fn rejects_emergency_longer_than_half_standard() {
        let err = GuardianConfig::from_lookup(lookup(&[
            (SESSION_TTL_VAR, "60"),
            (EMERGENCY_TTL_VAR, "45"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Lifetimes(_)));
    }

    #[test]
    fn blank_db_url_means_in_memory() {
        let config = GuardianConfig::from_lookup(lookup(&[(SESSION_DB_URL_VAR, "  ")])).unwrap();
        assert_eq!(config.session_db_url, None);
    }
}
