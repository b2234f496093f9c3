//! Facility service configuration.
//!
//! Configuration is loaded from environment variables. Sensitive fields are
//! redacted in Debug output.

use common::secret::{ExposeSecret, SecretString};
use common::service_time::{
    ServiceTimeZone, DEFAULT_UTC_OFFSET_MINUTES, MAX_UTC_OFFSET_MINUTES, MIN_UTC_OFFSET_MINUTES,
};
use std::collections::HashMap;
use std::env;
use std::fmt;
use thiserror::Error;

/// Default HTTP bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8000";

/// Default minutes before `startTime` during which check-in is allowed.
pub const DEFAULT_EARLY_ALLOWANCE_MINUTES: i64 = 15;

/// Upper bound for the early check-in allowance.
pub const MAX_EARLY_ALLOWANCE_MINUTES: i64 = 240;

/// Default maximum size of a single relay frame (1 MiB).
pub const DEFAULT_RELAY_MAX_FRAME_BYTES: usize = 1024 * 1024;

/// Facility service configuration.
#[derive(Clone)]
pub struct Config {
    /// PostgreSQL connection URL.
    pub database_url: String,

    /// Server bind address (default: "0.0.0.0:8000").
    pub bind_address: String,

    /// Shared secret a relay producer must present as `?key=`.
    pub relay_key: SecretString,

    /// Civil-time convention for every date/time comparison.
    pub service_time_zone: ServiceTimeZone,

    /// Minutes before a booking starts during which check-in succeeds.
    pub early_allowance_minutes: i64,

    /// Largest binary frame accepted from the relay producer.
    pub relay_max_frame_bytes: usize,
}

/// Custom Debug implementation that redacts sensitive fields.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &"[REDACTED]")
            .field("bind_address", &self.bind_address)
            .field("relay_key", &"[REDACTED]")
            .field("service_time_zone", &self.service_time_zone.to_string())
            .field("early_allowance_minutes", &self.early_allowance_minutes)
            .field("relay_max_frame_bytes", &self.relay_max_frame_bytes)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid relay key configuration: {0}")]
    InvalidRelayKey(String),

    #[error("Invalid service time zone configuration: {0}")]
    InvalidServiceTimeZone(String),

    #[error("Invalid early allowance configuration: {0}")]
    InvalidEarlyAllowance(String),

    #[error("Invalid relay frame size configuration: {0}")]
    InvalidRelayFrameSize(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let database_url = vars
            .get("DATABASE_URL")
            .ok_or_else(|| ConfigError::MissingEnvVar("DATABASE_URL".to_string()))?
            .clone();

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let relay_key = vars
            .get("RELAY_KEY")
            .ok_or_else(|| ConfigError::MissingEnvVar("RELAY_KEY".to_string()))?;
        if relay_key.trim().is_empty() {
            return Err(ConfigError::InvalidRelayKey(
                "RELAY_KEY must not be empty".to_string(),
            ));
        }
        let relay_key = SecretString::from(relay_key.clone());

        let service_time_zone =
            if let Some(value_str) = vars.get("SERVICE_UTC_OFFSET_MINUTES") {
                let value: i32 = value_str.parse().map_err(|e| {
                    ConfigError::InvalidServiceTimeZone(format!(
                        "SERVICE_UTC_OFFSET_MINUTES must be a valid integer, got '{}': {}",
                        value_str, e
                    ))
                })?;

                ServiceTimeZone::from_offset_minutes(value).ok_or_else(|| {
                    ConfigError::InvalidServiceTimeZone(format!(
                        "SERVICE_UTC_OFFSET_MINUTES must be between {} and {}, got {}",
                        MIN_UTC_OFFSET_MINUTES, MAX_UTC_OFFSET_MINUTES, value
                    ))
                })?
            } else {
                ServiceTimeZone::from_offset_minutes(DEFAULT_UTC_OFFSET_MINUTES)
                    .unwrap_or_default()
            };

        let early_allowance_minutes =
            if let Some(value_str) = vars.get("CHECK_IN_EARLY_ALLOWANCE_MINUTES") {
                let value: i64 = value_str.parse().map_err(|e| {
                    ConfigError::InvalidEarlyAllowance(format!(
                        "CHECK_IN_EARLY_ALLOWANCE_MINUTES must be a valid integer, got '{}': {}",
                        value_str, e
                    ))
                })?;

                if !(0..=MAX_EARLY_ALLOWANCE_MINUTES).contains(&value) {
                    return Err(ConfigError::InvalidEarlyAllowance(format!(
                        "CHECK_IN_EARLY_ALLOWANCE_MINUTES must be between 0 and {}, got {}",
                        MAX_EARLY_ALLOWANCE_MINUTES, value
                    )));
                }

                value
            } else {
                DEFAULT_EARLY_ALLOWANCE_MINUTES
            };

        let relay_max_frame_bytes = if let Some(value_str) = vars.get("RELAY_MAX_FRAME_BYTES") {
            let value: usize = value_str.parse().map_err(|e| {
                ConfigError::InvalidRelayFrameSize(format!(
                    "RELAY_MAX_FRAME_BYTES must be a valid positive integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value == 0 {
                return Err(ConfigError::InvalidRelayFrameSize(
                    "RELAY_MAX_FRAME_BYTES must be greater than 0".to_string(),
                ));
            }

            value
        } else {
            DEFAULT_RELAY_MAX_FRAME_BYTES
        };

        Ok(Config {
            database_url,
            bind_address,
            relay_key,
            service_time_zone,
            early_allowance_minutes,
            relay_max_frame_bytes,
        })
    }

    /// Relay key length, for startup logging without exposing the value.
    pub fn relay_key_len(&self) -> usize {
        self.relay_key.expose_secret().len()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn base_vars() -> HashMap<String, String> {
        HashMap::from([
            (
                "DATABASE_URL".to_string(),
                "postgresql://localhost/facility_test".to_string(),
            ),
            ("RELAY_KEY".to_string(), "relay-secret".to_string()),
        ])
    }

    #[test]
    fn test_from_vars_success_with_defaults() {
        let config = Config::from_vars(&base_vars()).expect("Config should load successfully");

        assert_eq!(config.database_url, "postgresql://localhost/facility_test");
        assert_eq!(config.bind_address, DEFAULT_BIND_ADDRESS);
        assert_eq!(config.relay_key.expose_secret(), "relay-secret");
        assert_eq!(config.service_time_zone.offset_minutes(), 420);
        assert_eq!(config.early_allowance_minutes, DEFAULT_EARLY_ALLOWANCE_MINUTES);
        assert_eq!(config.relay_max_frame_bytes, DEFAULT_RELAY_MAX_FRAME_BYTES);
        assert_eq!(config.relay_key_len(), 12);
    }

    #[test]
    fn test_from_vars_success_with_custom_values() {
        let mut vars = base_vars();
        vars.insert("BIND_ADDRESS".to_string(), "127.0.0.1:9000".to_string());
        vars.insert("SERVICE_UTC_OFFSET_MINUTES".to_string(), "-300".to_string());
        vars.insert(
            "CHECK_IN_EARLY_ALLOWANCE_MINUTES".to_string(),
            "5".to_string(),
        );
        vars.insert("RELAY_MAX_FRAME_BYTES".to_string(), "65536".to_string());

        let config = Config::from_vars(&vars).expect("Config should load successfully");

        assert_eq!(config.bind_address, "127.0.0.1:9000");
        assert_eq!(config.service_time_zone.offset_minutes(), -300);
        assert_eq!(config.early_allowance_minutes, 5);
        assert_eq!(config.relay_max_frame_bytes, 65536);
    }

    #[test]
    fn test_from_vars_missing_database_url() {
        let mut vars = base_vars();
        vars.remove("DATABASE_URL");

        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(v)) if v == "DATABASE_URL"));
    }

    #[test]
    fn test_from_vars_missing_relay_key() {
        let mut vars = base_vars();
        vars.remove("RELAY_KEY");

        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(v)) if v == "RELAY_KEY"));
    }

    #[test]
    fn test_relay_key_rejects_blank() {
        let mut vars = base_vars();
        vars.insert("RELAY_KEY".to_string(), "   ".to_string());

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidRelayKey(msg)) if msg.contains("must not be empty"))
        );
    }

    #[test]
    fn test_offset_rejects_out_of_range() {
        let mut vars = base_vars();
        vars.insert("SERVICE_UTC_OFFSET_MINUTES".to_string(), "900".to_string());

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidServiceTimeZone(msg)) if msg.contains("must be between"))
        );
    }

    #[test]
    fn test_offset_rejects_non_numeric() {
        let mut vars = base_vars();
        vars.insert(
            "SERVICE_UTC_OFFSET_MINUTES".to_string(),
            "Asia/Bangkok".to_string(),
        );

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidServiceTimeZone(msg)) if msg.contains("must be a valid integer"))
        );
    }

    #[test]
    fn test_early_allowance_rejects_negative() {
        let mut vars = base_vars();
        vars.insert(
            "CHECK_IN_EARLY_ALLOWANCE_MINUTES".to_string(),
            "-1".to_string(),
        );

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidEarlyAllowance(msg)) if msg.contains("must be between 0 and 240"))
        );
    }

    #[test]
    fn test_early_allowance_accepts_zero() {
        let mut vars = base_vars();
        vars.insert(
            "CHECK_IN_EARLY_ALLOWANCE_MINUTES".to_string(),
            "0".to_string(),
        );

        let config = Config::from_vars(&vars).expect("Config should load successfully");
        assert_eq!(config.early_allowance_minutes, 0);
    }

    #[test]
    fn test_relay_frame_size_rejects_zero() {
        let mut vars = base_vars();
        vars.insert("RELAY_MAX_FRAME_BYTES".to_string(), "0".to_string());

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidRelayFrameSize(msg)) if msg.contains("must be greater than 0"))
        );
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = Config::from_vars(&base_vars()).expect("Config should load successfully");

        let debug_output = format!("{:?}", config);

        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("postgresql://"));
        assert!(!debug_output.contains("relay-secret"));
        assert!(debug_output.contains("UTC+07:00"));
    }
}
