//! Configuration loading and representation.

use std::time::Duration;

use thiserror::Error;

pub const IMAGE_BASE_URL: &str = "STOREFRONT_IMAGE_BASE_URL";
pub const RESERVATION_TTL_SECS: &str = "STOREFRONT_RESERVATION_TTL_SECS";
pub const REAPER_INTERVAL_SECS: &str = "STOREFRONT_REAPER_INTERVAL_SECS";

const DEFAULT_IMAGE_BASE_URL: &str = "https://storage.yandexcloud.net/vapehookahstatic";
const DEFAULT_RESERVATION_TTL_SECS: u64 = 900;
const DEFAULT_REAPER_INTERVAL_SECS: u64 = 60;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: '{value}'")]
    Invalid { key: &'static str, value: String },
}

/// Runtime settings for the storefront services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorefrontConfig {
    /// Public base URL of the image bucket; object keys are appended to it.
    pub image_base_url: String,
    /// Age after which an unbound reservation is reaped.
    pub reservation_ttl: Duration,
    pub reaper_interval: Duration,
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            image_base_url: DEFAULT_IMAGE_BASE_URL.to_string(),
            reservation_ttl: Duration::from_secs(DEFAULT_RESERVATION_TTL_SECS),
            reaper_interval: Duration::from_secs(DEFAULT_REAPER_INTERVAL_SECS),
        }
    }
}

impl StorefrontConfig {
    /// Read settings from the process environment, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup` (lets tests avoid the process environment).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let image_base_url = lookup(IMAGE_BASE_URL)
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.image_base_url);

        let reservation_ttl = match lookup(RESERVATION_TTL_SECS) {
            Some(raw) => parse_secs(RESERVATION_TTL_SECS, &raw)?,
            None => defaults.reservation_ttl,
        };

        let reaper_interval = match lookup(REAPER_INTERVAL_SECS) {
            Some(raw) => {
                let interval = parse_secs(REAPER_INTERVAL_SECS, &raw)?;
                if interval.is_zero() {
                    return Err(ConfigError::Invalid {
                        key: REAPER_INTERVAL_SECS,
                        value: raw,
                    });
                }
                interval
            }
            None => defaults.reaper_interval,
        };

        Ok(Self {
            image_base_url,
            reservation_ttl,
            reaper_interval,
        })
    }

    /// Reservation TTL as a calendar duration for timestamp comparisons.
    pub fn reservation_ttl_chrono(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.reservation_ttl).unwrap_or(chrono::Duration::MAX)
    }
}

fn parse_secs(key: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    raw.trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|_| ConfigError::Invalid {
            key,
            value: raw.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = StorefrontConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, StorefrontConfig::default());
        assert_eq!(config.reservation_ttl, Duration::from_secs(900));
        assert_eq!(config.reaper_interval, Duration::from_secs(60));
    }

    #[test]
    fn values_are_read_and_trimmed() {
        let config = StorefrontConfig::from_lookup(lookup(&[
            (IMAGE_BASE_URL, "https://cdn.example.com/images/"),
            (RESERVATION_TTL_SECS, " 30 "),
            (REAPER_INTERVAL_SECS, "5"),
        ]))
        .unwrap();
        assert_eq!(config.image_base_url, "https://cdn.example.com/images");
        assert_eq!(config.reservation_ttl, Duration::from_secs(30));
        assert_eq!(config.reaper_interval, Duration::from_secs(5));
        assert_eq!(config.reservation_ttl_chrono(), chrono::Duration::seconds(30));
    }

    #[test]
    fn malformed_numbers_are_rejected_with_the_key() {
        let err = StorefrontConfig::from_lookup(lookup(&[(RESERVATION_TTL_SECS, "soon")]))
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                key: RESERVATION_TTL_SECS,
                value: "soon".to_string(),
            }
        );

        assert!(StorefrontConfig::from_lookup(lookup(&[(REAPER_INTERVAL_SECS, "0")])).is_err());
    }
}
