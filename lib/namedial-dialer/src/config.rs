//! Dialer configuration

use crate::error::ConfigError;
use crate::SelectionStrategy;
use std::time::Duration;

pub const SELECTION_ENV: &str = "NAMEDIAL_SELECTION";
pub const CONNECT_TIMEOUT_ENV: &str = "NAMEDIAL_CONNECT_TIMEOUT_MS";

/// Dialer configuration
#[derive(Clone, Debug, PartialEq, Default)]
pub struct DialerConfig {
    /// How an address is picked from a service set
    pub selection: SelectionStrategy,
    /// Connect timeout applied by the default connector, none by default
    pub connect_timeout: Option<Duration>,
}

impl DialerConfig {
    /// Load configuration from `NAMEDIAL_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup(SELECTION_ENV) {
            config.selection = value.parse().map_err(|_| ConfigError::InvalidValue {
                key: SELECTION_ENV,
                value: value.clone(),
            })?;
        }

        if let Some(value) = lookup(CONNECT_TIMEOUT_ENV) {
            let millis: u64 = value.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: CONNECT_TIMEOUT_ENV,
                value: value.clone(),
            })?;
            // Zero disables the timeout
            config.connect_timeout = (millis > 0).then(|| Duration::from_millis(millis));
        }

        Ok(config)
    }
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
    fn test_default_config() {
        let config = DialerConfig::default();
        assert_eq!(config.selection, SelectionStrategy::Random);
        assert_eq!(config.connect_timeout, None);
    }

    #[test]
    fn test_empty_lookup_is_default() {
        let config = DialerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, DialerConfig::default());
    }

    #[test]
    fn test_values_from_lookup() {
        let config = DialerConfig::from_lookup(lookup(&[
            (SELECTION_ENV, "round-robin"),
            (CONNECT_TIMEOUT_ENV, "1500"),
        ]))
        .unwrap();
        assert_eq!(config.selection, SelectionStrategy::RoundRobin);
        assert_eq!(config.connect_timeout, Some(Duration::from_millis(1500)));
    }

    #[test]
    fn test_zero_timeout_disables() {
        let config = DialerConfig::from_lookup(lookup(&[(CONNECT_TIMEOUT_ENV, "0")])).unwrap();
        assert_eq!(config.connect_timeout, None);
    }

    #[test]
    fn test_invalid_values() {
        let err = DialerConfig::from_lookup(lookup(&[(SELECTION_ENV, "sticky")])).unwrap_err();
        assert!(err.to_string().contains(SELECTION_ENV));

        let err = DialerConfig::from_lookup(lookup(&[(CONNECT_TIMEOUT_ENV, "soon")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key, .. } if key == CONNECT_TIMEOUT_ENV));
    }
}
