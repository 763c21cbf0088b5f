//! Transport configuration.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable overriding [`Config::connection_timeout_secs`].
pub const ENV_CONNECTION_TIMEOUT: &str = "QINIU_CONNECTION_TIMEOUT";
/// Environment variable overriding [`Config::connection_retries`].
pub const ENV_CONNECTION_RETRIES: &str = "QINIU_CONNECTION_RETRIES";
/// Environment variable overriding [`Config::connection_pool`].
pub const ENV_CONNECTION_POOL: &str = "QINIU_CONNECTION_POOL";

/// Values the transport reads when its engines are first initialised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Connect timeout for both call paths, and the total timeout of a GET.
    pub connection_timeout_secs: u64,
    /// How many times a request is re-sent when the connection could not be established.
    pub connection_retries: usize,
    /// Idle connections kept per host.
    pub connection_pool: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            connection_timeout_secs: 30,
            connection_retries: 3,
            connection_pool: 10,
        }
    }
}

impl Config {
    /// Defaults overlaid with the `QINIU_CONNECTION_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with whatever `lookup` returns for each variable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(v) = parse_var(&lookup, ENV_CONNECTION_TIMEOUT)? {
            config.connection_timeout_secs = v;
        }
        if let Some(v) = parse_var(&lookup, ENV_CONNECTION_RETRIES)? {
            config.connection_retries = v;
        }
        if let Some(v) = parse_var(&lookup, ENV_CONNECTION_POOL)? {
            config.connection_pool = v;
        }
        Ok(config)
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_secs)
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => {
            let value = raw
                .trim()
                .parse::<T>()
                .with_context(|| format!("Invalid value for {}: {:?}", key, raw))?;
            Ok(Some(value))
        }
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

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.connection_timeout_secs, 30);
        assert_eq!(config.connection_retries, 3);
        assert_eq!(config.connection_pool, 10);
        assert_eq!(config.connection_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_from_lookup_without_variables_is_default() {
        let config = Config::from_lookup(|_| None).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            (ENV_CONNECTION_TIMEOUT, "5"),
            (ENV_CONNECTION_RETRIES, " 0 "),
            (ENV_CONNECTION_POOL, "32"),
        ]))
        .unwrap();

        assert_eq!(config.connection_timeout_secs, 5);
        assert_eq!(config.connection_retries, 0);
        assert_eq!(config.connection_pool, 32);
    }

    #[test]
    fn test_from_lookup_rejects_garbage() {
        let err = Config::from_lookup(lookup_from(&[(ENV_CONNECTION_POOL, "many")])).unwrap_err();
        assert!(err.to_string().contains(ENV_CONNECTION_POOL));
    }

    #[test]
    fn test_deserialize_partial_json_keeps_defaults() {
        let config: Config = serde_json::from_str(r#"{"connection_retries": 1}"#).unwrap();
        assert_eq!(config.connection_retries, 1);
        assert_eq!(config.connection_timeout_secs, 30);
        assert_eq!(config.connection_pool, 10);
    }
}
