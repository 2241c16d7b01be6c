//! Process configuration from the environment

use crate::turn::DEFAULT_MAX_STEPS;
use std::fmt;
use thiserror::Error;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_PORT: u16 = 3000;

const REQUIRED: [&str; 3] = ["OPENAI_API_KEY", "CHAIN_RPC_URL", "WALLET_SIGNING_SECRET"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variables: {}", .0.join(", "))]
    Missing(Vec<&'static str>),
    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Clone)]
pub struct AppConfig {
    pub openai_api_key: String,
    pub openai_base_url: Option<String>,
    pub model: String,
    pub chain_rpc_url: String,
    pub wallet_signing_secret: String,
    pub max_steps: usize,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let missing: Vec<&'static str> = REQUIRED
            .iter()
            .copied()
            .filter(|name| get(*name).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        let max_steps = match get("AGENT_MAX_STEPS") {
            None => DEFAULT_MAX_STEPS,
            Some(v) => match v.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::Invalid {
                        name: "AGENT_MAX_STEPS",
                        value: v,
                    })
                }
            },
        };

        let port = match get("PORT") {
            None => DEFAULT_PORT,
            Some(v) => v.trim().parse::<u16>().map_err(|_| ConfigError::Invalid {
                name: "PORT",
                value: v.clone(),
            })?,
        };

        Ok(Self {
            openai_api_key: get("OPENAI_API_KEY").unwrap_or_default(),
            openai_base_url: get("OPENAI_BASE_URL"),
            model: get("AGENT_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            chain_rpc_url: get("CHAIN_RPC_URL").unwrap_or_default(),
            wallet_signing_secret: get("WALLET_SIGNING_SECRET").unwrap_or_default(),
            max_steps,
            port,
        })
    }
}

// Credentials never reach the logs
impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("openai_api_key", &"[redacted]")
            .field("openai_base_url", &self.openai_base_url)
            .field("model", &self.model)
            .field("chain_rpc_url", &self.chain_rpc_url)
            .field("wallet_signing_secret", &"[redacted]")
            .field("max_steps", &self.max_steps)
            .field("port", &self.port)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    const BASE: [(&str, &str); 3] = [
        ("OPENAI_API_KEY", "sk-test"),
        ("CHAIN_RPC_URL", "http://localhost:8545"),
        ("WALLET_SIGNING_SECRET", "s3cret"),
    ];

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup(&BASE)).unwrap();
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.max_steps, DEFAULT_MAX_STEPS);
        assert_eq!(config.port, DEFAULT_PORT);
        assert!(config.openai_base_url.is_none());
    }

    #[test]
    fn test_all_missing_enumerated() {
        let err = AppConfig::from_lookup(lookup(&[])).err().unwrap();
        assert_eq!(err, ConfigError::Missing(REQUIRED.to_vec()));
        assert_eq!(
            err.to_string(),
            "missing required environment variables: OPENAI_API_KEY, CHAIN_RPC_URL, WALLET_SIGNING_SECRET"
        );
    }

    #[test]
    fn test_empty_counts_as_missing() {
        let vars = [
            ("OPENAI_API_KEY", "sk-test"),
            ("CHAIN_RPC_URL", ""),
            ("WALLET_SIGNING_SECRET", "  "),
        ];
        let err = AppConfig::from_lookup(lookup(&vars)).err().unwrap();
        assert_eq!(
            err,
            ConfigError::Missing(vec!["CHAIN_RPC_URL", "WALLET_SIGNING_SECRET"])
        );
    }

    #[test]
    fn test_overrides() {
        let mut vars = BASE.to_vec();
        vars.extend([
            ("AGENT_MODEL", "gpt-4o"),
            ("AGENT_MAX_STEPS", "5"),
            ("PORT", "8080"),
            ("OPENAI_BASE_URL", "http://proxy/v1"),
        ]);
        let config = AppConfig::from_lookup(lookup(&vars)).unwrap();
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.max_steps, 5);
        assert_eq!(config.port, 8080);
        assert_eq!(config.openai_base_url.as_deref(), Some("http://proxy/v1"));
    }

    #[test]
    fn test_invalid_numbers() {
        for (name, value) in [("AGENT_MAX_STEPS", "0"), ("AGENT_MAX_STEPS", "many"), ("PORT", "99999")] {
            let mut vars = BASE.to_vec();
            vars.push((name, value));
            let err = AppConfig::from_lookup(lookup(&vars)).err().unwrap();
            assert!(matches!(err, ConfigError::Invalid { name: n, .. } if n == name));
        }
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = AppConfig::from_lookup(lookup(&BASE)).unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-test"));
        assert!(!debug.contains("s3cret"));
        assert!(debug.contains("localhost:8545"));
    }
}
