//! Configuration management for the chainspan engine
//!
//! Loads configuration from TOML files with environment variable substitution.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub engine: EngineConfig,
    pub chains: HashMap<String, ChainEndpointConfig>,
}

/// Engine-wide knobs consumed by the lifecycle and confirmation polling
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Transaction expiration window applied when deriving headers
    pub expire_secs: u32,
    /// Wall-clock budget for a single broadcast call
    pub send_timeout_secs: u64,
    pub confirm_max_attempts: u32,
    pub confirm_poll_interval_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            expire_secs: 300,
            send_timeout_secs: 30,
            confirm_max_attempts: 20,
            confirm_poll_interval_ms: 500,
        }
    }
}

/// Per-chain endpoint entry
#[derive(Debug, Clone, Deserialize)]
pub struct ChainEndpointConfig {
    /// Chain family the endpoint speaks, e.g. "eosio", "ethereum"
    pub family: String,
    pub chain_id: String,
    pub rpc_urls: Vec<String>,
    pub enabled: bool,
}

impl Settings {
    /// Load settings from the file named by `CHAINSPAN_CONFIG`, falling
    /// back to `config/default.toml`.
    pub fn load() -> Result<Self> {
        let config_path = env::var("CHAINSPAN_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config/default.toml"));
        Self::load_from(&config_path)
    }

    /// Load settings from a specific file
    pub fn load_from(config_path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        // Substitute environment variables
        let config_str = substitute_env_vars(&config_str);

        let settings: Settings =
            toml::from_str(&config_str).with_context(|| "Failed to parse configuration")?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.enabled_chains().is_empty() {
            anyhow::bail!("At least one chain must be enabled");
        }

        for (name, chain) in &self.chains {
            if chain.enabled {
                if chain.rpc_urls.is_empty() {
                    anyhow::bail!("Chain {} has no RPC URLs configured", name);
                }
                if chain.chain_id.is_empty() {
                    anyhow::bail!("Chain {} has no chain id configured", name);
                }
            }
        }

        if self.engine.confirm_max_attempts == 0 {
            anyhow::bail!("confirm_max_attempts must be at least 1");
        }

        Ok(())
    }

    /// Get list of enabled chains
    pub fn enabled_chains(&self) -> Vec<(&String, &ChainEndpointConfig)> {
        self.chains.iter().filter(|(_, c)| c.enabled).collect()
    }

    /// Get chain config by chain id
    pub fn get_chain_by_id(&self, chain_id: &str) -> Option<&ChainEndpointConfig> {
        self.chains.values().find(|c| c.chain_id == chain_id)
    }
}

/// Substitute environment variables in the format ${VAR_NAME}
fn substitute_env_vars(input: &str) -> String {
    let mut result = input.to_string();
    let re = regex::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").unwrap();

    for cap in re.captures_iter(input) {
        let var_name = &cap[1];
        let var_value = env::var(var_name).unwrap_or_default();
        result = result.replace(&cap[0], &var_value);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_var_substitution() {
        env::set_var("TEST_VAR", "test_value");
        let input = "url = \"https://api.example.com/${TEST_VAR}/endpoint\"";
        let result = substitute_env_vars(&input);
        assert_eq!(
            result,
            "url = \"https://api.example.com/test_value/endpoint\""
        );
    }

    #[test]
    fn test_parse_and_validate() {
        let toml_str = r#"
            [engine]
            expire_secs = 120
            send_timeout_secs = 15
            confirm_max_attempts = 10
            confirm_poll_interval_ms = 250

            [chains.eos_mainnet]
            family = "eosio"
            chain_id = "aca376f206b8fc25a6ed44dbdc66547c36c6c33e3a119ffbeaef943642f0e906"
            rpc_urls = ["https://eos.example.com"]
            enabled = true

            [chains.local_devnet]
            family = "ethereum"
            chain_id = "1337"
            rpc_urls = []
            enabled = false
        "#;

        let settings: Settings = toml::from_str(toml_str).unwrap();
        settings.validate().unwrap();
        assert_eq!(settings.enabled_chains().len(), 1);
        assert_eq!(settings.engine.confirm_max_attempts, 10);
        assert!(settings.get_chain_by_id("1337").is_some());
    }

    #[test]
    fn test_enabled_chain_without_rpc_urls_rejected() {
        let toml_str = r#"
            [engine]
            expire_secs = 120
            send_timeout_secs = 15
            confirm_max_attempts = 10
            confirm_poll_interval_ms = 250

            [chains.broken]
            family = "eosio"
            chain_id = "abc"
            rpc_urls = []
            enabled = true
        "#;

        let settings: Settings = toml::from_str(toml_str).unwrap();
        assert!(settings.validate().is_err());
    }
}
