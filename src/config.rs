use crate::bind::TransactOpts;
use alloy::primitives::Address;
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub default_network: String,
    /// Directory holding compiled contract artifacts for deployments.
    #[serde(default)]
    pub artifacts_dir: Option<PathBuf>,
    pub networks: HashMap<String, NetworkConfig>,
    /// Named aggregator deployments, e.g. `"eth-usd" = "0x..."`.
    #[serde(default)]
    pub feeds: HashMap<String, String>,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub rpc_url: String,
    pub chain_id: u64,
    pub explorer_url: Option<String>,
    pub gas: GasConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GasConfig {
    pub default_gas_limit: u64,
    pub max_gas_price: Option<u64>,
    pub priority_fee: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub allow_write_operations: bool,
}

impl NetworkConfig {
    /// Transaction options carrying this network's gas settings.
    pub fn transact_opts(&self) -> TransactOpts {
        TransactOpts {
            gas_limit: Some(self.gas.default_gas_limit),
            max_fee_per_gas: self.gas.max_gas_price.map(u128::from),
            max_priority_fee_per_gas: self.gas.priority_fee.map(u128::from),
            ..Default::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let mut networks = HashMap::new();

        networks.insert(
            "ethereum".to_string(),
            NetworkConfig {
                rpc_url: "https://eth-mainnet.g.alchemy.com/v2/demo".to_string(),
                chain_id: 1,
                explorer_url: Some("https://etherscan.io".to_string()),
                gas: GasConfig {
                    default_gas_limit: 500_000,
                    max_gas_price: Some(50_000_000_000), // 50 Gwei
                    priority_fee: Some(2_000_000_000),   // 2 Gwei
                },
            },
        );

        networks.insert(
            "sepolia".to_string(),
            NetworkConfig {
                rpc_url: "https://eth-sepolia.g.alchemy.com/v2/demo".to_string(),
                chain_id: 11155111,
                explorer_url: Some("https://sepolia.etherscan.io".to_string()),
                gas: GasConfig {
                    default_gas_limit: 500_000,
                    max_gas_price: Some(20_000_000_000), // 20 Gwei
                    priority_fee: Some(1_000_000_000),   // 1 Gwei
                },
            },
        );

        Self {
            default_network: "ethereum".to_string(),
            artifacts_dir: None,
            networks,
            feeds: HashMap::new(),
            security: SecurityConfig {
                allow_write_operations: false,
            },
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {:?}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {:?}: {}", path, e))?;

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub async fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)
            .map_err(|e| anyhow!("Failed to serialize config: {}", e))?;

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    anyhow!("Failed to create config directory {:?}: {}", parent, e)
                })?;
            }
        }

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {:?}: {}", path, e))?;

        Ok(())
    }

    /// Load configuration with fallback to default
    pub async fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Self {
        let mut config = match path {
            Some(path) => match Self::load_from_file(path).await {
                Ok(config) => {
                    tracing::info!("Loaded configuration from file");
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to load config file, using defaults: {}", e);
                    Self::default()
                }
            },
            None => Self::default(),
        };

        config.apply_env_vars();
        config
    }

    pub fn add_network(&mut self, name: String, config: NetworkConfig) {
        self.networks.insert(name, config);
    }

    /// Resolves a feed given either by its configured name or as an address.
    pub fn resolve_feed(&self, feed: &str) -> Result<Address> {
        let address = self.feeds.get(feed).map(String::as_str).unwrap_or(feed);
        crate::ethereum::utils::validate_address(address)
            .map_err(|e| anyhow!("Unknown feed '{}': {}", feed, e))
    }

    fn apply_env_vars(&mut self) {
        if let Ok(api_key) = std::env::var("ALCHEMY_API_KEY") {
            tracing::info!("Using ALCHEMY_API_KEY environment variable for RPC URLs");
            self.substitute_api_key(&api_key);
        } else {
            for (network_name, network_config) in &self.networks {
                if network_config.rpc_url.contains("/demo") {
                    tracing::warn!("Using demo RPC endpoint for {}, set ALCHEMY_API_KEY environment variable for better reliability", network_name);
                }
            }
        }

        // Takes precedence over any key substitution.
        if let Ok(rpc_url) = std::env::var("RPC_URL") {
            if let Some(network_config) = self.networks.get_mut(&self.default_network) {
                tracing::info!("Using RPC_URL for network {}", self.default_network);
                network_config.rpc_url = rpc_url;
            }
        }
    }

    fn substitute_api_key(&mut self, api_key: &str) {
        for (network_name, network_config) in &mut self.networks {
            if network_config.rpc_url.contains("alchemy.com/v2/demo") {
                network_config.rpc_url = network_config
                    .rpc_url
                    .replace("/demo", &format!("/{}", api_key));
                tracing::debug!("Updated {} RPC URL with API key", network_name);
            } else if network_config.rpc_url.contains("YOUR_API_KEY_HERE") {
                network_config.rpc_url = network_config
                    .rpc_url
                    .replace("YOUR_API_KEY_HERE", api_key);
                tracing::debug!("Updated {} RPC URL with API key", network_name);
            }
        }
    }

    /// Get default config file path
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir =
            dirs::config_dir().ok_or_else(|| anyhow!("Could not determine config directory"))?;
        Ok(config_dir.join("ocr-bindings").join("config.toml"))
    }

    /// Generate a sample configuration file
    pub fn generate_sample() -> String {
        let sample_config = r#"# OCR feed client configuration

# Default network to use when none is specified
default_network = "ethereum"

# Compiled Hardhat or Foundry artifacts, used when deploying aggregators
# artifacts_dir = "./out"

[networks.ethereum]
rpc_url = "https://eth-mainnet.g.alchemy.com/v2/YOUR_API_KEY_HERE"
chain_id = 1
explorer_url = "https://etherscan.io"

[networks.ethereum.gas]
default_gas_limit = 500000
max_gas_price = 50_000_000_000  # 50 Gwei
priority_fee = 2_000_000_000    # 2 Gwei

[networks.sepolia]
rpc_url = "https://eth-sepolia.g.alchemy.com/v2/YOUR_API_KEY_HERE"
chain_id = 11155111
explorer_url = "https://sepolia.etherscan.io"

[networks.sepolia.gas]
default_gas_limit = 500000
max_gas_price = 20_000_000_000  # 20 Gwei
priority_fee = 1_000_000_000    # 1 Gwei

# Aggregators addressable by name on the command line
[feeds]
# eth-usd = "0x..."

[security]
allow_write_operations = false

# Environment variables that can be used:
# ALCHEMY_API_KEY - Your Alchemy API key (replaces YOUR_API_KEY_HERE above)
# RPC_URL - Overrides the RPC endpoint of the default network
# PRIVATE_KEY - Signing key for transactions
"#;
        sample_config.to_string()
    }
}
