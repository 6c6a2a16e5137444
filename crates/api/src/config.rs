// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Server configuration module
//!
//! This module provides configuration structures and logic for the SLP gateway,
//! supporting different environments and validation of configuration parameters.

use std::{
    collections::HashMap,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    time::Duration,
};

use anyhow::{Result, anyhow, ensure};
use config::{Config, ConfigError, Environment as ConfigEnv, File};
use external_apis::{NodeRpcConfig, SlpdbConfig};
use serde::{Deserialize, Deserializer, Serialize, de};
use shared_types::Network;
use utoipa::ToSchema;

use crate::error::{ServerError, ServerResult};

/// A validated server port that ensures the value is appropriate for the environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ServerPort {
    port: u16,
    environment: Environment,
}

impl ServerPort {
    /// Create a new `ServerPort`, ensuring it's valid for the given environment
    ///
    /// # Errors
    ///
    /// Returns an error if the port is 0 in non-testing environments
    pub fn new(port: u16, environment: Environment) -> Result<Self> {
        if port == 0 && environment != Environment::Testing {
            return Err(anyhow!("port cannot be 0 in non-testing environments"));
        }
        Ok(Self { port, environment })
    }

    /// Create a safe default port for development
    pub const fn default_development() -> Self {
        Self {
            port: 3000,
            environment: Environment::Development,
        }
    }

    /// Create a safe testing port (port 0)
    pub const fn testing() -> Self {
        Self {
            port: 0,
            environment: Environment::Testing,
        }
    }

    /// Get the port value
    pub fn value(&self) -> u16 {
        self.port
    }
}

impl<'de> Deserialize<'de> for ServerPort {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let port = u16::deserialize(deserializer)?;
        // We'll validate this during configuration loading when we know the environment
        Ok(Self {
            port,
            environment: Environment::Development, // temporary, will be fixed during load
        })
    }
}

/// A validated timeout duration in seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeoutSeconds(Duration);

impl TimeoutSeconds {
    /// Create a new `TimeoutSeconds`, ensuring the value is within valid bounds
    ///
    /// # Errors
    ///
    /// Returns an error if timeout is 0 or greater than 300 seconds
    pub fn new(seconds: u64) -> Result<Self> {
        ensure!(seconds != 0, "timeout must be greater than 0");
        ensure!(seconds <= 300, "timeout cannot exceed 300");
        Ok(Self(Duration::from_secs(seconds)))
    }

    /// Create a safe default timeout (30 seconds)
    pub const fn default_value() -> Self {
        Self(Duration::from_secs(30))
    }

    /// Create a safe testing timeout (5 seconds)
    pub const fn testing() -> Self {
        Self(Duration::from_secs(5))
    }

    /// Get the timeout value in seconds
    pub fn value(&self) -> Duration {
        self.0
    }
}

impl<'de> Deserialize<'de> for TimeoutSeconds {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let seconds = u64::deserialize(deserializer)?;
        Self::new(seconds).map_err(|e| de::Error::custom(e.to_string()))
    }
}

impl Default for TimeoutSeconds {
    fn default() -> Self {
        Self::default_value()
    }
}

/// Environment types for configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Production environment
    Production,
    /// Development environment
    Development,
    /// Testing environment
    Testing,
}

/// Admission control settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitingConfig {
    /// Whether requests are rate limited at all
    pub enabled: bool,
    /// Default ceiling per client and route within one window
    pub requests_per_minute: u32,
    /// Window length in seconds
    pub window_seconds: u64,
    /// Ceiling overrides keyed by route id, e.g. `POST /v2/slp/validateTxid`
    pub route_overrides: HashMap<String, u32>,
    /// Ceiling overrides keyed by client IP address
    pub trusted_clients: HashMap<String, u32>,
    /// Identify clients by the left-most `X-Forwarded-For` entry
    pub trust_forwarded_for: bool,
    /// Admit requests whose client cannot be identified
    pub fail_open: bool,
    /// Maximum number of tracked (client, route) windows
    pub max_entries: usize,
}

impl Default for RateLimitingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_minute: 60,
            window_seconds: 60,
            route_overrides: HashMap::new(),
            trusted_clients: HashMap::new(),
            trust_forwarded_for: false,
            fail_open: false,
            max_entries: 10_000,
        }
    }
}

impl RateLimitingConfig {
    /// Window length as a duration
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_seconds)
    }
}

/// Bulk validation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Maximum number of items accepted in one bulk request
    pub max_bulk_size: usize,
    /// Maximum number of upstream calls in flight for one bulk request
    pub max_concurrency: usize,
    /// Per-item upstream call timeout in seconds
    pub call_timeout_seconds: u64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_bulk_size: 20,
            max_concurrency: 10,
            call_timeout_seconds: 20,
        }
    }
}

impl ValidationConfig {
    /// Per-item upstream call timeout as a duration
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_seconds)
    }
}

/// Document index connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SlpdbSettings {
    /// Base URL of the index service
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// Health check timeout in seconds
    pub health_check_timeout_seconds: u64,
    /// Retries for transient network failures
    pub max_retries: u32,
}

impl Default for SlpdbSettings {
    fn default() -> Self {
        Self {
            base_url: "https://slpdb.fountainhead.cash".to_string(),
            timeout_seconds: 15,
            health_check_timeout_seconds: 5,
            max_retries: 2,
        }
    }
}

/// Full node RPC connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeRpcSettings {
    /// JSON-RPC endpoint
    pub url: String,
    /// RPC username
    pub username: String,
    /// RPC password
    #[serde(skip_serializing)]
    pub password: String,
    /// RPC method used to validate one txid
    pub validate_method: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// Health check timeout in seconds
    pub health_check_timeout_seconds: u64,
    /// Retries for transient network failures
    pub max_retries: u32,
}

impl Default for NodeRpcSettings {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8332".to_string(),
            username: String::new(),
            password: String::new(),
            validate_method: "slpvalidate".to_string(),
            timeout_seconds: 15,
            health_check_timeout_seconds: 5,
            max_retries: 2,
        }
    }
}

/// Upstream service settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamsConfig {
    /// Token document index
    pub slpdb: SlpdbSettings,
    /// Transaction validator
    pub node_rpc: NodeRpcSettings,
}

impl UpstreamsConfig {
    /// Build the index client configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is blank
    pub fn slpdb_config(&self) -> Result<SlpdbConfig, String> {
        let mut config = SlpdbConfig::new(self.slpdb.base_url.as_str())?;
        config.timeout_seconds = self.slpdb.timeout_seconds;
        config.health_check_timeout_seconds = self.slpdb.health_check_timeout_seconds;
        config.max_retries = self.slpdb.max_retries;
        Ok(config)
    }

    /// Build the node RPC client configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the URL or validation method is blank
    pub fn node_rpc_config(&self) -> Result<NodeRpcConfig, String> {
        let settings = &self.node_rpc;
        let mut config = NodeRpcConfig::new(
            settings.url.as_str(),
            settings.username.as_str(),
            settings.password.as_str(),
        )?
        .with_validate_method(settings.validate_method.as_str())?;
        config.timeout_seconds = settings.timeout_seconds;
        config.health_check_timeout_seconds = settings.health_check_timeout_seconds;
        config.max_retries = settings.max_retries;
        Ok(config)
    }
}

/// Server configuration for different environments
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host address
    pub host: IpAddr,
    /// Server port (validated for environment compatibility)
    pub port: ServerPort,
    /// Request timeout in seconds (validated range: 1-300)
    pub timeout_seconds: TimeoutSeconds,
    /// Environment type
    pub environment: Environment,
    /// Network whose addresses this deployment accepts
    #[serde(default = "default_network")]
    pub network: Network,
    /// Rate limiting settings
    #[serde(default)]
    pub rate_limiting: RateLimitingConfig,
    /// Bulk validation settings
    #[serde(default)]
    pub validation: ValidationConfig,
    /// Upstream service settings
    #[serde(default)]
    pub upstreams: UpstreamsConfig,
}

fn default_network() -> Network {
    Network::Mainnet
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: ServerPort::default_development(),
            timeout_seconds: TimeoutSeconds::default(),
            environment: Environment::Development,
            network: default_network(),
            rate_limiting: RateLimitingConfig::default(),
            validation: ValidationConfig::default(),
            upstreams: UpstreamsConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Create configuration from environment variables and optional configuration files
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Config` if configuration is invalid or cannot be loaded.
    pub fn from_env() -> ServerResult<Self> {
        Self::load().map_err(|e| ServerError::Config {
            message: format!("failed to load configuration: {e}"),
        })
    }

    /// Load configuration using the config crate with hierarchical sources
    ///
    /// Configuration is loaded in the following order (later sources override earlier ones):
    /// 1. Default values
    /// 2. Configuration file (config.json)
    /// 3. Environment-specific files (config.{env}.json)
    /// 4. Environment variables with SERVER_ prefix, `__` separating nested keys
    ///    (`SERVER_RATE_LIMITING__REQUESTS_PER_MINUTE=120`)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if configuration cannot be loaded or is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let env_var = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let mut config_builder = Config::builder()
            // Start with default values
            .set_default("host", "127.0.0.1")?
            .set_default("port", 3000)?
            .set_default("timeout_seconds", 30)?
            .set_default("environment", "development")?
            .set_default("network", "mainnet")?
            // Add optional configuration files
            .add_source(File::with_name("config.json").required(false))
            // Add environment-specific config file
            .add_source(
                File::with_name(&format!("config.{}.json", env_var.to_lowercase())).required(false),
            )
            // Add environment variables with SERVER_ prefix
            .add_source(
                ConfigEnv::with_prefix("SERVER")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        if std::env::var("ENVIRONMENT").is_ok() {
            config_builder = config_builder.set_override("environment", env_var.to_lowercase())?;
        }

        let config = config_builder.build()?;
        let mut server_config: Self = config.try_deserialize()?;

        // Fix the ServerPort to have the correct environment context
        server_config.port = ServerPort::new(server_config.port.value(), server_config.environment)
            .map_err(|e| ConfigError::Message(format!("invalid port configuration: {e}")))?;

        server_config
            .validate()
            .map_err(|e| ConfigError::Message(format!("invalid configuration: {e}")))?;

        Ok(server_config)
    }

    /// Check limits that serde cannot express
    ///
    /// # Errors
    ///
    /// Returns an error naming the first invalid setting
    pub fn validate(&self) -> Result<()> {
        let limits = &self.rate_limiting;
        ensure!(
            limits.window_seconds > 0,
            "rate_limiting.window_seconds must be greater than 0"
        );
        ensure!(
            limits.max_entries > 0,
            "rate_limiting.max_entries must be greater than 0"
        );
        for client in limits.trusted_clients.keys() {
            client
                .parse::<IpAddr>()
                .map_err(|_| anyhow!("rate_limiting.trusted_clients: invalid IP address {client}"))?;
        }

        let validation = &self.validation;
        ensure!(
            validation.max_bulk_size > 0,
            "validation.max_bulk_size must be greater than 0"
        );
        ensure!(
            validation.max_concurrency > 0,
            "validation.max_concurrency must be greater than 0"
        );
        ensure!(
            validation.call_timeout_seconds > 0,
            "validation.call_timeout_seconds must be greater than 0"
        );

        if self.environment == Environment::Production {
            let node = &self.upstreams.node_rpc;
            ensure!(
                !node.username.is_empty() && !node.password.is_empty(),
                "upstreams.node_rpc credentials are required in production"
            );
        }

        Ok(())
    }

    /// Create configuration optimized for testing
    pub fn for_testing() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: ServerPort::testing(), // let OS choose available port
            timeout_seconds: TimeoutSeconds::testing(),
            environment: Environment::Testing,
            network: Network::Mainnet,
            rate_limiting: RateLimitingConfig::default(),
            validation: ValidationConfig {
                call_timeout_seconds: 2,
                ..ValidationConfig::default()
            },
            upstreams: UpstreamsConfig::default(),
        }
    }

    /// Get socket address for binding
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port.value())
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Production => write!(f, "production"),
            Environment::Development => write!(f, "development"),
            Environment::Testing => write!(f, "testing"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_validation() {
        // Invalid timeout values should fail to construct
        assert!(TimeoutSeconds::new(0).is_err());
        assert!(TimeoutSeconds::new(400).is_err());

        // Valid timeout values should construct successfully
        assert!(TimeoutSeconds::new(30).is_ok());
        assert!(TimeoutSeconds::new(1).is_ok());
        assert!(TimeoutSeconds::new(300).is_ok());
    }

    #[test]
    fn server_port_validation() {
        // Port 0 should only be valid in testing environment
        assert!(ServerPort::new(0, Environment::Testing).is_ok());
        assert!(ServerPort::new(0, Environment::Development).is_err());
        assert!(ServerPort::new(0, Environment::Production).is_err());

        // Non-zero ports should be valid in all environments
        assert!(ServerPort::new(3000, Environment::Development).is_ok());
        assert!(ServerPort::new(443, Environment::Production).is_ok());
    }

    #[test]
    fn environment_display() {
        assert_eq!(Environment::Production.to_string(), "production");
        assert_eq!(Environment::Development.to_string(), "development");
        assert_eq!(Environment::Testing.to_string(), "testing");
    }

    #[test]
    fn defaults_match_documented_limits() {
        let config = ServerConfig::default();
        assert_eq!(config.rate_limiting.requests_per_minute, 60);
        assert_eq!(config.rate_limiting.window(), Duration::from_secs(60));
        assert!(!config.rate_limiting.fail_open);
        assert_eq!(config.validation.max_bulk_size, 20);
        assert_eq!(config.validation.max_concurrency, 10);
        assert_eq!(config.network, Network::Mainnet);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_limits() {
        let mut config = ServerConfig::for_testing();
        config.validation.max_bulk_size = 0;
        assert!(config.validate().is_err());

        let mut config = ServerConfig::for_testing();
        config.rate_limiting.window_seconds = 0;
        assert!(config.validate().is_err());

        let mut config = ServerConfig::for_testing();
        config
            .rate_limiting
            .trusted_clients
            .insert("not-an-ip".to_string(), 100);
        assert!(config.validate().is_err());
    }

    #[test]
    fn production_requires_node_credentials() {
        let mut config = ServerConfig::default();
        config.environment = Environment::Production;
        assert!(config.validate().is_err());

        config.upstreams.node_rpc.username = "rpcuser".to_string();
        config.upstreams.node_rpc.password = "rpcpass".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn nested_sections_deserialize_with_defaults() {
        let json = serde_json::json!({
            "host": "0.0.0.0",
            "port": 8080,
            "timeout_seconds": 10,
            "environment": "development",
            "network": "testnet",
            "rate_limiting": { "requests_per_minute": 5 },
            "upstreams": { "node_rpc": { "validate_method": "validateslptx" } }
        });

        let config: ServerConfig = serde_json::from_value(json).unwrap();
        assert_eq!(config.network, Network::Testnet);
        assert_eq!(config.rate_limiting.requests_per_minute, 5);
        assert_eq!(config.rate_limiting.window_seconds, 60);
        assert_eq!(config.validation.max_bulk_size, 20);
        assert_eq!(
            config.upstreams.node_rpc_config().unwrap().validate_method.as_str(),
            "validateslptx"
        );
    }

    #[test]
    fn upstream_settings_build_client_configs() {
        let mut upstreams = UpstreamsConfig::default();
        upstreams.slpdb.max_retries = 0;
        assert_eq!(upstreams.slpdb_config().unwrap().max_retries, 0);

        upstreams.node_rpc.url = String::new();
        assert!(upstreams.node_rpc_config().is_err());
    }
}
