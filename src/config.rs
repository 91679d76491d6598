use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use crate::error::ConfigError;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub rpc: RpcConfig,
    pub processing: ProcessingConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
    /// Environment variables that replaced a file or default value
    #[serde(skip)]
    pub env_overrides: Vec<String>,
}

/// RPC client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    /// Solana JSON-RPC endpoint URL
    pub endpoint: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// Commitment level for getSlot and getBlock
    pub commitment: String,
}

/// Transaction classification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// A transaction is significant when its estimated amount is strictly above this (SOL)
    pub threshold_sol: f64,
    /// Passed to getBlock so versioned transactions are returned
    pub max_supported_transaction_version: u8,
}

/// Output file configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Destination of the significant transaction document
    pub path: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.mainnet-beta.solana.com".to_string(),
            timeout_seconds: 30,
            commitment: "finalized".to_string(),
        }
    }
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            // Older notes mention 5 SOL; 0.5 is the threshold actually applied.
            threshold_sol: 0.5,
            max_supported_transaction_version: 0,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: "significant_transactions.json".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file and environment variables
    /// Environment variables take precedence over file values
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from_file()?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from TOML file, defaults when the file does not exist
    pub fn load_from_file() -> Result<Self, ConfigError> {
        let config_path = env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".to_string());

        if !Path::new(&config_path).exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| ConfigError::FileNotFound(config_path.clone()))?;
        toml::from_str(&content).map_err(|e| ConfigError::Parsing(e.to_string()))
    }

    /// Apply environment variable overrides, recording each variable applied
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(endpoint) = self.env_override("SOLANA_RPC_URL") {
            self.rpc.endpoint = endpoint;
        }
        if let Some(timeout) = self.env_override("RPC_TIMEOUT_SECONDS") {
            self.rpc.timeout_seconds = timeout.parse()
                .map_err(|_| ConfigError::InvalidValue {
                    key: "RPC_TIMEOUT_SECONDS".to_string(),
                    value: timeout,
                })?;
        }
        if let Some(commitment) = self.env_override("RPC_COMMITMENT") {
            self.rpc.commitment = commitment;
        }

        if let Some(threshold) = self.env_override("THRESHOLD_SOL") {
            self.processing.threshold_sol = threshold.parse()
                .map_err(|_| ConfigError::InvalidValue {
                    key: "THRESHOLD_SOL".to_string(),
                    value: threshold,
                })?;
        }

        if let Some(path) = self.env_override("OUTPUT_PATH") {
            self.output.path = path;
        }

        if let Some(level) = self.env_override("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = self.env_override("LOG_FORMAT") {
            self.logging.format = format;
        }

        Ok(())
    }

    fn env_override(&mut self, key: &str) -> Option<String> {
        let value = env::var(key).ok()?;
        if !self.env_overrides.iter().any(|k| k == key) {
            self.env_overrides.push(key.to_string());
        }
        Some(value)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.rpc.endpoint.starts_with("http://") && !self.rpc.endpoint.starts_with("https://") {
            return Err(ConfigError::InvalidUrl(self.rpc.endpoint.clone()));
        }

        if self.rpc.timeout_seconds == 0 || self.rpc.timeout_seconds > 300 {
            return Err(ConfigError::InvalidValue {
                key: "rpc.timeout_seconds".to_string(),
                value: self.rpc.timeout_seconds.to_string(),
            });
        }

        let valid_commitments = ["processed", "confirmed", "finalized"];
        if !valid_commitments.contains(&self.rpc.commitment.as_str()) {
            return Err(ConfigError::InvalidValue {
                key: "rpc.commitment".to_string(),
                value: self.rpc.commitment.clone(),
            });
        }

        if !self.processing.threshold_sol.is_finite() || self.processing.threshold_sol < 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "processing.threshold_sol".to_string(),
                value: self.processing.threshold_sol.to_string(),
            });
        }

        if self.output.path.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "output.path".to_string(),
                value: self.output.path.clone(),
            });
        }

        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::InvalidValue {
                key: "logging.level".to_string(),
                value: self.logging.level.clone(),
            });
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(ConfigError::InvalidValue {
                key: "logging.format".to_string(),
                value: self.logging.format.clone(),
            });
        }

        Ok(())
    }

    /// Generate a sample configuration file
    pub fn generate_sample_config() -> Result<String, ConfigError> {
        let config = Self::default();
        toml::to_string_pretty(&config)
            .map_err(|e| ConfigError::Parsing(e.to_string()))
    }
}
