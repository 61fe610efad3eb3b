//! CLI Configuration.
//!
//! Settings for the `digital-safe` tool, stored as JSON in the data
//! directory and overridable from the environment.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::utils::constants::{DEFAULT_FEE_PER_SECOND, FEE_SCALE, NATIVE_DECIMALS};

/// Environment variable overriding the data directory
pub const ENV_DATA_DIR: &str = "SAFE_DATA_DIR";

/// Environment variable overriding the fee rate of new ledgers
pub const ENV_FEE_PER_SECOND: &str = "SAFE_FEE_PER_SECOND";

// ═══════════════════════════════════════════════════════════════════════════════
// CLI CONFIGURATION
// ═══════════════════════════════════════════════════════════════════════════════

/// CLI Configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliConfig {
    /// Data directory holding keys, config and the ledger file
    pub data_dir: PathBuf,
    /// Fee rate used when a new ledger is initialized
    pub fee_per_second: u128,
    /// Default identity operations are signed as
    pub default_identity: String,
    /// Decimals used when parsing and printing amounts
    pub display_decimals: u8,
    /// Ask before irreversible operations
    pub confirm: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            fee_per_second: DEFAULT_FEE_PER_SECOND,
            default_identity: "operator".into(),
            display_decimals: NATIVE_DECIMALS,
            confirm: true,
        }
    }
}

impl CliConfig {
    /// File name of the config inside the data directory
    pub const FILE_NAME: &'static str = "config.json";

    /// Configuration rooted at `data_dir`
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }

    /// Load from file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Save to file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content =
            serde_json::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Io(e.to_string()))?;
        }

        std::fs::write(path, content).map_err(|e| ConfigError::Io(e.to_string()))
    }

    /// Defaults with environment overrides applied
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides looked up through `lookup`
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(ENV_DATA_DIR) {
            self.data_dir = PathBuf::from(dir);
        }

        if let Some(rate) = lookup(ENV_FEE_PER_SECOND) {
            self.fee_per_second = rate.trim().parse().map_err(|_| {
                ConfigError::Validation(format!("{} is not an integer: {}", ENV_FEE_PER_SECOND, rate))
            })?;
        }

        Ok(self)
    }

    /// Load the config saved in the data directory, falling back to `self`
    pub fn load_or(self) -> Result<Self, ConfigError> {
        let path = self.path();
        if !path.exists() {
            return Ok(self);
        }
        let mut saved = Self::load(&path)?;
        // The directory the file was found in wins over whatever it recorded.
        saved.data_dir = self.data_dir;
        Ok(saved)
    }

    /// Path of the config file
    pub fn path(&self) -> PathBuf {
        self.data_dir.join(Self::FILE_NAME)
    }

    /// Directory holding identity key files
    pub fn keys_dir(&self) -> PathBuf {
        self.data_dir.join("keys")
    }

    /// Directory holding the ledger store
    pub fn ledger_dir(&self) -> PathBuf {
        self.data_dir.join("ledger")
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(ConfigError::Validation("Data directory cannot be empty".into()));
        }

        if self.fee_per_second >= FEE_SCALE {
            return Err(ConfigError::Validation(format!(
                "Fee per second must be below {}",
                FEE_SCALE
            )));
        }

        if self.default_identity.is_empty() {
            return Err(ConfigError::Validation("Default identity cannot be empty".into()));
        }

        if self.display_decimals > 28 {
            return Err(ConfigError::Validation("Display decimals must be at most 28".into()));
        }

        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONFIG ERROR
// ═══════════════════════════════════════════════════════════════════════════════

/// Configuration error
#[derive(Debug, Clone)]
pub enum ConfigError {
    /// IO error
    Io(String),
    /// Parse error
    Parse(String),
    /// Serialization error
    Serialize(String),
    /// Validation error
    Validation(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(msg) => write!(f, "IO error: {}", msg),
            ConfigError::Parse(msg) => write!(f, "Parse error: {}", msg),
            ConfigError::Serialize(msg) => write!(f, "Serialization error: {}", msg),
            ConfigError::Validation(msg) => write!(f, "Validation error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

// ═══════════════════════════════════════════════════════════════════════════════
// HELPER FUNCTIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Get default data directory
fn default_data_dir() -> PathBuf {
    #[cfg(target_os = "macos")]
    {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join("Library/Application Support/DigitalSafe");
        }
    }

    #[cfg(target_os = "windows")]
    {
        if let Ok(appdata) = std::env::var("APPDATA") {
            return PathBuf::from(appdata).join("DigitalSafe");
        }
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(".digital-safe");
        }
    }

    PathBuf::from(".digital-safe")
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_config_default() {
        let config = CliConfig::default();
        assert_eq!(config.fee_per_second, DEFAULT_FEE_PER_SECOND);
        assert_eq!(config.display_decimals, 18);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> =
            [(ENV_DATA_DIR, "/tmp/safe"), (ENV_FEE_PER_SECOND, "42")].into_iter().collect();
        let config = CliConfig::default()
            .with_env_overrides(|name| env.get(name).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/safe"));
        assert_eq!(config.fee_per_second, 42);

        let bad = CliConfig::default().with_env_overrides(|name| {
            (name == ENV_FEE_PER_SECOND).then(|| "fast".to_string())
        });
        assert!(matches!(bad, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_config_validation() {
        let mut config = CliConfig::default();
        config.fee_per_second = FEE_SCALE;
        assert!(config.validate().is_err());

        let mut config = CliConfig::default();
        config.default_identity = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut config = CliConfig::new(temp_dir.path());
        config.fee_per_second = 7;
        config.save(&config.path()).unwrap();

        let loaded = CliConfig::new(temp_dir.path()).load_or().unwrap();
        assert_eq!(loaded, config);

        let fresh = tempfile::tempdir().unwrap();
        let fallback = CliConfig::new(fresh.path()).load_or().unwrap();
        assert_eq!(fallback.fee_per_second, DEFAULT_FEE_PER_SECOND);
    }
}
