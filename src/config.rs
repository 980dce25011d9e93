use anyhow::{Context, Result, bail};
use ebkit::{Equivalence, EquivalenceTable, WaitConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_WAIT_TIMEOUT: u64 = 900;
const DEFAULT_POLL_INTERVAL: u64 = 15;

/// Get the config directory path
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join("stalkctl"))
}

/// Get the default config file path
pub fn default_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

// ============================================================================
// Config File
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Control plane base URL
    pub endpoint: Option<String>,
    /// Seconds to wait for each mutation to become visible
    pub wait_timeout: u64,
    /// Seconds between polls
    pub poll_interval: u64,
    /// Extra rules merged over the built-in equivalence table
    pub equivalence: Vec<EquivalenceRule>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquivalenceRule {
    pub namespace: String,
    pub option: String,
    pub strategy: Equivalence,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: None,
            wait_timeout: DEFAULT_WAIT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            equivalence: Vec::new(),
        }
    }
}

impl Config {
    /// Load the config file.
    ///
    /// An explicit path must exist; a missing default file means defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let path = default_path()?;
                if !path.exists() {
                    log::debug!("No config at {}, using defaults", path.display());
                    return Ok(Self::default());
                }
                path
            }
        };
        Self::load_from(&path)
    }

    /// Load a specific config file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("Invalid config in {}", path.display()))
    }

    /// Parse config from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        if config.poll_interval == 0 {
            bail!("poll_interval must be at least 1 second");
        }
        Ok(config)
    }

    /// Built-in equivalence rules with the configured ones applied on top
    pub fn equivalence_table(&self) -> EquivalenceTable {
        let mut table = EquivalenceTable::platform_defaults();
        for rule in &self.equivalence {
            table.insert(&rule.namespace, &rule.option, rule.strategy);
        }
        table
    }

    /// Waiter settings, with an optional per-command timeout override
    pub fn wait_config(&self, timeout_override: Option<u64>) -> WaitConfig {
        WaitConfig::new(
            Duration::from_secs(timeout_override.unwrap_or(self.wait_timeout)),
            Duration::from_secs(self.poll_interval),
        )
    }

    /// Pick the endpoint: flag or environment first, then the config file
    pub fn endpoint<'a>(&'a self, flag: Option<&'a str>) -> Result<&'a str> {
        flag.or(self.endpoint.as_deref()).context(
            "No endpoint configured; pass --endpoint, set STALKCTL_ENDPOINT or add `endpoint` to the config file",
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
