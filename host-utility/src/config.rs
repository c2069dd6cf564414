// Configuration management for the PhenoCam installation tool
//
// Operator-side defaults (SSH account, timeouts, where the camera build of
// the agent lives) are stored as JSON under the XDG config directory. The
// camera itself is configured entirely through command-line flags.

use anyhow::{Context, Result};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::constants::{DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_SSH_PORT, DEFAULT_SSH_USER};
use phenocam_lib::paths::AGENT_FILE_NAME;

const CONFIG_VERSION: u32 = 1;

/// PIT configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PitConfig {
    /// Configuration schema version for future migrations
    pub version: u32,

    /// SSH account on the camera
    pub ssh_user: String,

    pub ssh_port: u16,

    /// SSH and HTTP connect timeout
    pub connect_timeout_secs: u64,

    /// Camera (ARM) build of `phenocam-agent` bundled into the payload
    pub agent_binary: Option<PathBuf>,

    /// Where retrieved public keys are written
    pub key_output_dir: Option<PathBuf>,
}

impl Default for PitConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            ssh_user: DEFAULT_SSH_USER.to_string(),
            ssh_port: DEFAULT_SSH_PORT,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            agent_binary: None,
            key_output_dir: None,
        }
    }
}

impl PitConfig {
    /// Load configuration, falling back to defaults
    ///
    /// A missing file is normal. An unreadable or invalid one is reported
    /// and ignored so a broken config never blocks a field install.
    pub fn load() -> Self {
        let Ok(config_path) = Self::config_path() else {
            return Self::default();
        };
        if !config_path.exists() {
            // Seed the file so operators have something to edit
            let config = Self::default();
            match config.save_to(&config_path) {
                Ok(()) => log::info!("Wrote default config to {}", config_path.display()),
                Err(e) => log::debug!("Not saving default config: {e:#}"),
            }
            return config;
        }

        match Self::load_from_file(&config_path) {
            Ok(config) => {
                if let Err(e) = config.validate() {
                    eprintln!(
                        "{} Configuration validation failed: {}",
                        "Warning:".yellow().bold(),
                        e
                    );
                    eprintln!("  Using defaults; fix {}", config_path.display());
                    return Self::default();
                }
                config
            }
            Err(e) => {
                eprintln!(
                    "{} Failed to load config file: {:#}",
                    "Warning:".yellow().bold(),
                    e
                );
                Self::default()
            }
        }
    }

    fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Save configuration to `path`
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content =
            serde_json::to_string_pretty(self).context("Failed to serialize configuration")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))
    }

    /// Get the XDG-compliant configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to determine config directory (XDG_CONFIG_HOME or ~/.config)")?;

        Ok(config_dir.join("pit").join("config.json"))
    }

    pub fn validate(&self) -> Result<()> {
        if self.version > CONFIG_VERSION {
            anyhow::bail!(
                "Config version {} is newer than this pit ({CONFIG_VERSION})",
                self.version
            );
        }
        if self.ssh_user.trim().is_empty() {
            anyhow::bail!("ssh_user must not be empty");
        }
        if self.ssh_port == 0 {
            anyhow::bail!("ssh_port must be non-zero");
        }
        if self.connect_timeout_secs == 0 {
            anyhow::bail!("connect_timeout_secs must be at least 1");
        }
        Ok(())
    }

    /// Agent binary to bundle: configured path, else next to the `pit` executable
    pub fn agent_binary(&self) -> Result<PathBuf> {
        if let Some(path) = &self.agent_binary {
            return expand_path(path);
        }
        let exe = std::env::current_exe().context("Failed to locate the pit executable")?;
        let dir = exe
            .parent()
            .context("pit executable has no parent directory")?;
        Ok(dir.join(AGENT_FILE_NAME))
    }

    pub fn key_output_dir(&self) -> Result<PathBuf> {
        match &self.key_output_dir {
            Some(path) => expand_path(path),
            None => Ok(PathBuf::from(".")),
        }
    }
}

/// Expand `~` and environment variables in a configured path
fn expand_path(path: &Path) -> Result<PathBuf> {
    let raw = path.to_string_lossy();
    let expanded = shellexpand::full(&raw)
        .with_context(|| format!("Failed to expand path: {raw}"))?;
    Ok(PathBuf::from(expanded.as_ref()))
}
