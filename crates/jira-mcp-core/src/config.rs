//! Configuration management for jira-mcp.
//!
//! Non-secret settings can live in a TOML file stored in a platform-specific
//! location:
//!
//! - **macOS/Linux**: `~/.config/jira-mcp/config.toml`
//! - **Windows**: `%APPDATA%\jira-mcp\config.toml`
//!
//! Environment variables (`JIRA_HOST`, `JIRA_EMAIL`, `JIRA_API_TOKEN`,
//! `JIRA_FLAVOR`) override the file. The API token is only ever read from
//! the environment.
//!
//! # Example
//!
//! ```ignore
//! use jira_mcp_core::config::{Config, JiraSettings};
//!
//! let config = Config::load()?;
//! let settings = JiraSettings::from_env(&config)?;
//! println!("Connecting to {}", settings.host);
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Config file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Config directory name.
const CONFIG_DIR_NAME: &str = "jira-mcp";

/// Jira instance URL.
pub const ENV_HOST: &str = "JIRA_HOST";
/// Account email used for Basic auth.
pub const ENV_EMAIL: &str = "JIRA_EMAIL";
/// API token or personal access token.
pub const ENV_API_TOKEN: &str = "JIRA_API_TOKEN";
/// Optional API flavor override (`cloud` or `self_hosted`).
pub const ENV_FLAVOR: &str = "JIRA_FLAVOR";

// =============================================================================
// API flavor
// =============================================================================

/// Jira deployment flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiFlavor {
    /// Jira Cloud: API v3, ADF descriptions, accountId-based users
    Cloud,
    /// Jira Server / Data Center: API v2, plain text, username-based users
    SelfHosted,
}

impl ApiFlavor {
    /// Detect the flavor from the instance URL: `*.atlassian.net` is Cloud.
    pub fn detect(url: &str) -> Self {
        if url_host(url).ends_with(".atlassian.net") {
            ApiFlavor::Cloud
        } else {
            ApiFlavor::SelfHosted
        }
    }

    /// REST API version used by this flavor.
    pub fn api_version(self) -> u8 {
        match self {
            ApiFlavor::Cloud => 3,
            ApiFlavor::SelfHosted => 2,
        }
    }
}

/// Lowercased host of `url`, without userinfo or port.
fn url_host(url: &str) -> String {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    let host = authority.rsplit_once('@').map_or(authority, |(_, host)| host);
    let host = host.split_once(':').map_or(host, |(host, _)| host);
    host.trim_end_matches('.').to_ascii_lowercase()
}

impl FromStr for ApiFlavor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "cloud" => Ok(ApiFlavor::Cloud),
            "self_hosted" | "self-hosted" | "server" | "data_center" | "datacenter" => {
                Ok(ApiFlavor::SelfHosted)
            }
            other => Err(Error::Config(format!(
                "Unknown Jira flavor '{}'. Expected 'cloud' or 'self_hosted'",
                other
            ))),
        }
    }
}

impl fmt::Display for ApiFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiFlavor::Cloud => f.write_str("cloud"),
            ApiFlavor::SelfHosted => f.write_str("self_hosted"),
        }
    }
}

// =============================================================================
// Configuration file
// =============================================================================

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Jira configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jira: Option<JiraConfig>,
}

/// Non-secret Jira settings stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JiraConfig {
    /// Jira instance URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// User email (required for Basic auth)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Flavor override; detected from the URL when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flavor: Option<ApiFlavor>,
}

impl Config {
    /// Get the configuration directory path.
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join(CONFIG_DIR_NAME))
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))
    }

    /// Get the configuration file path.
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE_NAME))
    }

    /// Load configuration from the default location.
    ///
    /// Returns a default (empty) config if the file doesn't exist.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    ///
    /// Returns a default (empty) config if the file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = ?path, "Config file does not exist, using defaults");
            return Ok(Self::default());
        }

        debug!(path = ?path, "Loading config");

        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse config file: {}", e)))?;

        info!(path = ?path, "Config loaded successfully");
        Ok(config)
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        self.save_to(&path)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Config(format!("Failed to create config directory: {}", e)))?;
        }

        debug!(path = ?path, "Saving config");

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, contents)
            .map_err(|e| Error::Config(format!("Failed to write config file: {}", e)))?;

        info!(path = ?path, "Config saved successfully");
        Ok(())
    }

    /// Set a configuration value by key path.
    ///
    /// Key format: `jira.field` (e.g., `jira.url`, `jira.email`, `jira.flavor`)
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let field = jira_field(key)?;
        let config = self.jira.get_or_insert_with(JiraConfig::default);

        match field {
            "url" | "host" => config.url = Some(value.to_string()),
            "email" => config.email = Some(value.to_string()),
            "flavor" => config.flavor = Some(value.parse()?),
            _ => {
                return Err(Error::Config(format!(
                    "Unknown Jira config field: {}",
                    field
                )))
            }
        }

        Ok(())
    }

    /// Get a configuration value by key path.
    ///
    /// Key format: `jira.field` (e.g., `jira.url`, `jira.email`, `jira.flavor`)
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let field = jira_field(key)?;
        let Some(config) = &self.jira else {
            return Ok(None);
        };

        match field {
            "url" | "host" => Ok(config.url.clone()),
            "email" => Ok(config.email.clone()),
            "flavor" => Ok(config.flavor.map(|f| f.to_string())),
            _ => Err(Error::Config(format!(
                "Unknown Jira config field: {}",
                field
            ))),
        }
    }
}

/// Split `jira.field` and return the field name.
fn jira_field(key: &str) -> Result<&str> {
    match key.split_once('.') {
        Some(("jira", field)) if !field.is_empty() && !field.contains('.') => Ok(field),
        Some((section, _)) if section != "jira" => {
            Err(Error::Config(format!("Unknown config section: {}", section)))
        }
        _ => Err(Error::Config(format!(
            "Invalid config key '{}'. Expected format: jira.field",
            key
        ))),
    }
}

// =============================================================================
// Resolved settings
// =============================================================================

/// Validated settings needed to talk to Jira.
#[derive(Clone, PartialEq)]
pub struct JiraSettings {
    /// Instance URL with scheme and without trailing slash
    pub host: String,
    pub email: String,
    pub api_token: String,
    pub flavor: ApiFlavor,
}

impl fmt::Debug for JiraSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JiraSettings")
            .field("host", &self.host)
            .field("email", &self.email)
            .field("api_token", &"<hidden>")
            .field("flavor", &self.flavor)
            .finish()
    }
}

impl JiraSettings {
    /// Resolve settings from the config file and the process environment.
    pub fn from_env(config: &Config) -> Result<Self> {
        Self::resolve(config, |name| std::env::var(name).ok())
    }

    /// Resolve settings from the config file and an environment lookup.
    ///
    /// Environment values win over file values. Blank values count as missing.
    pub fn resolve<F>(config: &Config, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let file = config.jira.clone().unwrap_or_default();
        let non_blank = |v: Option<String>| {
            v.map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let host = env(ENV_HOST).or_else(|| non_blank(file.url));
        let email = env(ENV_EMAIL).or_else(|| non_blank(file.email));
        let api_token = env(ENV_API_TOKEN);

        let (host, email, api_token) = match (host, email, api_token) {
            (Some(host), Some(email), Some(token)) => (host, email, token),
            (host, email, token) => {
                let missing: Vec<&str> = [
                    (ENV_HOST, host.is_none()),
                    (ENV_EMAIL, email.is_none()),
                    (ENV_API_TOKEN, token.is_none()),
                ]
                .into_iter()
                .filter_map(|(name, is_missing)| is_missing.then_some(name))
                .collect();

                return Err(Error::Config(format!(
                    "Missing required environment variables: {}",
                    missing.join(", ")
                )));
            }
        };

        let host = normalize_host(&host);
        let flavor = match env(ENV_FLAVOR) {
            Some(value) => value.parse()?,
            None => file.flavor.unwrap_or_else(|| ApiFlavor::detect(&host)),
        };

        debug!(host = %host, flavor = %flavor, "Resolved Jira settings");

        Ok(Self {
            host,
            email,
            api_token,
            flavor,
        })
    }
}

/// Add `https://` when no scheme is given and drop trailing slashes.
fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.contains("://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

// =============================================================================
// Tests
// =============================================================================
