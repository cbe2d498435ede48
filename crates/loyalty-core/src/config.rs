//! Configuration management.
//!
//! Loads configuration from ${LOYALTY_HOME}/config.toml with sensible defaults.
//! Environment variables win over the file for every value.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Env var overriding the backend base URL.
pub const API_URL_ENV: &str = "LOYALTY_API_URL";
/// Env var overriding the web app URL.
pub const APP_URL_ENV: &str = "LOYALTY_APP_URL";
/// Env var overriding the Stripe publishable key.
pub const STRIPE_KEY_ENV: &str = "LOYALTY_STRIPE_PUBLISHABLE_KEY";
/// Env var overriding trial mode.
pub const IS_TRIAL_ENV: &str = "LOYALTY_IS_TRIAL";

/// Returns the default config template with comments.
///
/// Embedded from default_config.toml at compile time.
fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

pub mod paths {
    //! Path resolution for configuration and storage directories.
    //!
    //! LOYALTY_HOME resolution order:
    //! 1. LOYALTY_HOME environment variable (if set)
    //! 2. ~/.config/loyalty (default)
    //! 3. ./.loyalty when no home directory can be determined

    use std::path::PathBuf;

    /// Returns the loyalty home directory.
    pub fn loyalty_home() -> PathBuf {
        if let Ok(home) = std::env::var("LOYALTY_HOME")
            && !home.trim().is_empty()
        {
            return PathBuf::from(home);
        }

        dirs::home_dir().map_or_else(
            || PathBuf::from(".loyalty"),
            |h| h.join(".config").join("loyalty"),
        )
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        loyalty_home().join("config.toml")
    }

    /// Returns the directory holding persisted key/value entries.
    pub fn storage_dir() -> PathBuf {
        loyalty_home().join("storage")
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the backend REST API
    pub api_url: String,

    /// Public URL of the web app
    pub app_url: String,

    /// Stripe publishable key (optional)
    pub stripe_publishable_key: Option<String>,

    /// Trial deployment flag
    pub is_trial: bool,

    /// HTTP request timeout in seconds (0 uses the client default)
    pub request_timeout_secs: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: Self::DEFAULT_API_URL.to_string(),
            app_url: Self::DEFAULT_APP_URL.to_string(),
            stripe_publishable_key: None,
            is_trial: false,
            request_timeout_secs: 0,
        }
    }
}

impl Config {
    const DEFAULT_API_URL: &str = "http://localhost:3001";
    const DEFAULT_APP_URL: &str = "http://localhost:3000";

    /// Loads configuration from the default config path and applies env overrides.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed, or if an
    /// override holds an invalid URL.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&paths::config_path())?;
        config.apply_env()?;
        Ok(config)
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Applies environment overrides on top of file values.
    ///
    /// # Errors
    /// Returns an error if a URL override is malformed.
    pub fn apply_env(&mut self) -> Result<()> {
        self.api_url = resolve_url(Some(&self.api_url), API_URL_ENV, Self::DEFAULT_API_URL)?;
        self.app_url = resolve_url(Some(&self.app_url), APP_URL_ENV, Self::DEFAULT_APP_URL)?;

        if let Some(key) = non_empty_env(STRIPE_KEY_ENV) {
            self.stripe_publishable_key = Some(key);
        }
        if let Some(flag) = non_empty_env(IS_TRIAL_ENV) {
            self.is_trial = parse_flag(&flag);
        }
        Ok(())
    }

    /// Returns the configured request timeout, if any.
    pub fn request_timeout(&self) -> Option<Duration> {
        if self.request_timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(u64::from(self.request_timeout_secs)))
        }
    }

    /// Creates a default config file at the given path.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be written.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }

        Self::write_config(path, default_config_template())
    }

    /// Saves only the api_url field to the config file.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the file cannot be written.
    pub fn save_api_url(url: &str) -> Result<()> {
        Self::save_api_url_to(&paths::config_path(), url)
    }

    /// Saves only the api_url field to a specific config file path.
    ///
    /// Creates the file from the default template if it doesn't exist.
    /// Preserves existing fields and comments using toml_edit.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the file cannot be written.
    pub fn save_api_url_to(path: &Path, url: &str) -> Result<()> {
        use toml_edit::{DocumentMut, value};

        let trimmed = url.trim().trim_end_matches('/');
        validate_url(trimmed)?;

        let contents = if path.exists() {
            fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?
        } else {
            default_config_template().to_string()
        };

        let mut doc: DocumentMut = contents
            .parse()
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;

        doc["api_url"] = value(trimmed);

        Self::write_config(path, &doc.to_string())
    }

    fn write_config(path: &Path, contents: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        fs::write(path, contents)
            .with_context(|| format!("Failed to write config to {}", path.display()))
    }
}

/// Resolves a URL with precedence: env > config > default.
fn resolve_url(config_url: Option<&str>, env_var: &str, default_url: &str) -> Result<String> {
    if let Some(env_url) = non_empty_env(env_var) {
        validate_url(&env_url)
            .with_context(|| format!("Invalid value in {env_var}"))?;
        return Ok(env_url.trim_end_matches('/').to_string());
    }

    if let Some(config_url) = config_url {
        let trimmed = config_url.trim();
        if !trimmed.is_empty() {
            validate_url(trimmed)?;
            return Ok(trimmed.trim_end_matches('/').to_string());
        }
    }

    Ok(default_url.to_string())
}

fn validate_url(url: &str) -> Result<()> {
    url::Url::parse(url).with_context(|| format!("Invalid base URL: {url}"))?;
    Ok(())
}

fn non_empty_env(var: &str) -> Option<String> {
    std::env::var(var)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
