//! Config command handlers.

use anyhow::{Context, Result};
use loyalty_core::config::{self, Config};

pub fn path() {
    println!("{}", config::paths::config_path().display());
}

pub fn init() -> Result<()> {
    let config_path = config::paths::config_path();
    Config::init(&config_path)
        .with_context(|| format!("init config at {}", config_path.display()))?;
    println!("Created config at {}", config_path.display());
    Ok(())
}

/// Prints the effective values after environment overrides.
pub fn show() -> Result<()> {
    let config = Config::load().context("load config")?;
    println!("api_url = {}", config.api_url);
    println!("app_url = {}", config.app_url);
    println!(
        "stripe_publishable_key = {}",
        config.stripe_publishable_key.as_deref().unwrap_or("(not set)")
    );
    println!("is_trial = {}", config.is_trial);
    println!("request_timeout_secs = {}", config.request_timeout_secs);
    Ok(())
}

pub fn set_api_url(url: &str) -> Result<()> {
    let config_path = config::paths::config_path();
    Config::save_api_url(url)?;
    println!("✓ api_url set to {}", url.trim().trim_end_matches('/'));
    println!("  Config: {}", config_path.display());
    Ok(())
}
