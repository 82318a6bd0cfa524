use anyhow::{Result, anyhow};

use super::types::Config;
use crate::budget::resolve_budget;

/// Startup validation. Configuration problems surface here, before the
/// first message, rather than mid-conversation.
pub fn validate(config: &Config) -> Result<()> {
    if config.backend.api_key.trim().is_empty() {
        return Err(anyhow!(
            "Backend API key not found. Set DOCCHAT_API_KEY or add it to {}",
            Config::config_path()?.display()
        ));
    }

    if config.backend.base_url.trim().is_empty() {
        return Err(anyhow!("Backend base URL must not be empty"));
    }

    if !(0.0..=1.0).contains(&config.chat.temperature) {
        return Err(anyhow!(
            "Temperature {} is out of range (expected 0.0..=1.0)",
            config.chat.temperature
        ));
    }

    if config.chat.token_limit == 0 {
        return Err(anyhow!("Token limit must be greater than zero"));
    }

    // An unknown model would silently fall back to the default budget on
    // every exchange; reject it up front instead.
    resolve_budget(&config.chat.model)
        .map_err(|err| anyhow!("{err}. Run 'docchat models' to list the supported models"))?;

    Ok(())
}
