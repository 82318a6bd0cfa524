use anyhow::{Context, Result, anyhow};
use std::env;

use super::builder::ConfigBuilder;

pub fn apply_env_overrides(mut builder: ConfigBuilder) -> Result<ConfigBuilder> {
    if let Some(base_url) = env_string("DOCCHAT_BASE_URL")? {
        builder = builder.with_backend(|backend| backend.base_url = base_url.clone());
    }

    if let Some(api_key) = env_string("DOCCHAT_API_KEY")? {
        builder = builder.with_backend(|backend| backend.api_key = api_key.clone());
    }

    if let Some(timeout) = env_u64("DOCCHAT_TIMEOUT_SECS")? {
        builder = builder.with_backend(|backend| backend.timeout_secs = timeout);
    }

    if let Some(model) = env_string("DOCCHAT_MODEL")? {
        builder = builder.with_chat(|chat| chat.model = model.clone());
    }

    if let Some(temperature) = env_f32("DOCCHAT_TEMPERATURE")? {
        builder = builder.with_chat(|chat| chat.temperature = temperature);
    }

    if let Some(effort) = env_string("DOCCHAT_REASONING_EFFORT")? {
        builder = builder.with_chat(|chat| chat.reasoning_effort = effort.clone());
    }

    if let Some(token_limit) = env_u32("DOCCHAT_TOKEN_LIMIT")? {
        builder = builder.with_chat(|chat| chat.token_limit = token_limit);
    }

    Ok(builder)
}

pub fn env_string(key: &str) -> Result<Option<String>> {
    match env::var(key) {
        Ok(val) => Ok(Some(val)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(env::VarError::NotUnicode(_)) => Err(anyhow!("{key} contains invalid UTF-8")),
    }
}

pub fn env_u64(key: &str) -> Result<Option<u64>> {
    if let Some(value) = env_string(key)? {
        let parsed = value
            .parse::<u64>()
            .with_context(|| format!("Failed to parse {key} as u64"))?;
        Ok(Some(parsed))
    } else {
        Ok(None)
    }
}

pub fn env_u32(key: &str) -> Result<Option<u32>> {
    if let Some(value) = env_string(key)? {
        let parsed = value
            .parse::<u32>()
            .with_context(|| format!("Failed to parse {key} as u32"))?;
        Ok(Some(parsed))
    } else {
        Ok(None)
    }
}

pub fn env_f32(key: &str) -> Result<Option<f32>> {
    if let Some(value) = env_string(key)? {
        let parsed = value
            .parse::<f32>()
            .with_context(|| format!("Failed to parse {key} as f32"))?;
        Ok(Some(parsed))
    } else {
        Ok(None)
    }
}
