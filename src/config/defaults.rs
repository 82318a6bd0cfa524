use super::constants::*;
use super::types::{BackendSettings, ChatDefaults};
use crate::budget::DEFAULT_MODEL;

pub fn default_user_agent() -> String {
    format!("docchat/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: String::new(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: default_user_agent(),
        }
    }
}

impl Default for ChatDefaults {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            reasoning_effort: DEFAULT_REASONING_EFFORT.to_string(),
            token_limit: DEFAULT_TOKEN_LIMIT,
        }
    }
}
