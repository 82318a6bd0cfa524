use serde::{Deserialize, Serialize};

use crate::settings::ChatSettings;

#[derive(Debug, Clone)]
pub struct Config {
    pub backend: BackendSettings,
    pub chat: ChatDefaults,
}

/// Connection settings for the chat/ingestion backend.
#[derive(Debug, Clone)]
pub struct BackendSettings {
    pub base_url: String,
    pub api_key: String,
    pub timeout_secs: u64,
    pub user_agent: String,
}

/// Default chat parameters; the interactive frontend may override them
/// per session.
#[derive(Debug, Clone)]
pub struct ChatDefaults {
    pub model: String,
    pub temperature: f32,
    pub reasoning_effort: String,
    pub token_limit: u32,
}

impl ChatDefaults {
    /// Snapshot in the shape the session controller consumes.
    pub fn settings(&self) -> ChatSettings {
        ChatSettings {
            model_id: self.model.clone(),
            temperature: self.temperature,
            reasoning_effort: self.reasoning_effort.clone(),
            token_limit: self.token_limit,
        }
    }
}

// File configuration types
#[derive(Debug, Deserialize)]
pub(super) struct FileConfig {
    #[serde(default)]
    pub backend: Option<FileBackendSettings>,
    #[serde(default)]
    pub chat: Option<FileChatDefaults>,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct FileBackendSettings {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub timeout_secs: Option<u64>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct FileChatDefaults {
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub reasoning_effort: Option<String>,
    pub token_limit: Option<u32>,
}

// Serialization helpers
#[derive(Serialize)]
pub(super) struct PersistedConfig<'a> {
    pub backend: PersistedBackend<'a>,
    pub chat: PersistedChat<'a>,
}

#[derive(Serialize)]
pub(super) struct PersistedBackend<'a> {
    pub base_url: &'a str,
    pub api_key: &'a str,
    pub timeout_secs: u64,
    pub user_agent: &'a str,
}

#[derive(Serialize)]
pub(super) struct PersistedChat<'a> {
    pub model: &'a str,
    pub temperature: f32,
    pub reasoning_effort: &'a str,
    pub token_limit: u32,
}

impl<'a> From<&'a Config> for PersistedConfig<'a> {
    fn from(config: &'a Config) -> Self {
        PersistedConfig {
            backend: PersistedBackend {
                base_url: &config.backend.base_url,
                api_key: &config.backend.api_key,
                timeout_secs: config.backend.timeout_secs,
                user_agent: &config.backend.user_agent,
            },
            chat: PersistedChat {
                model: &config.chat.model,
                temperature: config.chat.temperature,
                reasoning_effort: &config.chat.reasoning_effort,
                token_limit: config.chat.token_limit,
            },
        }
    }
}
