use anyhow::Result;

use super::types::{BackendSettings, ChatDefaults, Config};

#[derive(Debug)]
pub struct ConfigBuilder {
    pub(super) backend: BackendSettings,
    pub(super) chat: ChatDefaults,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            backend: BackendSettings::default(),
            chat: ChatDefaults::default(),
        }
    }

    pub fn with_backend<F>(mut self, update: F) -> Self
    where
        F: FnOnce(&mut BackendSettings),
    {
        update(&mut self.backend);
        self
    }

    pub fn with_chat<F>(mut self, update: F) -> Self
    where
        F: FnOnce(&mut ChatDefaults),
    {
        update(&mut self.chat);
        self
    }

    pub fn build(self) -> Result<Config> {
        Ok(Config {
            backend: self.backend,
            chat: self.chat,
        })
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
