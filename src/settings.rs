//! Chat settings consumed by the session controller.
//!
//! The settings panel (or CLI flags) is an external configuration
//! producer; the controller only reads a snapshot at the start of every
//! `send_message`, so mid-conversation changes take effect on the next
//! message without touching an in-flight exchange.

use std::sync::RwLock;

/// Read-only snapshot of the values an exchange is parameterized with.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatSettings {
    pub model_id: String,
    /// Sampling temperature in `0..=1`.
    pub temperature: f32,
    pub reasoning_effort: String,
    /// Completion token cap passed through to the backend.
    pub token_limit: u32,
}

/// Source of the current settings snapshot, re-read per send.
pub trait SettingsSource: Send + Sync {
    fn snapshot(&self) -> ChatSettings;
}

/// Fixed settings, handy for non-interactive callers and tests.
#[derive(Debug, Clone)]
pub struct StaticSettings(pub ChatSettings);

impl SettingsSource for StaticSettings {
    fn snapshot(&self) -> ChatSettings {
        self.0.clone()
    }
}

/// Settings behind a lock so an interactive frontend can change the model
/// or temperature between messages while the controller holds a reference.
#[derive(Debug)]
pub struct SharedSettings {
    inner: RwLock<ChatSettings>,
}

impl SharedSettings {
    pub fn new(settings: ChatSettings) -> Self {
        Self {
            inner: RwLock::new(settings),
        }
    }

    pub fn update<F>(&self, update: F)
    where
        F: FnOnce(&mut ChatSettings),
    {
        let mut guard = self.inner.write().expect("settings lock poisoned");
        update(&mut guard);
    }
}

impl SettingsSource for SharedSettings {
    fn snapshot(&self) -> ChatSettings {
        self.inner.read().expect("settings lock poisoned").clone()
    }
}
