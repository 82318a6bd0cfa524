//! Configuration for the docchat CLI and backend client.
//!
//! Sources, in increasing precedence: built-in defaults, the JSON config
//! file at `~/.docchat/config`, and `DOCCHAT_*` environment variables.
//! Validation runs at load time so a bad model id or temperature fails at
//! startup, not on the first message.

mod builder;
mod constants;
mod defaults;
mod environment;
mod loader;
mod types;
mod validation;

pub use types::{BackendSettings, ChatDefaults, Config};

pub use constants::{DEFAULT_BASE_URL, DEFAULT_TOKEN_LIMIT};
