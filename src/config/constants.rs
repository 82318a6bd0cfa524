pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_TEMPERATURE: f32 = 0.2;
pub const DEFAULT_REASONING_EFFORT: &str = "medium";
pub const DEFAULT_TOKEN_LIMIT: u32 = 2048;
pub const DEFAULT_BASE_URL: &str = "https://api.docchat.dev/v1";
