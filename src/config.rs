use std::env;
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BASE_DELAY_MS: u64 = 1000;
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Environment variables holding API keys, in fallback order
const API_KEY_VARS: [&str; 2] = ["API_KEY", "GEMINI_API_KEY_BACKUP"];

/// Settings for the image analyzer. Built once at startup and handed to
/// the analyzer; never read from the environment afterwards.
#[derive(Clone)]
pub struct AnalyzerConfig {
    pub api_keys: Vec<String>,
    pub model: String,
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub request_timeout: Duration,
}

impl AnalyzerConfig {
    pub fn new(api_keys: Vec<String>) -> Self {
        Self {
            api_keys,
            model: DEFAULT_MODEL.to_string(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(DEFAULT_BASE_DELAY_MS),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn from_env() -> Self {
        let lookup = |name: &str| env::var(name).ok();
        Self::from_lookup(lookup)
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_keys = API_KEY_VARS
            .iter()
            .filter_map(|name| lookup(*name))
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .collect::<Vec<_>>();

        if api_keys.is_empty() {
            log::warn!("⚠️ No API keys configured. Image analysis will fail until API_KEY is set.");
        }

        let mut config = Self::new(api_keys);

        if let Some(model) = lookup("GEMINI_MODEL").filter(|m| !m.trim().is_empty()) {
            config.model = model.trim().to_string();
        }

        if let Some(secs) = lookup("GEMINI_TIMEOUT_SECS").and_then(|s| s.trim().parse::<u64>().ok()) {
            config.request_timeout = Duration::from_secs(secs);
        }

        config
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

// Keys stay out of debug output and logs
impl std::fmt::Debug for AnalyzerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalyzerConfig")
            .field("api_keys", &format!("[{} key(s)]", self.api_keys.len()))
            .field("model", &self.model)
            .field("max_attempts", &self.max_attempts)
            .field("base_delay", &self.base_delay)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}
