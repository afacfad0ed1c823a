use anyhow::{Context, Result};
use std::env;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Dev,
    Staging,
    Prod,
}

impl Environment {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "prod" | "production" => Self::Prod,
            "staging" => Self::Staging,
            _ => Self::Dev,
        }
    }

    pub fn is_dev(&self) -> bool {
        matches!(self, Self::Dev)
    }

    pub fn is_prod(&self) -> bool {
        matches!(self, Self::Prod)
    }
}

/// Credentials and tuning for the language-model API.
///
/// Only present when a key is configured; without it the service runs in
/// degraded mode and answers analysis requests with `AI_NOT_CONFIGURED`.
#[derive(Clone)]
pub struct AiSettings {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout_seconds: u64,
    pub max_tokens: u32,
    pub max_input_chars: usize,
}

impl std::fmt::Debug for AiSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiSettings")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout_seconds", &self.timeout_seconds)
            .field("max_tokens", &self.max_tokens)
            .field("max_input_chars", &self.max_input_chars)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub env: Environment,
    pub server_addr: String,

    // CORS
    pub cors_allow_origins: Vec<String>,

    // Uploads
    pub max_upload_bytes: u64,

    // Rate limiting
    pub rate_limit_max_requests: usize,
    pub rate_limit_window_seconds: u64,
    pub trust_proxy: bool,

    // AI Service
    pub ai: Option<AiSettings>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            env: Environment::Dev,
            server_addr: "0.0.0.0:5000".to_string(),
            cors_allow_origins: vec!["http://localhost:3000".to_string()],
            max_upload_bytes: 10 * 1024 * 1024,
            rate_limit_max_requests: 10,
            rate_limit_window_seconds: 15 * 60,
            trust_proxy: false,
            ai: None,
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let defaults = Settings::default();

        let env = Environment::from_str(&env::var("ENV").unwrap_or_else(|_| "dev".to_string()));
        let server_addr = env::var("SERVER_ADDR").unwrap_or(defaults.server_addr);

        // CORS
        let cors_allow_origins = env::var("CORS_ALLOW_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        // Uploads
        let max_upload_bytes = parse_var("MAX_UPLOAD_BYTES").unwrap_or(defaults.max_upload_bytes);

        // Rate limiting
        let rate_limit_max_requests =
            parse_var("RATE_LIMIT_MAX_REQUESTS").unwrap_or(defaults.rate_limit_max_requests);
        let rate_limit_window_seconds =
            parse_var("RATE_LIMIT_WINDOW_SECONDS").unwrap_or(defaults.rate_limit_window_seconds);
        let trust_proxy = env::var("TRUST_PROXY")
            .map(|s| matches!(s.to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        // AI Service
        let ai = match non_empty_var("OPENAI_API_KEY").or_else(|| non_empty_var("AI_API_KEY")) {
            Some(api_key) => {
                let base_url = env::var("AI_API_BASE_URL")
                    .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
                url::Url::parse(&base_url)
                    .with_context(|| format!("AI_API_BASE_URL is not a valid URL: {}", base_url))?;

                Some(AiSettings {
                    api_key,
                    base_url,
                    model: env::var("AI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
                    timeout_seconds: parse_var("AI_TIMEOUT_SECONDS").unwrap_or(120), // LLM calls are slow
                    max_tokens: parse_var("AI_MAX_TOKENS").unwrap_or(1500),
                    max_input_chars: parse_var("AI_MAX_INPUT_CHARS").unwrap_or(12_000),
                })
            }
            None => None,
        };

        Ok(Settings {
            env,
            server_addr,
            cors_allow_origins,
            max_upload_bytes,
            rate_limit_max_requests,
            rate_limit_window_seconds,
            trust_proxy,
            ai,
        })
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
