use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

/// Main configuration structure for the weather agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub forecast: ForecastConfig,
    #[serde(default)]
    pub summary: SummaryConfig,
    #[serde(default)]
    pub cities: CitiesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind: String,
    #[serde(default)]
    pub bearer_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// OpenAI-compatible API root, `/chat/completions` is appended
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    pub intent_model: String,
    pub chat_model: String,
    pub polish_model: String,
    pub max_tokens: i32,
    pub timeout_seconds: u64,
    /// 1 means a single attempt with no retry
    pub max_attempts: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastConfig {
    pub base_url: String,
    /// met.no rejects requests without an identifying User-Agent
    pub user_agent: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SummaryConfig {
    pub polish: bool,
    pub verify_numbers: bool,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            polish: true,
            verify_numbers: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CitiesConfig {
    pub default_city: String,
    /// Matched in order; the first alias found in a message wins
    pub entries: Vec<CityEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CityEntry {
    pub name: String,
    pub aliases: Vec<String>,
    pub latitude: f64,
    pub longitude: f64,
}

impl Default for CitiesConfig {
    fn default() -> Self {
        Self {
            default_city: "กรุงเทพ".to_string(),
            entries: vec![
                CityEntry {
                    name: "เชียงใหม่".to_string(),
                    aliases: vec!["เชียงใหม่".to_string()],
                    latitude: 18.79,
                    longitude: 98.98,
                },
                CityEntry {
                    name: "กรุงเทพ".to_string(),
                    aliases: vec!["กรุงเทพ".to_string(), "bangkok".to_string()],
                    latitude: 13.75,
                    longitude: 100.50,
                },
            ],
        }
    }
}

impl Config {
    /// Load configuration from file with environment variable overrides
    /// ALWAYS returns a valid config - never fails
    pub fn load() -> Self {
        let env_paths = ["../.env", ".env"];

        let mut env_loaded = false;
        for path in &env_paths {
            if dotenvy::from_path(path).is_ok() {
                tracing::info!("Loaded .env from: {}", path);
                env_loaded = true;
                break;
            }
        }

        if !env_loaded {
            tracing::debug!("No .env file found - continuing with env vars only");
        }

        let config_path =
            env::var("AGENT_CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_string());

        let mut config = Self::from_path(&config_path);

        config.apply_env_overrides();

        // Validate configuration - log warnings but don't fail
        if let Err(e) = config.validate() {
            tracing::warn!("Config validation warnings: {} - continuing anyway", e);
        }

        config
    }

    /// Read a YAML config file, falling back to defaults when it is missing or broken
    pub fn from_path(config_path: &str) -> Self {
        if !Path::new(config_path).exists() {
            tracing::warn!("Config file not found at {} - using defaults", config_path);
            return Self::default();
        }

        match fs::read_to_string(config_path) {
            Ok(contents) => match serde_yaml::from_str::<Config>(&contents) {
                Ok(config) => {
                    tracing::info!("Loaded configuration from {}", config_path);
                    config
                }
                Err(e) => {
                    tracing::error!(
                        "Failed to parse config file {}: {} - using defaults",
                        config_path,
                        e
                    );
                    Self::default()
                }
            },
            Err(e) => {
                tracing::error!(
                    "Failed to read config file {}: {} - using defaults",
                    config_path,
                    e
                );
                Self::default()
            }
        }
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // Server overrides
        if let Ok(bind) = env::var("AGENT_HTTP_BIND") {
            self.server.bind = bind;
        }
        if let Ok(token) = env::var("AGENT_BEARER_TOKEN") {
            if !token.is_empty() {
                self.server.bearer_token = Some(token);
            }
        }

        // LLM overrides
        if let Ok(base_url) = env::var("LLM_BASE_URL") {
            self.llm.base_url = base_url;
        }
        if let Ok(api_key) = env::var("LLM_API_KEY").or_else(|_| env::var("GROQ_API_KEY")) {
            self.llm.api_key = api_key;
        }
        if let Ok(model) = env::var("LLM_INTENT_MODEL") {
            self.llm.intent_model = model;
        }
        if let Ok(model) = env::var("LLM_CHAT_MODEL") {
            self.llm.chat_model = model;
        }
        if let Ok(model) = env::var("LLM_POLISH_MODEL") {
            self.llm.polish_model = model;
        }
        if let Ok(attempts) = env::var("LLM_MAX_ATTEMPTS") {
            if let Ok(n) = attempts.parse() {
                self.llm.max_attempts = n;
            }
        }

        // Forecast overrides
        if let Ok(base_url) = env::var("FORECAST_BASE_URL") {
            self.forecast.base_url = base_url;
        }
        if let Ok(user_agent) = env::var("FORECAST_USER_AGENT") {
            self.forecast.user_agent = user_agent;
        }

        // Summary overrides
        if let Ok(polish) = env::var("AGENT_POLISH") {
            if let Ok(flag) = polish.parse() {
                self.summary.polish = flag;
            }
        }
        if let Ok(verify) = env::var("AGENT_VERIFY_NUMBERS") {
            if let Ok(flag) = verify.parse() {
                self.summary.verify_numbers = flag;
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        for (name, url) in [
            ("llm.base_url", &self.llm.base_url),
            ("forecast.base_url", &self.forecast.base_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(format!("{name} must be an HTTP or HTTPS URL").into());
            }
        }

        if self.llm.max_attempts == 0 || self.llm.max_attempts > 10 {
            return Err("llm.max_attempts must be between 1 and 10".into());
        }
        for (name, secs) in [
            ("llm.timeout_seconds", self.llm.timeout_seconds),
            ("forecast.timeout_seconds", self.forecast.timeout_seconds),
        ] {
            if secs == 0 || secs > 300 {
                return Err(format!("{name} must be between 1 and 300").into());
            }
        }

        if self.forecast.user_agent.trim().is_empty() {
            return Err("forecast.user_agent cannot be empty".into());
        }

        if !self
            .cities
            .entries
            .iter()
            .any(|c| c.name == self.cities.default_city)
        {
            return Err(format!(
                "cities.default_city '{}' is not one of the configured cities",
                self.cities.default_city
            )
            .into());
        }

        if self.llm.api_key.is_empty() {
            return Err("LLM_API_KEY environment variable must be set".into());
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                bind: "127.0.0.1:8080".to_string(),
                bearer_token: None,
            },
            llm: LlmConfig {
                base_url: "https://api.groq.com/openai/v1".to_string(),
                api_key: String::new(),
                intent_model: "llama-3.1-8b-instant".to_string(),
                chat_model: "llama-3.1-8b-instant".to_string(),
                polish_model: "llama-3.1-8b-instant".to_string(),
                max_tokens: 512,
                timeout_seconds: 30,
                max_attempts: 1,
            },
            forecast: ForecastConfig {
                base_url: "https://api.met.no/weatherapi/locationforecast/2.0".to_string(),
                user_agent: "weather-agent/1.0 you@example.com".to_string(),
                timeout_seconds: 10,
            },
            summary: SummaryConfig::default(),
            cities: CitiesConfig::default(),
        }
    }
}
