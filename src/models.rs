use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A latitude/longitude pair used for forecast lookups
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Weather,
    ChitChat,
}

/// Outcome of intent classification for one incoming message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentDecision {
    pub intent: Intent,
    /// Canonical city name, empty when nothing was recognised
    pub city_hint: String,
}

impl IntentDecision {
    pub fn weather(city_hint: impl Into<String>) -> Self {
        Self {
            intent: Intent::Weather,
            city_hint: city_hint.into(),
        }
    }

    pub fn chitchat() -> Self {
        Self {
            intent: Intent::ChitChat,
            city_hint: String::new(),
        }
    }
}

/// Numeric facts pulled from the first usable forecast entry of today
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeatherFacts {
    /// Air temperature in °C
    pub temperature: Option<f64>,
    /// Wind speed in m/s
    pub wind_speed: Option<f64>,
    /// Precipitation for the next hour in mm
    pub precipitation: Option<f64>,
    pub timestamp_used: Option<DateTime<Utc>>,
}

impl WeatherFacts {
    pub fn is_empty(&self) -> bool {
        self.temperature.is_none() && self.wind_speed.is_none() && self.precipitation.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    /// Authoritative rendering; the numbers in here come straight from the facts
    pub plain_text: String,
    pub polished_text: Option<String>,
}

impl Summary {
    pub fn display(&self) -> &str {
        self.polished_text.as_deref().unwrap_or(&self.plain_text)
    }
}

/// JSON body returned by the ask endpoint
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AskResponse {
    pub question: String,
    pub answer: String,
}

// OpenAI-compatible chat message format
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

// Chat completions request format
#[derive(Debug, Serialize, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<serde_json::Value>,
}

// Chat completions response format
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ChatResponse {
    pub choices: Vec<Choice>,
}

impl ChatResponse {
    /// Content of the first choice, if the service returned any
    pub fn first_content(&self) -> Option<&str> {
        self.choices.first().map(|c| c.message.content.as_str())
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Choice {
    pub message: ChatMessage,
}
