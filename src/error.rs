use thiserror::Error;

/// Errors raised inside the agent pipeline.
///
/// None of these escape [`crate::agent::WeatherAgent::ask`]; each one is mapped to a
/// documented fallback at the call site that produced it.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Intent classification call failed: {0}")]
    ClassificationCall(String),

    #[error("Intent classification reply could not be parsed: {0}")]
    ClassificationParse(String),

    #[error("Forecast fetch failed: {0}")]
    Fetch(String),

    #[error("Forecast payload is malformed: {0}")]
    MalformedPayload(String),

    #[error("Summary polish call failed: {0}")]
    PolishCall(String),

    #[error("Completion call failed: {0}")]
    Completion(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, AgentError>;
