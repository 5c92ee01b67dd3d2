//! met.no locationforecast client.
//! Returns the raw JSON body; interpretation lives in [`crate::extract`].

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use std::time::Duration;

use crate::config::ForecastConfig;
use crate::error::{AgentError, Result};
use crate::models::Coordinate;

#[cfg(test)]
use mockall::automock;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait ForecastSource: Send + Sync {
    /// Fetch the raw forecast document for a coordinate. Any failure is [`AgentError::Fetch`].
    async fn fetch(&self, coordinate: Coordinate) -> Result<String>;
}

pub struct MetNoClient {
    client: Client,
    base_url: String,
}

impl MetNoClient {
    pub fn new(cfg: &ForecastConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&cfg.user_agent)
                .map_err(|e| AgentError::Config(format!("invalid forecast user agent: {e}")))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(cfg.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ForecastSource for MetNoClient {
    async fn fetch(&self, coordinate: Coordinate) -> Result<String> {
        let url = format!("{}/compact", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[("lat", coordinate.latitude), ("lon", coordinate.longitude)])
            .send()
            .await
            .map_err(|e| AgentError::Fetch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AgentError::Fetch(format!("{status}: {text}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AgentError::Fetch(e.to_string()))?;
        tracing::info!(
            lat = coordinate.latitude,
            lon = coordinate.longitude,
            bytes = body.len(),
            "[forecast] fetched"
        );
        Ok(body)
    }
}
