use std::sync::Arc;

use crate::config::Config;
use crate::error::{AgentError, Result};
use crate::extract;
use crate::forecast::{ForecastSource, MetNoClient};
use crate::intent::{IntentClassifier, LlmIntentClassifier};
use crate::location::{CityResolver, CityTable};
use crate::models::{Coordinate, Intent};
use crate::summary::{LlmSummaryComposer, SummaryComposer};
use crate::transport::{OpenAiTransport, Transport, complete};

pub const FETCH_FAILED_ANSWER: &str =
    "ขออภัย ระบบเรียกข้อมูลอากาศไม่ได้ตอนนี้ ลองใหม่อีกครั้งนะครับ";
pub const FORMAT_CHANGED_ANSWER: &str =
    "สรุปอากาศวันนี้ไม่สำเร็จ (รูปแบบข้อมูลเปลี่ยน) - ลองใหม่อีกครั้งครับ";
pub const CHITCHAT_FAILED_ANSWER: &str = "ขออภัย ตอนนี้ยังตอบไม่ได้ ลองใหม่อีกครั้งนะครับ";

const CHITCHAT_PROMPT: &str = "คุณคือผู้ช่วยภาษาไทย ตอบสั้น กระชับ และสุภาพ";
const CHITCHAT_TEMPERATURE: f32 = 0.3;

/// Routes a message to the weather pipeline or to plain chat.
pub struct WeatherAgent {
    classifier: Arc<dyn IntentClassifier>,
    resolver: CityResolver,
    forecast: Arc<dyn ForecastSource>,
    composer: Arc<dyn SummaryComposer>,
    tx: Arc<dyn Transport>,
    chat_model: String,
    max_tokens: i32,
}

impl WeatherAgent {
    pub fn new(
        classifier: Arc<dyn IntentClassifier>,
        resolver: CityResolver,
        forecast: Arc<dyn ForecastSource>,
        composer: Arc<dyn SummaryComposer>,
        tx: Arc<dyn Transport>,
        chat_model: String,
        max_tokens: i32,
    ) -> Self {
        Self {
            classifier,
            resolver,
            forecast,
            composer,
            tx,
            chat_model,
            max_tokens,
        }
    }

    /// Wire up the production collaborators from configuration
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let transport = Arc::new(OpenAiTransport::new(&cfg.llm)?);
        let forecast = Arc::new(MetNoClient::new(&cfg.forecast)?);
        Self::with_collaborators(cfg, transport, forecast)
    }

    /// Build the agent around the given completion service and forecast source
    pub fn with_collaborators(
        cfg: &Config,
        transport: Arc<dyn Transport>,
        forecast: Arc<dyn ForecastSource>,
    ) -> Result<Self> {
        let resolver = CityResolver::new(Arc::new(CityTable::from_config(&cfg.cities)?));

        let classifier = LlmIntentClassifier::new(
            Arc::clone(&transport),
            cfg.llm.intent_model.clone(),
            cfg.llm.max_tokens,
            resolver.clone(),
        );
        let composer = LlmSummaryComposer::new(
            Arc::clone(&transport),
            cfg.llm.polish_model.clone(),
            cfg.llm.max_tokens,
            cfg.summary,
        );

        Ok(Self::new(
            Arc::new(classifier),
            resolver,
            forecast,
            Arc::new(composer),
            transport,
            cfg.llm.chat_model.clone(),
            cfg.llm.max_tokens,
        ))
    }

    pub fn resolver(&self) -> &CityResolver {
        &self.resolver
    }

    pub fn forecast(&self) -> &dyn ForecastSource {
        self.forecast.as_ref()
    }

    /// Answer a message. Always produces text; failures become fixed fallback answers.
    pub async fn ask(&self, message: &str) -> String {
        tracing::info!("[ask] userMessage={}", message);

        let decision = self.classifier.classify(message).await;
        match decision.intent {
            Intent::Weather => self.answer_weather(message, &decision.city_hint).await,
            Intent::ChitChat => match self.chitchat(message).await {
                Ok(answer) => answer,
                Err(e) => {
                    tracing::error!("[chitchat] {}", e);
                    CHITCHAT_FAILED_ANSWER.to_string()
                }
            },
        }
    }

    async fn answer_weather(&self, message: &str, city_hint: &str) -> String {
        let coordinate = self.resolver.resolve(message, city_hint);
        tracing::info!(
            "[weather] cityHint='{}', resolved lat={}, lon={}",
            city_hint,
            coordinate.latitude,
            coordinate.longitude
        );

        match self.weather_summary(coordinate).await {
            Ok(text) => text,
            Err(AgentError::MalformedPayload(e)) => {
                tracing::error!("[weather] parse JSON failed: {}", e);
                FORMAT_CHANGED_ANSWER.to_string()
            }
            Err(e) => {
                tracing::error!("[weather] forecast call failed: {}", e);
                FETCH_FAILED_ANSWER.to_string()
            }
        }
    }

    async fn weather_summary(&self, coordinate: Coordinate) -> Result<String> {
        let payload = self.forecast.fetch(coordinate).await?;
        let facts = extract::extract(&payload)?;
        let summary = self.composer.compose(coordinate, &facts).await;
        Ok(summary.display().to_string())
    }

    async fn chitchat(&self, message: &str) -> Result<String> {
        complete(
            self.tx.as_ref(),
            &self.chat_model,
            CHITCHAT_PROMPT,
            message,
            CHITCHAT_TEMPERATURE,
            self.max_tokens,
            None,
        )
        .await
    }
}
