use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use std::sync::{Arc, LazyLock};

use crate::error::{AgentError, Result};
use crate::location::CityResolver;
use crate::models::{Intent, IntentDecision};
use crate::transport::{Transport, complete};

/// Thai words for weather, forecast, rain, heat and wind
const WEATHER_KEYWORDS: [&str; 5] = ["อากาศ", "พยากรณ์", "ฝน", "ร้อน", "ลม"];

static WEATHER_TERMS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(weather|forecast|rain|wind|temp(?:erature)?)\b").expect("valid regex")
});

const DECISION_PROMPT: &str = r#"ตอบเป็น JSON อย่างเดียว:
{"intent":"weather|chitchat","city":"<ชื่อเมืองหรือว่าง>"}
- ถ้าถามสภาพอากาศ/พยากรณ์/ฝน/ลม → intent=weather
- ถ้าไม่ใช่ → intent=chitchat
ห้ามพิมพ์คำอื่นนอกจาก JSON"#;

/// Keyword stage of classification. Matching is done on the lowercased message.
pub fn is_weather_query(message: &str) -> bool {
    let lowered = message.to_lowercase();
    WEATHER_KEYWORDS.iter().any(|k| lowered.contains(k)) || WEATHER_TERMS.is_match(&lowered)
}

/// Parse the constrained JSON reply of the decision prompt.
pub fn parse_decision(reply: &str) -> Result<IntentDecision> {
    let value: Value = serde_json::from_str(reply.trim())
        .map_err(|e| AgentError::ClassificationParse(format!("{e}. Raw: {reply}")))?;

    let obj = value.as_object().ok_or_else(|| {
        AgentError::ClassificationParse(format!("expected a JSON object. Raw: {reply}"))
    })?;

    let intent = match obj.get("intent").and_then(Value::as_str) {
        Some(s) if s.eq_ignore_ascii_case("weather") => Intent::Weather,
        _ => Intent::ChitChat,
    };
    let city_hint = obj
        .get("city")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim()
        .to_string();

    Ok(IntentDecision { intent, city_hint })
}

#[async_trait]
pub trait IntentClassifier: Send + Sync {
    /// Never fails: anything that goes wrong yields [`IntentDecision::chitchat`].
    async fn classify(&self, message: &str) -> IntentDecision;
}

pub struct LlmIntentClassifier {
    tx: Arc<dyn Transport>,
    model: String,
    max_tokens: i32,
    resolver: CityResolver,
}

impl LlmIntentClassifier {
    pub fn new(
        tx: Arc<dyn Transport>,
        model: String,
        max_tokens: i32,
        resolver: CityResolver,
    ) -> Self {
        Self {
            tx,
            model,
            max_tokens,
            resolver,
        }
    }

    async fn ask_model(&self, message: &str) -> Result<IntentDecision> {
        let reply = complete(
            self.tx.as_ref(),
            &self.model,
            DECISION_PROMPT,
            message,
            0.0,
            self.max_tokens,
            Some(serde_json::json!({"type": "json_object"})),
        )
        .await
        .map_err(|e| AgentError::ClassificationCall(e.to_string()))?;

        tracing::debug!("[classify] decisionJson={}", reply);
        parse_decision(&reply)
    }
}

#[async_trait]
impl IntentClassifier for LlmIntentClassifier {
    async fn classify(&self, message: &str) -> IntentDecision {
        if is_weather_query(message) {
            let decision = IntentDecision::weather(self.resolver.detect_city(message));
            tracing::debug!(city = %decision.city_hint, "[classify] keyword match");
            return decision;
        }

        match self.ask_model(message).await {
            Ok(decision) => decision,
            Err(e) => {
                tracing::warn!("[classify] falling back to chitchat: {}", e);
                IntentDecision::chitchat()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockTransport;

    fn classifier(tx: Arc<MockTransport>) -> LlmIntentClassifier {
        LlmIntentClassifier::new(tx, "intent-model".to_string(), 128, CityResolver::default())
    }

    #[test]
    fn test_keyword_detection() {
        assert!(is_weather_query("อากาศวันนี้เป็นไง"));
        assert!(is_weather_query("พรุ่งนี้ฝนตกไหม"));
        assert!(is_weather_query("What's the WEATHER like?"));
        assert!(is_weather_query("current temp please"));
        assert!(is_weather_query("temperature in bangkok"));
        assert!(!is_weather_query("rainbow colours"));
        assert!(!is_weather_query("tempting offer"));
        assert!(!is_weather_query("สวัสดีครับ"));
    }

    #[test]
    fn test_parse_decision_weather_any_case() {
        for reply in [
            r#"{"intent":"weather","city":""}"#,
            r#"{"intent":"WEATHER"}"#,
            r#"{"intent":"Weather","city":null}"#,
        ] {
            let decision = parse_decision(reply).unwrap();
            assert_eq!(decision, IntentDecision::weather(""), "reply: {reply}");
        }
    }

    #[test]
    fn test_parse_decision_keeps_city() {
        let decision = parse_decision(r#" {"intent":"weather","city":"เชียงใหม่"} "#).unwrap();
        assert_eq!(decision.city_hint, "เชียงใหม่");
    }

    #[test]
    fn test_parse_decision_unexpected_values() {
        let decision = parse_decision(r#"{"intent":"smalltalk","city":"x"}"#).unwrap();
        assert_eq!(decision.intent, Intent::ChitChat);

        let decision = parse_decision(r#"{"intent":42}"#).unwrap();
        assert_eq!(decision.intent, Intent::ChitChat);

        assert!(matches!(
            parse_decision("sure! here you go"),
            Err(AgentError::ClassificationParse(_))
        ));
        assert!(matches!(
            parse_decision(r#"["weather"]"#),
            Err(AgentError::ClassificationParse(_))
        ));
    }

    #[tokio::test]
    async fn test_keyword_match_skips_completion_service() {
        let tx = Arc::new(MockTransport::new(vec![]));
        let classifier = classifier(tx.clone());

        for message in ["อากาศที่เชียงใหม่", "is it windy? wind speed", "ลมแรงไหม"] {
            let decision = classifier.classify(message).await;
            assert_eq!(decision.intent, Intent::Weather);
        }
        assert_eq!(tx.call_count(), 0);
    }

    #[tokio::test]
    async fn test_keyword_match_detects_city() {
        let tx = Arc::new(MockTransport::new(vec![]));
        let decision = classifier(tx).classify("อากาศที่ Bangkok").await;
        assert_eq!(decision, IntentDecision::weather("กรุงเทพ"));
    }

    #[tokio::test]
    async fn test_model_decision_is_used() {
        let tx = Arc::new(MockTransport::new(vec![Ok(
            r#"{"intent":"weather","city":"เชียงใหม่"}"#,
        )]));
        let decision = classifier(tx.clone()).classify("ต้องพกร่มไหม").await;

        assert_eq!(decision, IntentDecision::weather("เชียงใหม่"));
        let requests = tx.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].temperature, 0.0);
        assert_eq!(requests[0].model, "intent-model");
        assert_eq!(requests[0].messages[0].role, "system");
        assert_eq!(requests[0].messages[1].content, "ต้องพกร่มไหม");
        assert!(requests[0].response_format.is_some());
    }

    #[tokio::test]
    async fn test_call_failure_defaults_to_chitchat() {
        let tx = Arc::new(MockTransport::new(vec![Err("timeout")]));
        let decision = classifier(tx.clone()).classify("เล่านิทานหน่อย").await;
        assert_eq!(decision, IntentDecision::chitchat());
        assert_eq!(tx.call_count(), 1);
    }

    #[tokio::test]
    async fn test_malformed_reply_defaults_to_chitchat() {
        let tx = Arc::new(MockTransport::new(vec![Ok("intent: weather")]));
        let decision = classifier(tx).classify("ต้องพกร่มไหม").await;
        assert_eq!(decision, IntentDecision::chitchat());
    }
}
