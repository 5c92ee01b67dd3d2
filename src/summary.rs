use async_trait::async_trait;
use chrono::SecondsFormat;
use std::sync::Arc;

use crate::config::SummaryConfig;
use crate::error::{AgentError, Result};
use crate::models::{Coordinate, Summary, WeatherFacts};
use crate::transport::{Transport, complete};

pub const INSUFFICIENT_DATA: &str = "ไม่มีข้อมูลเพียงพอสำหรับวันนี้";

const POLISH_PROMPT: &str = "คุณคือผู้ช่วยภาษาไทย รีไรต์ข้อความให้สละสลวยเล็กน้อยแต่ต้องคงตัวเลขเดิมทุกตัว
ห้ามสมมติ/เพิ่มข้อมูลใหม่ ถ้าข้อมูลไม่ครบให้คงข้อความเดิม";

/// One decimal place, rounding half away from zero on the shortest decimal form of `value`,
/// so `0.25` renders as `0.3` rather than following its binary expansion down to `0.2`.
fn one_decimal(value: f64) -> String {
    let fallback = || format!("{value:.1}");
    if !value.is_finite() {
        return fallback();
    }

    let shortest = value.abs().to_string();
    let (whole, frac) = shortest.split_once('.').unwrap_or((shortest.as_str(), ""));
    let Ok(whole) = whole.parse::<u64>() else {
        return fallback();
    };
    let digits = frac.as_bytes();

    let mut tenths = u128::from(whole) * 10 + digits.first().map_or(0, |d| u128::from(d - b'0'));
    if digits.get(1).is_some_and(|d| *d >= b'5') {
        tenths += 1;
    }
    let sign = if value < 0.0 { "-" } else { "" };
    format!("{sign}{}.{}", tenths / 10, tenths % 10)
}

/// The formatted fact values, in the order they appear in the summary
fn fact_clauses(facts: &WeatherFacts) -> Vec<(String, String)> {
    let mut clauses = Vec::new();
    if let Some(t) = facts.temperature {
        let t = one_decimal(t);
        clauses.push((format!("อุณหภูมิ {t}°C"), t));
    }
    if let Some(p) = facts.precipitation {
        let p = one_decimal(p);
        clauses.push((format!("ฝน {p} mm/h"), p));
    }
    if let Some(w) = facts.wind_speed {
        let w = one_decimal(w);
        clauses.push((format!("ลม {w} m/s"), w));
    }
    clauses
}

/// Render the fixed-template summary. This text is the source of truth for every number.
pub fn render_plain(coordinate: Coordinate, facts: &WeatherFacts) -> String {
    let mut out = format!(
        "สรุปอากาศวันนี้ ({},{})",
        coordinate.latitude, coordinate.longitude
    );
    if let Some(ts) = facts.timestamp_used {
        out.push_str(" @");
        out.push_str(&ts.to_rfc3339_opts(SecondsFormat::Secs, true));
    }
    out.push_str(" - ");

    let clauses = fact_clauses(facts);
    if clauses.is_empty() {
        out.push_str(INSUFFICIENT_DATA);
    } else {
        let joined: Vec<&str> = clauses.iter().map(|(c, _)| c.as_str()).collect();
        out.push_str(&joined.join(", "));
    }
    out
}

/// True when every fact value rendered in the plain text also occurs in `polished`.
pub fn preserves_numbers(facts: &WeatherFacts, polished: &str) -> bool {
    fact_clauses(facts)
        .iter()
        .all(|(_, number)| polished.contains(number.as_str()))
}

#[async_trait]
pub trait SummaryComposer: Send + Sync {
    /// Never fails: a failed polish leaves `polished_text` empty.
    async fn compose(&self, coordinate: Coordinate, facts: &WeatherFacts) -> Summary;
}

pub struct LlmSummaryComposer {
    tx: Arc<dyn Transport>,
    model: String,
    max_tokens: i32,
    settings: SummaryConfig,
}

impl LlmSummaryComposer {
    pub fn new(
        tx: Arc<dyn Transport>,
        model: String,
        max_tokens: i32,
        settings: SummaryConfig,
    ) -> Self {
        Self {
            tx,
            model,
            max_tokens,
            settings,
        }
    }

    async fn polish(&self, plain: &str) -> Result<String> {
        complete(
            self.tx.as_ref(),
            &self.model,
            POLISH_PROMPT,
            plain,
            0.0,
            self.max_tokens,
            None,
        )
        .await
        .map_err(|e| AgentError::PolishCall(e.to_string()))
    }
}

#[async_trait]
impl SummaryComposer for LlmSummaryComposer {
    async fn compose(&self, coordinate: Coordinate, facts: &WeatherFacts) -> Summary {
        let plain_text = render_plain(coordinate, facts);
        tracing::debug!("[weather] plain='{}'", plain_text);

        if !self.settings.polish {
            return Summary {
                plain_text,
                polished_text: None,
            };
        }

        let polished_text = match self.polish(&plain_text).await {
            Ok(text) if text.trim().is_empty() => {
                tracing::warn!("[weather] polish returned blank text, keeping plain summary");
                None
            }
            Ok(text) => {
                if self.settings.verify_numbers && !preserves_numbers(facts, &text) {
                    tracing::warn!("[weather] polished text changed numbers, keeping plain summary");
                    None
                } else {
                    Some(text)
                }
            }
            Err(e) => {
                tracing::warn!("[weather] {}", e);
                None
            }
        };

        Summary {
            plain_text,
            polished_text,
        }
    }
}
