//! Deterministic extraction of "today" facts from a met.no locationforecast document.
//!
//! Only `properties.timeseries[]` is read. Missing paths mean "no data"; a document whose
//! top-level shape is wrong is a [`AgentError::MalformedPayload`].

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::debug;

use crate::error::{AgentError, Result};
use crate::models::WeatherFacts;

/// Accept any JSON value and keep it only if it is a number
fn deserialize_lenient_number<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(Value::as_f64))
}

/// Accept any JSON value and keep it only if it has the expected shape
fn deserialize_lenient<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| T::deserialize(v).ok()))
}

#[derive(Debug, Deserialize)]
struct TimeseriesEntry {
    #[serde(default)]
    time: Option<String>,
    #[serde(default)]
    data: Option<EntryData>,
}

#[derive(Debug, Deserialize)]
struct EntryData {
    #[serde(default, deserialize_with = "deserialize_lenient")]
    instant: Option<Section>,
    #[serde(default, deserialize_with = "deserialize_lenient")]
    next_1_hours: Option<Section>,
}

#[derive(Debug, Deserialize)]
struct Section {
    #[serde(default, deserialize_with = "deserialize_lenient")]
    details: Option<Details>,
}

#[derive(Debug, Deserialize)]
struct Details {
    #[serde(default, deserialize_with = "deserialize_lenient_number")]
    air_temperature: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_lenient_number")]
    wind_speed: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_lenient_number")]
    precipitation_amount: Option<f64>,
}

/// Extract facts for the current UTC date.
pub fn extract(payload: &str) -> Result<WeatherFacts> {
    extract_for_date(payload, Utc::now().date_naive())
}

/// Extract facts from the first entry dated `today` (UTC) that carries instant details.
pub fn extract_for_date(payload: &str, today: NaiveDate) -> Result<WeatherFacts> {
    let root: Value = serde_json::from_str(payload)
        .map_err(|e| AgentError::MalformedPayload(format!("not JSON: {e}")))?;

    let Some(series) = timeseries(&root)? else {
        debug!("Payload has no timeseries, nothing to extract");
        return Ok(WeatherFacts::default());
    };

    for raw in series {
        let Ok(entry) = TimeseriesEntry::deserialize(raw) else {
            continue;
        };
        let Some(time) = entry.time.as_deref().map(str::trim).filter(|t| !t.is_empty()) else {
            continue;
        };
        let Ok(instant) = DateTime::parse_from_rfc3339(time) else {
            debug!("Skipping entry with unparseable time '{}'", time);
            continue;
        };
        let instant = instant.with_timezone(&Utc);
        if instant.date_naive() != today {
            continue;
        }

        let Some(data) = entry.data else {
            continue;
        };
        let Some(details) = data.instant.and_then(|s| s.details) else {
            continue;
        };
        let precipitation = data
            .next_1_hours
            .and_then(|s| s.details)
            .and_then(|d| d.precipitation_amount);

        return Ok(WeatherFacts {
            temperature: details.air_temperature,
            wind_speed: details.wind_speed,
            precipitation,
            timestamp_used: Some(instant),
        });
    }

    debug!("No timeseries entry for {}", today);
    Ok(WeatherFacts::default())
}

fn timeseries(root: &Value) -> Result<Option<&Vec<Value>>> {
    let root = root
        .as_object()
        .ok_or_else(|| AgentError::MalformedPayload("top level is not an object".to_string()))?;

    let properties = match root.get("properties") {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Object(p)) => p,
        Some(_) => {
            return Err(AgentError::MalformedPayload(
                "properties is not an object".to_string(),
            ));
        }
    };

    match properties.get("timeseries") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(series)) => Ok(Some(series)),
        Some(_) => Err(AgentError::MalformedPayload(
            "properties.timeseries is not an array".to_string(),
        )),
    }
}
