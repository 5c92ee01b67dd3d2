//! City lookup: turns free text into the coordinate used for the forecast call.
//!
//! Matching is plain lowercase substring search over an ordered alias list, so the
//! first alias in table order wins when a message names more than one city.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use crate::config::CitiesConfig;
use crate::error::{AgentError, Result};
use crate::models::Coordinate;

#[derive(Debug, Clone, PartialEq)]
pub struct CityAlias {
    /// Lowercased alias searched for in messages
    pub alias: String,
    /// Canonical city name reported as the city hint
    pub city: String,
    pub coordinate: Coordinate,
}

/// Read-only alias table, built once at startup and shared between requests
#[derive(Debug, Clone)]
pub struct CityTable {
    aliases: Vec<CityAlias>,
    default_city: String,
    default_coordinate: Coordinate,
}

impl CityTable {
    pub fn from_config(cfg: &CitiesConfig) -> Result<Self> {
        let mut aliases = Vec::new();
        let mut seen = HashSet::new();

        for entry in &cfg.entries {
            let coordinate = Coordinate::new(entry.latitude, entry.longitude);
            for alias in &entry.aliases {
                let alias = alias.trim().to_lowercase();
                if alias.is_empty() {
                    return Err(AgentError::Config(format!(
                        "city '{}' has an empty alias",
                        entry.name
                    )));
                }
                if !seen.insert(alias.clone()) {
                    return Err(AgentError::Config(format!(
                        "alias '{alias}' is listed more than once"
                    )));
                }
                aliases.push(CityAlias {
                    alias,
                    city: entry.name.clone(),
                    coordinate,
                });
            }
        }

        let default_coordinate = cfg
            .entries
            .iter()
            .find(|e| e.name == cfg.default_city)
            .map(|e| Coordinate::new(e.latitude, e.longitude))
            .ok_or_else(|| {
                AgentError::Config(format!(
                    "default city '{}' is not in the city table",
                    cfg.default_city
                ))
            })?;

        Ok(Self {
            aliases,
            default_city: cfg.default_city.clone(),
            default_coordinate,
        })
    }

    pub fn aliases(&self) -> &[CityAlias] {
        &self.aliases
    }

    pub fn default_city(&self) -> &str {
        &self.default_city
    }

    pub fn default_coordinate(&self) -> Coordinate {
        self.default_coordinate
    }

    fn first_match(&self, lowered: &str) -> Option<&CityAlias> {
        self.aliases.iter().find(|a| lowered.contains(&a.alias))
    }
}

impl Default for CityTable {
    /// Chiang Mai, then Bangkok (Thai and English aliases); Bangkok is the default
    fn default() -> Self {
        let bangkok = Coordinate::new(13.75, 100.50);
        let chiang_mai = Coordinate::new(18.79, 98.98);
        let alias = |alias: &str, city: &str, coordinate| CityAlias {
            alias: alias.to_string(),
            city: city.to_string(),
            coordinate,
        };

        Self {
            aliases: vec![
                alias("เชียงใหม่", "เชียงใหม่", chiang_mai),
                alias("กรุงเทพ", "กรุงเทพ", bangkok),
                alias("bangkok", "กรุงเทพ", bangkok),
            ],
            default_city: "กรุงเทพ".to_string(),
            default_coordinate: bangkok,
        }
    }
}

/// Service for resolving messages into coordinates
#[derive(Debug, Clone)]
pub struct CityResolver {
    table: Arc<CityTable>,
}

impl CityResolver {
    pub fn new(table: Arc<CityTable>) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &CityTable {
        &self.table
    }

    /// Coordinate of the first alias found in `message` or `city_hint`, else the default city.
    pub fn resolve(&self, message: &str, city_hint: &str) -> Coordinate {
        let all = format!("{message} {city_hint}").to_lowercase();
        match self.table.first_match(&all) {
            Some(hit) => {
                debug!("Matched alias '{}' -> {}", hit.alias, hit.city);
                hit.coordinate
            }
            None => {
                debug!(
                    "No city alias in message, using default {}",
                    self.table.default_city
                );
                self.table.default_coordinate
            }
        }
    }

    /// Canonical name of the first city mentioned in `message`, or an empty string.
    pub fn detect_city(&self, message: &str) -> String {
        let lowered = message.to_lowercase();
        self.table
            .first_match(&lowered)
            .map(|hit| hit.city.clone())
            .unwrap_or_default()
    }
}

impl Default for CityResolver {
    fn default() -> Self {
        Self::new(Arc::new(CityTable::default()))
    }
}
