use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::fetch::HttpFetch;
use crate::PartialReading;

// ---

/// `{ "value": number | null }` wrapper used by every measurement field.
#[derive(Debug, Deserialize)]
struct Measure {
    value: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObservationProperties {
    text_description: Option<String>,
    temperature: Option<Measure>,
    dewpoint: Option<Measure>,
    wind_direction: Option<Measure>,
    wind_speed: Option<Measure>,
    barometric_pressure: Option<Measure>,
    sea_level_pressure: Option<Measure>,
    visibility: Option<Measure>,
    relative_humidity: Option<Measure>,
    wind_chill: Option<Measure>,
}

#[derive(Debug, Deserialize)]
struct ObservationDocument {
    properties: ObservationProperties,
}

fn value(m: Option<Measure>) -> Option<f64> {
    m.and_then(|m| m.value)
}

impl From<ObservationProperties> for PartialReading {
    fn from(p: ObservationProperties) -> Self {
        // ---
        PartialReading {
            text_description: p.text_description,
            temperature_c: value(p.temperature),
            dewpoint_c: value(p.dewpoint),
            wind_direction_deg: value(p.wind_direction),
            wind_speed_ms: value(p.wind_speed),
            barometric_pressure_pa: value(p.barometric_pressure),
            sea_level_pressure_pa: value(p.sea_level_pressure),
            visibility_m: value(p.visibility),
            relative_humidity_pct: value(p.relative_humidity),
            wind_chill_c: value(p.wind_chill),
        }
    }
}

// ---

/// Reads the latest observation of a weather station.
pub struct StationReader<F> {
    fetch: Arc<F>,
    base_url: String,
}

impl<F: HttpFetch> StationReader<F> {
    // ---
    pub fn new(fetch: Arc<F>, base_url: impl Into<String>) -> Self {
        Self {
            fetch,
            base_url: base_url.into(),
        }
    }

    fn url(&self, station: &str) -> String {
        format!(
            "{}/stations/{}/observations/latest",
            self.base_url.trim_end_matches('/'),
            station
        )
    }

    /// Latest reading for `station`; empty when the station cannot be read.
    pub async fn read(&self, station: &str) -> PartialReading {
        // ---
        match self.try_read(station).await {
            Ok(reading) => {
                debug!("Station {} reading: {:?}", station, reading);
                reading
            }
            Err(e) => {
                warn!("Station {} unavailable: {:#}", station, e);
                PartialReading::default()
            }
        }
    }

    async fn try_read(&self, station: &str) -> Result<PartialReading> {
        // ---
        let body = self.fetch.get_json(&self.url(station), None).await?;
        let doc: ObservationDocument = serde_json::from_value(body)
            .with_context(|| format!("unexpected observation document for {station}"))?;
        Ok(doc.properties.into())
    }
}
